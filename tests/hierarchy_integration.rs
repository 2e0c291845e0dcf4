//! Integration tests for the command hierarchy: registry and rank transitions

use glam::Vec3;

use squad_command::core::error::CommandError;
use squad_command::core::types::{EntityId, TeamColor};
use squad_command::hierarchy::{RankKind, Registry};

fn create_test_team(units: usize, cap: usize) -> (Registry, EntityId, Vec<EntityId>) {
    let mut registry = Registry::new(cap);
    let commander = registry
        .spawn_commander("Red Commander", TeamColor::Red, Vec3::ZERO, 100.0)
        .unwrap();
    let ids = (0..units)
        .map(|i| {
            registry
                .enlist(commander, format!("red-{}", i), Vec3::new(i as f32, 0.0, 0.0), 100.0)
                .unwrap()
        })
        .collect();
    (registry, commander, ids)
}

#[test]
fn test_reassignment_moves_unit_between_leaders() {
    let (mut registry, commander, ids) = create_test_team(4, 4);
    let leader_a = ids[0];
    let leader_b = ids[1];
    registry.promote(leader_a, commander).unwrap();
    registry.promote(leader_b, commander).unwrap();
    registry.register(ids[2], leader_a).unwrap();

    registry.register(ids[2], leader_b).unwrap();

    assert!(!registry.members(leader_a).contains(&ids[2]));
    assert!(registry.members(leader_b).contains(&ids[2]));
    assert_eq!(registry.superior_of(ids[2]), Some(leader_b));
    assert!(registry.hierarchy_violations().is_empty());
}

#[test]
fn test_registration_clears_standing_order() {
    let (mut registry, commander, ids) = create_test_team(2, 4);
    registry.promote(ids[0], commander).unwrap();
    registry.core_mut(ids[1]).unwrap().last_orderer = Some(commander);

    registry.register(ids[1], ids[0]).unwrap();

    let core = registry.core(ids[1]).unwrap();
    assert!(core.last_orderer.is_none());
    assert!(core.current_order.map(|o| o.is_stop()).unwrap_or(false));
}

#[test]
fn test_registration_adopts_leader_team() {
    let (mut registry, commander, ids) = create_test_team(2, 4);
    registry.promote(ids[0], commander).unwrap();
    registry.core_mut(ids[1]).unwrap().team = TeamColor::Blue;

    registry.register(ids[1], ids[0]).unwrap();

    assert_eq!(registry.core(ids[1]).unwrap().team, TeamColor::Red);
}

#[test]
fn test_promotion_preserves_identity_and_stats() {
    let (mut registry, commander, ids) = create_test_team(1, 4);
    {
        let core = registry.core_mut(ids[0]).unwrap();
        core.health = 42.0;
        core.captures = 3;
    }

    registry.promote(ids[0], commander).unwrap();

    let entity = registry.get(ids[0]).unwrap();
    assert_eq!(entity.kind(), RankKind::Leader);
    assert_eq!(entity.id(), ids[0]);
    assert_eq!(entity.core.health, 42.0);
    assert_eq!(entity.core.captures, 3);
    assert_eq!(registry.superior_of(ids[0]), Some(commander));
    assert_eq!(registry.leader_count(commander), 1);
}

#[test]
fn test_promotion_denied_at_capacity() {
    let (mut registry, commander, ids) = create_test_team(3, 2);
    registry.promote(ids[0], commander).unwrap();
    registry.promote(ids[1], commander).unwrap();

    let result = registry.promote(ids[2], commander);

    assert!(matches!(result, Err(CommandError::CapacityExceeded { max: 2 })));
    assert_eq!(registry.get(ids[2]).unwrap().kind(), RankKind::Unit);
    assert_eq!(registry.leader_count(commander), 2);
}

#[test]
fn test_demotion_returns_squad_to_commander() {
    let (mut registry, commander, ids) = create_test_team(4, 4);
    registry.promote(ids[0], commander).unwrap();
    for id in &ids[1..] {
        registry.register(*id, ids[0]).unwrap();
    }

    registry.demote(ids[0]).unwrap();

    assert_eq!(registry.get(ids[0]).unwrap().kind(), RankKind::Unit);
    for id in &ids {
        assert_eq!(registry.superior_of(*id), Some(commander));
    }
    assert_eq!(registry.leader_count(commander), 0);
    assert!(registry.hierarchy_violations().is_empty());
}

#[test]
fn test_commander_cannot_be_reassigned() {
    let (mut registry, commander, ids) = create_test_team(1, 4);
    registry.promote(ids[0], commander).unwrap();

    let result = registry.register(commander, ids[0]);

    assert!(matches!(result, Err(CommandError::RankMismatch { .. })));
}

#[test]
fn test_independent_registries_do_not_share_ids() {
    let (mut first, _, _) = create_test_team(3, 4);
    let (mut second, _, _) = create_test_team(0, 4);

    let a = first.allocate_id();
    let b = second.allocate_id();

    assert_ne!(a, b);
    assert!(second.get(a).is_none());
}
