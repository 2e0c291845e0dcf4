//! Committing units to a single objective
//!
//! One leader per objective. The allocator finds or creates that leader,
//! then grows or shrinks its squad toward `round(roster * percentage)`,
//! counting the leader itself.

use ahash::AHashSet;
use glam::Vec3;

use crate::allocation::selection::{closest, furthest};
use crate::core::error::CommandError;
use crate::core::types::{EntityId, ObjectiveId};
use crate::hierarchy::{RankKind, Registry};
use crate::objectives::ObjectiveBoard;
use crate::simulation::events::{SimEventLog, SimEventType};

/// Living members of the commander's roster
pub fn roster_size(registry: &Registry, commander: EntityId) -> usize {
    registry
        .command(commander)
        .map(|(_, command)| {
            command
                .all_units
                .iter()
                .filter(|u| registry.get(**u).map(|e| e.is_alive()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

/// How many units (leader included) an objective should get
pub fn target_count(roster: usize, percentage: f32) -> usize {
    (roster as f32 * percentage).round().max(0.0) as usize
}

/// The leader currently responsible for `objective`, if any
pub fn leader_for(registry: &Registry, commander: EntityId, objective: ObjectiveId) -> Option<EntityId> {
    let (_, command) = registry.command(commander).ok()?;
    let assigned = |id: &EntityId| {
        registry
            .core(*id)
            .map(|c| c.current_objective == Some(objective))
            .unwrap_or(false)
    };

    command
        .leaders
        .iter()
        .copied()
        .find(assigned)
        .or_else(|| Some(commander).filter(assigned))
}

/// Whether the commander already leads or directs a different objective
pub fn commander_is_busy(registry: &Registry, commander: EntityId, objective: ObjectiveId) -> bool {
    let other = |slot: Option<ObjectiveId>| slot.map(|o| o != objective).unwrap_or(false);

    let leading = registry
        .core(commander)
        .map(|c| other(c.current_objective))
        .unwrap_or(true);
    let directing = registry
        .command(commander)
        .map(|(_, c)| other(c.attack_objective) || other(c.defend_objective))
        .unwrap_or(true);

    leading || directing
}

/// Units directly under the commander that are free to be pulled into a squad
fn unassigned_units(
    registry: &Registry,
    commander: EntityId,
    objective: ObjectiveId,
) -> Vec<EntityId> {
    registry
        .members(commander)
        .into_iter()
        .filter(|id| {
            registry
                .get(*id)
                .map(|e| {
                    e.kind() == RankKind::Unit
                        && e.is_alive()
                        && e.core
                            .current_objective
                            .map(|o| o == objective)
                            .unwrap_or(true)
                })
                .unwrap_or(false)
        })
        .collect()
}

/// Everyone already fighting for `objective` on the leader's behalf:
/// its squad, team units assigned to the objective, and contestants still
/// tracking it. The leader itself is excluded.
fn current_members(
    registry: &Registry,
    board: &ObjectiveBoard,
    commander: EntityId,
    leader: EntityId,
    objective: ObjectiveId,
) -> Vec<EntityId> {
    let mut seen = AHashSet::new();
    let mut members = Vec::new();

    let fighting_for = |id: &EntityId| {
        registry
            .get(*id)
            .map(|e| {
                e.kind() == RankKind::Unit
                    && e.is_alive()
                    && e.core.current_objective == Some(objective)
            })
            .unwrap_or(false)
    };

    let squad = if leader == commander {
        Vec::new()
    } else {
        registry.members(leader)
    };

    let roster = registry
        .command(commander)
        .map(|(_, c)| c.all_units.clone())
        .unwrap_or_default();

    let contestants: Vec<EntityId> = board
        .get(objective)
        .map(|o| o.contestants().collect())
        .unwrap_or_default();

    let candidates = squad
        .into_iter()
        .chain(roster.into_iter().filter(fighting_for))
        .chain(contestants.into_iter().filter(|id| {
            fighting_for(id) && registry.commander_of(*id) == Some(commander)
        }));

    for id in candidates {
        if id != leader && seen.insert(id) {
            members.push(id);
        }
    }
    members
}

/// Commit `round(roster * percentage)` units to `objective`
///
/// Returns the leader responsible for it so the caller can issue the
/// attack/defend order, or None when no leader could be found (leader cap
/// reached with a busy commander, no eligible units) or the objective was
/// deallocated because the target is zero.
pub fn allocate_to_single_objective(
    registry: &mut Registry,
    board: &ObjectiveBoard,
    events: &mut SimEventLog,
    commander: EntityId,
    objective: ObjectiveId,
    percentage: f32,
) -> Option<EntityId> {
    let objective_position = board.position(objective)?;
    let target = target_count(roster_size(registry, commander), percentage);
    let existing = leader_for(registry, commander, objective);

    if target == 0 {
        if let Some(leader) = existing {
            release(registry, events, commander, leader, objective);
        }
        return None;
    }

    let leader = match existing {
        Some(leader) => leader,
        None => appoint_leader(registry, events, commander, objective, objective_position)?,
    };

    if let Ok(core) = registry.core_mut(leader) {
        core.current_objective = Some(objective);
    }

    let members = current_members(registry, board, commander, leader, objective);
    let current = members.len() + 1;

    if current > target {
        let positions: Vec<_> = members
            .iter()
            .filter_map(|id| registry.position(*id).map(|p| (*id, p)))
            .collect();
        for unit in furthest(objective_position, positions, current - target) {
            send_back(registry, events, commander, unit, objective);
        }
    } else if current < target {
        let positions: Vec<_> = unassigned_units(registry, commander, objective)
            .into_iter()
            .filter(|id| *id != leader && !members.contains(id))
            .filter_map(|id| registry.position(id).map(|p| (id, p)))
            .collect();
        for unit in closest(objective_position, positions, target - current) {
            pull_in(registry, events, commander, leader, unit, objective);
        }
    }

    tracing::debug!(
        "Objective {} led by {} with target {} (had {})",
        objective,
        leader,
        target,
        current
    );
    events.push(
        SimEventType::ObjectiveAllocated {
            commander,
            objective,
            leader,
        },
        format!("{} leads the push on {}", leader, objective),
    );
    Some(leader)
}

/// Promote the closest free unit, or fall back to the commander
fn appoint_leader(
    registry: &mut Registry,
    events: &mut SimEventLog,
    commander: EntityId,
    objective: ObjectiveId,
    origin: Vec3,
) -> Option<EntityId> {
    if registry.leader_count(commander) >= registry.leader_cap() {
        if commander_is_busy(registry, commander, objective) {
            tracing::debug!(
                "No leader available for {}: cap reached and {} is busy",
                objective,
                commander
            );
            return None;
        }
        return Some(commander);
    }

    let positions: Vec<_> = unassigned_units(registry, commander, objective)
        .into_iter()
        .filter(|id| {
            registry
                .core(*id)
                .map(|c| c.current_objective.is_none())
                .unwrap_or(false)
        })
        .filter_map(|id| registry.position(id).map(|p| (id, p)))
        .collect();
    let candidate = closest(origin, positions, 1).into_iter().next()?;

    match registry.promote(candidate, commander) {
        Ok(()) => {
            events.push(
                SimEventType::Promoted {
                    unit: candidate,
                    commander,
                },
                format!("{} promoted to leader", candidate),
            );
            Some(candidate)
        }
        Err(CommandError::CapacityExceeded { .. }) => None,
        Err(e) => {
            tracing::warn!("Promotion of {} failed: {}", candidate, e);
            None
        }
    }
}

/// Give up on `objective`: demote its leader or free the commander
fn release(
    registry: &mut Registry,
    events: &mut SimEventLog,
    commander: EntityId,
    leader: EntityId,
    objective: ObjectiveId,
) {
    if leader == commander {
        let assigned: Vec<EntityId> = registry
            .members(commander)
            .into_iter()
            .filter(|id| {
                registry
                    .core(*id)
                    .map(|c| c.current_objective == Some(objective))
                    .unwrap_or(false)
            })
            .collect();
        for id in assigned {
            if let Ok(core) = registry.core_mut(id) {
                core.current_objective = None;
            }
        }
        if let Ok(core) = registry.core_mut(commander) {
            core.current_objective = None;
        }
        return;
    }

    match registry.demote(leader) {
        Ok(()) => events.push(
            SimEventType::Demoted {
                unit: leader,
                commander,
            },
            format!("{} demoted, {} deallocated", leader, objective),
        ),
        Err(e) => tracing::warn!("Demotion of {} failed: {}", leader, e),
    }
}

/// Return a surplus member to direct commander control
fn send_back(
    registry: &mut Registry,
    events: &mut SimEventLog,
    commander: EntityId,
    unit: EntityId,
    objective: ObjectiveId,
) {
    let from = registry.superior_of(unit);
    match registry.register(unit, commander) {
        Ok(()) => events.push(
            SimEventType::Reassigned {
                unit,
                from,
                to: commander,
            },
            format!("{} returned to {}", unit, commander),
        ),
        Err(CommandError::AlreadyAssigned(_)) => {}
        Err(e) => tracing::warn!("Could not return {} to {}: {}", unit, commander, e),
    }

    if let Ok(core) = registry.core_mut(unit) {
        if core.current_objective == Some(objective) {
            core.current_objective = None;
        }
    }
}

/// Bring a free unit into the leader's squad
fn pull_in(
    registry: &mut Registry,
    events: &mut SimEventLog,
    commander: EntityId,
    leader: EntityId,
    unit: EntityId,
    objective: ObjectiveId,
) {
    if leader != commander {
        let from = registry.superior_of(unit);
        match registry.register(unit, leader) {
            Ok(()) => events.push(
                SimEventType::Reassigned {
                    unit,
                    from,
                    to: leader,
                },
                format!("{} joined {}'s squad", unit, leader),
            ),
            Err(CommandError::AlreadyAssigned(_)) => {}
            Err(e) => {
                tracing::warn!("Could not assign {} to {}: {}", unit, leader, e);
                return;
            }
        }
    }

    if let Ok(core) = registry.core_mut(unit) {
        core.current_objective = Some(objective);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TeamColor;
    use crate::objectives::ObjectiveKind;

    fn team(positions: &[Vec3], cap: usize) -> (Registry, EntityId, Vec<EntityId>) {
        let mut registry = Registry::new(cap);
        let commander = registry
            .spawn_commander("Red", TeamColor::Red, Vec3::new(0.0, 0.0, -50.0), 100.0)
            .unwrap();
        let units = positions
            .iter()
            .enumerate()
            .map(|(i, p)| registry.enlist(commander, format!("r{}", i), *p, 100.0).unwrap())
            .collect();
        (registry, commander, units)
    }

    #[test]
    fn test_target_count_rounds() {
        assert_eq!(target_count(10, 0.8), 8);
        assert_eq!(target_count(10, 0.2), 2);
        assert_eq!(target_count(7, 0.4), 3);
        assert_eq!(target_count(2, 0.2), 0);
    }

    #[test]
    fn test_promotes_closest_unit() {
        let (mut registry, commander, units) = team(
            &[
                Vec3::new(30.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(10.0, 0.0, 0.0),
            ],
            4,
        );
        let mut board = ObjectiveBoard::new();
        let hill = board.add("Hill", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        let mut events = SimEventLog::new(0);

        let leader =
            allocate_to_single_objective(&mut registry, &board, &mut events, commander, hill, 0.67);

        assert_eq!(leader, Some(units[1]));
        assert_eq!(registry.get(units[1]).unwrap().kind(), RankKind::Leader);
        assert_eq!(registry.members(units[1]), vec![units[2]]);
    }

    #[test]
    fn test_shrinks_by_sending_furthest_back() {
        let (mut registry, commander, units) = team(
            &[
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(3.0, 0.0, 0.0),
                Vec3::new(40.0, 0.0, 0.0),
                Vec3::new(50.0, 0.0, 0.0),
            ],
            4,
        );
        let mut board = ObjectiveBoard::new();
        let hill = board.add("Hill", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        let mut events = SimEventLog::new(0);

        let leader =
            allocate_to_single_objective(&mut registry, &board, &mut events, commander, hill, 1.0)
                .unwrap();
        assert_eq!(registry.members(leader).len(), 4);

        allocate_to_single_objective(&mut registry, &board, &mut events, commander, hill, 0.6);

        let squad = registry.members(leader);
        assert_eq!(squad, vec![units[1], units[2]]);
        assert_eq!(registry.superior_of(units[4]), Some(commander));
        assert!(registry.core(units[4]).unwrap().current_objective.is_none());
        assert!(registry.hierarchy_violations().is_empty());
    }

    #[test]
    fn test_zero_target_demotes_leader() {
        let (mut registry, commander, _) = team(&[Vec3::ZERO, Vec3::ONE, Vec3::X], 4);
        let mut board = ObjectiveBoard::new();
        let hill = board.add("Hill", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        let mut events = SimEventLog::new(0);

        let leader =
            allocate_to_single_objective(&mut registry, &board, &mut events, commander, hill, 1.0)
                .unwrap();

        let result =
            allocate_to_single_objective(&mut registry, &board, &mut events, commander, hill, 0.0);

        assert!(result.is_none());
        assert_eq!(registry.get(leader).unwrap().kind(), RankKind::Unit);
        assert_eq!(registry.leader_count(commander), 0);
        assert_eq!(registry.members(commander).len(), 3);
    }

    #[test]
    fn test_idle_commander_leads_when_capped() {
        let (mut registry, commander, _) = team(&[Vec3::ZERO, Vec3::X, Vec3::ONE], 0);
        let mut board = ObjectiveBoard::new();
        let hill = board.add("Hill", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        let mut events = SimEventLog::new(0);

        let leader =
            allocate_to_single_objective(&mut registry, &board, &mut events, commander, hill, 1.0);

        assert_eq!(leader, Some(commander));
        let assigned = registry
            .members(commander)
            .into_iter()
            .filter(|u| registry.core(*u).unwrap().current_objective == Some(hill))
            .count();
        assert_eq!(assigned, 2);
    }

    #[test]
    fn test_busy_commander_does_not_lead() {
        let (mut registry, commander, _) = team(&[Vec3::ZERO, Vec3::X], 0);
        let mut board = ObjectiveBoard::new();
        let hill = board.add("Hill", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        let mill = board.add("Mill", ObjectiveKind::ControlPoint, Vec3::X * 80.0, None);
        registry.command_mut(commander).unwrap().defend_objective = Some(mill);
        let mut events = SimEventLog::new(0);

        let leader =
            allocate_to_single_objective(&mut registry, &board, &mut events, commander, hill, 1.0);

        assert!(leader.is_none());
        assert!(events.is_empty());
    }
}
