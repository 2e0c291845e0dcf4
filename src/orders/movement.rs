//! Per-tick movement toward tracked order targets
//!
//! The core resolves each unit's tracking handle and hands the point to the
//! navigation collaborator. Arrival issues a Stop and tells the issuer.

use crate::core::types::EntityId;
use crate::hierarchy::Registry;
use crate::navigation::Navigation;
use crate::objectives::ObjectiveBoard;
use crate::simulation::events::{SimEventLog, SimEventType};

/// Result of a movement tick
#[derive(Debug, Clone, Default)]
pub struct MovementResult {
    pub moved: Vec<EntityId>,
    pub arrived: Vec<EntityId>,
    /// Units whose target vanished (despawned unit, removed objective)
    pub lost_target: Vec<EntityId>,
}

/// Advance every living unit with a movement target one tick
pub fn advance_movement(
    registry: &mut Registry,
    board: &ObjectiveBoard,
    nav: &mut dyn Navigation,
    events: &mut SimEventLog,
) -> MovementResult {
    let mut result = MovementResult::default();

    let movers: Vec<_> = registry
        .iter()
        .filter(|e| e.is_alive())
        .filter_map(|e| e.core.move_target.map(|handle| (e.id(), handle)))
        .collect();

    for (id, handle) in movers {
        let point = handle.resolve(|e| registry.position(e), |o| board.position(o));

        let Ok(core) = registry.core_mut(id) else {
            continue;
        };

        let Some(point) = point else {
            core.halt();
            result.lost_target.push(id);
            continue;
        };

        let arrived = nav.move_to(core, point);
        result.moved.push(id);

        if arrived {
            let issuer = core.last_orderer;
            core.halt();
            result.arrived.push(id);
            events.push(
                SimEventType::DestinationReached { unit: id, issuer },
                format!("{} reached its destination", id),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::core::types::TeamColor;
    use crate::navigation::StraightLineNavigator;
    use crate::orders::order::TrackingHandle;

    fn setup() -> (Registry, EntityId, EntityId) {
        let mut registry = Registry::new(4);
        let commander = registry
            .spawn_commander("Blue", TeamColor::Blue, Vec3::ZERO, 100.0)
            .unwrap();
        let unit = registry.enlist(commander, "b0", Vec3::ZERO, 100.0).unwrap();
        (registry, commander, unit)
    }

    #[test]
    fn test_unit_walks_and_arrives() {
        let (mut registry, commander, unit) = setup();
        let board = ObjectiveBoard::new();
        let mut nav = StraightLineNavigator::new(10.0, 0.1);
        let mut events = SimEventLog::new(0);
        {
            let core = registry.core_mut(unit).unwrap();
            core.move_target = Some(TrackingHandle::fixed(Vec3::new(3.0, 0.0, 0.0)));
            core.last_orderer = Some(commander);
        }

        let mut arrived = false;
        for _ in 0..10 {
            let result = advance_movement(&mut registry, &board, &mut nav, &mut events);
            if result.arrived.contains(&unit) {
                arrived = true;
                break;
            }
        }

        assert!(arrived);
        let core = registry.core(unit).unwrap();
        assert!(!core.is_moving());
        assert!(core.current_order.map(|o| o.is_stop()).unwrap_or(false));
        assert!(events.iter().any(|e| matches!(
            e,
            SimEventType::DestinationReached { issuer, .. } if *issuer == Some(commander)
        )));
    }

    #[test]
    fn test_lost_anchor_halts() {
        let (mut registry, _, unit) = setup();
        let board = ObjectiveBoard::new();
        let mut nav = StraightLineNavigator::new(10.0, 0.1);
        let mut events = SimEventLog::new(0);
        registry.core_mut(unit).unwrap().move_target = Some(TrackingHandle {
            anchor: crate::orders::order::TrackAnchor::Entity(EntityId(999)),
            offset: Vec3::ZERO,
        });

        let result = advance_movement(&mut registry, &board, &mut nav, &mut events);

        assert_eq!(result.lost_target, vec![unit]);
        assert!(!registry.core(unit).unwrap().is_moving());
    }

    #[test]
    fn test_dead_units_do_not_move() {
        let (mut registry, _, unit) = setup();
        let board = ObjectiveBoard::new();
        let mut nav = StraightLineNavigator::new(10.0, 0.1);
        let mut events = SimEventLog::new(0);
        {
            let core = registry.core_mut(unit).unwrap();
            core.move_target = Some(TrackingHandle::fixed(Vec3::new(30.0, 0.0, 0.0)));
            core.alive = false;
        }

        let result = advance_movement(&mut registry, &board, &mut nav, &mut events);

        assert!(result.moved.is_empty());
        assert_eq!(registry.position(unit), Some(Vec3::ZERO));
    }
}
