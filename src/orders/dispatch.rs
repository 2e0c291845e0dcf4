//! Issuing and propagating orders down the hierarchy
//!
//! An order reaches a Leader and is re-issued to every member of its squad,
//! so a Commander's order flows through Leaders to their Units. Orders aimed
//! at an entity or objective become jittered tracking handles so a squad
//! sent to one place fans out instead of piling onto a single point.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::error::{CommandError, Result};
use crate::core::types::{planar_distance_squared, EntityId};
use crate::hierarchy::Registry;
use crate::objectives::ObjectiveBoard;
use crate::orders::order::{Order, OrderTarget, TrackAnchor, TrackingHandle};
use crate::simulation::events::{SimEventLog, SimEventType};

/// Below this squared distance a target counts as the unit's own position
const SELF_TARGET_EPSILON_SQ: f32 = 1e-4;

pub struct OrderDispatcher {
    rng: ChaCha8Rng,
    variation: f32,
}

impl OrderDispatcher {
    pub fn new(seed: u64, variation: f32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            variation,
        }
    }

    /// Give `order` to `unit`
    ///
    /// No-ops come back as errors and leave the unit untouched:
    /// `EntityDead` for dead units, `AlreadyAssigned` when the unit already
    /// holds the same kind and target, `InvalidTarget` when the target is
    /// the unit's own position. A missing target is an implicit Stop: the
    /// unit is halted and `InvalidTarget` is returned.
    pub fn issue(
        &mut self,
        registry: &mut Registry,
        board: &ObjectiveBoard,
        events: &mut SimEventLog,
        issuer: Option<EntityId>,
        unit: EntityId,
        order: Order,
    ) -> Result<()> {
        let core = registry.core(unit)?;
        if !core.alive {
            return Err(CommandError::EntityDead(unit));
        }
        let position = core.position;
        let current = core.current_order;
        let moving = core.is_moving();

        if order.is_stop() {
            let already_stopped = current.map(|o| o.is_stop()).unwrap_or(false) && !moving;
            if already_stopped {
                return Err(CommandError::AlreadyAssigned(unit));
            }
            stop(registry, events, issuer, unit);
            return Ok(());
        }

        let Some(target) = order.target else {
            stop(registry, events, issuer, unit);
            return Err(CommandError::InvalidTarget(unit));
        };

        let Some(target_position) = resolve_target(registry, board, target) else {
            stop(registry, events, issuer, unit);
            return Err(CommandError::InvalidTarget(unit));
        };

        let targets_self = matches!(target, OrderTarget::Entity(id) if id == unit)
            || planar_distance_squared(position, target_position) < SELF_TARGET_EPSILON_SQ;
        if targets_self {
            return Err(CommandError::InvalidTarget(unit));
        }

        if current.map(|c| c.same_command(&order)).unwrap_or(false) {
            return Err(CommandError::AlreadyAssigned(unit));
        }

        let handle = match target {
            OrderTarget::Point(point) => TrackingHandle::fixed(point),
            OrderTarget::Entity(id) => TrackingHandle {
                anchor: TrackAnchor::Entity(id),
                offset: self.jitter(),
            },
            OrderTarget::Objective(id) => TrackingHandle {
                anchor: TrackAnchor::Objective(id),
                offset: self.jitter(),
            },
        };

        let core = registry.core_mut(unit)?;
        core.current_order = Some(order);
        core.last_orderer = issuer;
        core.move_target = Some(handle);

        events.push(
            SimEventType::OrderIssued {
                unit,
                issuer,
                kind: order.kind,
            },
            format!("{:?} order for {}", order.kind, unit),
        );
        events.push(
            SimEventType::MoveTargetChanged { unit, issuer },
            format!("{} has a new movement target", unit),
        );
        Ok(())
    }

    /// Issue `order` to `recipient` and, if it leads a squad, on down to
    /// every member. Returns every unit whose order changed.
    pub fn propagate(
        &mut self,
        registry: &mut Registry,
        board: &ObjectiveBoard,
        events: &mut SimEventLog,
        issuer: Option<EntityId>,
        recipient: EntityId,
        order: Order,
    ) -> Vec<EntityId> {
        let mut changed = Vec::new();

        match self.issue(registry, board, events, issuer, recipient, order) {
            Ok(()) => changed.push(recipient),
            Err(e) => tracing::trace!("Order for {} not applied: {}", recipient, e),
        }

        for member in registry.members(recipient) {
            changed.extend(self.propagate(registry, board, events, Some(recipient), member, order));
        }

        changed
    }

    /// Horizontal offset with magnitude at most `variation`
    fn jitter(&mut self) -> Vec3 {
        if self.variation <= 0.0 {
            return Vec3::ZERO;
        }
        let angle = self.rng.gen_range(0.0..TAU);
        let radius = self.rng.gen_range(0.0..=self.variation);
        Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
    }
}

/// Halt `unit`: drop its movement target and record a Stop order
pub fn stop(
    registry: &mut Registry,
    events: &mut SimEventLog,
    issuer: Option<EntityId>,
    unit: EntityId,
) {
    let Ok(core) = registry.core_mut(unit) else {
        return;
    };
    let was_moving = core.is_moving();
    core.halt();
    core.last_orderer = issuer;

    events.push(
        SimEventType::OrderIssued {
            unit,
            issuer,
            kind: crate::orders::order::OrderKind::Stop,
        },
        format!("{} stopped", unit),
    );
    if was_moving {
        events.push(
            SimEventType::MoveTargetChanged { unit, issuer },
            format!("{} no longer has a movement target", unit),
        );
    }
}

/// Current world position of an order target
pub fn resolve_target(
    registry: &Registry,
    board: &ObjectiveBoard,
    target: OrderTarget,
) -> Option<Vec3> {
    match target {
        OrderTarget::Point(point) => Some(point),
        OrderTarget::Entity(id) => registry.position(id),
        OrderTarget::Objective(id) => board.position(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ObjectiveId, TeamColor};
    use crate::objectives::ObjectiveKind;
    use crate::orders::order::OrderKind;

    struct Fixture {
        registry: Registry,
        board: ObjectiveBoard,
        events: SimEventLog,
        dispatcher: OrderDispatcher,
        commander: EntityId,
        units: Vec<EntityId>,
        hill: ObjectiveId,
    }

    fn fixture(units: usize) -> Fixture {
        let mut registry = Registry::new(4);
        let commander = registry
            .spawn_commander("Red", TeamColor::Red, Vec3::ZERO, 100.0)
            .unwrap();
        let units = (0..units)
            .map(|i| {
                registry
                    .enlist(commander, format!("r{}", i), Vec3::new(i as f32, 0.0, 0.0), 100.0)
                    .unwrap()
            })
            .collect();
        let mut board = ObjectiveBoard::new();
        let hill = board.add(
            "Hill",
            ObjectiveKind::ControlPoint,
            Vec3::new(50.0, 0.0, 50.0),
            None,
        );
        Fixture {
            registry,
            board,
            events: SimEventLog::new(0),
            dispatcher: OrderDispatcher::new(7, 3.0),
            commander,
            units,
            hill,
        }
    }

    #[test]
    fn test_issue_sets_order_and_orderer() {
        let mut f = fixture(1);
        let order = Order::attack(OrderTarget::Objective(f.hill));

        f.dispatcher
            .issue(&mut f.registry, &f.board, &mut f.events, Some(f.commander), f.units[0], order)
            .unwrap();

        let core = f.registry.core(f.units[0]).unwrap();
        assert_eq!(core.current_order, Some(order));
        assert_eq!(core.last_orderer, Some(f.commander));
        assert!(core.is_moving());
        assert!(f
            .events
            .iter()
            .any(|e| matches!(e, SimEventType::MoveTargetChanged { issuer, .. } if *issuer == Some(f.commander))));
    }

    #[test]
    fn test_same_order_twice_is_noop() {
        let mut f = fixture(1);
        let order = Order::attack(OrderTarget::Objective(f.hill));
        f.dispatcher
            .issue(&mut f.registry, &f.board, &mut f.events, Some(f.commander), f.units[0], order)
            .unwrap();
        let handle = f.registry.core(f.units[0]).unwrap().move_target;
        let events_before = f.events.len();

        let again = f.dispatcher.issue(
            &mut f.registry,
            &f.board,
            &mut f.events,
            Some(f.commander),
            f.units[0],
            order,
        );

        assert!(matches!(again, Err(CommandError::AlreadyAssigned(_))));
        assert_eq!(f.registry.core(f.units[0]).unwrap().move_target, handle);
        assert_eq!(f.events.len(), events_before);
    }

    #[test]
    fn test_self_target_is_rejected() {
        let mut f = fixture(1);
        let here = f.registry.position(f.units[0]).unwrap();
        let result = f.dispatcher.issue(
            &mut f.registry,
            &f.board,
            &mut f.events,
            None,
            f.units[0],
            Order::move_to(here),
        );
        assert!(matches!(result, Err(CommandError::InvalidTarget(_))));
        assert!(!f.registry.core(f.units[0]).unwrap().is_moving());
    }

    #[test]
    fn test_missing_target_is_implicit_stop() {
        let mut f = fixture(1);
        f.dispatcher
            .issue(
                &mut f.registry,
                &f.board,
                &mut f.events,
                None,
                f.units[0],
                Order::move_to(Vec3::new(20.0, 0.0, 0.0)),
            )
            .unwrap();

        let bad = Order::new(OrderKind::Attack, None, Default::default());
        let result = f
            .dispatcher
            .issue(&mut f.registry, &f.board, &mut f.events, None, f.units[0], bad);

        assert!(matches!(result, Err(CommandError::InvalidTarget(_))));
        let core = f.registry.core(f.units[0]).unwrap();
        assert!(!core.is_moving());
        assert!(core.current_order.map(|o| o.is_stop()).unwrap_or(false));
    }

    #[test]
    fn test_dead_unit_ignores_orders() {
        let mut f = fixture(1);
        f.registry.core_mut(f.units[0]).unwrap().alive = false;
        let result = f.dispatcher.issue(
            &mut f.registry,
            &f.board,
            &mut f.events,
            None,
            f.units[0],
            Order::move_to(Vec3::new(20.0, 0.0, 0.0)),
        );
        assert!(matches!(result, Err(CommandError::EntityDead(_))));
        assert!(!f.registry.core(f.units[0]).unwrap().is_moving());
    }

    #[test]
    fn test_jitter_bounded() {
        let mut dispatcher = OrderDispatcher::new(1, 3.0);
        for _ in 0..200 {
            let offset = dispatcher.jitter();
            assert_eq!(offset.y, 0.0);
            assert!(offset.length() <= 3.0 + 1e-4);
        }
    }

    #[test]
    fn test_tracked_targets_fan_out() {
        let mut f = fixture(3);
        let order = Order::attack(OrderTarget::Objective(f.hill));
        for unit in f.units.clone() {
            f.dispatcher
                .issue(&mut f.registry, &f.board, &mut f.events, Some(f.commander), unit, order)
                .unwrap();
        }

        let offsets: Vec<Vec3> = f
            .units
            .iter()
            .map(|u| f.registry.core(*u).unwrap().move_target.unwrap().offset)
            .collect();
        assert_ne!(offsets[0], offsets[1]);
        assert_ne!(offsets[1], offsets[2]);
    }

    #[test]
    fn test_propagate_through_leader() {
        let mut f = fixture(3);
        let leader = f.units[0];
        f.registry.promote(leader, f.commander).unwrap();
        f.registry.register(f.units[1], leader).unwrap();
        f.registry.register(f.units[2], leader).unwrap();

        let order = Order::defend(OrderTarget::Objective(f.hill));
        let changed = f.dispatcher.propagate(
            &mut f.registry,
            &f.board,
            &mut f.events,
            Some(f.commander),
            leader,
            order,
        );

        assert_eq!(changed, vec![leader, f.units[1], f.units[2]]);
        assert_eq!(f.registry.core(leader).unwrap().last_orderer, Some(f.commander));
        assert_eq!(f.registry.core(f.units[1]).unwrap().last_orderer, Some(leader));
        assert_eq!(
            f.registry.core(f.units[2]).unwrap().current_order.map(|o| o.kind),
            Some(OrderKind::Defend)
        );
    }

    #[test]
    fn test_stop_clears_movement() {
        let mut f = fixture(1);
        f.dispatcher
            .issue(
                &mut f.registry,
                &f.board,
                &mut f.events,
                None,
                f.units[0],
                Order::move_to(Vec3::new(20.0, 0.0, 0.0)),
            )
            .unwrap();

        f.dispatcher
            .issue(&mut f.registry, &f.board, &mut f.events, None, f.units[0], Order::stop())
            .unwrap();
        assert!(!f.registry.core(f.units[0]).unwrap().is_moving());

        let again = f
            .dispatcher
            .issue(&mut f.registry, &f.board, &mut f.events, None, f.units[0], Order::stop());
        assert!(matches!(again, Err(CommandError::AlreadyAssigned(_))));
    }
}
