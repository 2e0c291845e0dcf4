//! Orders as data
//!
//! An order is immutable once issued. A new order replaces the old one; the
//! receiver only records a derived tracking handle next to it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ObjectiveId};

/// What the order asks the unit to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Move,
    Attack,
    Defend,
    Stop,
}

/// What the order is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderTarget {
    Point(Vec3),
    Entity(EntityId),
    Objective(ObjectiveId),
}

/// How eagerly a unit may leave its destination to fight
///
/// Only stored and forwarded here; the combat collaborator arbitrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum MovementDiscipline {
    /// Ignore distractions
    Strict,
    /// React only if attacked
    #[default]
    DefendSelf,
    /// Engage on sight
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub kind: OrderKind,
    pub target: Option<OrderTarget>,
    pub discipline: MovementDiscipline,
}

impl Order {
    pub fn new(kind: OrderKind, target: Option<OrderTarget>, discipline: MovementDiscipline) -> Self {
        Self {
            kind,
            target,
            discipline,
        }
    }

    pub fn move_to(point: Vec3) -> Self {
        Self::new(
            OrderKind::Move,
            Some(OrderTarget::Point(point)),
            MovementDiscipline::DefendSelf,
        )
    }

    pub fn attack(target: OrderTarget) -> Self {
        Self::new(OrderKind::Attack, Some(target), MovementDiscipline::Loose)
    }

    pub fn defend(target: OrderTarget) -> Self {
        Self::new(OrderKind::Defend, Some(target), MovementDiscipline::DefendSelf)
    }

    pub fn stop() -> Self {
        Self::new(OrderKind::Stop, None, MovementDiscipline::DefendSelf)
    }

    pub fn with_discipline(mut self, discipline: MovementDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn is_stop(&self) -> bool {
        self.kind == OrderKind::Stop
    }

    /// Same kind and same target; discipline is not part of the identity
    pub fn same_command(&self, other: &Order) -> bool {
        self.kind == other.kind && self.target == other.target
    }

    /// The objective this order is aimed at, if any
    pub fn objective(&self) -> Option<ObjectiveId> {
        match self.target {
            Some(OrderTarget::Objective(id)) => Some(id),
            _ => None,
        }
    }
}

/// What a tracking handle follows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrackAnchor {
    Fixed(Vec3),
    Entity(EntityId),
    Objective(ObjectiveId),
}

/// Derived movement target: follows its anchor, offset by horizontal jitter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingHandle {
    pub anchor: TrackAnchor,
    pub offset: Vec3,
}

impl TrackingHandle {
    pub fn fixed(point: Vec3) -> Self {
        Self {
            anchor: TrackAnchor::Fixed(point),
            offset: Vec3::ZERO,
        }
    }

    /// Current point to move towards, or None if the anchor no longer exists
    pub fn resolve(
        &self,
        entity_position: impl Fn(EntityId) -> Option<Vec3>,
        objective_position: impl Fn(ObjectiveId) -> Option<Vec3>,
    ) -> Option<Vec3> {
        let base = match self.anchor {
            TrackAnchor::Fixed(point) => point,
            TrackAnchor::Entity(id) => entity_position(id)?,
            TrackAnchor::Objective(id) => objective_position(id)?,
        };
        Some(base + self.offset)
    }
}
