//! Contestable map objectives

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ObjectiveId, SequenceId};

/// Objective flavours; each adds its own rule on contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveKind {
    /// Captured by holding it uncontested for a while
    ControlPoint,
    /// A team's base; captures an enemy flag brought home
    HomeBase,
    /// Carried off by an enemy unit and scored at its home base
    Flag,
}

impl ObjectiveKind {
    /// Contestable regardless of capture index
    pub fn always_contestable(&self) -> bool {
        matches!(self, ObjectiveKind::HomeBase)
    }
}

/// Which contestant list a unit joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContestSide {
    Attacking,
    Defending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub name: String,
    pub kind: ObjectiveKind,
    /// Owning commander; None is neutral
    pub owner: Option<EntityId>,
    /// 0 = capturable now; nonzero = waiting on a prerequisite in its sequence
    pub capture_index: i32,
    pub sequence: Option<SequenceId>,
    pub attackers: Vec<EntityId>,
    pub defenders: Vec<EntityId>,
    pub position: Vec3,

    // Reset state
    pub initial_owner: Option<EntityId>,
    pub initial_position: Vec3,

    // Kind-specific state
    pub carrier: Option<EntityId>,
    pub capture_progress: f64,
}

impl Objective {
    pub fn new(
        id: ObjectiveId,
        name: impl Into<String>,
        kind: ObjectiveKind,
        position: Vec3,
        owner: Option<EntityId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            owner,
            capture_index: 0,
            sequence: None,
            attackers: Vec::new(),
            defenders: Vec::new(),
            position,
            initial_owner: owner,
            initial_position: position,
            carrier: None,
            capture_progress: 0.0,
        }
    }

    /// Can a unit entering it be classified as a contestant?
    pub fn is_contestable(&self) -> bool {
        self.capture_index == 0 || self.kind.always_contestable()
    }

    /// One capture step away from becoming contestable
    pub fn is_at_risk(&self) -> bool {
        self.capture_index.abs() == 1
    }

    pub fn side_of(&self, unit: EntityId) -> Option<ContestSide> {
        if self.attackers.contains(&unit) {
            Some(ContestSide::Attacking)
        } else if self.defenders.contains(&unit) {
            Some(ContestSide::Defending)
        } else {
            None
        }
    }

    pub fn contestants(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.attackers.iter().chain(self.defenders.iter()).copied()
    }

    /// A flag lying somewhere other than its home
    pub fn is_displaced(&self) -> bool {
        self.kind == ObjectiveKind::Flag && self.position != self.initial_position
    }
}

/// Every objective on the map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectiveBoard {
    objectives: BTreeMap<ObjectiveId, Objective>,
    next_id: u32,
}

impl ObjectiveBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        kind: ObjectiveKind,
        position: Vec3,
        owner: Option<EntityId>,
    ) -> ObjectiveId {
        let id = ObjectiveId(self.next_id);
        self.next_id += 1;
        self.objectives
            .insert(id, Objective::new(id, name, kind, position, owner));
        id
    }

    /// Place an objective in a capture sequence at `capture_index`
    pub fn set_sequence(&mut self, id: ObjectiveId, sequence: SequenceId, capture_index: i32) {
        if let Some(objective) = self.objectives.get_mut(&id) {
            objective.sequence = Some(sequence);
            objective.capture_index = capture_index;
        }
    }

    pub fn get(&self, id: ObjectiveId) -> Option<&Objective> {
        self.objectives.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectiveId) -> Option<&mut Objective> {
        self.objectives.get_mut(&id)
    }

    pub fn position(&self, id: ObjectiveId) -> Option<Vec3> {
        self.get(id).map(|o| o.position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Objective> {
        self.objectives.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Objective> {
        self.objectives.values_mut()
    }

    pub fn ids(&self) -> Vec<ObjectiveId> {
        self.objectives.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn sequence_members(&self, sequence: SequenceId) -> Vec<ObjectiveId> {
        self.objectives
            .values()
            .filter(|o| o.sequence == Some(sequence))
            .map(|o| o.id)
            .collect()
    }

    /// Objectives currently being contested by `unit`
    pub fn contested_by(&self, unit: EntityId) -> Vec<ObjectiveId> {
        self.objectives
            .values()
            .filter(|o| o.side_of(unit).is_some())
            .map(|o| o.id)
            .collect()
    }

    /// Keep carried flags on top of their carriers
    pub fn follow_carriers(&mut self, carrier_position: impl Fn(EntityId) -> Option<Vec3>) {
        for objective in self.objectives.values_mut() {
            if let Some(pos) = objective.carrier.and_then(&carrier_position) {
                objective.position = pos;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_index_gates_contest() {
        let mut board = ObjectiveBoard::new();
        let point = board.add("Mill", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        let base = board.add("Red Base", ObjectiveKind::HomeBase, Vec3::ZERO, None);

        board.set_sequence(point, SequenceId(1), 2);
        board.set_sequence(base, SequenceId(1), 2);

        assert!(!board.get(point).unwrap().is_contestable());
        assert!(board.get(base).unwrap().is_contestable());
    }

    #[test]
    fn test_at_risk_either_sign() {
        let mut objective = Objective::new(
            ObjectiveId(0),
            "Bridge",
            ObjectiveKind::ControlPoint,
            Vec3::ZERO,
            None,
        );
        objective.capture_index = -1;
        assert!(objective.is_at_risk());
        objective.capture_index = 1;
        assert!(objective.is_at_risk());
        objective.capture_index = 2;
        assert!(!objective.is_at_risk());
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut board = ObjectiveBoard::new();
        let a = board.add("A", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        let b = board.add("B", ObjectiveKind::ControlPoint, Vec3::ZERO, None);
        assert_eq!(a, ObjectiveId(0));
        assert_eq!(b, ObjectiveId(1));
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_flag_follows_carrier() {
        let mut board = ObjectiveBoard::new();
        let flag = board.add("Red Flag", ObjectiveKind::Flag, Vec3::ZERO, None);
        board.get_mut(flag).unwrap().carrier = Some(EntityId(7));

        board.follow_carriers(|_| Some(Vec3::new(5.0, 0.0, 5.0)));

        let flag = board.get(flag).unwrap();
        assert_eq!(flag.position, Vec3::new(5.0, 0.0, 5.0));
        assert!(flag.is_displaced());
    }
}
