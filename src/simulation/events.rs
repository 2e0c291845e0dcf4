//! Notifications the core emits toward its collaborators
//!
//! Rendering, audio and the AI layer read these after each tick; the core
//! never waits on them.

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ObjectiveId, SequenceId, Tick};
use crate::orders::order::OrderKind;

/// Log entry for simulation events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: Tick,
    pub event_type: SimEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEventType {
    // Orders
    OrderIssued {
        unit: EntityId,
        issuer: Option<EntityId>,
        kind: OrderKind,
    },
    /// Sent to the issuer whenever a unit's movement target changes
    MoveTargetChanged {
        unit: EntityId,
        issuer: Option<EntityId>,
    },
    DestinationReached {
        unit: EntityId,
        issuer: Option<EntityId>,
    },

    // Hierarchy
    Promoted {
        unit: EntityId,
        commander: EntityId,
    },
    Demoted {
        unit: EntityId,
        commander: EntityId,
    },
    Reassigned {
        unit: EntityId,
        from: Option<EntityId>,
        to: EntityId,
    },

    // Objectives
    ContestStarted {
        unit: EntityId,
        objective: ObjectiveId,
        defending: bool,
    },
    ContestEnded {
        unit: EntityId,
        objective: ObjectiveId,
    },
    ObjectiveCaptured {
        objective: ObjectiveId,
        unit: EntityId,
        commander: EntityId,
    },
    SequenceAdvanced {
        sequence: SequenceId,
    },
    FlagTaken {
        flag: ObjectiveId,
        carrier: EntityId,
    },
    FlagDropped {
        flag: ObjectiveId,
        carrier: EntityId,
    },
    FlagReturned {
        flag: ObjectiveId,
        unit: EntityId,
    },
    FlagReset {
        flag: ObjectiveId,
    },

    // Allocation
    ObjectiveAllocated {
        commander: EntityId,
        objective: ObjectiveId,
        leader: EntityId,
    },
    ObjectivesUncovered {
        commander: EntityId,
        objectives: Vec<ObjectiveId>,
    },

    // Lifecycle
    UnitDied {
        unit: EntityId,
    },
    UnitRespawned {
        unit: EntityId,
    },
    UnitDespawned {
        unit: EntityId,
    },
}

/// Log of events from a single tick
#[derive(Debug, Clone, Default)]
pub struct SimEventLog {
    pub tick: Tick,
    pub events: Vec<SimEvent>,
}

impl SimEventLog {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event_type: SimEventType, description: String) {
        self.events.push(SimEvent {
            tick: self.tick,
            event_type,
            description,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEventType> {
        self.events.iter().map(|e| &e.event_type)
    }

    /// Move every event of `other` into this log
    pub fn append(&mut self, other: &mut SimEventLog) {
        self.events.append(&mut other.events);
    }
}
