use thiserror::Error;

use crate::core::types::{EntityId, ObjectiveId};
use crate::hierarchy::RankKind;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Leader capacity reached ({max} leaders)")]
    CapacityExceeded { max: usize },

    #[error("Invalid order target for {0}")]
    InvalidTarget(EntityId),

    #[error("Entity not registered: {0}")]
    NotRegistered(EntityId),

    #[error("Already assigned: {0}")]
    AlreadyAssigned(EntityId),

    #[error("Entity {0} has no squad")]
    NotALeader(EntityId),

    #[error("Entity {id} has rank {actual:?}, expected {expected:?}")]
    RankMismatch {
        id: EntityId,
        expected: RankKind,
        actual: RankKind,
    },

    #[error("Entity is dead: {0}")]
    EntityDead(EntityId),

    #[error("Objective {0} is locked in its capture sequence")]
    ObjectiveLocked(ObjectiveId),

    #[error("Objective not found: {0}")]
    UnknownObjective(ObjectiveId),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
