//! Command hierarchy: Commander → Leaders → Units
//!
//! A Commander roots each team. Units report to exactly one superior (a
//! Leader or the Commander); Leaders are promoted Units that run a squad.

pub mod entity;
pub mod rank;
pub mod registry;

pub use entity::{Command, Entity, EntityCore, Rank, RankKind, Squad};
pub use registry::Registry;
