//! Core type definitions used throughout the codebase

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Unique identifier for entities
///
/// Allocated by the registry from a monotonic counter; never reused, even
/// after the entity is despawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for objectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectiveId(pub u32);

impl fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj{}", self.0)
    }
}

/// Identifier for a multi-stage capture sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub u32);

/// Simulation tick counter
pub type Tick = u64;

/// Simulated time in seconds
pub type SimTime = f64;

/// Team color tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TeamColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TeamColor::Red => "red",
            TeamColor::Blue => "blue",
            TeamColor::Green => "green",
            TeamColor::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

/// Squared distance on the horizontal (X/Z) plane
///
/// Height is ignored: a unit on a ledge above an objective is as close to it
/// as one standing beside it.
pub fn planar_distance_squared(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Straight-line distance on the horizontal plane
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar_distance_squared(a, b).sqrt()
}
