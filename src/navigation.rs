//! Spatial/navigation collaborator
//!
//! The core never pathfinds or raycasts itself; it asks a `Navigation`
//! implementation. `StraightLineNavigator` is the headless stand-in used by
//! the skirmish runner and tests: open ground, no obstacles.

use glam::Vec3;

use crate::core::types::planar_distance;
use crate::hierarchy::EntityCore;

pub trait Navigation {
    /// Travel distance between two points
    fn distance(&self, a: Vec3, b: Vec3) -> f32;

    /// Advance `mover` one tick toward `point`. Returns true once it has arrived.
    fn move_to(&mut self, mover: &mut EntityCore, point: Vec3) -> bool;

    /// Line of sight between two points
    fn is_visible(&self, from: Vec3, to: Vec3) -> bool;
}

/// Moves units in straight lines over flat, open ground
#[derive(Debug, Clone)]
pub struct StraightLineNavigator {
    /// Distance covered per tick
    pub step: f32,
    /// Within this distance a unit counts as arrived
    pub arrival_radius: f32,
    /// Beyond this distance nothing is visible
    pub sight_range: f32,
}

impl StraightLineNavigator {
    pub fn new(speed: f32, tick_seconds: f64) -> Self {
        Self {
            step: speed * tick_seconds as f32,
            arrival_radius: 0.5,
            sight_range: 60.0,
        }
    }
}

impl Navigation for StraightLineNavigator {
    fn distance(&self, a: Vec3, b: Vec3) -> f32 {
        planar_distance(a, b)
    }

    fn move_to(&mut self, mover: &mut EntityCore, point: Vec3) -> bool {
        let remaining = planar_distance(mover.position, point);
        if remaining <= self.arrival_radius {
            return true;
        }

        if remaining <= self.step {
            mover.position = Vec3::new(point.x, mover.position.y, point.z);
            return true;
        }

        let mut direction = point - mover.position;
        direction.y = 0.0;
        mover.position += direction.normalize_or_zero() * self.step;
        false
    }

    fn is_visible(&self, from: Vec3, to: Vec3) -> bool {
        planar_distance(from, to) <= self.sight_range
    }
}
