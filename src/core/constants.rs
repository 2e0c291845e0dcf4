//! Command simulation constants - default tunable values in one place
//!
//! `CommandConfig::default()` is built from these; a TOML file can override
//! any of them per run.

// Hierarchy
pub const MAX_LEADER_COUNT: usize = 4;

// Allocation ratios (fraction of the team roster)
pub const MIN_DEFENDERS_PERCENTAGE: f32 = 0.2;
pub const MAX_ATTACKERS_PERCENTAGE: f32 = 0.8;
pub const SPLIT_DEFENDERS_PERCENTAGE: f32 = 0.4;

// Distances (world units)
pub const TOO_FAR_AWAY_TO_RESPOND_AMOUNT: f32 = 40.0;
pub const RANDOM_TARGET_VARIATION: f32 = 3.0;
pub const CONTACT_RADIUS: f32 = 4.0;

// Time (seconds)
pub const TICK_SECONDS: f64 = 0.1;
pub const ALLOCATION_RECHECK_SECONDS: f64 = 5.0;
pub const FLAG_RESET_SECONDS: f64 = 30.0;
pub const RESPAWN_SECONDS: f64 = 10.0;
pub const CONTROL_POINT_CAPTURE_SECONDS: f64 = 8.0;

// Units
pub const MAX_HEALTH: f32 = 100.0;
pub const UNIT_SPEED: f32 = 6.0; // world units per second

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_ordered() {
        assert!(MIN_DEFENDERS_PERCENTAGE < SPLIT_DEFENDERS_PERCENTAGE);
        assert!(SPLIT_DEFENDERS_PERCENTAGE < MAX_ATTACKERS_PERCENTAGE);
        assert!(MAX_ATTACKERS_PERCENTAGE <= 1.0);
    }

    #[test]
    fn test_jitter_smaller_than_response_range() {
        assert!(RANDOM_TARGET_VARIATION < TOO_FAR_AWAY_TO_RESPOND_AMOUNT);
    }

    #[test]
    fn test_recheck_slower_than_tick() {
        assert!(ALLOCATION_RECHECK_SECONDS > TICK_SECONDS);
    }
}
