//! Command simulation configuration
//!
//! Every tunable number the hierarchy, order, objective and allocation
//! systems read lives here. Values default to `core::constants` and can be
//! overridden from a TOML file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::constants::*;
use crate::core::error::{CommandError, Result};

/// Configuration for one simulation instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    // === HIERARCHY ===
    /// Maximum number of promoted leaders per commander
    pub max_leader_count: usize,

    // === ALLOCATION ===
    /// Share of the roster committed to a lone defend objective
    pub min_defenders_percentage: f32,

    /// Share of the roster committed to a lone attack objective
    pub max_attackers_percentage: f32,

    /// Reduced share used when one objective competes with several
    /// at-risk objectives, holding the rest in reserve
    pub split_defenders_percentage: f32,

    /// At-risk objectives closer than this to an already-covered objective
    /// are not flagged separately
    pub too_far_away_to_respond: f32,

    /// How often a commander re-evaluates its squad allocation
    pub allocation_recheck_seconds: f64,

    /// Run each team's planner on the recheck timer. When off, allocation
    /// happens only through explicit calls from the AI layer.
    pub auto_allocate: bool,

    // === ORDERS / MOVEMENT ===
    /// Maximum horizontal jitter applied to tracked order targets
    pub random_target_variation: f32,

    /// Unit movement speed (world units per second)
    pub unit_speed: f32,

    // === OBJECTIVES ===
    /// Distance at which a unit is considered inside an objective
    pub contact_radius: f32,

    /// Seconds attackers must hold a control point uncontested
    pub control_point_capture_seconds: f64,

    /// Seconds before a dropped or captured flag returns home
    pub flag_reset_seconds: f64,

    // === LIFECYCLE ===
    pub max_health: f32,
    pub respawn_seconds: f64,

    // === TIME ===
    /// Length of one simulation tick
    pub tick_seconds: f64,

    /// Seed for order target jitter
    pub seed: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            max_leader_count: MAX_LEADER_COUNT,
            min_defenders_percentage: MIN_DEFENDERS_PERCENTAGE,
            max_attackers_percentage: MAX_ATTACKERS_PERCENTAGE,
            split_defenders_percentage: SPLIT_DEFENDERS_PERCENTAGE,
            too_far_away_to_respond: TOO_FAR_AWAY_TO_RESPOND_AMOUNT,
            allocation_recheck_seconds: ALLOCATION_RECHECK_SECONDS,
            auto_allocate: true,
            random_target_variation: RANDOM_TARGET_VARIATION,
            unit_speed: UNIT_SPEED,
            contact_radius: CONTACT_RADIUS,
            control_point_capture_seconds: CONTROL_POINT_CAPTURE_SECONDS,
            flag_reset_seconds: FLAG_RESET_SECONDS,
            max_health: MAX_HEALTH,
            respawn_seconds: RESPAWN_SECONDS,
            tick_seconds: TICK_SECONDS,
            seed: 42,
        }
    }
}

impl CommandConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CommandConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, e.g. `data/command.toml`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_leader_count == 0 {
            return Err(CommandError::InvalidConfig(
                "max_leader_count must be at least 1".into(),
            ));
        }

        for (name, value) in [
            ("min_defenders_percentage", self.min_defenders_percentage),
            ("max_attackers_percentage", self.max_attackers_percentage),
            ("split_defenders_percentage", self.split_defenders_percentage),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CommandError::InvalidConfig(format!(
                    "{} ({}) must be within [0, 1]",
                    name, value
                )));
            }
        }

        if self.tick_seconds <= 0.0 || self.allocation_recheck_seconds <= 0.0 {
            return Err(CommandError::InvalidConfig(
                "tick_seconds and allocation_recheck_seconds must be positive".into(),
            ));
        }

        if self.random_target_variation < 0.0 || self.contact_radius <= 0.0 {
            return Err(CommandError::InvalidConfig(format!(
                "random_target_variation ({}) must be >= 0 and contact_radius ({}) > 0",
                self.random_target_variation, self.contact_radius
            )));
        }

        Ok(())
    }
}
