//! Rollhound tunables (per-agent component) and RON loading.
//!
//! Every agent carries its own [`RollhoundConfig`]; replicas inherit the
//! parent's copy. Defaults are tuned for a ~1 kg rapier ball on a 60 Hz tick.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Параметры rollhound (все настраиваются извне)
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollhoundConfig {
    /// Primary rolling torque (scaled by 0.6 when applied)
    pub base_torque: f32,
    /// Gain of the anti-orbit correction torque.
    ///
    /// Too low: the agent orbits its target. Too high: jittery beelining.
    pub correction_torque: f32,
    /// Planar radius inside which players are targetable
    pub max_target_range: f32,
    /// Knockback impulse along the contact normal
    pub self_knockback_force: f32,
    /// Fixed vertical component of every knockback impulse
    pub knockback_lift: f32,
    /// Forward force while the post-jump assist window is open
    pub leap_force: f32,
    /// Upward jump impulse
    pub jump_force: f32,
    /// Seconds between jump attempts (before jitter)
    pub jump_interval: f32,
    /// Jitter applied to the attempt timer after each attempt (±)
    pub jump_attempt_jitter: f32,
    /// Seconds after a jump during which the leap force is applied
    pub jump_assist_window: f32,
    /// Distance along the route used to sample terrain slope
    pub lookahead_distance: f32,
    /// Damage dealt per qualifying contact
    pub damage_amount: u32,
    /// Seconds between target re-evaluations
    pub target_interval: f32,
    /// Seconds between route refreshes
    pub path_update_interval: f32,
    /// Minimum seconds between two contact reactions
    pub replication_cooldown: f32,
}

impl Default for RollhoundConfig {
    fn default() -> Self {
        Self {
            base_torque: 20.0,
            correction_torque: 2.0,
            max_target_range: 4096.0,
            self_knockback_force: 8.0,
            knockback_lift: 12.0,
            leap_force: 10.0,
            jump_force: 6.0,
            jump_interval: 2.0,
            jump_attempt_jitter: 0.6,
            jump_assist_window: 1.0,
            lookahead_distance: 2.0,
            damage_amount: 10,
            target_interval: 5.0,
            path_update_interval: 0.5,
            replication_cooldown: 3.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rollhound config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

impl RollhoundConfig {
    /// Parse a RON document; missing fields fall back to defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&source)
    }

    /// Load from `path`, logging and falling back to defaults on failure.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                crate::logger::log_error(&format!("Rollhound config rejected: {}", err));
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("base_torque", self.base_torque),
            ("correction_torque", self.correction_torque),
            ("max_target_range", self.max_target_range),
            ("self_knockback_force", self.self_knockback_force),
            ("leap_force", self.leap_force),
            ("jump_force", self.jump_force),
            ("jump_interval", self.jump_interval),
            ("jump_attempt_jitter", self.jump_attempt_jitter),
            ("jump_assist_window", self.jump_assist_window),
            ("lookahead_distance", self.lookahead_distance),
            ("target_interval", self.target_interval),
            ("path_update_interval", self.path_update_interval),
            ("replication_cooldown", self.replication_cooldown),
        ];

        for (field, value) in non_negative {
            if !value.is_finite() {
                return Err(ConfigError::Invalid { field, reason: "must be finite" });
            }
            if value < 0.0 {
                return Err(ConfigError::Invalid { field, reason: "must not be negative" });
            }
        }

        if !self.knockback_lift.is_finite() {
            return Err(ConfigError::Invalid {
                field: "knockback_lift",
                reason: "must be finite",
            });
        }

        Ok(())
    }

    pub fn max_target_range_squared(&self) -> f32 {
        self.max_target_range * self.max_target_range
    }
}
