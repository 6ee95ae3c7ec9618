//! Client configuration.
//!
//! Everything tunable lives in [`ClientConfig`]: board calibration, the
//! entity type catalog, task timing, queue sizes and the local player's side.
//! Every field has a default matching the shipped arena, so a partial JSON
//! document (or `{}`) is a valid config.
//!
//! # Example
//!
//! ```
//! use arena_sync::config::ClientConfig;
//!
//! let config = ClientConfig::from_json_str(r#"{ "timing": { "hit_flash_secs": 0.5 } }"#).unwrap();
//! assert_eq!(config.timing.hit_flash_secs, 0.5);
//! assert_eq!(config.timing.move_duration_secs, 1.0);
//! assert_eq!(config.grid.rows, 30);
//! ```

use std::path::Path;

use arena_spatial::calibration::GridCalibration;
use arena_spatial::catalog::{default_descriptors, EntityTypeDescriptor};
use arena_spatial::mapper::{BoardSide, SpatialMapper};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Queue depth between delivery threads and the frame thread.
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

/// Upper bound on queued items applied in a single frame.
pub const DEFAULT_MAX_NOTIFICATIONS_PER_TICK: usize = 256;

// ---------------------------------------------------------------------------
// TimingConfig
// ---------------------------------------------------------------------------

/// Durations and rates for scheduled presentation tasks, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Length of the interpolation toward a moved unit's new cell.
    pub move_duration_secs: f32,
    /// How long a damaged unit stays tinted.
    pub hit_flash_secs: f32,
    /// Slerp factor per second when turning toward the travel direction.
    pub turn_rate: f32,
    /// Card art loads still pending after this fall back to a placeholder.
    pub art_timeout_secs: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            move_duration_secs: 1.0,
            hit_flash_secs: 0.2,
            turn_rate: 10.0,
            art_timeout_secs: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub grid: GridCalibration,
    pub entity_types: Vec<EntityTypeDescriptor>,
    pub timing: TimingConfig,
    pub inbox_capacity: usize,
    pub max_notifications_per_tick: usize,
    pub elixir_max: f32,
    pub hand_slots: usize,
    /// Half of the board the local player may deploy on.
    pub local_side: BoardSide,
    /// Destroy every entity once the match-end notification is shown.
    pub clear_on_match_end: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            grid: GridCalibration::default(),
            entity_types: default_descriptors(),
            timing: TimingConfig::default(),
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            max_notifications_per_tick: DEFAULT_MAX_NOTIFICATIONS_PER_TICK,
            elixir_max: 10.0,
            hand_slots: 4,
            local_side: BoardSide::Near,
            clear_on_match_end: true,
        }
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

impl ClientConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check value ranges and that the board and catalog build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("timing.move_duration_secs", self.timing.move_duration_secs)?;
        non_negative("timing.hit_flash_secs", self.timing.hit_flash_secs)?;
        non_negative("timing.turn_rate", self.timing.turn_rate)?;
        non_negative("timing.art_timeout_secs", self.timing.art_timeout_secs)?;

        if self.inbox_capacity == 0 {
            return Err(ConfigError::Invalid("inbox_capacity must be positive".into()));
        }
        if self.max_notifications_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "max_notifications_per_tick must be positive".into(),
            ));
        }
        if self.hand_slots == 0 {
            return Err(ConfigError::Invalid("hand_slots must be positive".into()));
        }
        if !(self.elixir_max.is_finite() && self.elixir_max > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "elixir_max must be positive, got {}",
                self.elixir_max
            )));
        }

        self.build_mapper()?;
        Ok(())
    }

    pub fn build_mapper(&self) -> Result<SpatialMapper, ConfigError> {
        Ok(SpatialMapper::from_parts(
            &self.grid,
            self.entity_types.iter().cloned(),
        )?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
