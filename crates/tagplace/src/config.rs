//! JSON configuration for the pipeline.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagplace_core::{MarkerId, TrackingState};
use tagplace_placement::{
    Binding, BindingTable, InterpolationSpeed, PlacementMode, SlowPlacer,
};

use crate::{ConfigError, TagplaceIoError};

fn default_marker_size_m() -> f32 {
    0.05
}

fn default_smoothing_factor() -> f32 {
    0.8
}

fn default_initial_mode() -> PlacementMode {
    PlacementMode::OnDemand
}

fn default_true() -> bool {
    true
}

fn default_sample_interval_ms() -> u64 {
    300
}

fn default_linear_speed_mps() -> f32 {
    0.5
}

fn default_angular_speed_deg_s() -> f32 {
    90.0
}

/// Slow-placing sampler and interpolator settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlowPlacingConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    #[serde(default = "default_linear_speed_mps")]
    pub linear_speed_mps: f32,
    #[serde(default = "default_angular_speed_deg_s")]
    pub angular_speed_deg_s: f32,
    /// Blend sampled poses with the smoothing history.
    #[serde(default)]
    pub apply_smoothing: bool,
}

impl Default for SlowPlacingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            linear_speed_mps: default_linear_speed_mps(),
            angular_speed_deg_s: default_angular_speed_deg_s(),
            apply_smoothing: false,
        }
    }
}

/// Named zone inclusion lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Zone {
    Red,
    Green,
}

/// Red/green marker allowlists used by calibration routines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLists {
    #[serde(default)]
    pub red: BTreeSet<MarkerId>,
    #[serde(default)]
    pub green: BTreeSet<MarkerId>,
}

impl ZoneLists {
    pub fn ids(&self, zone: Zone) -> &BTreeSet<MarkerId> {
        match zone {
            Zone::Red => &self.red,
            Zone::Green => &self.green,
        }
    }
}

/// Static pipeline configuration, loaded once at initialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Physical side length of the printed markers.
    #[serde(default = "default_marker_size_m")]
    pub marker_size_m: f32,
    /// Weight of the previous pose in `[0, 1)`.
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f32,
    /// Smooth poses during auto placement. Off: entities snap to raw poses.
    #[serde(default)]
    pub auto_place_smoothing: bool,
    /// Allowlist for auto placement driven by [`crate::TagPipeline::update`].
    #[serde(default)]
    pub auto_place_included: Option<BTreeSet<MarkerId>>,
    #[serde(default = "default_initial_mode")]
    pub initial_mode: PlacementMode,
    #[serde(default = "default_true")]
    pub deactivate_unfound: bool,
    #[serde(default)]
    pub slow_placing: SlowPlacingConfig,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub zones: ZoneLists,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            marker_size_m: default_marker_size_m(),
            smoothing_factor: default_smoothing_factor(),
            auto_place_smoothing: false,
            auto_place_included: None,
            initial_mode: default_initial_mode(),
            deactivate_unfound: true,
            slow_placing: SlowPlacingConfig::default(),
            bindings: Vec::new(),
            zones: ZoneLists::default(),
        }
    }
}

/// Validated runtime parts built from a config.
pub(crate) struct ConfigParts {
    pub tracking: TrackingState,
    pub bindings: BindingTable,
    pub slow: SlowPlacer,
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TagplaceIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TagplaceIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.slow_placing.sample_interval_ms)
    }

    /// Check every value without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_parts().map(|_| ())
    }

    pub(crate) fn build_parts(&self) -> Result<ConfigParts, ConfigError> {
        if !self.marker_size_m.is_finite() || self.marker_size_m <= 0.0 {
            return Err(ConfigError::InvalidMarkerSize(self.marker_size_m));
        }
        let tracking = TrackingState::new(self.smoothing_factor)?;
        let bindings = BindingTable::new(self.bindings.iter().cloned())?;
        let speed = InterpolationSpeed::new(
            self.slow_placing.linear_speed_mps,
            self.slow_placing.angular_speed_deg_s,
        )?;
        let slow = SlowPlacer::new(self.sample_interval(), speed)?;
        Ok(ConfigParts {
            tracking,
            bindings,
            slow,
        })
    }
}
