//! Configuration system.
//!
//! Simulation settings, parsed from JSON. Reading the file is the binary's job.

use serde::{Deserialize, Serialize};

use crate::physics::{PhysicsConfig, FALLBACK_RADIUS};

/// Playfield size used for bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seconds per simulation step.
    #[serde(default = "default_fixed_time_step")]
    pub fixed_time_step: f64,
    /// Most fixed steps run for a single frame callback.
    #[serde(default = "default_max_frame_skip")]
    pub max_frame_skip: u32,
    /// Downward acceleration, units/s^2.
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_fallback_radius")]
    pub fallback_radius: f32,
    /// Run the generic pairwise contact scan in addition to typed checks.
    #[serde(default)]
    pub collision_scan: bool,
    #[serde(default)]
    pub viewport: Viewport,
    /// Path to level JSON directory.
    #[serde(default = "default_levels_dir")]
    pub levels_dir: String,
    #[serde(default = "default_start_level")]
    pub start_level: u32,
}

fn default_fixed_time_step() -> f64 {
    1.0 / 60.0
}

fn default_max_frame_skip() -> u32 {
    5
}

fn default_gravity() -> f32 {
    980.0
}

fn default_fallback_radius() -> f32 {
    FALLBACK_RADIUS
}

fn default_levels_dir() -> String {
    "levels".to_string()
}

fn default_start_level() -> u32 {
    1
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: default_fixed_time_step(),
            max_frame_skip: default_max_frame_skip(),
            gravity: default_gravity(),
            fallback_radius: default_fallback_radius(),
            collision_scan: false,
            viewport: Viewport::default(),
            levels_dir: default_levels_dir(),
            start_level: default_start_level(),
        }
    }
}

impl SimConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn physics(&self) -> PhysicsConfig {
        PhysicsConfig {
            gravity: self.gravity,
            fallback_radius: self.fallback_radius,
            collision_scan: self.collision_scan,
        }
    }
}
