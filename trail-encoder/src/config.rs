//! Encoder configuration types
//!
//! This module defines the knobs shared by the encoder and the renderer.
//! Transport and output settings live in the application layer (trail-cli).

use crate::types::{EncoderError, Result};
use serde::{Deserialize, Serialize};

/// Smallest side count that still draws a polygon
pub const MIN_SIDES: u32 = 3;

/// Largest accepted `shape_base`; leaves ids free for later types
pub const MAX_SHAPE_BASE: u32 = u16::MAX as u32;

/// Configuration for encoding and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Side count assigned to the first type seen; later types count up from here
    #[serde(default = "default_shape_base")]
    pub shape_base: u32,

    /// Radius of each drawn polygon, in surface units
    #[serde(default = "default_radius")]
    pub marker_radius: f64,

    /// Pointer distance below which a row counts as hit
    #[serde(default = "default_radius")]
    pub hit_radius: f64,

    /// Optional: seed for property colors (unset = fresh colors every run)
    #[serde(default)]
    pub color_seed: Option<u64>,

    /// Whether to draw the line from each row to its successor
    #[serde(default = "default_true")]
    pub draw_trails: bool,
}

fn default_shape_base() -> u32 {
    MIN_SIDES
}

fn default_radius() -> f64 {
    5.0
}

fn default_true() -> bool {
    true
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            shape_base: default_shape_base(),
            marker_radius: default_radius(),
            hit_radius: default_radius(),
            color_seed: None,
            draw_trails: true,
        }
    }
}

impl EncoderConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the first shape id handed out
    pub fn with_shape_base(mut self, base: u32) -> Self {
        self.shape_base = base;
        self
    }

    /// Builder method: set the polygon radius
    pub fn with_marker_radius(mut self, radius: f64) -> Self {
        self.marker_radius = radius;
        self
    }

    /// Builder method: set the hit-test threshold
    pub fn with_hit_radius(mut self, radius: f64) -> Self {
        self.hit_radius = radius;
        self
    }

    /// Builder method: make color assignment reproducible
    pub fn with_color_seed(mut self, seed: u64) -> Self {
        self.color_seed = Some(seed);
        self
    }

    /// Builder method: enable or disable successor lines
    pub fn with_trails(mut self, enabled: bool) -> Self {
        self.draw_trails = enabled;
        self
    }

    /// Reject settings the encoder or renderer cannot honour
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SIDES..=MAX_SHAPE_BASE).contains(&self.shape_base) {
            return Err(EncoderError::InvalidConfig(format!(
                "shape_base must be between {} and {}, got {}",
                MIN_SIDES, MAX_SHAPE_BASE, self.shape_base
            )));
        }
        for (name, value) in [
            ("marker_radius", self.marker_radius),
            ("hit_radius", self.hit_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EncoderError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
