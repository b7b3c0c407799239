//! Core types for the trail encoder library
//!
//! This module defines the observation records the encoder consumes, the
//! enriched rows it emits, and the error type shared by every operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for encoder operations
pub type Result<T> = std::result::Result<T, EncoderError>;

/// A single point observation as delivered by a transport
///
/// Observations are immutable once received. Their position in the input
/// sequence is their arrival order, which is what "later" means for successor
/// linking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<K = String> {
    /// Horizontal coordinate in surface units
    pub x: f64,
    /// Vertical coordinate in surface units
    pub y: f64,
    /// Categorical tag encoded as polygon shape
    #[serde(rename = "type")]
    pub kind: K,
    /// Categorical tag encoded as fill color
    pub prop: K,
}

impl<K> Observation<K> {
    /// Create a new observation
    pub fn new(x: f64, y: f64, kind: K, prop: K) -> Self {
        Self { x, y, kind, prop }
    }

    /// Euclidean distance from this observation to a point
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

impl<K: PartialEq> Observation<K> {
    /// True if both tags match the other observation's tags
    pub fn same_series(&self, other: &Observation<K>) -> bool {
        self.kind == other.kind && self.prop == other.prop
    }
}

impl<K: fmt::Display> fmt::Display for Observation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={} y={} type={} prop={}",
            self.x, self.y, self.kind, self.prop
        )
    }
}

/// An observation plus the index of its successor in the same row sequence
///
/// The successor is a non-owning link: it indexes into the `rows` vector the
/// row belongs to. `None` means no later row shares this row's (type, prop).
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedObservation<K = String> {
    pub observation: Observation<K>,
    pub successor: Option<usize>,
}

impl<K> EnrichedObservation<K> {
    pub fn x(&self) -> f64 {
        self.observation.x
    }

    pub fn y(&self) -> f64 {
        self.observation.y
    }

    pub fn kind(&self) -> &K {
        &self.observation.kind
    }

    pub fn prop(&self) -> &K {
        &self.observation.prop
    }
}

/// Errors that can occur while ingesting, encoding or rendering
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    #[error("Malformed feed frame: {0}")]
    MalformedFrame(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Non-finite coordinate: {0}")]
    NonFiniteCoordinate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EncoderError {
    /// True if this error only affects a single record
    ///
    /// Record-level errors drop the affected row; the rest of the batch is
    /// still usable.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            EncoderError::MalformedFrame(_)
                | EncoderError::MalformedRow { .. }
                | EncoderError::NonFiniteCoordinate(_)
        )
    }
}

/// Check that a coordinate pair is usable for drawing
pub(crate) fn check_finite(x: f64, y: f64) -> Result<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(EncoderError::NonFiniteCoordinate(format!("({}, {})", x, y)))
    }
}
