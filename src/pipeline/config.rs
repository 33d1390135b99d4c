//! Per-run clustering parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_WINDOW_HOURS: u32 = 72;
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 70;
pub const DEFAULT_POINTS_PER_SOURCE: f64 = 30.0;
pub const DEFAULT_DECAY_HOURS: f64 = 24.0;

/// Knobs passed explicitly into every clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Records published within this many hours (or undated) are clustered.
    pub window_hours: u32,
    /// Minimum similarity (0–100) between a seed and a candidate.
    pub similarity_threshold: u8,
    /// Score contributed by each distinct source.
    pub points_per_source: f64,
    /// Decay constant of the recency multiplier `exp(-age / decay_hours)`.
    pub decay_hours: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            window_hours: DEFAULT_WINDOW_HOURS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            points_per_source: DEFAULT_POINTS_PER_SOURCE,
            decay_hours: DEFAULT_DECAY_HOURS,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("window_hours must be greater than zero")]
    EmptyWindow,
    #[error("similarity_threshold must be within 0..=100, got {0}")]
    ThresholdOutOfRange(u8),
    #[error("points_per_source must be a finite non-negative number, got {0}")]
    InvalidPoints(f64),
    #[error("decay_hours must be a finite positive number, got {0}")]
    InvalidDecay(f64),
}

impl ClusterParams {
    #[must_use]
    pub fn with_window_hours(mut self, window_hours: u32) -> Self {
        self.window_hours = window_hours;
        self
    }

    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: u8) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// # Errors
    /// Returns the first parameter that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.window_hours == 0 {
            return Err(ParamsError::EmptyWindow);
        }
        if self.similarity_threshold > 100 {
            return Err(ParamsError::ThresholdOutOfRange(self.similarity_threshold));
        }
        if !self.points_per_source.is_finite() || self.points_per_source < 0.0 {
            return Err(ParamsError::InvalidPoints(self.points_per_source));
        }
        if !self.decay_hours.is_finite() || self.decay_hours <= 0.0 {
            return Err(ParamsError::InvalidDecay(self.decay_hours));
        }
        Ok(())
    }
}
