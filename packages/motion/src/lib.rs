#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Accelerometer-driven hazard classification.
//!
//! [`MotionClassifier`] reduces each 3-axis sample to a peak-G value,
//! keeps a sliding buffer of recent values, and classifies the latest
//! window into a [`DetectionEvent`](road_hazard_models::DetectionEvent)
//! using fixed shape rules. [`MotionMonitor`] runs a classifier on a
//! background task so the sensor source never blocks.

mod classifier;
mod monitor;

use serde::Deserialize;

pub use classifier::{MotionClassifier, MotionSample};
pub use monitor::MotionMonitor;

/// Shape rule for one hazard kind. Duration bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ShapeRule {
    /// The window's largest peak-G must exceed this.
    pub max_peak_above: f64,
    /// The window's smallest peak-G must be below this, when set.
    #[serde(default)]
    pub min_peak_below: Option<f64>,
    /// The window's smallest peak-G must exceed this, when set.
    #[serde(default)]
    pub min_peak_above: Option<f64>,
    /// Lower exclusive bound on the window span in milliseconds.
    pub min_duration_ms: u64,
    /// Upper exclusive bound on the window span in milliseconds.
    pub max_duration_ms: u64,
    /// Peaks above this are `medium`.
    pub medium_above: f64,
    /// Peaks above this are `high`.
    pub high_above: f64,
}

impl ShapeRule {
    /// Whether a window with these statistics satisfies the rule.
    #[must_use]
    pub fn matches(&self, max_peak: f64, min_peak: f64, duration_ms: u64) -> bool {
        max_peak > self.max_peak_above
            && self.min_peak_below.is_none_or(|bound| min_peak < bound)
            && self.min_peak_above.is_none_or(|bound| min_peak > bound)
            && duration_ms > self.min_duration_ms
            && duration_ms < self.max_duration_ms
    }
}

/// Tuning for [`MotionClassifier`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Standard gravity in m/s² used to convert to G.
    pub gravity: f64,
    /// Number of peak-G values retained.
    pub buffer_capacity: usize,
    /// Number of most recent values analysed.
    pub window_size: usize,
    /// Windows smaller than this are skipped.
    pub min_window_samples: usize,
    /// Minimum gap between two detections.
    pub debounce_ms: u64,
    /// `confidence = min(max_peak / confidence_scale, 1)`.
    pub confidence_scale: f64,
    /// Rule tested first.
    pub speed_breaker: ShapeRule,
    /// Rule tested second.
    pub pothole: ShapeRule,
    /// Rule tested last.
    pub manhole: ShapeRule,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            buffer_capacity: 100,
            window_size: 50,
            min_window_samples: 5,
            debounce_ms: 1500,
            confidence_scale: 5.0,
            speed_breaker: ShapeRule {
                max_peak_above: 1.8,
                min_peak_below: None,
                min_peak_above: None,
                min_duration_ms: 200,
                max_duration_ms: 600,
                medium_above: 2.3,
                high_above: 3.2,
            },
            pothole: ShapeRule {
                max_peak_above: 1.5,
                min_peak_below: Some(-1.5),
                min_peak_above: None,
                min_duration_ms: 300,
                max_duration_ms: 900,
                medium_above: 2.0,
                high_above: 3.0,
            },
            manhole: ShapeRule {
                max_peak_above: 2.0,
                min_peak_below: None,
                min_peak_above: Some(-0.5),
                min_duration_ms: 80,
                max_duration_ms: 250,
                medium_above: 2.7,
                high_above: 3.8,
            },
        }
    }
}
