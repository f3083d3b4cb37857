#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live driving session support.
//!
//! [`PositionTracker`] turns raw fixes into a smoothed speed and heading,
//! [`AlertSelector`] decides when the traveler hears about a hazard, and
//! [`spawn_segment_ticker`] keeps the current route segment status fresh
//! on a fixed period.

pub mod alerts;
pub mod ticker;
pub mod tracker;

use serde::{Deserialize, Serialize};

pub use alerts::{Alert, AlertSelector};
pub use ticker::{TickerInputs, spawn_segment_ticker};
pub use tracker::{PositionTracker, TrackedPosition};

/// Thresholds for a driving session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// How far ahead along the route hazards are considered.
    pub look_ahead_m: f64,
    /// Radius for proximity beeps and the status line.
    pub warning_distance_m: f64,
    /// Spoken alerts need the traveler to be faster than this.
    pub alert_min_speed_kmh: f64,
    /// Proximity beeps need the traveler to be faster than this.
    pub beep_min_speed_kmh: f64,
    /// Minimum time between two proximity beeps.
    pub beep_interval_ms: u64,
    /// Number of speed readings averaged together.
    pub smoothing_window: usize,
    /// Speed is only derived from consecutive fixes further apart than this.
    pub min_derive_interval_ms: u64,
    /// Period of the segment status refresh.
    pub segment_refresh_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            look_ahead_m: 500.0,
            warning_distance_m: 100.0,
            alert_min_speed_kmh: 2.0,
            beep_min_speed_kmh: 5.0,
            beep_interval_ms: 5_000,
            smoothing_window: 5,
            min_derive_interval_ms: 500,
            segment_refresh_ms: 1_000,
        }
    }
}
