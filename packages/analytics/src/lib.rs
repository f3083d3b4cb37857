#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard matching against a traveler's position and planned route.
//!
//! Every function here is total: a missing origin, an empty route, or an
//! empty hazard list produces an empty result rather than an error. All
//! distances come from [`road_hazard_spatial::distance_meters`].

pub mod proximity;
pub mod route;
pub mod status;

use serde::{Deserialize, Serialize};

pub use proximity::{NearbyHazard, filter_by_proximity};
pub use route::{HazardAhead, RouteMatcher, RouteSummary, SegmentStatus};
pub use status::status_text;

/// Distances used by [`RouteMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// A hazard is on the route ahead when it is strictly closer than this
    /// to some remaining route point.
    pub ahead_tolerance_m: f64,
    /// A hazard counts towards the route summary when it is within this
    /// distance of any route point.
    pub summary_tolerance_m: f64,
    /// Length of one route segment.
    pub segment_length_m: f64,
    /// Hazards within this distance of the traveler count towards the
    /// current segment.
    pub segment_radius_m: f64,
    /// A segment with at most this many hazards is idle.
    pub idle_max_hazards: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            ahead_tolerance_m: 50.0,
            summary_tolerance_m: 100.0,
            segment_length_m: 2_000.0,
            segment_radius_m: 3_000.0,
            idle_max_hazards: 4,
        }
    }
}
