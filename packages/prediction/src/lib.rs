#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Predicted hazards for a planned route.
//!
//! Two detectors look for likely speed breakers: one at sharp changes in
//! the average speed between consecutive route steps, and one at sudden
//! jumps in elevation along the path. Their candidates are then fused
//! with existing reports: a candidate sitting next to known hazards has
//! its confidence boosted. Predictions are an overlay only and are never
//! written to the hazard store.

pub mod detectors;
pub mod fusion;
pub mod providers;

use road_hazard_models::{GeoPoint, HazardRecord, PredictedHazard, Route};
use road_hazard_spatial::sample_evenly;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use providers::{ElevationProvider, FixedRoute, NearestElevation, RouteProvider};

/// Errors reported by route and elevation providers.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// The route provider could not produce a route.
    #[error("Route provider error: {message}")]
    Route {
        /// Description of what went wrong.
        message: String,
    },

    /// The elevation provider could not answer.
    #[error("Elevation provider error: {message}")]
    Elevation {
        /// Description of what went wrong.
        message: String,
    },
}

/// Thresholds for both detectors and the fusion step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Speed changes at or below this (km/h) are ignored.
    pub speed_change_min_kmh: f64,
    /// Speed change giving full confidence.
    pub speed_change_full_kmh: f64,
    /// Speed change above which a candidate is `medium`.
    pub speed_change_medium_kmh: f64,
    /// Speed change above which a candidate is `high`.
    pub speed_change_high_kmh: f64,
    /// Elevation jumps at or below this (m) are ignored.
    pub elevation_change_min_m: f64,
    /// Elevation jump giving full confidence.
    pub elevation_change_full_m: f64,
    /// Elevation jump above which a candidate is `medium`.
    pub elevation_change_medium_m: f64,
    /// Elevation jump above which a candidate is `high`.
    pub elevation_change_high_m: f64,
    /// Candidates below this confidence are dropped.
    pub min_confidence: f64,
    /// Existing reports strictly closer than this cluster with a candidate.
    pub cluster_radius_m: f64,
    /// Confidence of a clustered candidate before per-match boosts.
    pub cluster_base_confidence: f64,
    /// Confidence added per clustered report.
    pub cluster_step_confidence: f64,
    /// Upper bound on points sent to the elevation provider.
    pub max_elevation_samples: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            speed_change_min_kmh: 20.0,
            speed_change_full_kmh: 60.0,
            speed_change_medium_kmh: 30.0,
            speed_change_high_kmh: 40.0,
            elevation_change_min_m: 2.0,
            elevation_change_full_m: 10.0,
            elevation_change_medium_m: 3.0,
            elevation_change_high_m: 5.0,
            min_confidence: 0.4,
            cluster_radius_m: 50.0,
            cluster_base_confidence: 0.8,
            cluster_step_confidence: 0.05,
            max_elevation_samples: 100,
        }
    }
}

/// Outcome of analysing one route.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAnalysis {
    /// Fused predictions, in no particular order.
    pub predicted: Vec<PredictedHazard>,
    /// Candidates produced by the speed-profile detector.
    pub speed_changes: usize,
    /// Candidates produced by the elevation detector.
    pub elevation_hazards: usize,
    /// Set when the elevation provider failed and only speed-profile
    /// candidates were considered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_error: Option<String>,
}

/// Runs both detectors over a route and fuses the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionEngine {
    config: PredictionConfig,
}

impl PredictionEngine {
    #[must_use]
    pub const fn new(config: PredictionConfig) -> Self {
        Self { config }
    }

    /// Fetches a route from `routes` and analyses it.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::Route`] if no route could be fetched.
    /// Elevation failures only reduce the result; see
    /// [`analyze_route`](Self::analyze_route).
    pub async fn plan_and_analyze(
        &self,
        routes: &dyn RouteProvider,
        origin: GeoPoint,
        destination: GeoPoint,
        elevation: &dyn ElevationProvider,
        existing: &[HazardRecord],
    ) -> Result<(Route, RouteAnalysis), PredictionError> {
        let route = routes.route(origin, destination).await?;
        let analysis = self.analyze_route(&route, elevation, existing).await;
        Ok((route, analysis))
    }

    /// Predicts hazards along `route`.
    ///
    /// The speed-profile detector always runs. The path is sampled down to
    /// at most `max_elevation_samples` points for the elevation provider;
    /// if that call fails the analysis continues without elevation
    /// candidates.
    pub async fn analyze_route(
        &self,
        route: &Route,
        elevation: &dyn ElevationProvider,
        existing: &[HazardRecord],
    ) -> RouteAnalysis {
        let mut candidates = detectors::speed_profile(route, &self.config);
        let speed_changes = candidates.len();

        let mut elevation_hazards = 0;
        let mut elevation_error = None;

        let samples = sample_evenly(&route.path, self.config.max_elevation_samples);
        if samples.len() >= 2 {
            match elevation.elevations(&samples).await {
                Ok(profile) => {
                    let found = detectors::elevation_profile(&profile, &self.config);
                    elevation_hazards = found.len();
                    candidates.extend(found);
                }
                Err(e) => {
                    log::warn!("Elevation lookup failed, using speed profile only: {e}");
                    elevation_error = Some(e.to_string());
                }
            }
        }

        let predicted = fusion::fuse(candidates, existing, &self.config);
        log::debug!(
            "Route analysis: {speed_changes} speed changes, {elevation_hazards} elevation hazards, {} predicted",
            predicted.len()
        );

        RouteAnalysis {
            predicted,
            speed_changes,
            elevation_hazards,
            elevation_error,
        }
    }
}
