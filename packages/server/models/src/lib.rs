#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the road hazard server.
//!
//! These types are serialized to JSON for the REST API. They wrap the
//! domain types from `road_hazard_models` so the wire contract can evolve
//! independently of the engines.

use std::collections::BTreeSet;
use std::str::FromStr;

use road_hazard_analytics::{HazardAhead, NearbyHazard};
use road_hazard_models::{
    DetectionEvent, ElevationSample, GeoPoint, HazardFilters, HazardType, Route, Severity, UserId,
    VoteKind,
};
use serde::{Deserialize, Serialize};

/// Response for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    pub healthy: bool,
    pub version: String,
    /// Backend currently serving hazard calls.
    pub store: String,
    /// Whether that backend is the primary one.
    pub primary_store: bool,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Filter parameters shared by the list and nearby endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    /// Comma-separated hazard types to include.
    pub types: Option<String>,
    /// Comma-separated severities to include.
    pub severities: Option<String>,
    /// Drop unverified hazards.
    pub only_verified: Option<bool>,
}

impl FilterParams {
    /// Converts to domain filters. Missing lists mean "everything";
    /// unknown names are ignored.
    #[must_use]
    pub fn filters(&self) -> HazardFilters {
        let mut filters = HazardFilters::default();
        if let Some(types) = self.types.as_deref() {
            filters.types = parse_list::<HazardType>(types);
        }
        if let Some(severities) = self.severities.as_deref() {
            filters.severities = parse_list::<Severity>(severities);
        }
        filters.only_verified = self.only_verified.unwrap_or(false);
        filters
    }
}

fn parse_list<T: FromStr + Ord>(s: &str) -> BTreeSet<T> {
    s.split(',').filter_map(|c| c.trim().parse().ok()).collect()
}

/// Query parameters for `GET /api/hazards/nearby`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQueryParams {
    pub lat: f64,
    pub lng: f64,
    /// Search radius in meters; the configured warning distance when
    /// omitted.
    pub radius: Option<f64>,
    pub types: Option<String>,
    pub severities: Option<String>,
    pub only_verified: Option<bool>,
}

impl NearbyQueryParams {
    #[must_use]
    pub const fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    #[must_use]
    pub fn filters(&self) -> HazardFilters {
        FilterParams {
            types: self.types.clone(),
            severities: self.severities.clone(),
            only_verified: self.only_verified,
        }
        .filters()
    }
}

/// Response for `GET /api/hazards/nearby`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNearby {
    /// One-line road status for the closest hazard.
    pub status: String,
    pub hazards: Vec<NearbyHazard>,
}

/// Body of `POST /api/hazards`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHazardRequest {
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    pub severity: Severity,
    pub location: GeoPoint,
}

/// Body of `POST /api/hazards/detections`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDetectionRequest {
    pub detection: DetectionEvent,
    /// Where the traveler was when the detection was confirmed.
    pub location: GeoPoint,
}

/// Response for hazard creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCreated {
    pub id: String,
}

/// Body shared by the route matching endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQueryRequest {
    /// Route polyline.
    pub path: Vec<GeoPoint>,
    /// Traveler position, if known.
    pub location: Option<GeoPoint>,
    /// Override for the look-ahead distance.
    pub look_ahead: Option<f64>,
    #[serde(default)]
    pub filters: Option<HazardFilters>,
}

/// Response for `POST /api/route/ahead`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHazardsAhead {
    pub hazards: Vec<HazardAhead>,
}

/// Body of `POST /api/route/analyze`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRouteRequest {
    pub route: Route,
    /// Elevation profile to look points up in. Without one only the speed
    /// profile is analysed.
    #[serde(default)]
    pub elevations: Vec<ElevationSample>,
}

/// Body of `POST /api/hazards/{id}/votes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub user_id: UserId,
    pub vote: VoteKind,
}

/// Body identifying the acting traveler.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub user_id: UserId,
}

/// Query parameters for `GET /api/prompt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptQueryParams {
    pub user_id: UserId,
    pub lat: f64,
    pub lng: f64,
}

/// Response for `GET /api/prompt`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPrompt {
    pub hazard: Option<NearbyHazard>,
}

/// Response for `POST /api/prompt/skip`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSkipped {
    pub skipped: Option<String>,
}

/// Response for `POST /api/store/retry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStoreStatus {
    pub store: String,
    pub primary_store: bool,
}
