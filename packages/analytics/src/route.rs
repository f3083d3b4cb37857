//! Hazards along a planned route.

use std::collections::BTreeMap;

use road_hazard_models::{GeoPoint, HazardFilters, HazardRecord, HazardType, Severity};
use road_hazard_spatial::{distance_meters, is_near_path, nearest_vertex, path_length_meters};
use serde::Serialize;

use crate::MatchingConfig;

/// Per-type, per-severity hazard counts for one route. Manholes are
/// counted under [`HazardType::Pothole`].
pub type RouteSummary = BTreeMap<HazardType, BTreeMap<Severity, u32>>;

/// A hazard found on the route ahead of the traveler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardAhead {
    /// The matched record.
    #[serde(flatten)]
    pub hazard: HazardRecord,
    /// Great-circle distance from the traveler in meters.
    pub distance_from_user: f64,
    /// First route point ahead of the traveler that the hazard sits next to.
    pub route_index: usize,
}

/// Coarse hazard density around the traveler's current route segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStatus {
    /// Zero-based index of the segment holding the nearest route point.
    pub segment_index: usize,
    /// `max(1, ceil(route length / segment length))`.
    pub total_segments: usize,
    /// Filtered hazards within the segment radius of the traveler.
    pub hazard_count: usize,
    /// Whether the hazard count is at or below the idle threshold.
    pub is_idle: bool,
    /// Distance from the traveler to the nearest route point, in meters.
    pub distance_covered_m: f64,
}

/// Matches hazards against a route polyline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteMatcher {
    config: MatchingConfig,
}

impl RouteMatcher {
    #[must_use]
    pub const fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Hazards lying next to the part of `route` the traveler has not yet
    /// passed and strictly closer than `look_ahead_m` to them, nearest
    /// first.
    ///
    /// The traveler's progress is the route point nearest to `origin`.
    #[must_use]
    pub fn hazards_ahead_on_route(
        &self,
        hazards: &[HazardRecord],
        route: &[GeoPoint],
        origin: Option<GeoPoint>,
        look_ahead_m: f64,
        filters: &HazardFilters,
    ) -> Vec<HazardAhead> {
        let Some(origin) = origin else {
            return Vec::new();
        };
        let Some((user_index, _)) = nearest_vertex(route, origin) else {
            return Vec::new();
        };
        let remaining = &route[user_index..];

        let mut ahead: Vec<HazardAhead> = hazards
            .iter()
            .filter(|hazard| filters.matches(hazard))
            .filter_map(|hazard| {
                let distance_from_user = distance_meters(origin, hazard.location);
                if distance_from_user >= look_ahead_m {
                    return None;
                }
                let offset = remaining.iter().position(|point| {
                    distance_meters(*point, hazard.location) < self.config.ahead_tolerance_m
                })?;
                Some(HazardAhead {
                    hazard: hazard.clone(),
                    distance_from_user,
                    route_index: user_index + offset,
                })
            })
            .collect();

        ahead.sort_by(|a, b| a.distance_from_user.total_cmp(&b.distance_from_user));
        ahead
    }

    /// Counts filtered hazards near any point of `route`, each at most
    /// once. Speed breakers and potholes always appear, zero-filled; an
    /// empty route yields an empty summary.
    #[must_use]
    pub fn route_summary(
        &self,
        hazards: &[HazardRecord],
        route: &[GeoPoint],
        filters: &HazardFilters,
    ) -> RouteSummary {
        let mut summary = RouteSummary::new();
        if route.is_empty() {
            return summary;
        }

        for bucket in [HazardType::SpeedBreaker, HazardType::Pothole] {
            summary.insert(
                bucket,
                Severity::all().iter().map(|severity| (*severity, 0)).collect(),
            );
        }

        for hazard in hazards.iter().filter(|hazard| filters.matches(hazard)) {
            if is_near_path(route, hazard.location, self.config.summary_tolerance_m) {
                *summary
                    .entry(hazard.hazard_type.summary_bucket())
                    .or_default()
                    .entry(hazard.severity)
                    .or_default() += 1;
            }
        }

        summary
    }

    /// Segment status for the traveler at `origin`, or `None` without a
    /// position or route.
    #[must_use]
    pub fn segment_status(
        &self,
        origin: Option<GeoPoint>,
        route: &[GeoPoint],
        hazards: &[HazardRecord],
        filters: &HazardFilters,
    ) -> Option<SegmentStatus> {
        let origin = origin?;
        let (nearest_index, nearest_distance) = nearest_vertex(route, origin)?;
        let segment_length = self.config.segment_length_m;

        let total_segments = total_segments(path_length_meters(route), segment_length);
        let covered = path_length_meters(&route[..=nearest_index]);
        let segment_index = whole_segments(covered, segment_length).min(total_segments - 1);

        let hazard_count = hazards
            .iter()
            .filter(|hazard| filters.matches(hazard))
            .filter(|hazard| {
                distance_meters(origin, hazard.location) <= self.config.segment_radius_m
            })
            .count();

        Some(SegmentStatus {
            segment_index,
            total_segments,
            hazard_count,
            is_idle: hazard_count <= self.config.idle_max_hazards,
            distance_covered_m: nearest_distance,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_segments(length_m: f64, segment_length_m: f64) -> usize {
    if segment_length_m <= 0.0 || !length_m.is_finite() {
        return 0;
    }
    (length_m / segment_length_m).floor().max(0.0) as usize
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn total_segments(length_m: f64, segment_length_m: f64) -> usize {
    if segment_length_m <= 0.0 || !length_m.is_finite() {
        return 1;
    }
    ((length_m / segment_length_m).ceil() as usize).max(1)
}
