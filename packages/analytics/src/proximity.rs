//! Radius filtering around the traveler.

use road_hazard_models::{GeoPoint, HazardFilters, HazardRecord};
use road_hazard_spatial::distance_meters;
use serde::Serialize;

/// A hazard annotated with its distance from the traveler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyHazard {
    /// The matched record.
    #[serde(flatten)]
    pub hazard: HazardRecord,
    /// Great-circle distance from the origin in meters.
    pub distance_from_user: f64,
}

/// Hazards passing `filters` within `radius_m` (inclusive) of `origin`,
/// nearest first. Returns an empty list when `origin` is `None`.
#[must_use]
pub fn filter_by_proximity(
    hazards: &[HazardRecord],
    origin: Option<GeoPoint>,
    radius_m: f64,
    filters: &HazardFilters,
) -> Vec<NearbyHazard> {
    let Some(origin) = origin else {
        return Vec::new();
    };

    let mut nearby: Vec<NearbyHazard> = hazards
        .iter()
        .filter(|hazard| filters.matches(hazard))
        .filter_map(|hazard| {
            let distance = distance_meters(origin, hazard.location);
            (distance <= radius_m).then(|| NearbyHazard {
                hazard: hazard.clone(),
                distance_from_user: distance,
            })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_from_user.total_cmp(&b.distance_from_user));
    nearby
}
