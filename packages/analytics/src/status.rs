//! One-line road status for the traveler.

use crate::NearbyHazard;

/// Shown when nothing is in range.
pub const NORMAL_ROAD: &str = "Normal Road";

/// Status line for the closest of `nearby`, e.g.
/// `⚠ Pothole Ahead (HIGH) - 157m`. Manholes are shown as potholes.
#[must_use]
pub fn status_text(nearby: &[NearbyHazard]) -> String {
    let Some(closest) = nearby
        .iter()
        .min_by(|a, b| a.distance_from_user.total_cmp(&b.distance_from_user))
    else {
        return NORMAL_ROAD.to_string();
    };

    format!(
        "⚠ {} Ahead ({}) - {:.0}m",
        closest.hazard.hazard_type.summary_bucket().label(),
        closest.hazard.severity.as_ref().to_uppercase(),
        closest.distance_from_user.round(),
    )
}
