#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Road hazard taxonomy types and shared value types.
//!
//! This crate defines the canonical hazard vocabulary used across the
//! entire road-hazard system: hazard kinds, severities, report sources,
//! the persisted [`HazardRecord`], and the ephemeral values produced by
//! the detection and prediction engines. Collaborator-specific shapes are
//! normalized into these types at the boundary before they reach any
//! engine crate.

pub mod route;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use route::{ElevationSample, Route, RouteLeg, RouteStep};

/// Kind of road hazard.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HazardType {
    /// Raised hump built across the carriageway
    SpeedBreaker,
    /// Depression or hole in the road surface
    Pothole,
    /// Utility access cover sitting off the road level
    Manhole,
}

impl HazardType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::SpeedBreaker, Self::Pothole, Self::Manhole]
    }

    /// Human-readable label used in warnings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SpeedBreaker => "Speed Breaker",
            Self::Pothole => "Pothole",
            Self::Manhole => "Manhole",
        }
    }

    /// Bucket used by route summaries, where manholes are counted as
    /// potholes. Everywhere else the two stay distinct.
    #[must_use]
    pub const fn summary_bucket(self) -> Self {
        match self {
            Self::Manhole | Self::Pothole => Self::Pothole,
            Self::SpeedBreaker => Self::SpeedBreaker,
        }
    }
}

/// Qualitative impact tier of a hazard.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Noticeable, safe at normal speed
    Low,
    /// Requires slowing down
    Medium,
    /// Can damage a vehicle or unsettle a rider
    High,
}

impl Severity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }
}

/// Where a hazard report came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HazardSource {
    /// Reported by hand from the map
    ManualReport,
    /// Confirmed accelerometer detection
    MotionDetection,
    /// Elevation discontinuity along a path
    ElevationDetection,
    /// Speed-profile break in a planned route
    RouteAnalysis,
}

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a point without validation.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Creates a point, rejecting non-finite or out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either coordinate is `NaN`,
    /// infinite, or outside the WGS84 range.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, InvalidCoordinateError> {
        let point = Self { lat, lng };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(InvalidCoordinateError { lat, lng })
        }
    }

    /// Whether both coordinates are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Error returned when a coordinate pair is not a usable WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// The rejected latitude.
    pub lat: f64,
    /// The rejected longitude.
    pub lng: f64,
}

impl std::fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate ({}, {}): expected finite lat in [-90, 90] and lng in [-180, 180]",
            self.lat, self.lng
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// Opaque hazard identifier assigned by the store on creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HazardId(String);

impl HazardId {
    /// Wraps an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HazardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HazardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for HazardId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Anonymous, session-scoped traveler identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A persisted hazard report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardRecord {
    /// Store-assigned identifier.
    pub id: HazardId,
    /// Hazard kind.
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    /// Impact tier.
    pub severity: Severity,
    /// Where the hazard sits.
    pub location: GeoPoint,
    /// Whether crowd votes confirmed the hazard. Only ever goes false to true.
    #[serde(default)]
    pub verified: bool,
    /// Confirming votes.
    #[serde(default)]
    pub vote_yes: u32,
    /// Rejecting votes.
    #[serde(default)]
    pub vote_no: u32,
    /// How the report was produced.
    pub source: HazardSource,
    /// Detector confidence in `[0, 1]`, absent for manual reports.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Whether any traveler asked for this hazard to be removed.
    #[serde(default)]
    pub removal_requested: bool,
    /// Number of distinct removal requests.
    #[serde(default)]
    pub removal_votes: u32,
    /// When the report was stored.
    pub created_at: DateTime<Utc>,
}

impl HazardRecord {
    /// Builds a fresh record from creation data with zeroed counters.
    #[must_use]
    pub fn from_new(id: HazardId, new: NewHazard, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            hazard_type: new.hazard_type,
            severity: new.severity,
            location: new.location,
            verified: new.verified,
            vote_yes: 0,
            vote_no: 0,
            source: new.source,
            confidence: new.confidence,
            removal_requested: false,
            removal_votes: 0,
            created_at,
        }
    }

    /// Current vote counters.
    #[must_use]
    pub const fn votes(&self) -> VoteCounts {
        VoteCounts {
            yes: self.vote_yes,
            no: self.vote_no,
        }
    }
}

/// Data needed to create a hazard record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHazard {
    /// Hazard kind.
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    /// Impact tier.
    pub severity: Severity,
    /// Where the hazard sits.
    pub location: GeoPoint,
    /// How the report was produced.
    pub source: HazardSource,
    /// Detector confidence, if any.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Initial verification flag (false for every crowd report).
    #[serde(default)]
    pub verified: bool,
}

impl NewHazard {
    /// A hand-made report at `location`.
    #[must_use]
    pub const fn manual(hazard_type: HazardType, severity: Severity, location: GeoPoint) -> Self {
        Self {
            hazard_type,
            severity,
            location,
            source: HazardSource::ManualReport,
            confidence: None,
            verified: false,
        }
    }

    /// A report built from a detection the traveler confirmed at `location`.
    #[must_use]
    pub const fn from_detection(event: &DetectionEvent, location: GeoPoint) -> Self {
        Self {
            hazard_type: event.hazard_type,
            severity: event.severity,
            location,
            source: HazardSource::MotionDetection,
            confidence: Some(event.confidence),
            verified: false,
        }
    }
}

/// Partial update applied to a stored hazard. `None` fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardUpdate {
    /// New severity.
    pub severity: Option<Severity>,
    /// New verification flag.
    pub verified: Option<bool>,
    /// New removal-requested flag.
    pub removal_requested: Option<bool>,
}

impl HazardUpdate {
    /// Applies the update to `record` in place.
    pub fn apply(&self, record: &mut HazardRecord) {
        if let Some(severity) = self.severity {
            record.severity = severity;
        }
        if let Some(verified) = self.verified {
            // Verification never reverts.
            record.verified = record.verified || verified;
        }
        if let Some(removal_requested) = self.removal_requested {
            record.removal_requested = removal_requested;
        }
    }
}

/// A traveler's opinion on whether a hazard is real.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VoteKind {
    /// The hazard is there.
    Yes,
    /// The hazard is not there.
    No,
}

/// Vote counters read back from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    /// Confirming votes.
    pub yes: u32,
    /// Rejecting votes.
    pub no: u32,
}

/// A candidate hazard produced by the motion classifier. Never persisted
/// until the traveler confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    /// Classified hazard kind.
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    /// Classified impact tier.
    pub severity: Severity,
    /// Largest peak-G value in the analysis window.
    pub peak_acceleration: f64,
    /// `min(peak / 5, 1)`.
    pub confidence: f64,
}

/// A heuristic prediction shown as an overlay. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedHazard {
    /// Predicted location.
    pub location: GeoPoint,
    /// Predicted hazard kind.
    #[serde(rename = "type")]
    pub hazard_type: HazardType,
    /// Predicted impact tier.
    pub severity: Severity,
    /// Detector that produced the candidate.
    pub source: HazardSource,
    /// Final confidence after clustering.
    pub confidence: f64,
    /// Number of existing reports within the clustering radius.
    pub verified_by: u32,
    /// Whether any existing report boosted the confidence.
    pub clustered: bool,
}

/// Type/severity/verification filters applied by every matching operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardFilters {
    /// Hazard kinds to keep.
    pub types: BTreeSet<HazardType>,
    /// Severities to keep.
    pub severities: BTreeSet<Severity>,
    /// Whether unverified hazards are dropped.
    #[serde(default)]
    pub only_verified: bool,
}

impl Default for HazardFilters {
    fn default() -> Self {
        Self {
            types: HazardType::all().iter().copied().collect(),
            severities: Severity::all().iter().copied().collect(),
            only_verified: false,
        }
    }
}

impl HazardFilters {
    /// Whether the hazard's kind and severity are selected.
    #[must_use]
    pub fn matches_kind(&self, hazard: &HazardRecord) -> bool {
        self.types.contains(&hazard.hazard_type) && self.severities.contains(&hazard.severity)
    }

    /// Whether the hazard passes every filter.
    #[must_use]
    pub fn matches(&self, hazard: &HazardRecord) -> bool {
        self.matches_kind(hazard) && (!self.only_verified || hazard.verified)
    }
}

/// A fix pushed by the position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    /// Reported location.
    pub location: GeoPoint,
    /// Horizontal accuracy in meters.
    #[serde(default)]
    pub accuracy: f64,
    /// Fix time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Ground speed in m/s, when the receiver supplies one.
    #[serde(default)]
    pub speed_mps: Option<f64>,
    /// Heading in degrees, when the receiver supplies one.
    #[serde(default)]
    pub heading: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hazard_type: HazardType, severity: Severity, verified: bool) -> HazardRecord {
        let mut new = NewHazard::manual(hazard_type, severity, GeoPoint::new(0.0, 0.0));
        new.verified = verified;
        HazardRecord::from_new(HazardId::new("h1"), new, Utc::now())
    }

    #[test]
    fn summary_bucket_folds_manhole_only() {
        assert_eq!(HazardType::Manhole.summary_bucket(), HazardType::Pothole);
        assert_eq!(HazardType::Pothole.summary_bucket(), HazardType::Pothole);
        assert_eq!(
            HazardType::SpeedBreaker.summary_bucket(),
            HazardType::SpeedBreaker
        );
        assert_eq!(HazardType::Manhole.label(), "Manhole");
    }

    #[test]
    fn hazard_type_string_roundtrip() {
        for ty in HazardType::all() {
            let parsed: HazardType = ty.to_string().parse().unwrap();
            assert_eq!(parsed, *ty);
        }
        assert_eq!(HazardType::SpeedBreaker.as_ref(), "speed_breaker");
    }

    #[test]
    fn filters_respect_only_verified() {
        let mut filters = HazardFilters::default();
        let unverified = record(HazardType::Pothole, Severity::High, false);
        assert!(filters.matches(&unverified));

        filters.only_verified = true;
        assert!(!filters.matches(&unverified));
        assert!(filters.matches(&record(HazardType::Pothole, Severity::High, true)));
    }

    #[test]
    fn filters_drop_unselected_kinds() {
        let filters = HazardFilters {
            types: [HazardType::SpeedBreaker].into_iter().collect(),
            severities: [Severity::High].into_iter().collect(),
            only_verified: false,
        };
        assert!(!filters.matches(&record(HazardType::Pothole, Severity::High, false)));
        assert!(!filters.matches(&record(HazardType::SpeedBreaker, Severity::Low, false)));
        assert!(filters.matches(&record(HazardType::SpeedBreaker, Severity::High, false)));
    }

    #[test]
    fn update_never_unverifies() {
        let mut hazard = record(HazardType::Manhole, Severity::Low, true);
        HazardUpdate {
            verified: Some(false),
            ..HazardUpdate::default()
        }
        .apply(&mut hazard);
        assert!(hazard.verified);
    }

    #[test]
    fn coordinate_validation() {
        assert!(GeoPoint::try_new(28.6139, 77.2090).is_ok());
        assert!(GeoPoint::try_new(f64::NAN, 77.2090).is_err());
        assert!(GeoPoint::try_new(91.0, 0.0).is_err());
        assert!(GeoPoint::try_new(0.0, -180.5).is_err());
    }

    #[test]
    fn record_serializes_camel_case_with_type_key() {
        let hazard = record(HazardType::SpeedBreaker, Severity::Medium, false);
        let json = serde_json::to_value(&hazard).unwrap();
        assert_eq!(json["type"], "speed_breaker");
        assert_eq!(json["voteYes"], 0);
        assert_eq!(json["removalRequested"], false);
    }
}
