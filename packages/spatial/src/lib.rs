#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spherical-earth geometry for hazard matching.
//!
//! Great-circle distance and initial bearing on a sphere of mean radius
//! [`EARTH_RADIUS_METERS`], polyline helpers shared by the route matcher
//! and the prediction engine, and an R-tree backed [`PointIndex`] for
//! radius lookups over many hazards. Every call site uses the same radius
//! so distances computed in different crates are directly comparable.
//!
//! Inputs are expected to be valid WGS84 degrees; results for `NaN`
//! coordinates are unspecified.

mod index;

use road_hazard_models::GeoPoint;

pub use index::PointIndex;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters spanned by one degree of latitude on the reference sphere.
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Great-circle distance between two points in meters (haversine).
#[must_use]
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_phi = (b.lat - a.lat).to_radians();
    let delta_lambda = (b.lng - a.lng).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Great-circle distance between two points in kilometers.
#[must_use]
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    distance_meters(a, b) / 1000.0
}

/// Initial bearing from `a` towards `b`, in degrees within `[0, 360)`.
#[must_use]
pub fn bearing_degrees(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lng - a.lng).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if bearing >= 360.0 { 0.0 } else { bearing }
}

/// Total length of a polyline in meters.
#[must_use]
pub fn path_length_meters(path: &[GeoPoint]) -> f64 {
    path.windows(2)
        .map(|pair| distance_meters(pair[0], pair[1]))
        .sum()
}

/// Index of the polyline vertex closest to `origin`, with its distance.
///
/// Ties resolve to the earliest vertex. Returns `None` for an empty path.
#[must_use]
pub fn nearest_vertex(path: &[GeoPoint], origin: GeoPoint) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in path.iter().enumerate() {
        let distance = distance_meters(origin, *point);
        match best {
            Some((_, current)) if distance >= current => {}
            _ => best = Some((i, distance)),
        }
    }
    best
}

/// Whether `point` lies within `radius_m` (inclusive) of any vertex.
#[must_use]
pub fn is_near_path(path: &[GeoPoint], point: GeoPoint, radius_m: f64) -> bool {
    path.iter()
        .any(|vertex| distance_meters(point, *vertex) <= radius_m)
}

/// Picks at most `max_samples` vertices at a fixed stride of
/// `max(1, floor(len / max_samples))`, starting from the first vertex.
#[must_use]
pub fn sample_evenly(path: &[GeoPoint], max_samples: usize) -> Vec<GeoPoint> {
    if path.is_empty() || max_samples == 0 {
        return Vec::new();
    }

    let stride = (path.len() / max_samples).max(1);
    path.iter()
        .step_by(stride)
        .take(max_samples)
        .copied()
        .collect()
}
