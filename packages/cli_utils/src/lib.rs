#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the road hazard tools.
//!
//! [`init_logger`] sets up `pretty_env_logger` from `RUST_LOG`, and
//! [`parse_point`] turns `lat,lng` arguments into validated coordinates.

use road_hazard_models::GeoPoint;

/// Initializes the global logger from `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger() {
    pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)
}

/// Parses a `lat,lng` pair, e.g. `28.6139,77.2090`.
///
/// # Errors
///
/// Returns a message if the input is not two comma-separated numbers or
/// the coordinate is out of range.
pub fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lng`, got `{s}`"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude `{}`: {e}", lat.trim()))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude `{}`: {e}", lng.trim()))?;
    GeoPoint::try_new(lat, lng).map_err(|e| e.to_string())
}
