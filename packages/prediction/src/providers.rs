//! Route and elevation collaborators.
//!
//! Real deployments put a mapping service behind these traits. The
//! implementations here answer from data that is already in hand, such as
//! a route and elevation profile supplied in a request body.

use async_trait::async_trait;
use road_hazard_models::{ElevationSample, GeoPoint, Route};
use road_hazard_spatial::distance_meters;

use crate::PredictionError;

/// Plans a route between two points.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Returns the route from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::Route`] if no route is available.
    async fn route(&self, origin: GeoPoint, destination: GeoPoint)
    -> Result<Route, PredictionError>;
}

/// Looks up ground elevation.
#[async_trait]
pub trait ElevationProvider: Send + Sync {
    /// Returns one sample per requested point, in request order.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::Elevation`] if the lookup fails.
    async fn elevations(&self, points: &[GeoPoint])
    -> Result<Vec<ElevationSample>, PredictionError>;
}

/// Always returns the same, pre-planned route.
#[derive(Debug, Clone)]
pub struct FixedRoute {
    route: Route,
}

impl FixedRoute {
    #[must_use]
    pub const fn new(route: Route) -> Self {
        Self { route }
    }
}

#[async_trait]
impl RouteProvider for FixedRoute {
    async fn route(
        &self,
        _origin: GeoPoint,
        _destination: GeoPoint,
    ) -> Result<Route, PredictionError> {
        if self.route.path.is_empty() {
            return Err(PredictionError::Route {
                message: "route has no points".to_string(),
            });
        }
        Ok(self.route.clone())
    }
}

/// Answers each point with the elevation of the closest recorded sample.
#[derive(Debug, Clone, Default)]
pub struct NearestElevation {
    samples: Vec<ElevationSample>,
}

impl NearestElevation {
    pub fn new(samples: impl IntoIterator<Item = ElevationSample>) -> Self {
        Self {
            samples: samples
                .into_iter()
                .filter(|s| s.location.is_valid() && s.elevation_m.is_finite())
                .collect(),
        }
    }
}

#[async_trait]
impl ElevationProvider for NearestElevation {
    async fn elevations(
        &self,
        points: &[GeoPoint],
    ) -> Result<Vec<ElevationSample>, PredictionError> {
        if self.samples.is_empty() {
            return Err(PredictionError::Elevation {
                message: "no elevation data".to_string(),
            });
        }

        Ok(points
            .iter()
            .filter_map(|point| {
                self.samples
                    .iter()
                    .min_by(|a, b| {
                        distance_meters(*point, a.location)
                            .total_cmp(&distance_meters(*point, b.location))
                    })
                    .map(|closest| ElevationSample {
                        location: *point,
                        elevation_m: closest.elevation_m,
                    })
            })
            .collect())
    }
}
