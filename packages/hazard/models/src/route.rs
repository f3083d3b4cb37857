//! Planned-route shapes returned by the route and elevation providers.

use serde::{Deserialize, Serialize};

use crate::GeoPoint;

/// One maneuver of a planned route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    /// Where the step begins.
    pub start_location: GeoPoint,
    /// Step length in meters.
    pub distance_m: f64,
    /// Expected travel time in seconds.
    pub duration_s: f64,
}

impl RouteStep {
    /// Average speed over the step in km/h, or `None` when the step has no
    /// usable distance or duration.
    #[must_use]
    pub fn average_speed_kmh(&self) -> Option<f64> {
        if self.distance_m > 0.0
            && self.duration_s > 0.0
            && self.distance_m.is_finite()
            && self.duration_s.is_finite()
        {
            Some(self.distance_m / self.duration_s * 3.6)
        } else {
            None
        }
    }
}

/// A route leg between two waypoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    /// Steps in travel order.
    pub steps: Vec<RouteStep>,
}

/// A planned route: the overview polyline plus per-step timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Ordered overview polyline.
    pub path: Vec<GeoPoint>,
    /// Legs in travel order.
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

impl Route {
    /// Iterates over every step across leg boundaries.
    pub fn steps(&self) -> impl Iterator<Item = &RouteStep> {
        self.legs.iter().flat_map(|leg| leg.steps.iter())
    }
}

/// Elevation reported for one sampled path point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationSample {
    /// Sampled location.
    pub location: GeoPoint,
    /// Elevation in meters.
    pub elevation_m: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(distance_m: f64, duration_s: f64) -> RouteStep {
        RouteStep {
            start_location: GeoPoint::new(0.0, 0.0),
            distance_m,
            duration_s,
        }
    }

    #[test]
    fn average_speed_in_kmh() {
        let speed = step(1000.0, 60.0).average_speed_kmh().unwrap();
        assert!((speed - 60.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_steps_have_no_speed() {
        assert!(step(0.0, 10.0).average_speed_kmh().is_none());
        assert!(step(100.0, 0.0).average_speed_kmh().is_none());
        assert!(step(f64::NAN, 10.0).average_speed_kmh().is_none());
    }

    #[test]
    fn steps_cross_leg_boundaries() {
        let route = Route {
            path: Vec::new(),
            legs: vec![
                RouteLeg {
                    steps: vec![step(1.0, 1.0), step(2.0, 1.0)],
                },
                RouteLeg {
                    steps: vec![step(3.0, 1.0)],
                },
            ],
        };
        let distances: Vec<f64> = route.steps().map(|s| s.distance_m).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
    }
}
