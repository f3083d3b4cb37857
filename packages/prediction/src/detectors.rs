//! Speed-profile and elevation detectors.
//!
//! Both produce unclustered `speed_breaker` candidates. Candidates below
//! the configured minimum confidence are discarded here, before fusion.

use road_hazard_models::{
    ElevationSample, GeoPoint, HazardSource, HazardType, PredictedHazard, Route, Severity,
};

use crate::PredictionConfig;

/// Candidates at steps whose average speed differs from the previous
/// step's by more than the configured minimum. Steps are walked across leg
/// boundaries; a step without a usable speed breaks the comparison chain.
#[must_use]
pub fn speed_profile(route: &Route, config: &PredictionConfig) -> Vec<PredictedHazard> {
    let mut candidates = Vec::new();
    let mut previous_speed: Option<f64> = None;

    for step in route.steps() {
        let speed = step.average_speed_kmh();
        if let (Some(previous), Some(current)) = (previous_speed, speed) {
            let delta = (current - previous).abs();
            if delta > config.speed_change_min_kmh {
                let severity = tier(
                    delta,
                    config.speed_change_medium_kmh,
                    config.speed_change_high_kmh,
                );
                let confidence = (delta / config.speed_change_full_kmh).min(1.0);
                push_candidate(
                    &mut candidates,
                    step.start_location,
                    severity,
                    confidence,
                    HazardSource::RouteAnalysis,
                    config,
                );
            }
        }
        previous_speed = speed;
    }

    candidates
}

/// Candidates at the later point of each consecutive pair whose elevation
/// differs by more than the configured minimum.
#[must_use]
pub fn elevation_profile(
    samples: &[ElevationSample],
    config: &PredictionConfig,
) -> Vec<PredictedHazard> {
    let mut candidates = Vec::new();

    for pair in samples.windows(2) {
        let delta = (pair[1].elevation_m - pair[0].elevation_m).abs();
        if delta.is_nan() || delta <= config.elevation_change_min_m {
            continue;
        }
        let severity = tier(
            delta,
            config.elevation_change_medium_m,
            config.elevation_change_high_m,
        );
        let confidence = (delta / config.elevation_change_full_m).min(1.0);
        push_candidate(
            &mut candidates,
            pair[1].location,
            severity,
            confidence,
            HazardSource::ElevationDetection,
            config,
        );
    }

    candidates
}

fn tier(delta: f64, medium_above: f64, high_above: f64) -> Severity {
    if delta > high_above {
        Severity::High
    } else if delta > medium_above {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn push_candidate(
    candidates: &mut Vec<PredictedHazard>,
    location: GeoPoint,
    severity: Severity,
    confidence: f64,
    source: HazardSource,
    config: &PredictionConfig,
) {
    if confidence < config.min_confidence {
        return;
    }
    candidates.push(PredictedHazard {
        location,
        hazard_type: HazardType::SpeedBreaker,
        severity,
        source,
        confidence,
        verified_by: 0,
        clustered: false,
    });
}

#[cfg(test)]
mod tests {
    use road_hazard_models::{RouteLeg, RouteStep};

    use super::*;

    fn step(speed_kmh: f64) -> RouteStep {
        RouteStep {
            start_location: GeoPoint::new(0.0, speed_kmh / 1000.0),
            distance_m: speed_kmh / 3.6 * 100.0,
            duration_s: 100.0,
        }
    }

    fn route(legs: Vec<Vec<RouteStep>>) -> Route {
        Route {
            path: Vec::new(),
            legs: legs.into_iter().map(|steps| RouteLeg { steps }).collect(),
        }
    }

    fn sample(elevation_m: f64, lng: f64) -> ElevationSample {
        ElevationSample {
            location: GeoPoint::new(0.0, lng),
            elevation_m,
        }
    }

    #[test]
    fn speed_severity_and_confidence() {
        let config = PredictionConfig::default();
        let found = speed_profile(&route(vec![vec![step(10.0), step(55.0), step(20.0), step(52.0)]]), &config);
        let summary: Vec<(Severity, f64)> = found.iter().map(|c| (c.severity, c.confidence)).collect();

        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].0, Severity::High);
        assert!((summary[0].1 - 0.75).abs() < 1e-9);
        assert_eq!(summary[1].0, Severity::Medium);
        assert_eq!(summary[2].0, Severity::Medium);
        assert!((summary[2].1 - 32.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_speed_changes_are_dropped() {
        // 22 km/h jump passes the threshold but 22/60 < 0.4.
        let found = speed_profile(&route(vec![vec![step(30.0), step(52.0)]]), &PredictionConfig::default());
        assert!(found.is_empty());
    }

    #[test]
    fn speed_comparison_spans_legs() {
        let found = speed_profile(
            &route(vec![vec![step(20.0)], vec![step(70.0)]]),
            &PredictionConfig::default(),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location, step(70.0).start_location);
        assert_eq!(found[0].hazard_type, HazardType::SpeedBreaker);
    }

    #[test]
    fn unusable_step_breaks_the_chain() {
        let mut stopped = step(0.0);
        stopped.duration_s = 0.0;
        let found = speed_profile(
            &route(vec![vec![step(20.0), stopped, step(70.0)]]),
            &PredictionConfig::default(),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn elevation_tiers() {
        let config = PredictionConfig::default();
        let samples = [
            sample(10.0, 0.0),
            sample(14.5, 0.001),
            sample(10.0, 0.002),
            sample(16.0, 0.003),
            sample(17.5, 0.004),
        ];
        let found = elevation_profile(&samples, &config);
        let tiers: Vec<Severity> = found.iter().map(|c| c.severity).collect();
        assert_eq!(tiers, vec![Severity::Medium, Severity::Medium, Severity::High]);
        assert_eq!(found[0].location, samples[1].location);
        assert!((found[2].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn small_elevation_jumps_are_dropped() {
        // 3 m clears the 2 m threshold but 3/10 is below the cutoff.
        let found = elevation_profile(&[sample(0.0, 0.0), sample(3.0, 0.001)], &PredictionConfig::default());
        assert!(found.is_empty());
    }
}
