//! Clustering candidates against existing reports.

use road_hazard_models::{HazardRecord, PredictedHazard};
use road_hazard_spatial::PointIndex;

use crate::PredictionConfig;

/// Boosts each candidate that has existing reports strictly within the
/// cluster radius to `min(base + step * matches, 1)`, then drops anything
/// still below the minimum confidence.
#[must_use]
pub fn fuse(
    candidates: Vec<PredictedHazard>,
    existing: &[HazardRecord],
    config: &PredictionConfig,
) -> Vec<PredictedHazard> {
    let index = PointIndex::build(existing.iter().map(|hazard| hazard.location));

    candidates
        .into_iter()
        .filter_map(|mut candidate| {
            let matches = index
                .within(candidate.location, config.cluster_radius_m)
                .into_iter()
                .filter(|(_, distance)| *distance < config.cluster_radius_m)
                .count();

            if matches > 0 {
                let matches = u32::try_from(matches).unwrap_or(u32::MAX);
                candidate.confidence = config
                    .cluster_step_confidence
                    .mul_add(f64::from(matches), config.cluster_base_confidence)
                    .min(1.0);
                candidate.clustered = true;
                candidate.verified_by = matches;
            }

            (candidate.confidence >= config.min_confidence).then_some(candidate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use road_hazard_models::{
        GeoPoint, HazardId, HazardSource, HazardType, NewHazard, Severity,
    };

    use super::*;

    fn candidate(at: GeoPoint, confidence: f64) -> PredictedHazard {
        PredictedHazard {
            location: at,
            hazard_type: HazardType::SpeedBreaker,
            severity: Severity::Low,
            source: HazardSource::RouteAnalysis,
            confidence,
            verified_by: 0,
            clustered: false,
        }
    }

    fn report(id: &str, at: GeoPoint) -> HazardRecord {
        HazardRecord::from_new(
            HazardId::new(id),
            NewHazard::manual(HazardType::Pothole, Severity::High, at),
            Utc::now(),
        )
    }

    #[test]
    fn boost_grows_with_matches_and_caps_at_one() {
        let at = GeoPoint::new(10.0, 10.0);
        let config = PredictionConfig::default();

        let three: Vec<HazardRecord> = (0..3).map(|i| report(&format!("h{i}"), at)).collect();
        let fused = fuse(vec![candidate(at, 0.5)], &three, &config);
        assert!((fused[0].confidence - 0.95).abs() < 1e-9);
        assert_eq!(fused[0].verified_by, 3);

        let many: Vec<HazardRecord> = (0..10).map(|i| report(&format!("h{i}"), at)).collect();
        let fused = fuse(vec![candidate(at, 0.5)], &many, &config);
        assert!((fused[0].confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reports_at_or_beyond_radius_do_not_cluster() {
        let at = GeoPoint::new(0.0, 0.0);
        // ~55 m north.
        let existing = vec![report("far", GeoPoint::new(0.0005, 0.0))];
        let fused = fuse(vec![candidate(at, 0.45)], &existing, &PredictionConfig::default());
        assert!(!fused[0].clustered);
        assert!((fused[0].confidence - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn weak_unclustered_candidates_are_dropped() {
        let fused = fuse(
            vec![candidate(GeoPoint::new(0.0, 0.0), 0.3)],
            &[],
            &PredictionConfig::default(),
        );
        assert!(fused.is_empty());
    }
}
