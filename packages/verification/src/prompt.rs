use std::collections::BTreeSet;

use road_hazard_analytics::NearbyHazard;
use road_hazard_models::HazardId;

/// Picks the one hazard a traveler is asked to vote on.
///
/// The current prompt sticks while it remains a candidate. It is replaced
/// by the nearest remaining candidate only once it stops being one (voted
/// on, verified, deleted, or out of range) or is skipped.
#[derive(Debug, Clone, Default)]
pub struct VotingPrompter {
    current: Option<HazardId>,
    skipped: BTreeSet<HazardId>,
}

impl VotingPrompter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The hazard currently being prompted, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&HazardId> {
        self.current.as_ref()
    }

    /// Re-evaluates the prompt against `candidates`, which must be sorted
    /// nearest first.
    pub fn refresh<'a>(&mut self, candidates: &'a [NearbyHazard]) -> Option<&'a NearbyHazard> {
        if let Some(current) = &self.current
            && let Some(still) = candidates.iter().find(|c| &c.hazard.id == current)
        {
            return Some(still);
        }

        let next = candidates
            .iter()
            .find(|c| !self.skipped.contains(&c.hazard.id));
        self.current = next.map(|c| c.hazard.id.clone());
        next
    }

    /// Dismisses the current prompt for the rest of the session.
    pub fn skip(&mut self) -> Option<HazardId> {
        let skipped = self.current.take()?;
        self.skipped.insert(skipped.clone());
        Some(skipped)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use road_hazard_models::{GeoPoint, HazardRecord, HazardType, NewHazard, Severity};

    use super::*;

    fn candidate(id: &str, distance: f64) -> NearbyHazard {
        NearbyHazard {
            hazard: HazardRecord::from_new(
                HazardId::new(id),
                NewHazard::manual(HazardType::Pothole, Severity::Low, GeoPoint::new(0.0, 0.0)),
                Utc::now(),
            ),
            distance_from_user: distance,
        }
    }

    #[test]
    fn prompt_sticks_until_it_leaves_the_candidates() {
        let mut prompter = VotingPrompter::new();
        let first = [candidate("a", 50.0), candidate("b", 80.0)];
        assert_eq!(prompter.refresh(&first).unwrap().hazard.id.as_str(), "a");

        // A nearer hazard appears but the current prompt stays.
        let closer = [candidate("c", 10.0), candidate("a", 40.0), candidate("b", 80.0)];
        assert_eq!(prompter.refresh(&closer).unwrap().hazard.id.as_str(), "a");

        // Voted on: no longer a candidate.
        let after_vote = [candidate("c", 10.0), candidate("b", 80.0)];
        assert_eq!(prompter.refresh(&after_vote).unwrap().hazard.id.as_str(), "c");
    }

    #[test]
    fn skip_advances_and_is_remembered() {
        let mut prompter = VotingPrompter::new();
        let candidates = [candidate("a", 50.0), candidate("b", 80.0)];
        prompter.refresh(&candidates);

        assert_eq!(prompter.skip().unwrap().as_str(), "a");
        assert!(prompter.current().is_none());
        assert_eq!(prompter.refresh(&candidates).unwrap().hazard.id.as_str(), "b");

        prompter.skip();
        assert!(prompter.refresh(&candidates).is_none());
        assert!(prompter.skip().is_none());
    }
}
