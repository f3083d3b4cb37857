use std::collections::BTreeSet;

use road_hazard_models::{HazardId, UserId};

/// Session record of which traveler acted on which hazard.
#[derive(Debug, Clone, Default)]
pub struct VoteLedger {
    entries: BTreeSet<(HazardId, UserId)>,
}

impl VoteLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pair. Returns `false` if it was already present.
    pub fn record(&mut self, hazard: &HazardId, user: &UserId) -> bool {
        self.entries.insert((hazard.clone(), user.clone()))
    }

    #[must_use]
    pub fn contains(&self, hazard: &HazardId, user: &UserId) -> bool {
        self.entries.contains(&(hazard.clone(), user.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
