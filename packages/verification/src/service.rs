use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use road_hazard_analytics::{NearbyHazard, filter_by_proximity};
use road_hazard_models::{GeoPoint, HazardFilters, HazardId, HazardRecord, UserId, VoteKind};
use road_hazard_store::HazardStore;

use crate::{
    RemovalOutcome, VerificationConfig, VerificationError, VerificationStats, VoteLedger,
    VoteOutcome, VoteState, VotingPrompter,
};

#[derive(Default)]
struct Session {
    votes: VoteLedger,
    removals: VoteLedger,
    prompters: BTreeMap<UserId, VotingPrompter>,
}

/// Runs the voting state machine against a [`HazardStore`].
///
/// Session state sits behind a synchronous mutex that is never held across
/// a store call.
pub struct VerificationService {
    store: Arc<dyn HazardStore>,
    config: VerificationConfig,
    session: Mutex<Session>,
}

impl VerificationService {
    #[must_use]
    pub fn new(store: Arc<dyn HazardStore>, config: VerificationConfig) -> Self {
        Self {
            store,
            config,
            session: Mutex::new(Session::default()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &VerificationConfig {
        &self.config
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `user` has voted on `hazard` in this session.
    #[must_use]
    pub fn has_voted(&self, hazard: &HazardId, user: &UserId) -> bool {
        self.session().votes.contains(hazard, user)
    }

    async fn require_open(&self, id: &HazardId) -> Result<HazardRecord, VerificationError> {
        let record = self
            .store
            .read(id)
            .await?
            .ok_or_else(|| VerificationError::NotFound { id: id.clone() })?;
        if record.verified {
            return Err(VerificationError::AlreadyVerified { id: id.clone() });
        }
        Ok(record)
    }

    /// Casts one vote.
    ///
    /// The pair is written to the session ledger before the store is
    /// touched and stays there even if the store call fails, so a vote is
    /// counted at most once.
    ///
    /// # Errors
    ///
    /// * [`VerificationError::AlreadyVoted`] for a repeat vote, with no
    ///   counter change.
    /// * [`VerificationError::NotFound`] / [`VerificationError::AlreadyVerified`]
    ///   when the hazard cannot take votes.
    /// * [`VerificationError::Store`] when the store write fails.
    pub async fn submit_vote(
        &self,
        id: &HazardId,
        user: &UserId,
        kind: VoteKind,
    ) -> Result<VoteOutcome, VerificationError> {
        if self.has_voted(id, user) {
            return Err(VerificationError::AlreadyVoted {
                hazard: id.clone(),
                user: user.clone(),
            });
        }
        self.require_open(id).await?;

        if !self.session().votes.record(id, user) {
            return Err(VerificationError::AlreadyVoted {
                hazard: id.clone(),
                user: user.clone(),
            });
        }

        let counts = self.store.increment_vote(id, kind).await?;

        let (state, transitioned) = match kind {
            VoteKind::Yes if counts.yes >= self.config.verify_threshold => {
                let transitioned = self.store.mark_verified(id).await?;
                if transitioned {
                    log::info!("Hazard {id} verified with {} yes votes", counts.yes);
                } else if counts.yes == self.config.verify_threshold {
                    log::error!(
                        "Hazard {id} reached the verification threshold but was already \
                         verified; the store did not serialize vote counters"
                    );
                }
                (VoteState::Verified, transitioned)
            }
            VoteKind::No if counts.no >= self.config.reject_threshold => {
                let removed = self.store.delete(id).await?;
                if removed {
                    log::info!("Hazard {id} removed after {} no votes", counts.no);
                } else if counts.no == self.config.reject_threshold {
                    log::error!(
                        "Hazard {id} reached the rejection threshold but was already gone; \
                         the store did not serialize vote counters"
                    );
                }
                (VoteState::Removed, removed)
            }
            _ => (VoteState::Pending, false),
        };
        log::debug!(
            "Vote {kind} on {id} by {user}: {} yes / {} no, {state}",
            counts.yes,
            counts.no
        );

        Ok(VoteOutcome {
            counts,
            state,
            transitioned,
        })
    }

    /// Records one removal request and deletes the hazard once the removal
    /// threshold is reached.
    ///
    /// # Errors
    ///
    /// * [`VerificationError::AlreadyRequested`] for a repeat request.
    /// * [`VerificationError::Store`] when the store write fails; the
    ///   request stays recorded.
    pub async fn request_removal(
        &self,
        id: &HazardId,
        user: &UserId,
    ) -> Result<RemovalOutcome, VerificationError> {
        if !self.session().removals.record(id, user) {
            return Err(VerificationError::AlreadyRequested {
                hazard: id.clone(),
                user: user.clone(),
            });
        }

        let removal_votes = self.store.request_removal(id).await?;
        let removed = if removal_votes >= self.config.removal_threshold {
            let removed = self.store.delete(id).await?;
            if removed {
                log::info!("Hazard {id} removed after {removal_votes} removal requests");
            }
            removed
        } else {
            false
        };

        Ok(RemovalOutcome {
            removal_votes,
            removed,
        })
    }

    /// Vote summary for one hazard.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::NotFound`] if the hazard does not exist.
    pub async fn stats(&self, id: &HazardId) -> Result<VerificationStats, VerificationError> {
        let record = self
            .store
            .read(id)
            .await?
            .ok_or_else(|| VerificationError::NotFound { id: id.clone() })?;
        Ok(VerificationStats::from_record(
            &record,
            self.config.verify_threshold,
        ))
    }

    /// Unverified hazards within the prompt radius that `user` has not
    /// voted on, nearest first.
    #[must_use]
    pub fn prompt_candidates(
        &self,
        hazards: &[HazardRecord],
        origin: GeoPoint,
        user: &UserId,
    ) -> Vec<NearbyHazard> {
        let nearby = filter_by_proximity(
            hazards,
            Some(origin),
            self.config.prompt_radius_m,
            &HazardFilters::default(),
        );
        let session = self.session();
        nearby
            .into_iter()
            .filter(|n| !n.hazard.verified && !session.votes.contains(&n.hazard.id, user))
            .collect()
    }

    /// The single hazard `user` should be asked about at `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Store`] if hazards cannot be listed.
    pub async fn next_prompt(
        &self,
        user: &UserId,
        origin: GeoPoint,
    ) -> Result<Option<NearbyHazard>, VerificationError> {
        let hazards = self.store.list().await?;
        let candidates = self.prompt_candidates(&hazards, origin, user);

        let mut session = self.session();
        let prompter = session.prompters.entry(user.clone()).or_default();
        Ok(prompter.refresh(&candidates).cloned())
    }

    /// Skips the current prompt for `user`, returning the skipped hazard.
    pub fn skip_prompt(&self, user: &UserId) -> Option<HazardId> {
        self.session()
            .prompters
            .get_mut(user)
            .and_then(VotingPrompter::skip)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use road_hazard_models::{HazardType, HazardUpdate, NewHazard, Severity, VoteCounts};
    use road_hazard_store::{FileStore, HazardSnapshot, MemoryStore, StoreError};
    use tokio::sync::watch;

    use super::*;

    const SITE: GeoPoint = GeoPoint::new(28.6150, 77.2100);

    async fn service_with_hazard() -> (VerificationService, Arc<MemoryStore>, HazardId) {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .create(NewHazard::manual(HazardType::Pothole, Severity::High, SITE))
            .await
            .unwrap();
        let service = VerificationService::new(store.clone(), VerificationConfig::default());
        (service, store, id)
    }

    fn user(n: u32) -> UserId {
        UserId::new(format!("user_{n}"))
    }

    #[tokio::test]
    async fn third_yes_vote_verifies() {
        let (service, store, id) = service_with_hazard().await;

        for n in 0..2 {
            let outcome = service.submit_vote(&id, &user(n), VoteKind::Yes).await.unwrap();
            assert_eq!(outcome.state, VoteState::Pending);
        }
        let outcome = service.submit_vote(&id, &user(2), VoteKind::Yes).await.unwrap();
        assert_eq!(outcome.state, VoteState::Verified);
        assert!(outcome.transitioned);
        assert_eq!(outcome.counts.yes, 3);
        assert!(store.read(&id).await.unwrap().unwrap().verified);

        assert!(matches!(
            service.submit_vote(&id, &user(3), VoteKind::Yes).await,
            Err(VerificationError::AlreadyVerified { .. })
        ));
    }

    #[tokio::test]
    async fn second_no_vote_removes() {
        let (service, store, id) = service_with_hazard().await;

        let first = service.submit_vote(&id, &user(0), VoteKind::No).await.unwrap();
        assert_eq!(first.state, VoteState::Pending);

        let second = service.submit_vote(&id, &user(1), VoteKind::No).await.unwrap();
        assert_eq!(second.state, VoteState::Removed);
        assert!(second.transitioned);
        assert!(store.read(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeat_vote_is_rejected_without_counting() {
        let (service, store, id) = service_with_hazard().await;
        service.submit_vote(&id, &user(0), VoteKind::Yes).await.unwrap();

        assert!(matches!(
            service.submit_vote(&id, &user(0), VoteKind::No).await,
            Err(VerificationError::AlreadyVoted { .. })
        ));
        let record = store.read(&id).await.unwrap().unwrap();
        assert_eq!(record.votes().yes, 1);
        assert_eq!(record.votes().no, 0);
    }

    #[tokio::test]
    async fn concurrent_yes_votes_promote_exactly_once() {
        let (service, store, id) = service_with_hazard().await;
        let service = Arc::new(service);

        let tasks: Vec<_> = (0..8)
            .map(|n| {
                let service = service.clone();
                let id = id.clone();
                tokio::spawn(async move { service.submit_vote(&id, &user(n), VoteKind::Yes).await })
            })
            .collect();

        let mut transitions = 0;
        for task in tasks {
            // Late voters may find the hazard already verified.
            if let Ok(outcome) = task.await.unwrap()
                && outcome.transitioned
            {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
        assert!(store.read(&id).await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn votes_on_missing_hazards_are_not_recorded() {
        let (service, store, id) = service_with_hazard().await;
        store.delete(&id).await.unwrap();

        assert!(matches!(
            service.submit_vote(&id, &user(0), VoteKind::Yes).await,
            Err(VerificationError::NotFound { .. })
        ));
        assert!(!service.has_voted(&id, &user(0)));
    }

    #[tokio::test]
    async fn failed_store_write_keeps_ledger_entry() {
        let (service, store, id) = service_with_hazard().await;
        store.delete(&id).await.unwrap();

        assert!(matches!(
            service.request_removal(&id, &user(1)).await,
            Err(VerificationError::Store(StoreError::NotFound { .. }))
        ));
        // No automatic retry: the same traveler cannot request again.
        assert!(matches!(
            service.request_removal(&id, &user(1)).await,
            Err(VerificationError::AlreadyRequested { .. })
        ));
    }

    #[tokio::test]
    async fn removal_threshold_deletes_once() {
        let store = Arc::new(MemoryStore::new());
        let config = VerificationConfig {
            removal_threshold: 3,
            ..VerificationConfig::default()
        };
        let service = VerificationService::new(store.clone(), config);
        let id = store
            .create(NewHazard::manual(HazardType::SpeedBreaker, Severity::Low, SITE))
            .await
            .unwrap();

        assert!(!service.request_removal(&id, &user(0)).await.unwrap().removed);
        assert!(store.read(&id).await.unwrap().unwrap().removal_requested);
        assert!(!service.request_removal(&id, &user(1)).await.unwrap().removed);
        let last = service.request_removal(&id, &user(2)).await.unwrap();
        assert_eq!(last.removal_votes, 3);
        assert!(last.removed);
        assert!(store.read(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prompts_skip_voted_and_verified_hazards() {
        let store = Arc::new(MemoryStore::new());
        let service = VerificationService::new(store.clone(), VerificationConfig::default());
        let origin = GeoPoint::new(28.6139, 77.2090);

        let near = store
            .create(NewHazard::manual(HazardType::Pothole, Severity::Low, GeoPoint::new(28.6140, 77.2091)))
            .await
            .unwrap();
        let farther = store
            .create(NewHazard::manual(HazardType::Pothole, Severity::Low, SITE))
            .await
            .unwrap();
        let verified = store
            .create(NewHazard::manual(HazardType::Manhole, Severity::Low, origin))
            .await
            .unwrap();
        store.mark_verified(&verified).await.unwrap();
        store
            .create(NewHazard::manual(HazardType::Pothole, Severity::Low, GeoPoint::new(28.63, 77.2090)))
            .await
            .unwrap();

        let me = user(0);
        let prompt = service.next_prompt(&me, origin).await.unwrap().unwrap();
        assert_eq!(prompt.hazard.id, near);

        service.submit_vote(&near, &me, VoteKind::Yes).await.unwrap();
        let prompt = service.next_prompt(&me, origin).await.unwrap().unwrap();
        assert_eq!(prompt.hazard.id, farther);

        assert_eq!(service.skip_prompt(&me), Some(farther));
        assert!(service.next_prompt(&me, origin).await.unwrap().is_none());

        // Another traveler still sees both.
        let other = service.next_prompt(&user(1), origin).await.unwrap().unwrap();
        assert_eq!(other.hazard.id, near);
    }

    #[tokio::test]
    async fn stats_reflect_votes() {
        let (service, _store, id) = service_with_hazard().await;
        service.submit_vote(&id, &user(0), VoteKind::Yes).await.unwrap();
        service.submit_vote(&id, &user(1), VoteKind::No).await.unwrap();

        let stats = service.stats(&id).await.unwrap();
        assert_eq!(stats.total_votes, 2);
        assert_eq!(stats.verification_percentage, 50);
        assert!(!stats.is_verified);
    }

    #[tokio::test]
    async fn unsaved_yes_vote_is_not_counted() {
        let dir = std::env::temp_dir().join(format!(
            "road_hazard_verification_{}",
            uuid::Uuid::new_v4().simple()
        ));
        let path = dir.join("hazards.json");
        let store = Arc::new(FileStore::new(&path));
        let id = store
            .create(NewHazard::manual(HazardType::Pothole, Severity::High, SITE))
            .await
            .unwrap();
        let service = VerificationService::new(store.clone(), VerificationConfig::default());

        for n in 0..2 {
            service.submit_vote(&id, &user(n), VoteKind::Yes).await.unwrap();
        }

        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();
        tokio::fs::write(path.join("occupied"), b"x").await.unwrap();

        assert!(matches!(
            service.submit_vote(&id, &user(2), VoteKind::Yes).await,
            Err(VerificationError::Store(StoreError::Io(_)))
        ));
        let record = store.read(&id).await.unwrap().unwrap();
        assert_eq!(record.vote_yes, 2);
        assert!(!record.verified);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    /// Store whose promotion always reports that another writer got there
    /// first.
    struct LostPromotionStore(MemoryStore);

    #[async_trait]
    impl HazardStore for LostPromotionStore {
        fn name(&self) -> &'static str {
            "lost-promotion"
        }

        async fn health(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn create(&self, hazard: NewHazard) -> Result<HazardId, StoreError> {
            self.0.create(hazard).await
        }

        async fn read(&self, id: &HazardId) -> Result<Option<HazardRecord>, StoreError> {
            self.0.read(id).await
        }

        async fn list(&self) -> Result<Vec<HazardRecord>, StoreError> {
            self.0.list().await
        }

        async fn update(
            &self,
            id: &HazardId,
            update: HazardUpdate,
        ) -> Result<HazardRecord, StoreError> {
            self.0.update(id, update).await
        }

        async fn delete(&self, id: &HazardId) -> Result<bool, StoreError> {
            self.0.delete(id).await
        }

        async fn increment_vote(
            &self,
            id: &HazardId,
            kind: VoteKind,
        ) -> Result<VoteCounts, StoreError> {
            self.0.increment_vote(id, kind).await
        }

        async fn mark_verified(&self, id: &HazardId) -> Result<bool, StoreError> {
            self.0.mark_verified(id).await?;
            Ok(false)
        }

        async fn request_removal(&self, id: &HazardId) -> Result<u32, StoreError> {
            self.0.request_removal(id).await
        }

        fn subscribe(&self) -> watch::Receiver<HazardSnapshot> {
            self.0.subscribe()
        }
    }

    #[tokio::test]
    async fn threshold_vote_without_promotion_does_not_transition() {
        let store = Arc::new(LostPromotionStore(MemoryStore::new()));
        let id = store
            .create(NewHazard::manual(HazardType::Pothole, Severity::High, SITE))
            .await
            .unwrap();
        let service = VerificationService::new(store.clone(), VerificationConfig::default());

        for n in 0..2 {
            service.submit_vote(&id, &user(n), VoteKind::Yes).await.unwrap();
        }
        let outcome = service.submit_vote(&id, &user(2), VoteKind::Yes).await.unwrap();
        assert_eq!(outcome.counts.yes, 3);
        assert_eq!(outcome.state, VoteState::Verified);
        assert!(!outcome.transitioned);
        assert!(store.read(&id).await.unwrap().unwrap().verified);
    }
}
