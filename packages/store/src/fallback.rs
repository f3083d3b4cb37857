use std::sync::Arc;

use async_trait::async_trait;
use road_hazard_models::{HazardId, HazardRecord, HazardUpdate, NewHazard, VoteCounts, VoteKind};
use tokio::sync::{RwLock, watch};

use crate::{HazardSnapshot, HazardStore, StoreError};

/// Routes every call to either a primary or a fallback store.
///
/// The primary is chosen at construction when its health probe passes.
/// [`retry_primary`](Self::retry_primary) re-probes it at runtime and
/// switches back on success. Records are not copied between backends.
pub struct FallbackStore {
    primary: Arc<dyn HazardStore>,
    fallback: Arc<dyn HazardStore>,
    active: RwLock<Arc<dyn HazardStore>>,
    updates: watch::Sender<HazardSnapshot>,
}

impl FallbackStore {
    /// Probes `primary` and starts on it when healthy, otherwise on
    /// `fallback`.
    pub async fn select(primary: Arc<dyn HazardStore>, fallback: Arc<dyn HazardStore>) -> Self {
        let active = match primary.health().await {
            Ok(()) => {
                log::info!("Using {} hazard store", primary.name());
                primary.clone()
            }
            Err(e) => {
                log::warn!(
                    "Primary {} store unavailable ({e}), falling back to {}",
                    primary.name(),
                    fallback.name()
                );
                fallback.clone()
            }
        };

        let initial = active.list().await.unwrap_or_default();
        let (updates, _) = watch::channel(Arc::new(initial));

        Self {
            primary,
            fallback,
            active: RwLock::new(active),
            updates,
        }
    }

    /// Whether calls currently go to the primary store.
    pub async fn is_primary(&self) -> bool {
        Arc::ptr_eq(&*self.active.read().await, &self.primary)
    }

    /// Name of the backend currently serving calls.
    pub async fn active_name(&self) -> &'static str {
        self.active.read().await.name()
    }

    /// Re-probes the primary and switches to it when healthy. Returns
    /// whether the primary is active afterwards.
    ///
    /// # Errors
    ///
    /// Returns the probe error when the primary is still unavailable.
    pub async fn retry_primary(&self) -> Result<bool, StoreError> {
        if self.is_primary().await {
            return Ok(true);
        }

        self.primary.health().await?;
        *self.active.write().await = self.primary.clone();
        log::info!(
            "Primary {} store is back, leaving {}",
            self.primary.name(),
            self.fallback.name()
        );
        self.publish(&self.primary).await;
        Ok(true)
    }

    async fn current(&self) -> Arc<dyn HazardStore> {
        self.active.read().await.clone()
    }

    async fn publish(&self, store: &Arc<dyn HazardStore>) {
        match store.list().await {
            Ok(records) => {
                self.updates.send_replace(Arc::new(records));
            }
            Err(e) => log::warn!("Could not refresh hazard snapshot: {e}"),
        }
    }
}

#[async_trait]
impl HazardStore for FallbackStore {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn health(&self) -> Result<(), StoreError> {
        self.current().await.health().await
    }

    async fn create(&self, hazard: NewHazard) -> Result<HazardId, StoreError> {
        let store = self.current().await;
        let id = store.create(hazard).await?;
        self.publish(&store).await;
        Ok(id)
    }

    async fn read(&self, id: &HazardId) -> Result<Option<HazardRecord>, StoreError> {
        self.current().await.read(id).await
    }

    async fn list(&self) -> Result<Vec<HazardRecord>, StoreError> {
        self.current().await.list().await
    }

    async fn update(
        &self,
        id: &HazardId,
        update: HazardUpdate,
    ) -> Result<HazardRecord, StoreError> {
        let store = self.current().await;
        let record = store.update(id, update).await?;
        self.publish(&store).await;
        Ok(record)
    }

    async fn delete(&self, id: &HazardId) -> Result<bool, StoreError> {
        let store = self.current().await;
        let removed = store.delete(id).await?;
        if removed {
            self.publish(&store).await;
        }
        Ok(removed)
    }

    async fn increment_vote(
        &self,
        id: &HazardId,
        kind: VoteKind,
    ) -> Result<VoteCounts, StoreError> {
        let store = self.current().await;
        let counts = store.increment_vote(id, kind).await?;
        self.publish(&store).await;
        Ok(counts)
    }

    async fn mark_verified(&self, id: &HazardId) -> Result<bool, StoreError> {
        let store = self.current().await;
        let transitioned = store.mark_verified(id).await?;
        if transitioned {
            self.publish(&store).await;
        }
        Ok(transitioned)
    }

    async fn request_removal(&self, id: &HazardId) -> Result<u32, StoreError> {
        let store = self.current().await;
        let votes = store.request_removal(id).await?;
        self.publish(&store).await;
        Ok(votes)
    }

    fn subscribe(&self) -> watch::Receiver<HazardSnapshot> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use road_hazard_models::{GeoPoint, HazardType, Severity};

    use super::*;
    use crate::MemoryStore;

    /// A memory store whose health probe can be switched off.
    struct Flaky {
        inner: MemoryStore,
        healthy: AtomicBool,
    }

    impl Flaky {
        fn new(healthy: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                healthy: AtomicBool::new(healthy),
            }
        }
    }

    #[async_trait]
    impl HazardStore for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn health(&self) -> Result<(), StoreError> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(StoreError::Unavailable {
                    message: "offline".to_string(),
                })
            }
        }

        async fn create(&self, hazard: NewHazard) -> Result<HazardId, StoreError> {
            self.inner.create(hazard).await
        }

        async fn read(&self, id: &HazardId) -> Result<Option<HazardRecord>, StoreError> {
            self.inner.read(id).await
        }

        async fn list(&self) -> Result<Vec<HazardRecord>, StoreError> {
            self.inner.list().await
        }

        async fn update(
            &self,
            id: &HazardId,
            update: HazardUpdate,
        ) -> Result<HazardRecord, StoreError> {
            self.inner.update(id, update).await
        }

        async fn delete(&self, id: &HazardId) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }

        async fn increment_vote(
            &self,
            id: &HazardId,
            kind: VoteKind,
        ) -> Result<VoteCounts, StoreError> {
            self.inner.increment_vote(id, kind).await
        }

        async fn mark_verified(&self, id: &HazardId) -> Result<bool, StoreError> {
            self.inner.mark_verified(id).await
        }

        async fn request_removal(&self, id: &HazardId) -> Result<u32, StoreError> {
            self.inner.request_removal(id).await
        }

        fn subscribe(&self) -> watch::Receiver<HazardSnapshot> {
            self.inner.subscribe()
        }
    }

    fn manhole() -> NewHazard {
        NewHazard::manual(HazardType::Manhole, Severity::Medium, GeoPoint::new(19.07, 72.87))
    }

    #[tokio::test]
    async fn healthy_primary_is_selected() {
        let store = FallbackStore::select(
            Arc::new(Flaky::new(true)),
            Arc::new(MemoryStore::with_id_prefix("local_")),
        )
        .await;
        assert!(store.is_primary().await);
        let id = store.create(manhole()).await.unwrap();
        assert!(!id.as_str().starts_with("local_"));
    }

    #[tokio::test]
    async fn unhealthy_primary_falls_back_then_recovers() {
        let primary = Arc::new(Flaky::new(false));
        let store = FallbackStore::select(
            primary.clone(),
            Arc::new(MemoryStore::with_id_prefix("local_")),
        )
        .await;
        assert!(!store.is_primary().await);
        assert_eq!(store.active_name().await, "memory");

        let id = store.create(manhole()).await.unwrap();
        assert!(id.as_str().starts_with("local_"));

        assert!(store.retry_primary().await.is_err());
        assert!(!store.is_primary().await);

        primary.healthy.store(true, Ordering::SeqCst);
        assert!(store.retry_primary().await.unwrap());
        assert!(store.is_primary().await);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_follows_active_backend() {
        let primary = Arc::new(Flaky::new(false));
        let store = FallbackStore::select(primary.clone(), Arc::new(MemoryStore::new())).await;
        let mut updates = store.subscribe();

        store.create(manhole()).await.unwrap();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().len(), 1);

        primary.healthy.store(true, Ordering::SeqCst);
        store.retry_primary().await.unwrap();
        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().is_empty());
    }
}
