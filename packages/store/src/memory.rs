use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use road_hazard_models::{HazardId, HazardRecord, HazardUpdate, NewHazard, VoteCounts, VoteKind};
use tokio::sync::{RwLock, watch};

use crate::{HazardSnapshot, HazardStore, StoreError, new_id};

/// In-process hazard store.
///
/// Every mutation runs under one write lock, which makes the counter
/// operations atomic with respect to each other.
pub struct MemoryStore {
    id_prefix: String,
    records: RwLock<BTreeMap<HazardId, HazardRecord>>,
    updates: watch::Sender<HazardSnapshot>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store with unprefixed ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_prefix("")
    }

    /// An empty store whose generated ids start with `prefix`.
    #[must_use]
    pub fn with_id_prefix(prefix: impl Into<String>) -> Self {
        let (updates, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            id_prefix: prefix.into(),
            records: RwLock::new(BTreeMap::new()),
            updates,
        }
    }

    /// A store pre-populated with `records`, keeping their ids.
    #[must_use]
    pub fn with_records(prefix: impl Into<String>, records: Vec<HazardRecord>) -> Self {
        let store = Self::with_id_prefix(prefix);
        let map: BTreeMap<HazardId, HazardRecord> = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        store.updates.send_replace(Arc::new(map.values().cloned().collect()));
        Self {
            records: RwLock::new(map),
            ..store
        }
    }

    /// Replaces every record, keeping their ids.
    pub(crate) async fn replace_all(&self, records: Vec<HazardRecord>) {
        let mut map = self.records.write().await;
        *map = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        self.publish(&map);
    }

    /// Current records ordered by id.
    pub async fn snapshot(&self) -> HazardSnapshot {
        Arc::new(self.records.read().await.values().cloned().collect())
    }

    fn publish(&self, records: &BTreeMap<HazardId, HazardRecord>) {
        self.updates
            .send_replace(Arc::new(records.values().cloned().collect()));
    }

    async fn modify<T>(
        &self,
        id: &HazardId,
        f: impl FnOnce(&mut HazardRecord) -> T + Send,
    ) -> Result<T, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        let result = f(record);
        self.publish(&records);
        Ok(result)
    }
}

#[async_trait]
impl HazardStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create(&self, hazard: NewHazard) -> Result<HazardId, StoreError> {
        let id = new_id(&self.id_prefix);
        let record = HazardRecord::from_new(id.clone(), hazard, Utc::now());

        let mut records = self.records.write().await;
        records.insert(id.clone(), record);
        self.publish(&records);
        drop(records);

        log::debug!("Created hazard {id}");
        Ok(id)
    }

    async fn read(&self, id: &HazardId) -> Result<Option<HazardRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<HazardRecord>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn update(
        &self,
        id: &HazardId,
        update: HazardUpdate,
    ) -> Result<HazardRecord, StoreError> {
        self.modify(id, |record| {
            update.apply(record);
            record.clone()
        })
        .await
    }

    async fn delete(&self, id: &HazardId) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let removed = records.remove(id).is_some();
        if removed {
            self.publish(&records);
        }
        Ok(removed)
    }

    async fn increment_vote(
        &self,
        id: &HazardId,
        kind: VoteKind,
    ) -> Result<VoteCounts, StoreError> {
        self.modify(id, |record| {
            match kind {
                VoteKind::Yes => record.vote_yes = record.vote_yes.saturating_add(1),
                VoteKind::No => record.vote_no = record.vote_no.saturating_add(1),
            }
            record.votes()
        })
        .await
    }

    async fn mark_verified(&self, id: &HazardId) -> Result<bool, StoreError> {
        self.modify(id, |record| {
            let transitioned = !record.verified;
            record.verified = true;
            transitioned
        })
        .await
    }

    async fn request_removal(&self, id: &HazardId) -> Result<u32, StoreError> {
        self.modify(id, |record| {
            record.removal_requested = true;
            record.removal_votes = record.removal_votes.saturating_add(1);
            record.removal_votes
        })
        .await
    }

    fn subscribe(&self) -> watch::Receiver<HazardSnapshot> {
        self.updates.subscribe()
    }
}
