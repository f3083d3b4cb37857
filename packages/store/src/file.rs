use std::path::{Path, PathBuf};

use async_trait::async_trait;
use road_hazard_models::{HazardId, HazardRecord, HazardUpdate, NewHazard, VoteCounts, VoteKind};
use tokio::sync::{Mutex, MutexGuard, OnceCell, watch};

use crate::{HazardSnapshot, HazardStore, MemoryStore, StoreError};

/// Hazard store persisted as a JSON array in a single file.
///
/// The file is loaded on first use. Mutations are applied to a staged copy
/// of the records and only become visible once that copy has been written,
/// so a failed write leaves both the file and the served records
/// unchanged. Writes go to a sibling temporary file that is then renamed
/// over the original.
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    loaded: OnceCell<()>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// A store backed by `path`. Nothing is read until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: MemoryStore::new(),
            loaded: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_loaded(&self) -> Result<(), StoreError> {
        self.loaded
            .get_or_try_init(|| async {
                let records = read_records(&self.path).await?;
                log::info!(
                    "Loaded {} hazards from {}",
                    records.len(),
                    self.path.display()
                );
                self.inner.replace_all(records).await;
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Locks out other writers and returns a copy of the current records
    /// to mutate. The guard must be held until [`Self::commit`] returns.
    async fn stage(&self) -> Result<(MutexGuard<'_, ()>, MemoryStore), StoreError> {
        self.ensure_loaded().await?;
        let guard = self.write_lock.lock().await;
        let records = self.inner.snapshot().await;
        Ok((guard, MemoryStore::with_records("", records.to_vec())))
    }

    /// Writes `staged` to disk and, once written, serves it.
    async fn commit(&self, staged: &MemoryStore) -> Result<(), StoreError> {
        let records = staged.snapshot().await;
        if let Err(e) = write_records(&self.path, &records).await {
            log::warn!("Discarding change, {} not written: {e}", self.path.display());
            return Err(e);
        }
        self.inner.replace_all(records.to_vec()).await;
        Ok(())
    }
}

async fn read_records(path: &Path) -> Result<Vec<HazardRecord>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

async fn write_records(path: &Path, records: &[HazardRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(records)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl HazardStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn health(&self) -> Result<(), StoreError> {
        let (_guard, staged) = self.stage().await?;
        self.commit(&staged).await
    }

    async fn create(&self, hazard: NewHazard) -> Result<HazardId, StoreError> {
        let (_guard, staged) = self.stage().await?;
        let id = staged.create(hazard).await?;
        self.commit(&staged).await?;
        Ok(id)
    }

    async fn read(&self, id: &HazardId) -> Result<Option<HazardRecord>, StoreError> {
        self.ensure_loaded().await?;
        self.inner.read(id).await
    }

    async fn list(&self) -> Result<Vec<HazardRecord>, StoreError> {
        self.ensure_loaded().await?;
        self.inner.list().await
    }

    async fn update(
        &self,
        id: &HazardId,
        update: HazardUpdate,
    ) -> Result<HazardRecord, StoreError> {
        let (_guard, staged) = self.stage().await?;
        let record = staged.update(id, update).await?;
        self.commit(&staged).await?;
        Ok(record)
    }

    async fn delete(&self, id: &HazardId) -> Result<bool, StoreError> {
        let (_guard, staged) = self.stage().await?;
        let removed = staged.delete(id).await?;
        if removed {
            self.commit(&staged).await?;
        }
        Ok(removed)
    }

    async fn increment_vote(
        &self,
        id: &HazardId,
        kind: VoteKind,
    ) -> Result<VoteCounts, StoreError> {
        let (_guard, staged) = self.stage().await?;
        let counts = staged.increment_vote(id, kind).await?;
        self.commit(&staged).await?;
        Ok(counts)
    }

    async fn mark_verified(&self, id: &HazardId) -> Result<bool, StoreError> {
        let (_guard, staged) = self.stage().await?;
        let transitioned = staged.mark_verified(id).await?;
        if transitioned {
            self.commit(&staged).await?;
        }
        Ok(transitioned)
    }

    async fn request_removal(&self, id: &HazardId) -> Result<u32, StoreError> {
        let (_guard, staged) = self.stage().await?;
        let votes = staged.request_removal(id).await?;
        self.commit(&staged).await?;
        Ok(votes)
    }

    fn subscribe(&self) -> watch::Receiver<HazardSnapshot> {
        self.inner.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use road_hazard_models::{GeoPoint, HazardType, Severity};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("road_hazard_store_{}", uuid::Uuid::new_v4().simple()))
            .join(name)
    }

    fn speed_breaker() -> NewHazard {
        NewHazard::manual(HazardType::SpeedBreaker, Severity::Low, GeoPoint::new(12.97, 77.59))
    }

    #[tokio::test]
    async fn survives_reopen() {
        let path = temp_path("hazards.json");
        let store = FileStore::new(&path);
        let id = store.create(speed_breaker()).await.unwrap();
        store.increment_vote(&id, VoteKind::Yes).await.unwrap();

        let reopened = FileStore::new(&path);
        let record = reopened.read(&id).await.unwrap().unwrap();
        assert_eq!(record.vote_yes, 1);
        assert_eq!(reopened.list().await.unwrap().len(), 1);

        tokio::fs::remove_dir_all(path.parent().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_empty_and_healthy() {
        let path = temp_path("fresh.json");
        let store = FileStore::new(&path);
        assert!(store.list().await.unwrap().is_empty());
        store.health().await.unwrap();
        assert!(path.exists());

        tokio::fs::remove_dir_all(path.parent().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_unhealthy() {
        let path = temp_path("broken.json");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.health().await, Err(StoreError::Json(_))));

        tokio::fs::remove_dir_all(path.parent().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_write_changes_nothing() {
        let path = temp_path("hazards.json");
        let store = FileStore::new(&path);
        let id = store.create(speed_breaker()).await.unwrap();
        store.increment_vote(&id, VoteKind::Yes).await.unwrap();
        store.increment_vote(&id, VoteKind::Yes).await.unwrap();

        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();
        tokio::fs::write(path.join("occupied"), b"x").await.unwrap();

        assert!(matches!(
            store.increment_vote(&id, VoteKind::Yes).await,
            Err(StoreError::Io(_))
        ));
        assert!(store.request_removal(&id).await.is_err());
        assert!(store.create(speed_breaker()).await.is_err());

        let record = store.read(&id).await.unwrap().unwrap();
        assert_eq!(record.vote_yes, 2);
        assert!(!record.removal_requested);
        assert_eq!(store.list().await.unwrap().len(), 1);

        tokio::fs::remove_dir_all(path.parent().unwrap()).await.unwrap();
    }
}
