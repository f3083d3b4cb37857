#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Hazard record storage.
//!
//! [`HazardStore`] is the narrow contract the engines use to persist
//! reports. Counter updates are single atomic operations on the store
//! ([`increment_vote`](HazardStore::increment_vote),
//! [`mark_verified`](HazardStore::mark_verified),
//! [`request_removal`](HazardStore::request_removal),
//! [`delete`](HazardStore::delete)) so that concurrent voters can never
//! promote or remove a hazard twice.
//!
//! Three implementations are provided:
//!
//! * [`MemoryStore`]: in-process map with snapshot subscriptions.
//! * [`FileStore`]: a [`MemoryStore`] persisted to a JSON file.
//! * [`FallbackStore`]: picks a primary store when its health probe
//!   passes, otherwise a fallback, and can re-probe the primary later.

mod fallback;
mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use road_hazard_models::{HazardId, HazardRecord, HazardUpdate, NewHazard, VoteCounts, VoteKind};
use thiserror::Error;
use tokio::sync::watch;

pub use fallback::FallbackStore;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Every stored hazard at one point in time, ordered by id.
pub type HazardSnapshot = Arc<Vec<HazardRecord>>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No hazard with this id exists.
    #[error("Hazard not found: {id}")]
    NotFound {
        /// The missing id.
        id: HazardId,
    },

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend is not usable right now.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },
}

/// Storage backend for hazard records.
#[async_trait]
pub trait HazardStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Probes whether the backend can serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unusable.
    async fn health(&self) -> Result<(), StoreError>;

    /// Stores a new hazard and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn create(&self, hazard: NewHazard) -> Result<HazardId, StoreError>;

    /// Reads one hazard.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails. A missing hazard is `Ok(None)`.
    async fn read(&self, id: &HazardId) -> Result<Option<HazardRecord>, StoreError>;

    /// Lists every hazard.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails.
    async fn list(&self) -> Result<Vec<HazardRecord>, StoreError>;

    /// Applies a partial update and returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the hazard does not exist.
    async fn update(&self, id: &HazardId, update: HazardUpdate)
    -> Result<HazardRecord, StoreError>;

    /// Deletes a hazard. Returns `true` only for the call that actually
    /// removed it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn delete(&self, id: &HazardId) -> Result<bool, StoreError>;

    /// Adds exactly one vote and returns the counters after the increment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the hazard does not exist.
    async fn increment_vote(&self, id: &HazardId, kind: VoteKind)
    -> Result<VoteCounts, StoreError>;

    /// Sets `verified`. Returns `true` only for the call that flipped it
    /// from false to true.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the hazard does not exist.
    async fn mark_verified(&self, id: &HazardId) -> Result<bool, StoreError>;

    /// Flags the hazard for removal, adds one removal vote, and returns the
    /// new removal vote count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the hazard does not exist.
    async fn request_removal(&self, id: &HazardId) -> Result<u32, StoreError>;

    /// Subscribes to snapshots published after every change. The receiver
    /// starts at the current snapshot; dropping it unsubscribes.
    fn subscribe(&self) -> watch::Receiver<HazardSnapshot>;
}

/// Short random identifier with an optional prefix.
fn new_id(prefix: &str) -> HazardId {
    HazardId::new(format!("{prefix}{}", uuid::Uuid::new_v4().simple()))
}
