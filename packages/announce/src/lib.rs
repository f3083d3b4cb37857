#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spoken hazard warnings.
//!
//! [`AnnounceQueue`] serializes announcements through a single worker task
//! so two warnings never overlap. Higher priorities go first and equal
//! priorities keep their enqueue order. The actual audio output sits
//! behind the [`Speaker`] trait.

mod queue;

use async_trait::async_trait;
use road_hazard_models::{HazardType, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use queue::{AnnounceQueue, Announcement, Outcome};

/// Errors that can occur while speaking.
#[derive(Debug, Error)]
pub enum AnnounceError {
    /// The speaker failed to play an item.
    #[error("Speaker error: {message}")]
    Speaker {
        /// Description of what went wrong.
        message: String,
    },
}

/// Audio output for announcements.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speaks `text`, returning when playback has finished. The future is
    /// dropped when the item is cancelled mid-playback.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError::Speaker`] if playback fails.
    async fn speak(&self, text: &str) -> Result<(), AnnounceError>;

    /// Short attention tone.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError::Speaker`] if playback fails.
    async fn beep(&self) -> Result<(), AnnounceError> {
        Ok(())
    }
}

/// Speaker that writes announcements to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeaker;

#[async_trait]
impl Speaker for LogSpeaker {
    async fn speak(&self, text: &str) -> Result<(), AnnounceError> {
        log::info!("Announcement: {text}");
        Ok(())
    }

    async fn beep(&self) -> Result<(), AnnounceError> {
        log::info!("Beep");
        Ok(())
    }
}

/// Queue timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    /// Pause after each item before the next one starts.
    pub inter_item_delay_ms: u64,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            inter_item_delay_ms: 300,
        }
    }
}

/// Spoken warning for a hazard `distance_m` ahead.
#[must_use]
pub fn warning_text(hazard_type: HazardType, severity: Severity, distance_m: f64) -> String {
    let label = hazard_type.label();
    let meters = distance_m.max(0.0).round();
    match severity {
        Severity::High => format!(
            "Warning! Severe {label} ahead in {meters:.0} meters. Please slow down immediately!"
        ),
        Severity::Medium => {
            format!("Caution! {label} ahead in {meters:.0} meters. Reduce your speed.")
        }
        Severity::Low => format!("Attention! {label} ahead in {meters:.0} meters."),
    }
}

/// Queue priority for a warning of `severity`.
#[must_use]
pub const fn warning_priority(severity: Severity) -> u8 {
    match severity {
        Severity::High => 3,
        Severity::Medium => 2,
        Severity::Low => 1,
    }
}
