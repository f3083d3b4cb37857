#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crowd verification of hazard reports.
//!
//! Each traveler may vote once per hazard per session. Votes are counted
//! with the store's atomic increment, and the counters returned by that
//! increment decide the transition:
//!
//! * three `yes` votes promote the hazard to verified (at most once);
//! * two `no` votes delete it (at most once).
//!
//! Removal requests follow the same pattern with their own ledger and a
//! much higher threshold. The session ledgers are process-local, so a
//! traveler who restarts can vote again.

mod ledger;
mod prompt;
mod service;

use road_hazard_models::{HazardId, HazardRecord, UserId, VoteCounts};
use road_hazard_store::StoreError;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

pub use ledger::VoteLedger;
pub use prompt::VotingPrompter;
pub use service::VerificationService;

/// Errors that can occur during verification operations.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// This traveler already voted on this hazard in this session.
    #[error("User {user} already voted on hazard {hazard}")]
    AlreadyVoted {
        /// Hazard voted on.
        hazard: HazardId,
        /// Voter.
        user: UserId,
    },

    /// This traveler already asked for this hazard to be removed.
    #[error("User {user} already requested removal of hazard {hazard}")]
    AlreadyRequested {
        /// Hazard in question.
        hazard: HazardId,
        /// Requester.
        user: UserId,
    },

    /// The hazard is already verified and no longer takes votes.
    #[error("Hazard {id} is already verified")]
    AlreadyVerified {
        /// The verified hazard.
        id: HazardId,
    },

    /// The hazard does not exist.
    #[error("Hazard not found: {id}")]
    NotFound {
        /// The missing id.
        id: HazardId,
    },

    /// The store rejected the change. The ledger entry is kept.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Vote and removal thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// `yes` votes needed to verify.
    pub verify_threshold: u32,
    /// `no` votes needed to delete.
    pub reject_threshold: u32,
    /// Removal requests needed to delete.
    pub removal_threshold: u32,
    /// Radius for voting prompts, in meters.
    pub prompt_radius_m: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            verify_threshold: 3,
            reject_threshold: 2,
            removal_threshold: 20,
            prompt_radius_m: 200.0,
        }
    }
}

/// Where a hazard stands after a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VoteState {
    /// Still collecting votes.
    Pending,
    /// Promoted to verified.
    Verified,
    /// Deleted from the store.
    Removed,
}

/// Result of an accepted vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    /// Counters right after this vote.
    pub counts: VoteCounts,
    /// Resulting state.
    pub state: VoteState,
    /// Whether this vote caused the transition.
    pub transitioned: bool,
}

/// Result of an accepted removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOutcome {
    /// Removal requests right after this one.
    pub removal_votes: u32,
    /// Whether this request deleted the hazard.
    pub removed: bool,
}

/// Vote summary for one hazard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStats {
    pub total_votes: u32,
    pub yes_votes: u32,
    pub no_votes: u32,
    /// `round(yes / total * 100)`, or 0 without votes.
    pub verification_percentage: u32,
    pub is_verified: bool,
    /// `min(yes / verify_threshold, 1)`.
    pub confidence: f64,
}

impl VerificationStats {
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_record(record: &HazardRecord, verify_threshold: u32) -> Self {
        let yes = record.vote_yes;
        let no = record.vote_no;
        let total = yes.saturating_add(no);

        let verification_percentage = if total == 0 {
            0
        } else {
            (f64::from(yes) / f64::from(total) * 100.0).round() as u32
        };
        let confidence = if verify_threshold == 0 {
            1.0
        } else {
            (f64::from(yes) / f64::from(verify_threshold)).min(1.0)
        };

        Self {
            total_votes: total,
            yes_votes: yes,
            no_votes: no,
            verification_percentage,
            is_verified: record.verified,
            confidence,
        }
    }
}

/// A fresh anonymous traveler id.
#[must_use]
pub fn new_user_id() -> UserId {
    UserId::new(format!("user_{}", uuid::Uuid::new_v4().simple()))
}
