use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, oneshot, watch};
use tokio::task::JoinHandle;

use crate::{AnnounceConfig, Speaker};

/// How an enqueued item ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Played to completion.
    Spoken,
    /// Dropped by [`AnnounceQueue::cancel`] or shutdown.
    Cancelled,
    /// The speaker reported an error.
    Failed {
        /// Speaker error text.
        message: String,
    },
}

/// Pending result of one enqueued item.
pub struct Announcement {
    rx: oneshot::Receiver<Outcome>,
}

impl Announcement {
    /// Waits for the item to finish.
    pub async fn outcome(self) -> Outcome {
        self.rx.await.unwrap_or(Outcome::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    Speech(String),
    Beep,
}

struct Item {
    priority: u8,
    seq: u64,
    payload: Payload,
    done: oneshot::Sender<Outcome>,
}

impl Item {
    fn key(&self) -> (u8, Reverse<u64>) {
        (self.priority, Reverse(self.seq))
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Item {}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Default)]
struct State {
    pending: BinaryHeap<Item>,
    next_seq: u64,
    closed: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Notify,
    cancel: watch::Sender<u64>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-consumer announcement queue.
///
/// Dropping the queue cancels everything still pending and stops the
/// worker.
pub struct AnnounceQueue {
    shared: Arc<Shared>,
}

impl AnnounceQueue {
    /// Spawns the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(speaker: Arc<dyn Speaker>, config: AnnounceConfig) -> (Self, JoinHandle<()>) {
        let (cancel, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            wake: Notify::new(),
            cancel,
        });

        let handle = tokio::spawn(run(
            shared.clone(),
            speaker,
            Duration::from_millis(config.inter_item_delay_ms),
        ));

        (Self { shared }, handle)
    }

    /// Queues `text` at `priority` (higher goes first).
    pub fn enqueue(&self, text: impl Into<String>, priority: u8) -> Announcement {
        self.push(Payload::Speech(text.into()), priority)
    }

    /// Queues an attention tone at `priority`.
    pub fn beep(&self, priority: u8) -> Announcement {
        self.push(Payload::Beep, priority)
    }

    /// Number of items waiting, excluding the one being played.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.state().pending.len()
    }

    /// Drops every pending item and aborts the one being played.
    pub fn cancel(&self) {
        let dropped = {
            let mut state = self.shared.state();
            let dropped: Vec<Item> = state.pending.drain().collect();
            self.shared.cancel.send_modify(|generation| *generation += 1);
            dropped
        };
        if !dropped.is_empty() {
            log::debug!("Cancelled {} pending announcements", dropped.len());
        }
        for item in dropped {
            let _ = item.done.send(Outcome::Cancelled);
        }
    }

    fn push(&self, payload: Payload, priority: u8) -> Announcement {
        let (done, rx) = oneshot::channel();
        {
            let mut state = self.shared.state();
            if state.closed {
                let _ = done.send(Outcome::Cancelled);
                return Announcement { rx };
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pending.push(Item {
                priority,
                seq,
                payload,
                done,
            });
        }
        self.shared.wake.notify_one();
        Announcement { rx }
    }
}

impl Drop for AnnounceQueue {
    fn drop(&mut self) {
        self.shared.state().closed = true;
        self.cancel();
        self.shared.wake.notify_one();
    }
}

async fn run(shared: Arc<Shared>, speaker: Arc<dyn Speaker>, delay: Duration) {
    let mut cancelled = shared.cancel.subscribe();

    loop {
        let next = {
            let mut state = shared.state();
            let item = state.pending.pop();
            if item.is_none() && state.closed {
                break;
            }
            // Mark the current generation as seen while still holding the
            // lock, so any later cancel aborts this item.
            cancelled.mark_unchanged();
            item
        };

        let Some(item) = next else {
            shared.wake.notified().await;
            continue;
        };

        let outcome = tokio::select! {
            result = play(speaker.as_ref(), &item.payload) => match result {
                Ok(()) => Outcome::Spoken,
                Err(e) => {
                    log::warn!("Announcement failed: {e}");
                    Outcome::Failed { message: e.to_string() }
                }
            },
            _ = cancelled.changed() => Outcome::Cancelled,
        };
        let _ = item.done.send(outcome);

        tokio::time::sleep(delay).await;
    }

    log::debug!("Announcement worker finished");
}

async fn play(speaker: &dyn Speaker, payload: &Payload) -> Result<(), crate::AnnounceError> {
    match payload {
        Payload::Speech(text) => speaker.speak(text).await,
        Payload::Beep => speaker.beep().await,
    }
}
