//! Background classification task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use road_hazard_models::DetectionEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{MotionClassifier, MotionConfig, MotionSample};

enum Command {
    Sample { generation: u64, sample: MotionSample },
    Enable,
    Disable,
}

/// Handle to a classifier running on its own task.
///
/// Submitting never blocks. Samples queued before a
/// [`disable`](Self::disable) are discarded by the worker rather than
/// classified, so a detection can never be emitted after disabling.
#[derive(Clone)]
pub struct MotionMonitor {
    commands: mpsc::UnboundedSender<Command>,
    generation: Arc<AtomicU64>,
}

impl MotionMonitor {
    /// Spawns the worker on the current tokio runtime. The worker exits
    /// once every handle is dropped.
    #[must_use]
    pub fn spawn(
        config: MotionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DetectionEvent>, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(run(
            MotionClassifier::new(config),
            command_rx,
            event_tx,
            generation.clone(),
        ));

        (
            Self {
                commands,
                generation,
            },
            event_rx,
            handle,
        )
    }

    /// Starts classification. The next sample becomes the baseline.
    pub fn enable(&self) {
        self.send(Command::Enable);
    }

    /// Stops classification and discards anything still queued.
    pub fn disable(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.send(Command::Disable);
    }

    /// Queues a sample for classification.
    pub fn submit(&self, sample: MotionSample) {
        let generation = self.generation.load(Ordering::SeqCst);
        self.send(Command::Sample { generation, sample });
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::warn!("Motion worker has stopped; dropping command");
        }
    }
}

async fn run(
    mut classifier: MotionClassifier,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<DetectionEvent>,
    generation: Arc<AtomicU64>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Enable => classifier.enable(),
            Command::Disable => classifier.disable(),
            Command::Sample {
                generation: sample_generation,
                sample,
            } => {
                if sample_generation != generation.load(Ordering::SeqCst) {
                    continue;
                }
                if let Some(event) = classifier.push(sample)
                    && events.send(event).is_err()
                {
                    log::debug!("Detection receiver dropped");
                }
            }
        }
    }
    log::debug!("Motion worker finished");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use road_hazard_models::HazardType;

    use super::*;

    const G: f64 = 9.81;

    fn vertical(g_force: f64, timestamp_ms: u64) -> MotionSample {
        MotionSample::new(0.0, 0.0, g_force * G, timestamp_ms)
    }

    #[tokio::test]
    async fn emits_detection_from_background_task() {
        let (monitor, mut events, _handle) = MotionMonitor::spawn(MotionConfig::default());
        monitor.enable();
        monitor.submit(vertical(0.0, 0));
        for t in (100..=500).step_by(100) {
            monitor.submit(vertical(2.5, t));
        }

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.hazard_type, HazardType::SpeedBreaker);
    }

    #[tokio::test]
    async fn nothing_is_emitted_after_disable() {
        let (monitor, mut events, handle) = MotionMonitor::spawn(MotionConfig::default());
        monitor.enable();
        monitor.submit(vertical(0.0, 0));
        for t in (100..=400).step_by(100) {
            monitor.submit(vertical(2.5, t));
        }
        monitor.disable();
        // Would complete the bump, but arrives after disabling.
        monitor.submit(vertical(2.5, 500));

        drop(monitor);
        handle.await.unwrap();
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn samples_while_disabled_are_ignored() {
        let (monitor, mut events, handle) = MotionMonitor::spawn(MotionConfig::default());
        monitor.submit(vertical(0.0, 0));
        for t in (100..=500).step_by(100) {
            monitor.submit(vertical(2.5, t));
        }
        drop(monitor);
        handle.await.unwrap();
        assert!(events.recv().await.is_none());
    }
}
