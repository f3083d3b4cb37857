//! Windowed peak-G classification.

use std::collections::VecDeque;

use road_hazard_models::{DetectionEvent, HazardType, Severity};
use serde::Deserialize;

use crate::{MotionConfig, ShapeRule};

/// One accelerometer reading in m/s². A missing axis reads as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MotionSample {
    /// X-axis acceleration.
    #[serde(default)]
    pub x: Option<f64>,
    /// Y-axis acceleration.
    #[serde(default)]
    pub y: Option<f64>,
    /// Z-axis acceleration.
    #[serde(default)]
    pub z: Option<f64>,
    /// Sample time in milliseconds.
    pub timestamp_ms: u64,
}

impl MotionSample {
    /// A sample with all three axes present.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            timestamp_ms,
        }
    }

    fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z].map(|axis| axis.filter(|v| v.is_finite()).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, Copy)]
struct PeakSample {
    peak_g: f64,
    timestamp_ms: u64,
}

/// Classifies a stream of acceleration samples into hazard detections.
///
/// Starts disabled. After [`enable`](Self::enable) the first sample only
/// establishes the baseline; the baseline is the zero offset, so every
/// later sample contributes `|sample| / g`. At most one detection is
/// emitted per debounce interval.
#[derive(Debug)]
pub struct MotionClassifier {
    config: MotionConfig,
    enabled: bool,
    baseline: Option<[f64; 3]>,
    buffer: VecDeque<PeakSample>,
    last_detection_ms: Option<u64>,
}

impl MotionClassifier {
    /// Creates a disabled classifier.
    #[must_use]
    pub fn new(config: MotionConfig) -> Self {
        let capacity = config.buffer_capacity;
        Self {
            config,
            enabled: false,
            baseline: None,
            buffer: VecDeque::with_capacity(capacity),
            last_detection_ms: None,
        }
    }

    /// Starts accepting samples.
    pub fn enable(&mut self) {
        if !self.enabled {
            log::debug!("Motion detection enabled");
        }
        self.enabled = true;
    }

    /// Stops accepting samples and discards the baseline and buffer.
    pub fn disable(&mut self) {
        if self.enabled {
            log::debug!("Motion detection disabled, dropping {} buffered samples", self.buffer.len());
        }
        self.enabled = false;
        self.baseline = None;
        self.buffer.clear();
    }

    /// Whether samples are currently accepted.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of buffered peak-G values.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one sample, returning a detection when the latest window
    /// matches a shape rule and the debounce interval has elapsed.
    pub fn push(&mut self, sample: MotionSample) -> Option<DetectionEvent> {
        if !self.enabled {
            return None;
        }

        let Some(baseline) = self.baseline else {
            // The first reading only anchors the zero offset.
            self.baseline = Some([0.0; 3]);
            return None;
        };

        let axes = sample.axes();
        let magnitude = axes
            .iter()
            .zip(baseline)
            .map(|(v, b)| (v - b).powi(2))
            .sum::<f64>()
            .sqrt();

        self.buffer.push_back(PeakSample {
            peak_g: magnitude / self.config.gravity,
            timestamp_ms: sample.timestamp_ms,
        });
        while self.buffer.len() > self.config.buffer_capacity {
            self.buffer.pop_front();
        }

        if let Some(last) = self.last_detection_ms
            && sample.timestamp_ms.saturating_sub(last) < self.config.debounce_ms
        {
            return None;
        }

        let event = self.analyze()?;
        self.last_detection_ms = Some(sample.timestamp_ms);
        log::info!(
            "Detected {} ({}) - peak G {:.2}",
            event.hazard_type,
            event.severity,
            event.peak_acceleration
        );
        Some(event)
    }

    fn analyze(&self) -> Option<DetectionEvent> {
        if self.buffer.len() < self.config.min_window_samples {
            return None;
        }

        let start = self.buffer.len().saturating_sub(self.config.window_size);
        let window = self.buffer.range(start..);

        let mut max_peak = f64::NEG_INFINITY;
        let mut min_peak = f64::INFINITY;
        for sample in window.clone() {
            max_peak = max_peak.max(sample.peak_g);
            min_peak = min_peak.min(sample.peak_g);
        }

        let first = window.clone().next()?;
        let last = window.last()?;
        let duration_ms = last.timestamp_ms.saturating_sub(first.timestamp_ms);

        let rules: [(HazardType, &ShapeRule); 3] = [
            (HazardType::SpeedBreaker, &self.config.speed_breaker),
            (HazardType::Pothole, &self.config.pothole),
            (HazardType::Manhole, &self.config.manhole),
        ];

        let (hazard_type, rule) = rules
            .into_iter()
            .find(|(_, rule)| rule.matches(max_peak, min_peak, duration_ms))?;

        Some(DetectionEvent {
            hazard_type,
            severity: severity_for(rule, max_peak),
            peak_acceleration: max_peak,
            confidence: (max_peak / self.config.confidence_scale).min(1.0),
        })
    }
}

fn severity_for(rule: &ShapeRule, peak_g: f64) -> Severity {
    if peak_g > rule.high_above {
        Severity::High
    } else if peak_g > rule.medium_above {
        Severity::Medium
    } else {
        Severity::Low
    }
}
