//! Speed and heading from a stream of position fixes.

use std::collections::VecDeque;

use road_hazard_models::{GeoPoint, PositionFix};
use road_hazard_spatial::{bearing_degrees, distance_meters};
use serde::Serialize;

use crate::NavigationConfig;

/// A fix enriched with smoothed speed and heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedPosition {
    pub location: GeoPoint,
    pub accuracy: f64,
    pub timestamp_ms: u64,
    /// Moving average over the last few readings, in km/h.
    pub speed_kmh: f64,
    /// Degrees clockwise from north, when known.
    pub heading: Option<f64>,
}

/// Derives speed and heading from consecutive fixes.
///
/// Receiver-reported speed wins when it is present and non-negative.
/// Otherwise speed comes from the distance covered since the previous fix,
/// provided enough time has passed; if not, the reading counts as zero.
/// Heading falls back to the bearing from the previous fix only when speed
/// had to be derived.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    window: usize,
    min_interval_ms: u64,
    readings: VecDeque<f64>,
    last: Option<PositionFix>,
}

impl PositionTracker {
    #[must_use]
    pub fn new(config: &NavigationConfig) -> Self {
        let window = config.smoothing_window.max(1);
        Self {
            window,
            min_interval_ms: config.min_derive_interval_ms,
            readings: VecDeque::with_capacity(window),
            last: None,
        }
    }

    /// Feeds one fix and returns it with the updated speed and heading.
    pub fn update(&mut self, fix: PositionFix) -> TrackedPosition {
        let mut heading = fix.heading.filter(|heading| heading.is_finite());

        let reading = match fix.speed_mps.filter(|mps| mps.is_finite() && *mps >= 0.0) {
            Some(mps) => mps * 3.6,
            None => self.derive(&fix, &mut heading),
        };
        let speed_kmh = self.smooth(reading.max(0.0));
        self.last = Some(fix);

        TrackedPosition {
            location: fix.location,
            accuracy: fix.accuracy,
            timestamp_ms: fix.timestamp_ms,
            speed_kmh,
            heading,
        }
    }

    /// Current smoothed speed, 0 before the first fix.
    #[must_use]
    pub fn speed_kmh(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.readings.len() as f64;
        self.readings.iter().sum::<f64>() / count
    }

    /// Forgets the previous fix and all speed readings.
    pub fn reset(&mut self) {
        self.readings.clear();
        self.last = None;
    }

    #[allow(clippy::cast_precision_loss)]
    fn derive(&self, fix: &PositionFix, heading: &mut Option<f64>) -> f64 {
        let Some(last) = &self.last else {
            return 0.0;
        };
        let elapsed_ms = fix.timestamp_ms.saturating_sub(last.timestamp_ms);
        if elapsed_ms <= self.min_interval_ms {
            return 0.0;
        }

        if heading.is_none() {
            *heading = Some(bearing_degrees(last.location, fix.location));
        }
        let meters = distance_meters(last.location, fix.location);
        meters / (elapsed_ms as f64 / 1000.0) * 3.6
    }

    fn smooth(&mut self, reading: f64) -> f64 {
        if self.readings.len() == self.window {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        self.speed_kmh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lng: f64, timestamp_ms: u64, speed_mps: Option<f64>) -> PositionFix {
        PositionFix {
            location: GeoPoint::new(0.0, lng),
            accuracy: 5.0,
            timestamp_ms,
            speed_mps,
            heading: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.05
    }

    #[test]
    fn receiver_speed_is_converted_and_averaged() {
        let mut tracker = PositionTracker::new(&NavigationConfig::default());
        assert!(approx(tracker.update(fix(0.0, 0, Some(10.0))).speed_kmh, 36.0));
        assert!(approx(tracker.update(fix(0.0, 1_000, Some(0.0))).speed_kmh, 18.0));
    }

    #[test]
    fn derives_speed_and_heading_from_movement() {
        let mut tracker = PositionTracker::new(&NavigationConfig::default());
        let first = tracker.update(fix(0.0, 0, None));
        assert!(approx(first.speed_kmh, 0.0));
        assert!(first.heading.is_none());

        // 0.0001 degrees of longitude on the equator is about 11.12 m.
        let second = tracker.update(fix(0.0001, 1_000, None));
        assert!(approx(second.speed_kmh, 40.03 / 2.0), "{}", second.speed_kmh);
        assert!(approx(second.heading.unwrap(), 90.0));
    }

    #[test]
    fn fixes_too_close_in_time_read_as_stationary() {
        let mut tracker = PositionTracker::new(&NavigationConfig::default());
        tracker.update(fix(0.0, 0, None));
        let next = tracker.update(fix(0.0001, 500, None));
        assert!(approx(next.speed_kmh, 0.0));
        assert!(next.heading.is_none());
    }

    #[test]
    fn receiver_heading_is_kept() {
        let mut tracker = PositionTracker::new(&NavigationConfig::default());
        tracker.update(fix(0.0, 0, None));
        let mut moved = fix(0.0001, 2_000, None);
        moved.heading = Some(12.0);
        assert_eq!(tracker.update(moved).heading, Some(12.0));
    }

    #[test]
    fn negative_receiver_speed_falls_back_to_derivation() {
        let mut tracker = PositionTracker::new(&NavigationConfig::default());
        tracker.update(fix(0.0, 0, Some(0.0)));
        let next = tracker.update(fix(0.0001, 1_000, Some(-1.0)));
        assert!(approx(next.speed_kmh, 40.03 / 2.0), "{}", next.speed_kmh);
    }

    #[test]
    fn average_covers_the_last_five_readings() {
        let mut tracker = PositionTracker::new(&NavigationConfig::default());
        tracker.update(fix(0.0, 0, Some(100.0)));
        for i in 1..=5 {
            tracker.update(fix(0.0, i * 1_000, Some(10.0)));
        }
        assert!(approx(tracker.speed_kmh(), 36.0));
    }

    #[test]
    fn reset_forgets_history() {
        let mut tracker = PositionTracker::new(&NavigationConfig::default());
        tracker.update(fix(0.0, 0, Some(10.0)));
        tracker.reset();
        assert!(approx(tracker.speed_kmh(), 0.0));

        // No previous fix, so nothing to derive from.
        let after = tracker.update(fix(0.0001, 1_000, None));
        assert!(approx(after.speed_kmh, 0.0));
    }
}
