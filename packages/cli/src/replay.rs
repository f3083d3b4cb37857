//! Offline replay of recorded accelerometer data.

use std::io::Read;

use road_hazard_models::DetectionEvent;
use road_hazard_motion::{MotionConfig, MotionMonitor, MotionSample};

/// Reads samples from CSV with an `x,y,z,timestamp_ms` header. Empty axis
/// cells are kept as missing.
pub fn read_samples<R: Read>(reader: R) -> Result<Vec<MotionSample>, csv::Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect()
}

/// Runs `samples` through a motion monitor and collects every detection.
pub async fn replay(samples: Vec<MotionSample>, config: MotionConfig) -> Vec<DetectionEvent> {
    let (monitor, mut events, handle) = MotionMonitor::spawn(config);
    monitor.enable();
    log::debug!("Replaying {} samples", samples.len());
    for sample in samples {
        monitor.submit(sample);
    }
    drop(monitor);

    let mut detections = Vec::new();
    while let Some(event) = events.recv().await {
        detections.push(event);
    }
    if let Err(e) = handle.await {
        log::error!("Motion worker failed: {e}");
    }
    detections
}

#[cfg(test)]
mod tests {
    use road_hazard_models::{HazardType, Severity};

    use super::*;

    const BUMP: &str = "x,y,z,timestamp_ms
0,0,0,0
0,0,24.525,100
0,0,24.525,200
0,0,24.525,300
0,0,24.525,400
0,0,24.525,500
0,0,0,600
0,0,0,700
";

    #[test]
    fn reads_missing_axes_as_none() {
        let samples = read_samples("x,y,z,timestamp_ms\n,1.5, ,10\n".as_bytes()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].x, None);
        assert_eq!(samples[0].y, Some(1.5));
        assert_eq!(samples[0].z, None);
        assert_eq!(samples[0].timestamp_ms, 10);
    }

    #[test]
    fn rejects_malformed_rows() {
        assert!(read_samples("x,y,z,timestamp_ms\n1,2,3,soon\n".as_bytes()).is_err());
    }

    #[tokio::test]
    async fn replay_finds_the_bump() {
        let samples = read_samples(BUMP.as_bytes()).unwrap();
        let detections = replay(samples, MotionConfig::default()).await;
        assert_eq!(detections.len(), 1, "{detections:?}");
        assert_eq!(detections[0].hazard_type, HazardType::SpeedBreaker);
        assert_eq!(detections[0].severity, Severity::Medium);
    }
}
