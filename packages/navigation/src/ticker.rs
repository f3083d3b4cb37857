//! Periodic segment status refresh.

use std::sync::Arc;
use std::time::Duration;

use road_hazard_analytics::{RouteMatcher, SegmentStatus};
use road_hazard_models::{GeoPoint, HazardFilters, HazardRecord};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Latest-value inputs read on every tick.
pub struct TickerInputs {
    pub position: watch::Receiver<Option<GeoPoint>>,
    pub route: watch::Receiver<Arc<Vec<GeoPoint>>>,
    pub hazards: watch::Receiver<Arc<Vec<HazardRecord>>>,
    pub filters: watch::Receiver<HazardFilters>,
}

/// Recomputes the segment status every `period` from whatever the inputs
/// hold at that moment.
///
/// Ticks missed while the runtime was busy are skipped rather than
/// replayed. The task ends when the position sender is dropped or nobody
/// is watching the output any more.
#[must_use]
pub fn spawn_segment_ticker(
    matcher: RouteMatcher,
    inputs: TickerInputs,
    period: Duration,
) -> (watch::Receiver<Option<SegmentStatus>>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(None);
    let handle = tokio::spawn(run(matcher, inputs, period, tx));
    (rx, handle)
}

async fn run(
    matcher: RouteMatcher,
    inputs: TickerInputs,
    period: Duration,
    tx: watch::Sender<Option<SegmentStatus>>,
) {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            () = tx.closed() => break,
        }
        if inputs.position.has_changed().is_err() {
            break;
        }

        let origin = *inputs.position.borrow();
        let route = inputs.route.borrow().clone();
        let hazards = inputs.hazards.borrow().clone();
        let filters = inputs.filters.borrow().clone();

        let status = matcher.segment_status(origin, &route, &hazards, &filters);
        tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            log::trace!("Segment status now {status:?}");
            *current = status;
            true
        });
    }

    log::debug!("Segment ticker stopped");
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use road_hazard_models::{HazardId, HazardType, NewHazard, Severity};

    use super::*;

    struct Senders {
        position: watch::Sender<Option<GeoPoint>>,
        _route: watch::Sender<Arc<Vec<GeoPoint>>>,
        hazards: watch::Sender<Arc<Vec<HazardRecord>>>,
        _filters: watch::Sender<HazardFilters>,
    }

    /// A 4 km route along the equator, one point every ~1.1 km.
    fn setup() -> (Senders, TickerInputs) {
        let route: Vec<GeoPoint> = (0..=4).map(|i| GeoPoint::new(0.0, f64::from(i) * 0.01)).collect();
        let (position, position_rx) = watch::channel(None);
        let (route_tx, route_rx) = watch::channel(Arc::new(route));
        let (hazards, hazards_rx) = watch::channel(Arc::new(Vec::new()));
        let (filters, filters_rx) = watch::channel(HazardFilters::default());
        (
            Senders {
                position,
                _route: route_tx,
                hazards,
                _filters: filters,
            },
            TickerInputs {
                position: position_rx,
                route: route_rx,
                hazards: hazards_rx,
                filters: filters_rx,
            },
        )
    }

    fn pothole(id: &str, at: GeoPoint) -> HazardRecord {
        HazardRecord::from_new(
            HazardId::new(id),
            NewHazard::manual(HazardType::Pothole, Severity::Medium, at),
            Utc::now(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn follows_position_and_hazards() {
        let (senders, inputs) = setup();
        let (mut status, _handle) =
            spawn_segment_ticker(RouteMatcher::default(), inputs, Duration::from_secs(1));

        senders.position.send_replace(Some(GeoPoint::new(0.0, 0.0)));
        status.changed().await.unwrap();
        let first = status.borrow_and_update().unwrap();
        assert_eq!(first.segment_index, 0);
        assert_eq!(first.total_segments, 3);
        assert_eq!(first.hazard_count, 0);
        assert!(first.is_idle);

        // Past the 2 km mark.
        senders.position.send_replace(Some(GeoPoint::new(0.0, 0.03)));
        senders
            .hazards
            .send_replace(Arc::new(vec![pothole("h1", GeoPoint::new(0.0, 0.031))]));
        status.changed().await.unwrap();
        let second = status.borrow_and_update().unwrap();
        assert_eq!(second.segment_index, 1);
        assert_eq!(second.hazard_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_status_without_position() {
        let (senders, inputs) = setup();
        let (status, _handle) =
            spawn_segment_ticker(RouteMatcher::default(), inputs, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(status.borrow().is_none());
        drop(senders);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_position_source_goes_away() {
        let (senders, inputs) = setup();
        let (_status, handle) =
            spawn_segment_ticker(RouteMatcher::default(), inputs, Duration::from_secs(1));

        drop(senders.position);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_output_is_dropped() {
        let (_senders, inputs) = setup();
        let (status, handle) =
            spawn_segment_ticker(RouteMatcher::default(), inputs, Duration::from_secs(1));

        drop(status);
        handle.await.unwrap();
    }
}
