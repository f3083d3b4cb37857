//! Deciding which hazards the traveler hears about.

use road_hazard_analytics::{HazardAhead, NearbyHazard};
use road_hazard_announce::{AnnounceQueue, Announcement, warning_priority, warning_text};
use road_hazard_models::HazardId;
use serde::Serialize;

use crate::NavigationConfig;

/// Something to play for the traveler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Alert {
    /// Spoken warning about the closest hazard ahead on the route.
    #[serde(rename_all = "camelCase")]
    Warning {
        hazard_id: HazardId,
        distance_m: f64,
        text: String,
        priority: u8,
    },
    /// Attention tone for hazards close by.
    Beep,
}

impl Alert {
    /// Priority used for proximity beeps.
    pub const BEEP_PRIORITY: u8 = 1;

    /// Hands the alert to `queue`.
    pub fn announce(&self, queue: &AnnounceQueue) -> Announcement {
        match self {
            Self::Warning { text, priority, .. } => queue.enqueue(text.clone(), *priority),
            Self::Beep => queue.beep(Self::BEEP_PRIORITY),
        }
    }
}

/// Rate limits warnings and beeps across position updates.
///
/// The closest hazard ahead is announced once; it is announced again only
/// after a different hazard has been announced in between. Beeps are
/// spaced at least `beep_interval_ms` apart.
#[derive(Debug, Clone)]
pub struct AlertSelector {
    config: NavigationConfig,
    last_warned: Option<HazardId>,
    last_beep_ms: Option<u64>,
}

impl AlertSelector {
    #[must_use]
    pub const fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            last_warned: None,
            last_beep_ms: None,
        }
    }

    /// Alerts due for a position update at `now_ms`.
    ///
    /// `ahead` and `nearby` must be sorted nearest first.
    pub fn evaluate(
        &mut self,
        speed_kmh: f64,
        now_ms: u64,
        ahead: &[HazardAhead],
        nearby: &[NearbyHazard],
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if speed_kmh > self.config.alert_min_speed_kmh
            && let Some(closest) = ahead.first()
            && self.last_warned.as_ref() != Some(&closest.hazard.id)
        {
            let hazard = &closest.hazard;
            log::debug!(
                "Warning for hazard {} at {:.0}m",
                hazard.id,
                closest.distance_from_user
            );
            self.last_warned = Some(hazard.id.clone());
            alerts.push(Alert::Warning {
                hazard_id: hazard.id.clone(),
                distance_m: closest.distance_from_user,
                text: warning_text(hazard.hazard_type, hazard.severity, closest.distance_from_user),
                priority: warning_priority(hazard.severity),
            });
        }

        let beep_due = self
            .last_beep_ms
            .is_none_or(|last| now_ms.saturating_sub(last) > self.config.beep_interval_ms);
        if !nearby.is_empty() && speed_kmh > self.config.beep_min_speed_kmh && beep_due {
            self.last_beep_ms = Some(now_ms);
            alerts.push(Alert::Beep);
        }

        alerts
    }

    /// Forgets which hazard was announced last and when the last beep was.
    pub fn reset(&mut self) {
        self.last_warned = None;
        self.last_beep_ms = None;
    }
}
