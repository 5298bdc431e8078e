//! Per-subject zone-entry state machine.
//!
//! Two states: `Outside` and `AlertedCooldown`. Entering any zone from
//! `Outside` fires exactly one alert and starts the cooldown; samples
//! still inside before the cooldown expires are suppressed; staying
//! inside past the cooldown re-fires as a fresh entry. Leaving a zone
//! returns to `Outside` unconditionally, which clears the cooldown
//! early so a later re-entry always fires.

use chrono::{DateTime, Duration, Utc};
use safewatch_geo::ZoneIndex;
use safewatch_models::{AlertDecision, AlertSource, Position};

/// Zone-entry cooldown in seconds (5 minutes).
pub const ZONE_COOLDOWN_SECS: i64 = 300;

/// State of one subject's zone-entry machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectState {
    /// Not inside any zone.
    Outside,
    /// Alerted; re-triggers suppressed until the cooldown passes.
    AlertedCooldown {
        /// Zone that fired the alert.
        zone_id: String,
        /// Suppression deadline. Moves forward on re-fire, cleared on
        /// exit, never set to a past time.
        cooldown_until: DateTime<Utc>,
    },
}

/// The per-subject proximity evaluator. One instance per tracked
/// subject; the owner must serialize calls for the same subject.
#[derive(Debug)]
pub struct ProximityEvaluator {
    subject_id: String,
    cooldown: Duration,
    state: SubjectState,
}

impl ProximityEvaluator {
    /// Creates an evaluator in the `Outside` state with the default
    /// 5-minute cooldown.
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self::with_cooldown(subject_id, Duration::seconds(ZONE_COOLDOWN_SECS))
    }

    /// Creates an evaluator with an explicit cooldown.
    #[must_use]
    pub fn with_cooldown(subject_id: impl Into<String>, cooldown: Duration) -> Self {
        Self {
            subject_id: subject_id.into(),
            cooldown,
            state: SubjectState::Outside,
        }
    }

    /// Current state, for inspection.
    #[must_use]
    pub const fn state(&self) -> &SubjectState {
        &self.state
    }

    /// Evaluates one position sample against the zone set.
    pub fn evaluate(&mut self, position: &Position, zones: &ZoneIndex, now: DateTime<Utc>) -> AlertDecision {
        let matched = zones.first_containing(position.coordinates);

        match matched {
            None => {
                // Exit clears the cooldown immediately so the next
                // entry always fires.
                if self.state != SubjectState::Outside {
                    log::debug!("Subject {} left zone coverage", self.subject_id);
                }
                self.state = SubjectState::Outside;
                self.decision(false, None, position, now)
            }
            Some(zone) => match &self.state {
                SubjectState::AlertedCooldown { cooldown_until, .. }
                    if now < *cooldown_until =>
                {
                    self.decision(false, None, position, now)
                }
                _ => {
                    log::info!(
                        "Subject {} entered zone {} ({})",
                        self.subject_id,
                        zone.id,
                        zone.risk_level
                    );
                    self.state = SubjectState::AlertedCooldown {
                        zone_id: zone.id.clone(),
                        cooldown_until: now + self.cooldown,
                    };
                    let zone = zone.clone();
                    self.decision(true, Some(zone), position, now)
                }
            },
        }
    }

    fn decision(
        &self,
        fire: bool,
        zone: Option<safewatch_models::Zone>,
        position: &Position,
        now: DateTime<Utc>,
    ) -> AlertDecision {
        AlertDecision {
            fire,
            zone,
            subject_id: self.subject_id.clone(),
            coordinates: Some(position.coordinates),
            decided_at: now,
            source: AlertSource::ZoneEntry,
        }
    }
}
