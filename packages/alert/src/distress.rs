//! Distress-keyword trigger.
//!
//! Scans free-text messages from a subject for distress vocabulary and
//! fires an alert on a match. The trigger keeps its own per-subject
//! cooldown, shorter than the zone-entry one and never shared with it,
//! so a distress message inside a suppressed zone still alerts.

use chrono::{DateTime, Duration, Utc};
use safewatch_models::{AlertDecision, AlertSource, Coordinates};

/// Distress cooldown in seconds.
pub const DISTRESS_COOLDOWN_SECS: i64 = 30;

/// Default distress vocabulary, matched as lowercase substrings.
pub const DEFAULT_KEYWORDS: [&str; 6] = ["help", "emergency", "danger", "attack", "rape", "kidnap"];

/// Per-subject distress message monitor.
#[derive(Debug)]
pub struct DistressMonitor {
    subject_id: String,
    keywords: Vec<String>,
    cooldown: Duration,
    suppressed_until: Option<DateTime<Utc>>,
}

impl DistressMonitor {
    /// Creates a monitor with the default keyword list and 30-second
    /// cooldown.
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self::with_keywords(
            subject_id,
            DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            Duration::seconds(DISTRESS_COOLDOWN_SECS),
        )
    }

    /// Creates a monitor with an explicit keyword list and cooldown.
    /// Keywords are lowercased on the way in.
    #[must_use]
    pub fn with_keywords(
        subject_id: impl Into<String>,
        keywords: Vec<String>,
        cooldown: Duration,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            cooldown,
            suppressed_until: None,
        }
    }

    /// Evaluates one message. Fires when the lowercased message
    /// contains any keyword and the cooldown has passed.
    pub fn evaluate(
        &mut self,
        message: &str,
        coordinates: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> AlertDecision {
        let matched = self.matches(message);

        let fire = match (matched, self.suppressed_until) {
            (false, _) => false,
            (true, Some(until)) if now < until => false,
            (true, _) => true,
        };

        if fire {
            log::warn!("Distress keyword from subject {}", self.subject_id);
            self.suppressed_until = Some(now + self.cooldown);
        }

        AlertDecision {
            fire,
            zone: None,
            subject_id: self.subject_id.clone(),
            coordinates,
            decided_at: now,
            source: AlertSource::DistressKeyword,
        }
    }

    fn matches(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}
