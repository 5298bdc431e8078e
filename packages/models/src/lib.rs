#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Core data model for the safewatch system.
//!
//! Defines the canonical incident category taxonomy, report and zone
//! records, and the alert types exchanged between the proximity
//! evaluator and the dispatcher. All wire-facing structs serialize as
//! `camelCase` JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Closed set of incident categories accepted by the risk model.
///
/// Each variant maps to a key in the category weight table. Free-text
/// submissions are normalized via [`IncidentCategory::from_input`] and
/// fall back to [`IncidentCategory::Other`] when unrecognized.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentCategory {
    /// Violence by a partner or family member
    DomesticViolence,
    /// Physical attack on a person
    Assault,
    /// Repeated unwanted following or surveillance
    Stalking,
    /// Stated intent to cause harm
    Threat,
    /// Unwanted conduct that intimidates or demeans
    Harassment,
    /// Behavior that warrants attention but no direct offense
    SuspiciousActivity,
    /// Anything that does not fit the categories above
    Other,
}

impl IncidentCategory {
    /// Normalizes a raw category string and maps it to a variant.
    ///
    /// Lowercases and collapses whitespace to underscores before
    /// matching, so `"Domestic Violence"` and `"domestic_violence"`
    /// both resolve to [`Self::DomesticViolence`]. Unknown strings map
    /// to [`Self::Other`].
    #[must_use]
    pub fn from_input(raw: &str) -> Self {
        let key = raw
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        key.parse().unwrap_or(Self::Other)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DomesticViolence,
            Self::Assault,
            Self::Stalking,
            Self::Threat,
            Self::Harassment,
            Self::SuspiciousActivity,
            Self::Other,
        ]
    }
}

/// Lifecycle status of a report. Reports are never deleted (audit
/// trail); only status and resolution time mutate after creation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportStatus {
    /// Submitted, awaiting review
    Pending,
    /// Under active investigation
    Investigating,
    /// Closed out
    Resolved,
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A safety-incident report.
///
/// `risk_score`, `confidence`, `score_breakdown`, and `explanation`
/// are write-once at creation; `status` and `resolved_at` are mutated
/// when the report moves through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique report identifier.
    pub id: Uuid,
    /// Incident category.
    pub category: IncidentCategory,
    /// Free-text description from the reporter.
    pub description: String,
    /// Where the incident occurred, if known.
    pub coordinates: Option<Coordinates>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: ReportStatus,
    /// Assigned risk score, 0-100.
    pub risk_score: u8,
    /// Scoring confidence, 0.0-0.99.
    pub confidence: f64,
    /// Sub-score name -> 0-100 contribution.
    pub score_breakdown: BTreeMap<String, u8>,
    /// Human-readable summary of the risk factors.
    pub explanation: String,
    /// When the report was resolved, if it has been.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Density and history statistics for the area around a report.
///
/// Derived per scoring call; never persisted. The zero value means
/// "no area signal" and is what scoring falls back to when coordinates
/// are missing or the store query fails.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStats {
    /// Non-resolved incidents within the window and radius.
    pub recent_incident_count: u32,
    /// Mean hours the nearby unresolved incidents have been open.
    pub avg_unresolved_hours: f64,
    /// Whether any nearby incident exists at all.
    pub has_recent_incidents: bool,
}

/// Aggregate risk level attached to a zone.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    /// Background risk
    Low,
    /// Elevated risk
    Medium,
    /// High risk
    High,
    /// Most severe
    Critical,
}

impl RiskLevel {
    /// Derives a level from a 0-100 average risk score.
    #[must_use]
    pub fn from_avg_risk(avg_risk: f64) -> Self {
        if avg_risk > 85.0 {
            Self::Critical
        } else if avg_risk > 70.0 {
            Self::High
        } else if avg_risk > 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// How a zone came to exist.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ZoneOrigin {
    /// Declared by an operator; immutable to the clustering step.
    Manual,
    /// Recomputed from incident clustering on every pass.
    Auto,
}

/// A circular geographic region of elevated risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Zone identifier. Auto zones derive theirs from the cluster cell
    /// key, so identical inputs produce identical zones.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the zone is operator-declared or clustered.
    pub origin: ZoneOrigin,
    /// Center of the circle.
    pub center: Coordinates,
    /// Radius in meters, always positive.
    pub radius_meters: f64,
    /// Derived risk level.
    pub risk_level: RiskLevel,
    /// Arithmetic mean of member reports' risk scores at clustering
    /// time (0-100).
    pub avg_risk: f64,
    /// Number of member reports, at least 1.
    pub member_count: u32,
}

/// A position sample for a tracked subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Tracked subject/session identifier.
    pub subject_id: String,
    /// Sampled coordinates.
    pub coordinates: Coordinates,
    /// When the sample was taken.
    pub recorded_at: DateTime<Utc>,
}

/// An emergency contact registered for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Contact identifier.
    pub id: String,
    /// Contact display name.
    pub name: String,
    /// Phone number in E.164 form.
    pub phone: String,
    /// Whether this is the subject's primary contact.
    pub is_primary: bool,
}

/// Which alert path produced a decision. The two sources never share
/// cooldown state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertSource {
    /// Subject crossed into a zone.
    ZoneEntry,
    /// Distress keyword found in free text.
    DistressKeyword,
}

/// Outcome of one proximity (or distress) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDecision {
    /// Whether an alert should be dispatched.
    pub fire: bool,
    /// The zone that triggered the alert, when zone-based and firing.
    pub zone: Option<Zone>,
    /// Subject the decision applies to.
    pub subject_id: String,
    /// Coordinates at decision time, if known.
    pub coordinates: Option<Coordinates>,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
    /// Which alert path produced this decision.
    pub source: AlertSource,
}

/// Structured event pushed to broadcast subscribers when an alert
/// fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    /// Event discriminator for subscribers (`"new_alert"`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// The firing decision.
    pub alert: AlertDecision,
    /// Dispatch time.
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// Wraps a firing decision as a `new_alert` event.
    #[must_use]
    pub fn new_alert(alert: AlertDecision, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type: "new_alert".to_string(),
            alert,
            timestamp,
        }
    }
}

/// Result of sending one notification to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum NotificationOutcome {
    /// Delivered to the provider.
    Sent {
        /// Provider-assigned message identifier.
        provider_id: String,
    },
    /// Provider rejected or errored.
    Failed {
        /// Why delivery failed.
        reason: String,
    },
    /// Delivery did not complete within the bounded timeout.
    TimedOut,
    /// The subject has no registered contact.
    NoContact,
}

/// Recorded outcome of fanning out one fired alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    /// How many live broadcast subscribers received the event.
    pub subscribers_reached: usize,
    /// Result of the contact notification leg.
    pub notification: NotificationOutcome,
}

/// Result of scoring a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskResult {
    /// Final risk score, 0-100.
    pub risk_score: u8,
    /// Confidence in the score, 0.0-0.99.
    pub confidence: f64,
    /// Sub-score name -> 0-100 contribution.
    pub breakdown: BTreeMap<String, u8>,
    /// Human-readable factor summary.
    pub explanation: String,
    /// True when area stats were unavailable and scoring degraded to
    /// the zero-value stats.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_normalizes_free_text() {
        assert_eq!(
            IncidentCategory::from_input("Domestic Violence"),
            IncidentCategory::DomesticViolence
        );
        assert_eq!(
            IncidentCategory::from_input("  suspicious   activity "),
            IncidentCategory::SuspiciousActivity
        );
        assert_eq!(
            IncidentCategory::from_input("assault"),
            IncidentCategory::Assault
        );
    }

    #[test]
    fn category_unknown_falls_back_to_other() {
        assert_eq!(
            IncidentCategory::from_input("red_zone"),
            IncidentCategory::Other
        );
        assert_eq!(IncidentCategory::from_input(""), IncidentCategory::Other);
    }

    #[test]
    fn category_weight_table_keys_are_snake_case() {
        assert_eq!(
            IncidentCategory::DomesticViolence.to_string(),
            "domestic_violence"
        );
        assert_eq!(IncidentCategory::Other.to_string(), "other");
    }

    #[test]
    fn risk_level_thresholds() {
        assert_eq!(RiskLevel::from_avg_risk(90.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_avg_risk(85.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_avg_risk(75.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_avg_risk(50.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_avg_risk(40.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_avg_risk(0.0), RiskLevel::Low);
    }

    #[test]
    fn zone_serializes_camel_case() {
        let zone = Zone {
            id: "auto:28.704_77.103".to_string(),
            name: "Cluster 28.704,77.103".to_string(),
            origin: ZoneOrigin::Auto,
            center: Coordinates::new(28.7042, 77.10265),
            radius_meters: 70.0,
            risk_level: RiskLevel::High,
            avg_risk: 72.0,
            member_count: 2,
        };
        let json = serde_json::to_value(&zone).unwrap();
        assert_eq!(json["radiusMeters"], 70.0);
        assert_eq!(json["riskLevel"], "high");
        assert_eq!(json["avgRisk"], 72.0);
        assert_eq!(json["memberCount"], 2);
        assert_eq!(json["origin"], "auto");
    }

    #[test]
    fn alert_event_shape() {
        let decision = AlertDecision {
            fire: true,
            zone: None,
            subject_id: "s-1".to_string(),
            coordinates: None,
            decided_at: Utc::now(),
            source: AlertSource::DistressKeyword,
        };
        let event = AlertEvent::new_alert(decision, Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_alert");
        assert_eq!(json["alert"]["source"], "distress_keyword");
        assert_eq!(json["alert"]["fire"], true);
    }
}
