//! The risk scorer: combines the extracted features with the weight
//! table snapshot into a score, confidence, breakdown, and
//! explanation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use safewatch_models::{AreaStats, IncidentCategory, RiskResult};

use crate::config::{KeywordTiers, ScoringConfig};
use crate::features::{
    DayBucket, FeatureSet, TimeBucket, WEIGHT_AREA_DENSITY, WEIGHT_AREA_HISTORY, WEIGHT_CATEGORY,
    WEIGHT_DAY_OF_WEEK, WEIGHT_DESCRIPTION, WEIGHT_TIME_OF_DAY,
};
use crate::weights::WeightTable;

/// Base confidence before any feature bumps.
const CONFIDENCE_BASE: f64 = 0.50;
/// Upper clamp on confidence.
const CONFIDENCE_MAX: f64 = 0.99;

/// The report fields the scorer consumes.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    /// Normalized category.
    pub category: IncidentCategory,
    /// Free-text description.
    pub description: &'a str,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Deterministic scorer. Given the same weight table snapshot and area
/// stats, the same input always produces the same result.
pub struct RiskScorer {
    tiers: KeywordTiers,
}

impl RiskScorer {
    /// Creates a scorer using the config's keyword tiers.
    #[must_use]
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            tiers: config.keywords.clone(),
        }
    }

    /// Scores a report against a weight table snapshot and area stats.
    ///
    /// `degraded` marks that area stats were unavailable and the
    /// zero-value fallback is in use; it is recorded on the result and
    /// surfaced in the explanation but never aborts scoring.
    #[must_use]
    pub fn score(
        &self,
        input: &ScoreInput<'_>,
        weights: &WeightTable,
        stats: &AreaStats,
        degraded: bool,
    ) -> RiskResult {
        let features = FeatureSet::extract(
            input.category,
            input.description,
            input.created_at,
            stats,
            weights,
            &self.tiers,
        );

        let weighted_sum = features.category_score * WEIGHT_CATEGORY
            + features.time_bucket.score() * WEIGHT_TIME_OF_DAY
            + features.day_bucket.score() * WEIGHT_DAY_OF_WEEK
            + features.density_score * WEIGHT_AREA_DENSITY
            + features.description_score * WEIGHT_DESCRIPTION
            + features.history_boost * WEIGHT_AREA_HISTORY;

        let risk_score = to_percent(weighted_sum);

        let mut breakdown = BTreeMap::new();
        breakdown.insert("category".to_string(), to_percent(features.category_score));
        breakdown.insert(
            "timeOfDay".to_string(),
            to_percent(features.time_bucket.score()),
        );
        breakdown.insert(
            "dayOfWeek".to_string(),
            to_percent(features.day_bucket.score()),
        );
        breakdown.insert(
            "areaDensity".to_string(),
            to_percent(features.density_score),
        );
        breakdown.insert(
            "description".to_string(),
            to_percent(features.description_score),
        );
        breakdown.insert(
            "areaHistory".to_string(),
            to_percent(features.history_boost),
        );

        RiskResult {
            risk_score,
            confidence: confidence(&features, stats),
            breakdown,
            explanation: explanation(&features, risk_score, stats, degraded),
            degraded,
        }
    }
}

/// Converts a 0.0-1.0 sub-score to a rounded 0-100 integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

fn confidence(features: &FeatureSet, stats: &AreaStats) -> f64 {
    let mut confidence = CONFIDENCE_BASE;

    if features.category_score > 0.85 {
        confidence += 0.15;
    } else if features.category_score > 0.70 {
        confidence += 0.10;
    } else if features.category_score > 0.50 {
        confidence += 0.05;
    }

    if features.description_score > 0.70 {
        confidence += 0.15;
    } else if features.description_score > 0.50 {
        confidence += 0.08;
    }

    if stats.recent_incident_count > 10 {
        confidence += 0.10;
    } else if stats.recent_incident_count > 5 {
        confidence += 0.05;
    }

    confidence.min(CONFIDENCE_MAX)
}

fn explanation(
    features: &FeatureSet,
    risk_score: u8,
    stats: &AreaStats,
    degraded: bool,
) -> String {
    let mut factors: Vec<String> = Vec::new();

    factors.push(category_descriptor(features.category).to_string());

    match features.time_bucket {
        TimeBucket::LateNight => {
            factors.push("Incident during late night hours (higher risk period)".to_string());
        }
        TimeBucket::Evening => {
            factors.push("Incident during evening (elevated risk period)".to_string());
        }
        TimeBucket::EarlyMorning | TimeBucket::Daytime => {}
    }

    if features.day_bucket == DayBucket::Weekend {
        factors.push("Weekend incident".to_string());
    }

    if stats.recent_incident_count >= 10 {
        factors.push(format!(
            "High incident density area ({} recent incidents)",
            stats.recent_incident_count
        ));
    } else if stats.recent_incident_count >= 5 {
        factors.push(format!(
            "Moderate incident density area ({} recent incidents)",
            stats.recent_incident_count
        ));
    }

    if stats.has_recent_incidents {
        factors.push("Repeat incident location (area of concern)".to_string());
    }

    if stats.avg_unresolved_hours > 2.0 {
        factors.push(format!(
            "{:.1} hours unresolved (escalating)",
            stats.avg_unresolved_hours
        ));
    }

    if degraded {
        factors.push("Area data unavailable (reduced confidence)".to_string());
    }

    let priority = if risk_score > 85 {
        "CRITICAL"
    } else if risk_score > 70 {
        "HIGH"
    } else if risk_score > 40 {
        "MEDIUM"
    } else {
        "LOW"
    };

    format!("{priority} risk: {}", factors.join("; "))
}

const fn category_descriptor(category: IncidentCategory) -> &'static str {
    match category {
        IncidentCategory::DomesticViolence => "Domestic violence category (high severity)",
        IncidentCategory::Assault => "Assault report (high severity)",
        IncidentCategory::Stalking => "Stalking incident (high severity)",
        IncidentCategory::Threat => "Threat report (medium-high severity)",
        IncidentCategory::Harassment => "Harassment incident (medium severity)",
        IncidentCategory::SuspiciousActivity => "Suspicious activity (low-medium)",
        IncidentCategory::Other => "Other incident type",
    }
}
