//! Feature extraction: turns a raw report plus area stats into the
//! fixed six-feature set the scorer combines.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use safewatch_models::{AreaStats, IncidentCategory};

use crate::config::KeywordTiers;
use crate::weights::WeightTable;

/// Fixed feature weights. These sum to exactly 1.0 and never change;
/// only the category weight table inside the category feature drifts.
pub const WEIGHT_CATEGORY: f64 = 0.35;
/// Time-of-day bucket weight.
pub const WEIGHT_TIME_OF_DAY: f64 = 0.20;
/// Day-of-week bucket weight.
pub const WEIGHT_DAY_OF_WEEK: f64 = 0.10;
/// Area density bucket weight.
pub const WEIGHT_AREA_DENSITY: f64 = 0.15;
/// Description keyword severity weight.
pub const WEIGHT_DESCRIPTION: f64 = 0.10;
/// Area history boost weight.
pub const WEIGHT_AREA_HISTORY: f64 = 0.10;

/// Maximum total area-history boost.
const HISTORY_BOOST_CAP: f64 = 0.25;

/// Time-of-day bucket for the incident timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    /// [22:00, 05:00)
    LateNight,
    /// [05:00, 08:00)
    EarlyMorning,
    /// [18:00, 22:00)
    Evening,
    /// Everything else
    Daytime,
}

impl TimeBucket {
    /// Buckets an hour of day (0-23).
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        if hour >= 22 || hour < 5 {
            Self::LateNight
        } else if hour < 8 {
            Self::EarlyMorning
        } else if hour >= 18 {
            Self::Evening
        } else {
            Self::Daytime
        }
    }

    /// Sub-score for this bucket.
    #[must_use]
    pub const fn score(self) -> f64 {
        match self {
            Self::LateNight => 0.80,
            Self::EarlyMorning => 0.50,
            Self::Evening => 0.65,
            Self::Daytime => 0.35,
        }
    }
}

/// Weekend/weekday bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBucket {
    /// Saturday or Sunday
    Weekend,
    /// Monday through Friday
    Weekday,
}

impl DayBucket {
    /// Buckets a weekday.
    #[must_use]
    pub const fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sat | Weekday::Sun => Self::Weekend,
            _ => Self::Weekday,
        }
    }

    /// Sub-score for this bucket.
    #[must_use]
    pub const fn score(self) -> f64 {
        match self {
            Self::Weekend => 0.55,
            Self::Weekday => 0.45,
        }
    }
}

/// Keyword severity tier matched in a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordTier {
    /// Tier score 0.90
    Critical,
    /// Tier score 0.65
    High,
    /// Tier score 0.40
    Medium,
}

impl KeywordTier {
    /// Sub-score for this tier.
    #[must_use]
    pub const fn score(self) -> f64 {
        match self {
            Self::Critical => 0.90,
            Self::High => 0.65,
            Self::Medium => 0.40,
        }
    }
}

/// Sub-score when no keyword tier matches.
const DESCRIPTION_DEFAULT_SCORE: f64 = 0.20;

/// Area density sub-score from the recent incident count.
#[must_use]
pub const fn density_score(recent_incident_count: u32) -> f64 {
    if recent_incident_count >= 10 {
        0.70
    } else if recent_incident_count >= 5 {
        0.50
    } else {
        0.30
    }
}

/// Scans a description for the highest matching keyword tier.
#[must_use]
pub fn match_keyword_tier(description: &str, tiers: &KeywordTiers) -> Option<KeywordTier> {
    let lower = description.to_lowercase();

    if contains_any(&lower, &tiers.critical) {
        Some(KeywordTier::Critical)
    } else if contains_any(&lower, &tiers.high) {
        Some(KeywordTier::High)
    } else if contains_any(&lower, &tiers.medium) {
        Some(KeywordTier::Medium)
    } else {
        None
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// Area-history boost: the single highest density threshold met, plus
/// unresolved-hours and repeat-incident bumps, clamped to 0.25.
#[must_use]
pub fn history_boost(stats: &AreaStats) -> f64 {
    let mut boost: f64 = if stats.recent_incident_count >= 15 {
        0.15
    } else if stats.recent_incident_count >= 10 {
        0.10
    } else if stats.recent_incident_count >= 5 {
        0.05
    } else {
        0.0
    };

    if stats.avg_unresolved_hours > 24.0 {
        boost += 0.10;
    } else if stats.avg_unresolved_hours > 12.0 {
        boost += 0.05;
    }

    if stats.has_recent_incidents && stats.recent_incident_count >= 3 {
        boost += 0.05;
    }

    boost.min(HISTORY_BOOST_CAP)
}

/// The extracted feature set for one report.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSet {
    /// Normalized category.
    pub category: IncidentCategory,
    /// Category weight from the table snapshot.
    pub category_score: f64,
    /// Time-of-day bucket.
    pub time_bucket: TimeBucket,
    /// Day bucket.
    pub day_bucket: DayBucket,
    /// Density sub-score.
    pub density_score: f64,
    /// Matched keyword tier, if any.
    pub keyword_tier: Option<KeywordTier>,
    /// Description sub-score (tier score or the 0.20 default).
    pub description_score: f64,
    /// Area-history boost, already clamped.
    pub history_boost: f64,
}

impl FeatureSet {
    /// Extracts all six features for a report.
    #[must_use]
    pub fn extract(
        category: IncidentCategory,
        description: &str,
        created_at: DateTime<Utc>,
        stats: &AreaStats,
        weights: &WeightTable,
        tiers: &KeywordTiers,
    ) -> Self {
        let keyword_tier = match_keyword_tier(description, tiers);

        Self {
            category,
            category_score: weights.weight_for(category),
            time_bucket: TimeBucket::from_hour(created_at.hour()),
            day_bucket: DayBucket::from_weekday(created_at.weekday()),
            density_score: density_score(stats.recent_incident_count),
            keyword_tier,
            description_score: keyword_tier
                .map_or(DESCRIPTION_DEFAULT_SCORE, KeywordTier::score),
            history_boost: history_boost(stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ScoringConfig;

    use super::*;

    #[test]
    fn feature_weights_sum_to_one() {
        let sum = WEIGHT_CATEGORY
            + WEIGHT_TIME_OF_DAY
            + WEIGHT_DAY_OF_WEEK
            + WEIGHT_AREA_DENSITY
            + WEIGHT_DESCRIPTION
            + WEIGHT_AREA_HISTORY;
        assert_eq!(sum, 1.0);
    }

    #[test]
    fn time_buckets_cover_the_day() {
        assert_eq!(TimeBucket::from_hour(23), TimeBucket::LateNight);
        assert_eq!(TimeBucket::from_hour(22), TimeBucket::LateNight);
        assert_eq!(TimeBucket::from_hour(2), TimeBucket::LateNight);
        assert_eq!(TimeBucket::from_hour(4), TimeBucket::LateNight);
        assert_eq!(TimeBucket::from_hour(5), TimeBucket::EarlyMorning);
        assert_eq!(TimeBucket::from_hour(7), TimeBucket::EarlyMorning);
        assert_eq!(TimeBucket::from_hour(8), TimeBucket::Daytime);
        assert_eq!(TimeBucket::from_hour(17), TimeBucket::Daytime);
        assert_eq!(TimeBucket::from_hour(18), TimeBucket::Evening);
        assert_eq!(TimeBucket::from_hour(21), TimeBucket::Evening);
    }

    #[test]
    fn day_buckets() {
        assert_eq!(DayBucket::from_weekday(Weekday::Sat), DayBucket::Weekend);
        assert_eq!(DayBucket::from_weekday(Weekday::Sun), DayBucket::Weekend);
        assert_eq!(DayBucket::from_weekday(Weekday::Wed), DayBucket::Weekday);
    }

    #[test]
    fn density_thresholds() {
        assert_eq!(density_score(0), 0.30);
        assert_eq!(density_score(4), 0.30);
        assert_eq!(density_score(5), 0.50);
        assert_eq!(density_score(9), 0.50);
        assert_eq!(density_score(10), 0.70);
        assert_eq!(density_score(100), 0.70);
    }

    #[test]
    fn highest_keyword_tier_wins() {
        let tiers = ScoringConfig::embedded().unwrap().keywords;
        assert_eq!(
            match_keyword_tier("He pulled a KNIFE and attacked me", &tiers),
            Some(KeywordTier::Critical)
        );
        assert_eq!(
            match_keyword_tier("victim was attacked with force", &tiers),
            Some(KeywordTier::High)
        );
        assert_eq!(
            match_keyword_tier("constant verbal abuse", &tiers),
            Some(KeywordTier::Medium)
        );
        assert_eq!(match_keyword_tier("someone took my parking spot", &tiers), None);
    }

    #[test]
    fn history_boost_schedule_and_clamp() {
        let zero = AreaStats::default();
        assert_eq!(history_boost(&zero), 0.0);

        // Thresholds are non-cumulative: only the highest applies.
        let fifteen = AreaStats {
            recent_incident_count: 15,
            avg_unresolved_hours: 0.0,
            has_recent_incidents: true,
        };
        assert!((history_boost(&fifteen) - 0.20).abs() < 1e-12); // 0.15 + repeat 0.05

        let stacked_boosts = AreaStats {
            recent_incident_count: 12,
            avg_unresolved_hours: 30.0,
            has_recent_incidents: true,
        };
        assert!((history_boost(&stacked_boosts) - 0.25).abs() < 1e-12);

        // Everything maxed still clamps to 0.25.
        let maxed = AreaStats {
            recent_incident_count: 50,
            avg_unresolved_hours: 100.0,
            has_recent_incidents: true,
        };
        assert!((history_boost(&maxed) - 0.25).abs() < 1e-12);

        let hours_only = AreaStats {
            recent_incident_count: 1,
            avg_unresolved_hours: 13.0,
            has_recent_incidents: true,
        };
        assert!((history_boost(&hours_only) - 0.05).abs() < 1e-12);
    }
}
