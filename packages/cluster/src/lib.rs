#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Clustering of scored reports into auto zones.
//!
//! Reports are bucketed into ~100 m cells by rounding coordinates to
//! three decimal places; each non-empty cell becomes one auto zone
//! centered on the member centroid. Manual zones pass through
//! unchanged and always precede the auto zones in the output. The pass
//! is pure and idempotent: the same input set always produces the same
//! zone list.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use safewatch_models::{Coordinates, Report, RiskLevel, Zone, ZoneOrigin};

/// Clustering window and output limits.
#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
    /// Trailing window in days.
    pub window_days: i64,
    /// Maximum number of auto zones in the output.
    pub max_auto_zones: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            max_auto_zones: 50,
        }
    }
}

#[derive(Default)]
struct Bucket {
    lat_sum: f64,
    lng_sum: f64,
    risk_sum: f64,
    count: u32,
}

/// Aggregates recent scored reports into auto zones and merges them
/// with the manual zone set.
///
/// Reports outside the window or without coordinates are skipped.
/// Auto zones are sorted by descending average risk, ties broken by
/// higher member count, then by cell key for determinism, and capped
/// at `config.max_auto_zones`.
#[must_use]
pub fn cluster(
    reports: &[Report],
    manual_zones: &[Zone],
    now: DateTime<Utc>,
    config: &ClusterConfig,
) -> Vec<Zone> {
    let since = now - Duration::days(config.window_days);

    let mut buckets: BTreeMap<(i64, i64), Bucket> = BTreeMap::new();
    for report in reports {
        if report.created_at < since {
            continue;
        }
        let Some(coords) = report.coordinates else {
            continue;
        };

        let key = (millidegrees(coords.latitude), millidegrees(coords.longitude));
        let bucket = buckets.entry(key).or_default();
        bucket.lat_sum += coords.latitude;
        bucket.lng_sum += coords.longitude;
        bucket.risk_sum += f64::from(report.risk_score);
        bucket.count += 1;
    }

    let mut auto_zones: Vec<(String, Zone)> = buckets
        .into_iter()
        .map(|(key, bucket)| {
            let cell_key = cell_key(key);
            let count = f64::from(bucket.count);
            let avg_risk = bucket.risk_sum / count;
            let zone = Zone {
                id: format!("auto:{cell_key}"),
                name: format!("Auto zone {cell_key}"),
                origin: ZoneOrigin::Auto,
                center: Coordinates::new(bucket.lat_sum / count, bucket.lng_sum / count),
                radius_meters: (50.0 + count * 10.0).min(500.0),
                risk_level: RiskLevel::from_avg_risk(avg_risk),
                avg_risk,
                member_count: bucket.count,
            };
            (cell_key, zone)
        })
        .collect();

    auto_zones.sort_by(|(key_a, a), (key_b, b)| {
        b.avg_risk
            .total_cmp(&a.avg_risk)
            .then_with(|| b.member_count.cmp(&a.member_count))
            .then_with(|| key_a.cmp(key_b))
    });
    auto_zones.truncate(config.max_auto_zones);

    log::debug!(
        "Clustering produced {} auto zones from {} reports ({} manual zones pass through)",
        auto_zones.len(),
        reports.len(),
        manual_zones.len()
    );

    let mut zones = manual_zones.to_vec();
    zones.extend(auto_zones.into_iter().map(|(_, zone)| zone));
    zones
}

/// Rounds a coordinate to integer millidegrees (~100 m cells).
#[allow(clippy::cast_possible_truncation)]
fn millidegrees(degrees: f64) -> i64 {
    (degrees * 1000.0).round() as i64
}

/// Human-readable cell key, e.g. `"28.704_77.103"`.
fn cell_key((lat_mi, lng_mi): (i64, i64)) -> String {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(mi: i64) -> String {
        format!("{:.3}", mi as f64 / 1000.0)
    }
    format!("{}_{}", fmt(lat_mi), fmt(lng_mi))
}
