//! The mutable category weight table and its continuous-learning
//! update rule.
//!
//! The table is the only run-to-run source of score drift. Writers
//! must be serialized by the owner (the engine takes a write lock);
//! readers score against a snapshot clone so a concurrent update never
//! tears a scoring call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use safewatch_models::IncidentCategory;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{RiskError, ScoringConfig};

/// Lower clamp for any category weight.
pub const WEIGHT_MIN: f64 = 0.15;
/// Upper clamp for any category weight.
pub const WEIGHT_MAX: f64 = 0.99;

/// Resolution time that normalizes to factor 1.0.
const RESOLUTION_NORM_HOURS: f64 = 72.0;
/// Factor above which the weight is nudged up.
const FACTOR_SLOW: f64 = 0.7;
/// Factor below which the weight is nudged down.
const FACTOR_FAST: f64 = 0.3;
/// Multiplicative nudge for slow resolutions.
const NUDGE_UP: f64 = 1.02;
/// Multiplicative nudge for fast resolutions.
const NUDGE_DOWN: f64 = 0.98;

/// Category name -> weight, with a version for restart recovery.
///
/// Weights always stay within `[WEIGHT_MIN, WEIGHT_MAX]`. The version
/// increments on every effective mutation and is persisted alongside
/// the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightTable {
    weights: BTreeMap<IncidentCategory, f64>,
    version: u64,
}

/// Result of one weight update, recorded for the operational log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightUpdate {
    /// The updated category.
    pub category: IncidentCategory,
    /// Weight before the update.
    pub previous: f64,
    /// Weight after the update.
    pub current: f64,
    /// Normalized resolution factor that drove the update.
    pub factor: f64,
}

impl WeightUpdate {
    /// Whether the update actually moved the weight.
    #[must_use]
    pub fn changed(&self) -> bool {
        (self.current - self.previous).abs() > f64::EPSILON
    }
}

impl WeightTable {
    /// Builds a table from the scoring config's category entries.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] if a config key does not name a
    /// known category.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, RiskError> {
        let mut weights = BTreeMap::new();
        for (key, weight) in &config.categories {
            let category: IncidentCategory = key.parse().map_err(|_| RiskError::Config {
                message: format!("unknown category '{key}' in scoring config"),
            })?;
            weights.insert(category, weight.clamp(WEIGHT_MIN, WEIGHT_MAX));
        }
        Ok(Self {
            weights,
            version: 0,
        })
    }

    /// Returns the weight for a category, falling back to the `other`
    /// entry for anything missing from the table.
    #[must_use]
    pub fn weight_for(&self, category: IncidentCategory) -> f64 {
        self.weights.get(&category).copied().unwrap_or_else(|| {
            self.weights
                .get(&IncidentCategory::Other)
                .copied()
                .unwrap_or(0.20)
        })
    }

    /// Current table version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Applies the continuous-learning rule for one resolved report.
    ///
    /// The resolution factor is `min(1.0, resolution_hours / 72)`.
    /// Slow resolutions (factor > 0.7) nudge the category weight up by
    /// 2%, fast ones (factor < 0.3) nudge it down by 2%, anything in
    /// between leaves it unchanged. The result is clamped to
    /// `[WEIGHT_MIN, WEIGHT_MAX]`. Each call applies the rule exactly
    /// once; callers must not replay it on retries.
    pub fn apply_resolution(
        &mut self,
        category: IncidentCategory,
        resolution_hours: f64,
    ) -> WeightUpdate {
        let factor = (resolution_hours / RESOLUTION_NORM_HOURS).min(1.0);
        let previous = self.weight_for(category);

        let current = if factor > FACTOR_SLOW {
            (previous * NUDGE_UP).clamp(WEIGHT_MIN, WEIGHT_MAX)
        } else if factor < FACTOR_FAST {
            (previous * NUDGE_DOWN).clamp(WEIGHT_MIN, WEIGHT_MAX)
        } else {
            previous
        };

        let update = WeightUpdate {
            category,
            previous,
            current,
            factor,
        };

        if update.changed() {
            self.weights.insert(category, current);
            self.version += 1;
        }

        update
    }
}

/// Persistence interface for the weight table. Durability is
/// best-effort: a failed save never rolls back the in-memory table.
/// Saves can race, so implementations must ignore a table whose
/// version is lower than the one already stored.
#[async_trait]
pub trait WeightStore: Send + Sync {
    /// Loads the persisted table, or `None` on first run.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::WeightStore`] if the read fails.
    async fn load(&self) -> Result<Option<WeightTable>, RiskError>;

    /// Persists the table.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::WeightStore`] if the write fails.
    async fn save(&self, table: &WeightTable) -> Result<(), RiskError>;
}

/// In-memory [`WeightStore`] for tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryWeightStore {
    table: RwLock<Option<WeightTable>>,
}

#[async_trait]
impl WeightStore for MemoryWeightStore {
    async fn load(&self) -> Result<Option<WeightTable>, RiskError> {
        Ok(self.table.read().await.clone())
    }

    async fn save(&self, table: &WeightTable) -> Result<(), RiskError> {
        let mut slot = self.table.write().await;
        // Out-of-order saves keep the newer table.
        if slot
            .as_ref()
            .is_some_and(|stored| stored.version() > table.version())
        {
            return Ok(());
        }
        *slot = Some(table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> WeightTable {
        WeightTable::from_config(&ScoringConfig::embedded().unwrap()).unwrap()
    }

    #[test]
    fn slow_resolution_nudges_up() {
        let mut t = table();
        // 60h / 72h = 0.83 > 0.7
        let update = t.apply_resolution(IncidentCategory::Assault, 60.0);
        assert!(update.changed());
        assert!((update.current - 0.82 * 1.02).abs() < 1e-12);
        assert_eq!(t.version(), 1);
    }

    #[test]
    fn fast_resolution_nudges_down() {
        let mut t = table();
        // 10h / 72h = 0.14 < 0.3
        let update = t.apply_resolution(IncidentCategory::Stalking, 10.0);
        assert!((update.current - 0.75 * 0.98).abs() < 1e-12);
    }

    #[test]
    fn mid_range_resolution_leaves_weight_unchanged() {
        let mut t = table();
        // 30h / 72h = 0.417, between 0.3 and 0.7
        let update = t.apply_resolution(IncidentCategory::Threat, 30.0);
        assert!(!update.changed());
        assert_eq!(update.previous, update.current);
        assert_eq!(t.version(), 0);
    }

    #[test]
    fn resolution_factor_caps_at_one() {
        let mut t = table();
        let update = t.apply_resolution(IncidentCategory::Harassment, 500.0);
        assert!((update.factor - 1.0).abs() < f64::EPSILON);
        assert!((update.current - 0.55 * 1.02).abs() < 1e-12);
    }

    #[test]
    fn consecutive_updates_compound_and_stay_clamped() {
        let mut t = table();
        let first = t.apply_resolution(IncidentCategory::Assault, 72.0);
        let second = t.apply_resolution(IncidentCategory::Assault, 72.0);
        assert!((second.current - 0.82 * 1.02 * 1.02).abs() < 1e-12);
        assert!(second.current > first.current);

        // Drive to the upper clamp; never exceeds it.
        for _ in 0..200 {
            t.apply_resolution(IncidentCategory::Assault, 72.0);
        }
        assert!(t.weight_for(IncidentCategory::Assault) <= WEIGHT_MAX);

        // And the lower clamp.
        for _ in 0..200 {
            t.apply_resolution(IncidentCategory::Other, 1.0);
        }
        assert!(t.weight_for(IncidentCategory::Other) >= WEIGHT_MIN);
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        let config = ScoringConfig::parse(
            "[categories]\nother = 0.20\n\n[keywords]\ncritical = []\nhigh = []\nmedium = []\n",
        )
        .unwrap();
        let t = WeightTable::from_config(&config).unwrap();
        assert!((t.weight_for(IncidentCategory::Assault) - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn config_with_bad_key_is_rejected() {
        let config = ScoringConfig::parse(
            "[categories]\nother = 0.20\nburglary = 0.5\n\n[keywords]\ncritical = []\nhigh = []\nmedium = []\n",
        )
        .unwrap();
        assert!(WeightTable::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryWeightStore::default();
        assert!(store.load().await.unwrap().is_none());
        let t = table();
        store.save(&t).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(t));
    }

    #[tokio::test]
    async fn stale_save_does_not_clobber_newer_table() {
        let store = MemoryWeightStore::default();
        let stale = table();
        let mut fresh = table();
        fresh.apply_resolution(IncidentCategory::Assault, 72.0);
        assert!(fresh.version() > stale.version());

        store.save(&fresh).await.unwrap();
        // A save racing in with an older snapshot is dropped.
        store.save(&stale).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(fresh));
    }
}
