#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Area analysis: density and history statistics for a coordinate.
//!
//! The analyzer queries a [`ReportStore`] for a spatial and temporal
//! window around a report and derives the [`AreaStats`] the risk
//! scorer consumes. Stats are recomputed per scoring call and never
//! persisted.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use safewatch_models::{AreaStats, Coordinates, Report, ReportStatus};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by report store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A read query failed.
    #[error("Store query failed: {message}")]
    Query {
        /// Description of what went wrong.
        message: String,
    },

    /// A write failed.
    #[error("Store persist failed: {message}")]
    Persist {
        /// Description of what went wrong.
        message: String,
    },
}

/// Persistence interface the core consumes; implemented by the
/// excluded plumbing (and by [`memory::MemoryReportStore`] for tests
/// and the demo).
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Returns reports created at or after `since`. Implementations
    /// may pre-filter by distance from `center` using `radius_km` as a
    /// hint, but the analyzer always re-applies the exact haversine
    /// filter itself.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn query_recent(
        &self,
        center: Coordinates,
        radius_km: f64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Report>, StoreError>;

    /// Returns all reports created at or after `since`, regardless of
    /// location. Used by the clustering pass.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>, StoreError>;

    /// Looks up a single report by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying query fails.
    async fn get(&self, id: Uuid) -> Result<Option<Report>, StoreError>;

    /// Persists a report. Reports are never deleted, so there is no
    /// removal counterpart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn persist(&self, report: &Report) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: ReportStore + ?Sized> ReportStore for std::sync::Arc<S> {
    async fn query_recent(
        &self,
        center: Coordinates,
        radius_km: f64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Report>, StoreError> {
        (**self).query_recent(center, radius_km, since).await
    }

    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>, StoreError> {
        (**self).query_since(since).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>, StoreError> {
        (**self).get(id).await
    }

    async fn persist(&self, report: &Report) -> Result<(), StoreError> {
        (**self).persist(report).await
    }
}

/// Spatial and temporal window for area analysis.
#[derive(Debug, Clone, Copy)]
pub struct AreaConfig {
    /// Trailing window in days.
    pub window_days: i64,
    /// Radius around the report in kilometers.
    pub radius_km: f64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            radius_km: 5.0,
        }
    }
}

/// Derives [`AreaStats`] for a coordinate from the report store.
pub struct AreaAnalyzer<S> {
    store: S,
    config: AreaConfig,
}

impl<S: ReportStore> AreaAnalyzer<S> {
    /// Creates an analyzer with the default 30-day / 5 km window.
    pub fn new(store: S) -> Self {
        Self::with_config(store, AreaConfig::default())
    }

    /// Creates an analyzer with an explicit window.
    pub const fn with_config(store: S, config: AreaConfig) -> Self {
        Self { store, config }
    }

    /// Computes density and history stats for the area around
    /// `coordinates` as of `now`.
    ///
    /// Missing coordinates yield the zero-value stats (no area
    /// signal), and a store returning zero rows is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store query fails; callers decide
    /// whether to degrade to zero stats.
    pub async fn analyze(
        &self,
        coordinates: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> Result<AreaStats, StoreError> {
        let Some(center) = coordinates else {
            return Ok(AreaStats::default());
        };

        let since = now - Duration::days(self.config.window_days);
        let rows = self
            .store
            .query_recent(center, self.config.radius_km, since)
            .await?;

        let nearby: Vec<&Report> = rows
            .iter()
            .filter(|r| r.status != ReportStatus::Resolved)
            .filter(|r| r.created_at >= since)
            .filter(|r| {
                r.coordinates
                    .is_some_and(|c| safewatch_geo::within_radius_km(center, c, self.config.radius_km))
            })
            .collect();

        if nearby.is_empty() {
            return Ok(AreaStats::default());
        }

        log::debug!(
            "Area analysis found {} unresolved incidents within {}km",
            nearby.len(),
            self.config.radius_km
        );

        let total_hours: f64 = nearby
            .iter()
            .map(|r| (now - r.created_at).num_seconds() as f64 / 3600.0)
            .sum();

        #[allow(clippy::cast_possible_truncation)]
        let count = nearby.len() as u32;

        Ok(AreaStats {
            recent_incident_count: count,
            avg_unresolved_hours: total_hours / nearby.len() as f64,
            has_recent_incidents: true,
        })
    }
}
