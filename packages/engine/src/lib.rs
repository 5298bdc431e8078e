#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The assembled risk engine: report intake and scoring, the
//! continuous-learning weight loop, zone lifecycle, and per-subject
//! proximity and distress tracking.
//!
//! Scoring reads a weight table snapshot so a concurrent resolution
//! never tears a score; resolutions take the single write path. Zone
//! rebuilds swap an immutable index snapshot, so evaluations always
//! see a complete zone set.

pub mod tracker;
pub mod zones;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use safewatch_alert::{AlertBroadcaster, AlertDispatcher};
use safewatch_area::{AreaAnalyzer, AreaConfig, ReportStore, StoreError};
use safewatch_cluster::ClusterConfig;
use safewatch_geo::ZoneIndex;
use safewatch_models::{
    AlertEvent, AreaStats, Coordinates, DispatchOutcome, IncidentCategory, Position, Report,
    ReportStatus, RiskResult, Zone,
};
use safewatch_risk::{
    RiskError, RiskScorer, ScoreInput, ScoringConfig, WeightStore, WeightTable, WeightUpdate,
};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

pub use tracker::SubjectTracker;
pub use zones::ZoneManager;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The report store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Scoring configuration or weight persistence failed.
    #[error(transparent)]
    Risk(#[from] RiskError),

    /// The referenced report does not exist.
    #[error("Report not found: {id}")]
    ReportNotFound {
        /// The missing report id.
        id: Uuid,
    },
}

/// Result of resolving a report.
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    /// The report in its resolved state.
    pub report: Report,
    /// The weight nudge applied, or `None` when the report was already
    /// resolved and the rule must not replay.
    pub weight_update: Option<WeightUpdate>,
}

/// The assembled engine. Generic over the report store so tests and
/// the demo run in memory while deployments plug in real persistence.
pub struct RiskEngine<S> {
    store: Arc<S>,
    analyzer: AreaAnalyzer<Arc<S>>,
    scorer: RiskScorer,
    weights: RwLock<WeightTable>,
    weight_store: Arc<dyn WeightStore>,
    zones: ZoneManager,
    tracker: SubjectTracker,
    dispatcher: AlertDispatcher,
}

impl<S: ReportStore> RiskEngine<S> {
    /// Assembles an engine with default area and clustering windows.
    /// Weights come from the persisted table when one exists, else
    /// from the embedded scoring config.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the scoring config is invalid or the
    /// weight store cannot be read.
    pub async fn new(
        store: Arc<S>,
        weight_store: Arc<dyn WeightStore>,
        dispatcher: AlertDispatcher,
    ) -> Result<Self, EngineError> {
        Self::with_configs(
            store,
            weight_store,
            dispatcher,
            AreaConfig::default(),
            ClusterConfig::default(),
        )
        .await
    }

    /// Assembles an engine with explicit area and clustering windows.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the scoring config is invalid or the
    /// weight store cannot be read.
    pub async fn with_configs(
        store: Arc<S>,
        weight_store: Arc<dyn WeightStore>,
        dispatcher: AlertDispatcher,
        area: AreaConfig,
        cluster: ClusterConfig,
    ) -> Result<Self, EngineError> {
        let config = ScoringConfig::embedded()?;
        let weights = match weight_store.load().await? {
            Some(table) => {
                log::info!("Loaded weight table version {}", table.version());
                table
            }
            None => WeightTable::from_config(&config)?,
        };

        Ok(Self {
            analyzer: AreaAnalyzer::with_config(Arc::clone(&store), area),
            store,
            scorer: RiskScorer::new(&config),
            weights: RwLock::new(weights),
            weight_store,
            zones: ZoneManager::new(cluster),
            tracker: SubjectTracker::new(),
            dispatcher,
        })
    }

    /// Scores and persists a new report.
    ///
    /// The raw category string is normalized, unknown values falling
    /// back to `other`. When the area query fails the report is scored
    /// on zero-value stats with a reduced-confidence note instead of
    /// being rejected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] only if the final persist fails.
    pub async fn submit_report(
        &self,
        category_input: &str,
        description: &str,
        coordinates: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> Result<Report, EngineError> {
        let category = IncidentCategory::from_input(category_input);

        let (stats, degraded) = match self.analyzer.analyze(coordinates, now).await {
            Ok(stats) => (stats, false),
            Err(e) => {
                log::warn!("Area analysis unavailable, scoring degraded: {e}");
                (AreaStats::default(), true)
            }
        };

        let result = self.score_snapshot(category, description, now, &stats, degraded).await;

        let report = Report {
            id: Uuid::new_v4(),
            category,
            description: description.to_string(),
            coordinates,
            created_at: now,
            status: ReportStatus::Pending,
            risk_score: result.risk_score,
            confidence: result.confidence,
            score_breakdown: result.breakdown,
            explanation: result.explanation,
            resolved_at: None,
        };

        self.store.persist(&report).await?;
        log::info!(
            "Report {} scored {} (category {category}, confidence {:.2})",
            report.id,
            report.risk_score,
            report.confidence
        );
        Ok(report)
    }

    /// Marks a report resolved and applies the continuous-learning
    /// weight nudge for its category.
    ///
    /// Resolving an already-resolved report is a no-op for both the
    /// report and the weights, so retries are safe.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ReportNotFound`] for an unknown id, or
    /// [`EngineError::Store`] if the lookup or write-back fails. A
    /// failed weight save is logged, not propagated.
    pub async fn resolve_report(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ResolutionOutcome, EngineError> {
        let mut report = self
            .store
            .get(id)
            .await?
            .ok_or(EngineError::ReportNotFound { id })?;

        if report.status == ReportStatus::Resolved {
            log::debug!("Report {id} already resolved, skipping weight update");
            return Ok(ResolutionOutcome {
                report,
                weight_update: None,
            });
        }

        report.status = ReportStatus::Resolved;
        report.resolved_at = Some(now);
        self.store.persist(&report).await?;

        #[allow(clippy::cast_precision_loss)]
        let resolution_hours =
            ((now - report.created_at).num_milliseconds() as f64 / 3_600_000.0).max(0.0);

        let (update, snapshot) = {
            let mut table = self.weights.write().await;
            let update = table.apply_resolution(report.category, resolution_hours);
            (update, table.clone())
        };

        if update.changed() {
            log::info!(
                "Weight for {} nudged {:.4} -> {:.4} (resolution {resolution_hours:.1}h)",
                update.category,
                update.previous,
                update.current
            );
            // Durability is best-effort; the in-memory table is not
            // rolled back on a failed save.
            if let Err(e) = self.weight_store.save(&snapshot).await {
                log::warn!("Weight table save failed: {e}");
            }
        }

        Ok(ResolutionOutcome {
            report,
            weight_update: Some(update),
        })
    }

    /// Current weight table snapshot.
    pub async fn weights(&self) -> WeightTable {
        self.weights.read().await.clone()
    }

    /// Registers a manual zone. Takes effect on the next rebuild.
    pub async fn add_manual_zone(&self, zone: Zone) {
        self.zones.add_manual(zone).await;
    }

    /// Re-clusters recent reports into auto zones. Concurrent calls
    /// coalesce into one pass. Returns the active zone count.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the report query fails; the
    /// previous zone set stays active.
    pub async fn rebuild_zones(&self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        Ok(self.zones.rebuild(self.store.as_ref(), now).await?)
    }

    /// Current zone index snapshot.
    pub async fn zone_index(&self) -> Arc<ZoneIndex> {
        self.zones.index().await
    }

    /// Registers a subscriber for fired alert events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.dispatcher.broadcaster().subscribe()
    }

    /// Evaluates a position sample against the current zones and
    /// dispatches when the subject's zone-entry machine fires.
    pub async fn track_position(
        &self,
        position: &Position,
        now: DateTime<Utc>,
    ) -> Option<DispatchOutcome> {
        let machines = self.tracker.machines_for(&position.subject_id).await;
        let index = self.zones.index().await;

        let decision = {
            let mut machines = machines.lock().await;
            machines.proximity.evaluate(position, &index, now)
        };

        if decision.fire {
            Some(self.dispatcher.dispatch(&decision).await)
        } else {
            None
        }
    }

    /// Stops tracking a subject and discards its alert state. A later
    /// sample for the same subject is treated as a brand-new subject,
    /// with no cooldowns carried over. Returns whether the subject was
    /// being tracked.
    pub async fn stop_tracking(&self, subject_id: &str) -> bool {
        self.tracker.stop_tracking(subject_id).await
    }

    /// Scans a free-text message for distress keywords and dispatches
    /// when the subject's distress monitor fires.
    pub async fn distress_message(
        &self,
        subject_id: &str,
        message: &str,
        coordinates: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> Option<DispatchOutcome> {
        let machines = self.tracker.machines_for(subject_id).await;

        let decision = {
            let mut machines = machines.lock().await;
            machines.distress.evaluate(message, coordinates, now)
        };

        if decision.fire {
            Some(self.dispatcher.dispatch(&decision).await)
        } else {
            None
        }
    }

    async fn score_snapshot(
        &self,
        category: IncidentCategory,
        description: &str,
        created_at: DateTime<Utc>,
        stats: &AreaStats,
        degraded: bool,
    ) -> RiskResult {
        let snapshot = self.weights.read().await.clone();
        let input = ScoreInput {
            category,
            description,
            created_at,
        };
        self.scorer.score(&input, &snapshot, stats, degraded)
    }
}
