//! In-memory [`ReportStore`] used by tests and the demo binary.

use chrono::{DateTime, Utc};
use safewatch_models::{Coordinates, Report};
use tokio::sync::RwLock;

use crate::{ReportStore, StoreError};

/// Vec-backed report store. Persisting a report with an existing id
/// replaces the stored row, which is how status transitions are
/// written back.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<Report>>,
}

impl MemoryReportStore {
    /// Returns a copy of every stored report.
    pub async fn all(&self) -> Vec<Report> {
        self.reports.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ReportStore for MemoryReportStore {
    async fn query_recent(
        &self,
        _center: Coordinates,
        _radius_km: f64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Report>, StoreError> {
        // Time filter only; the analyzer applies the distance filter.
        Ok(self
            .reports
            .read()
            .await
            .iter()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>, StoreError> {
        Ok(self
            .reports
            .read()
            .await
            .iter()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn get(&self, id: uuid::Uuid) -> Result<Option<Report>, StoreError> {
        Ok(self.reports.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn persist(&self, report: &Report) -> Result<(), StoreError> {
        let mut reports = self.reports.write().await;
        if let Some(existing) = reports.iter_mut().find(|r| r.id == report.id) {
            *existing = report.clone();
        } else {
            reports.push(report.clone());
        }
        Ok(())
    }
}
