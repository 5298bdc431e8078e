//! Zone lifecycle: the manual zone registry, the clustering rebuild,
//! and the queryable index snapshot.
//!
//! Rebuilds are single-flight. A request that arrives while another
//! rebuild is running waits for it and then skips its own pass, since
//! the finished rebuild already observed a superset of the data the
//! waiter asked for.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use safewatch_area::{ReportStore, StoreError};
use safewatch_cluster::ClusterConfig;
use safewatch_geo::ZoneIndex;
use safewatch_models::Zone;
use tokio::sync::{Mutex, RwLock};

/// Holds the current zone set and serializes rebuilds.
pub struct ZoneManager {
    manual: RwLock<Vec<Zone>>,
    index: RwLock<Arc<ZoneIndex>>,
    rebuild_lock: Mutex<()>,
    generation: AtomicU64,
    config: ClusterConfig,
}

impl Default for ZoneManager {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}

impl ZoneManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            manual: RwLock::new(Vec::new()),
            index: RwLock::new(Arc::new(ZoneIndex::new(Vec::new()))),
            rebuild_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            config,
        }
    }

    /// Registers a manual zone. Takes effect on the next rebuild.
    pub async fn add_manual(&self, zone: Zone) {
        log::info!("Registering manual zone {} ({})", zone.id, zone.name);
        self.manual.write().await.push(zone);
    }

    /// Current index snapshot. Evaluations keep using the snapshot
    /// they grabbed even if a rebuild swaps the index mid-flight.
    pub async fn index(&self) -> Arc<ZoneIndex> {
        Arc::clone(&*self.index.read().await)
    }

    /// Number of completed rebuilds.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Re-clusters recent reports and swaps in the new index. Returns
    /// the zone count of the index that is current afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the report query fails; the previous
    /// index stays in place.
    pub async fn rebuild<S: ReportStore>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let requested_at = self.generation.load(Ordering::Acquire);
        let _guard = self.rebuild_lock.lock().await;

        // A rebuild that finished while this one waited for the lock
        // already covered this request.
        if self.generation.load(Ordering::Acquire) > requested_at {
            log::debug!("Zone rebuild coalesced into a just-finished pass");
            return Ok(self.index.read().await.len());
        }

        let since = now - Duration::days(self.config.window_days);
        let reports = store.query_since(since).await?;
        let manual = self.manual.read().await.clone();
        let zones = safewatch_cluster::cluster(&reports, &manual, now, &self.config);

        let index = ZoneIndex::new(zones);
        let len = index.len();
        *self.index.write().await = Arc::new(index);
        self.generation.fetch_add(1, Ordering::AcqRel);

        log::info!("Zone rebuild complete: {len} zones active");
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use safewatch_area::memory::MemoryReportStore;
    use safewatch_models::{
        Coordinates, IncidentCategory, Report, ReportStatus, RiskLevel, ZoneOrigin,
    };
    use uuid::Uuid;

    use super::*;

    fn report(lat: f64, lng: f64, now: DateTime<Utc>) -> Report {
        Report {
            id: Uuid::new_v4(),
            category: IncidentCategory::Assault,
            description: "test".to_string(),
            coordinates: Some(Coordinates::new(lat, lng)),
            created_at: now - Duration::hours(1),
            status: ReportStatus::Pending,
            risk_score: 80,
            confidence: 0.7,
            score_breakdown: BTreeMap::new(),
            explanation: String::new(),
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn rebuild_swaps_in_clustered_zones() {
        let store = MemoryReportStore::default();
        let now = Utc::now();
        store.persist(&report(28.7041, 77.1025, now)).await.unwrap();
        store.persist(&report(28.7043, 77.1028, now)).await.unwrap();

        let manager = ZoneManager::default();
        assert!(manager.index().await.is_empty());

        let count = manager.rebuild(&store, now).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(manager.generation(), 1);

        let index = manager.index().await;
        assert!(index.first_containing(Coordinates::new(28.7042, 77.1026)).is_some());
    }

    #[tokio::test]
    async fn manual_zones_survive_rebuilds() {
        let store = MemoryReportStore::default();
        let manager = ZoneManager::default();
        manager
            .add_manual(Zone {
                id: "mz-1".to_string(),
                name: "Market underpass".to_string(),
                origin: ZoneOrigin::Manual,
                center: Coordinates::new(28.71, 77.11),
                radius_meters: 300.0,
                risk_level: RiskLevel::High,
                avg_risk: 75.0,
                member_count: 1,
            })
            .await;

        let count = manager.rebuild(&store, Utc::now()).await.unwrap();
        assert_eq!(count, 1);
        let index = manager.index().await;
        assert_eq!(
            index
                .first_containing(Coordinates::new(28.71, 77.11))
                .map(|z| z.id.as_str()),
            Some("mz-1")
        );
    }

    #[tokio::test]
    async fn old_snapshot_stays_valid_across_rebuild() {
        let store = MemoryReportStore::default();
        let now = Utc::now();
        store.persist(&report(28.7041, 77.1025, now)).await.unwrap();

        let manager = ZoneManager::default();
        manager.rebuild(&store, now).await.unwrap();
        let old = manager.index().await;

        store.persist(&report(28.9000, 77.3000, now)).await.unwrap();
        manager.rebuild(&store, now).await.unwrap();

        assert_eq!(old.len(), 1);
        assert_eq!(manager.index().await.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_rebuilds_both_succeed() {
        let store = MemoryReportStore::default();
        let now = Utc::now();
        store.persist(&report(28.7041, 77.1025, now)).await.unwrap();

        let manager = ZoneManager::default();
        let (a, b) = tokio::join!(manager.rebuild(&store, now), manager.rebuild(&store, now));
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert!(manager.generation() >= 1);
    }
}
