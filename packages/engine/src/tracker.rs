//! Per-subject state registry.
//!
//! Each tracked subject gets one zone-entry evaluator and one distress
//! monitor, created lazily and guarded by a per-subject lock so
//! samples for the same subject are evaluated in order while different
//! subjects proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use safewatch_alert::{DistressMonitor, ProximityEvaluator};
use tokio::sync::{Mutex, RwLock};

/// The two alert state machines for one subject. Separate instances so
/// zone and distress cooldowns never interact.
pub struct SubjectMachines {
    /// Zone-entry state machine.
    pub proximity: ProximityEvaluator,
    /// Distress-keyword monitor.
    pub distress: DistressMonitor,
}

/// Lazily-populated registry of subject state machines.
#[derive(Default)]
pub struct SubjectTracker {
    subjects: RwLock<HashMap<String, Arc<Mutex<SubjectMachines>>>>,
}

impl SubjectTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the subject's machines, creating them on first sight.
    pub async fn machines_for(&self, subject_id: &str) -> Arc<Mutex<SubjectMachines>> {
        if let Some(existing) = self.subjects.read().await.get(subject_id) {
            return Arc::clone(existing);
        }

        let mut subjects = self.subjects.write().await;
        // Re-check under the write lock; another task may have raced
        // the insert.
        if let Some(existing) = subjects.get(subject_id) {
            return Arc::clone(existing);
        }

        log::debug!("Tracking new subject {subject_id}");
        let machines = Arc::new(Mutex::new(SubjectMachines {
            proximity: ProximityEvaluator::new(subject_id),
            distress: DistressMonitor::new(subject_id),
        }));
        subjects.insert(subject_id.to_string(), Arc::clone(&machines));
        machines
    }

    /// Discards the subject's state machines. The next sample for the
    /// subject starts from a fresh `Outside` state with no cooldowns.
    /// Returns whether the subject was being tracked.
    pub async fn stop_tracking(&self, subject_id: &str) -> bool {
        let removed = self.subjects.write().await.remove(subject_id).is_some();
        if removed {
            log::debug!("Stopped tracking subject {subject_id}");
        }
        removed
    }

    /// Number of subjects seen so far.
    pub async fn len(&self) -> usize {
        self.subjects.read().await.len()
    }

    /// Whether no subjects have been seen.
    pub async fn is_empty(&self) -> bool {
        self.subjects.read().await.is_empty()
    }
}
