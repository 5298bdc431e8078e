#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Weighted risk scoring for safety-incident reports.
//!
//! Scoring is a pure function of the report, the area stats, and a
//! snapshot of the category [`WeightTable`]: six fixed-weight features
//! (category severity, time of day, day of week, area density,
//! description keywords, area history) combine into a 0-100 risk score
//! with a confidence value and a per-feature breakdown. The only
//! mutable state is the weight table, nudged by the
//! continuous-learning loop as reports resolve.

pub mod config;
pub mod features;
pub mod scorer;
pub mod weights;

pub use config::{KeywordTiers, ScoringConfig};
pub use scorer::{RiskScorer, ScoreInput};
pub use weights::{MemoryWeightStore, WeightStore, WeightTable, WeightUpdate};

use thiserror::Error;

/// Errors that can occur in the risk scoring layer.
#[derive(Debug, Error)]
pub enum RiskError {
    /// The embedded or supplied scoring config failed to parse.
    #[error("Scoring config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Weight persistence failed. Non-fatal to the in-memory update.
    #[error("Weight store error: {message}")]
    WeightStore {
        /// Description of what went wrong.
        message: String,
    },
}
