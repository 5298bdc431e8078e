//! Scoring model configuration, embedded at compile time.
//!
//! The default category weights and description keyword tiers are data
//! rather than code, so they live in `scoring/default.toml` and are
//! baked into the binary via [`include_str!`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::RiskError;

/// Default scoring config embedded at compile time.
const DEFAULT_SCORING_TOML: &str = include_str!("../scoring/default.toml");

/// Keyword tiers scanned against lowercased report descriptions. The
/// highest matching tier wins.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTiers {
    /// Highest-severity keywords (tier score 0.90).
    pub critical: Vec<String>,
    /// High-severity keywords (tier score 0.65).
    pub high: Vec<String>,
    /// Medium-severity keywords (tier score 0.40).
    pub medium: Vec<String>,
}

/// Parsed scoring model data.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Category key -> starting weight.
    pub categories: BTreeMap<String, f64>,
    /// Description keyword tiers.
    pub keywords: KeywordTiers,
}

impl ScoringConfig {
    /// Parses the embedded default config.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] if the embedded TOML is invalid
    /// or omits the required `other` fallback category.
    pub fn embedded() -> Result<Self, RiskError> {
        Self::parse(DEFAULT_SCORING_TOML)
    }

    /// Parses a scoring config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] on malformed TOML or a missing
    /// `other` category entry.
    pub fn parse(toml_str: &str) -> Result<Self, RiskError> {
        let config: Self = toml::de::from_str(toml_str).map_err(|e| RiskError::Config {
            message: e.to_string(),
        })?;

        // Unknown categories fall back to "other", so it must exist.
        if !config.categories.contains_key("other") {
            return Err(RiskError::Config {
                message: "missing required category 'other'".to_string(),
            });
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = ScoringConfig::embedded().unwrap();
        assert_eq!(config.categories["other"], 0.20);
        assert_eq!(config.categories["domestic_violence"], 0.85);
        assert!(config.keywords.critical.contains(&"rape".to_string()));
        assert!(config.keywords.high.contains(&"attack".to_string()));
    }

    #[test]
    fn rejects_config_without_other() {
        let err = ScoringConfig::parse(
            "[categories]\nassault = 0.8\n\n[keywords]\ncritical = []\nhigh = []\nmedium = []\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("other"));
    }
}
