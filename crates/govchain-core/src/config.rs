//! Engine configuration, loadable from JSON. Missing fields take defaults.

use crate::metrics::MetricsSnapshot;
use crate::tabulator::TieBreak;
use crate::triggers::TriggerThresholds;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read failed {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Longest span, in days, a term or tenure may cover.
pub const MAX_SPAN_DAYS: i64 = 100 * 365;

fn span(days: i64) -> Duration {
    Duration::try_days(days.clamp(0, MAX_SPAN_DAYS)).unwrap_or_else(Duration::zero)
}

/// The office and holder the ledger's genesis block establishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub office: String,
    pub holder_id: String,
    pub holder_name: String,
    pub holder_public_key: String,
    /// How far into the term the genesis holder already is.
    pub tenure_elapsed_days: i64,
    pub initial_metrics: MetricsSnapshot,
}

impl GenesisConfig {
    pub fn tenure_elapsed(&self) -> Duration {
        span(self.tenure_elapsed_days)
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            office: "Governor".into(),
            holder_id: "official_001".into(),
            holder_name: "Sarah Chen".into(),
            holder_public_key: "0x7a9f3e2d1c4b8a6f5e3d2c1b9a8f7e6d5c4b3a2f1e0d9c8b7a6f5e4d3c2b1a0".into(),
            tenure_elapsed_days: 365,
            initial_metrics: MetricsSnapshot {
                gdp: 100.0,
                education_ranking: 15,
                approval_rating: 55.0,
                unemployment_rate: 4.2,
                infrastructure_score: 72.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    pub genesis: GenesisConfig,
    pub thresholds: TriggerThresholds,
    pub term_length_days: i64,
    /// Approval rating every new term starts from.
    pub fresh_approval_rating: f64,
    /// Concluded elections kept per office.
    pub completed_history_capacity: usize,
    pub tie_break: TieBreak,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            genesis: GenesisConfig::default(),
            thresholds: TriggerThresholds::default(),
            term_length_days: 4 * 365,
            fresh_approval_rating: 55.0,
            completed_history_capacity: 5,
            tie_break: TieBreak::default(),
        }
    }
}

impl GovernanceConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SPAN_DAYS).contains(&self.term_length_days) {
            return Err(ConfigError::Invalid(format!(
                "term_length_days must be in 1..={MAX_SPAN_DAYS}, got {}",
                self.term_length_days
            )));
        }
        if !(0..=MAX_SPAN_DAYS).contains(&self.genesis.tenure_elapsed_days) {
            return Err(ConfigError::Invalid(format!(
                "genesis.tenure_elapsed_days must be in 0..={MAX_SPAN_DAYS}, got {}",
                self.genesis.tenure_elapsed_days
            )));
        }
        if self.completed_history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "completed_history_capacity must be at least 1".into(),
            ));
        }
        if !self.fresh_approval_rating.is_finite() {
            return Err(ConfigError::Invalid("fresh_approval_rating must be finite".into()));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Term length, clamped to `0..=MAX_SPAN_DAYS` days.
    pub fn term_length(&self) -> Duration {
        span(self.term_length_days)
    }
}
