use govchain_core::config::MAX_SPAN_DAYS;
use govchain_core::CandidateProfile;
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
    #[error("invalid simulation config: {0}")]
    Invalid(String),
}

/// Symmetric random walk clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Walk {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Integer walk; a tick moves by `down..=up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankWalk {
    pub min: i32,
    pub max: i32,
    pub down: i32,
    pub up: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftBounds {
    pub gdp: Walk,
    pub education_ranking: RankWalk,
    pub approval_rating: Walk,
    pub unemployment_rate: Walk,
    pub infrastructure_score: Walk,
}

impl Default for DriftBounds {
    fn default() -> Self {
        Self {
            gdp: Walk {
                min: 85.0,
                max: 115.0,
                step: 1.5,
            },
            education_ranking: RankWalk {
                min: 5,
                max: 50,
                down: -2,
                up: 1,
            },
            approval_rating: Walk {
                min: 25.0,
                max: 85.0,
                step: 4.0,
            },
            unemployment_rate: Walk {
                min: 2.0,
                max: 10.0,
                step: 0.25,
            },
            infrastructure_score: Walk {
                min: 60.0,
                max: 95.0,
                step: 2.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub office: String,
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
    /// Simulated days that pass per tick.
    pub days_per_tick: i64,
    /// Registered when an election reaches voting with no candidates.
    pub mock_candidates: Vec<CandidateProfile>,
    /// Ballots synthesized before tallying.
    pub mock_ballots: usize,
    pub drift: DriftBounds,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            office: "Governor".into(),
            seed: None,
            days_per_tick: 30,
            mock_candidates: vec![
                CandidateProfile {
                    id: "candidate_001".into(),
                    name: "Marcus Thompson".into(),
                    public_key: "0x3f7e8d2c9b1a4f6e5d3c2b1a9f8e7d6c5b4a3f2e1d0c9b8a7f6e5d4c3b2a1f0".into(),
                    platform: "Economic Recovery & Infrastructure".into(),
                },
                CandidateProfile {
                    id: "candidate_002".into(),
                    name: "Elena Rodriguez".into(),
                    public_key: "0x1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2".into(),
                    platform: "Education Reform & Innovation".into(),
                },
                CandidateProfile {
                    id: "candidate_003".into(),
                    name: "James Washington".into(),
                    public_key: "0x9f8e7d6c5b4a3f2e1d0c9b8a7f6e5d4c3b2a1f0e9d8c7b6a5f4e3d2c1b0a9f8".into(),
                    platform: "Job Creation & Social Programs".into(),
                },
            ],
            mock_ballots: 25,
            drift: DriftBounds::default(),
        }
    }
}

impl Walk {
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.step.is_finite()) {
            return Err(ConfigError::Invalid(format!("drift.{field} must be finite")));
        }
        if self.min > self.max || self.step < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "drift.{field} needs min <= max and step >= 0, got {:?}",
                self
            )));
        }
        Ok(())
    }
}

impl RankWalk {
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.min > self.max || self.down > self.up {
            return Err(ConfigError::Invalid(format!(
                "drift.{field} needs min <= max and down <= up, got {:?}",
                self
            )));
        }
        Ok(())
    }
}

impl DriftBounds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gdp.validate("gdp")?;
        self.education_ranking.validate("education_ranking")?;
        self.approval_rating.validate("approval_rating")?;
        self.unemployment_rate.validate("unemployment_rate")?;
        self.infrastructure_score.validate("infrastructure_score")
    }
}

impl SimulationConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SPAN_DAYS).contains(&self.days_per_tick) {
            return Err(ConfigError::Invalid(format!(
                "days_per_tick must be in 1..={MAX_SPAN_DAYS}, got {}",
                self.days_per_tick
            )));
        }
        self.drift.validate()
    }
}
