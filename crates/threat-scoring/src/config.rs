//! Assessment configuration
//!
//! Loaded from JSON. Window, sampling and batching values default to the
//! reference configuration; the classification and prior policies have no
//! defaults and must be present in the file.

use crate::distributions::{default_threat, DistributionParams};
use crate::policy::{ClassificationPolicy, PriorPolicy};
use crate::similarity::SimilarityConfig;
use crate::{Result, ScoringError};
use collision_avoidance::SeparationConfig;
use orbital_mechanics::propagation::DEFAULT_BATCH_SIZE;
use orbital_mechanics::MAX_GRID_STEPS;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatConfig {
    /// Propagation window length (default: 30 days)
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Grid cadence (default: 10 minutes)
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    /// Dwell threshold (default: 100 km)
    #[serde(default = "default_threshold_km")]
    pub threshold_km: f64,
    /// Element sets per propagation batch (default: 200)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Candidates per separation chunk (default: 100)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Catalog ids of the protected constellation
    #[serde(default)]
    pub protected_ids: Vec<u64>,
    /// Fewest protected satellites that must be found (default: 2)
    #[serde(default = "default_min_protected")]
    pub min_protected: usize,

    /// Benign calibration sample size (default: 500)
    #[serde(default = "default_benign_sample_size")]
    pub benign_sample_size: usize,
    /// Seed for the benign sample (default: 42)
    #[serde(default = "default_sample_seed")]
    pub sample_seed: u64,

    pub classification: ClassificationPolicy,
    pub priors: PriorPolicy,

    /// Threat separation distribution (default: mu 3.5, sigma 1.2)
    #[serde(default = "default_threat")]
    pub threat: DistributionParams,
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

const MINUTES_PER_DAY: u64 = 1440;

fn default_window_days() -> u32 {
    30
}

fn default_interval_minutes() -> u32 {
    10
}

fn default_threshold_km() -> f64 {
    collision_avoidance::separation::DEFAULT_THRESHOLD_KM
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_chunk_size() -> usize {
    collision_avoidance::separation::DEFAULT_CHUNK_SIZE
}

fn default_min_protected() -> usize {
    2
}

fn default_benign_sample_size() -> usize {
    500
}

fn default_sample_seed() -> u64 {
    42
}

impl ThreatConfig {
    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_days == 0 {
            return Err(ScoringError::Configuration("window_days must be positive".to_string()));
        }
        if self.interval_minutes == 0 {
            return Err(ScoringError::Configuration(
                "interval_minutes must be positive".to_string(),
            ));
        }
        let steps = self.window_days as u64 * MINUTES_PER_DAY / self.interval_minutes as u64;
        if steps > MAX_GRID_STEPS as u64 {
            return Err(ScoringError::Configuration(format!(
                "{} days at {} minutes is {} grid steps, limit is {}",
                self.window_days, self.interval_minutes, steps, MAX_GRID_STEPS
            )));
        }
        if !(self.threshold_km > 0.0) {
            return Err(ScoringError::Configuration(format!(
                "threshold_km must be positive, got {}",
                self.threshold_km
            )));
        }
        if self.batch_size == 0 || self.chunk_size == 0 {
            return Err(ScoringError::Configuration(
                "batch_size and chunk_size must be at least 1".to_string(),
            ));
        }
        if self.protected_ids.is_empty() {
            return Err(ScoringError::Configuration(
                "no protected constellation configured".to_string(),
            ));
        }
        if self.protected_ids.len() < self.min_protected {
            return Err(ScoringError::Configuration(format!(
                "{} protected ids configured, need at least {}",
                self.protected_ids.len(),
                self.min_protected
            )));
        }
        if self.benign_sample_size == 0 {
            return Err(ScoringError::Configuration(
                "benign_sample_size must be at least 1".to_string(),
            ));
        }

        self.classification.validate()?;
        self.priors.validate()?;
        self.threat.validate()?;
        self.similarity.validate()?;
        Ok(())
    }

    pub fn separation(&self) -> SeparationConfig {
        SeparationConfig {
            threshold_km: self.threshold_km,
            chunk_size: self.chunk_size,
        }
    }
}
