//! Candidate-to-constellation separation metrics
//!
//! Every candidate is compared against every protected object at each grid
//! step. Failed cells on either side are skipped, never treated as zero.

use crate::{CollisionError, Result};
use chrono::{DateTime, Utc};
use orbital_mechanics::{PropagatedTrajectory, TimeGrid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_THRESHOLD_KM: f64 = 100.0;
pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeparationConfig {
    /// Dwell threshold (km)
    pub threshold_km: f64,
    /// Candidates per parallel chunk
    pub chunk_size: usize,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            threshold_km: DEFAULT_THRESHOLD_KM,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Closest approach of one candidate to the protected constellation
#[derive(Debug, Clone, Serialize)]
pub struct ProximityMetrics {
    pub catalog_id: u64,
    /// +∞ when no step had both a valid candidate and a valid target
    pub min_separation_km: f64,
    pub hours_within_threshold: f64,
    pub propagation_failed: bool,
    pub closest_approach_at: Option<DateTime<Utc>>,
}

impl ProximityMetrics {
    pub fn failed(catalog_id: u64) -> Self {
        Self {
            catalog_id,
            min_separation_km: f64::INFINITY,
            hours_within_threshold: 0.0,
            propagation_failed: true,
            closest_approach_at: None,
        }
    }

    /// Usable as evidence: propagated and compared at least once
    pub fn has_evidence(&self) -> bool {
        !self.propagation_failed && self.min_separation_km.is_finite()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SeparationAnalyzer {
    config: SeparationConfig,
}

impl Default for SeparationAnalyzer {
    fn default() -> Self {
        Self {
            config: SeparationConfig::default(),
        }
    }
}

impl SeparationAnalyzer {
    pub fn new(config: SeparationConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(CollisionError::InvalidParameter(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if !(config.threshold_km > 0.0) {
            return Err(CollisionError::InvalidParameter(format!(
                "threshold must be positive, got {}",
                config.threshold_km
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SeparationConfig {
        &self.config
    }

    /// Metrics for each candidate, in candidate order
    pub fn analyze(
        &self,
        candidates: &[PropagatedTrajectory],
        targets: &[PropagatedTrajectory],
        grid: &TimeGrid,
    ) -> Result<Vec<ProximityMetrics>> {
        for trajectory in candidates.iter().chain(targets) {
            if trajectory.len() != grid.len() {
                return Err(CollisionError::GridMismatch {
                    catalog_id: trajectory.catalog_id,
                    expected: grid.len(),
                    found: trajectory.len(),
                });
            }
        }

        debug!(
            "Screening {} candidates against {} targets in chunks of {}",
            candidates.len(),
            targets.len(),
            self.config.chunk_size
        );

        let metrics: Vec<ProximityMetrics> = candidates
            .par_chunks(self.config.chunk_size)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|candidate| self.analyze_one(candidate, targets, grid))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        let failed = metrics.iter().filter(|m| m.propagation_failed).count();
        info!(
            "Separation metrics for {} candidates ({} propagation failures)",
            metrics.len(),
            failed
        );
        Ok(metrics)
    }

    fn analyze_one(
        &self,
        candidate: &PropagatedTrajectory,
        targets: &[PropagatedTrajectory],
        grid: &TimeGrid,
    ) -> ProximityMetrics {
        if candidate.is_fully_failed() {
            return ProximityMetrics::failed(candidate.catalog_id);
        }

        let mut min_separation = f64::INFINITY;
        let mut closest_step = None;
        let mut steps_within = 0usize;

        for (step, sample) in candidate.samples.iter().enumerate() {
            let Some(position) = sample.position() else {
                continue;
            };

            let step_min = targets
                .iter()
                .filter_map(|target| target.position(step))
                .map(|target| (position - target).norm())
                .fold(f64::INFINITY, f64::min);

            if step_min < self.config.threshold_km {
                steps_within += 1;
            }
            if step_min < min_separation {
                min_separation = step_min;
                closest_step = Some(step);
            }
        }

        ProximityMetrics {
            catalog_id: candidate.catalog_id,
            min_separation_km: min_separation,
            hours_within_threshold: steps_within as f64 * grid.cadence_hours(),
            propagation_failed: false,
            closest_approach_at: closest_step.and_then(|step| grid.get(step)),
        }
    }
}
