//! Assessment output

use crate::distributions::DistributionParams;
use crate::similarity::SimilarityScore;
use crate::{Result, ThreatScore};
use chrono::{DateTime, Utc};
use orbital_mechanics::SatelliteIdentity;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Everything one run produces
#[derive(Debug, Clone, Serialize)]
pub struct ThreatAssessment {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub grid_steps: usize,
    pub protected: Vec<SatelliteIdentity>,
    pub rejected_records: usize,
    pub benign_sample_size: usize,
    pub benign: DistributionParams,
    pub threat: DistributionParams,
    /// Highest posterior first
    pub scores: Vec<ThreatScore>,
    pub similarity: Vec<SimilarityScore>,
}

impl ThreatAssessment {
    pub fn candidates_assessed(&self) -> usize {
        self.scores.len()
    }

    pub fn propagation_failures(&self) -> usize {
        self.scores.iter().filter(|s| s.propagation_failed()).count()
    }

    pub fn top(&self, n: usize) -> &[ThreatScore] {
        &self.scores[..n.min(self.scores.len())]
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Writing assessment to {:?}", path);
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn log_summary(&self, top_n: usize) {
        info!("{}", "=".repeat(60));
        info!("ASSESSMENT SUMMARY");
        info!("{}", "=".repeat(60));
        info!(
            "Window:                 {} .. {} ({} steps)",
            self.window_start, self.window_end, self.grid_steps
        );
        info!("Protected satellites:   {}", self.protected.len());
        info!("Satellites assessed:    {}", self.candidates_assessed());
        info!("Propagation failures:   {} (posterior = prior)", self.propagation_failures());
        info!("Benign sample size:     {}", self.benign_sample_size);
        info!("Benign distribution:    {}", self.benign);
        info!("Threat distribution:    {}", self.threat);
        info!("Shadowing pairs:        {}", self.similarity.len());

        info!("Top {} candidates by posterior:", top_n);
        for (rank, s) in self.top(top_n).iter().enumerate() {
            let separation = if s.min_separation_km().is_finite() {
                format!("{:.1} km", s.min_separation_km())
            } else {
                "N/A".to_string()
            };
            let flag = if s.propagation_failed() { " [FAILED]" } else { "" };
            let name: String = s.name.chars().take(25).collect();
            info!(
                "  {:>3}. {:>6} | {:25} | {:4} | sep={:>12} | posterior={:.4}{}",
                rank + 1,
                s.catalog_id,
                name,
                s.country_code,
                separation,
                s.posterior,
                flag
            );
        }
    }
}
