//! Orbital similarity ("shadowing") scoring
//!
//! Flags foreign objects that mirror the orbital plane of a protected asset.
//!
//! ```text
//! d = sqrt((Δinc / 90)² + (Δalt / 500)²)
//! ```
//!
//! Lower divergence means more similar orbits. The divergence goes through
//! the same Bayesian update as separation distance, with its own pair of
//! log-normal distributions.

use crate::bayes::compute_posterior;
use crate::distributions::{likelihood_ratio as lognormal_lr, DistributionParams};
use crate::policy::{ClassificationPolicy, PriorPolicy};
use crate::Result;
use orbital_mechanics::OrbitalElementSet;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Inclination normalisation (deg)
const INCLINATION_SCALE_DEG: f64 = 90.0;
/// Altitude normalisation (km)
const ALTITUDE_SCALE_KM: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Divergence of unrelated pairs (default: mu 0.2, sigma 0.6)
    #[serde(default = "default_benign")]
    pub benign: DistributionParams,
    /// Divergence of shadowing pairs (default: mu -3.0, sigma 0.8)
    #[serde(default = "default_threat")]
    pub threat: DistributionParams,
    /// Divergence below this is flagged as suspiciously similar (default: 0.15)
    #[serde(default = "default_flag_threshold")]
    pub flag_threshold: f64,
    /// Pairs diverging more than this are not reported (default: 0.8)
    #[serde(default = "default_report_ceiling")]
    pub report_ceiling: f64,
}

fn default_benign() -> DistributionParams {
    DistributionParams { mu: 0.2, sigma: 0.6 }
}

fn default_threat() -> DistributionParams {
    DistributionParams { mu: -3.0, sigma: 0.8 }
}

fn default_flag_threshold() -> f64 {
    0.15
}

fn default_report_ceiling() -> f64 {
    0.8
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            benign: default_benign(),
            threat: default_threat(),
            flag_threshold: default_flag_threshold(),
            report_ceiling: default_report_ceiling(),
        }
    }
}

impl SimilarityConfig {
    pub fn validate(&self) -> Result<()> {
        self.benign.validate()?;
        self.threat.validate()?;
        if !(self.flag_threshold >= 0.0 && self.report_ceiling > 0.0) {
            return Err(crate::ScoringError::Configuration(format!(
                "similarity thresholds must be positive (flag {}, ceiling {})",
                self.flag_threshold, self.report_ceiling
            )));
        }
        Ok(())
    }
}

/// Normalised orbital divergence; 0 for identical inclination and altitude
pub fn orbital_divergence(
    altitude_km_a: f64,
    inclination_deg_a: f64,
    altitude_km_b: f64,
    inclination_deg_b: f64,
) -> f64 {
    let d_inc = (inclination_deg_a - inclination_deg_b).abs() / INCLINATION_SCALE_DEG;
    let d_alt = (altitude_km_a - altitude_km_b).abs() / ALTITUDE_SCALE_KM;
    (d_inc * d_inc + d_alt * d_alt).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShadowingPattern {
    CoPlanar,
    CoAltitude,
    CoInclination,
    Shadowing,
}

impl ShadowingPattern {
    pub fn classify(inclination_diff_deg: f64, altitude_diff_km: f64) -> Self {
        if inclination_diff_deg < 2.0 && altitude_diff_km < 20.0 {
            Self::CoPlanar
        } else if altitude_diff_km < 30.0 {
            Self::CoAltitude
        } else if inclination_diff_deg < 5.0 {
            Self::CoInclination
        } else {
            Self::Shadowing
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Threatened,
    Watched,
    Nominal,
}

impl Severity {
    pub fn from_posterior(posterior: f64) -> Self {
        if posterior > 0.3 {
            Self::Threatened
        } else if posterior > 0.1 {
            Self::Watched
        } else {
            Self::Nominal
        }
    }
}

/// Shadowing assessment of one foreign object against one protected asset
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityScore {
    pub candidate_id: u64,
    pub candidate_name: String,
    pub target_id: u64,
    pub target_name: String,
    pub inclination_diff_deg: f64,
    pub altitude_diff_km: f64,
    pub divergence: f64,
    pub prior: f64,
    pub likelihood_ratio: f64,
    pub posterior: f64,
    pub pattern: ShadowingPattern,
    pub severity: Severity,
    /// Divergence under the flag threshold
    pub flagged: bool,
}

#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    config: SimilarityConfig,
    classification: ClassificationPolicy,
    priors: PriorPolicy,
}

impl SimilarityScorer {
    pub fn new(
        config: SimilarityConfig,
        classification: ClassificationPolicy,
        priors: PriorPolicy,
    ) -> Self {
        Self {
            config,
            classification,
            priors,
        }
    }

    /// LR for a divergence; +∞ for identical orbits
    pub fn likelihood_ratio(&self, divergence: f64) -> f64 {
        if divergence <= 0.0 {
            return f64::INFINITY;
        }
        lognormal_lr(divergence, &self.config.benign, &self.config.threat)
    }

    pub fn score_pair(
        &self,
        candidate: &OrbitalElementSet,
        target: &OrbitalElementSet,
    ) -> SimilarityScore {
        let altitude_a = candidate.mean_altitude_km();
        let altitude_b = target.mean_altitude_km();
        let divergence = orbital_divergence(
            altitude_a,
            candidate.inclination_deg(),
            altitude_b,
            target.inclination_deg(),
        );

        let prior = self.priors.prior(
            self.classification.classify(candidate.country_code()),
            candidate.rcs_size(),
        );
        let lr = self.likelihood_ratio(divergence);
        let posterior = compute_posterior(prior, lr);

        let inclination_diff_deg = (candidate.inclination_deg() - target.inclination_deg()).abs();
        let altitude_diff_km = (altitude_a - altitude_b).abs();

        SimilarityScore {
            candidate_id: candidate.catalog_id(),
            candidate_name: candidate.name().to_string(),
            target_id: target.catalog_id(),
            target_name: target.name().to_string(),
            inclination_diff_deg,
            altitude_diff_km,
            divergence,
            prior,
            likelihood_ratio: lr,
            posterior,
            pattern: ShadowingPattern::classify(inclination_diff_deg, altitude_diff_km),
            severity: Severity::from_posterior(posterior),
            flagged: divergence < self.config.flag_threshold,
        }
    }

    /// Every candidate/target pair inside the report ceiling, most severe first
    pub fn screen(
        &self,
        candidates: &[OrbitalElementSet],
        targets: &[OrbitalElementSet],
    ) -> Vec<SimilarityScore> {
        let mut scores: Vec<SimilarityScore> = candidates
            .iter()
            .flat_map(|candidate| targets.iter().map(move |target| (candidate, target)))
            .filter(|(candidate, target)| candidate.catalog_id() != target.catalog_id())
            .map(|(candidate, target)| self.score_pair(candidate, target))
            .filter(|score| score.divergence <= self.config.report_ceiling)
            .collect();

        scores.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then(a.divergence.total_cmp(&b.divergence))
        });

        let flagged = scores.iter().filter(|s| s.flagged).count();
        info!(
            "Orbital similarity: {} pairs reported, {} flagged",
            scores.len(),
            flagged
        );
        scores
    }
}
