//! Proximity Threat Scoring
//!
//! Scores how likely it is that a satellite is positioning itself against a
//! protected constellation, from the minimum separation it reaches over a
//! rolling propagation window.
//!
//! # Scoring Model
//!
//! ```text
//! LR        = f(x | threat) / max(f(x | benign), 1e-12)
//! posterior = LR·p / (LR·p + 1 − p)
//! ```
//!
//! | Term   | Source |
//! |--------|--------|
//! | x      | minimum separation to any protected satellite (km) |
//! | benign | log-normal fitted to a seeded sample of benign-country satellites |
//! | threat | configured log-normal (default mu = 3.5, sigma = 1.2, median ≈ 33 km) |
//! | p      | prior from country class and RCS size |
//!
//! A second scorer applies the same update to an orbital divergence metric
//! to flag co-orbital shadowing.

use collision_avoidance::ProximityMetrics;
use orbital_mechanics::RcsSize;
use serde::Serialize;
use thiserror::Error;

pub mod bayes;
pub mod config;
pub mod distributions;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod similarity;
pub mod source;

pub use bayes::{compute_posterior, BayesianScorer};
pub use config::ThreatConfig;
pub use distributions::{fit_benign, DistributionParams};
pub use pipeline::ThreatPipeline;
pub use policy::{ClassificationPolicy, CountryClass, PriorPolicy};
pub use report::ThreatAssessment;
pub use similarity::{ShadowingPattern, SimilarityConfig, SimilarityScore, SimilarityScorer};
pub use source::{DataSource, InMemorySource, JsonFileSource};

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Insufficient data: {found} valid samples, need at least {required}")]
    InsufficientData { found: usize, required: usize },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("No adversarial candidates to assess")]
    NoCandidates,
    #[error(transparent)]
    Orbital(#[from] orbital_mechanics::OrbitalError),
    #[error(transparent)]
    Collision(#[from] collision_avoidance::CollisionError),
}

pub type Result<T> = std::result::Result<T, ScoringError>;

/// Bayesian threat score for one candidate
#[derive(Debug, Clone, Serialize)]
pub struct ThreatScore {
    pub catalog_id: u64,
    pub name: String,
    pub country_code: String,
    pub rcs_size: RcsSize,
    pub proximity: ProximityMetrics,
    /// P(threat) before evidence, in (0, 1]
    pub prior: f64,
    pub likelihood_ratio: f64,
    /// P(threat | min separation), in [0, 1]
    pub posterior: f64,
}

impl ThreatScore {
    pub fn propagation_failed(&self) -> bool {
        self.proximity.propagation_failed
    }

    pub fn min_separation_km(&self) -> f64 {
        self.proximity.min_separation_km
    }
}
