//! Zero-location log-normal distributions over separation distance

use crate::{Result, ScoringError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use tracing::{info, warn};

/// Fewest finite, positive samples the benign fit accepts
pub const MIN_BENIGN_SAMPLES: usize = 10;

/// Floor on the benign denominator of the likelihood ratio
pub const LR_EPSILON: f64 = 1e-12;

/// Floor on a fitted sigma when every sample is identical
const MIN_FITTED_SIGMA: f64 = 1e-9;

pub const THREAT_MU: f64 = 3.5;
pub const THREAT_SIGMA: f64 = 1.2;

/// Log-normal (mu, sigma) in log-km space, sigma > 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParams {
    pub mu: f64,
    pub sigma: f64,
}

impl DistributionParams {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        let params = Self { mu, sigma };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mu.is_finite() {
            return Err(ScoringError::Configuration(format!("mu must be finite, got {}", self.mu)));
        }
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(ScoringError::Configuration(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        Ok(())
    }

    pub fn median(&self) -> f64 {
        self.mu.exp()
    }

    pub fn mean(&self) -> f64 {
        (self.mu + 0.5 * self.sigma * self.sigma).exp()
    }

    pub fn pdf(&self, x: f64) -> f64 {
        pdf_lognormal(x, self)
    }
}

impl fmt::Display for DistributionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogNormal(mu={:.4}, sigma={:.4}, median={:.1} km, mean={:.1} km)",
            self.mu,
            self.sigma,
            self.median(),
            self.mean()
        )
    }
}

/// Expert-set threat distribution (median ≈ 33 km)
pub fn default_threat() -> DistributionParams {
    DistributionParams {
        mu: THREAT_MU,
        sigma: THREAT_SIGMA,
    }
}

/// Log-normal density; zero for x ≤ 0
pub fn pdf_lognormal(x: f64, params: &DistributionParams) -> f64 {
    if !(x > 0.0) {
        return 0.0;
    }
    let z = (x.ln() - params.mu) / params.sigma;
    (-0.5 * z * z).exp() / (x * params.sigma * (2.0 * PI).sqrt())
}

/// LR = f(x | threat) / max(f(x | benign), ε); zero for x ≤ 0
pub fn likelihood_ratio(x: f64, benign: &DistributionParams, threat: &DistributionParams) -> f64 {
    if !(x > 0.0) {
        return 0.0;
    }
    pdf_lognormal(x, threat) / pdf_lognormal(x, benign).max(LR_EPSILON)
}

/// Maximum-likelihood fit of a zero-location log-normal
///
/// Non-finite and non-positive samples are dropped first. mu is the mean of
/// ln x and sigma the population standard deviation of ln x.
pub fn fit_benign(samples: &[f64]) -> Result<DistributionParams> {
    let logs: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|x| x.is_finite() && *x > 0.0)
        .map(f64::ln)
        .collect();

    if logs.len() < MIN_BENIGN_SAMPLES {
        return Err(ScoringError::InsufficientData {
            found: logs.len(),
            required: MIN_BENIGN_SAMPLES,
        });
    }

    let n = logs.len() as f64;
    let mu = logs.iter().sum::<f64>() / n;
    let variance = logs.iter().map(|l| (l - mu).powi(2)).sum::<f64>() / n;
    let mut sigma = variance.sqrt();

    if sigma < MIN_FITTED_SIGMA {
        warn!("Benign samples are degenerate (sigma {:e}); flooring sigma", sigma);
        sigma = MIN_FITTED_SIGMA;
    }

    let params = DistributionParams { mu, sigma };
    info!("Fitted benign distribution from {} samples: {}", logs.len(), params);
    Ok(params)
}
