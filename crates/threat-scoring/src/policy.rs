//! Country classification and prior policy
//!
//! Both policies are plain values loaded from configuration and passed
//! explicitly. Neither carries built-in country lists or prior values.
//!
//! # Prior
//!
//! ```text
//! p = adversarial_prior  if country ∈ adversarial
//!     default_prior      otherwise
//! p = min(p · small_rcs_multiplier, 1)  if RCS = SMALL
//! ```

use crate::{Result, ScoringError};
use orbital_mechanics::RcsSize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountryClass {
    Adversarial,
    Benign,
    /// In neither set: never scored, never used for calibration
    Unclassified,
}

/// Injected country sets, keyed by catalog country/owner code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationPolicy {
    pub adversarial: BTreeSet<String>,
    pub benign: BTreeSet<String>,
}

impl ClassificationPolicy {
    pub fn new<A, B, S>(adversarial: A, benign: B) -> Self
    where
        A: IntoIterator<Item = S>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            adversarial: adversarial.into_iter().map(Into::into).collect(),
            benign: benign.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classify(&self, country_code: &str) -> CountryClass {
        let code = country_code.trim();
        if self.adversarial.contains(code) {
            CountryClass::Adversarial
        } else if self.benign.contains(code) {
            CountryClass::Benign
        } else {
            CountryClass::Unclassified
        }
    }

    pub fn is_adversarial(&self, country_code: &str) -> bool {
        self.classify(country_code) == CountryClass::Adversarial
    }

    pub fn validate(&self) -> Result<()> {
        if self.adversarial.is_empty() {
            return Err(ScoringError::Configuration(
                "adversarial country set is empty".to_string(),
            ));
        }
        if let Some(code) = self.adversarial.intersection(&self.benign).next() {
            return Err(ScoringError::Configuration(format!(
                "country {} is both adversarial and benign",
                code
            )));
        }
        Ok(())
    }
}

/// Base priors and the small-RCS adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorPolicy {
    /// Prior for adversarial-country objects
    pub adversarial_prior: f64,
    /// Prior for every other object
    pub default_prior: f64,
    /// Applied to SMALL RCS objects (1.5 in the reference configuration)
    pub small_rcs_multiplier: f64,
}

impl PriorPolicy {
    pub fn prior(&self, class: CountryClass, rcs_size: RcsSize) -> f64 {
        let base = match class {
            CountryClass::Adversarial => self.adversarial_prior,
            CountryClass::Benign | CountryClass::Unclassified => self.default_prior,
        };
        match rcs_size {
            RcsSize::Small => (base * self.small_rcs_multiplier).min(1.0),
            _ => base,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("adversarial_prior", self.adversarial_prior),
            ("default_prior", self.default_prior),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ScoringError::Configuration(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(self.small_rcs_multiplier > 0.0 && self.small_rcs_multiplier.is_finite()) {
            return Err(ScoringError::Configuration(format!(
                "small_rcs_multiplier must be positive, got {}",
                self.small_rcs_multiplier
            )));
        }
        Ok(())
    }
}
