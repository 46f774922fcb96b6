//! Bayesian update from minimum separation

use crate::distributions::{likelihood_ratio, DistributionParams};
use crate::policy::{ClassificationPolicy, PriorPolicy};
use crate::ThreatScore;
use collision_avoidance::ProximityMetrics;
use orbital_mechanics::{RcsSize, SatelliteIdentity};
use tracing::{debug, info};

/// posterior = LR·p / (LR·p + 1 − p), clamped to [0, 1]
///
/// p ≤ 0 gives 0 and p ≥ 1 gives 1 whatever the evidence. An infinite
/// likelihood ratio gives 1 for any p in (0, 1).
pub fn compute_posterior(prior: f64, lr: f64) -> f64 {
    if prior <= 0.0 {
        return 0.0;
    }
    if prior >= 1.0 {
        return 1.0;
    }
    if lr.is_infinite() {
        return 1.0;
    }

    let numerator = lr * prior;
    let denominator = numerator + (1.0 - prior);
    if denominator <= 0.0 {
        return 0.0;
    }
    (numerator / denominator).clamp(0.0, 1.0)
}

/// Prior, likelihood ratio and posterior for one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    pub prior: f64,
    pub likelihood_ratio: f64,
    pub posterior: f64,
}

#[derive(Debug, Clone)]
pub struct BayesianScorer {
    benign: DistributionParams,
    threat: DistributionParams,
    classification: ClassificationPolicy,
    priors: PriorPolicy,
}

impl BayesianScorer {
    pub fn new(
        benign: DistributionParams,
        threat: DistributionParams,
        classification: ClassificationPolicy,
        priors: PriorPolicy,
    ) -> Self {
        Self {
            benign,
            threat,
            classification,
            priors,
        }
    }

    pub fn benign(&self) -> &DistributionParams {
        &self.benign
    }

    pub fn threat(&self) -> &DistributionParams {
        &self.threat
    }

    pub fn prior(&self, country_code: &str, rcs_size: RcsSize) -> f64 {
        self.priors
            .prior(self.classification.classify(country_code), rcs_size)
    }

    /// Score one minimum separation
    ///
    /// A separation that is not finite carries no evidence: LR is 1 and the
    /// posterior is the prior unchanged.
    pub fn score_separation(
        &self,
        min_separation_km: f64,
        country_code: &str,
        rcs_size: RcsSize,
    ) -> Evidence {
        let prior = self.prior(country_code, rcs_size);
        if !min_separation_km.is_finite() {
            return Self::no_evidence(prior);
        }

        let lr = likelihood_ratio(min_separation_km, &self.benign, &self.threat);
        Evidence {
            prior,
            likelihood_ratio: lr,
            posterior: compute_posterior(prior, lr),
        }
    }

    fn no_evidence(prior: f64) -> Evidence {
        Evidence {
            prior,
            likelihood_ratio: 1.0,
            posterior: prior,
        }
    }

    pub fn score(&self, identity: &SatelliteIdentity, metrics: ProximityMetrics) -> ThreatScore {
        let evidence = if metrics.propagation_failed {
            Self::no_evidence(self.prior(&identity.country_code, identity.rcs_size))
        } else {
            self.score_separation(
                metrics.min_separation_km,
                &identity.country_code,
                identity.rcs_size,
            )
        };

        debug!(
            "Scored {} ({}): sep {:.1} km, prior {:.4}, LR {:.4}, posterior {:.4}",
            identity.catalog_id,
            identity.name,
            metrics.min_separation_km,
            evidence.prior,
            evidence.likelihood_ratio,
            evidence.posterior
        );

        ThreatScore {
            catalog_id: identity.catalog_id,
            name: identity.name.clone(),
            country_code: identity.country_code.clone(),
            rcs_size: identity.rcs_size,
            proximity: metrics,
            prior: evidence.prior,
            likelihood_ratio: evidence.likelihood_ratio,
            posterior: evidence.posterior,
        }
    }

    /// Score every candidate, highest posterior first
    pub fn score_all<'a, I>(&self, candidates: I) -> Vec<ThreatScore>
    where
        I: IntoIterator<Item = (&'a SatelliteIdentity, ProximityMetrics)>,
    {
        let mut scores: Vec<ThreatScore> = candidates
            .into_iter()
            .map(|(identity, metrics)| self.score(identity, metrics))
            .collect();

        scores.sort_by(|a, b| b.posterior.total_cmp(&a.posterior));

        match scores.first() {
            Some(top) => info!(
                "Scored {} candidates. Top posterior: {:.4} ({})",
                scores.len(),
                top.posterior,
                top.catalog_id
            ),
            None => info!("Scored 0 candidates"),
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::default_threat;
    use fuzz_harness::generators::{likelihood_ratio as lr_strategy, prior as prior_strategy};
    use orbital_mechanics::ObjectType;
    use proptest::prelude::*;

    fn scorer() -> BayesianScorer {
        BayesianScorer::new(
            DistributionParams::new(5.063, 1.369).unwrap(),
            default_threat(),
            ClassificationPolicy::new(["PRC", "CIS"], ["US", "UK", "JPN", "ESA", "FR"]),
            PriorPolicy {
                adversarial_prior: 0.05,
                default_prior: 0.005,
                small_rcs_multiplier: 1.5,
            },
        )
    }

    fn identity(catalog_id: u64, country: &str, rcs: RcsSize) -> SatelliteIdentity {
        SatelliteIdentity {
            catalog_id,
            name: format!("OBJ-{}", catalog_id),
            country_code: country.to_string(),
            rcs_size: rcs,
            object_type: ObjectType::Payload,
        }
    }

    fn metrics(catalog_id: u64, min_separation_km: f64) -> ProximityMetrics {
        ProximityMetrics {
            catalog_id,
            min_separation_km,
            hours_within_threshold: 0.0,
            propagation_failed: false,
            closest_approach_at: None,
        }
    }

    #[test]
    fn test_posterior_edges() {
        assert_eq!(compute_posterior(0.0, 5.0), 0.0);
        assert_eq!(compute_posterior(-0.1, 5.0), 0.0);
        assert_eq!(compute_posterior(1.0, 0.0), 1.0);
        assert_eq!(compute_posterior(0.3, f64::INFINITY), 1.0);
        assert_eq!(compute_posterior(0.3, 0.0), 0.0);
        assert!((compute_posterior(0.2, 1.0) - 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_close_approach_raises_posterior() {
        let evidence = scorer().score_separation(33.0, "PRC", RcsSize::Medium);
        assert_eq!(evidence.prior, 0.05);
        assert!(evidence.likelihood_ratio > 1.0);
        assert!(evidence.posterior > 0.05);
    }

    #[test]
    fn test_distant_object_lowers_posterior() {
        let evidence = scorer().score_separation(10_000.0, "PRC", RcsSize::Medium);
        assert!(evidence.likelihood_ratio < 1.0);
        assert!(evidence.posterior < 0.05);
    }

    #[test]
    fn test_failed_propagation_keeps_prior_exactly() {
        let id = identity(7, "CIS", RcsSize::Small);
        let score = scorer().score(&id, ProximityMetrics::failed(7));
        assert_eq!(score.likelihood_ratio, 1.0);
        assert_eq!(score.posterior.to_bits(), score.prior.to_bits());
        assert!((score.prior - 0.075).abs() < 1e-15);
        assert!(score.propagation_failed());
    }

    #[test]
    fn test_no_comparison_is_no_evidence() {
        let id = identity(8, "PRC", RcsSize::Large);
        let score = scorer().score(&id, metrics(8, f64::INFINITY));
        assert_eq!(score.likelihood_ratio, 1.0);
        assert_eq!(score.posterior, score.prior);
    }

    #[test]
    fn test_score_all_sorted_descending() {
        let ids = [
            identity(1, "PRC", RcsSize::Medium),
            identity(2, "PRC", RcsSize::Medium),
            identity(3, "CIS", RcsSize::Small),
        ];
        let observations = vec![
            (&ids[0], metrics(1, 10_000.0)),
            (&ids[1], metrics(2, 30.0)),
            (&ids[2], ProximityMetrics::failed(3)),
        ];
        let scores = scorer().score_all(observations);
        let order: Vec<u64> = scores.iter().map(|s| s.catalog_id).collect();
        assert_eq!(order, vec![2, 3, 1]);
        for pair in scores.windows(2) {
            assert!(pair[0].posterior >= pair[1].posterior);
        }
    }

    proptest! {
        #[test]
        fn test_posterior_in_unit_interval(p in prior_strategy(), lr in lr_strategy()) {
            let posterior = compute_posterior(p, lr);
            prop_assert!((0.0..=1.0).contains(&posterior));
        }

        #[test]
        fn test_unit_lr_is_identity(p in prior_strategy()) {
            prop_assert!((compute_posterior(p, 1.0) - p).abs() < 1e-12);
        }
    }
}
