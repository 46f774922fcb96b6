//! End-to-end assessment
//!
//! records → parse → {protected, candidates, benign sample} → propagate on
//! the window grid → separation metrics → benign fit → Bayesian scores.
//!
//! Configuration problems (unknown protected ids, too few benign objects)
//! surface before any propagation starts.

use crate::bayes::BayesianScorer;
use crate::config::ThreatConfig;
use crate::distributions::{fit_benign, MIN_BENIGN_SAMPLES};
use crate::policy::CountryClass;
use crate::report::ThreatAssessment;
use crate::similarity::SimilarityScorer;
use crate::source::DataSource;
use crate::{Result, ScoringError};
use chrono::{DateTime, Utc};
use collision_avoidance::SeparationAnalyzer;
use orbital_mechanics::{parse_records, OrbitalElementSet, Propagator, TimeGrid};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use tracing::{info, warn};

/// Scoring population after removing the protected constellation
#[derive(Debug, Clone, Default)]
pub struct PopulationSplit {
    /// Adversarial-country objects to score
    pub candidates: Vec<OrbitalElementSet>,
    /// Seeded random sample of benign-country objects, ordered by catalog id
    pub benign_sample: Vec<OrbitalElementSet>,
}

#[derive(Debug, Clone)]
pub struct ThreatPipeline {
    config: ThreatConfig,
}

impl ThreatPipeline {
    pub fn new(config: ThreatConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ThreatConfig {
        &self.config
    }

    /// Protected satellites in configured order
    pub fn select_targets(&self, elements: &[OrbitalElementSet]) -> Result<Vec<OrbitalElementSet>> {
        let mut targets = Vec::with_capacity(self.config.protected_ids.len());
        for id in &self.config.protected_ids {
            match elements.iter().find(|e| e.catalog_id() == *id) {
                Some(set) => targets.push(set.clone()),
                None => warn!("Protected satellite {} not found in element data", id),
            }
        }

        if targets.len() < self.config.min_protected {
            return Err(ScoringError::Configuration(format!(
                "only {} of {} protected satellites found, need at least {}",
                targets.len(),
                self.config.protected_ids.len(),
                self.config.min_protected
            )));
        }

        info!("Protected constellation: {} satellites", targets.len());
        Ok(targets)
    }

    pub fn split_population(&self, elements: &[OrbitalElementSet]) -> PopulationSplit {
        let protected: HashSet<u64> = self.config.protected_ids.iter().copied().collect();
        let classification = &self.config.classification;

        let mut candidates = Vec::new();
        let mut benign_pool = Vec::new();
        for set in elements.iter().filter(|e| !protected.contains(&e.catalog_id())) {
            match classification.classify(set.country_code()) {
                CountryClass::Adversarial => candidates.push(set.clone()),
                CountryClass::Benign => benign_pool.push(set),
                CountryClass::Unclassified => {}
            }
        }

        let n = self.config.benign_sample_size;
        let mut benign_sample: Vec<OrbitalElementSet> = if benign_pool.len() <= n {
            benign_pool.into_iter().cloned().collect()
        } else {
            let mut rng = StdRng::seed_from_u64(self.config.sample_seed);
            benign_pool
                .choose_multiple(&mut rng, n)
                .map(|set| (*set).clone())
                .collect()
        };
        benign_sample.sort_by_key(|set| set.catalog_id());

        info!(
            "Population: {} adversarial candidates, {} benign calibration objects",
            candidates.len(),
            benign_sample.len()
        );

        PopulationSplit {
            candidates,
            benign_sample,
        }
    }

    /// Assess parsed element sets over the window starting at `start`
    pub fn assess(
        &self,
        elements: &[OrbitalElementSet],
        start: DateTime<Utc>,
    ) -> Result<ThreatAssessment> {
        let targets = self.select_targets(elements)?;
        let split = self.split_population(elements);

        if split.candidates.is_empty() {
            return Err(ScoringError::NoCandidates);
        }
        if split.benign_sample.len() < MIN_BENIGN_SAMPLES {
            return Err(ScoringError::InsufficientData {
                found: split.benign_sample.len(),
                required: MIN_BENIGN_SAMPLES,
            });
        }

        let grid = TimeGrid::from_window(
            start,
            self.config.window_days,
            self.config.interval_minutes,
        )?;
        let propagator = Propagator::new(self.config.batch_size)?;
        let analyzer = SeparationAnalyzer::new(self.config.separation())?;

        info!(
            "Propagating over {} steps from {} to {}",
            grid.len(),
            grid.start(),
            grid.end()
        );
        let target_tracks = propagator.propagate(&targets, &grid);
        for id in target_tracks.fully_failed() {
            warn!("Protected satellite {} failed to propagate at every step", id);
        }
        let candidate_tracks = propagator.propagate(&split.candidates, &grid);
        let benign_tracks = propagator.propagate(&split.benign_sample, &grid);

        let targets_propagated = &target_tracks.trajectories;
        let candidate_metrics =
            analyzer.analyze(&candidate_tracks.trajectories, targets_propagated, &grid)?;
        let benign_metrics =
            analyzer.analyze(&benign_tracks.trajectories, targets_propagated, &grid)?;

        let benign_separations: Vec<f64> = benign_metrics
            .iter()
            .filter(|m| m.has_evidence())
            .map(|m| m.min_separation_km)
            .collect();
        let benign = fit_benign(&benign_separations)?;
        let threat = self.config.threat;

        let scorer = BayesianScorer::new(
            benign,
            threat,
            self.config.classification.clone(),
            self.config.priors,
        );
        let scores = scorer.score_all(
            split
                .candidates
                .iter()
                .map(OrbitalElementSet::identity)
                .zip(candidate_metrics),
        );

        let similarity = SimilarityScorer::new(
            self.config.similarity,
            self.config.classification.clone(),
            self.config.priors,
        )
        .screen(&split.candidates, &targets);

        Ok(ThreatAssessment {
            window_start: grid.start(),
            window_end: grid.end(),
            grid_steps: grid.len(),
            protected: targets.iter().map(|t| t.identity().clone()).collect(),
            rejected_records: 0,
            benign_sample_size: split.benign_sample.len(),
            benign,
            threat,
            scores,
            similarity,
        })
    }

    /// Load, validate and assess everything a data source provides
    pub fn run(&self, source: &dyn DataSource, start: DateTime<Utc>) -> Result<ThreatAssessment> {
        let records = source.element_records()?;
        let rcs_lookup = source.rcs_lookup()?;
        let catalog = parse_records(&records, &rcs_lookup);

        let mut assessment = self.assess(&catalog.elements, start)?;
        assessment.rejected_records = catalog.rejected.len();
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use chrono::TimeZone;
    use fuzz_harness::fixtures::{gp_record, walker_records, KeplerianSeed, WalkerDelta};
    use serde_json::Value;

    const SHADOW_ID: u64 = 50001;
    const FAR_ID: u64 = 50002;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn config(protected_ids: &[u64], benign_sample_size: usize) -> ThreatConfig {
        let json = serde_json::json!({
            "window_days": 1,
            "interval_minutes": 10,
            "protected_ids": protected_ids,
            "benign_sample_size": benign_sample_size,
            "classification": {
                "adversarial": ["PRC", "CIS"],
                "benign": ["US", "UK", "JPN", "ESA", "FR"]
            },
            "priors": {
                "adversarial_prior": 0.05,
                "default_prior": 0.005,
                "small_rcs_multiplier": 1.5
            }
        });
        serde_json::from_value(json).unwrap()
    }

    fn protected_ids() -> Vec<u64> {
        (90001..=90006).collect()
    }

    fn benign_records(count: u32) -> Vec<Value> {
        (0..count)
            .map(|i| {
                let seed = KeplerianSeed::circular(800.0 + 100.0 * i as f64, 20.0 + 12.0 * i as f64)
                    .with_raan(30.0 * i as f64);
                gp_record(60001 + i, &format!("CIVIL-{}", i), "US", "LARGE", &seed, start())
            })
            .collect()
    }

    /// Walker shell as the protected constellation plus a co-orbital shadow,
    /// a distant adversarial object, one broken record and a benign population
    fn scenario(benign_count: u32) -> Vec<Value> {
        let walker = WalkerDelta::leo_shell();
        let mut records = walker_records(&walker, 90001, "GUARD", "US", start());

        // ~24 km behind GUARD-1 in the same plane
        let shadow = KeplerianSeed::circular(walker.altitude_km, walker.inclination_deg)
            .with_mean_anomaly(-0.2);
        records.push(gp_record(SHADOW_ID as u32, "SHADOW", "PRC", "MEDIUM", &shadow, start()));

        let far = KeplerianSeed::circular(1250.0, 30.0).with_raan(90.0);
        records.push(gp_record(FAR_ID as u32, "FAR", "CIS", "LARGE", &far, start()));

        let mut broken = gp_record(50003, "BROKEN", "PRC", "SMALL", &far, start());
        broken["TLE_LINE2"] = Value::String("2 garbage".to_string());
        records.push(broken);

        records.push(gp_record(70001, "NEUTRAL", "IND", "MEDIUM", &far, start()));
        records.extend(benign_records(benign_count));
        records
    }

    fn run(records: Vec<Value>, config: ThreatConfig) -> Result<ThreatAssessment> {
        let source = InMemorySource::from_values(records);
        ThreatPipeline::new(config)?.run(&source, start())
    }

    #[test]
    fn test_close_shadow_ranks_first() {
        let assessment = run(scenario(12), config(&protected_ids(), 500)).unwrap();

        assert_eq!(assessment.grid_steps, 144);
        assert_eq!(assessment.protected.len(), 6);
        assert_eq!(assessment.rejected_records, 1);
        assert_eq!(assessment.benign_sample_size, 12);
        assert_eq!(assessment.candidates_assessed(), 2);
        assert_eq!(assessment.propagation_failures(), 0);

        let top = &assessment.scores[0];
        assert_eq!(top.catalog_id, SHADOW_ID);
        assert!(top.min_separation_km() < 100.0, "shadow sep {}", top.min_separation_km());
        assert!(top.proximity.hours_within_threshold > 0.0);
        assert!(top.posterior > top.prior);

        let far = &assessment.scores[1];
        assert_eq!(far.catalog_id, FAR_ID);
        assert!(far.likelihood_ratio < 1.0);
        assert!(far.posterior < far.prior);

        assert!(assessment
            .similarity
            .iter()
            .any(|s| s.candidate_id == SHADOW_ID && s.flagged));
    }

    #[test]
    fn test_malformed_rows_are_counted_not_fatal() {
        let mut records = scenario(12);
        records.push(serde_json::json!({"NORAD_CAT_ID": 50004, "OBJECT_NAME": 12345}));
        records.push(serde_json::json!(42));

        let assessment = run(records, config(&protected_ids(), 500)).unwrap();
        assert_eq!(assessment.rejected_records, 3);
        assert_eq!(assessment.candidates_assessed(), 2);
        assert_eq!(assessment.scores[0].catalog_id, SHADOW_ID);
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let a = run(scenario(12), config(&protected_ids(), 500)).unwrap();
        let b = run(scenario(12), config(&protected_ids(), 500)).unwrap();
        assert_eq!(a.benign, b.benign);
        for (x, y) in a.scores.iter().zip(&b.scores) {
            assert_eq!(x.catalog_id, y.catalog_id);
            assert_eq!(x.posterior.to_bits(), y.posterior.to_bits());
        }
    }

    #[test]
    fn test_missing_protected_satellites_fail_before_propagation() {
        let err = run(scenario(12), config(&[90001, 123456, 654321], 500)).unwrap_err();
        assert!(matches!(err, ScoringError::Configuration(_)), "{:?}", err);
    }

    #[test]
    fn test_too_few_benign_objects() {
        let err = run(scenario(5), config(&protected_ids(), 500)).unwrap_err();
        assert!(matches!(err, ScoringError::InsufficientData { found: 5, required: 10 }));
    }

    #[test]
    fn test_no_adversarial_candidates() {
        let mut records = walker_records(&WalkerDelta::leo_shell(), 90001, "GUARD", "US", start());
        records.extend(benign_records(12));
        let err = run(records, config(&protected_ids(), 500)).unwrap_err();
        assert!(matches!(err, ScoringError::NoCandidates));
    }

    #[test]
    fn test_seeded_benign_sample_is_reproducible() {
        let source = InMemorySource::from_values(scenario(12));
        let records = source.element_records().unwrap();
        let elements = parse_records(&records, &Default::default()).elements;

        let pipeline = ThreatPipeline::new(config(&protected_ids(), 5)).unwrap();
        let a = pipeline.split_population(&elements);
        let b = pipeline.split_population(&elements);

        let ids = |split: &PopulationSplit| -> Vec<u64> {
            split.benign_sample.iter().map(|s| s.catalog_id()).collect()
        };
        assert_eq!(a.benign_sample.len(), 5);
        assert_eq!(ids(&a), ids(&b));
        assert!(ids(&a).iter().all(|id| (60001..60013).contains(id)));
        assert!(ids(&a).windows(2).all(|w| w[0] < w[1]));

        // protected, neutral and broken records never enter the population
        let candidate_ids: Vec<u64> = a.candidates.iter().map(|s| s.catalog_id()).collect();
        assert_eq!(candidate_ids, vec![SHADOW_ID, FAR_ID]);
    }

    #[test]
    fn test_assessment_written_as_json() {
        let assessment = run(scenario(12), config(&protected_ids(), 500)).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        assessment.write_json(file.path()).unwrap();

        let written: Value =
            serde_json::from_reader(std::fs::File::open(file.path()).unwrap()).unwrap();
        assert_eq!(written["scores"][0]["catalog_id"], SHADOW_ID);
        assert_eq!(written["scores"].as_array().unwrap().len(), 2);
        assert_eq!(written["grid_steps"], 144);
    }
}
