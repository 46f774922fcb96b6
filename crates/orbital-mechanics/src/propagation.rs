//! Batched SGP4 propagation over a shared time grid
//!
//! Element sets are split into fixed-size batches and propagated in parallel.
//! Output order always matches input order. A numerical failure at one
//! instant marks that single cell as [`Sample::Failed`]; it never aborts the
//! batch or the object.

use crate::elements::OrbitalElementSet;
use crate::time_grid::TimeGrid;
use crate::{OrbitalError, Result};
use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default number of element sets per propagation batch
pub const DEFAULT_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateVector {
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub velocity_z: f64,
    pub epoch: DateTime<Utc>,
}

impl StateVector {
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.position_x, self.position_y, self.position_z)
    }

    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.velocity_x, self.velocity_y, self.velocity_z)
    }
}

/// One grid cell of a propagated trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Valid(Vector3<f64>),
    Failed,
}

impl Sample {
    /// Non-finite components count as a failure
    pub fn from_position(position: [f64; 3]) -> Self {
        if position.iter().all(|c| c.is_finite()) {
            Sample::Valid(Vector3::new(position[0], position[1], position[2]))
        } else {
            Sample::Failed
        }
    }

    fn from_prediction<E>(prediction: std::result::Result<sgp4::Prediction, E>) -> Self {
        match prediction {
            Ok(p) => Self::from_position(p.position),
            Err(_) => Sample::Failed,
        }
    }

    pub fn position(&self) -> Option<Vector3<f64>> {
        match self {
            Sample::Valid(p) => Some(*p),
            Sample::Failed => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Sample::Valid(_))
    }
}

/// Positions of one object at every grid instant
#[derive(Debug, Clone)]
pub struct PropagatedTrajectory {
    pub catalog_id: u64,
    pub samples: Vec<Sample>,
}

impl PropagatedTrajectory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_valid()).count()
    }

    /// True when no grid instant produced a usable position
    pub fn is_fully_failed(&self) -> bool {
        !self.samples.iter().any(Sample::is_valid)
    }

    pub fn position(&self, index: usize) -> Option<Vector3<f64>> {
        self.samples.get(index).and_then(Sample::position)
    }

    pub fn validity_mask(&self) -> Vec<bool> {
        self.samples.iter().map(Sample::is_valid).collect()
    }

    /// Timestamped valid samples, dropping failed cells
    pub fn to_trajectory(&self, grid: &TimeGrid) -> Trajectory {
        let points = self
            .samples
            .iter()
            .zip(grid.timestamps())
            .filter_map(|(sample, &timestamp)| {
                sample.position().map(|position| TrajectoryPoint { timestamp, position })
            })
            .collect();
        Trajectory {
            catalog_id: self.catalog_id,
            points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub timestamp: DateTime<Utc>,
    pub position: Vector3<f64>,
}

/// Time-ordered position samples for a single object
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub catalog_id: u64,
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn span(&self) -> Duration {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => Duration::zero(),
        }
    }
}

/// Result of propagating a batch of element sets
#[derive(Debug, Clone)]
pub struct PropagationOutput {
    pub trajectories: Vec<PropagatedTrajectory>,
}

impl PropagationOutput {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Row-major validity: `mask[object][step]`
    pub fn validity_mask(&self) -> Vec<Vec<bool>> {
        self.trajectories.iter().map(|t| t.validity_mask()).collect()
    }

    pub fn failed_cells(&self) -> usize {
        self.trajectories
            .iter()
            .map(|t| t.len() - t.valid_count())
            .sum()
    }

    /// Catalog ids of objects with no valid sample at all
    pub fn fully_failed(&self) -> Vec<u64> {
        self.trajectories
            .iter()
            .filter(|t| t.is_fully_failed())
            .map(|t| t.catalog_id)
            .collect()
    }

    pub fn get(&self, catalog_id: u64) -> Option<&PropagatedTrajectory> {
        self.trajectories.iter().find(|t| t.catalog_id == catalog_id)
    }
}

fn minutes_since_epoch(set: &OrbitalElementSet, time: DateTime<Utc>) -> f64 {
    time.signed_duration_since(set.epoch()).num_milliseconds() as f64 / 60_000.0
}

fn propagate_one(set: &OrbitalElementSet, grid: &TimeGrid) -> PropagatedTrajectory {
    let samples = match set.constants() {
        Ok(constants) => grid
            .timestamps()
            .iter()
            .map(|&t| Sample::from_prediction(constants.propagate(minutes_since_epoch(set, t))))
            .collect(),
        Err(e) => {
            warn!("Catalog id {} could not initialise SGP4: {}", set.catalog_id(), e);
            vec![Sample::Failed; grid.len()]
        }
    };

    PropagatedTrajectory {
        catalog_id: set.catalog_id(),
        samples,
    }
}

/// Batched SGP4 propagator
#[derive(Debug, Clone, Copy)]
pub struct Propagator {
    batch_size: usize,
}

impl Default for Propagator {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Propagator {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(OrbitalError::InvalidBatchSize(batch_size));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Propagate every element set to every grid instant
    pub fn propagate(&self, sets: &[OrbitalElementSet], grid: &TimeGrid) -> PropagationOutput {
        debug!(
            "Propagating {} element sets over {} steps in batches of {}",
            sets.len(),
            grid.len(),
            self.batch_size
        );

        let trajectories: Vec<PropagatedTrajectory> = sets
            .par_chunks(self.batch_size)
            .map(|batch| batch.iter().map(|set| propagate_one(set, grid)).collect::<Vec<_>>())
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        let output = PropagationOutput { trajectories };
        let failed = output.failed_cells();
        if failed > 0 {
            warn!(
                "{} of {} propagation cells failed",
                failed,
                sets.len() * grid.len()
            );
        }
        info!("Propagated {} objects", output.len());
        output
    }
}

/// Full state vector of one element set at one instant
pub fn propagate_state(set: &OrbitalElementSet, time: DateTime<Utc>) -> Result<StateVector> {
    let constants = set.constants()?;
    let prediction = constants
        .propagate(minutes_since_epoch(set, time))
        .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

    Ok(StateVector {
        position_x: prediction.position[0],
        position_y: prediction.position[1],
        position_z: prediction.position[2],
        velocity_x: prediction.velocity[0],
        velocity_y: prediction.velocity[1],
        velocity_z: prediction.velocity[2],
        epoch: time,
    })
}

/// Sample an element set at its own cadence, keeping only valid positions
pub fn sample_track(
    set: &OrbitalElementSet,
    start: DateTime<Utc>,
    span: Duration,
    step: Duration,
) -> Result<Trajectory> {
    let grid = TimeGrid::build(start, span, step)?;
    Ok(propagate_one(set, &grid).to_trajectory(&grid))
}

/// `n_points` samples spread evenly over one orbital period from `start`
pub fn sample_orbit(
    set: &OrbitalElementSet,
    start: DateTime<Utc>,
    n_points: usize,
) -> Result<Trajectory> {
    if n_points == 0 {
        return Err(OrbitalError::InvalidTimeGrid("zero sample points".to_string()));
    }
    let period_ms = (set.period_minutes() * 60_000.0).round() as i64;
    let step = Duration::milliseconds((period_ms / n_points as i64).max(1));
    sample_track(set, start, step * n_points as i32, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{parse_records, RawElementRecord};
    use crate::EARTH_RADIUS_KM;
    use chrono::TimeZone;
    use fuzz_harness::fixtures::{gp_record, walker_records, KeplerianSeed, WalkerDelta};
    use fuzz_harness::generators::keplerian_seed;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
    }

    fn sets_from(values: Vec<serde_json::Value>) -> Vec<OrbitalElementSet> {
        let records: Vec<RawElementRecord> = values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        parse_records(&records, &HashMap::new()).elements
    }

    fn leo_set(altitude_km: f64) -> OrbitalElementSet {
        let seed = KeplerianSeed::circular(altitude_km, 53.0);
        sets_from(vec![gp_record(70001, "PROBE", "US", "SMALL", &seed, epoch())]).remove(0)
    }

    #[test]
    fn test_leo_radius_stays_near_altitude() {
        let set = leo_set(500.0);
        let grid = TimeGrid::from_window(epoch(), 1, 10).unwrap();
        let out = Propagator::default().propagate(&[set], &grid);

        let trajectory = &out.trajectories[0];
        assert_eq!(trajectory.len(), 144);
        assert_eq!(trajectory.valid_count(), 144);
        for sample in &trajectory.samples {
            let r = sample.position().unwrap().norm();
            assert!((r - (EARTH_RADIUS_KM + 500.0)).abs() < 50.0, "radius {}", r);
        }
    }

    #[test]
    fn test_order_preserved_across_batches() {
        let records = walker_records(&WalkerDelta::leo_shell(), 80001, "SHELL", "US", epoch());
        let sets = sets_from(records);
        let grid = TimeGrid::from_window(epoch(), 1, 60).unwrap();

        let batched = Propagator::new(4).unwrap().propagate(&sets, &grid);
        let single = Propagator::new(1).unwrap().propagate(&sets, &grid);

        let ids: Vec<u64> = batched.trajectories.iter().map(|t| t.catalog_id).collect();
        assert_eq!(ids, (80001..80007).collect::<Vec<u64>>());
        for (a, b) in batched.trajectories.iter().zip(&single.trajectories) {
            assert_eq!(a.samples, b.samples);
        }
    }

    #[test]
    fn test_propagation_is_deterministic() {
        let set = leo_set(700.0);
        let grid = TimeGrid::from_window(epoch(), 2, 30).unwrap();
        let a = Propagator::default().propagate(std::slice::from_ref(&set), &grid);
        let b = Propagator::default().propagate(std::slice::from_ref(&set), &grid);
        assert_eq!(a.trajectories[0].samples, b.trajectories[0].samples);
        assert!(a.fully_failed().is_empty());
        assert_eq!(a.failed_cells(), 0);
    }

    #[test]
    fn test_non_finite_position_is_failed_cell() {
        assert_eq!(Sample::from_position([f64::NAN, 0.0, 0.0]), Sample::Failed);
        assert_eq!(Sample::from_position([1.0, f64::INFINITY, 0.0]), Sample::Failed);
        assert!(Sample::from_position([7000.0, 0.0, 0.0]).is_valid());

        let trajectory = PropagatedTrajectory {
            catalog_id: 5,
            samples: vec![Sample::Failed, Sample::Failed],
        };
        assert!(trajectory.is_fully_failed());
        assert_eq!(trajectory.validity_mask(), vec![false, false]);
    }

    #[test]
    fn test_decaying_orbit_fails_only_later_cells() {
        let healthy_seed = KeplerianSeed::circular(550.0, 53.0);
        let decaying_seed = KeplerianSeed::decaying(51.6);
        let healthy = gp_record(70002, "HEALTHY", "US", "SMALL", &healthy_seed, epoch());
        let decaying = gp_record(70003, "REENTRY", "US", "SMALL", &decaying_seed, epoch());
        let sets = sets_from(vec![healthy, decaying]);
        assert_eq!(sets.len(), 2, "SGP4 must accept the decaying set at epoch");

        let grid = TimeGrid::from_window(epoch(), 1, 30).unwrap();
        let out = Propagator::new(1).unwrap().propagate(&sets, &grid);

        let healthy = out.get(70002).unwrap();
        assert_eq!(healthy.valid_count(), grid.len());

        let decaying = out.get(70003).unwrap();
        let mask = decaying.validity_mask();
        assert_eq!(decaying.len(), grid.len());
        assert!(mask[0], "epoch cell should propagate");
        assert!(!mask[mask.len() - 1], "last cell should have failed");
        assert!(!decaying.is_fully_failed());
        assert!(decaying.position(0).is_some());
        assert!(decaying.position(grid.len() - 1).is_none());

        assert_eq!(out.failed_cells(), grid.len() - decaying.valid_count());
        assert!(out.fully_failed().is_empty());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(Propagator::new(0), Err(OrbitalError::InvalidBatchSize(0))));
    }

    #[test]
    fn test_to_trajectory_drops_failed_cells() {
        let grid = TimeGrid::from_window(epoch(), 1, 480).unwrap();
        let trajectory = PropagatedTrajectory {
            catalog_id: 9,
            samples: vec![
                Sample::Valid(Vector3::new(7000.0, 0.0, 0.0)),
                Sample::Failed,
                Sample::Valid(Vector3::new(0.0, 7000.0, 0.0)),
            ],
        };
        let track = trajectory.to_trajectory(&grid);
        assert_eq!(track.len(), 2);
        assert_eq!(track.points[1].timestamp, grid.timestamps()[2]);
    }

    #[test]
    fn test_sample_orbit_covers_one_period() {
        let set = leo_set(550.0);
        let track = sample_orbit(&set, epoch(), 60).unwrap();
        assert_eq!(track.len(), 60);
        let span_min = track.span().num_seconds() as f64 / 60.0;
        let expected = set.period_minutes() * 59.0 / 60.0;
        assert!((span_min - expected).abs() < 0.1, "span {} vs {}", span_min, expected);
    }

    #[test]
    fn test_propagate_state_velocity_is_orbital() {
        let set = leo_set(500.0);
        let state = propagate_state(&set, epoch() + Duration::hours(3)).unwrap();
        let speed = state.velocity().norm();
        assert!((speed - 7.6).abs() < 0.2, "speed {}", speed);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_leo_seed_propagates_near_its_shell(seed in keplerian_seed()) {
            let record = gp_record(71000, "PROP", "US", "SMALL", &seed, epoch());
            let sets = sets_from(vec![record]);
            prop_assert_eq!(sets.len(), 1);

            let grid = TimeGrid::from_window(epoch(), 1, 120).unwrap();
            let out = Propagator::default().propagate(&sets, &grid);
            let trajectory = &out.trajectories[0];
            prop_assert_eq!(trajectory.len(), grid.len());

            let nominal = EARTH_RADIUS_KM + seed.altitude_km;
            let tolerance = seed.eccentricity * nominal + 60.0;
            for sample in &trajectory.samples {
                let r = sample.position().map(|p| p.norm());
                prop_assert!(r.is_some());
                prop_assert!((r.unwrap_or_default() - nominal).abs() < tolerance);
            }
        }
    }
}
