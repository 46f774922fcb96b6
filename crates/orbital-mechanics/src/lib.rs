//! Orbital Mechanics Library
//!
//! Element-set ingestion, propagation time grids, and batched SGP4
//! propagation for proximity threat assessment.
//!
//! Positions are Earth-centred inertial (TEME, as produced by SGP4) in km.

use thiserror::Error;

pub mod elements;
pub mod propagation;
pub mod time_grid;

pub use elements::{
    parse_records, ElementError, ObjectType, OrbitalElementSet, ParsedCatalog, RawElementRecord,
    RcsSize, SatelliteIdentity,
};
pub use propagation::{
    PropagatedTrajectory, PropagationOutput, Propagator, Sample, StateVector, Trajectory,
    TrajectoryPoint,
};
pub use time_grid::{TimeGrid, MAX_GRID_STEPS};

/// WGS-72 equatorial radius used by SGP4 (km)
pub const EARTH_RADIUS_KM: f64 = 6378.135;
/// Earth gravitational parameter (km³/s²)
pub const MU_EARTH: f64 = 398600.8;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;
