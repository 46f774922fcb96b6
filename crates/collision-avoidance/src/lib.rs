//! Collision Avoidance Library
//!
//! Proximity metrics between candidate objects and a protected constellation
//! on a shared propagation grid, and time-of-closest-approach matching over
//! independently sampled trajectories.

use thiserror::Error;

pub mod separation;
pub mod tca;

pub use separation::{ProximityMetrics, SeparationAnalyzer, SeparationConfig};
pub use tca::{find_tca, find_tca_at, ConjunctionResult, ConjunctionScreen};

#[derive(Error, Debug)]
pub enum CollisionError {
    #[error("Insufficient trajectory: {0}")]
    InsufficientTrajectory(String),
    #[error("Trajectory {catalog_id} has {found} samples, grid has {expected}")]
    GridMismatch {
        catalog_id: u64,
        expected: usize,
        found: usize,
    },
    #[error("Invalid screening parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, CollisionError>;
