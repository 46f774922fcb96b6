//! Propagation time grids
//!
//! A grid is a strictly increasing sequence of UTC instants at a fixed
//! cadence, starting at the window start and excluding the window end
//! (30 days at 10 minutes gives 4320 steps).

use crate::{OrbitalError, Result};
use chrono::{DateTime, Duration, Utc};

/// Upper bound on grid length; 10⁷ steps is already ~190 years at 10 minutes
pub const MAX_GRID_STEPS: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    timestamps: Vec<DateTime<Utc>>,
    cadence: Duration,
}

impl TimeGrid {
    /// Build a grid of `floor(window / cadence)` steps from `start`
    pub fn build(start: DateTime<Utc>, window: Duration, cadence: Duration) -> Result<Self> {
        if cadence <= Duration::zero() {
            return Err(OrbitalError::InvalidTimeGrid(format!(
                "cadence must be positive, got {}s",
                cadence.num_seconds()
            )));
        }
        if window <= Duration::zero() {
            return Err(OrbitalError::InvalidTimeGrid(format!(
                "window must be positive, got {}s",
                window.num_seconds()
            )));
        }

        let cadence_ms = cadence.num_milliseconds();
        if cadence_ms <= 0 {
            return Err(OrbitalError::InvalidTimeGrid(
                "cadence below millisecond resolution".to_string(),
            ));
        }
        let n_steps = (window.num_milliseconds() / cadence_ms) as usize;
        if n_steps > MAX_GRID_STEPS {
            return Err(OrbitalError::InvalidTimeGrid(format!(
                "{} steps exceeds the limit of {}",
                n_steps, MAX_GRID_STEPS
            )));
        }
        if start.checked_add_signed(window).is_none() {
            return Err(OrbitalError::InvalidTimeGrid(format!(
                "window of {}s from {} is out of range",
                window.num_seconds(),
                start
            )));
        }
        if n_steps == 0 {
            return Err(OrbitalError::InvalidTimeGrid(format!(
                "window of {}s is shorter than one {}s step",
                window.num_seconds(),
                cadence.num_seconds()
            )));
        }

        let timestamps = (0..n_steps)
            .map(|i| start + Duration::milliseconds(cadence_ms * i as i64))
            .collect();

        Ok(Self { timestamps, cadence })
    }

    /// Rolling forward window in whole days at a minute cadence
    pub fn from_window(
        start: DateTime<Utc>,
        window_days: u32,
        interval_minutes: u32,
    ) -> Result<Self> {
        Self::build(
            start,
            Duration::days(window_days as i64),
            Duration::minutes(interval_minutes as i64),
        )
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn get(&self, index: usize) -> Option<DateTime<Utc>> {
        self.timestamps.get(index).copied()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.timestamps[0]
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.timestamps[self.timestamps.len() - 1]
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Cadence in hours, used to turn step counts into dwell time
    pub fn cadence_hours(&self) -> f64 {
        self.cadence.num_milliseconds() as f64 / 3_600_000.0
    }
}
