//! Time of closest approach
//!
//! Matches two trajectories sampled at arbitrary, independent cadences by
//! pairing each sample of the primary with the nearest-in-time sample of the
//! secondary. The closest pair gives the miss distance; the primary's
//! matched instant, rolled forward by whole orbital periods when it already
//! lies in the past, gives the TCA.

use crate::{CollisionError, Result};
use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;
use orbital_mechanics::{Trajectory, TrajectoryPoint};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConjunctionResult {
    pub primary_id: u64,
    pub secondary_id: u64,
    pub miss_distance_km: f64,
    pub tca: DateTime<Utc>,
    pub relative_velocity_km_s: f64,
}

fn time_ordered(trajectory: &Trajectory) -> Vec<TrajectoryPoint> {
    let mut points = trajectory.points.clone();
    points.sort_by_key(|p| p.timestamp);
    points
}

/// Index of the sample nearest to `t`; ties go to the earlier sample
fn nearest_in_time(points: &[TrajectoryPoint], t: DateTime<Utc>) -> usize {
    let after = points.partition_point(|p| p.timestamp < t);
    if after == 0 {
        return 0;
    }
    if after == points.len() {
        return points.len() - 1;
    }
    let before = after - 1;
    if t - points[before].timestamp <= points[after].timestamp - t {
        before
    } else {
        after
    }
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Finite-difference velocity (km/s) at `i`; central inside, one-sided at the ends
fn velocity_at(points: &[TrajectoryPoint], i: usize) -> Vector3<f64> {
    if points.len() < 2 {
        return Vector3::zeros();
    }
    let (lo, hi) = if i == 0 {
        (0, 1)
    } else if i == points.len() - 1 {
        (i - 1, i)
    } else {
        (i - 1, i + 1)
    };
    let dt = seconds_between(points[lo].timestamp, points[hi].timestamp);
    if dt <= 0.0 {
        return Vector3::zeros();
    }
    (points[hi].position - points[lo].position) / dt
}

/// Period implied by the sampling span: the n samples cover (n-1)/n of an orbit
fn estimated_period(points: &[TrajectoryPoint]) -> Option<Duration> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let span_ms = (points[n - 1].timestamp - points[0].timestamp).num_milliseconds();
    let period_ms = span_ms * n as i64 / (n as i64 - 1);
    (period_ms > 0).then(|| Duration::milliseconds(period_ms))
}

fn project_forward(
    tca: DateTime<Utc>,
    period: Option<Duration>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match period {
        Some(period) if tca < now => {
            let behind_ms = (now - tca).num_milliseconds();
            let period_ms = period.num_milliseconds();
            let periods = (behind_ms + period_ms - 1) / period_ms;
            tca + Duration::milliseconds(period_ms * periods)
        }
        _ => tca,
    }
}

/// Closest approach between `primary` and `secondary`, projected past the current time
pub fn find_tca(primary: &Trajectory, secondary: &Trajectory) -> Result<ConjunctionResult> {
    find_tca_at(primary, secondary, Utc::now())
}

/// Closest approach with an explicit reference time
pub fn find_tca_at(
    primary: &Trajectory,
    secondary: &Trajectory,
    now: DateTime<Utc>,
) -> Result<ConjunctionResult> {
    if primary.is_empty() {
        return Err(CollisionError::InsufficientTrajectory(format!(
            "trajectory {} has no samples",
            primary.catalog_id
        )));
    }
    if secondary.is_empty() {
        return Err(CollisionError::InsufficientTrajectory(format!(
            "trajectory {} has no samples",
            secondary.catalog_id
        )));
    }

    let a = time_ordered(primary);
    let b = time_ordered(secondary);

    let mut best = (0usize, 0usize, f64::INFINITY);
    for (i, point) in a.iter().enumerate() {
        let j = nearest_in_time(&b, point.timestamp);
        let distance = (point.position - b[j].position).norm();
        if distance < best.2 {
            best = (i, j, distance);
        }
    }
    let (i, j, miss_distance_km) = best;

    let relative_velocity_km_s = (velocity_at(&a, i) - velocity_at(&b, j)).norm();
    let tca = project_forward(a[i].timestamp, estimated_period(&a), now);

    debug!(
        "TCA {} vs {}: {:.3} km at {} ({:.3} km/s)",
        primary.catalog_id, secondary.catalog_id, miss_distance_km, tca, relative_velocity_km_s
    );

    Ok(ConjunctionResult {
        primary_id: primary.catalog_id,
        secondary_id: secondary.catalog_id,
        miss_distance_km,
        tca,
        relative_velocity_km_s,
    })
}

/// Screens one trajectory against a catalog for approaches inside a radius
#[derive(Debug, Clone, Copy)]
pub struct ConjunctionScreen {
    screening_radius_km: f64,
}

impl Default for ConjunctionScreen {
    fn default() -> Self {
        Self {
            screening_radius_km: 10.0,
        }
    }
}

impl ConjunctionScreen {
    pub fn new(screening_radius_km: f64) -> Result<Self> {
        if !(screening_radius_km > 0.0) {
            return Err(CollisionError::InvalidParameter(format!(
                "screening radius must be positive, got {}",
                screening_radius_km
            )));
        }
        Ok(Self { screening_radius_km })
    }

    pub fn screening_radius_km(&self) -> f64 {
        self.screening_radius_km
    }

    /// Conjunctions inside the screening radius, closest first
    pub fn screen(
        &self,
        primary: &Trajectory,
        catalog: &[Trajectory],
        now: DateTime<Utc>,
    ) -> Vec<ConjunctionResult> {
        let mut events: Vec<ConjunctionResult> = catalog
            .par_iter()
            .filter(|secondary| secondary.catalog_id != primary.catalog_id)
            .filter_map(|secondary| match find_tca_at(primary, secondary, now) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(
                        "Skipping conjunction {} vs {}: {}",
                        primary.catalog_id, secondary.catalog_id, e
                    );
                    None
                }
            })
            .filter(|result| result.miss_distance_km <= self.screening_radius_km)
            .collect();

        events.sort_by(|x, y| x.miss_distance_km.total_cmp(&y.miss_distance_km));
        events
    }
}
