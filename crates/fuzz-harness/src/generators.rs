//! Orbital and statistical generators for property-based testing

use crate::fixtures::KeplerianSeed;
use proptest::prelude::*;

// ============================================================================
// Probability Generators
// ============================================================================

/// Prior strictly inside (0, 1)
pub fn prior() -> impl Strategy<Value = f64> {
    1e-9f64..(1.0 - 1e-9)
}

/// Likelihood ratio ≥ 0, spanning evidence against and evidence for a threat
pub fn likelihood_ratio() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        0.0f64..1.0,
        1.0f64..1e6,
        1e6f64..1e300,
    ]
}

/// Log-normal (mu, sigma) with sigma > 0
pub fn lognormal_params() -> impl Strategy<Value = (f64, f64)> {
    (-5.0f64..10.0, 0.05f64..3.0)
}

// ============================================================================
// Distance Generators
// ============================================================================

/// Minimum separation in km (close approach to far field)
pub fn separation_km() -> impl Strategy<Value = f64> {
    0.01f64..50_000.0
}

/// Positive separation samples of at least `min_len` entries
pub fn separation_samples(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..50_000.0, min_len..min_len + 200)
}

// ============================================================================
// Orbital Domain Generators
// ============================================================================

/// LEO altitude range (km)
pub fn altitude_leo_km() -> impl Strategy<Value = f64> {
    300.0f64..2_000.0
}

/// Inclination in degrees (0-180)
pub fn inclination_deg() -> impl Strategy<Value = f64> {
    0.0f64..180.0
}

/// RAAN (Right Ascension of Ascending Node, 0-360 deg)
pub fn raan_deg() -> impl Strategy<Value = f64> {
    0.0f64..360.0
}

/// Mean anomaly (0-360 deg)
pub fn mean_anomaly_deg() -> impl Strategy<Value = f64> {
    0.0f64..360.0
}

/// Near-circular eccentricity (0-0.01)
pub fn eccentricity_circular() -> impl Strategy<Value = f64> {
    0.0f64..0.01
}

/// LEO Keplerian seed suitable for SGP4 (near-Earth branch)
pub fn keplerian_seed() -> impl Strategy<Value = KeplerianSeed> {
    (
        altitude_leo_km(),
        inclination_deg(),
        raan_deg(),
        eccentricity_circular(),
        mean_anomaly_deg(),
    )
        .prop_map(|(alt, inc, raan, ecc, ma)| {
            KeplerianSeed::circular(alt, inc)
                .with_raan(raan)
                .with_eccentricity(ecc)
                .with_mean_anomaly(ma)
        })
}
