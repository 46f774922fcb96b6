//! Synthetic element-set fixtures
//!
//! Builds syntactically valid two-line element sets and catalog GP records
//! from Keplerian seeds, plus Walker Delta constellations for standing up a
//! protected constellation in tests.
//!
//! ## Walker Delta Notation: T/P/F
//! - T = Total satellites
//! - P = Number of orbital planes
//! - F = Phasing factor (0 to P-1)
//!
//! Generated TLEs carry a zero drag term unless a seed sets one, so SGP4
//! output is smooth and fully reproducible across runs.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::{json, Value};

pub const EARTH_RADIUS_KM: f64 = 6378.137;
const MU_EARTH: f64 = 398600.4418;
const SECONDS_PER_DAY: f64 = 86400.0;

/// Keplerian orbit description used to synthesise a TLE
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerianSeed {
    /// Mean altitude above the equatorial radius (km)
    pub altitude_km: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    /// SGP4 drag term B* (1/earth radii)
    pub bstar: f64,
}

impl KeplerianSeed {
    /// Circular orbit at the given altitude and inclination
    pub fn circular(altitude_km: f64, inclination_deg: f64) -> Self {
        Self {
            altitude_km,
            inclination_deg,
            raan_deg: 0.0,
            eccentricity: 0.0001,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: 0.0,
            bstar: 0.0,
        }
    }

    /// Low, slightly eccentric orbit with a drag term large enough that SGP4
    /// drives the eccentricity out of range within a few hours of epoch
    pub fn decaying(inclination_deg: f64) -> Self {
        Self::circular(300.0, inclination_deg)
            .with_eccentricity(0.005)
            .with_bstar(0.5)
    }

    pub fn with_bstar(mut self, bstar: f64) -> Self {
        self.bstar = bstar;
        self
    }

    pub fn with_raan(mut self, raan_deg: f64) -> Self {
        self.raan_deg = raan_deg;
        self
    }

    pub fn with_mean_anomaly(mut self, mean_anomaly_deg: f64) -> Self {
        self.mean_anomaly_deg = mean_anomaly_deg;
        self
    }

    pub fn with_eccentricity(mut self, eccentricity: f64) -> Self {
        self.eccentricity = eccentricity;
        self
    }

    pub fn semi_major_axis_km(&self) -> f64 {
        EARTH_RADIUS_KM + self.altitude_km
    }

    /// n = sqrt(μ/a³) converted to rev/day
    pub fn mean_motion_rev_per_day(&self) -> f64 {
        let n_rad_s = (MU_EARTH / self.semi_major_axis_km().powi(3)).sqrt();
        n_rad_s * SECONDS_PER_DAY / (2.0 * std::f64::consts::PI)
    }

    pub fn period_minutes(&self) -> f64 {
        1440.0 / self.mean_motion_rev_per_day()
    }
}

/// Generate TLE line 1 and line 2 for a seed at the given epoch
pub fn tle_lines(norad_id: u32, seed: &KeplerianSeed, epoch: DateTime<Utc>) -> (String, String) {
    // Epoch format: YYDDD.DDDDDDDD (2-digit year, day of year with fraction)
    let year = epoch.year().rem_euclid(100);
    let day_of_year = epoch.ordinal() as f64
        + epoch.num_seconds_from_midnight() as f64 / SECONDS_PER_DAY;

    let line1_base = format!(
        "1 {:05}U 24001A   {:02}{:012.8} -.00000000  00000-0 {} 0  999",
        norad_id,
        year,
        day_of_year,
        exponent_field(seed.bstar)
    );
    let line1 = format!("{}{}", line1_base, checksum_digit(&line1_base));

    // Eccentricity is written as 7 digits with an implied leading decimal point
    let ecc_str = format!("{:07}", (seed.eccentricity * 10_000_000.0).round() as u32);

    let line2_base = format!(
        "2 {:05} {:8.4} {:8.4} {} {:8.4} {:8.4} {:11.8}{:05}",
        norad_id,
        seed.inclination_deg,
        seed.raan_deg.rem_euclid(360.0),
        ecc_str,
        seed.arg_perigee_deg.rem_euclid(360.0),
        seed.mean_anomaly_deg.rem_euclid(360.0),
        seed.mean_motion_rev_per_day(),
        0 // revolution number at epoch
    );
    let line2 = format!("{}{}", line2_base, checksum_digit(&line2_base));

    (line1, line2)
}

/// Assumed-decimal exponent notation, 8 columns: ` 50000-0` is 0.5
fn exponent_field(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return " 00000-0".to_string();
    }
    let sign = if value < 0.0 { '-' } else { ' ' };
    let magnitude = value.abs();
    let mut exponent = magnitude.log10().floor() as i32 + 1;
    let mut mantissa = (magnitude / 10f64.powi(exponent) * 100_000.0).round() as u32;
    if mantissa >= 100_000 {
        mantissa /= 10;
        exponent += 1;
    }
    let exponent_sign = if exponent > 0 { '+' } else { '-' };
    format!("{}{:05}{}{}", sign, mantissa, exponent_sign, exponent.abs())
}

/// TLE checksum: sum of digits plus one per minus sign, modulo 10
fn checksum_digit(line: &str) -> u32 {
    let sum: u32 = line
        .chars()
        .map(|c| match c {
            '0'..='9' => c.to_digit(10).unwrap_or(0),
            '-' => 1,
            _ => 0,
        })
        .sum();
    sum % 10
}

/// Catalog GP record (uppercase keys, string catalog id) for one synthetic satellite
pub fn gp_record(
    norad_id: u32,
    name: &str,
    country_code: &str,
    rcs_size: &str,
    seed: &KeplerianSeed,
    epoch: DateTime<Utc>,
) -> Value {
    let (line1, line2) = tle_lines(norad_id, seed, epoch);
    json!({
        "NORAD_CAT_ID": norad_id.to_string(),
        "OBJECT_NAME": name,
        "COUNTRY_CODE": country_code,
        "RCS_SIZE": rcs_size,
        "OBJECT_TYPE": "PAYLOAD",
        "TLE_LINE1": line1,
        "TLE_LINE2": line2,
    })
}

#[derive(Debug, Clone)]
pub struct WalkerDelta {
    pub total_satellites: u32,
    pub planes: u32,
    pub phasing: u32,
    pub altitude_km: f64,
    pub inclination_deg: f64,
}

impl WalkerDelta {
    /// Small sun-synchronous-like LEO shell used as a default protected constellation
    pub fn leo_shell() -> Self {
        WalkerDelta {
            total_satellites: 6,
            planes: 3,
            phasing: 1,
            altitude_km: 500.0,
            inclination_deg: 97.4,
        }
    }

    pub fn satellites_per_plane(&self) -> u32 {
        (self.total_satellites / self.planes.max(1)).max(1)
    }

    pub fn plane_spacing_deg(&self) -> f64 {
        360.0 / self.planes.max(1) as f64
    }

    pub fn in_plane_spacing_deg(&self) -> f64 {
        360.0 / self.satellites_per_plane() as f64
    }

    /// Phase offset between adjacent planes: 360° · F / T
    pub fn phase_offset_deg(&self) -> f64 {
        360.0 * self.phasing as f64 / self.total_satellites.max(1) as f64
    }

    pub fn seeds(&self) -> Vec<KeplerianSeed> {
        let mut seeds = Vec::with_capacity(self.total_satellites as usize);
        for plane in 0..self.planes {
            for slot in 0..self.satellites_per_plane() {
                let mean_anomaly = slot as f64 * self.in_plane_spacing_deg()
                    + plane as f64 * self.phase_offset_deg();
                seeds.push(
                    KeplerianSeed::circular(self.altitude_km, self.inclination_deg)
                        .with_raan(plane as f64 * self.plane_spacing_deg())
                        .with_mean_anomaly(mean_anomaly),
                );
            }
        }
        seeds
    }
}

/// GP records for every slot of a Walker constellation, numbered from `first_norad_id`
pub fn walker_records(
    walker: &WalkerDelta,
    first_norad_id: u32,
    name_prefix: &str,
    country_code: &str,
    epoch: DateTime<Utc>,
) -> Vec<Value> {
    walker
        .seeds()
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let name = format!("{}-{}", name_prefix, i + 1);
            gp_record(first_norad_id + i as u32, &name, country_code, "MEDIUM", seed, epoch)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_tle_lines_are_69_columns() {
        let seed = KeplerianSeed::circular(550.0, 53.0).with_raan(120.0);
        let (l1, l2) = tle_lines(44713, &seed, epoch());
        assert_eq!(l1.len(), 69, "line 1: {:?}", l1);
        assert_eq!(l2.len(), 69, "line 2: {:?}", l2);
        assert!(l1.starts_with("1 44713U"));
        assert!(l2.starts_with("2 44713"));
    }

    #[test]
    fn test_bstar_field() {
        assert_eq!(exponent_field(0.0), " 00000-0");
        assert_eq!(exponent_field(0.5), " 50000-0");
        assert_eq!(exponent_field(0.00012345), " 12345-3");
        assert_eq!(exponent_field(-0.011606), "-11606-1");

        let (l1, _) = tle_lines(25544, &KeplerianSeed::decaying(51.6), epoch());
        assert_eq!(l1.len(), 69);
        assert_eq!(&l1[53..61], " 50000-0");
    }

    #[test]
    fn test_checksum_counts_minus_as_one() {
        assert_eq!(checksum_digit("1-1"), 3);
        assert_eq!(checksum_digit("ABC"), 0);
    }

    #[test]
    fn test_leo_mean_motion() {
        // ~500 km circular orbit is roughly 15.2 rev/day (≈94.6 min period)
        let seed = KeplerianSeed::circular(500.0, 97.4);
        let n = seed.mean_motion_rev_per_day();
        assert!((n - 15.22).abs() < 0.1, "mean motion {}", n);
        assert!((seed.period_minutes() - 94.6).abs() < 1.0);
    }

    #[test]
    fn test_walker_seeds() {
        let walker = WalkerDelta::leo_shell();
        let seeds = walker.seeds();
        assert_eq!(seeds.len(), 6);
        assert_eq!(walker.satellites_per_plane(), 2);
        assert!((seeds[2].raan_deg - 120.0).abs() < 1e-9);
        assert!((seeds[1].mean_anomaly_deg - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_walker_records_have_catalog_keys() {
        let records = walker_records(&WalkerDelta::leo_shell(), 90001, "GUARD", "US", epoch());
        assert_eq!(records.len(), 6);
        assert_eq!(records[0]["NORAD_CAT_ID"], "90001");
        assert_eq!(records[5]["OBJECT_NAME"], "GUARD-6");
        assert_eq!(records[0]["COUNTRY_CODE"], "US");
    }
}
