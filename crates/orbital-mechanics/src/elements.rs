//! Orbital element set ingestion
//!
//! Raw catalog records (GP class, uppercase keys) are validated one at a time.
//! A record that cannot be turned into a propagable SGP4 state is rejected
//! with an [`ElementError`] and the rest of the batch continues.

use crate::{OrbitalError, Result, EARTH_RADIUS_KM, MU_EARTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Per-record ingestion failure. Never fatal to a batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    #[error("record {index}: missing TLE line(s)")]
    MissingTle { index: usize },
    #[error("record {index}: missing catalog id")]
    MissingCatalogId { index: usize },
    #[error("record {index}: invalid catalog id {value}")]
    InvalidCatalogId { index: usize, value: String },
    #[error("catalog id {catalog_id}: unparseable TLE: {reason}")]
    InvalidTle { catalog_id: u64, reason: String },
    #[error("catalog id {catalog_id}: element set cannot be propagated: {reason}")]
    Unpropagable { catalog_id: u64, reason: String },
}

/// Radar cross-section size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RcsSize {
    Small,
    Medium,
    Large,
    Unknown,
}

impl RcsSize {
    /// Map a catalog RCS_SIZE string; anything unrecognised is `Unknown`
    pub fn from_catalog(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "SMALL" => Self::Small,
            "MEDIUM" => Self::Medium,
            "LARGE" => Self::Large,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for RcsSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Small => "SMALL",
            Self::Medium => "MEDIUM",
            Self::Large => "LARGE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ObjectType {
    Payload,
    RocketBody,
    Debris,
    Unknown,
}

impl ObjectType {
    pub fn from_catalog(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PAYLOAD" => Self::Payload,
            "ROCKET BODY" => Self::RocketBody,
            "DEBRIS" => Self::Debris,
            _ => Self::Unknown,
        }
    }
}

/// Catalog GP record as delivered by the element-set provider
///
/// Text fields accept numbers and booleans as their string form; any other
/// JSON type reads as absent, so one mistyped field never fails a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RawElementRecord {
    /// String or number depending on the provider
    #[serde(default)]
    pub norad_cat_id: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub object_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rcs_size: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub object_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tle_line1: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tle_line2: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

impl RawElementRecord {
    /// Read one catalog row. A row that is not a JSON object yields an empty
    /// record, which ingestion then rejects.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!("Unreadable element record: {}", e);
                Self::default()
            }
        }
    }
}

/// Who a satellite is, independent of where it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteIdentity {
    pub catalog_id: u64,
    pub name: String,
    pub country_code: String,
    pub rcs_size: RcsSize,
    pub object_type: ObjectType,
}

/// Validated, propagable element set. Immutable once constructed.
///
/// `sgp4::Elements` is neither `Clone` nor `Debug`; it is shared behind an
/// `Arc` so sets can be cloned into the population split cheaply.
#[derive(Clone)]
pub struct OrbitalElementSet {
    identity: SatelliteIdentity,
    tle_line1: String,
    tle_line2: String,
    elements: Arc<sgp4::Elements>,
}

impl fmt::Debug for OrbitalElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrbitalElementSet")
            .field("identity", &self.identity)
            .field("epoch", &self.elements.datetime)
            .field("inclination_deg", &self.elements.inclination)
            .field("eccentricity", &self.elements.eccentricity)
            .field("mean_motion_rev_per_day", &self.elements.mean_motion)
            .finish_non_exhaustive()
    }
}

impl OrbitalElementSet {
    /// Parse a two-line element set and confirm SGP4 can initialise from it
    pub fn from_tle(
        identity: SatelliteIdentity,
        tle_line1: &str,
        tle_line2: &str,
    ) -> std::result::Result<Self, ElementError> {
        let catalog_id = identity.catalog_id;
        let line1 = tle_line1.trim_end();
        let line2 = tle_line2.trim_end();

        let elements = sgp4::Elements::from_tle(
            Some(identity.name.clone()),
            line1.as_bytes(),
            line2.as_bytes(),
        )
        .map_err(|e| ElementError::InvalidTle {
            catalog_id,
            reason: format!("{:?}", e),
        })?;

        sgp4::Constants::from_elements(&elements).map_err(|e| ElementError::Unpropagable {
            catalog_id,
            reason: format!("{:?}", e),
        })?;

        Ok(Self {
            identity,
            tle_line1: line1.to_string(),
            tle_line2: line2.to_string(),
            elements: Arc::new(elements),
        })
    }

    pub fn identity(&self) -> &SatelliteIdentity {
        &self.identity
    }

    pub fn catalog_id(&self) -> u64 {
        self.identity.catalog_id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn country_code(&self) -> &str {
        &self.identity.country_code
    }

    pub fn rcs_size(&self) -> RcsSize {
        self.identity.rcs_size
    }

    pub fn object_type(&self) -> ObjectType {
        self.identity.object_type
    }

    pub fn tle_lines(&self) -> (&str, &str) {
        (&self.tle_line1, &self.tle_line2)
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_naive_utc_and_offset(self.elements.datetime, Utc)
    }

    pub fn inclination_deg(&self) -> f64 {
        self.elements.inclination
    }

    pub fn raan_deg(&self) -> f64 {
        self.elements.right_ascension
    }

    pub fn eccentricity(&self) -> f64 {
        self.elements.eccentricity
    }

    pub fn arg_perigee_deg(&self) -> f64 {
        self.elements.argument_of_perigee
    }

    pub fn mean_anomaly_deg(&self) -> f64 {
        self.elements.mean_anomaly
    }

    pub fn mean_motion_rev_per_day(&self) -> f64 {
        self.elements.mean_motion
    }

    /// a = (μ / n²)^(1/3) with n in rad/s
    pub fn semi_major_axis_km(&self) -> f64 {
        let n_rad_s = self.elements.mean_motion * 2.0 * std::f64::consts::PI / 86400.0;
        (MU_EARTH / (n_rad_s * n_rad_s)).cbrt()
    }

    /// Mean altitude above the equatorial radius
    pub fn mean_altitude_km(&self) -> f64 {
        self.semi_major_axis_km() - EARTH_RADIUS_KM
    }

    pub fn period_minutes(&self) -> f64 {
        1440.0 / self.elements.mean_motion
    }

    /// SGP4 propagator state for this element set
    pub fn constants(&self) -> Result<sgp4::Constants> {
        sgp4::Constants::from_elements(&self.elements)
            .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))
    }
}

/// Outcome of ingesting a batch of raw records
#[derive(Debug, Default)]
pub struct ParsedCatalog {
    pub elements: Vec<OrbitalElementSet>,
    pub rejected: Vec<ElementError>,
}

fn parse_catalog_id(
    index: usize,
    value: Option<&serde_json::Value>,
) -> std::result::Result<u64, ElementError> {
    match value {
        None | Some(serde_json::Value::Null) => Err(ElementError::MissingCatalogId { index }),
        Some(serde_json::Value::Number(n)) => {
            n.as_u64().ok_or_else(|| ElementError::InvalidCatalogId {
                index,
                value: n.to_string(),
            })
        }
        Some(serde_json::Value::String(s)) => {
            s.trim().parse::<u64>().map_err(|_| ElementError::InvalidCatalogId {
                index,
                value: s.clone(),
            })
        }
        Some(other) => Err(ElementError::InvalidCatalogId {
            index,
            value: other.to_string(),
        }),
    }
}

fn parse_record(
    index: usize,
    record: &RawElementRecord,
    rcs_lookup: &HashMap<u64, RcsSize>,
) -> std::result::Result<OrbitalElementSet, ElementError> {
    let (line1, line2) = match (record.tle_line1.as_deref(), record.tle_line2.as_deref()) {
        (Some(l1), Some(l2)) if !l1.trim().is_empty() && !l2.trim().is_empty() => (l1, l2),
        _ => return Err(ElementError::MissingTle { index }),
    };

    let catalog_id = parse_catalog_id(index, record.norad_cat_id.as_ref())?;

    let name = record
        .object_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("UNKNOWN")
        .to_string();

    // SATCAT enrichment wins over the GP record's own RCS field
    let rcs_size = match rcs_lookup.get(&catalog_id) {
        Some(size) if *size != RcsSize::Unknown => *size,
        _ => record
            .rcs_size
            .as_deref()
            .map(RcsSize::from_catalog)
            .unwrap_or(RcsSize::Unknown),
    };

    let identity = SatelliteIdentity {
        catalog_id,
        name,
        country_code: record.country_code.as_deref().unwrap_or("").trim().to_string(),
        rcs_size,
        object_type: record
            .object_type
            .as_deref()
            .map(ObjectType::from_catalog)
            .unwrap_or(ObjectType::Unknown),
    };

    OrbitalElementSet::from_tle(identity, line1, line2)
}

/// Validate and normalise raw catalog records
pub fn parse_records(
    records: &[RawElementRecord],
    rcs_lookup: &HashMap<u64, RcsSize>,
) -> ParsedCatalog {
    let mut catalog = ParsedCatalog::default();

    for (index, record) in records.iter().enumerate() {
        match parse_record(index, record, rcs_lookup) {
            Ok(set) => catalog.elements.push(set),
            Err(e) => {
                warn!("Rejected element record: {}", e);
                catalog.rejected.push(e);
            }
        }
    }

    if !catalog.rejected.is_empty() {
        debug!("{} of {} records rejected", catalog.rejected.len(), records.len());
    }
    info!(
        "Parsed {} element sets ({} rejected)",
        catalog.elements.len(),
        catalog.rejected.len()
    );

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fuzz_harness::fixtures::{gp_record, tle_lines, KeplerianSeed};

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn raw(value: serde_json::Value) -> RawElementRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_valid_record() {
        let seed = KeplerianSeed::circular(520.0, 97.5).with_raan(45.0);
        let record = raw(gp_record(41994, "LEMUR-2", "US", "SMALL", &seed, epoch()));

        let catalog = parse_records(&[record], &HashMap::new());
        assert!(catalog.rejected.is_empty());
        let set = &catalog.elements[0];
        assert_eq!(set.catalog_id(), 41994);
        assert_eq!(set.name(), "LEMUR-2");
        assert_eq!(set.rcs_size(), RcsSize::Small);
        assert_eq!(set.object_type(), ObjectType::Payload);
        assert!((set.inclination_deg() - 97.5).abs() < 1e-3);
        assert!((set.raan_deg() - 45.0).abs() < 1e-3);
        assert!((set.epoch() - epoch()).num_seconds().abs() <= 1);
        assert!((set.mean_altitude_km() - 520.0).abs() < 5.0, "alt {}", set.mean_altitude_km());
    }

    #[test]
    fn test_malformed_records_rejected_individually() {
        let seed = KeplerianSeed::circular(600.0, 51.6);
        let good = raw(gp_record(25544, "GOOD", "US", "LARGE", &seed, epoch()));

        let missing_tle = raw(serde_json::json!({"NORAD_CAT_ID": "1", "OBJECT_NAME": "NO TLE"}));

        let mut bad_id = good.clone();
        bad_id.norad_cat_id = Some(serde_json::json!("ABC"));

        let mut garbage_tle = good.clone();
        garbage_tle.norad_cat_id = Some(serde_json::json!(99));
        garbage_tle.tle_line2 = Some("2 this is not a tle".to_string());

        let catalog = parse_records(&[missing_tle, good, bad_id, garbage_tle], &HashMap::new());
        assert_eq!(catalog.elements.len(), 1);
        assert_eq!(catalog.rejected.len(), 3);
        assert_eq!(catalog.rejected[0], ElementError::MissingTle { index: 0 });
        assert!(matches!(catalog.rejected[1], ElementError::InvalidCatalogId { index: 2, .. }));
        assert!(matches!(catalog.rejected[2], ElementError::InvalidTle { catalog_id: 99, .. }));
    }

    #[test]
    fn test_numeric_catalog_id_and_defaults() {
        let seed = KeplerianSeed::circular(700.0, 98.0);
        let (l1, l2) = tle_lines(43613, &seed, epoch());
        let record = raw(serde_json::json!({
            "NORAD_CAT_ID": 43613,
            "TLE_LINE1": l1,
            "TLE_LINE2": l2,
        }));

        let catalog = parse_records(&[record], &HashMap::new());
        let set = &catalog.elements[0];
        assert_eq!(set.catalog_id(), 43613);
        assert_eq!(set.name(), "UNKNOWN");
        assert_eq!(set.country_code(), "");
        assert_eq!(set.rcs_size(), RcsSize::Unknown);
        assert_eq!(set.object_type(), ObjectType::Unknown);
    }

    #[test]
    fn test_satcat_lookup_overrides_record_rcs() {
        let seed = KeplerianSeed::circular(500.0, 97.0);
        let record = raw(gp_record(40379, "DOVE", "US", "LARGE", &seed, epoch()));
        let lookup = HashMap::from([(40379u64, RcsSize::Small)]);

        let catalog = parse_records(&[record], &lookup);
        assert_eq!(catalog.elements[0].rcs_size(), RcsSize::Small);
    }

    #[test]
    fn test_rcs_and_object_type_mapping() {
        assert_eq!(RcsSize::from_catalog("small"), RcsSize::Small);
        assert_eq!(RcsSize::from_catalog(""), RcsSize::Unknown);
        assert_eq!(RcsSize::Medium.to_string(), "MEDIUM");
        assert_eq!(ObjectType::from_catalog("ROCKET BODY"), ObjectType::RocketBody);
        assert_eq!(ObjectType::from_catalog("TBA"), ObjectType::Unknown);
    }

    #[test]
    fn test_parsed_set_clones_and_formats() {
        let seed = KeplerianSeed::circular(550.0, 53.0);
        let record = raw(gp_record(44713, "STARLINK-1007", "US", "LARGE", &seed, epoch()));
        let set = parse_records(&[record], &HashMap::new()).elements.remove(0);

        let copy = set.clone();
        assert_eq!(copy.identity(), set.identity());
        assert_eq!(copy.tle_lines(), set.tle_lines());
        assert_eq!(copy.epoch(), set.epoch());
        assert!(copy.constants().is_ok());

        let debug = format!("{:?}", copy);
        assert!(debug.starts_with("OrbitalElementSet"), "{}", debug);
        assert!(debug.contains("STARLINK-1007"));
    }

    #[test]
    fn test_mistyped_fields_read_leniently() {
        let record = raw(serde_json::json!({
            "NORAD_CAT_ID": 12,
            "OBJECT_NAME": 12345,
            "COUNTRY_CODE": {"code": "US"},
            "RCS_SIZE": null,
        }));
        assert_eq!(record.object_name.as_deref(), Some("12345"));
        assert!(record.country_code.is_none());
        assert!(record.rcs_size.is_none());
        assert!(record.tle_line1.is_none());

        let empty = RawElementRecord::from_value(serde_json::json!("not a record"));
        assert!(empty.norad_cat_id.is_none());
        let catalog = parse_records(&[record, empty], &HashMap::new());
        assert_eq!(catalog.rejected.len(), 2);
    }
}
