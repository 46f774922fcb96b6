//! Element-set data sources
//!
//! The pipeline only sees the [`DataSource`] trait. Fetching, caching and
//! provider authentication live behind it, outside the engine.

use crate::Result;
use orbital_mechanics::{RawElementRecord, RcsSize};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub trait DataSource {
    /// GP-class element records, unvalidated
    fn element_records(&self) -> Result<Vec<RawElementRecord>>;

    /// Catalog id → RCS size from the satellite catalog; may be empty
    fn rcs_lookup(&self) -> Result<HashMap<u64, RcsSize>>;
}

/// SATCAT row; only the fields used for enrichment
#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawSatcatRecord {
    norad_cat_id: Option<serde_json::Value>,
    rcs_size: Option<String>,
}

fn catalog_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// GP and SATCAT JSON arrays on disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    gp_path: PathBuf,
    satcat_path: Option<PathBuf>,
}

impl JsonFileSource {
    pub fn new(gp_path: impl Into<PathBuf>) -> Self {
        Self {
            gp_path: gp_path.into(),
            satcat_path: None,
        }
    }

    pub fn with_satcat(mut self, satcat_path: impl Into<PathBuf>) -> Self {
        self.satcat_path = Some(satcat_path.into());
        self
    }

    fn read_array<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl DataSource for JsonFileSource {
    fn element_records(&self) -> Result<Vec<RawElementRecord>> {
        info!("Loading GP records from {:?}", self.gp_path);
        let rows: Vec<serde_json::Value> = Self::read_array(&self.gp_path)?;
        let records: Vec<RawElementRecord> =
            rows.into_iter().map(RawElementRecord::from_value).collect();
        info!("Loaded {} GP records", records.len());
        Ok(records)
    }

    fn rcs_lookup(&self) -> Result<HashMap<u64, RcsSize>> {
        let Some(path) = &self.satcat_path else {
            return Ok(HashMap::new());
        };

        info!("Loading SATCAT from {:?}", path);
        let rows: Vec<RawSatcatRecord> = Self::read_array(path)?;

        let mut lookup = HashMap::with_capacity(rows.len());
        let mut skipped = 0;
        for row in rows {
            match (row.norad_cat_id.as_ref().and_then(catalog_id), row.rcs_size) {
                (Some(id), Some(rcs)) => {
                    lookup.insert(id, RcsSize::from_catalog(&rcs));
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("{} SATCAT rows without catalog id or RCS size", skipped);
        }
        info!("Loaded RCS sizes for {} objects", lookup.len());
        Ok(lookup)
    }
}

/// Records already resident in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub records: Vec<RawElementRecord>,
    pub rcs: HashMap<u64, RcsSize>,
}

impl InMemorySource {
    pub fn new(records: Vec<RawElementRecord>) -> Self {
        Self {
            records,
            rcs: HashMap::new(),
        }
    }

    /// Build from catalog-shaped JSON values
    pub fn from_values(values: Vec<serde_json::Value>) -> Self {
        Self::new(values.into_iter().map(RawElementRecord::from_value).collect())
    }
}

impl DataSource for InMemorySource {
    fn element_records(&self) -> Result<Vec<RawElementRecord>> {
        Ok(self.records.clone())
    }

    fn rcs_lookup(&self) -> Result<HashMap<u64, RcsSize>> {
        Ok(self.rcs.clone())
    }
}
