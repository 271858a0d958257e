//! Somalia location hierarchy lookup table
//!
//! Maps a location code (the first match value of a normal location code) to
//! its value at every level of the hierarchy, and a phone operator to the
//! zone it serves. A value of `NC` means the location has no meaningful value
//! at that level (e.g. the Mogadishu sub-district of a town outside Mogadishu).
//!
//! ```json
//! {
//!   "Locations": {
//!     "hodan": {"MogadishuSubDistrict": "hodan", "District": "mogadishu",
//!               "Region": "banadir", "State": "banadir", "Zone": "scz"}
//!   },
//!   "OperatorZones": {"hormuud": "scz", "telesom": "nwz"}
//! }
//! ```

use rqa_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// One level of the location hierarchy, finest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationLevel {
    MogadishuSubDistrict,
    District,
    Region,
    State,
    Zone,
}

impl LocationLevel {
    /// All levels in the order location plans list their configurations
    pub const ALL: [LocationLevel; 5] = [
        LocationLevel::MogadishuSubDistrict,
        LocationLevel::District,
        LocationLevel::Region,
        LocationLevel::State,
        LocationLevel::Zone,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocationEntry {
    pub mogadishu_sub_district: String,
    pub district: String,
    pub region: String,
    pub state: String,
    pub zone: String,
}

impl LocationEntry {
    pub fn at(&self, level: LocationLevel) -> &str {
        match level {
            LocationLevel::MogadishuSubDistrict => &self.mogadishu_sub_district,
            LocationLevel::District => &self.district,
            LocationLevel::Region => &self.region,
            LocationLevel::State => &self.state,
            LocationLevel::Zone => &self.zone,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocationTable {
    locations: HashMap<String, LocationEntry>,
    #[serde(default)]
    operator_zones: HashMap<String, String>,
}

impl LocationTable {
    pub fn new(
        locations: HashMap<String, LocationEntry>,
        operator_zones: HashMap<String, String>,
    ) -> Self {
        Self {
            locations,
            operator_zones,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read location table {}: {}", path.display(), e))
        })?;
        let table = Self::from_json_str(&content)?;
        info!(
            "Loaded {} locations and {} operator zones from {}",
            table.locations.len(),
            table.operator_zones.len(),
            path.display()
        );
        Ok(table)
    }

    /// Value of `location` at `level`
    pub fn value_at(&self, location: &str, level: LocationLevel) -> Result<&str> {
        self.locations
            .get(location)
            .map(|entry| entry.at(level))
            .ok_or_else(|| Error::InvalidInput(format!("location code '{}' is not in the location table", location)))
    }

    /// Zone served by a phone operator
    pub fn zone_for_operator(&self, operator: &str) -> Result<&str> {
        self.operator_zones
            .get(operator)
            .map(String::as_str)
            .ok_or_else(|| Error::InvalidInput(format!("operator '{}' has no zone in the location table", operator)))
    }
}
