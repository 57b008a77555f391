//! Specification facts: normalized numeric ground truth about the domain.
//!
//! Primary facts come straight from directives (`latitude_min`, `speed_max`,
//! `latitude_precision`, `training_records`, ...). Derived facts
//! (`geographic_area_km2`, `area_category`, `*_is_small_range`,
//! `vehicle_type`) are computed from them by `SpecParser`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// -----------------------------------------------------------------------------
// Fact vocabulary
// -----------------------------------------------------------------------------

pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const SPEED: &str = "speed";
pub const SATELLITES: &str = "satellites";

pub const FACT_LATITUDE_MIN: &str = "latitude_min";
pub const FACT_LATITUDE_MAX: &str = "latitude_max";
pub const FACT_LATITUDE_RANGE: &str = "latitude_range";
pub const FACT_LONGITUDE_MIN: &str = "longitude_min";
pub const FACT_LONGITUDE_MAX: &str = "longitude_max";
pub const FACT_LONGITUDE_RANGE: &str = "longitude_range";
pub const FACT_SPEED_MIN: &str = "speed_min";
pub const FACT_SPEED_MAX: &str = "speed_max";
pub const FACT_SATELLITES_MAX: &str = "satellites_max";
pub const FACT_TRAINING_RECORDS: &str = "training_records";

pub const FACT_LATITUDE_SMALL: &str = "latitude_is_small_range";
pub const FACT_LONGITUDE_SMALL: &str = "longitude_is_small_range";
pub const FACT_AREA_KM2: &str = "geographic_area_km2";
pub const FACT_AREA_CATEGORY: &str = "area_category";
pub const FACT_VEHICLE_TYPE: &str = "vehicle_type";

/// Coarse size bucket of the covered area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaCategory {
    /// < 100 km²
    Micro,
    /// < 10 000 km²
    Small,
    /// < 1 000 000 km²
    Medium,
    /// everything else
    Large,
}

impl AreaCategory {
    pub fn as_index(self) -> u8 {
        match self {
            Self::Micro => 0,
            Self::Small => 1,
            Self::Medium => 2,
            Self::Large => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Micro),
            1 => Some(Self::Small),
            2 => Some(Self::Medium),
            3 => Some(Self::Large),
            _ => None,
        }
    }
}

/// Usage class bucketed from the maximum speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageClass {
    Urban,
    Highway,
    HighSpeed,
}

impl UsageClass {
    pub fn as_index(self) -> u8 {
        match self {
            Self::Urban => 0,
            Self::Highway => 1,
            Self::HighSpeed => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoRegion {
    SouthAmerica,
    Europe,
    #[default]
    Unknown,
}

/// Where a fact set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactsOrigin {
    /// Extracted from a specification text.
    Parsed,
    /// Substituted because the specification was missing or yielded nothing.
    ConservativeDefault,
}

// -----------------------------------------------------------------------------
// Fact set
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecFacts {
    pub origin: FactsOrigin,
    #[serde(default)]
    pub region: GeoRegion,
    values: BTreeMap<String, f64>,
}

impl SpecFacts {
    /// An empty parsed fact set (no facts known yet).
    pub fn empty() -> Self {
        Self {
            origin: FactsOrigin::Parsed,
            region: GeoRegion::Unknown,
            values: BTreeMap::new(),
        }
    }

    /// The fixed fact set used when nothing is known about the domain.
    ///
    /// Wide ranges, largest area bucket, no small-range axis: every
    /// specification-gated rewrite evaluates its precondition to false.
    pub fn conservative_default() -> Self {
        let mut facts = Self {
            origin: FactsOrigin::ConservativeDefault,
            region: GeoRegion::Unknown,
            values: BTreeMap::new(),
        };
        facts.insert(FACT_LATITUDE_RANGE, 180.0);
        facts.insert(FACT_LONGITUDE_RANGE, 360.0);
        facts.insert(FACT_AREA_KM2, 50_000_000.0);
        facts.insert(FACT_AREA_CATEGORY, AreaCategory::Large.as_index() as f64);
        facts.insert(FACT_VEHICLE_TYPE, UsageClass::Highway.as_index() as f64);
        facts.insert(FACT_LATITUDE_SMALL, 0.0);
        facts.insert(FACT_LONGITUDE_SMALL, 0.0);
        facts
    }

    pub fn is_default(&self) -> bool {
        self.origin == FactsOrigin::ConservativeDefault
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Lookup used when facts are fed to classifiers: absent facts read as 0.0.
    pub fn value_or_zero(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    // -------------------------------------------------------------------------
    // Typed views
    // -------------------------------------------------------------------------

    pub fn area_km2(&self) -> Option<f64> {
        self.get(FACT_AREA_KM2)
    }

    pub fn area_category(&self) -> Option<AreaCategory> {
        self.get(FACT_AREA_CATEGORY)
            .and_then(|v| AreaCategory::from_index(v.round().clamp(0.0, u8::MAX as f64) as u8))
    }

    /// `true` only when the axis was flagged small-range.
    pub fn is_small_range(&self, axis: &str) -> bool {
        self.get(&format!("{axis}_is_small_range"))
            .is_some_and(|v| v >= 0.5)
    }

    pub fn both_axes_small(&self) -> bool {
        self.is_small_range(LATITUDE) && self.is_small_range(LONGITUDE)
    }

    /// `(min, max)` of a declared range.
    pub fn bounds(&self, name: &str) -> Option<(f64, f64)> {
        Some((self.get(&format!("{name}_min"))?, self.get(&format!("{name}_max"))?))
    }

    /// Geographic center `(lat, lon)` when both coordinate ranges are declared.
    pub fn center(&self) -> Option<(f64, f64)> {
        let (lat_min, lat_max) = self.bounds(LATITUDE)?;
        let (lon_min, lon_max) = self.bounds(LONGITUDE)?;
        Some(((lat_min + lat_max) / 2.0, (lon_min + lon_max) / 2.0))
    }
}

impl Default for SpecFacts {
    fn default() -> Self {
        Self::conservative_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservative_default_is_large_and_not_small() {
        let facts = SpecFacts::conservative_default();
        assert!(facts.is_default());
        assert_eq!(facts.area_category(), Some(AreaCategory::Large));
        assert!(!facts.is_small_range(LATITUDE));
        assert!(!facts.is_small_range(LONGITUDE));
        assert!(facts.center().is_none());
    }

    #[test]
    fn missing_facts_read_as_zero() {
        let facts = SpecFacts::empty();
        assert_eq!(facts.value_or_zero("hdop_max"), 0.0);
        assert_eq!(facts.get("hdop_max"), None);
        assert!(!facts.both_axes_small());
    }

    #[test]
    fn center_is_midpoint_of_bounds() {
        let mut facts = SpecFacts::empty();
        facts.insert(FACT_LATITUDE_MIN, -16.41);
        facts.insert(FACT_LATITUDE_MAX, -16.31);
        facts.insert(FACT_LONGITUDE_MIN, -71.61);
        facts.insert(FACT_LONGITUDE_MAX, -71.53);
        let (lat, lon) = facts.center().expect("center");
        assert!((lat - -16.36).abs() < 1e-9);
        assert!((lon - -71.57).abs() < 1e-9);
    }

    #[test]
    fn area_category_clamps_out_of_vocabulary_values() {
        let mut facts = SpecFacts::empty();
        facts.insert(FACT_AREA_CATEGORY, 7.0);
        assert_eq!(facts.area_category(), None);
        facts.insert(FACT_AREA_CATEGORY, 1.0);
        assert_eq!(facts.area_category(), Some(AreaCategory::Small));
    }
}
