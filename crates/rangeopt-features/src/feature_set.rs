use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix of the per-line-of-code normalized variant of a count.
pub const PER_LOC_SUFFIX: &str = "_per_loc";

pub const LINES_OF_CODE: &str = "lines_of_code";

/// Named numeric signals extracted from one source text.
///
/// Lookups never fail: a feature that was not extracted reads as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub lines_of_code: usize,
    values: BTreeMap<String, f64>,
}

impl FeatureSet {
    pub fn new(lines_of_code: usize) -> Self {
        let mut set = Self {
            lines_of_code,
            values: BTreeMap::new(),
        };
        set.values.insert(LINES_OF_CODE.to_string(), lines_of_code as f64);
        set
    }

    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Insert a count together with its `*_per_loc` variant.
    pub fn insert_count(&mut self, name: &str, count: usize) {
        let per_loc = if self.lines_of_code > 0 {
            count as f64 / self.lines_of_code as f64
        } else {
            0.0
        };
        self.values.insert(name.to_string(), count as f64);
        self.values.insert(format!("{name}{PER_LOC_SUFFIX}"), per_loc);
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
}
