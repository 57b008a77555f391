//! The fixed optimization catalogue.
//!
//! Every optimization the engine knows how to attempt has a stable identifier,
//! a learner kind, the input columns its classifier reads, and an explanation
//! generator. The catalogue is immutable and shared by every analysis.

use crate::error::EngineError;
use rangeopt_features::FeatureSet;
use rangeopt_spec::facts::{FACT_AREA_KM2, FACT_LATITUDE_SMALL, FACT_LONGITUDE_SMALL};
use rangeopt_spec::SpecFacts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptimizationId {
    #[serde(rename = "use_float_instead_double")]
    NarrowCoordinateType,
    #[serde(rename = "eliminate_range_checks")]
    EliminateRangeChecks,
    #[serde(rename = "use_euclidean_approx")]
    PlanarDistance,
    #[serde(rename = "eliminate_null_checks")]
    EliminateNullChecks,
    #[serde(rename = "compress_data_types")]
    CompressDataTypes,
    #[serde(rename = "precompute_constants")]
    PrecomputeConstants,
}

impl OptimizationId {
    /// Declaration order. Templates are applied in this order, never in
    /// confidence order.
    pub const ALL: [OptimizationId; 6] = [
        OptimizationId::NarrowCoordinateType,
        OptimizationId::EliminateRangeChecks,
        OptimizationId::PlanarDistance,
        OptimizationId::EliminateNullChecks,
        OptimizationId::CompressDataTypes,
        OptimizationId::PrecomputeConstants,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationId::NarrowCoordinateType => "use_float_instead_double",
            OptimizationId::EliminateRangeChecks => "eliminate_range_checks",
            OptimizationId::PlanarDistance => "use_euclidean_approx",
            OptimizationId::EliminateNullChecks => "eliminate_null_checks",
            OptimizationId::CompressDataTypes => "compress_data_types",
            OptimizationId::PrecomputeConstants => "precompute_constants",
        }
    }

    /// Aggressive optimizations are the ones whose safety depends on declared
    /// ranges; their templates refuse to edit without supporting facts.
    pub fn is_aggressive(self) -> bool {
        !matches!(self, OptimizationId::EliminateNullChecks)
    }

    pub fn spec(self) -> &'static OptimizationSpec {
        &CATALOGUE[self as usize]
    }
}

impl fmt::Display for OptimizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptimizationId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| EngineError::UnknownOptimization(s.to_string()))
    }
}

/// Which decision procedure backs an optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerKind {
    RandomForest,
    GradientBoosting,
    LinearMargin,
}

/// Classifier input columns, in row order.
pub const INPUT_COLUMNS: [&str; 12] = [
    "trigonometric_count",
    "sqrt_operations_count",
    "distance_calculations_count",
    "double_usage_count",
    "range_checks_count",
    "cyclomatic_complexity",
    "lines_of_code",
    "geographic_area_km2",
    "area_category",
    "latitude_is_small_range",
    "longitude_is_small_range",
    "vehicle_type",
];

pub fn column_index(name: &str) -> Option<usize> {
    INPUT_COLUMNS.iter().position(|c| *c == name)
}

/// Combined read-only view over one source's features and its facts.
///
/// Facts shadow features of the same name; anything absent reads as `0.0`.
#[derive(Debug, Clone, Copy)]
pub struct Inputs<'a> {
    pub features: &'a FeatureSet,
    pub facts: &'a SpecFacts,
}

impl<'a> Inputs<'a> {
    pub fn new(features: &'a FeatureSet, facts: &'a SpecFacts) -> Self {
        Self { features, facts }
    }

    pub fn get(&self, name: &str) -> f64 {
        self.facts
            .get(name)
            .unwrap_or_else(|| self.features.get(name))
    }

    /// Project onto [`INPUT_COLUMNS`].
    pub fn row(&self) -> Vec<f64> {
        INPUT_COLUMNS.iter().map(|c| self.get(c)).collect()
    }
}

pub struct OptimizationSpec {
    pub id: OptimizationId,
    pub learner: LearnerKind,
    pub inputs: &'static [&'static str],
    pub summary: &'static str,
    explain: fn(bool, &Inputs<'_>) -> String,
}

impl OptimizationSpec {
    /// Human-readable rationale for a decision, including its confidence.
    pub fn explain(&self, apply: bool, inputs: &Inputs<'_>, confidence: f64) -> String {
        format!(
            "{} (confidence: {:.1}%)",
            (self.explain)(apply, inputs),
            confidence * 100.0
        )
    }
}

impl fmt::Debug for OptimizationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizationSpec")
            .field("id", &self.id)
            .field("learner", &self.learner)
            .finish_non_exhaustive()
    }
}

static CATALOGUE: [OptimizationSpec; 6] = [
    OptimizationSpec {
        id: OptimizationId::NarrowCoordinateType,
        learner: LearnerKind::RandomForest,
        inputs: &INPUT_COLUMNS,
        summary: "narrow coordinate types from double to float",
        explain: explain_narrow,
    },
    OptimizationSpec {
        id: OptimizationId::EliminateRangeChecks,
        learner: LearnerKind::GradientBoosting,
        inputs: &INPUT_COLUMNS,
        summary: "drop latitude/longitude range guards",
        explain: explain_range_checks,
    },
    OptimizationSpec {
        id: OptimizationId::PlanarDistance,
        learner: LearnerKind::RandomForest,
        inputs: &INPUT_COLUMNS,
        summary: "replace great-circle distance with a planar approximation",
        explain: explain_planar,
    },
    OptimizationSpec {
        id: OptimizationId::EliminateNullChecks,
        learner: LearnerKind::LinearMargin,
        inputs: &INPUT_COLUMNS,
        summary: "drop null pointer guards",
        explain: explain_null_checks,
    },
    OptimizationSpec {
        id: OptimizationId::CompressDataTypes,
        learner: LearnerKind::RandomForest,
        inputs: &INPUT_COLUMNS,
        summary: "store speed and satellite counts in a single byte",
        explain: explain_compress,
    },
    OptimizationSpec {
        id: OptimizationId::PrecomputeConstants,
        learner: LearnerKind::GradientBoosting,
        inputs: &INPUT_COLUMNS,
        summary: "inject precomputed zone constants",
        explain: explain_constants,
    },
];

fn explain_narrow(apply: bool, inputs: &Inputs<'_>) -> String {
    let area = inputs.get(FACT_AREA_KM2);
    if apply {
        format!("area of {area:.1} km² lets float precision hold sub-meter resolution")
    } else {
        format!("area of {area:.1} km² needs double precision")
    }
}

fn explain_range_checks(apply: bool, inputs: &Inputs<'_>) -> String {
    let small = inputs.get(FACT_LATITUDE_SMALL) >= 0.5 && inputs.get(FACT_LONGITUDE_SMALL) >= 0.5;
    match (apply, small) {
        (true, true) => "declared coordinate ranges are narrower than the guarded bounds".to_string(),
        (true, false) => "range guards look redundant, but coordinate ranges are wide".to_string(),
        (false, _) => "coordinate ranges are wide; validation guards stay".to_string(),
    }
}

fn explain_planar(apply: bool, inputs: &Inputs<'_>) -> String {
    let area = inputs.get(FACT_AREA_KM2);
    if apply {
        format!("zone of {area:.1} km² is small enough for a flat-earth approximation")
    } else {
        format!("zone of {area:.1} km² needs the great-circle formula")
    }
}

fn explain_null_checks(apply: bool, inputs: &Inputs<'_>) -> String {
    let cc = inputs.get("cyclomatic_complexity");
    if apply {
        format!("pointer guards add branches to a hot path (cyclomatic complexity {cc:.0})")
    } else {
        "pointer guards stay for robustness".to_string()
    }
}

fn explain_compress(apply: bool, _inputs: &Inputs<'_>) -> String {
    if apply {
        "declared maxima fit into a single byte".to_string()
    } else {
        "declared maxima need wider storage".to_string()
    }
}

fn explain_constants(apply: bool, inputs: &Inputs<'_>) -> String {
    let trig = inputs.get("trigonometric_count");
    if apply {
        format!("{trig:.0} trigonometric calls share one fixed zone center")
    } else {
        "zone is too large for a single reference point".to_string()
    }
}
