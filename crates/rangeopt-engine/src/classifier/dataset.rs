//! Synthetic labeled training data.
//!
//! The bank is trained on rows drawn from a small table of canonical regimes
//! (micro, medium, global zones). Every threshold lives in [`SyntheticRegime`]
//! so tests and deployments can perturb it.

use super::rng::XorShift64;
use crate::error::{EngineError, Result};
use crate::optimization::{column_index, OptimizationId, INPUT_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Half-open integer jitter range for one code feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    pub feature: String,
    pub lo: i64,
    pub hi: i64,
}

impl Jitter {
    fn new(feature: &str, lo: i64, hi: i64) -> Self {
        Self {
            feature: feature.to_string(),
            lo,
            hi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRegime {
    pub name: String,
    pub samples: usize,
    pub code_features: Vec<Jitter>,
    /// Uniform area range in km².
    pub area_km2: (f64, f64),
    /// Half-open area category range.
    pub area_category: (i64, i64),
    pub small_range: bool,
    /// Half-open vehicle type range.
    pub vehicle_type: (i64, i64),
    /// Probability that each optimization is labeled "apply".
    pub label_probability: BTreeMap<OptimizationId, f64>,
}

fn labels(probabilities: [f64; 6]) -> BTreeMap<OptimizationId, f64> {
    OptimizationId::ALL.into_iter().zip(probabilities).collect()
}

impl SyntheticRegime {
    pub fn micro() -> Self {
        Self {
            name: "micro".to_string(),
            samples: 50,
            code_features: vec![
                Jitter::new("trigonometric_count", 2, 8),
                Jitter::new("sqrt_operations_count", 1, 4),
                Jitter::new("distance_calculations_count", 1, 5),
                Jitter::new("double_usage_count", 3, 10),
                Jitter::new("range_checks_count", 2, 8),
                Jitter::new("cyclomatic_complexity", 5, 15),
                Jitter::new("lines_of_code", 100, 500),
            ],
            area_km2: (10.0, 200.0),
            area_category: (0, 1),
            small_range: true,
            vehicle_type: (0, 2),
            label_probability: labels([1.0; 6]),
        }
    }

    pub fn medium() -> Self {
        Self {
            name: "medium".to_string(),
            samples: 30,
            code_features: vec![
                Jitter::new("trigonometric_count", 3, 12),
                Jitter::new("sqrt_operations_count", 2, 6),
                Jitter::new("distance_calculations_count", 2, 8),
                Jitter::new("double_usage_count", 5, 15),
                Jitter::new("range_checks_count", 4, 12),
                Jitter::new("cyclomatic_complexity", 8, 25),
                Jitter::new("lines_of_code", 200, 800),
            ],
            area_km2: (1_000.0, 50_000.0),
            area_category: (1, 2),
            small_range: false,
            vehicle_type: (1, 3),
            label_probability: labels([0.7, 0.6, 0.4, 0.7, 0.5, 0.6]),
        }
    }

    pub fn global() -> Self {
        Self {
            name: "global".to_string(),
            samples: 20,
            code_features: vec![
                Jitter::new("trigonometric_count", 5, 20),
                Jitter::new("sqrt_operations_count", 3, 10),
                Jitter::new("distance_calculations_count", 3, 15),
                Jitter::new("double_usage_count", 8, 25),
                Jitter::new("range_checks_count", 6, 20),
                Jitter::new("cyclomatic_complexity", 15, 40),
                Jitter::new("lines_of_code", 500, 2000),
            ],
            area_km2: (100_000.0, 50_000_000.0),
            area_category: (2, 4),
            small_range: false,
            vehicle_type: (0, 3),
            label_probability: labels([0.3, 0.0, 0.0, 0.4, 0.2, 0.3]),
        }
    }

    fn draw_row(&self, rng: &mut XorShift64) -> Vec<f64> {
        let mut row = vec![0.0; INPUT_COLUMNS.len()];
        for jitter in &self.code_features {
            let value = rng.gen_range_i64(jitter.lo, jitter.hi) as f64;
            if let Some(idx) = column_index(&jitter.feature) {
                row[idx] = value;
            }
        }
        let small = if self.small_range { 1.0 } else { 0.0 };
        let mut set = |name: &str, value: f64| {
            if let Some(idx) = column_index(name) {
                row[idx] = value;
            }
        };
        set("geographic_area_km2", rng.uniform(self.area_km2.0, self.area_km2.1));
        set(
            "area_category",
            rng.gen_range_i64(self.area_category.0, self.area_category.1) as f64,
        );
        set("latitude_is_small_range", small);
        set("longitude_is_small_range", small);
        set(
            "vehicle_type",
            rng.gen_range_i64(self.vehicle_type.0, self.vehicle_type.1) as f64,
        );
        row
    }
}

/// Feature rows plus one label column per optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub rows: Vec<Vec<f64>>,
    pub labels: BTreeMap<OptimizationId, Vec<bool>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Draw every regime's samples, in table order, from one seeded stream.
    pub fn synthesize(regimes: &[SyntheticRegime], seed: u64) -> Result<Self> {
        let mut rng = XorShift64::new(seed);
        let mut rows = Vec::new();
        let mut labels: BTreeMap<OptimizationId, Vec<bool>> = OptimizationId::ALL
            .into_iter()
            .map(|id| (id, Vec::new()))
            .collect();

        for regime in regimes {
            for _ in 0..regime.samples {
                rows.push(regime.draw_row(&mut rng));
                for (id, column) in labels.iter_mut() {
                    let p = regime.label_probability.get(id).copied().unwrap_or(0.0);
                    column.push(rng.bernoulli(p));
                }
            }
        }

        if rows.is_empty() {
            return Err(EngineError::EmptyTrainingSet);
        }
        tracing::debug!(rows = rows.len(), regimes = regimes.len(), "synthesized training set");
        Ok(Self { rows, labels })
    }
}

/// Random-forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 8,
            min_samples_split: 2,
        }
    }
}

/// Gradient-boosting hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }
}

/// Linear max-margin (hinge loss, L2) hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
}

impl Default for MarginParams {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.1,
            regularization: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    /// Fraction of rows held out per learner to log an accuracy.
    pub holdout_fraction: f64,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
    pub margin: MarginParams,
    pub regimes: Vec<SyntheticRegime>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            holdout_fraction: 0.2,
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
            margin: MarginParams::default(),
            regimes: vec![
                SyntheticRegime::micro(),
                SyntheticRegime::medium(),
                SyntheticRegime::global(),
            ],
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.holdout_fraction) {
            return Err(EngineError::InvalidConfig(format!(
                "holdout_fraction must be in [0, 1), got {}",
                self.holdout_fraction
            )));
        }
        if self.regimes.iter().map(|r| r.samples).sum::<usize>() == 0 {
            return Err(EngineError::InvalidConfig(
                "training regimes produce no samples".to_string(),
            ));
        }
        if self.forest.trees == 0 || self.boosting.rounds == 0 || self.margin.epochs == 0 {
            return Err(EngineError::InvalidConfig(
                "trees, rounds and epochs must be positive".to_string(),
            ));
        }
        for regime in &self.regimes {
            if regime.area_km2.0 > regime.area_km2.1 {
                return Err(EngineError::InvalidConfig(format!(
                    "regime `{}` has an inverted area range",
                    regime.name
                )));
            }
            if let Some((id, p)) = regime
                .label_probability
                .iter()
                .find(|(_, p)| !(0.0..=1.0).contains(*p))
            {
                return Err(EngineError::InvalidConfig(format!(
                    "regime `{}` has label probability {p} for {id}",
                    regime.name
                )));
            }
        }
        Ok(())
    }
}
