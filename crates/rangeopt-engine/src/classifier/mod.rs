//! The optimization classifier bank.
//!
//! One independently trained binary learner per catalogued optimization, all
//! reading the same standardized input row. A bank is constructed untrained,
//! trained once (`&mut self`), and then shared read-only (typically behind an
//! `Arc`) by any number of concurrent analyses.

pub mod dataset;
pub mod learners;
pub mod rng;
pub mod scaler;

use crate::error::{EngineError, Result};
use crate::optimization::{Inputs, OptimizationId, INPUT_COLUMNS};
use dataset::{Dataset, TrainingConfig};
use learners::{BinaryClassifier, Learner};
use rangeopt_features::FeatureSet;
use rangeopt_spec::SpecFacts;
use rng::XorShift64;
use scaler::StandardScaler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub use dataset::SyntheticRegime;

/// One classifier's verdict for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub optimization: OptimizationId,
    pub apply: bool,
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub samples: usize,
    pub columns: usize,
    pub seed: u64,
    /// Accuracy on the held-out split; absent when nothing was held out.
    pub holdout_accuracy: BTreeMap<OptimizationId, Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierBank {
    config: TrainingConfig,
    columns: Vec<String>,
    scaler: Option<StandardScaler>,
    learners: BTreeMap<OptimizationId, Learner>,
    summary: Option<TrainingSummary>,
}

impl ClassifierBank {
    /// An untrained bank. Prediction fails until [`Self::train`] succeeds.
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            columns: INPUT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            scaler: None,
            learners: BTreeMap::new(),
            summary: None,
        }
    }

    /// Construct and train in one step.
    pub fn trained(config: TrainingConfig) -> Result<Self> {
        let mut bank = Self::new(config);
        bank.train()?;
        Ok(bank)
    }

    pub fn is_trained(&self) -> bool {
        self.scaler.is_some() && self.learners.len() == OptimizationId::ALL.len()
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn summary(&self) -> Option<&TrainingSummary> {
        self.summary.as_ref()
    }

    /// Train on the configured synthetic regimes.
    pub fn train(&mut self) -> Result<&TrainingSummary> {
        self.config.validate()?;
        let dataset = Dataset::synthesize(&self.config.regimes, self.config.seed)?;
        self.train_on(&dataset)
    }

    /// Train on an explicit dataset (rows in [`INPUT_COLUMNS`] order).
    pub fn train_on(&mut self, dataset: &Dataset) -> Result<&TrainingSummary> {
        if dataset.is_empty() {
            return Err(EngineError::EmptyTrainingSet);
        }
        if let Some(row) = dataset.rows.iter().find(|r| r.len() != self.columns.len()) {
            return Err(EngineError::ShapeMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }

        let scaler = StandardScaler::fit(&dataset.rows);
        let scaled = scaler.transform_all(&dataset.rows);
        let (train_idx, test_idx) = holdout_split(
            scaled.len(),
            self.config.holdout_fraction,
            self.config.seed,
        );

        let mut learners = BTreeMap::new();
        let mut holdout_accuracy = BTreeMap::new();
        for (stream, id) in OptimizationId::ALL.into_iter().enumerate() {
            let labels = dataset
                .labels
                .get(&id)
                .ok_or_else(|| EngineError::InvalidConfig(format!("dataset has no labels for {id}")))?;

            let rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| scaled[i].clone()).collect();
            let train_labels: Vec<bool> = train_idx.iter().map(|&i| labels[i]).collect();
            let mut learner = Learner::new(id.spec().learner, &self.config, stream as u64);
            learner.fit(&rows, &train_labels)?;

            let accuracy = (!test_idx.is_empty()).then(|| {
                let hits = test_idx
                    .iter()
                    .filter(|&&i| learner.decide(&scaled[i]).apply == labels[i])
                    .count();
                hits as f64 / test_idx.len() as f64
            });
            tracing::debug!(
                optimization = %id,
                learner = ?learner.kind(),
                holdout_accuracy = ?accuracy,
                "trained classifier"
            );
            holdout_accuracy.insert(id, accuracy);
            learners.insert(id, learner);
        }

        self.scaler = Some(scaler);
        self.learners = learners;
        let summary = self.summary.insert(TrainingSummary {
            samples: dataset.len(),
            columns: self.columns.len(),
            seed: self.config.seed,
            holdout_accuracy,
        });
        tracing::info!(samples = summary.samples, "classifier bank trained");
        Ok(&*summary)
    }

    /// One prediction per catalogued optimization, keyed in declaration order.
    pub fn predict(
        &self,
        features: &FeatureSet,
        facts: &SpecFacts,
    ) -> Result<BTreeMap<OptimizationId, Prediction>> {
        let row = self.scaled_row(features, facts)?;
        let inputs = Inputs::new(features, facts);
        OptimizationId::ALL
            .into_iter()
            .map(|id| Ok((id, self.predict_scaled(id, &row, &inputs)?)))
            .collect()
    }

    pub fn predict_one(
        &self,
        id: OptimizationId,
        features: &FeatureSet,
        facts: &SpecFacts,
    ) -> Result<Prediction> {
        let row = self.scaled_row(features, facts)?;
        self.predict_scaled(id, &row, &Inputs::new(features, facts))
    }

    fn scaled_row(&self, features: &FeatureSet, facts: &SpecFacts) -> Result<Vec<f64>> {
        let scaler = self.scaler.as_ref().ok_or(EngineError::NotTrained)?;
        let inputs = Inputs::new(features, facts);
        let raw: Vec<f64> = self.columns.iter().map(|c| inputs.get(c)).collect();
        if scaler.width() != raw.len() {
            return Err(EngineError::ShapeMismatch {
                expected: scaler.width(),
                actual: raw.len(),
            });
        }
        Ok(scaler.transform(&raw))
    }

    fn predict_scaled(&self, id: OptimizationId, row: &[f64], inputs: &Inputs<'_>) -> Result<Prediction> {
        let learner = self.learners.get(&id).ok_or(EngineError::NotTrained)?;
        let decision = learner.decide(row);
        Ok(Prediction {
            optimization: id,
            apply: decision.apply,
            confidence: decision.confidence,
            rationale: id.spec().explain(decision.apply, inputs, decision.confidence),
        })
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if !self.is_trained() {
            return Err(EngineError::NotTrained);
        }
        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer(file, self)?;
        tracing::info!(path = %path.display(), "saved classifier bank");
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let file = std::io::BufReader::new(std::fs::File::open(path)?);
        let bank: Self = serde_json::from_reader(file)?;
        if !bank.is_trained() {
            return Err(EngineError::NotTrained);
        }
        if bank.columns.iter().map(String::as_str).ne(INPUT_COLUMNS) {
            return Err(EngineError::InvalidConfig(format!(
                "saved bank columns {:?} do not match the current input columns",
                bank.columns
            )));
        }
        Ok(bank)
    }
}

/// Deterministic shuffled split into (train, holdout) row indices.
fn holdout_split(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    XorShift64::derive(seed, u64::MAX).shuffle(&mut idx);
    let holdout = ((n as f64) * fraction).round() as usize;
    // Always keep at least one training row.
    let holdout = holdout.min(n.saturating_sub(1));
    let train = idx.split_off(holdout);
    (train, idx)
}
