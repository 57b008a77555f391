use crate::classifier::Prediction;
use crate::error::Result;
use crate::gate::{GateOutcome, GateReport};
use crate::optimization::OptimizationId;
use chrono::{DateTime, Utc};
use rangeopt_features::FeatureSet;
use rangeopt_spec::SpecFacts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Confidence above which a prediction counts as high-confidence.
pub const HIGH_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_evaluated: usize,
    /// Predictions that voted apply, regardless of confidence.
    pub recommended: usize,
    pub rejected: usize,
    pub average_confidence: f64,
    pub recommendation_rate: f64,
    pub high_confidence_count: usize,
    pub approved: usize,
    pub suppressed_low_confidence: usize,
    pub rejected_confident: usize,
    pub indeterminate: usize,
}

impl AnalysisSummary {
    pub fn compute(predictions: &BTreeMap<OptimizationId, Prediction>, gate: &GateReport) -> Self {
        let total = predictions.len();
        let recommended = predictions.values().filter(|p| p.apply).count();
        let confidence_sum: f64 = predictions.values().map(|p| p.confidence).sum();
        let ratio = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };
        Self {
            total_evaluated: total,
            recommended,
            rejected: total - recommended,
            average_confidence: if total == 0 { 0.0 } else { confidence_sum / total as f64 },
            recommendation_rate: ratio(recommended),
            high_confidence_count: predictions
                .values()
                .filter(|p| p.confidence > HIGH_CONFIDENCE)
                .count(),
            approved: gate.count(GateOutcome::Approved),
            suppressed_low_confidence: gate.count(GateOutcome::SuppressedLowConfidence),
            rejected_confident: gate.count(GateOutcome::RejectedConfident),
            indeterminate: gate.count(GateOutcome::Indeterminate),
        }
    }
}

/// Everything one analysis produced. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub source_digest: String,
    pub spec_digest: Option<String>,
    pub features: FeatureSet,
    pub facts: SpecFacts,
    pub predictions: BTreeMap<OptimizationId, Prediction>,
    pub gate: GateReport,
    pub summary: AnalysisSummary,
}

impl AnalysisReport {
    pub fn approved_ids(&self) -> Vec<OptimizationId> {
        self.gate.approved_ids()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
