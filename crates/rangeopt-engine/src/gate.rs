use crate::classifier::Prediction;
use crate::error::{EngineError, Result};
use crate::optimization::OptimizationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the gate classified one prediction. Only `Approved` leads to an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Voted apply with confidence strictly above the threshold.
    Approved,
    /// Voted apply, but confidence is at or below the threshold.
    SuppressedLowConfidence,
    /// Voted not-apply with confidence above the threshold.
    RejectedConfident,
    /// Voted not-apply with confidence at or below the threshold.
    Indeterminate,
}

impl GateOutcome {
    pub fn label(self) -> &'static str {
        match self {
            GateOutcome::Approved => "approved",
            GateOutcome::SuppressedLowConfidence => "suppressed (low confidence)",
            GateOutcome::RejectedConfident => "rejected",
            GateOutcome::Indeterminate => "indeterminate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub optimization: OptimizationId,
    pub outcome: GateOutcome,
    pub confidence: f64,
    pub rationale: String,
}

impl GateDecision {
    pub fn is_approved(&self) -> bool {
        self.outcome == GateOutcome::Approved
    }
}

/// Every prediction's gate decision, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub threshold: f64,
    pub decisions: Vec<GateDecision>,
}

impl GateReport {
    pub fn approved(&self) -> impl Iterator<Item = &GateDecision> {
        self.decisions.iter().filter(|d| d.is_approved())
    }

    pub fn approved_ids(&self) -> Vec<OptimizationId> {
        self.approved().map(|d| d.optimization).collect()
    }

    pub fn count(&self, outcome: GateOutcome) -> usize {
        self.decisions.iter().filter(|d| d.outcome == outcome).count()
    }

    pub fn get(&self, id: OptimizationId) -> Option<&GateDecision> {
        self.decisions.iter().find(|d| d.optimization == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionGate {
    threshold: f64,
}

impl Default for DecisionGate {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

impl DecisionGate {
    pub const DEFAULT_THRESHOLD: f64 = 0.7;

    pub fn new(threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "gate threshold must be in [0, 1], got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classify(&self, prediction: &Prediction) -> GateOutcome {
        let confident = prediction.confidence > self.threshold;
        match (prediction.apply, confident) {
            (true, true) => GateOutcome::Approved,
            (true, false) => GateOutcome::SuppressedLowConfidence,
            (false, true) => GateOutcome::RejectedConfident,
            (false, false) => GateOutcome::Indeterminate,
        }
    }

    pub fn gate(&self, predictions: &BTreeMap<OptimizationId, Prediction>) -> GateReport {
        let decisions = predictions
            .values()
            .map(|p| {
                let outcome = self.classify(p);
                tracing::info!(
                    optimization = %p.optimization,
                    confidence = p.confidence,
                    outcome = outcome.label(),
                    "gate decision"
                );
                GateDecision {
                    optimization: p.optimization,
                    outcome,
                    confidence: p.confidence,
                    rationale: p.rationale.clone(),
                }
            })
            .collect();
        GateReport {
            threshold: self.threshold,
            decisions,
        }
    }
}
