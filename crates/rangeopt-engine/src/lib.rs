//! Optimization decisions and guarded source rewriting.
//!
//! Given the features of a source text (`rangeopt-features`) and the facts of
//! its range specification (`rangeopt-spec`), this crate:
//!
//! 1. asks a bank of independent binary classifiers whether each catalogued
//!    optimization is worthwhile ([`classifier::ClassifierBank`]),
//! 2. gates every verdict by a strict confidence threshold ([`gate::DecisionGate`]),
//! 3. applies the approved rewrite templates in declaration order, each guarded
//!    by its own precondition over the facts ([`templates::TransformationEngine`]),
//! 4. prepends a provenance header and the required includes
//!    ([`provenance::ProvenanceAnnotator`]).
//!
//! [`pipeline::Pipeline`] wires the steps together. The bank is trained once
//! and shared read-only; everything else is per-call.

pub mod classifier;
pub mod config;
pub mod error;
pub mod gate;
pub mod optimization;
pub mod pipeline;
pub mod provenance;
pub mod report;
pub mod templates;

pub use classifier::dataset::TrainingConfig;
pub use classifier::{ClassifierBank, Prediction, TrainingSummary};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use gate::{DecisionGate, GateDecision, GateOutcome, GateReport};
pub use optimization::{OptimizationId, OptimizationSpec};
pub use pipeline::{OptimizationOutcome, Pipeline};
pub use provenance::{ProvenanceAnnotator, ProvenanceEntry, ProvenanceStatus};
pub use report::{AnalysisReport, AnalysisSummary};
pub use templates::{RewriteTemplate, TemplateConfig, TransformationEngine};
