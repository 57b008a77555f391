use crate::classifier::ClassifierBank;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::gate::DecisionGate;
use crate::provenance::{provenance_entries, ProvenanceAnnotator, ProvenanceEntry};
use crate::report::{AnalysisReport, AnalysisSummary};
use crate::templates::{EditRecord, TransformationEngine};
use chrono::Utc;
use rangeopt_features::FeatureExtractor;
use rangeopt_spec::digest::text_digest_v1;
use rangeopt_spec::{SpecFacts, SpecParser};
use std::sync::Arc;

/// Result of optimizing one source text.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub output: String,
    pub report: AnalysisReport,
    pub edits: Vec<EditRecord>,
    pub provenance: Vec<ProvenanceEntry>,
}

impl OptimizationOutcome {
    pub fn applied_count(&self) -> usize {
        self.provenance.iter().filter(|e| e.status.is_applied()).count()
    }
}

/// Extract → parse → predict → gate → transform → annotate.
///
/// Holds no per-analysis state; one pipeline (and its shared bank) serves any
/// number of concurrent calls.
pub struct Pipeline {
    bank: Arc<ClassifierBank>,
    extractor: FeatureExtractor,
    spec_parser: SpecParser,
    gate: DecisionGate,
    engine: TransformationEngine,
    annotator: ProvenanceAnnotator,
}

impl Pipeline {
    pub fn new(bank: Arc<ClassifierBank>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bank,
            extractor: FeatureExtractor::new(),
            spec_parser: SpecParser::new(config.spec.clone()),
            gate: DecisionGate::new(config.threshold)?,
            engine: TransformationEngine::new(&config.templates),
            annotator: ProvenanceAnnotator::default(),
        })
    }

    pub fn bank(&self) -> &ClassifierBank {
        &self.bank
    }

    pub fn spec_parser(&self) -> &SpecParser {
        &self.spec_parser
    }

    pub fn gate(&self) -> &DecisionGate {
        &self.gate
    }

    /// Analyze `source` against an optional specification text.
    pub fn analyze(&self, source: &str, spec: Option<&str>) -> Result<AnalysisReport> {
        let facts = self.spec_parser.parse(spec);
        self.analyze_with_facts(source, facts, spec.map(text_digest_v1))
    }

    pub fn analyze_with_facts(
        &self,
        source: &str,
        facts: SpecFacts,
        spec_digest: Option<String>,
    ) -> Result<AnalysisReport> {
        let features = self.extractor.extract(source);
        let predictions = self.bank.predict(&features, &facts)?;
        let gate = self.gate.gate(&predictions);
        let summary = AnalysisSummary::compute(&predictions, &gate);
        tracing::info!(
            approved = summary.approved,
            recommended = summary.recommended,
            default_facts = facts.is_default(),
            "analysis complete"
        );
        Ok(AnalysisReport {
            generated_at: Utc::now(),
            source_digest: text_digest_v1(source),
            spec_digest,
            features,
            facts,
            predictions,
            gate,
            summary,
        })
    }

    /// Analyze, then rewrite and annotate.
    pub fn optimize(&self, source: &str, spec: Option<&str>) -> Result<OptimizationOutcome> {
        let report = self.analyze(source, spec)?;
        Ok(self.rewrite(source, report))
    }

    pub fn optimize_with_facts(
        &self,
        source: &str,
        facts: SpecFacts,
        spec_digest: Option<String>,
    ) -> Result<OptimizationOutcome> {
        let report = self.analyze_with_facts(source, facts, spec_digest)?;
        Ok(self.rewrite(source, report))
    }

    fn rewrite(&self, source: &str, report: AnalysisReport) -> OptimizationOutcome {
        let result = self.engine.apply(source, &report.gate, &report.facts);
        let provenance = provenance_entries(&report.gate, &result.edits);
        let output = self.annotator.annotate(&result.text, &provenance);
        OptimizationOutcome {
            output,
            report,
            edits: result.edits,
            provenance,
        }
    }
}
