//! End-to-end tests across the rangeopt crates:
//! - specification → facts → templates (gated by hand-built predictions)
//! - source + specification → trained bank → gate → rewrite → provenance
//!
//! Run with: cargo test --test integration_tests

use rangeopt_engine::templates::EditOutcome;
use rangeopt_engine::{
    ClassifierBank, DecisionGate, EngineConfig, OptimizationId, Pipeline, Prediction, ProvenanceStatus,
    TrainingConfig, TransformationEngine,
};
use rangeopt_spec::{parse_spec, AreaCategory, SpecFacts, SpecParser};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

const MICRO_ZONE_SPEC: &str = r#"
// Registros analizados: 1240 (filtrados de Lima, Perú)
range latitude == [-12.0600 degrees, -12.0200 degrees],
range longitude == [-77.0500 degrees, -77.0100 degrees],
range speed == [0.0 kmh, 90.0 kmh],
range satellites == [0, 14],
precision latitude == 6 decimal_places
"#;

const TRACKER_SOURCE: &str = r#"#include <stdbool.h>
#include <math.h>

typedef double generic_latitude;
typedef double generic_longitude;

bool in_zone(generic_latitude lat, generic_longitude lon) {
    if (lat < -90.0 || lat > 90.0) {
        return false;
    }
    if (lon < -180.0 || lon > 180.0) {
        return false;
    }
    return true;
}

double calculateDistance(double lat1, double lon1, double lat2, double lon2) {
    double dlat = (lat2 - lat1) * M_PI / 180.0;
    double dlon = (lon2 - lon1) * M_PI / 180.0;
    double a = sin(dlat / 2) * sin(dlat / 2) + cos(lat1) * cos(lat2) * sin(dlon / 2) * sin(dlon / 2);
    return 6371000.0 * 2 * atan2(sqrt(a), sqrt(1 - a));
}
"#;

/// Every optimization voted "apply" with full confidence.
fn unanimous_predictions() -> BTreeMap<OptimizationId, Prediction> {
    OptimizationId::ALL
        .into_iter()
        .map(|id| {
            (
                id,
                Prediction {
                    optimization: id,
                    apply: true,
                    confidence: 1.0,
                    rationale: format!("forced {id}"),
                },
            )
        })
        .collect()
}

fn outcome_of(edits: &[rangeopt_engine::templates::EditRecord], id: OptimizationId) -> Option<EditOutcome> {
    edits.iter().find(|e| e.optimization == id).map(|e| e.outcome)
}

fn shared_bank() -> Arc<ClassifierBank> {
    static BANK: OnceLock<Arc<ClassifierBank>> = OnceLock::new();
    BANK.get_or_init(|| {
        let mut config = TrainingConfig::default();
        config.forest.trees = 25;
        config.boosting.rounds = 40;
        Arc::new(ClassifierBank::trained(config).expect("training should succeed"))
    })
    .clone()
}

fn pipeline(threshold: f64) -> Pipeline {
    let config = EngineConfig {
        threshold,
        ..EngineConfig::default()
    };
    Pipeline::new(shared_bank(), &config).expect("valid config")
}

// ============================================================================
// Specification → templates
// ============================================================================

#[test]
fn test_micro_zone_narrows_alias_and_drops_latitude_guard() {
    let facts = parse_spec(Some(MICRO_ZONE_SPEC));
    assert!(facts.both_axes_small());
    assert_eq!(facts.area_category(), Some(AreaCategory::Micro));

    let gate = DecisionGate::default().gate(&unanimous_predictions());
    assert_eq!(gate.approved_ids(), OptimizationId::ALL.to_vec());

    let result = TransformationEngine::default().apply(TRACKER_SOURCE, &gate, &facts);
    let text = &result.text;

    // (1) the alias and every use of it
    assert!(text.contains("typedef float optimized_latitude;"));
    assert!(text.contains("typedef float optimized_longitude;"));
    assert!(text.contains("bool in_zone(optimized_latitude lat, optimized_longitude lon)"));
    assert!(!text.contains("generic_latitude"));
    assert!(!text.contains("generic_longitude"));

    // (2) guard blocks become one-line markers
    assert!(!text.contains("lat > 90.0"));
    assert!(!text.contains("lon > 180.0"));
    assert_eq!(text.matches("/* rangeopt: range check removed").count(), 2);

    assert_eq!(
        outcome_of(&result.edits, OptimizationId::NarrowCoordinateType),
        Some(EditOutcome::Applied)
    );
    assert_eq!(
        outcome_of(&result.edits, OptimizationId::EliminateRangeChecks),
        Some(EditOutcome::Applied)
    );
    assert_eq!(
        outcome_of(&result.edits, OptimizationId::PlanarDistance),
        Some(EditOutcome::Applied)
    );
    assert!(text.contains("rangeopt: planar distance approximation"));
    assert!(text.contains("#define GEO_ZONE_LAT_CENTER"));
}

#[test]
fn test_missing_specification_blocks_every_aggressive_rewrite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let facts = SpecParser::default().parse_file(&dir.path().join("zone.spec"));
    assert_eq!(facts, SpecFacts::conservative_default());

    let gate = DecisionGate::default().gate(&unanimous_predictions());
    let result = TransformationEngine::default().apply(TRACKER_SOURCE, &gate, &facts);

    for id in OptimizationId::ALL.into_iter().filter(|id| id.is_aggressive()) {
        assert_eq!(
            outcome_of(&result.edits, id),
            Some(EditOutcome::PreconditionFailed),
            "{id} must not be applied without a specification"
        );
    }
    // Nothing in the tracker source is a null guard, so the text is untouched.
    assert_eq!(result.text, TRACKER_SOURCE);
}

// ============================================================================
// Full pipeline with a trained bank
// ============================================================================

#[test]
fn test_pipeline_report_and_provenance_cover_every_optimization() {
    let pipeline = pipeline(DecisionGate::DEFAULT_THRESHOLD);
    let outcome = pipeline
        .optimize(TRACKER_SOURCE, Some(MICRO_ZONE_SPEC))
        .expect("optimize");

    let report = &outcome.report;
    assert_eq!(report.summary.total_evaluated, OptimizationId::ALL.len());
    assert_eq!(report.gate.decisions.len(), OptimizationId::ALL.len());
    assert!(report.spec_digest.is_some());
    assert!(!report.facts.is_default());
    assert_eq!(outcome.provenance.len(), OptimizationId::ALL.len());

    for entry in &outcome.provenance {
        let approved = report
            .gate
            .get(entry.optimization)
            .is_some_and(|d| d.is_approved());
        assert_eq!(approved, !matches!(entry.status, ProvenanceStatus::Gate(_)));
    }

    assert!(outcome.output.starts_with("/*\n * rangeopt provenance\n"));
    for header in ["stdio.h", "math.h", "stdbool.h", "time.h", "stdlib.h", "string.h"] {
        assert_eq!(
            outcome.output.matches(&format!("#include <{header}>")).count(),
            1,
            "{header}"
        );
    }

    let json = report.to_json_pretty().expect("report serializes");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    assert_eq!(value["summary"]["total_evaluated"], 6);
}

#[test]
fn test_pipeline_reentry_does_not_stack_headers() {
    let pipeline = pipeline(DecisionGate::DEFAULT_THRESHOLD);
    let first = pipeline
        .optimize(TRACKER_SOURCE, Some(MICRO_ZONE_SPEC))
        .expect("first pass");
    let second = pipeline
        .optimize(&first.output, Some(MICRO_ZONE_SPEC))
        .expect("second pass");

    assert_eq!(second.output.matches(" * rangeopt provenance\n").count(), 1);
    assert_eq!(second.output.matches(" * end rangeopt provenance\n").count(), 1);
    assert_eq!(second.output.matches("#include <time.h>").count(), 1);
    assert!(second.output.matches("#define GEO_ZONE_LAT_CENTER").count() <= 1);
}

#[test]
fn test_pipeline_without_specification_applies_no_aggressive_rewrite() {
    let pipeline = pipeline(DecisionGate::DEFAULT_THRESHOLD);
    let outcome = pipeline.optimize(TRACKER_SOURCE, None).expect("optimize");

    assert!(outcome.report.facts.is_default());
    assert!(outcome.report.spec_digest.is_none());
    for entry in outcome
        .provenance
        .iter()
        .filter(|e| e.optimization.is_aggressive())
    {
        assert_ne!(entry.status, ProvenanceStatus::Applied, "{}", entry.optimization);
    }
    assert!(outcome.output.contains("typedef double generic_latitude;"));
    assert!(outcome.output.contains("lat > 90.0"));
}

#[test]
fn test_threshold_of_one_approves_nothing() {
    let pipeline = pipeline(1.0);
    let outcome = pipeline
        .optimize(TRACKER_SOURCE, Some(MICRO_ZONE_SPEC))
        .expect("optimize");

    assert_eq!(outcome.report.summary.approved, 0);
    assert_eq!(outcome.applied_count(), 0);
    assert!(outcome.edits.is_empty());
    assert!(outcome.output.ends_with(TRACKER_SOURCE));
}

#[test]
fn test_invalid_threshold_is_a_usage_error() {
    let config = EngineConfig {
        threshold: 1.5,
        ..EngineConfig::default()
    };
    assert!(Pipeline::new(shared_bank(), &config).is_err());
}
