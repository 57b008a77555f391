use proptest::prelude::*;
use rangeopt_engine::{DecisionGate, GateOutcome, OptimizationId, Prediction};
use std::collections::BTreeMap;

fn prediction(id: OptimizationId, apply: bool, confidence: f64) -> Prediction {
    Prediction {
        optimization: id,
        apply,
        confidence,
        rationale: String::new(),
    }
}

fn optimization() -> impl Strategy<Value = OptimizationId> {
    (0..OptimizationId::ALL.len()).prop_map(|i| OptimizationId::ALL[i])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn approval_requires_apply_and_strictly_greater_confidence(
        id in optimization(),
        apply in any::<bool>(),
        confidence in 0.0f64..=1.0,
        threshold in 0.0f64..=1.0,
    ) {
        let gate = DecisionGate::new(threshold).unwrap();
        let outcome = gate.classify(&prediction(id, apply, confidence));
        prop_assert_eq!(outcome == GateOutcome::Approved, apply && confidence > threshold);
    }

    #[test]
    fn confidence_equal_to_threshold_is_never_approved(
        id in optimization(),
        threshold in 0.0f64..=1.0,
    ) {
        let gate = DecisionGate::new(threshold).unwrap();
        prop_assert_eq!(
            gate.classify(&prediction(id, true, threshold)),
            GateOutcome::SuppressedLowConfidence
        );
    }

    #[test]
    fn gate_report_covers_every_prediction(
        votes in proptest::collection::vec((any::<bool>(), 0.0f64..=1.0), OptimizationId::ALL.len()),
    ) {
        let predictions: BTreeMap<_, _> = OptimizationId::ALL
            .into_iter()
            .zip(votes)
            .map(|(id, (apply, confidence))| (id, prediction(id, apply, confidence)))
            .collect();
        let report = DecisionGate::default().gate(&predictions);
        prop_assert_eq!(report.decisions.len(), predictions.len());
        let expected: Vec<_> = predictions
            .values()
            .filter(|p| p.apply && p.confidence > DecisionGate::DEFAULT_THRESHOLD)
            .map(|p| p.optimization)
            .collect();
        prop_assert_eq!(report.approved_ids(), expected);
    }
}

#[test]
fn out_of_range_thresholds_are_rejected() {
    assert!(DecisionGate::new(-0.01).is_err());
    assert!(DecisionGate::new(1.01).is_err());
    assert!(DecisionGate::new(f64::NAN).is_err());
}
