use rangeopt_engine::{ClassifierBank, EngineError, TrainingConfig};
use rangeopt_features::FeatureExtractor;
use rangeopt_spec::parse_spec;

const SOURCE: &str = r#"#include <math.h>
typedef double generic_latitude;
double calculateDistance(double lat1, double lon1, double lat2, double lon2) {
    if (lat1 < -90.0 || lat1 > 90.0) { return -1.0; }
    return 6371000.0 * atan2(sin(lat2 - lat1), cos(lon2 - lon1));
}
"#;

const SPEC: &str = "range latitude == [-12.06 degrees, -12.02 degrees]\n\
                    range longitude == [-77.05 degrees, -77.01 degrees]\n\
                    range speed == [0.0 kmh, 90.0 kmh]\n";

fn small_config() -> TrainingConfig {
    let mut config = TrainingConfig::default();
    config.forest.trees = 20;
    config.boosting.rounds = 30;
    config
}

#[test]
fn saved_bank_predicts_identically() {
    let bank = ClassifierBank::trained(small_config()).expect("train");
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bank.json");
    bank.save_json(&path).expect("save");

    let loaded = ClassifierBank::load_json(&path).expect("load");
    assert!(loaded.is_trained());
    assert_eq!(loaded.columns(), bank.columns());

    let features = FeatureExtractor::new().extract(SOURCE);
    let facts = parse_spec(Some(SPEC));
    let before = bank.predict(&features, &facts).expect("predict");
    let after = loaded.predict(&features, &facts).expect("predict");
    assert_eq!(before.len(), after.len());
    for (id, p) in &before {
        let q = &after[id];
        assert_eq!(p.apply, q.apply, "{id}");
        assert_eq!(p.confidence.to_bits(), q.confidence.to_bits(), "{id}");
    }
}

#[test]
fn bank_json_is_stable_across_reload() {
    let bank = ClassifierBank::trained(small_config()).expect("train");
    let first = serde_json::to_string(&bank).expect("serialize");
    let reloaded: ClassifierBank = serde_json::from_str(&first).expect("deserialize");
    let second = serde_json::to_string(&reloaded).expect("serialize again");
    assert_eq!(first.len(), second.len());
    assert!(first == second, "split thresholds, leaf values or weights changed on reload");
}

#[test]
fn untrained_bank_is_neither_saved_nor_loaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bank.json");

    let untrained = ClassifierBank::new(small_config());
    assert!(matches!(untrained.save_json(&path), Err(EngineError::NotTrained)));

    std::fs::write(&path, serde_json::to_string(&untrained).expect("serialize")).expect("write");
    assert!(matches!(ClassifierBank::load_json(&path), Err(EngineError::NotTrained)));
}

#[test]
fn missing_bank_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = ClassifierBank::load_json(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}

#[test]
fn untrained_bank_refuses_to_predict() {
    let bank = ClassifierBank::new(small_config());
    let features = FeatureExtractor::new().extract(SOURCE);
    let err = bank.predict(&features, &parse_spec(None)).unwrap_err();
    assert!(matches!(err, EngineError::NotTrained));
}
