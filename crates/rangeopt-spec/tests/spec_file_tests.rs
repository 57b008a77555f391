use rangeopt_spec::facts::{FACT_SPEED_MAX, FACT_TRAINING_RECORDS};
use rangeopt_spec::{FactsOrigin, GeoRegion, SpecFacts, SpecParser};
use std::io::Write;

#[test]
fn missing_specification_file_yields_conservative_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let facts = SpecParser::default().parse_file(&dir.path().join("does-not-exist.spec"));
    assert_eq!(facts, SpecFacts::conservative_default());
    assert_eq!(facts.origin, FactsOrigin::ConservativeDefault);
}

#[test]
fn specification_file_is_parsed() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(
        file,
        "// Registros analizados: 812 (filtrados de España)\nrange speed == [0.0 kmh, 130.0 kmh],"
    )
    .expect("write");

    let facts = SpecParser::default().parse_file(file.path());
    assert_eq!(facts.origin, FactsOrigin::Parsed);
    assert_eq!(facts.region, GeoRegion::Europe);
    assert_eq!(facts.get(FACT_SPEED_MAX), Some(130.0));
    assert_eq!(facts.get(FACT_TRAINING_RECORDS), Some(812.0));
}
