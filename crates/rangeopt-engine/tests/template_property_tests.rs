use proptest::prelude::*;
use rangeopt_engine::{OptimizationId, TemplateConfig, TransformationEngine};
use rangeopt_spec::{SpecFacts, SpecParser, SpecParserConfig};

const HAVERSINE: &str = r#"double calculateDistance(double lat1, double lon1, double lat2, double lon2) {
    double dlat = (lat2 - lat1) * M_PI / 180.0;
    double dlon = (lon2 - lon1) * M_PI / 180.0;
    double a = sin(dlat / 2) * sin(dlat / 2) + cos(lat1) * cos(lat2) * sin(dlon / 2) * sin(dlon / 2);
    return 6371000.0 * 2 * atan2(sqrt(a), sqrt(1 - a));
}"#;

fn c_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("#include <math.h>".to_string()),
        Just("#include <stdio.h>".to_string()),
        Just("typedef double generic_latitude;".to_string()),
        Just("typedef double generic_longitude;".to_string()),
        Just("typedef double generic_speed;".to_string()),
        Just("typedef int generic_satellites;".to_string()),
        Just("double lat_offset = 0.0; double longitude_bias = 1.0;".to_string()),
        Just("if (lat < -90.0 || lat > 90.0) {\n    return false;\n}".to_string()),
        Just("if (lon < -180 || lon > 180) { return false; }".to_string()),
        Just("if (!validateGPSCoordinates(lat, lon)) { return false; }".to_string()),
        Just("if (!point || !fence) { return false; }".to_string()),
        Just("if (p == NULL) { return -1; }".to_string()),
        Just("if (!p) { printf(\"no point\\n\"); return -1; }".to_string()),
        Just("printf(\"speed: %.1f km/h\\n\", speed);".to_string()),
        Just(HAVERSINE.to_string()),
        Just("int main(void) { generic_latitude lat = 0; return 0; }".to_string()),
        Just("x = y / 2; // note".to_string()),
    ]
}

fn source() -> impl Strategy<Value = String> {
    proptest::collection::vec(c_fragment(), 0..12).prop_map(|parts| parts.join("\n") + "\n")
}

fn facts() -> impl Strategy<Value = SpecFacts> {
    (
        -80.0f64..80.0,
        0.01f64..5.0,
        -170.0f64..170.0,
        0.01f64..5.0,
        proptest::option::of(5.0f64..400.0),
        proptest::option::of(1.0f64..400.0),
        any::<bool>(),
    )
        .prop_map(|(lat, lat_w, lon, lon_w, speed, sats, missing)| {
            if missing {
                return SpecFacts::conservative_default();
            }
            let mut spec = format!(
                "range latitude == [{lat:.4} degrees, {:.4} degrees]\n\
                 range longitude == [{lon:.4} degrees, {:.4} degrees]\n",
                lat + lat_w,
                lon + lon_w
            );
            if let Some(max) = speed {
                spec.push_str(&format!("range speed == [0.0 kmh, {max:.1} kmh]\n"));
            }
            if let Some(max) = sats {
                spec.push_str(&format!("range satellites == [0 count, {max:.0} count]\n"));
            }
            SpecParser::new(SpecParserConfig::default()).parse(Some(&spec))
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn failed_precondition_is_an_exact_no_op(
        text in source(),
        facts in facts(),
        confidence in 0.0f64..=1.0,
    ) {
        let engine = TransformationEngine::new(&TemplateConfig::default());
        for id in OptimizationId::ALL {
            let template = engine.template(id);
            if !template.precondition(&facts) {
                prop_assert_eq!(template.transform(&text, &facts, confidence), text.clone(), "{}", id);
            }
        }
    }

    #[test]
    fn every_template_is_idempotent(
        text in source(),
        facts in facts(),
        confidence in 0.0f64..=1.0,
    ) {
        let engine = TransformationEngine::new(&TemplateConfig::default());
        for id in OptimizationId::ALL {
            let template = engine.template(id);
            let once = template.transform(&text, &facts, confidence);
            let twice = template.transform(&once, &facts, confidence);
            prop_assert_eq!(twice, once, "{}", id);
        }
    }

    #[test]
    fn default_facts_never_authorize_aggressive_edits(text in source()) {
        let engine = TransformationEngine::new(&TemplateConfig::default());
        let facts = SpecFacts::conservative_default();
        for id in OptimizationId::ALL.into_iter().filter(|id| id.is_aggressive()) {
            prop_assert!(!engine.template(id).precondition(&facts), "{}", id);
            prop_assert_eq!(engine.template(id).transform(&text, &facts, 1.0), text.clone());
        }
    }
}
