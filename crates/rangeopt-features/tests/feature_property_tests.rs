use proptest::prelude::*;
use rangeopt_features::FeatureExtractor;

fn feature_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_]{0,24}").unwrap()
}

fn c_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("double lat = sin(x) / cos(y);".to_string()),
        Just("if (p == NULL) { return -1; }".to_string()),
        Just("for (i = 0; i < 10; i++) { total += arr[i]; }".to_string()),
        Just("while (n > 0) { n--; }".to_string()),
        Just("float radius = sqrt(pow(dx, 2) + pow(dy, 2));".to_string()),
        Just("}".to_string()),
        Just("{".to_string()),
        proptest::string::string_regex("[ a-z0-9(){};=<>&\"']{0,30}").unwrap(),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn unknown_feature_names_read_as_zero(
        src in proptest::collection::vec(c_fragment(), 0..10),
        name in feature_name(),
    ) {
        let features = FeatureExtractor::new().extract(&src.join("\n"));
        let absent = format!("zz_{name}");
        prop_assert!(!features.contains(&absent));
        prop_assert_eq!(features.get(&absent), 0.0);
    }

    #[test]
    fn extraction_is_total_and_non_negative(
        src in proptest::collection::vec(c_fragment(), 0..16),
    ) {
        let features = FeatureExtractor::new().extract(&src.join("\n"));
        for (name, value) in features.iter() {
            prop_assert!(value.is_finite(), "{name} is not finite");
            prop_assert!(value >= 0.0, "{name} is negative");
        }
        prop_assert!(features.get("cyclomatic_complexity") >= 1.0);
    }

    #[test]
    fn commented_out_code_does_not_change_counts(
        src in proptest::collection::vec(c_fragment(), 1..8),
        commented in proptest::collection::vec(c_fragment(), 1..4),
    ) {
        let plain = src.join("\n");
        // Only comment out fragments that cannot terminate a block comment early.
        let comment_body: String = commented.join(" ").replace("*/", "").replace('/', " ");
        let with_comment = format!("{plain}\n/* {comment_body} */");

        let extractor = FeatureExtractor::new();
        let a = extractor.extract(&plain);
        let b = extractor.extract(&with_comment);
        for category in extractor.categories() {
            let name = category.feature_name();
            prop_assert_eq!(a.get(&name), b.get(&name), "{}", name);
        }
    }
}
