//! Pattern-category counting and complexity metrics.

use crate::clean::clean_source;
use crate::feature_set::FeatureSet;
use regex::Regex;

/// A named category of surface idioms; its count is the sum of the
/// non-overlapping matches of every pattern.
#[derive(Debug, Clone)]
pub struct FeatureCategory {
    pub name: &'static str,
    pub patterns: Vec<Regex>,
}

impl FeatureCategory {
    fn new(name: &'static str, patterns: &[&str]) -> Self {
        Self {
            name,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
                .collect(),
        }
    }

    pub fn count(&self, text: &str) -> usize {
        self.patterns.iter().map(|re| re.find_iter(text).count()).sum()
    }

    /// Feature name of this category's count.
    pub fn feature_name(&self) -> String {
        format!("{}_count", self.name)
    }
}

/// Build the default category table.
pub fn default_categories() -> Vec<FeatureCategory> {
    vec![
        // Expensive math
        FeatureCategory::new("trigonometric", &[r"\b(?:sin|cos|tan|atan2)\s*\("]),
        FeatureCategory::new("sqrt_operations", &[r"\bsqrtf?\s*\("]),
        FeatureCategory::new("power_operations", &[r"\bpowf?\s*\("]),
        // Each match consumes only the character after the slash, so `a/b/c` counts twice.
        FeatureCategory::new("division_operations", &[r"/(?:[^/*]|\z)"]),
        // Control flow
        FeatureCategory::new("for_loops", &[r"\bfor\s*\("]),
        FeatureCategory::new("while_loops", &[r"\bwhile\s*\("]),
        FeatureCategory::new("if_statements", &[r"\bif\s*\("]),
        FeatureCategory::new("switch_statements", &[r"\bswitch\s*\("]),
        // Memory
        FeatureCategory::new("malloc_calls", &[r"\b(?:malloc|calloc|realloc)\s*\("]),
        FeatureCategory::new("array_access", &[r"\[\s*\w+\s*\]"]),
        FeatureCategory::new("pointer_operations", &[r"\*\w+", r"&\w+"]),
        // Domain vocabulary
        FeatureCategory::new("gps_coordinates", &[r"\b(?:lat|lon)\w*"]),
        FeatureCategory::new("distance_calculations", &[r"distance|haversine|euclidean"]),
        FeatureCategory::new("geofencing", &[r"geofence|inside|boundary|radius"]),
        // Primitive types
        FeatureCategory::new("double_usage", &[r"\bdouble\b"]),
        FeatureCategory::new("float_usage", &[r"\bfloat\b"]),
        FeatureCategory::new("int_usage", &[r"\bint\b"]),
        // Guards and exits
        FeatureCategory::new("range_checks", &[r"(?:<=|>=|<|>)\s*-?\d+"]),
        FeatureCategory::new("null_checks", &[r"[=!]=\s*NULL"]),
        FeatureCategory::new("error_handling", &[r"\breturn\s+-?\d+", r"\bexit\s*\(", r"\babort\s*\("]),
    ]
}

/// Math functions whose call sites are counted individually (`<name>_calls`).
pub const MATH_FUNCTIONS: &[&str] = &["sin", "cos", "tan", "sqrt", "pow", "atan2", "fabs"];

const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "switch", "return", "sizeof"];

pub struct FeatureExtractor {
    categories: Vec<FeatureCategory>,
    decision_points: Regex,
    function_heads: Regex,
    math_calls: Vec<(&'static str, Regex)>,
    validation_words: Regex,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            categories: default_categories(),
            decision_points: Regex::new(r"\b(?:if|while|for|switch|case)\b").unwrap(),
            function_heads: Regex::new(r"\w+\s+(\w+)\s*\([^)]*\)\s*\{").unwrap(),
            math_calls: MATH_FUNCTIONS
                .iter()
                .map(|name| (*name, Regex::new(&format!(r"\b{name}\s*\(")).unwrap()))
                .collect(),
            validation_words: Regex::new(r"(?i)\b(?:validate|check|verify|ensure)").unwrap(),
        }
    }

    pub fn categories(&self) -> &[FeatureCategory] {
        &self.categories
    }

    /// Extract the full feature set of one source text.
    pub fn extract(&self, source: &str) -> FeatureSet {
        let cleaned = clean_source(source);
        let loc = cleaned.lines().filter(|line| !line.trim().is_empty()).count();
        let mut features = FeatureSet::new(loc);

        for category in &self.categories {
            features.insert_count(&category.feature_name(), category.count(&cleaned));
        }

        let decisions = self.decision_points.find_iter(&cleaned).count();
        features.insert("cyclomatic_complexity", (decisions + 1) as f64);
        features.insert("max_nesting_depth", max_nesting_depth(&cleaned) as f64);
        features.insert_count("function_count", self.function_count(&cleaned));

        for (name, re) in &self.math_calls {
            features.insert_count(&format!("{name}_calls"), re.find_iter(&cleaned).count());
        }
        features.insert_count(
            "validation_functions",
            self.validation_words.find_iter(&cleaned).count(),
        );

        tracing::debug!(
            lines_of_code = loc,
            features = features.len(),
            "extracted source features"
        );
        features
    }

    /// Naive definition count: `<type> <name>(...) {` where `<name>` is not a
    /// control keyword.
    fn function_count(&self, cleaned: &str) -> usize {
        self.function_heads
            .captures_iter(cleaned)
            .filter(|caps| !CONTROL_KEYWORDS.contains(&&caps[1]))
            .count()
    }
}

/// Maximum `{`/`}` nesting; the running depth never goes below zero.
pub fn max_nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max_depth
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAVERSINE: &str = r#"
#include <math.h>

typedef double generic_latitude;

/* Great-circle distance: sin(), cos() and atan2() */
double calculateDistance(generic_latitude lat1, double lon1, generic_latitude lat2, double lon2) {
    if (lat1 < -90.0 || lat1 > 90.0) {
        return -1;
    }
    double dlat = (lat2 - lat1) * M_PI / 180.0;
    double a = sin(dlat / 2.0) * sin(dlat / 2.0) + cos(lat1) * cos(lat2);
    return 6371000.0 * 2.0 * atan2(sqrt(a), sqrt(1.0 - a)); // "tan(x)"
}
"#;

    #[test]
    fn counts_math_calls_outside_comments() {
        let f = FeatureExtractor::new().extract(HAVERSINE);
        assert_eq!(f.get("sin_calls"), 2.0);
        assert_eq!(f.get("cos_calls"), 2.0);
        assert_eq!(f.get("atan2_calls"), 1.0);
        assert_eq!(f.get("tan_calls"), 0.0);
        assert_eq!(f.get("trigonometric_count"), 5.0);
        assert_eq!(f.get("sqrt_operations_count"), 2.0);
    }

    #[test]
    fn complexity_metrics() {
        let f = FeatureExtractor::new().extract(HAVERSINE);
        assert_eq!(f.get("cyclomatic_complexity"), 2.0);
        assert_eq!(f.get("max_nesting_depth"), 2.0);
        assert_eq!(f.get("function_count"), 1.0);
        assert_eq!(f.get("range_checks_count"), 2.0);
        assert_eq!(f.get("error_handling_count"), 2.0);
        assert_eq!(f.get("double_usage_count"), 6.0);
    }

    #[test]
    fn lines_of_code_ignores_blank_and_comment_only_lines() {
        let f = FeatureExtractor::new().extract("int a;\n\n// only a comment\n   \nint b;\n");
        assert_eq!(f.lines_of_code, 2);
        assert_eq!(f.get("int_usage_count"), 2.0);
        assert_eq!(f.get("int_usage_count_per_loc"), 1.0);
    }

    #[test]
    fn chained_divisions_count_each_operator() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.extract("double r = a/b/c;\n").get("division_operations_count"), 2.0);
        assert_eq!(extractor.extract("x /= y / 2;\n").get("division_operations_count"), 2.0);
        assert_eq!(extractor.extract(HAVERSINE).get("division_operations_count"), 3.0);
    }

    #[test]
    fn nesting_depth_is_floor_clamped() {
        assert_eq!(max_nesting_depth("}}}{"), 1);
        assert_eq!(max_nesting_depth("{{}{{}}}"), 3);
        assert_eq!(max_nesting_depth(""), 0);
    }

    #[test]
    fn null_checks_and_pointers() {
        let src = "if (p == NULL) { return -1; }\nif (q != NULL) { use(&q); }\n";
        let f = FeatureExtractor::new().extract(src);
        assert_eq!(f.get("null_checks_count"), 2.0);
        assert_eq!(f.get("pointer_operations_count"), 1.0);
        assert_eq!(f.get("if_statements_count"), 2.0);
    }

    #[test]
    fn malformed_input_never_fails() {
        let f = FeatureExtractor::new().extract("}{ ((( \"unterminated /* ");
        assert!(f.get("max_nesting_depth") >= 0.0);
        assert_eq!(f.get("function_count"), 0.0);
    }
}
