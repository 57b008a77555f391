//! Feature extraction for `rangeopt`
//!
//! Scans raw source text of a curly-brace, semicolon-terminated language and
//! produces a flat `FeatureSet` of named numeric signals:
//!
//! - pattern-category counts (`trigonometric_count`, `range_checks_count`, ...),
//! - complexity facts (`cyclomatic_complexity`, `max_nesting_depth`, `function_count`),
//! - per-function call counts (`sqrt_calls`, `atan2_calls`, ...),
//! - `lines_of_code` and a `*_per_loc` variant of every count.
//!
//! Extraction never fails: comments and literal contents are stripped first
//! (`clean`), and a pattern that does not match contributes zero.

pub mod clean;
pub mod extractor;
pub mod feature_set;

pub use clean::clean_source;
pub use extractor::FeatureExtractor;
pub use feature_set::FeatureSet;
