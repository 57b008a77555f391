use super::{inline_marker, replace_with_marker, RewriteTemplate};
use crate::optimization::OptimizationId;
use rangeopt_spec::SpecFacts;
use regex::Regex;

/// Removes latitude/longitude bound guards when both axes are declared
/// small-range. Each removed guard leaves a one-line marker.
pub struct EliminateRangeGuards {
    patterns: Vec<Regex>,
    marker: String,
}

impl EliminateRangeGuards {
    pub fn new() -> Self {
        let guard = |axis: &str, bound: &str| {
            Regex::new(&format!(
                r"\bif\s*\(\s*{axis}\w*\s*<\s*-{bound}(?:\.0*)?\s*\|\|\s*{axis}\w*\s*>\s*{bound}(?:\.0*)?\s*\)\s*\{{[^}}]*\breturn\b[^}}]*\}}"
            ))
            .unwrap()
        };
        Self {
            patterns: vec![
                guard("lat", "90"),
                guard("lon", "180"),
                Regex::new(r"\bif\s*\(\s*!\s*validate\w*Coordinates\s*\([^)]*\)\s*\)\s*\{[^}]*\breturn\b[^}]*\}")
                    .unwrap(),
            ],
            marker: inline_marker("range check removed, bounds guaranteed by the declared ranges"),
        }
    }
}

impl Default for EliminateRangeGuards {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteTemplate for EliminateRangeGuards {
    fn id(&self) -> OptimizationId {
        OptimizationId::EliminateRangeChecks
    }

    fn precondition(&self, facts: &SpecFacts) -> bool {
        facts.both_axes_small()
    }

    fn rewrite(&self, text: &str, _facts: &SpecFacts, _confidence: f64) -> String {
        replace_with_marker(text, &self.patterns, &self.marker)
    }
}
