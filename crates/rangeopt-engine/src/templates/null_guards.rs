use super::{inline_marker, replace_with_marker, RewriteTemplate};
use crate::optimization::OptimizationId;
use rangeopt_spec::SpecFacts;
use regex::Regex;

/// Removes early-return pointer guards. Not gated on facts: selection alone
/// authorizes it.
pub struct EliminateNullGuards {
    patterns: Vec<Regex>,
    marker: String,
}

impl EliminateNullGuards {
    pub fn new() -> Self {
        let patterns = [
            // if (!a || !b) { ... return ...; }
            r"\bif\s*\(\s*!\s*\w+\s*\|\|\s*!\s*\w+\s*\)\s*\{[^}]*\breturn\b[^}]*\}",
            // if (p == NULL) { ... return ...; }
            r"\bif\s*\(\s*\w+\s*==\s*NULL\s*\)\s*\{[^}]*\breturn\b[^}]*\}",
            // if (!p) { printf(...); return ...; }
            r"\bif\s*\(\s*!\s*\w+\s*\)\s*\{[^}]*\bprintf\b[^}]*\breturn\b[^}]*\}",
        ];
        Self {
            patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
            marker: inline_marker("null check removed"),
        }
    }
}

impl Default for EliminateNullGuards {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteTemplate for EliminateNullGuards {
    fn id(&self) -> OptimizationId {
        OptimizationId::EliminateNullChecks
    }

    fn precondition(&self, _facts: &SpecFacts) -> bool {
        true
    }

    fn rewrite(&self, text: &str, _facts: &SpecFacts, _confidence: f64) -> String {
        replace_with_marker(text, &self.patterns, &self.marker)
    }
}
