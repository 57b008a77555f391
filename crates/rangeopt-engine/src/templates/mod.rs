//! Guarded, idempotent rewrite templates.
//!
//! Each template recognizes a small set of surface idioms and rewrites only
//! those. A template is authorized by the gate, but edits only when its own
//! precondition over the specification facts holds; a failed precondition or
//! a non-matching input returns the text unchanged.

mod compress_storage;
mod narrow_types;
mod null_guards;
mod planar_distance;
mod range_guards;
mod zone_constants;

pub use compress_storage::CompressStorage;
pub use narrow_types::NarrowCoordinateType;
pub use null_guards::EliminateNullGuards;
pub use planar_distance::PlanarDistance;
pub use range_guards::EliminateRangeGuards;
pub use zone_constants::PrecomputeZoneConstants;

use crate::gate::GateReport;
use crate::optimization::OptimizationId;
use rangeopt_spec::SpecFacts;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tag carried by every comment the templates leave behind.
pub const MARKER: &str = "rangeopt:";

/// Thresholds the template preconditions compare facts against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub narrow_area_ceiling_km2: f64,
    pub planar_area_ceiling_km2: f64,
    pub constants_area_ceiling_km2: f64,
    /// Largest declared maximum that still fits single-byte storage.
    pub single_byte_max: f64,
    pub meters_per_degree: f64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            narrow_area_ceiling_km2: 1_000.0,
            planar_area_ceiling_km2: 400.0,
            constants_area_ceiling_km2: 1_000.0,
            single_byte_max: 255.0,
            meters_per_degree: 111_320.0,
        }
    }
}

pub trait RewriteTemplate: Send + Sync {
    fn id(&self) -> OptimizationId;

    /// Whether the facts make this rewrite safe.
    fn precondition(&self, facts: &SpecFacts) -> bool;

    /// The raw rewrite; callers go through [`RewriteTemplate::transform`].
    fn rewrite(&self, text: &str, facts: &SpecFacts, confidence: f64) -> String;

    fn transform(&self, text: &str, facts: &SpecFacts, confidence: f64) -> String {
        if !self.precondition(facts) {
            return text.to_string();
        }
        self.rewrite(text, facts, confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    Applied,
    PreconditionFailed,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    pub optimization: OptimizationId,
    pub outcome: EditOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub text: String,
    pub edits: Vec<EditRecord>,
}

/// The six templates, in declaration order.
pub struct TransformationEngine {
    templates: Vec<Box<dyn RewriteTemplate>>,
}

impl TransformationEngine {
    pub fn new(config: &TemplateConfig) -> Self {
        let templates: Vec<Box<dyn RewriteTemplate>> = vec![
            Box::new(NarrowCoordinateType::new(config)),
            Box::new(EliminateRangeGuards::new()),
            Box::new(PlanarDistance::new(config)),
            Box::new(EliminateNullGuards::new()),
            Box::new(CompressStorage::new(config)),
            Box::new(PrecomputeZoneConstants::new(config)),
        ];
        debug_assert!(templates
            .iter()
            .map(|t| t.id())
            .eq(OptimizationId::ALL));
        Self { templates }
    }

    pub fn template(&self, id: OptimizationId) -> &dyn RewriteTemplate {
        self.templates[id as usize].as_ref()
    }

    /// Apply every approved template, in declaration order.
    pub fn apply(&self, text: &str, gate: &GateReport, facts: &SpecFacts) -> TransformResult {
        let mut current = text.to_string();
        let mut edits = Vec::new();
        for template in &self.templates {
            let Some(decision) = gate.get(template.id()).filter(|d| d.is_approved()) else {
                continue;
            };
            let outcome = if !template.precondition(facts) {
                tracing::debug!(optimization = %template.id(), "precondition failed; template skipped");
                EditOutcome::PreconditionFailed
            } else {
                let next = template.rewrite(&current, facts, decision.confidence);
                if next == current {
                    tracing::debug!(optimization = %template.id(), "template matched nothing");
                    EditOutcome::NoMatch
                } else {
                    current = next;
                    EditOutcome::Applied
                }
            };
            edits.push(EditRecord {
                optimization: template.id(),
                outcome,
            });
        }
        TransformResult {
            text: current,
            edits,
        }
    }
}

impl Default for TransformationEngine {
    fn default() -> Self {
        Self::new(&TemplateConfig::default())
    }
}

// -----------------------------------------------------------------------------
// Shared text helpers
// -----------------------------------------------------------------------------

/// Byte index of the `}` closing the `{` at `open`; `None` when unbalanced.
pub(crate) fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// `generic_speed` becomes `optimized_speed`; other names are kept.
pub(crate) fn optimized_alias(alias: &str) -> String {
    match alias.strip_prefix("generic_") {
        Some(rest) => format!("optimized_{rest}"),
        None => alias.to_string(),
    }
}

/// Replace whole-word occurrences of `from` with `to`.
pub(crate) fn rename_identifier(text: &str, from: &str, to: &str) -> String {
    if from == to {
        return text.to_string();
    }
    let word = Regex::new(&format!(r"\b{}\b", regex::escape(from))).unwrap();
    word.replace_all(text, regex::NoExpand(to)).into_owned()
}

/// `/* rangeopt: <note> */`; safe mid-line, unlike a line comment.
pub(crate) fn inline_marker(note: &str) -> String {
    format!("/* {MARKER} {note} */")
}

/// Replace every match of each pattern with the marker.
pub(crate) fn replace_with_marker(text: &str, patterns: &[Regex], marker: &str) -> String {
    let mut current = text.to_string();
    for re in patterns {
        if re.is_match(&current) {
            current = re.replace_all(&current, regex::NoExpand(marker)).into_owned();
        }
    }
    current
}
