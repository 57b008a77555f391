//! Provenance header and required includes.
//!
//! The header records, for every catalogued optimization, whether it was
//! applied and why not if it was not, so the output file alone explains what
//! happened. Re-annotating an annotated file replaces its header.

use crate::gate::{GateOutcome, GateReport};
use crate::optimization::OptimizationId;
use crate::templates::{EditOutcome, EditRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Standard headers every optimized output includes.
pub const REQUIRED_HEADERS: [&str; 6] = ["stdio.h", "math.h", "stdbool.h", "time.h", "stdlib.h", "string.h"];

const HEADER_TITLE: &str = " * rangeopt provenance";
const HEADER_END: &str = " * end rangeopt provenance\n */\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "outcome", rename_all = "snake_case")]
pub enum ProvenanceStatus {
    Applied,
    /// Approved, but the facts did not authorize the edit.
    PreconditionFailed,
    /// Approved and authorized, but nothing in the source matched.
    NoMatch,
    /// Not approved by the gate.
    Gate(GateOutcome),
}

impl ProvenanceStatus {
    pub fn is_applied(self) -> bool {
        self == ProvenanceStatus::Applied
    }

    pub fn describe(self) -> &'static str {
        match self {
            ProvenanceStatus::Applied => "applied",
            ProvenanceStatus::PreconditionFailed => "approved, precondition not met",
            ProvenanceStatus::NoMatch => "approved, no matching code",
            ProvenanceStatus::Gate(outcome) => outcome.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub optimization: OptimizationId,
    pub status: ProvenanceStatus,
    pub confidence: f64,
    pub explanation: String,
}

/// One entry per gate decision, in declaration order.
pub fn provenance_entries(gate: &GateReport, edits: &[EditRecord]) -> Vec<ProvenanceEntry> {
    gate.decisions
        .iter()
        .map(|decision| {
            let status = if decision.is_approved() {
                match edits
                    .iter()
                    .find(|e| e.optimization == decision.optimization)
                    .map(|e| e.outcome)
                {
                    Some(EditOutcome::Applied) => ProvenanceStatus::Applied,
                    Some(EditOutcome::PreconditionFailed) => ProvenanceStatus::PreconditionFailed,
                    Some(EditOutcome::NoMatch) | None => ProvenanceStatus::NoMatch,
                }
            } else {
                ProvenanceStatus::Gate(decision.outcome)
            };
            ProvenanceEntry {
                optimization: decision.optimization,
                status,
                confidence: decision.confidence,
                explanation: decision.rationale.clone(),
            }
        })
        .collect()
}

pub struct ProvenanceAnnotator {
    required: Vec<String>,
    include: Regex,
}

impl Default for ProvenanceAnnotator {
    fn default() -> Self {
        Self::new(REQUIRED_HEADERS.iter().map(|h| h.to_string()).collect())
    }
}

impl ProvenanceAnnotator {
    pub fn new(required: Vec<String>) -> Self {
        Self {
            required,
            include: Regex::new(r#"(?m)^[ \t]*#[ \t]*include\s*[<"]([^>"]+)[>"]"#).unwrap(),
        }
    }

    /// Header, then missing includes, then the text without any previous header.
    pub fn annotate(&self, text: &str, entries: &[ProvenanceEntry]) -> String {
        let body = strip_header(text);
        let present: BTreeSet<&str> = self
            .include
            .captures_iter(body)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim()))
            .collect();
        let missing: Vec<&String> = self
            .required
            .iter()
            .filter(|h| !present.contains(h.as_str()))
            .collect();

        let mut out = render_header(entries);
        if !missing.is_empty() {
            for header in &missing {
                out.push_str(&format!("#include <{header}>\n"));
            }
            out.push('\n');
        }
        out.push_str(body);
        out
    }
}

fn render_header(entries: &[ProvenanceEntry]) -> String {
    let (applied, rest): (Vec<&ProvenanceEntry>, Vec<&ProvenanceEntry>) =
        entries.iter().partition(|e| e.status.is_applied());

    let mut out = String::from("/*\n");
    out.push_str(HEADER_TITLE);
    out.push_str("\n *\n");
    out.push_str(&format!(" * applied ({}):\n", applied.len()));
    if applied.is_empty() {
        out.push_str(" *   (none)\n");
    }
    for entry in &applied {
        push_entry(&mut out, '+', entry);
    }
    out.push_str(" *\n");
    out.push_str(&format!(" * not applied ({}):\n", rest.len()));
    if rest.is_empty() {
        out.push_str(" *   (none)\n");
    }
    for entry in &rest {
        push_entry(&mut out, '-', entry);
    }
    out.push_str(" *\n");
    out.push_str(HEADER_END);
    out.push('\n');
    out
}

fn push_entry(out: &mut String, bullet: char, entry: &ProvenanceEntry) {
    out.push_str(&format!(
        " *   {bullet} {} [{}] confidence {:.1}%\n",
        entry.optimization,
        entry.status.describe(),
        entry.confidence * 100.0
    ));
    if !entry.explanation.is_empty() {
        // Keep the comment well-formed whatever the explanation says.
        let explanation = entry.explanation.replace("*/", "* /");
        out.push_str(&format!(" *       {explanation}\n"));
    }
}

/// Drop a leading provenance header (and the blank line after it).
fn strip_header(text: &str) -> &str {
    let trimmed = text.trim_start_matches('\n');
    if !trimmed.starts_with(&format!("/*\n{HEADER_TITLE}\n")) {
        return text;
    }
    match trimmed.find(HEADER_END) {
        Some(end) => trimmed[end + HEADER_END.len()..].trim_start_matches('\n'),
        None => text,
    }
}
