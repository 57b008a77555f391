use colored::{ColoredString, Colorize};
use rangeopt_engine::{AnalysisReport, GateOutcome, ProvenanceEntry, ProvenanceStatus};

pub fn print_values<'a>(values: impl Iterator<Item = (&'a str, f64)>) {
    for (name, value) in values {
        println!("  {name:<32} {value:>14.4}");
    }
}

fn outcome_label(outcome: GateOutcome) -> ColoredString {
    let label = outcome.label();
    match outcome {
        GateOutcome::Approved => label.green(),
        GateOutcome::SuppressedLowConfidence => label.yellow(),
        GateOutcome::RejectedConfident => label.red(),
        GateOutcome::Indeterminate => label.dimmed(),
    }
}

pub fn print_report(report: &AnalysisReport) {
    println!(
        "  {} {}  facts: {}",
        "source".dimmed(),
        report.source_digest,
        if report.facts.is_default() { "conservative defaults".yellow() } else { "parsed".green() }
    );
    for decision in &report.gate.decisions {
        println!(
            "  {:<28} {:>6.1}%  {}",
            decision.optimization.as_str(),
            decision.confidence * 100.0,
            outcome_label(decision.outcome)
        );
        println!("      {}", decision.rationale.dimmed());
    }

    let s = &report.summary;
    println!(
        "  {} {} evaluated, {} recommended, {} approved (threshold {:.2}), mean confidence {:.1}%",
        "→".yellow(),
        s.total_evaluated,
        s.recommended,
        s.approved,
        report.gate.threshold,
        s.average_confidence * 100.0
    );
}

pub fn print_provenance(entries: &[ProvenanceEntry]) {
    for entry in entries {
        let status = match entry.status {
            ProvenanceStatus::Applied => entry.status.describe().green().bold(),
            ProvenanceStatus::Gate(outcome) => outcome_label(outcome),
            _ => entry.status.describe().yellow(),
        };
        println!(
            "  {:<28} {:>6.1}%  {}",
            entry.optimization.as_str(),
            entry.confidence * 100.0,
            status
        );
    }
}
