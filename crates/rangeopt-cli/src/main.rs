//! rangeopt CLI
//!
//! Thin orchestration over the rangeopt crates:
//! - `features` / `facts`: inspect what the engine sees in a source or specification
//! - `analyze`: predictions and gate outcomes for one source
//! - `optimize` / `batch`: rewrite sources guided by a range specification
//! - `train`: persist a trained classifier bank so later runs skip training

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rangeopt_engine::{ClassifierBank, EngineConfig, Pipeline};
use rangeopt_features::FeatureExtractor;
use rangeopt_spec::SpecParser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod batch;
mod render;

#[derive(Parser)]
#[command(name = "rangeopt")]
#[command(
    author,
    version,
    about = "rangeopt: range-specification guided optimization of C sources"
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct EngineArgs {
    /// Engine configuration (JSON); omitted keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Load a classifier bank written by `rangeopt train` instead of training
    #[arg(long)]
    bank: Option<PathBuf>,
    /// Override the gate threshold (confidence must strictly exceed it)
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the code features extracted from a source file
    Features {
        source: PathBuf,
    },

    /// Print the facts derived from a specification (defaults when absent)
    Facts {
        #[arg(long)]
        spec: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Predict and gate every optimization for a source file
    Analyze {
        source: PathBuf,
        #[arg(long)]
        spec: Option<PathBuf>,
        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Rewrite a source file and annotate it with provenance
    Optimize {
        source: PathBuf,
        #[arg(long)]
        spec: Option<PathBuf>,
        /// Output path for the rewritten source
        #[arg(short, long)]
        out: PathBuf,
        /// Also write the analysis report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Optimize every `.c` file under a directory in parallel
    Batch {
        dir: PathBuf,
        #[arg(long)]
        spec: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Train the classifier bank and save it as JSON
    Train {
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Features { source } => cmd_features(&source),
        Commands::Facts { spec, config } => cmd_facts(spec.as_deref(), config.as_deref()),
        Commands::Analyze {
            source,
            spec,
            json,
            engine,
        } => cmd_analyze(&source, spec.as_deref(), json, &engine),
        Commands::Optimize {
            source,
            spec,
            out,
            report,
            engine,
        } => cmd_optimize(&source, spec.as_deref(), &out, report.as_deref(), &engine),
        Commands::Batch {
            dir,
            spec,
            out_dir,
            engine,
        } => {
            let pipeline = build_pipeline(&engine)?;
            let spec_text = read_spec(spec.as_deref());
            batch::run(&pipeline, &dir, spec_text.as_deref(), &out_dir)
        }
        Commands::Train { out, config } => cmd_train(&out, config.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Inputs
// ============================================================================

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading source {}", path.display()))
}

/// A missing or unreadable specification is not fatal: the engine falls back
/// to its conservative defaults.
fn read_spec(path: Option<&Path>) -> Option<String> {
    let path = path?;
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "specification unreadable; continuing without it"
            );
            None
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading engine config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn build_pipeline(args: &EngineArgs) -> Result<Pipeline> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    config.validate()?;

    let bank = match &args.bank {
        Some(path) => ClassifierBank::load_json(path)
            .with_context(|| format!("loading classifier bank {}", path.display()))?,
        None => ClassifierBank::trained(config.training.clone())?,
    };
    Ok(Pipeline::new(Arc::new(bank), &config)?)
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_features(source: &Path) -> Result<()> {
    let text = read_source(source)?;
    let features = FeatureExtractor::new().extract(&text);
    println!("{} {}", "Features of".green().bold(), source.display());
    render::print_values(features.iter());
    Ok(())
}

fn cmd_facts(spec: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let parser = SpecParser::new(config.spec);
    let facts = parser.parse(read_spec(spec).as_deref());
    println!(
        "{} origin {:?}, region {:?}",
        "Facts".green().bold(),
        facts.origin,
        facts.region
    );
    render::print_values(facts.iter());
    Ok(())
}

fn cmd_analyze(source: &Path, spec: Option<&Path>, json: bool, engine: &EngineArgs) -> Result<()> {
    let text = read_source(source)?;
    let pipeline = build_pipeline(engine)?;
    let report = pipeline.analyze(&text, read_spec(spec).as_deref())?;
    if json {
        println!("{}", report.to_json_pretty()?);
    } else {
        println!("{} {}", "Analyzing".green().bold(), source.display());
        render::print_report(&report);
    }
    Ok(())
}

fn cmd_optimize(
    source: &Path,
    spec: Option<&Path>,
    out: &Path,
    report_path: Option<&Path>,
    engine: &EngineArgs,
) -> Result<()> {
    let text = read_source(source)?;
    let pipeline = build_pipeline(engine)?;
    let outcome = pipeline.optimize(&text, read_spec(spec).as_deref())?;

    fs::write(out, &outcome.output).with_context(|| format!("writing {}", out.display()))?;
    if let Some(path) = report_path {
        outcome
            .report
            .write_json(path)
            .with_context(|| format!("writing report {}", path.display()))?;
        eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
    }

    println!("{} {}", "Optimizing".green().bold(), source.display());
    render::print_provenance(&outcome.provenance);
    eprintln!(
        "{} {} ({} applied)",
        "wrote".green().bold(),
        out.display().to_string().bold(),
        outcome.applied_count()
    );
    Ok(())
}

fn cmd_train(out: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let bank = ClassifierBank::trained(config.training)?;
    bank.save_json(out)
        .with_context(|| format!("saving classifier bank {}", out.display()))?;
    if let Some(summary) = bank.summary() {
        println!(
            "{} {} samples, seed {}",
            "Trained".green().bold(),
            summary.samples,
            summary.seed
        );
        for (id, accuracy) in &summary.holdout_accuracy {
            match accuracy {
                Some(acc) => println!("  {:<28} holdout accuracy {:>5.1}%", id.as_str(), acc * 100.0),
                None => println!("  {:<28} {}", id.as_str(), "no holdout rows".dimmed()),
            }
        }
    }
    eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    Ok(())
}
