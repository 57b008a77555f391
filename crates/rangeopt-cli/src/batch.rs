use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use rangeopt_engine::Pipeline;
use rangeopt_spec::digest::text_digest_v1;
use rangeopt_spec::SpecFacts;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `.c` files under `dir`, sorted for stable output.
pub fn collect_sources(dir: &Path) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "c"))
        .collect();
    sources.sort();
    sources
}

/// Where the rewritten copy of `source` goes, mirroring its place under `root`.
pub fn output_path(root: &Path, source: &Path, out_dir: &Path) -> PathBuf {
    match source.strip_prefix(root) {
        Ok(relative) => out_dir.join(relative),
        Err(_) => out_dir.join(source.file_name().unwrap_or_default()),
    }
}

fn optimize_one(
    pipeline: &Pipeline,
    facts: &SpecFacts,
    spec_digest: Option<&String>,
    source: &Path,
    target: &Path,
) -> Result<usize> {
    let text = fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))?;
    let outcome = pipeline.optimize_with_facts(&text, facts.clone(), spec_digest.cloned())?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(target, &outcome.output).with_context(|| format!("writing {}", target.display()))?;
    Ok(outcome.applied_count())
}

/// Optimize every source in parallel. The specification is parsed once and
/// the pipeline (with its trained bank) is shared by all workers.
pub fn run(pipeline: &Pipeline, dir: &Path, spec: Option<&str>, out_dir: &Path) -> Result<()> {
    let sources = collect_sources(dir);
    if sources.is_empty() {
        return Err(anyhow!("no .c sources under {}", dir.display()));
    }
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let facts = pipeline.spec_parser().parse(spec);
    let spec_digest = spec.map(text_digest_v1);
    println!(
        "{} {} sources from {}",
        "Optimizing".green().bold(),
        sources.len(),
        dir.display()
    );

    let results: Vec<(PathBuf, Result<usize>)> = sources
        .par_iter()
        .map(|source| {
            let target = output_path(dir, source, out_dir);
            let result = optimize_one(pipeline, &facts, spec_digest.as_ref(), source, &target);
            (source.clone(), result)
        })
        .collect();

    let mut failed = 0usize;
    for (source, result) in &results {
        match result {
            Ok(applied) => println!("  {} {} ({applied} applied)", "ok".green().bold(), source.display()),
            Err(err) => {
                failed += 1;
                tracing::error!(path = %source.display(), error = %err, "optimization failed");
                println!("  {} {}: {err:#}", "failed".red().bold(), source.display());
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} sources failed", results.len()));
    }
    Ok(())
}
