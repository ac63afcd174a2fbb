//! eduscore: Educational Resource Quality Evaluator CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eduscore::analyzer::engine::DocumentReport;
use eduscore::analyzer::EvaluationEngine;
use eduscore::config::{
    build_ignore_set, is_ignored, load_config, starter_config, CliOverrides, Config,
    CONFIG_FILENAME,
};
use eduscore::document::loader::is_supported;
use eduscore::logging::init_logging;
use eduscore::reporter::{ConsoleReporter, JsonReporter, TextReporter};
use eduscore::{parse_components, Component, GradeBand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

/// eduscore: quality evaluator for educational resources
#[derive(Parser, Debug)]
#[command(name = "eduscore")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_negates_reqs = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Document or directory to evaluate (omit when using a subcommand)
    #[arg(required = true)]
    path: Option<PathBuf>,

    /// Only run these components (comma-separated: curriculum,readability,pedagogy,bias)
    #[arg(long, value_name = "LIST", value_parser = parse_components)]
    only: Option<BTreeSet<Component>>,

    /// Subject to check curriculum against (overrides document metadata)
    #[arg(long)]
    subject: Option<String>,

    /// Target grade level, e.g. "4", "6-8", "high school" (overrides document metadata)
    #[arg(long)]
    grade: Option<String>,

    /// Curriculum framework JSON (default: built-in)
    #[arg(long, value_name = "FILE")]
    framework: Option<PathBuf>,

    /// Bias term list JSON (default: built-in)
    #[arg(long, value_name = "FILE")]
    bias_terms: Option<PathBuf>,

    /// Path to config file (default: search .eduscorerc.json in current dir and parents)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format as JSON
    #[arg(long, short)]
    json: bool,

    /// Also write a plain-text report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Minimum composite score (exit 1 if any document is below)
    #[arg(long, short)]
    threshold: Option<f64>,

    /// Quiet mode (minimal output)
    #[arg(long, short)]
    quiet: bool,

    /// Verbose output and debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Number of parallel threads for directories (default: number of CPU cores)
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create .eduscorerc.json with sensible defaults
    Init {
        /// Minimum composite score (e.g. 70)
        #[arg(long)]
        threshold: Option<f64>,

        /// Default subject for documents that declare none
        #[arg(long)]
        subject: Option<String>,

        /// Default grade level for documents that declare none
        #[arg(long)]
        grade: Option<String>,

        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::Init {
                threshold,
                subject,
                grade,
                dir,
            } => run_init(threshold, subject, grade, dir.as_deref()),
        };
    }

    let Some(path) = args.path.clone() else {
        anyhow::bail!("a document or directory is required");
    };

    let grade = args.grade.as_deref().map(parse_grade).transpose()?;
    if let Some(threshold) = args.threshold {
        validate_threshold(threshold)?;
    }

    // Resolve work directory for config search
    let work_dir = if path.is_file() {
        path.parent().unwrap_or(Path::new("."))
    } else {
        path.as_path()
    };

    // Load config (CLI flags override config file)
    let config = load_config(work_dir, args.config.as_deref())?.merge_with_cli(CliOverrides {
        threshold: args.threshold,
        components: args.only.as_ref().map(|set| set.iter().copied().collect()),
        framework: args.framework.as_ref().map(|p| p.to_string_lossy().into_owned()),
        bias_terms: args.bias_terms.as_ref().map(|p| p.to_string_lossy().into_owned()),
        subject: args.subject.clone(),
        grade: args.grade.clone(),
    });

    let ignore_set = if config.ignore.is_empty() {
        None
    } else {
        Some(build_ignore_set(&config.ignore)?)
    };

    let documents = collect_documents(&path, ignore_set.as_ref())?;
    if documents.is_empty() {
        eprintln!("{}: No supported documents found (.txt, .md, .csv)", "Warning".yellow());
        return Ok(ExitCode::from(2));
    }

    let engine = EvaluationEngine::from_config(&config)?
        .with_subject(args.subject.clone())
        .with_grade(grade);

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let (mut results, had_errors) = if documents.len() == 1 {
        (vec![engine.evaluate_path(&documents[0], Some(&config))?], false)
    } else {
        evaluate_parallel(&engine, &documents, &config, args.quiet)
    };

    if results.is_empty() {
        eprintln!("{}: All documents failed to evaluate", "Error".red());
        return Ok(ExitCode::from(2));
    }

    // An explicit --threshold beats per-path overrides
    if args.threshold.is_some() {
        for report in &mut results {
            report.threshold = args.threshold;
        }
    }

    let stats = EvaluationEngine::aggregate_stats(&results);

    if args.json {
        let reporter = JsonReporter::new().pretty();
        if results.len() == 1 {
            println!("{}", reporter.report(&results[0]));
        } else {
            println!("{}", reporter.report_with_summary(&results, &stats));
        }
    } else if args.quiet {
        let reporter = ConsoleReporter::new();
        for report in &results {
            reporter.report_quiet(report);
        }
    } else {
        let mut reporter = ConsoleReporter::new();
        if args.verbose {
            reporter = reporter.verbose();
        }
        if results.len() == 1 {
            reporter.report(&results[0]);
        } else {
            reporter.report_many(&results, &stats);
        }
    }

    if let Some(report_path) = &args.report {
        TextReporter::new().write(report_path, &results, Some(&stats))?;
        if !args.quiet && !args.json {
            eprintln!(
                "{}: Report written to {}",
                "Info".blue(),
                report_path.display()
            );
        }
    }

    let failing: Vec<&DocumentReport> = results.iter().filter(|r| !r.passes()).collect();
    if !failing.is_empty() {
        if !args.quiet && !args.json {
            for report in &failing {
                eprintln!(
                    "\n{}: {} scored {:.1}, below threshold {:.0}",
                    "Failed".red().bold(),
                    report.name(),
                    report.composite(),
                    report.threshold.unwrap_or_default()
                );
            }
        }
        return Ok(ExitCode::from(1));
    }

    if had_errors {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn parse_grade(value: &str) -> Result<GradeBand> {
    GradeBand::parse(value).with_context(|| format!("Unrecognized grade level: {}", value))
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&threshold) {
        anyhow::bail!("Threshold must be between 0 and 100 (got {})", threshold);
    }
    Ok(())
}

fn run_init(
    threshold: Option<f64>,
    subject: Option<String>,
    grade: Option<String>,
    dir: Option<&Path>,
) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let dir = dir.unwrap_or(&cwd);
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(g) = grade.as_deref() {
        parse_grade(g)?;
    }
    let threshold_value = threshold.unwrap_or(70.0);
    validate_threshold(threshold_value)?;

    let json = starter_config(threshold_value, subject.as_deref(), grade.as_deref());
    std::fs::write(&config_path, json)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!(
        "{}: Created {} with threshold={}",
        "Done".green().bold(),
        config_path.display(),
        threshold_value
    );
    Ok(ExitCode::SUCCESS)
}

fn collect_documents(
    path: &Path,
    ignore_set: Option<&globset::GlobSet>,
) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if let Some(set) = ignore_set {
            if is_ignored(path, set) {
                return Ok(vec![]);
            }
        }
        // A single named file goes to the loader even if unsupported, so the
        // user sees why it was rejected
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let file_path = entry.path();
        if !entry.file_type().is_file() || !is_supported(file_path) || is_hidden(file_path, path) {
            continue;
        }
        if let Some(set) = ignore_set {
            if is_ignored(file_path, set) {
                continue;
            }
        }
        files.push(file_path.to_path_buf());
    }

    // Sort for consistent output
    files.sort();

    Ok(files)
}

/// Dot-files and dot-directories below the search root
fn is_hidden(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Evaluate documents in parallel; failures are reported and skipped
fn evaluate_parallel(
    engine: &EvaluationEngine,
    files: &[PathBuf],
    config: &Config,
    quiet: bool,
) -> (Vec<DocumentReport>, bool) {
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    let had_errors = AtomicBool::new(false);

    let results: Vec<_> = files
        .par_iter()
        .filter_map(|file| match engine.evaluate_path(file, Some(config)) {
            Ok(report) => Some(report),
            Err(e) => {
                had_errors.store(true, Ordering::Relaxed);
                if !quiet {
                    eprintln!(
                        "{}: Failed to evaluate {}: {:#}",
                        "Error".red(),
                        file.display(),
                        e
                    );
                }
                None
            }
        })
        .collect();

    (results, had_errors.load(Ordering::Relaxed))
}
