use anyhow::{Context, Result};
use clap::Parser;
use fittrace::aggregate::{self, CellSummary, MeanTimeTable};
use fittrace::cli::{Cli, OutputFormat};
use fittrace::config::{AnalysisConfig, FailurePolicy};
use fittrace::corpus::{self, IngestReport};
use fittrace::csv_output::{self, CsvTrial, CsvTrialOutput};
use fittrace::difficulty::DifficultyIndex;
use fittrace::json_output::{JsonBatchReport, JsonFailure, JsonTrialReport};
use fittrace::kinematics::TrajectoryMetrics;
use fittrace::sink::{self, CsvPlotSink};
use fittrace::throughput::{self, FitConfig, RegressionResult};
use fittrace::trial::TrialRecord;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber (warnings by default, everything with --debug)
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the optional TOML file with command line overrides
fn build_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(conditions) = args.conditions {
        config.condition_count = conditions;
    }
    if let Some(extension) = &args.extension {
        config.trial_extension = extension.clone();
    }
    if let Some(latency) = args.reference_latency {
        config.reference_latency_ms = Some(latency);
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if args.keep_going {
        config.failure_policy = FailurePolicy::SkipAndReport;
    }

    config.validate()?;
    Ok(config)
}

fn open_sink(dir: Option<&Path>) -> Option<CsvPlotSink> {
    let dir = dir?;
    match CsvPlotSink::new(dir) {
        Ok(sink) => Some(sink),
        Err(e) => {
            tracing::warn!("Cannot write plot series to {}: {}", dir.display(), e);
            None
        }
    }
}

fn print_trial_text(path: &Path, trial: &TrialRecord) {
    let metrics = TrajectoryMetrics::from_trial(trial);

    println!("Trial: {}", path.display());
    println!("  experiment:     {}", trial.experiment);
    println!("  latency:        {} ms", trial.latency_ms);
    println!(
        "  source:         {} (size {})",
        trial.geometry.source, trial.geometry.source_size
    );
    println!(
        "  target:         {} (size {})",
        trial.geometry.target, trial.geometry.target_size
    );
    println!("  samples:        {}", trial.samples().len());
    println!("  duration:       {:.4} s", trial.duration());
    println!(
        "  outcome:        {} (final error {:.4})",
        outcome(trial),
        trial.final_error()
    );
    println!("  path length:    {:.4}", metrics.path_length);
    println!("  efficiency:     {:.3}", metrics.path_efficiency);
    println!("  peak speed:     {:.4} /s", metrics.peak_speed);
    println!("  mean speed:     {:.4} /s", metrics.mean_speed);
}

fn outcome(trial: &TrialRecord) -> &'static str {
    if trial.is_success() {
        "hit"
    } else {
        "miss"
    }
}

/// Single-trial inspection
fn inspect_trial(args: &Cli) -> Result<()> {
    let trial = TrialRecord::from_file(&args.path)
        .with_context(|| format!("failed to load trial {}", args.path.display()))?;

    match args.format {
        OutputFormat::Text => print_trial_text(&args.path, &trial),
        OutputFormat::Json => {
            let report = JsonTrialReport::new(&args.path.display().to_string(), &trial);
            println!("{}", report.to_json()?);
        }
        OutputFormat::Csv => {
            let mut output = CsvTrialOutput::new();
            output.add_trial(CsvTrial::from_trial(&trial));
            print!("{}", output.to_csv());
        }
    }

    if let Some(mut sink) = open_sink(args.plot_dir.as_deref()) {
        sink::emit(&mut sink, [&trial], &[]);
    }

    Ok(())
}

fn print_mean_time_table(table: &MeanTimeTable) {
    println!("Mean movement time ({}):", table.policy().label());

    let mut header = format!("  {:>10}", "latency");
    for (experiment, id) in table.conditions() {
        header.push_str(&format!("  e{:<2}({:>5.2})", experiment, id));
    }
    println!("{}", header);

    for (latency_ms, means) in table.rows() {
        let mut line = format!("  {:>7} ms", latency_ms);
        for mean in means {
            match mean {
                Some(value) => line.push_str(&format!("  {:>10.4}", value)),
                None => line.push_str(&format!("  {:>10}", "no data")),
            }
        }
        println!("{}", line);
    }
    println!();
}

fn print_batch_text(
    report: &IngestReport,
    difficulty: &DifficultyIndex,
    cells: &[CellSummary],
    tables: &[MeanTimeTable],
    models: &[RegressionResult],
) {
    println!("Conditions: {}", report.index.condition_count());
    println!(
        "Trials: {} ({} files, {} failed)",
        report.trial_count(),
        report.files_seen,
        report.failures.len()
    );
    println!();

    println!("Index of difficulty:");
    for (experiment, id) in difficulty.ordered() {
        let marker = if difficulty.divergent().contains(&experiment) {
            " (geometry varies)"
        } else {
            ""
        };
        println!("  experiment {:>2}: {:.4} bits{}", experiment, id, marker);
    }
    println!();

    println!("Trials:");
    for trial in report.index.trials() {
        let metrics = TrajectoryMetrics::from_trial(trial);
        println!(
            "  latency {:>4} ms  experiment {:>2}  {:>8.4} s  {:<4}  efficiency {:.3}",
            trial.latency_ms,
            trial.experiment,
            trial.duration(),
            outcome(trial),
            metrics.path_efficiency
        );
    }
    println!();

    println!("Cells:");
    println!(
        "  {:>7}  {:>3}  {:>6}  {:>4}  {:>8}  {:>8}  {:>8}",
        "latency", "exp", "trials", "hits", "mean", "stddev", "mean hit"
    );
    for cell in cells {
        let mean_hit = cell
            .mean_hit_time
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "no data".to_string());
        println!(
            "  {:>7}  {:>3}  {:>6}  {:>4}  {:>8.4}  {:>8.4}  {:>8}",
            cell.latency_ms,
            cell.experiment,
            cell.trials,
            cell.hits,
            cell.mean_time,
            cell.stddev_time,
            mean_hit
        );
    }
    println!();

    for table in tables {
        print_mean_time_table(table);
    }

    for model in models {
        println!("{}", model.to_report_string());
    }
}

fn report_failures(failures: &[fittrace::AnalysisError]) {
    for failure in failures {
        let failure = JsonFailure::from_error(failure);
        eprintln!("Failed to load {}: {}", failure.path, failure.error);
    }
}

/// Corpus analysis over a directory of sessions
fn analyze_corpus(args: &Cli, config: &AnalysisConfig) -> Result<()> {
    let report = corpus::ingest(&args.path, config)
        .with_context(|| format!("failed to ingest {}", args.path.display()))?;

    if report.index.is_empty() {
        report_failures(&report.failures);
        anyhow::bail!(
            "no trials loaded from {} ({} files found)",
            args.path.display(),
            report.files_seen
        );
    }

    let difficulty = DifficultyIndex::from_results(&report.index, config.reference_latency_ms);
    let fit_config = FitConfig::from(config);

    let mut tables = Vec::new();
    let mut models = Vec::new();
    for policy in args.policy.policies() {
        let table = aggregate::aggregate(&report.index, &difficulty, policy)
            .with_context(|| format!("{} aggregation failed", policy.label()))?;
        let model = throughput::fit_throughput(&table, &fit_config)
            .with_context(|| format!("{} model fit failed", policy.label()))?;
        tables.push(table);
        models.push(model);
    }

    let cells = aggregate::summarize(&report.index).context("cell summary failed")?;

    match args.format {
        OutputFormat::Text => {
            print_batch_text(&report, &difficulty, &cells, &tables, &models);
        }
        OutputFormat::Json => {
            let mut json = JsonBatchReport::new(&report, &difficulty, cells);
            for (table, model) in tables.iter().zip(&models) {
                json.add_analysis(table, model.clone());
            }
            println!("{}", json.to_json()?);
        }
        OutputFormat::Csv => {
            let mut trials = CsvTrialOutput::new();
            for trial in report.index.trials() {
                trials.add_trial(CsvTrial::from_trial(trial));
            }
            print!("{}", trials.to_csv());
            println!();
            print!("{}", csv_output::cells_to_csv(&cells));
            for table in &tables {
                println!();
                println!("# {}", table.policy().label());
                print!("{}", csv_output::mean_time_to_csv(table));
            }
            println!();
            print!("{}", csv_output::models_to_csv(&models));
        }
    }

    if let Some(mut sink) = open_sink(args.plot_dir.as_deref()) {
        let failed = sink::emit(&mut sink, report.index.trials(), &tables);
        tracing::info!(
            "Wrote {} plot series to {} ({} failed)",
            sink.written().len(),
            sink.dir().display(),
            failed
        );
    }

    if report.has_failures() {
        report_failures(&report.failures);
        anyhow::bail!("{} trial files failed to load", report.failures.len());
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing before anything can log
    init_tracing(args.debug);

    let config = build_config(&args)?;

    if args.path.is_file() {
        inspect_trial(&args)
    } else if args.path.is_dir() {
        analyze_corpus(&args, &config)
    } else {
        anyhow::bail!("{} is neither a trial file nor a directory", args.path.display())
    }
}
