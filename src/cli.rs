//! CLI argument parsing for fittrace

use crate::aggregate::AggregationPolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

/// Which aggregation policies to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Mean over every trial
    All,
    /// Mean over trials that ended in the target
    Successes,
    /// Both policies (default)
    Both,
}

impl PolicyArg {
    pub fn policies(self) -> Vec<AggregationPolicy> {
        match self {
            Self::All => vec![AggregationPolicy::AllTrials],
            Self::Successes => vec![AggregationPolicy::SuccessesOnly],
            Self::Both => vec![AggregationPolicy::AllTrials, AggregationPolicy::SuccessesOnly],
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "fittrace")]
#[command(version)]
#[command(
    about = "Fitts'-law analysis of latency-injected pointing trials",
    long_about = None
)]
pub struct Cli {
    /// Trial file (single-trial inspection) or corpus root directory
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Number of distinct target conditions (experiments 0..N)
    #[arg(short = 'n', long = "conditions", value_name = "N")]
    pub conditions: Option<usize>,

    /// Trial file extension
    #[arg(long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    /// Aggregation policy
    #[arg(long = "policy", value_enum, default_value = "both")]
    pub policy: PolicyArg,

    /// Output format (text, json or csv)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Latency cohort whose geometry defines each condition's ID
    #[arg(long = "reference-latency", value_name = "MS")]
    pub reference_latency: Option<u32>,

    /// Worker threads for loading trial files
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Skip unreadable trial files, report them, and exit non-zero at the end
    #[arg(long = "keep-going")]
    pub keep_going: bool,

    /// TOML analysis configuration (flags override file values)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write plotting series (CSV) into this directory
    #[arg(long = "plot-dir", value_name = "DIR")]
    pub plot_dir: Option<PathBuf>,

    /// Enable verbose tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
