//! Corpus ingestion: session directories of trial files -> ResultsIndex
//!
//! Layout:
//!
//! ```text
//! root/
//!   session_01/
//!     20240311T101502_trace_0.txt
//!     20240311T101519_trace_1.txt
//!   session_02/
//!     ...
//! ```
//!
//! Only immediate subdirectories of the root are scanned. Files are loaded in
//! sorted path order (optionally across worker threads) and then grouped in
//! two passes: latencies are enumerated first, one fixed-size array of cells is
//! allocated per latency, and finally every trial is placed in its cell.

use crate::config::{AnalysisConfig, FailurePolicy};
use crate::error::{AnalysisError, Result};
use crate::trial::{TrialParser, TrialRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Trials sharing one (latency, experiment) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionCell {
    latency_ms: u32,
    experiment: usize,
    trials: Vec<TrialRecord>,
}

impl ConditionCell {
    pub fn new(latency_ms: u32, experiment: usize) -> Self {
        Self {
            latency_ms,
            experiment,
            trials: Vec::new(),
        }
    }

    /// Build a cell from existing trials (trials must share the cell's key)
    pub fn with_trials(latency_ms: u32, experiment: usize, trials: Vec<TrialRecord>) -> Self {
        Self {
            latency_ms,
            experiment,
            trials,
        }
    }

    pub fn latency_ms(&self) -> u32 {
        self.latency_ms
    }

    pub fn experiment(&self) -> usize {
        self.experiment
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Trials that ended inside the target
    pub fn successes(&self) -> impl Iterator<Item = &TrialRecord> {
        self.trials.iter().filter(|t| t.is_success())
    }
}

/// Trials grouped by latency cohort, then by experiment number
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsIndex {
    condition_count: usize,
    cohorts: BTreeMap<u32, Vec<ConditionCell>>,
}

impl ResultsIndex {
    /// Group trials into cells
    ///
    /// Fails with `ConditionOutOfRange` if any trial's experiment number is
    /// not below `condition_count`.
    pub fn from_trials(trials: Vec<TrialRecord>, condition_count: usize) -> Result<Self> {
        if let Some(trial) = trials.iter().find(|t| t.experiment >= condition_count) {
            return Err(AnalysisError::ConditionOutOfRange {
                experiment: trial.experiment,
                condition_count,
            });
        }

        // Pass 1: every latency cohort present
        let latencies: BTreeSet<u32> = trials.iter().map(|t| t.latency_ms).collect();

        let mut cohorts: BTreeMap<u32, Vec<ConditionCell>> = latencies
            .into_iter()
            .map(|latency| {
                let cells = (0..condition_count)
                    .map(|experiment| ConditionCell::new(latency, experiment))
                    .collect();
                (latency, cells)
            })
            .collect();

        // Pass 2: place trials
        for trial in trials {
            if let Some(cells) = cohorts.get_mut(&trial.latency_ms) {
                cells[trial.experiment].trials.push(trial);
            }
        }

        Ok(Self {
            condition_count,
            cohorts,
        })
    }

    pub fn condition_count(&self) -> usize {
        self.condition_count
    }

    /// Latency cohorts in ascending order
    pub fn latencies(&self) -> impl Iterator<Item = u32> + '_ {
        self.cohorts.keys().copied()
    }

    /// All cells of one latency cohort, indexed by experiment number
    pub fn cohort(&self, latency_ms: u32) -> Option<&[ConditionCell]> {
        self.cohorts.get(&latency_ms).map(Vec::as_slice)
    }

    pub fn cell(&self, latency_ms: u32, experiment: usize) -> Option<&ConditionCell> {
        self.cohort(latency_ms)?.get(experiment)
    }

    /// Every cell, latency ascending then experiment ascending
    pub fn cells(&self) -> impl Iterator<Item = &ConditionCell> {
        self.cohorts.values().flatten()
    }

    /// Every trial, in cell order
    pub fn trials(&self) -> impl Iterator<Item = &TrialRecord> {
        self.cells().flat_map(|cell| cell.trials.iter())
    }

    pub fn trial_count(&self) -> usize {
        self.cells().map(ConditionCell::len).sum()
    }

    /// Experiment numbers with at least one trial in any cohort
    pub fn observed_conditions(&self) -> BTreeSet<usize> {
        self.cells()
            .filter(|cell| !cell.is_empty())
            .map(ConditionCell::experiment)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.trial_count() == 0
    }
}

/// Outcome of a corpus ingestion run
#[derive(Debug)]
pub struct IngestReport {
    pub index: ResultsIndex,
    /// Files that failed to load (only under `FailurePolicy::SkipAndReport`)
    pub failures: Vec<AnalysisError>,
    /// Trial files discovered under the root
    pub files_seen: usize,
}

impl IngestReport {
    pub fn trial_count(&self) -> usize {
        self.index.trial_count()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// List trial files one level below `root`, in sorted order
pub fn discover_trial_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut sessions = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            sessions.push(path);
        }
    }
    sessions.sort();

    let mut files = Vec::new();
    for session in sessions {
        let mut session_files = Vec::new();
        for entry in std::fs::read_dir(&session)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if matches && path.is_file() {
                session_files.push(path);
            }
        }
        session_files.sort();
        files.extend(session_files);
    }

    Ok(files)
}

/// Load every trial file under `root` and group the trials
///
/// # Example
/// ```no_run
/// use fittrace::config::AnalysisConfig;
/// use fittrace::corpus::ingest;
/// use std::path::Path;
///
/// let report = ingest(Path::new("data/"), &AnalysisConfig::default()).unwrap();
/// println!("{} trials in {} files", report.trial_count(), report.files_seen);
/// ```
pub fn ingest(root: &Path, config: &AnalysisConfig) -> Result<IngestReport> {
    config.validate()?;

    let files = discover_trial_files(root, config.extension())?;
    tracing::info!(
        "Discovered {} trial files under {}",
        files.len(),
        root.display()
    );

    let parser = TrialParser::new()?;
    let loaded = load_files(&files, &parser, config.condition_count, config.jobs)?;

    let mut trials = Vec::with_capacity(loaded.len());
    let mut failures = Vec::new();
    for (path, result) in loaded {
        match result {
            Ok(trial) => {
                tracing::debug!(
                    "Loaded {} (experiment {}, latency {} ms, {} samples)",
                    path.display(),
                    trial.experiment,
                    trial.latency_ms,
                    trial.samples().len()
                );
                trials.push(trial);
            }
            Err(e) => {
                let err = AnalysisError::ingestion(path, e);
                match config.failure_policy {
                    FailurePolicy::FailFast => return Err(err),
                    FailurePolicy::SkipAndReport => {
                        tracing::warn!("Skipping trial file: {}", err);
                        failures.push(err);
                    }
                }
            }
        }
    }

    let index = ResultsIndex::from_trials(trials, config.condition_count)?;
    tracing::info!(
        "Loaded {} trials ({} files failed)",
        index.trial_count(),
        failures.len()
    );

    Ok(IngestReport {
        index,
        failures,
        files_seen: files.len(),
    })
}

type LoadedTrial = (PathBuf, Result<TrialRecord>);

/// Load files in order, across `jobs` scoped threads when worthwhile
fn load_files(
    files: &[PathBuf],
    parser: &TrialParser,
    condition_count: usize,
    jobs: usize,
) -> Result<Vec<LoadedTrial>> {
    if jobs <= 1 || files.len() < 2 {
        return Ok(files
            .iter()
            .map(|path| (path.clone(), load_one(path, parser, condition_count)))
            .collect());
    }

    let chunk_size = files.len().div_ceil(jobs);
    crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|path| (path.clone(), load_one(path, parser, condition_count)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        // Joined in spawn order, so the overall order matches `files`
        let mut loaded = Vec::with_capacity(files.len());
        for handle in handles {
            let chunk = handle
                .join()
                .map_err(|_| AnalysisError::Worker("trial loader thread panicked".to_string()))?;
            loaded.extend(chunk);
        }
        Ok(loaded)
    })
    .map_err(|_| AnalysisError::Worker("trial loader scope panicked".to_string()))?
}

fn load_one(path: &Path, parser: &TrialParser, condition_count: usize) -> Result<TrialRecord> {
    let trial = parser.parse_file(path)?;
    if trial.experiment >= condition_count {
        return Err(AnalysisError::ConditionOutOfRange {
            experiment: trial.experiment,
            condition_count,
        });
    }
    Ok(trial)
}
