//! Plotting sink
//!
//! Rendering lives outside this crate. A `PlotSink` receives finished series
//! (single-trial trajectories and per-policy mean-time tables) and hands them
//! to whatever draws them. `CsvPlotSink` writes one CSV file per series;
//! trajectories are numbered per cell in the order they are received.

use crate::aggregate::MeanTimeTable;
use crate::csv_output::{mean_time_to_csv, trajectory_to_csv};
use crate::error::Result;
use crate::trial::TrialRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Consumer of finished plotting series
pub trait PlotSink {
    /// Position trace of one trial
    fn trajectory(&mut self, trial: &TrialRecord) -> Result<()>;

    /// Mean movement time against ID, one curve per latency
    fn mean_time_curves(&mut self, table: &MeanTimeTable) -> Result<()>;
}

/// Writes series as CSV files into a directory
#[derive(Debug)]
pub struct CsvPlotSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
    /// Trajectories written so far per (experiment, latency)
    trajectories: BTreeMap<(usize, u32), usize>,
}

impl CsvPlotSink {
    /// Create the sink, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
            trajectories: BTreeMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, name: String, content: String) -> Result<()> {
        let path = self.dir.join(name);
        std::fs::write(&path, content)?;
        tracing::debug!("Wrote plot series {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

impl PlotSink for CsvPlotSink {
    fn trajectory(&mut self, trial: &TrialRecord) -> Result<()> {
        let ordinal = self
            .trajectories
            .entry((trial.experiment, trial.latency_ms))
            .or_insert(0);
        let name = format!(
            "trajectory_e{}_l{}_t{}.csv",
            trial.experiment, trial.latency_ms, ordinal
        );
        *ordinal += 1;
        self.write(name, trajectory_to_csv(trial))
    }

    fn mean_time_curves(&mut self, table: &MeanTimeTable) -> Result<()> {
        let name = format!("mean_time_{}.csv", table.policy().label());
        self.write(name, mean_time_to_csv(table))
    }
}

/// Feed a sink, logging failures instead of returning them
///
/// Returns the number of series the sink rejected.
pub fn emit<'a>(
    sink: &mut dyn PlotSink,
    trials: impl IntoIterator<Item = &'a TrialRecord>,
    tables: &[MeanTimeTable],
) -> usize {
    let mut failed = 0;

    for trial in trials {
        if let Err(e) = sink.trajectory(trial) {
            tracing::warn!(
                "Plot sink rejected trajectory (experiment {}, latency {} ms): {}",
                trial.experiment,
                trial.latency_ms,
                e
            );
            failed += 1;
        }
    }

    for table in tables {
        if let Err(e) = sink.mean_time_curves(table) {
            tracing::warn!(
                "Plot sink rejected {} mean-time curves: {}",
                table.policy().label(),
                e
            );
            failed += 1;
        }
    }

    failed
}
