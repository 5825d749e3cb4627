//! JSON output format for trial and corpus reports (--format json)

use crate::aggregate::{CellSummary, MeanTimeTable};
use crate::corpus::IngestReport;
use crate::difficulty::DifficultyIndex;
use crate::error::AnalysisError;
use crate::kinematics::TrajectoryMetrics;
use crate::throughput::RegressionResult;
use crate::trial::{TrialGeometry, TrialRecord};
use serde::{Deserialize, Serialize};

/// Outcome of one trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTrial {
    pub experiment: usize,
    pub latency_ms: u32,
    /// Seconds from first to last sample
    pub duration: f64,
    pub success: bool,
    /// Distance from the final position to the target center
    pub final_error: f64,
    pub samples: usize,
    pub geometry: TrialGeometry,
    pub kinematics: TrajectoryMetrics,
}

impl JsonTrial {
    pub fn from_trial(trial: &TrialRecord) -> Self {
        Self {
            experiment: trial.experiment,
            latency_ms: trial.latency_ms,
            duration: trial.duration(),
            success: trial.is_success(),
            final_error: trial.final_error(),
            samples: trial.samples().len(),
            geometry: trial.geometry,
            kinematics: TrajectoryMetrics::from_trial(trial),
        }
    }
}

/// A condition column of a mean-time table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCondition {
    pub experiment: usize,
    pub id: f64,
}

/// One latency row; `null` marks a cell without data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMeanTimeRow {
    pub latency_ms: u32,
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMeanTimeTable {
    pub policy: String,
    pub conditions: Vec<JsonCondition>,
    pub rows: Vec<JsonMeanTimeRow>,
}

impl JsonMeanTimeTable {
    pub fn from_table(table: &MeanTimeTable) -> Self {
        Self {
            policy: table.policy().label().to_string(),
            conditions: table
                .conditions()
                .iter()
                .map(|&(experiment, id)| JsonCondition { experiment, id })
                .collect(),
            rows: table
                .rows()
                .map(|(latency_ms, means)| JsonMeanTimeRow {
                    latency_ms,
                    means: means.to_vec(),
                })
                .collect(),
        }
    }
}

/// A trial file that failed to load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFailure {
    pub path: String,
    pub error: String,
}

impl JsonFailure {
    pub fn from_error(error: &AnalysisError) -> Self {
        match error {
            AnalysisError::Ingestion { path, source } => Self {
                path: path.display().to_string(),
                error: source.to_string(),
            },
            other => Self {
                path: String::new(),
                error: other.to_string(),
            },
        }
    }
}

/// Root structure for single-trial inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTrialReport {
    pub version: String,
    pub format: String,
    pub path: String,
    pub trial: JsonTrial,
}

impl JsonTrialReport {
    pub fn new(path: &str, trial: &TrialRecord) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "fittrace-trial-v1".to_string(),
            path: path.to_string(),
            trial: JsonTrial::from_trial(trial),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Root structure for corpus analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBatchReport {
    pub version: String,
    pub format: String,
    pub condition_count: usize,
    pub files_seen: usize,
    pub trial_count: usize,
    pub failures: Vec<JsonFailure>,
    /// Conditions whose trials did not share one geometry
    pub divergent_conditions: Vec<usize>,
    pub trials: Vec<JsonTrial>,
    pub cells: Vec<CellSummary>,
    pub tables: Vec<JsonMeanTimeTable>,
    pub models: Vec<RegressionResult>,
}

impl JsonBatchReport {
    pub fn new(
        report: &IngestReport,
        difficulty: &DifficultyIndex,
        cells: Vec<CellSummary>,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "fittrace-batch-v1".to_string(),
            condition_count: report.index.condition_count(),
            files_seen: report.files_seen,
            trial_count: report.trial_count(),
            failures: report.failures.iter().map(JsonFailure::from_error).collect(),
            divergent_conditions: difficulty.divergent().to_vec(),
            trials: report.index.trials().map(JsonTrial::from_trial).collect(),
            cells,
            tables: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Add an aggregation result and its fitted model
    pub fn add_analysis(&mut self, table: &MeanTimeTable, model: RegressionResult) {
        self.tables.push(JsonMeanTimeTable::from_table(table));
        self.models.push(model);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
