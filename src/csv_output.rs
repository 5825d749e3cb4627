//! CSV output format for trials, cells, mean-time tables and models
//!
//! Used by `--format csv` and by the plotting sink. Cells without data are
//! written as empty fields.

use crate::aggregate::{CellSummary, MeanTimeTable};
use crate::throughput::RegressionResult;
use crate::trial::TrialRecord;

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row of the per-trial listing
#[derive(Debug, Clone)]
pub struct CsvTrial {
    pub experiment: usize,
    pub latency_ms: u32,
    pub duration: f64,
    pub success: bool,
    pub final_error: f64,
}

impl CsvTrial {
    pub fn from_trial(trial: &TrialRecord) -> Self {
        Self {
            experiment: trial.experiment,
            latency_ms: trial.latency_ms,
            duration: trial.duration(),
            success: trial.is_success(),
            final_error: trial.final_error(),
        }
    }
}

/// Per-trial hit/miss listing
#[derive(Debug)]
pub struct CsvTrialOutput {
    trials: Vec<CsvTrial>,
}

impl CsvTrialOutput {
    pub fn new() -> Self {
        Self { trials: Vec::new() }
    }

    pub fn add_trial(&mut self, trial: CsvTrial) {
        self.trials.push(trial);
    }

    fn header() -> &'static str {
        "experiment,latency_ms,duration,success,final_error"
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(Self::header());
        output.push('\n');

        for trial in &self.trials {
            output.push_str(&trial.experiment.to_string());
            output.push(',');
            output.push_str(&trial.latency_ms.to_string());
            output.push(',');
            output.push_str(&trial.duration.to_string());
            output.push(',');
            output.push_str(if trial.success { "hit" } else { "miss" });
            output.push(',');
            output.push_str(&trial.final_error.to_string());
            output.push('\n');
        }

        output
    }
}

impl Default for CsvTrialOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptive statistics per cell
pub fn cells_to_csv(cells: &[CellSummary]) -> String {
    let mut output =
        String::from("latency_ms,experiment,trials,hits,hit_rate,mean_time,stddev_time,mean_hit_time\n");

    for cell in cells {
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            cell.latency_ms,
            cell.experiment,
            cell.trials,
            cell.hits,
            cell.hit_rate,
            cell.mean_time,
            cell.stddev_time,
            optional(cell.mean_hit_time)
        ));
    }

    output
}

/// Mean-time table in long form, one line per (latency, condition)
pub fn mean_time_to_csv(table: &MeanTimeTable) -> String {
    let mut output = String::from("latency_ms,experiment,id,mean_time\n");

    for (latency_ms, means) in table.rows() {
        for (&(experiment, id), mean) in table.conditions().iter().zip(means) {
            output.push_str(&format!(
                "{},{},{},{}\n",
                latency_ms,
                experiment,
                id,
                optional(*mean)
            ));
        }
    }

    output
}

/// Fitted models, one line per aggregation policy
pub fn models_to_csv(models: &[RegressionResult]) -> String {
    let mut output = String::from(
        "policy,observations,c1,c2,c3,coef_id,coef_latency_id,r_squared\n",
    );

    for model in models {
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            model.policy.label(),
            model.observations,
            model.intercept_c1,
            model.slope_c2,
            optional(model.ratio_c3),
            model.coef_id,
            model.coef_latency_id,
            model.r_squared
        ));
    }

    output
}

/// Time-normalized trace of one trial
pub fn trajectory_to_csv(trial: &TrialRecord) -> String {
    let mut output = String::from("time,x,y,z,button\n");

    for sample in trial.samples() {
        let button = match sample.button_pressed {
            Some(true) => "1",
            Some(false) => "0",
            None => "",
        };
        output.push_str(&format!(
            "{},{},{},{},{}\n",
            sample.time, sample.position.x, sample.position.y, sample.position.z, button
        ));
    }

    output
}
