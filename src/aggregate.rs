//! Per-cell movement time aggregation
//!
//! Two policies:
//! - `AllTrials`: mean over every trial, hits and misses alike. An empty cell
//!   is an error.
//! - `SuccessesOnly`: mean over trials that ended in the target. A cell with no
//!   successful trial has no data (`None`), which is distinct from a zero mean.
//!
//! Within each latency row, cells follow ascending index of difficulty.

use crate::corpus::{ConditionCell, ResultsIndex};
use crate::difficulty::DifficultyIndex;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trueno::Vector;

/// Which trials contribute to a cell's mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    AllTrials,
    SuccessesOnly,
}

impl AggregationPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AllTrials => "all_trials",
            Self::SuccessesOnly => "successes_only",
        }
    }
}

/// Mean durations per latency cohort, aligned with an ID-sorted condition list
#[derive(Debug, Clone, PartialEq)]
pub struct MeanTimeTable {
    policy: AggregationPolicy,
    conditions: Vec<(usize, f64)>,
    rows: BTreeMap<u32, Vec<Option<f64>>>,
}

impl MeanTimeTable {
    /// Create an empty table for the given (experiment, ID) ordering
    pub fn new(policy: AggregationPolicy, conditions: Vec<(usize, f64)>) -> Self {
        Self {
            policy,
            conditions,
            rows: BTreeMap::new(),
        }
    }

    /// Add one latency row; entries must align with `conditions()`
    pub fn push_row(&mut self, latency_ms: u32, means: Vec<Option<f64>>) -> Result<()> {
        if means.len() != self.conditions.len() {
            return Err(AnalysisError::MisalignedRow {
                latency_ms,
                found: means.len(),
                expected: self.conditions.len(),
            });
        }
        self.rows.insert(latency_ms, means);
        Ok(())
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// (experiment, ID) pairs in row order
    pub fn conditions(&self) -> &[(usize, f64)] {
        &self.conditions
    }

    pub fn latencies(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    pub fn row(&self, latency_ms: u32) -> Option<&[Option<f64>]> {
        self.rows.get(&latency_ms).map(Vec::as_slice)
    }

    /// (latency, row) pairs in ascending latency order
    pub fn rows(&self) -> impl Iterator<Item = (u32, &[Option<f64>])> {
        self.rows.iter().map(|(&latency, row)| (latency, row.as_slice()))
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// Cells with a defined mean
    pub fn defined_count(&self) -> usize {
        self.rows.values().flatten().filter(|m| m.is_some()).count()
    }

    /// Cells marked "no data"
    pub fn no_data_count(&self) -> usize {
        self.cell_count() - self.defined_count()
    }
}

fn duration_vector(durations: &[f64]) -> Vector<f32> {
    let values: Vec<f32> = durations.iter().map(|&d| d as f32).collect();
    Vector::from_slice(&values)
}

fn statistics_error(e: trueno::TruenoError) -> AnalysisError {
    AnalysisError::Statistics(e.to_string())
}

/// Mean of a set of durations via trueno, `None` when empty
pub fn mean_duration(durations: &[f64]) -> Result<Option<f64>> {
    if durations.is_empty() {
        return Ok(None);
    }
    let mean = duration_vector(durations).mean().map_err(statistics_error)?;
    Ok(Some(f64::from(mean)))
}

/// Mean duration of one cell under a policy
pub fn cell_mean(cell: &ConditionCell, policy: AggregationPolicy) -> Result<Option<f64>> {
    match policy {
        AggregationPolicy::AllTrials => {
            if cell.is_empty() {
                return Err(AnalysisError::EmptyCell {
                    latency_ms: cell.latency_ms(),
                    experiment: cell.experiment(),
                });
            }
            let durations: Vec<f64> = cell.trials().iter().map(|t| t.duration()).collect();
            mean_duration(&durations)
        }
        AggregationPolicy::SuccessesOnly => {
            let durations: Vec<f64> = cell.successes().map(|t| t.duration()).collect();
            mean_duration(&durations)
        }
    }
}

/// Build the mean-time table for every latency cohort
///
/// Columns are the conditions of `difficulty` ordered by ascending ID.
pub fn aggregate(
    index: &ResultsIndex,
    difficulty: &DifficultyIndex,
    policy: AggregationPolicy,
) -> Result<MeanTimeTable> {
    let conditions = difficulty.ordered();
    let mut table = MeanTimeTable::new(policy, conditions.clone());

    for latency in index.latencies() {
        let mut row = Vec::with_capacity(conditions.len());
        for &(experiment, _) in &conditions {
            let mean = match index.cell(latency, experiment) {
                Some(cell) => cell_mean(cell, policy)?,
                None => cell_mean(&ConditionCell::new(latency, experiment), policy)?,
            };
            row.push(mean);
        }
        table.push_row(latency, row)?;
    }

    tracing::debug!(
        "Aggregated {} cells under {} ({} without data)",
        table.cell_count(),
        policy.label(),
        table.no_data_count()
    );

    Ok(table)
}

/// Descriptive statistics of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSummary {
    pub latency_ms: u32,
    pub experiment: usize,
    pub trials: usize,
    pub hits: usize,
    pub hit_rate: f64,
    /// Mean duration over all trials
    pub mean_time: f64,
    /// Population standard deviation of duration
    pub stddev_time: f64,
    /// Mean duration over successful trials
    pub mean_hit_time: Option<f64>,
}

/// Summarize a non-empty cell (None for an empty one)
pub fn summarize_cell(cell: &ConditionCell) -> Result<Option<CellSummary>> {
    if cell.is_empty() {
        return Ok(None);
    }

    let durations: Vec<f64> = cell.trials().iter().map(|t| t.duration()).collect();
    let v = duration_vector(&durations);
    let mean_time = f64::from(v.mean().map_err(statistics_error)?);
    // E[X^2] - mean^2 can dip below zero in f32 for identical durations
    let variance = f64::from(v.variance().map_err(statistics_error)?);
    let stddev_time = variance.max(0.0).sqrt();

    let hit_durations: Vec<f64> = cell.successes().map(|t| t.duration()).collect();
    let hits = hit_durations.len();

    Ok(Some(CellSummary {
        latency_ms: cell.latency_ms(),
        experiment: cell.experiment(),
        trials: cell.len(),
        hits,
        hit_rate: hits as f64 / cell.len() as f64,
        mean_time,
        stddev_time,
        mean_hit_time: mean_duration(&hit_durations)?,
    }))
}

/// Summaries of every non-empty cell, latency then experiment order
pub fn summarize(index: &ResultsIndex) -> Result<Vec<CellSummary>> {
    let mut summaries = Vec::new();
    for cell in index.cells() {
        if let Some(summary) = summarize_cell(cell)? {
            summaries.push(summary);
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::{Sample, TrialGeometry, TrialRecord};
    use crate::vector::Vector3;

    fn trial(experiment: usize, latency_ms: u32, duration: f64, hit: bool) -> TrialRecord {
        let geometry = TrialGeometry::new(
            Vector3::new(0.0, 0.0, 0.0),
            0.2,
            Vector3::new(1.0, 0.0, 0.0),
            0.2,
        )
        .unwrap();
        let end = if hit {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.5, 0.0, 0.0)
        };
        let samples = vec![
            Sample {
                time: 0.0,
                position: Vector3::new(0.0, 0.0, 0.0),
                button_pressed: None,
            },
            Sample {
                time: duration,
                position: end,
                button_pressed: Some(true),
            },
        ];
        TrialRecord::new(experiment, latency_ms, geometry, samples).unwrap()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a defined mean");
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_all_success_means_agree() {
        let cell = ConditionCell::with_trials(
            0,
            0,
            vec![trial(0, 0, 1.0, true), trial(0, 0, 2.0, true), trial(0, 0, 3.0, true)],
        );
        assert_close(cell_mean(&cell, AggregationPolicy::AllTrials).unwrap(), 2.0);
        assert_close(cell_mean(&cell, AggregationPolicy::SuccessesOnly).unwrap(), 2.0);
    }

    #[test]
    fn test_miss_excluded_from_successes_only() {
        let cell = ConditionCell::with_trials(
            0,
            0,
            vec![trial(0, 0, 1.0, true), trial(0, 0, 2.0, true), trial(0, 0, 3.0, false)],
        );
        assert_close(cell_mean(&cell, AggregationPolicy::AllTrials).unwrap(), 2.0);
        assert_close(cell_mean(&cell, AggregationPolicy::SuccessesOnly).unwrap(), 1.5);
    }

    #[test]
    fn test_all_misses_is_no_data() {
        let cell = ConditionCell::with_trials(100, 2, vec![trial(2, 100, 1.0, false)]);
        assert_eq!(cell_mean(&cell, AggregationPolicy::SuccessesOnly).unwrap(), None);
        assert_close(cell_mean(&cell, AggregationPolicy::AllTrials).unwrap(), 1.0);
    }

    #[test]
    fn test_empty_cell_all_trials_is_error() {
        let cell = ConditionCell::new(50, 4);
        let err = cell_mean(&cell, AggregationPolicy::AllTrials).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::EmptyCell {
                latency_ms: 50,
                experiment: 4
            }
        ));
        assert_eq!(cell_mean(&cell, AggregationPolicy::SuccessesOnly).unwrap(), None);
    }

    #[test]
    fn test_rows_follow_ascending_difficulty() {
        let index = ResultsIndex::from_trials(
            vec![
                trial(0, 0, 3.0, true),
                trial(1, 0, 1.0, true),
                trial(2, 0, 2.0, true),
            ],
            3,
        )
        .unwrap();
        let difficulty = DifficultyIndex::from_values([(0, 3.0), (1, 0.5), (2, 1.2)]);

        let table = aggregate(&index, &difficulty, AggregationPolicy::AllTrials).unwrap();
        assert_eq!(table.conditions(), &[(1, 0.5), (2, 1.2), (0, 3.0)]);

        let row = table.row(0).unwrap();
        assert_close(row[0], 1.0);
        assert_close(row[1], 2.0);
        assert_close(row[2], 3.0);
    }

    #[test]
    fn test_aggregate_missing_condition_in_cohort() {
        let index = ResultsIndex::from_trials(
            vec![trial(0, 0, 1.0, true), trial(1, 0, 1.0, true), trial(0, 200, 1.5, true)],
            2,
        )
        .unwrap();
        let difficulty = DifficultyIndex::from_values([(0, 1.0), (1, 2.0)]);

        assert!(matches!(
            aggregate(&index, &difficulty, AggregationPolicy::AllTrials),
            Err(AnalysisError::EmptyCell {
                latency_ms: 200,
                experiment: 1
            })
        ));

        let table = aggregate(&index, &difficulty, AggregationPolicy::SuccessesOnly).unwrap();
        assert_eq!(table.row(200).unwrap()[1], None);
        assert_eq!(table.no_data_count(), 1);
        assert_eq!(table.defined_count(), 3);
    }

    #[test]
    fn test_push_row_rejects_misaligned() {
        let mut table = MeanTimeTable::new(AggregationPolicy::AllTrials, vec![(0, 1.0)]);
        assert!(table.push_row(0, vec![Some(1.0), Some(2.0)]).is_err());
        assert!(table.push_row(0, vec![Some(1.0)]).is_ok());
    }

    #[test]
    fn test_summarize_cell() {
        let cell = ConditionCell::with_trials(
            0,
            1,
            vec![trial(1, 0, 1.0, true), trial(1, 0, 3.0, false)],
        );
        let summary = summarize_cell(&cell).unwrap().unwrap();
        assert_eq!(summary.trials, 2);
        assert_eq!(summary.hits, 1);
        assert_eq!(summary.hit_rate, 0.5);
        assert!((summary.mean_time - 2.0).abs() < 1e-6);
        assert!((summary.stddev_time - 1.0).abs() < 1e-5);
        assert_close(summary.mean_hit_time, 1.0);
        assert!(summarize_cell(&ConditionCell::new(0, 0)).unwrap().is_none());
    }

    #[test]
    fn test_mean_duration_empty() {
        assert_eq!(mean_duration(&[]).unwrap(), None);
    }

    #[test]
    fn test_identical_durations_have_zero_spread() {
        let cell = ConditionCell::with_trials(
            300,
            5,
            vec![
                trial(5, 300, 0.7, true),
                trial(5, 300, 0.7, true),
                trial(5, 300, 0.7, false),
            ],
        );
        let summary = summarize_cell(&cell).unwrap().unwrap();
        assert!(summary.stddev_time.is_finite());
        assert!(summary.stddev_time < 1e-3, "stddev = {}", summary.stddev_time);
        assert!((summary.mean_time - 0.7).abs() < 1e-6);
        assert_close(summary.mean_hit_time, 0.7);
    }

    #[test]
    fn test_nonempty_cell_never_reads_as_no_data() {
        let cell = ConditionCell::with_trials(0, 2, vec![trial(2, 0, 1.25, false)]);
        let mean = cell_mean(&cell, AggregationPolicy::AllTrials).unwrap();
        assert_close(mean, 1.25);
        assert_close(mean_duration(&[1.25]).unwrap(), 1.25);
    }

    #[test]
    fn test_summarize_skips_empty_cells() {
        let index = ResultsIndex::from_trials(
            vec![trial(0, 0, 1.0, true), trial(1, 100, 2.0, false)],
            2,
        )
        .unwrap();
        let summaries = summarize(&index).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!((summaries[0].latency_ms, summaries[0].experiment), (0, 0));
        assert_eq!((summaries[1].latency_ms, summaries[1].experiment), (100, 1));
        assert_eq!(summaries[1].mean_hit_time, None);
    }

    #[test]
    fn test_statistics_error_surfaces() {
        let err = statistics_error(trueno::TruenoError::EmptyVector);
        assert!(matches!(err, AnalysisError::Statistics(_)));
    }
}
