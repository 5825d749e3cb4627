// Scenario tests for throughput model fitting
//
// Tables are synthesized from known coefficients so recovered values can be
// checked directly.

use super::*;
use crate::aggregate::{AggregationPolicy, MeanTimeTable};
use crate::error::AnalysisError;

const IDS: [f64; 3] = [1.0, 2.0, 3.0];
const LATENCIES: [u32; 4] = [0, 100, 200, 400];

/// Noise-free data is recovered to single-precision accuracy
const TOLERANCE: f64 = 1e-4;

/// Noise-free table for time = c1 + a * ID + b * latency * ID / 1000
fn synthetic_table(policy: AggregationPolicy, c1: f64, a: f64, b: f64) -> MeanTimeTable {
    let conditions: Vec<(usize, f64)> = IDS.iter().copied().enumerate().collect();
    let mut table = MeanTimeTable::new(policy, conditions);
    for latency in LATENCIES {
        let row = IDS
            .iter()
            .map(|&id| Some(c1 + a * id + b * f64::from(latency) * id / 1000.0))
            .collect();
        table.push_row(latency, row).unwrap();
    }
    table
}

/// Exact recovery on noise-free data
///
/// Scenario: time = 2 + 0.3 * ID + 0.1 * latency * ID / 1000
/// Expected: c1 = 2, c2 = 0.3, c3 = 0.1 / 0.3, R^2 = 1
#[test]
fn test_recovers_known_coefficients() {
    let table = synthetic_table(AggregationPolicy::AllTrials, 2.0, 0.3, 0.1);
    let result = fit_throughput(&table, &FitConfig::default()).unwrap();

    assert!((result.intercept_c1 - 2.0).abs() < TOLERANCE, "c1 = {}", result.intercept_c1);
    assert!((result.slope_c2 - 0.3).abs() < TOLERANCE, "c2 = {}", result.slope_c2);
    assert!((result.coef_latency_id - 0.1).abs() < TOLERANCE);

    let c3 = result.ratio_c3.expect("c3 should be defined");
    assert!((c3 - 0.1 / 0.3).abs() < TOLERANCE, "c3 = {}", c3);

    assert!(result.r_squared > 0.999, "R^2 = {}", result.r_squared);
    assert_eq!(result.observations, IDS.len() * LATENCIES.len());
    assert_eq!(result.policy, AggregationPolicy::AllTrials);
}

/// No-data cells drop out of the design matrix
///
/// Scenario: two cells have no successful trial
/// Expected: observation count drops by exactly two, fit still exact
#[test]
fn test_no_data_cells_are_excluded() {
    let mut table = MeanTimeTable::new(
        AggregationPolicy::SuccessesOnly,
        IDS.iter().copied().enumerate().collect(),
    );
    for latency in LATENCIES {
        let row = IDS
            .iter()
            .map(|&id| {
                if latency == 400 && id > 1.5 {
                    None
                } else {
                    Some(2.0 + 0.3 * id + 0.1 * f64::from(latency) * id / 1000.0)
                }
            })
            .collect();
        table.push_row(latency, row).unwrap();
    }

    assert_eq!(table.no_data_count(), 2);
    assert_eq!(observations(&table).len(), table.cell_count() - 2);

    let result = fit_throughput(&table, &FitConfig::default()).unwrap();
    assert_eq!(result.observations, IDS.len() * LATENCIES.len() - 2);
    assert!((result.intercept_c1 - 2.0).abs() < TOLERANCE);
}

#[test]
fn test_observations_follow_table_order() {
    let table = synthetic_table(AggregationPolicy::AllTrials, 1.0, 0.5, 0.0);
    let rows = observations(&table);

    assert_eq!(rows[0].latency_ms, 0);
    assert_eq!(rows[0].experiment, 0);
    assert_eq!(rows[0].id, 1.0);
    assert_eq!(rows[0].mean_time, 1.5);
    assert_eq!(rows.last().unwrap().latency_ms, 400);
}

/// Fewer rows than predictors + 1
#[test]
fn test_insufficient_data() {
    let mut table = MeanTimeTable::new(AggregationPolicy::SuccessesOnly, vec![(0, 1.0), (1, 2.0)]);
    table.push_row(0, vec![Some(1.0), None]).unwrap();
    table.push_row(100, vec![None, Some(2.0)]).unwrap();

    match fit_throughput(&table, &FitConfig::default()) {
        Err(AnalysisError::InsufficientData {
            observations,
            required,
        }) => {
            assert_eq!(observations, 2);
            assert_eq!(required, PREDICTORS + 1);
        }
        other => panic!("Expected InsufficientData, got {:?}", other),
    }
}

#[test]
fn test_empty_table_is_insufficient() {
    let table = MeanTimeTable::new(AggregationPolicy::AllTrials, Vec::new());
    assert!(matches!(
        fit_throughput(&table, &FitConfig::default()),
        Err(AnalysisError::InsufficientData { observations: 0, .. })
    ));
}

/// A single latency cohort makes the interaction collinear with ID
#[test]
fn test_single_latency_is_degenerate() {
    let mut table = MeanTimeTable::new(
        AggregationPolicy::AllTrials,
        vec![(0, 1.0), (1, 2.0), (2, 3.0)],
    );
    table.push_row(200, vec![Some(1.0), Some(1.5), Some(2.0)]).unwrap();

    assert!(matches!(
        fit_throughput(&table, &FitConfig::default()),
        Err(AnalysisError::DegenerateDesign(_))
    ));
}

#[test]
fn test_single_condition_is_degenerate() {
    let mut table = MeanTimeTable::new(AggregationPolicy::AllTrials, vec![(4, 2.0)]);
    for latency in LATENCIES {
        table.push_row(latency, vec![Some(1.0)]).unwrap();
    }

    assert!(matches!(
        fit_throughput(&table, &FitConfig::default()),
        Err(AnalysisError::DegenerateDesign(_))
    ));
}

/// Flat ID slope leaves the derived ratio undefined
///
/// Scenario: time depends only on the latency interaction
/// Expected: c3 is None rather than an unbounded value
#[test]
fn test_zero_slope_leaves_ratio_undefined() {
    let table = synthetic_table(AggregationPolicy::AllTrials, 1.0, 0.0, 0.5);

    let result = fit_throughput(&table, &FitConfig::default()).unwrap();
    assert!(result.slope_c2.abs() < TOLERANCE);
    assert_eq!(result.ratio_c3, None);
    assert!((result.coef_latency_id - 0.5).abs() < TOLERANCE);
}

/// Single-precision noise in a zero slope stays below the default guard
///
/// Scenario: 9 conditions x 7 latencies, time = c1 + 0.4 * latency * ID / 1000,
/// for several intercepts
/// Expected: c3 is None for every intercept under the default configuration
#[test]
fn test_zero_slope_full_design_default_config() {
    let ids: Vec<f64> = (0..9).map(|i| 1.585 + 0.35 * f64::from(i)).collect();
    let latencies: [u32; 7] = [0, 50, 100, 150, 200, 300, 500];

    for c1 in [0.35, 0.8, 1.7] {
        let mut table = MeanTimeTable::new(
            AggregationPolicy::SuccessesOnly,
            ids.iter().copied().enumerate().collect(),
        );
        for latency in latencies {
            let row = ids
                .iter()
                .map(|&id| Some(c1 + 0.4 * f64::from(latency) * id / 1000.0))
                .collect();
            table.push_row(latency, row).unwrap();
        }

        let result = fit_throughput(&table, &FitConfig::default()).unwrap();
        assert_eq!(
            result.ratio_c3, None,
            "c1 = {}: coef_id = {:e}",
            c1, result.coef_id
        );
        assert!((result.coef_latency_id - 0.4).abs() < 1e-3);
        assert_eq!(result.observations, 63);
    }
}

/// A small but real slope keeps its ratio
#[test]
fn test_small_slope_keeps_ratio() {
    let table = synthetic_table(AggregationPolicy::AllTrials, 0.5, 0.01, 0.02);
    let result = fit_throughput(&table, &FitConfig::default()).unwrap();

    let c3 = result.ratio_c3.expect("c3 should be defined");
    assert!((c3 - 2.0).abs() < 5e-2, "c3 = {}", c3);
}

#[test]
fn test_predict_matches_generator() {
    let table = synthetic_table(AggregationPolicy::AllTrials, 2.0, 0.3, 0.1);
    let result = fit_throughput(&table, &FitConfig::default()).unwrap();

    let expected = 2.0 + 0.3 * 2.0 + 0.1 * 300.0 * 2.0 / 1000.0;
    assert!((result.predict(2.0, 300, 1000.0) - expected).abs() < TOLERANCE);
}

#[test]
fn test_report_string() {
    let table = synthetic_table(AggregationPolicy::SuccessesOnly, 2.0, 0.3, 0.1);
    let result = fit_throughput(&table, &FitConfig::default()).unwrap();

    let report = result.to_report_string();
    assert!(report.contains("successes_only"));
    assert!(report.contains("c1 (intercept)"));
    assert!(report.contains("R^2"));
}

#[test]
fn test_report_string_undefined_ratio() {
    let result = RegressionResult {
        policy: AggregationPolicy::AllTrials,
        intercept_c1: 1.0,
        slope_c2: 0.0,
        ratio_c3: None,
        coef_id: 0.0,
        coef_latency_id: 0.2,
        r_squared: 0.5,
        observations: 6,
    };
    assert!(result.to_report_string().contains("undefined"));
}
