// Ordinary least squares fit of the throughput model using aprender

use crate::aggregate::{AggregationPolicy, MeanTimeTable};
use crate::error::{AnalysisError, Result};
use crate::throughput::config::FitConfig;
use aprender::linear_model::LinearRegression;
use aprender::primitives::{Matrix, Vector};
use aprender::traits::Estimator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Predictors per observation: ID and the latency interaction
pub const PREDICTORS: usize = 2;

/// One (latency, condition) cell entering the fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub latency_ms: u32,
    pub experiment: usize,
    pub id: f64,
    pub mean_time: f64,
}

/// Fitted throughput model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub policy: AggregationPolicy,

    /// Intercept (seconds)
    pub intercept_c1: f64,

    /// Slope on ID (seconds per bit); equal to `coef_id`
    pub slope_c2: f64,

    /// Latency sensitivity `coef_latency_id / slope_c2`
    ///
    /// `None` when |slope_c2| is below the configured epsilon or within the
    /// single-precision noise of the fit.
    pub ratio_c3: Option<f64>,

    /// Raw regression coefficient on ID
    pub coef_id: f64,

    /// Raw regression coefficient on latency * ID / latency_scale
    pub coef_latency_id: f64,

    /// Coefficient of determination of the fit
    pub r_squared: f64,

    /// Rows in the design matrix
    pub observations: usize,
}

impl RegressionResult {
    /// Predicted movement time for a condition and latency
    pub fn predict(&self, id: f64, latency_ms: u32, latency_scale: f64) -> f64 {
        self.intercept_c1
            + self.coef_id * id
            + self.coef_latency_id * f64::from(latency_ms) * id / latency_scale
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!(
            "Throughput model ({}, {} observations)\n",
            self.policy.label(),
            self.observations
        ));
        report.push_str("  time = c1 + c2 * (ID + c3 * latency_s * ID)\n");
        report.push_str(&format!("  c1 (intercept):        {:.6}\n", self.intercept_c1));
        report.push_str(&format!("  c2 (ID slope):         {:.6}\n", self.slope_c2));
        match self.ratio_c3 {
            Some(c3) => report.push_str(&format!("  c3 (latency ratio):    {:.6}\n", c3)),
            None => report.push_str("  c3 (latency ratio):    undefined (c2 ~ 0)\n"),
        }
        report.push_str(&format!(
            "  raw coefficients:      ID={:.6}, latency*ID={:.6}\n",
            self.coef_id, self.coef_latency_id
        ));
        report.push_str(&format!("  R^2:                   {:.6}\n", self.r_squared));

        report
    }
}

/// Cells of a table with a defined mean, in table order
pub fn observations(table: &MeanTimeTable) -> Vec<Observation> {
    let mut rows = Vec::new();
    for (latency_ms, means) in table.rows() {
        for (&(experiment, id), mean) in table.conditions().iter().zip(means) {
            if let Some(mean_time) = *mean {
                rows.push(Observation {
                    latency_ms,
                    experiment,
                    id,
                    mean_time,
                });
            }
        }
    }
    rows
}

/// Fit `time ~ c1 + coef_id * ID + coef_latency_id * latency * ID / scale`
///
/// # Example
/// ```
/// use fittrace::aggregate::{AggregationPolicy, MeanTimeTable};
/// use fittrace::throughput::{fit_throughput, FitConfig};
///
/// let mut table = MeanTimeTable::new(
///     AggregationPolicy::AllTrials,
///     vec![(0, 1.0), (1, 2.0), (2, 3.0)],
/// );
/// for latency in [0u32, 200, 400] {
///     let row = [1.0, 2.0, 3.0]
///         .iter()
///         .map(|id| Some(0.5 + 0.25 * id + 0.5 * f64::from(latency) * id / 1000.0))
///         .collect();
///     table.push_row(latency, row).unwrap();
/// }
///
/// let result = fit_throughput(&table, &FitConfig::default()).unwrap();
/// assert!((result.intercept_c1 - 0.5).abs() < 1e-2);
/// assert!(result.r_squared > 0.99);
/// ```
pub fn fit_throughput(table: &MeanTimeTable, config: &FitConfig) -> Result<RegressionResult> {
    config.validate()?;

    let rows = observations(table);
    let required = PREDICTORS + 1;
    if rows.len() < required {
        return Err(AnalysisError::InsufficientData {
            observations: rows.len(),
            required,
        });
    }
    check_design(&rows)?;

    let mut features = Vec::with_capacity(rows.len() * PREDICTORS);
    for row in &rows {
        features.push(row.id as f32);
        features.push((f64::from(row.latency_ms) * row.id / config.latency_scale) as f32);
    }
    let targets: Vec<f32> = rows.iter().map(|row| row.mean_time as f32).collect();

    let x = Matrix::from_vec(rows.len(), PREDICTORS, features)
        .map_err(|e| AnalysisError::Fit(format!("failed to build design matrix: {}", e)))?;
    let y = Vector::from_slice(&targets);

    let mut model = LinearRegression::new();
    model
        .fit(&x, &y)
        .map_err(|e| AnalysisError::Fit(format!("{}", e)))?;

    let coefficients = model.coefficients().as_slice();
    let (Some(&coef_id), Some(&coef_latency_id)) = (coefficients.first(), coefficients.get(1))
    else {
        return Err(AnalysisError::Fit(format!(
            "expected {} coefficients, got {}",
            PREDICTORS,
            coefficients.len()
        )));
    };
    let coef_id = f64::from(coef_id);
    let coef_latency_id = f64::from(coef_latency_id);
    let intercept_c1 = f64::from(model.intercept());

    let threshold = slope_threshold(config, intercept_c1, coef_latency_id);
    let ratio_c3 = if coef_id.abs() < threshold {
        tracing::warn!(
            "ID slope {:.3e} is below {:.1e}; latency ratio c3 is undefined",
            coef_id,
            threshold
        );
        None
    } else {
        Some(coef_latency_id / coef_id)
    };

    let result = RegressionResult {
        policy: table.policy(),
        intercept_c1,
        slope_c2: coef_id,
        ratio_c3,
        coef_id,
        coef_latency_id,
        r_squared: f64::from(model.score(&x, &y)),
        observations: rows.len(),
    };

    tracing::info!(
        "Fitted {} model on {} cells (R^2 = {:.4})",
        result.policy.label(),
        result.observations,
        result.r_squared
    );

    Ok(result)
}

/// Magnitude below which the ID slope is indistinguishable from zero
fn slope_threshold(config: &FitConfig, intercept: f64, coef_latency_id: f64) -> f64 {
    let scale = intercept.abs().max(coef_latency_id.abs()).max(1.0);
    config.ratio_epsilon.max(config.relative_slope_tolerance * scale)
}

/// Reject designs whose predictors cannot be separated
fn check_design(rows: &[Observation]) -> Result<()> {
    let latencies: BTreeSet<u32> = rows.iter().map(|row| row.latency_ms).collect();
    if latencies.len() < 2 {
        return Err(AnalysisError::DegenerateDesign(format!(
            "need at least 2 latency cohorts, found {}",
            latencies.len()
        )));
    }

    let first_id = rows[0].id;
    if rows.iter().all(|row| (row.id - first_id).abs() < 1e-12) {
        return Err(AnalysisError::DegenerateDesign(
            "all observations share one index of difficulty".to_string(),
        ));
    }

    Ok(())
}
