// Throughput model fitting across latency cohorts
//
// Fits movement time against Fitts' index of difficulty with a latency
// interaction term:
//
//     time = c1 + c2 * ID + b * (latency_ms * ID / 1000)
//
// and reports the latency sensitivity as the ratio c3 = b / c2, so the model
// reads time = c1 + c2 * (ID + c3 * latency_s * ID).
//
// Implementation:
// - Uses aprender (crates.io) LinearRegression for ordinary least squares
// - Cells without data are excluded from the design matrix, never imputed
// - Raw coefficients are kept next to the derived ratio, which is left
//   undefined when c2 is near zero

mod config;
mod model;

pub use config::FitConfig;
pub use model::{fit_throughput, observations, Observation, RegressionResult, PREDICTORS};

#[cfg(test)]
mod tests;
