// Configuration for throughput model fitting

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the throughput regression
///
/// # Example
/// ```
/// use fittrace::throughput::FitConfig;
///
/// let config = FitConfig::default();
/// assert_eq!(config.latency_scale, 1000.0); // milliseconds -> seconds
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Magnitude below which the ID slope is treated as zero
    ///
    /// The derived ratio c3 divides by the ID slope; below this threshold it is
    /// reported as undefined instead of an unbounded value.
    pub ratio_epsilon: f64,

    /// Slope threshold relative to the fit's scale
    ///
    /// The fit runs in single precision, which leaves noise of order 1e-6
    /// times the coefficient scale in every coefficient. The ID slope is
    /// treated as zero when it is below this fraction of
    /// `max(|intercept|, |latency coefficient|, 1)`.
    pub relative_slope_tolerance: f64,

    /// Divisor applied to latency in the interaction term
    ///
    /// Default: 1000.0 (latency expressed in seconds)
    pub latency_scale: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            ratio_epsilon: 1e-6,
            relative_slope_tolerance: 1e-4,
            latency_scale: 1000.0,
        }
    }
}

impl From<&AnalysisConfig> for FitConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            ratio_epsilon: config.ratio_epsilon,
            ..Self::default()
        }
    }
}

impl FitConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.ratio_epsilon.is_finite() && self.ratio_epsilon >= 0.0) {
            return Err(AnalysisError::Config(format!(
                "ratio_epsilon must be a non-negative number, got {}",
                self.ratio_epsilon
            )));
        }

        if !(self.relative_slope_tolerance.is_finite() && self.relative_slope_tolerance >= 0.0) {
            return Err(AnalysisError::Config(format!(
                "relative_slope_tolerance must be a non-negative number, got {}",
                self.relative_slope_tolerance
            )));
        }

        if !(self.latency_scale.is_finite() && self.latency_scale > 0.0) {
            return Err(AnalysisError::Config(format!(
                "latency_scale must be positive, got {}",
                self.latency_scale
            )));
        }

        Ok(())
    }
}
