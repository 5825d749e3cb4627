//! Analysis configuration
//!
//! Loaded from a TOML file (`--config`) and overridden by command line flags.
//! Every field has a default, so a partial file is valid:
//!
//! ```toml
//! condition_count = 12
//! failure_policy = "skip_and_report"
//! ```

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the corpus ingester does when a trial file fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort on the first failing file
    #[default]
    FailFast,
    /// Collect every failing file, ingest the rest, report at the end
    SkipAndReport,
}

/// Configuration shared by ingestion, difficulty and model fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of experimental conditions; experiment numbers must be below it
    #[serde(default = "default_condition_count")]
    pub condition_count: usize,

    /// Extension of trial files inside session directories (without the dot)
    #[serde(default = "default_trial_extension")]
    pub trial_extension: String,

    pub failure_policy: FailurePolicy,

    /// Latency cohort whose trials supply each condition's geometry
    ///
    /// When unset (or when the cohort lacks the condition) the lowest latency
    /// in which the condition appears is used.
    pub reference_latency_ms: Option<u32>,

    /// Worker threads used to load trial files
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Slopes with a smaller magnitude leave the derived ratio undefined
    #[serde(default = "default_ratio_epsilon")]
    pub ratio_epsilon: f64,
}

fn default_condition_count() -> usize {
    9
}

fn default_trial_extension() -> String {
    "txt".to_string()
}

fn default_jobs() -> usize {
    1
}

fn default_ratio_epsilon() -> f64 {
    1e-6
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            condition_count: default_condition_count(),
            trial_extension: default_trial_extension(),
            failure_policy: FailurePolicy::default(),
            reference_latency_ms: None,
            jobs: default_jobs(),
            ratio_epsilon: default_ratio_epsilon(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.condition_count == 0 {
            return Err(AnalysisError::Config(
                "condition_count must be at least 1".to_string(),
            ));
        }

        if self.jobs == 0 {
            return Err(AnalysisError::Config("jobs must be at least 1".to_string()));
        }

        if self.trial_extension.trim_start_matches('.').is_empty() {
            return Err(AnalysisError::Config(
                "trial_extension must not be empty".to_string(),
            ));
        }

        if !(self.ratio_epsilon.is_finite() && self.ratio_epsilon >= 0.0) {
            return Err(AnalysisError::Config(format!(
                "ratio_epsilon must be a non-negative number, got {}",
                self.ratio_epsilon
            )));
        }

        Ok(())
    }

    /// Extension without a leading dot
    pub fn extension(&self) -> &str {
        self.trial_extension.trim_start_matches('.')
    }
}
