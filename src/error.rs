//! Error taxonomy for the trial analysis pipeline
//!
//! Parsing errors are local to one trial file. Aggregation and regression
//! errors halt the analysis step that raised them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, aggregating or modeling trials
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Malformed vector '{input}': {reason}")]
    MalformedVector { input: String, reason: String },

    #[error("Schema error at line {line}: {message}")]
    Schema { line: usize, message: String },

    #[error("Trial has no trace samples")]
    EmptyTrace,

    #[error("Trace time goes backwards at sample {sample}")]
    NonMonotonicTime { sample: usize },

    #[error("Invalid trial geometry: {0}")]
    InvalidGeometry(String),

    #[error("Experiment {experiment} is outside the configured condition count ({condition_count})")]
    ConditionOutOfRange {
        experiment: usize,
        condition_count: usize,
    },

    #[error("Failed to ingest {}: {source}", .path.display())]
    Ingestion {
        path: PathBuf,
        #[source]
        source: Box<AnalysisError>,
    },

    #[error("No trials in cell (latency {latency_ms} ms, experiment {experiment})")]
    EmptyCell { latency_ms: u32, experiment: usize },

    #[error("Row for latency {latency_ms} ms has {found} entries, expected {expected}")]
    MisalignedRow {
        latency_ms: u32,
        found: usize,
        expected: usize,
    },

    #[error("Insufficient data for regression: {observations} observations, need at least {required}")]
    InsufficientData {
        observations: usize,
        required: usize,
    },

    #[error("Degenerate design matrix: {0}")]
    DegenerateDesign(String),

    #[error("Regression fit failed: {0}")]
    Fit(String),

    #[error("Duration statistics failed: {0}")]
    Statistics(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Loader worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Build a `MalformedVector` error
    pub fn malformed_vector(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedVector {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a `Schema` error for a 1-based line number
    pub fn schema(line: usize, message: impl Into<String>) -> Self {
        Self::Schema {
            line,
            message: message.into(),
        }
    }

    /// Wrap a per-file failure with the offending path
    pub fn ingestion(path: impl Into<PathBuf>, source: AnalysisError) -> Self {
        Self::Ingestion {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_ingestion_error_names_file_and_cause() {
        let err = AnalysisError::ingestion("session_a/trial_3.txt", AnalysisError::EmptyTrace);
        let msg = err.to_string();
        assert!(msg.contains("session_a/trial_3.txt"));
        assert!(msg.contains("no trace samples"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_schema_error_reports_line() {
        let err = AnalysisError::schema(4, "expected label 'SourceSize'");
        assert_eq!(
            err.to_string(),
            "Schema error at line 4: expected label 'SourceSize'"
        );
    }
}
