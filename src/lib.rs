//! fittrace - Fitts'-law analysis of latency-injected pointing trials
//!
//! This library loads pointing-task trial recordings (a header describing the
//! source and target regions followed by a time-stamped position trace),
//! groups them by latency cohort and target condition, aggregates movement
//! times under configurable policies and fits a throughput model relating
//! movement time to index of difficulty and injected latency.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod csv_output;
pub mod difficulty;
pub mod error;
pub mod json_output;
pub mod kinematics;
pub mod sink;
pub mod throughput;
pub mod trial;
pub mod vector;

pub use error::{AnalysisError, Result};
