//! Trial file loading
//!
//! A trial file holds one recorded target acquisition:
//!
//! ```text
//! Experiment: 3
//! Latency: 200
//! Source: (0.75, -0.75, -0.50)
//! SourceSize: 0.4000
//! Target: (-0.75, 0.00, -0.75)
//! TargetSize: 0.2000
//!
//! Trace:
//! time; position; button;
//! 12.3456; (0.74, -0.73, -0.49); True;
//! 12.3567; (0.70, -0.70, -0.50); False;
//! ```
//!
//! Header lines are labeled `Key: value` pairs in a fixed order, followed by
//! exactly three lines whose content is ignored. Every remaining non-blank
//! line is a trace sample.

use crate::error::{AnalysisError, Result};
use crate::vector::Vector3;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of ignored lines between the header fields and the trace
pub const SEPARATOR_LINES: usize = 3;

/// One position sample of a trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the first sample (after normalization)
    pub time: f64,
    pub position: Vector3,
    /// Interaction button state, when the capture recorded one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_pressed: Option<bool>,
}

/// Source and target regions of a trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialGeometry {
    pub source: Vector3,
    /// Diameter of the starting region
    pub source_size: f64,
    pub target: Vector3,
    /// Diameter of the target region
    pub target_size: f64,
}

impl TrialGeometry {
    /// Create geometry, rejecting non-positive target sizes
    pub fn new(source: Vector3, source_size: f64, target: Vector3, target_size: f64) -> Result<Self> {
        if !(target_size.is_finite() && target_size > 0.0) {
            return Err(AnalysisError::InvalidGeometry(format!(
                "target size must be positive, got {}",
                target_size
            )));
        }
        if !(source_size.is_finite() && source_size >= 0.0) {
            return Err(AnalysisError::InvalidGeometry(format!(
                "source size must be non-negative, got {}",
                source_size
            )));
        }
        Ok(Self {
            source,
            source_size,
            target,
            target_size,
        })
    }

    /// Center-to-center distance between source and target
    pub fn distance(&self) -> f64 {
        self.source.distance(&self.target)
    }

    /// Whether a position lies inside the target sphere (boundary inclusive)
    pub fn hits_target(&self, position: &Vector3) -> bool {
        position.distance(&self.target) <= self.target_size / 2.0
    }

    pub fn approx_eq(&self, other: &TrialGeometry, tolerance: f64) -> bool {
        self.source.approx_eq(&other.source, tolerance)
            && self.target.approx_eq(&other.target, tolerance)
            && (self.source_size - other.source_size).abs() <= tolerance
            && (self.target_size - other.target_size).abs() <= tolerance
    }
}

/// One completed trial with a time-normalized trace
///
/// Duration and outcome are derived from the samples on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub experiment: usize,
    pub latency_ms: u32,
    pub geometry: TrialGeometry,
    samples: Vec<Sample>,
}

impl TrialRecord {
    /// Build a record from raw capture timestamps
    ///
    /// Timestamps are shifted so the first sample is at t=0. Fails on an empty
    /// trace or on timestamps that go backwards.
    pub fn new(
        experiment: usize,
        latency_ms: u32,
        geometry: TrialGeometry,
        mut samples: Vec<Sample>,
    ) -> Result<Self> {
        let start = samples.first().ok_or(AnalysisError::EmptyTrace)?.time;

        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].time < pair[0].time {
                return Err(AnalysisError::NonMonotonicTime { sample: index + 1 });
            }
        }

        for sample in &mut samples {
            sample.time -= start;
        }

        Ok(Self {
            experiment,
            latency_ms,
            geometry,
            samples,
        })
    }

    /// Parse the textual content of a trial file
    pub fn parse(content: &str) -> Result<Self> {
        TrialParser::new()?.parse(content)
    }

    /// Read and parse a trial file
    pub fn from_file(path: &Path) -> Result<Self> {
        TrialParser::new()?.parse_file(path)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Final sample of the trace (the trace is never empty)
    pub fn last_sample(&self) -> &Sample {
        &self.samples[self.samples.len() - 1]
    }

    /// Seconds from the first to the last sample
    pub fn duration(&self) -> f64 {
        self.last_sample().time
    }

    /// True if the trace ended inside the target region
    pub fn is_success(&self) -> bool {
        self.geometry.hits_target(&self.last_sample().position)
    }

    /// Distance from the final position to the target center
    pub fn final_error(&self) -> f64 {
        self.last_sample().position.distance(&self.geometry.target)
    }
}

/// Reusable trial file parser
///
/// Holds the compiled header pattern so corpus loading compiles it once.
#[derive(Debug, Clone)]
pub struct TrialParser {
    header: Regex,
}

impl TrialParser {
    pub fn new() -> Result<Self> {
        let header = Regex::new(r"^\s*([A-Za-z]+)\s*:\s*(.*?)\s*$")
            .map_err(|e| AnalysisError::Config(format!("invalid header pattern: {}", e)))?;
        Ok(Self { header })
    }

    /// Read and parse a trial file
    pub fn parse_file(&self, path: &Path) -> Result<TrialRecord> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content)
    }

    /// Parse the textual content of a trial file
    pub fn parse(&self, content: &str) -> Result<TrialRecord> {
        let mut lines = content.lines().enumerate().map(|(i, line)| (i + 1, line));

        let experiment = self.header_number::<usize>(lines.next(), 1, "Experiment")?;
        let latency_ms = self.header_number::<u32>(lines.next(), 2, "Latency")?;
        let source = Vector3::parse(self.header_value(lines.next(), 3, "Source")?)?;
        let source_size = self.header_number::<f64>(lines.next(), 4, "SourceSize")?;
        let target = Vector3::parse(self.header_value(lines.next(), 5, "Target")?)?;
        let target_size = self.header_number::<f64>(lines.next(), 6, "TargetSize")?;
        let geometry = TrialGeometry::new(source, source_size, target, target_size)?;

        for expected in 7..7 + SEPARATOR_LINES {
            if lines.next().is_none() {
                return Err(AnalysisError::schema(
                    expected,
                    "missing header separator line before trace data",
                ));
            }
        }

        let mut samples = Vec::new();
        for (line_no, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            samples.push(parse_sample(line, line_no)?);
        }

        TrialRecord::new(experiment, latency_ms, geometry, samples)
    }

    fn header_value<'a>(
        &self,
        line: Option<(usize, &'a str)>,
        expected_line: usize,
        label: &str,
    ) -> Result<&'a str> {
        let (line_no, text) = line.ok_or_else(|| {
            AnalysisError::schema(expected_line, format!("missing '{}' line", label))
        })?;

        let caps = self.header.captures(text).ok_or_else(|| {
            AnalysisError::schema(
                line_no,
                format!("expected '{}: <value>', found '{}'", label, text),
            )
        })?;

        let found = caps.get(1).map_or("", |m| m.as_str());
        if found != label {
            return Err(AnalysisError::schema(
                line_no,
                format!("expected label '{}', found '{}'", label, found),
            ));
        }

        // Group 2 always participates once group 1 matched
        Ok(caps.get(2).map_or("", |m| m.as_str()))
    }

    fn header_number<T: std::str::FromStr>(
        &self,
        line: Option<(usize, &str)>,
        expected_line: usize,
        label: &str,
    ) -> Result<T> {
        let value = self.header_value(line, expected_line, label)?;
        value.parse::<T>().map_err(|_| {
            AnalysisError::schema(
                expected_line,
                format!("'{}' value '{}' is not a valid number", label, value),
            )
        })
    }
}

/// Parse `<time>; <position>; [button;] [ignored...]`
fn parse_sample(line: &str, line_no: usize) -> Result<Sample> {
    let mut fields = line.split(';').map(str::trim);

    let time_field = fields.next().unwrap_or_default();
    let time: f64 = time_field
        .parse()
        .ok()
        .filter(|t: &f64| t.is_finite())
        .ok_or_else(|| {
            AnalysisError::schema(line_no, format!("invalid sample time '{}'", time_field))
        })?;

    let position_field = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AnalysisError::schema(line_no, "sample has no position field"))?;
    let position = Vector3::parse(position_field)?;

    let button_pressed = fields.next().and_then(parse_button);

    Ok(Sample {
        time,
        position,
        button_pressed,
    })
}

fn parse_button(field: &str) -> Option<bool> {
    if field.eq_ignore_ascii_case("true") {
        Some(true)
    } else if field.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
