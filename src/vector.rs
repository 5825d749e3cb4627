//! Three-component vectors as printed by the capture software
//!
//! Positions are written in the form `(x, y, z)`, e.g. `(0.75, -0.60, -0.50)`.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Immutable (x, y, z) tuple
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Parse a parenthesised, comma separated triple
    ///
    /// Whitespace around the value and around each delimiter is ignored.
    ///
    /// # Example
    /// ```
    /// use fittrace::vector::Vector3;
    ///
    /// let v = Vector3::parse(" ( 1.0,2.5 , -3 ) ").unwrap();
    /// assert_eq!(v, Vector3::new(1.0, 2.5, -3.0));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let inner = input
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| AnalysisError::malformed_vector(input, "expected '(x, y, z)'"))?;

        let mut components = [0.0f64; 3];
        let mut count = 0;
        for part in inner.split(',') {
            if count == 3 {
                return Err(AnalysisError::malformed_vector(
                    input,
                    "more than 3 components",
                ));
            }
            let part = part.trim();
            let value: f64 = part.parse().map_err(|_| {
                AnalysisError::malformed_vector(input, format!("'{}' is not a number", part))
            })?;
            if !value.is_finite() {
                return Err(AnalysisError::malformed_vector(
                    input,
                    format!("'{}' is not finite", part),
                ));
            }
            components[count] = value;
            count += 1;
        }

        if count != 3 {
            return Err(AnalysisError::malformed_vector(
                input,
                format!("expected 3 components, found {}", count),
            ));
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Vector3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Component-wise comparison within an absolute tolerance
    pub fn approx_eq(&self, other: &Vector3, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl FromStr for Vector3 {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
