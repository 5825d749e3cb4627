//! Trajectory kinematics
//!
//! Path metrics of a single trial's trace: how far the pointer actually
//! travelled, how direct the movement was, and how fast it got.

use crate::trial::{Sample, TrialRecord};
use serde::{Deserialize, Serialize};

/// Segments shorter than this (seconds) contribute zero speed
const MIN_SEGMENT_SECONDS: f64 = 1e-9;

/// Path metrics of one trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryMetrics {
    /// Sum of distances between consecutive samples
    pub path_length: f64,
    /// Straight-line distance from first to last sample
    pub displacement: f64,
    /// displacement / path_length (1.0 for a stationary trace)
    pub path_efficiency: f64,
    /// Highest segment speed (units per second)
    pub peak_speed: f64,
    /// path_length / duration (0.0 for a zero-length trace)
    pub mean_speed: f64,
}

impl TrajectoryMetrics {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Self::stationary();
        };

        let mut path_length = 0.0;
        let mut peak_speed: f64 = 0.0;
        for pair in samples.windows(2) {
            let distance = pair[0].position.distance(&pair[1].position);
            path_length += distance;

            let dt = pair[1].time - pair[0].time;
            if dt > MIN_SEGMENT_SECONDS {
                peak_speed = peak_speed.max(distance / dt);
            }
        }

        let displacement = first.position.distance(&last.position);
        let path_efficiency = if path_length > 0.0 {
            displacement / path_length
        } else {
            1.0
        };

        let duration = last.time - first.time;
        let mean_speed = if duration > MIN_SEGMENT_SECONDS {
            path_length / duration
        } else {
            0.0
        };

        Self {
            path_length,
            displacement,
            path_efficiency,
            peak_speed,
            mean_speed,
        }
    }

    pub fn from_trial(trial: &TrialRecord) -> Self {
        Self::from_samples(trial.samples())
    }

    fn stationary() -> Self {
        Self {
            path_length: 0.0,
            displacement: 0.0,
            path_efficiency: 1.0,
            peak_speed: 0.0,
            mean_speed: 0.0,
        }
    }
}
