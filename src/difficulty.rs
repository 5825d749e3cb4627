//! Fitts' index of difficulty per condition
//!
//! ID = log2(distance / width + 1), with distance the source-target center
//! distance and width the target diameter.
//!
//! Geometry is assumed constant within a condition across every latency
//! cohort. The assumption is checked, not enforced: trials whose geometry
//! differs from the representative trial are logged and listed in
//! [`DifficultyIndex::divergent`].

use crate::corpus::ResultsIndex;
use crate::trial::{TrialGeometry, TrialRecord};
use std::collections::BTreeMap;

/// Absolute tolerance when comparing geometry within a condition
pub const GEOMETRY_TOLERANCE: f64 = 1e-6;

/// Shannon formulation of the index of difficulty
pub fn index_of_difficulty(distance: f64, width: f64) -> f64 {
    (distance / width + 1.0).log2()
}

/// Index of difficulty of one trial's geometry
pub fn geometry_difficulty(geometry: &TrialGeometry) -> f64 {
    index_of_difficulty(geometry.distance(), geometry.target_size)
}

/// Index of difficulty for every observed condition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DifficultyIndex {
    values: BTreeMap<usize, f64>,
    divergent: Vec<usize>,
}

impl DifficultyIndex {
    /// Build from explicit (experiment, ID) pairs
    pub fn from_values(values: impl IntoIterator<Item = (usize, f64)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            divergent: Vec::new(),
        }
    }

    /// Compute each observed condition's ID from a representative trial
    ///
    /// The representative is the first trial of the condition in the
    /// `reference_latency_ms` cohort when that cohort has one, otherwise the
    /// first trial in the lowest latency cohort containing the condition.
    pub fn from_results(index: &ResultsIndex, reference_latency_ms: Option<u32>) -> Self {
        let mut values = BTreeMap::new();
        let mut divergent = Vec::new();

        for experiment in index.observed_conditions() {
            let Some(representative) = representative_trial(index, experiment, reference_latency_ms)
            else {
                continue;
            };
            let geometry = representative.geometry;

            let mismatches = index
                .latencies()
                .filter_map(|latency| index.cell(latency, experiment))
                .flat_map(|cell| cell.trials().iter())
                .filter(|trial| !trial.geometry.approx_eq(&geometry, GEOMETRY_TOLERANCE))
                .count();

            if mismatches > 0 {
                tracing::warn!(
                    "Condition {} has {} trial(s) whose geometry differs from the representative \
                     trial at {} ms; its index of difficulty may be unrepresentative",
                    experiment,
                    mismatches,
                    representative.latency_ms
                );
                divergent.push(experiment);
            }

            values.insert(experiment, geometry_difficulty(&geometry));
        }

        Self { values, divergent }
    }

    pub fn get(&self, experiment: usize) -> Option<f64> {
        self.values.get(&experiment).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// (experiment, ID) pairs sorted by ascending ID, ties by experiment
    pub fn ordered(&self) -> Vec<(usize, f64)> {
        let mut ordered: Vec<(usize, f64)> = self.values.iter().map(|(&e, &id)| (e, id)).collect();
        ordered.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ordered
    }

    /// Conditions whose trials do not share one geometry
    pub fn divergent(&self) -> &[usize] {
        &self.divergent
    }
}

fn representative_trial(
    index: &ResultsIndex,
    experiment: usize,
    reference_latency_ms: Option<u32>,
) -> Option<&TrialRecord> {
    let from_reference = reference_latency_ms
        .and_then(|latency| index.cell(latency, experiment))
        .and_then(|cell| cell.trials().first());

    from_reference.or_else(|| {
        index
            .latencies()
            .filter_map(|latency| index.cell(latency, experiment))
            .find_map(|cell| cell.trials().first())
    })
}
