//! Error metrics against ground truth, and run-level statistics.
//!
//! Two mean squared errors are reported per trial:
//! - **position MSE**: mean of $\lVert p_i - \hat{p}_i \rVert^2$ over agents with a resolved estimate,
//!   with estimates expressed in the world frame.
//! - **distance MSE**: mean of $(\lVert p_i - p_j \rVert - \lVert \hat{p}_i - \hat{p}_j \rVert)^2$ over
//!   neighbor pairs whose both ends are resolved. Pairwise distances do not depend on the frame, so
//!   local-frame estimates can be used directly.
//!
//! Agents without an estimate are skipped, not scored as zero. When nothing can be scored the
//! metric is `None`.

use crate::agent::AgentId;
use crate::network::NeighborMap;
use crate::sim::{TrialRecord, TrialStatus};

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Point2;

/// Mean squared position error over agents present in `estimated`.
pub fn position_mse(
    true_positions: &BTreeMap<AgentId, Point2<f64>>,
    estimated: &BTreeMap<AgentId, Point2<f64>>,
) -> Option<f64> {
    let errors: Vec<f64> = estimated
        .iter()
        .filter_map(|(id, estimate)| {
            true_positions
                .get(id)
                .map(|truth| (truth - estimate).norm_squared())
        })
        .collect();
    mean(&errors)
}

/// Mean squared error of reconstructed neighbor distances.
pub fn distance_mse(
    true_positions: &BTreeMap<AgentId, Point2<f64>>,
    estimated: &BTreeMap<AgentId, Point2<f64>>,
    neighbors: &NeighborMap,
) -> Option<f64> {
    let errors: Vec<f64> = neighbors
        .edges()
        .into_iter()
        .filter_map(|(a, b)| {
            let true_distance = nalgebra::distance(true_positions.get(&a)?, true_positions.get(&b)?);
            let estimated_distance = nalgebra::distance(estimated.get(&a)?, estimated.get(&b)?);
            Some((true_distance - estimated_distance).powi(2))
        })
        .collect();
    mean(&errors)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Running summary of a metric over valid trials.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricSummary {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Append-only accumulator of trial outcomes.
///
/// Invalid trials are counted by failure kind but never contribute to the error metrics.
#[derive(Clone, Debug, Default)]
pub struct TrialStatistics {
    pub trials: usize,
    pub valid_trials: usize,
    pub failures: BTreeMap<&'static str, usize>,
    pub resolved_agents: usize,
    pub unresolved_agents: usize,
    pub position_mse: MetricSummary,
    pub distance_mse: MetricSummary,
    pub leaders: BTreeSet<AgentId>,
}

impl TrialStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &TrialRecord) {
        self.trials += 1;
        match &record.status {
            TrialStatus::Ok => {
                self.valid_trials += 1;
                self.resolved_agents += record.estimated_positions.len();
                self.unresolved_agents += record.unresolved.len();
                for error in record.unresolved.values() {
                    *self.failures.entry(error.kind()).or_insert(0) += 1;
                }
                if let Some(mse) = record.position_mse {
                    self.position_mse.push(mse);
                }
                if let Some(mse) = record.distance_mse {
                    self.distance_mse.push(mse);
                }
            }
            TrialStatus::InvalidTrial(error) => {
                *self.failures.entry(error.kind()).or_insert(0) += 1;
            }
        }
        if let Some(leader) = record.leader_id {
            self.leaders.insert(leader);
        }
    }

    pub fn invalid_trials(&self) -> usize {
        self.trials - self.valid_trials
    }
}

impl<'a> FromIterator<&'a TrialRecord> for TrialStatistics {
    fn from_iter<I: IntoIterator<Item = &'a TrialRecord>>(iter: I) -> Self {
        let mut stats = TrialStatistics::new();
        for record in iter {
            stats.push(record);
        }
        stats
    }
}
