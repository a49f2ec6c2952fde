//! CSV export and run summaries for trial records.
//!
//! Two tables are written per run:
//! - `trials.csv`: one row per iteration with the leader, references, metrics and status
//! - `positions.csv`: one row per agent per iteration with true and estimated coordinates
//!
//! Unresolved agents keep empty estimate cells and carry the failure reason; they are never given
//! placeholder coordinates.

use std::path::Path;

use anyhow::Result;
use log::info;
use serde::Serialize;
use swarmloc::evaluation::TrialStatistics;
use swarmloc::{TrialRecord, TrialStatus};

#[derive(Debug, Serialize, PartialEq)]
pub struct TrialRow {
    pub iteration: usize,
    pub status: String,
    pub failure: Option<String>,
    pub leader_id: Option<String>,
    pub reference_a: Option<String>,
    pub reference_b: Option<String>,
    pub resolved: usize,
    pub unresolved: usize,
    pub position_mse: Option<f64>,
    pub distance_mse: Option<f64>,
}

impl From<&TrialRecord> for TrialRow {
    fn from(record: &TrialRecord) -> Self {
        let (status, failure) = match &record.status {
            TrialStatus::Ok => ("Ok".to_string(), None),
            TrialStatus::InvalidTrial(e) => ("InvalidTrial".to_string(), Some(e.to_string())),
        };
        TrialRow {
            iteration: record.iteration,
            status,
            failure,
            leader_id: record.leader_id.map(|id| id.to_string()),
            reference_a: record.reference_ids.map(|r| r[0].to_string()),
            reference_b: record.reference_ids.map(|r| r[1].to_string()),
            resolved: record.estimated_positions.len(),
            unresolved: record.unresolved.len(),
            position_mse: record.position_mse,
            distance_mse: record.distance_mse,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PositionRow {
    pub iteration: usize,
    pub agent_id: String,
    pub role: &'static str,
    pub true_x: f64,
    pub true_y: f64,
    pub local_x: Option<f64>,
    pub local_y: Option<f64>,
    pub estimated_x: Option<f64>,
    pub estimated_y: Option<f64>,
    pub failure: Option<String>,
}

/// Flattens a record into one row per agent, in id order.
pub fn position_rows(record: &TrialRecord) -> Vec<PositionRow> {
    record
        .true_positions
        .iter()
        .map(|(id, truth)| {
            let role = if Some(*id) == record.leader_id {
                "leader"
            } else if record.reference_ids.is_some_and(|r| r.contains(id)) {
                "reference"
            } else {
                "member"
            };
            let local = record.local_positions.get(id);
            let estimate = record.estimated_positions.get(id);
            PositionRow {
                iteration: record.iteration,
                agent_id: id.to_string(),
                role,
                true_x: truth.x,
                true_y: truth.y,
                local_x: local.map(|p| p.x),
                local_y: local.map(|p| p.y),
                estimated_x: estimate.map(|p| p.x),
                estimated_y: estimate.map(|p| p.y),
                failure: record.unresolved.get(id).map(|e| e.to_string()),
            }
        })
        .collect()
}

/// Writes `trials.csv` and `positions.csv` into `directory`.
pub fn write_records(records: &[TrialRecord], directory: &Path) -> Result<()> {
    let trials_path = directory.join("trials.csv");
    let mut writer = csv::Writer::from_path(&trials_path)?;
    for record in records {
        writer.serialize(TrialRow::from(record))?;
    }
    writer.flush()?;
    info!("Trial table written to {}", trials_path.display());

    let positions_path = directory.join("positions.csv");
    let mut writer = csv::Writer::from_path(&positions_path)?;
    for record in records {
        for row in position_rows(record) {
            writer.serialize(row)?;
        }
    }
    writer.flush()?;
    info!("Position table written to {}", positions_path.display());
    Ok(())
}

/// Logs the aggregate statistics of a run.
pub fn log_summary(statistics: &TrialStatistics) {
    info!(
        "Trials: {} total, {} valid, {} invalid",
        statistics.trials,
        statistics.valid_trials,
        statistics.invalid_trials()
    );
    for (kind, count) in &statistics.failures {
        info!("  {kind}: {count}");
    }
    info!(
        "Agents: {} resolved, {} unresolved across valid trials",
        statistics.resolved_agents, statistics.unresolved_agents
    );
    match statistics.position_mse.mean() {
        Some(mean) => info!(
            "Position MSE: mean {:.6}, min {:.6}, max {:.6}",
            mean, statistics.position_mse.min, statistics.position_mse.max
        ),
        None => info!("Position MSE: no valid trials"),
    }
    match statistics.distance_mse.mean() {
        Some(mean) => info!(
            "Distance MSE: mean {:.6}, min {:.6}, max {:.6}",
            mean, statistics.distance_mse.min, statistics.distance_mse.max
        ),
        None => info!("Distance MSE: no valid trials"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use swarmloc::{AgentId, LocalizationError};

    fn sample_record() -> TrialRecord {
        let mut record = TrialRecord::empty(3);
        for (i, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (2.0, 0.0)].into_iter().enumerate() {
            record.true_positions.insert(AgentId(i), Point2::new(x, y));
        }
        for i in 0..3 {
            let p = record.true_positions[&AgentId(i)];
            record.local_positions.insert(AgentId(i), p);
            record.estimated_positions.insert(AgentId(i), p);
        }
        record.unresolved.insert(
            AgentId(3),
            LocalizationError::SingularSystem { determinant: 0.0 },
        );
        record.leader_id = Some(AgentId(0));
        record.reference_ids = Some([AgentId(1), AgentId(2)]);
        record.position_mse = Some(0.0);
        record.distance_mse = Some(0.0);
        record
    }

    #[test]
    fn test_position_rows_mark_roles_and_unresolved() {
        let rows = position_rows(&sample_record());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].role, "leader");
        assert_eq!(rows[1].role, "reference");
        assert_eq!(rows[2].role, "reference");
        assert_eq!(rows[3].role, "member");
        assert_eq!(rows[3].estimated_x, None);
        assert!(rows[3].failure.as_ref().unwrap().contains("singular"));
    }

    #[test]
    fn test_trial_row_for_invalid_trial() {
        let record = TrialRecord {
            status: TrialStatus::InvalidTrial(LocalizationError::InsufficientNeighbors {
                leader: AgentId(4),
                count: 1,
            }),
            leader_id: Some(AgentId(4)),
            ..TrialRecord::empty(0)
        };
        let row = TrialRow::from(&record);
        assert_eq!(row.status, "InvalidTrial");
        assert_eq!(row.leader_id.as_deref(), Some("rb4"));
        assert_eq!(row.reference_a, None);
        assert_eq!(row.position_mse, None);
    }

    #[test]
    fn test_write_records_creates_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_records(&[sample_record()], dir.path()).unwrap();
        let trials = std::fs::read_to_string(dir.path().join("trials.csv")).unwrap();
        let positions = std::fs::read_to_string(dir.path().join("positions.csv")).unwrap();
        assert_eq!(trials.lines().count(), 2);
        assert_eq!(positions.lines().count(), 5);
        assert!(trials.starts_with("iteration,status,failure,leader_id"));
    }
}
