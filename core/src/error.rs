//! Error taxonomy for the localization pipeline.
//!
//! Geometric failures are local to a single trial (frame construction) or to a single agent
//! (multilateration, ranging limit). Configuration failures are raised by
//! [`SimulationConfig::validate`](crate::sim::SimulationConfig::validate) before any trial runs.

use crate::agent::AgentId;
use thiserror::Error;

/// Errors raised by the localization pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocalizationError {
    /// The swarm has no agents to elect from.
    #[error("cannot elect a leader from an empty swarm")]
    EmptySwarm,
    /// The leader has fewer than the two neighbors needed to anchor a frame.
    #[error("leader {leader} has {count} neighbor(s), at least 2 are required")]
    InsufficientNeighbors { leader: AgentId, count: usize },
    /// The leader/reference ranges cannot form a triangle.
    #[error("leader and reference ranges do not form a triangle (radicand {radicand:.3e})")]
    DegenerateTriangle { radicand: f64 },
    /// The anchors are colinear, so the linearized range equations have no unique solution.
    #[error("multilateration system is singular (determinant {determinant:.3e})")]
    SingularSystem { determinant: f64 },
    /// The agent is beyond the ranging limit of at least one anchor.
    #[error("agent {agent} is out of ranging range of anchor {anchor}")]
    OutOfRange { agent: AgentId, anchor: AgentId },
    /// An agent id was referenced that does not exist in the environment.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),
    /// The local frame could not be mapped onto the world frame.
    #[error("frame alignment failed: {0}")]
    AlignmentFailed(String),
    /// A configuration value is outside its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LocalizationError {
    /// Short machine-friendly label, used when tallying failures across trials.
    pub fn kind(&self) -> &'static str {
        match self {
            LocalizationError::EmptySwarm => "EmptySwarm",
            LocalizationError::InsufficientNeighbors { .. } => "InsufficientNeighbors",
            LocalizationError::DegenerateTriangle { .. } => "DegenerateTriangle",
            LocalizationError::SingularSystem { .. } => "SingularSystem",
            LocalizationError::OutOfRange { .. } => "OutOfRange",
            LocalizationError::UnknownAgent(_) => "UnknownAgent",
            LocalizationError::AlignmentFailed(_) => "AlignmentFailed",
            LocalizationError::InvalidConfig(_) => "InvalidConfig",
        }
    }
}
