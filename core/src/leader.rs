//! Leader election and reference selection.
//!
//! The leader is the best-connected agent: the one with the most neighbors, with the lowest id
//! winning ties so that repeated runs over the same positions elect the same agent. Its two
//! nearest neighbors become the reference agents that fix the orientation of the local frame.

use crate::agent::{Agent, AgentId};
use crate::error::LocalizationError;
use crate::network::NeighborMap;

use std::cmp::Ordering;

use log::debug;

/// Outcome of election and reference selection for one trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaderState {
    pub leader_id: AgentId,
    /// Reference agents in ascending order of distance to the leader.
    pub reference_ids: [AgentId; 2],
}

/// Elects the agent with the largest neighbor set, lowest id on ties.
///
/// # Errors
/// [`LocalizationError::EmptySwarm`] if `agents` is empty.
pub fn elect_leader(agents: &[Agent], neighbors: &NeighborMap) -> Result<AgentId, LocalizationError> {
    let leader = agents
        .iter()
        .map(|agent| (neighbors.degree(agent.id), agent.id))
        .max_by(|(deg_a, id_a), (deg_b, id_b)| deg_a.cmp(deg_b).then_with(|| id_b.cmp(id_a)))
        .map(|(_, id)| id)
        .ok_or(LocalizationError::EmptySwarm)?;
    debug!(
        "Elected leader {} with {} neighbors",
        leader,
        neighbors.degree(leader)
    );
    Ok(leader)
}

/// Picks the two neighbors of `leader` closest to it, by true distance, ties broken by id.
///
/// # Errors
/// - [`LocalizationError::UnknownAgent`] if the leader or one of its neighbors is not in `agents`.
/// - [`LocalizationError::InsufficientNeighbors`] if the leader has fewer than two neighbors.
pub fn select_references(
    leader: AgentId,
    agents: &[Agent],
    neighbors: &NeighborMap,
) -> Result<[AgentId; 2], LocalizationError> {
    let find = |id: AgentId| {
        agents
            .iter()
            .find(|a| a.id == id)
            .ok_or(LocalizationError::UnknownAgent(id))
    };
    let leader_agent = find(leader)?;
    let candidates = neighbors
        .get(leader)
        .ok_or(LocalizationError::UnknownAgent(leader))?;
    if candidates.len() < 2 {
        return Err(LocalizationError::InsufficientNeighbors {
            leader,
            count: candidates.len(),
        });
    }

    let mut ranked = candidates
        .iter()
        .map(|&id| Ok((leader_agent.distance_to(find(id)?), id)))
        .collect::<Result<Vec<_>, LocalizationError>>()?;
    ranked.sort_by(|(d_a, id_a), (d_b, id_b)| {
        d_a.partial_cmp(d_b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });
    debug!(
        "Leader {} references {} ({:.3}) and {} ({:.3})",
        leader, ranked[0].1, ranked[0].0, ranked[1].1, ranked[1].0
    );
    Ok([ranked[0].1, ranked[1].1])
}

/// Runs election followed by reference selection.
pub fn elect(agents: &[Agent], neighbors: &NeighborMap) -> Result<LeaderState, LocalizationError> {
    let leader_id = elect_leader(agents, neighbors)?;
    let reference_ids = select_references(leader_id, agents, neighbors)?;
    Ok(LeaderState {
        leader_id,
        reference_ids,
    })
}
