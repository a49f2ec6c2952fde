//! Neighbor discovery under a communication radius.
//!
//! Discovery is centralized over the known true positions; no messages are exchanged. Adjacency
//! uses true distances only, so the resulting graph is symmetric and deterministic even when the
//! ranging radios are noisy.

use crate::agent::{Agent, AgentId};

use std::collections::{BTreeMap, BTreeSet};

/// Neighbor sets keyed by agent id. Derived data, rebuilt every trial.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighborMap {
    neighbors: BTreeMap<AgentId, BTreeSet<AgentId>>,
}

impl NeighborMap {
    /// Computes the neighbor set of every agent for the given communication radius.
    pub fn discover(agents: &[Agent], communication_range: f64) -> Self {
        let neighbors = agents
            .iter()
            .map(|agent| (agent.id, agent.neighbors(agents, communication_range)))
            .collect();
        NeighborMap { neighbors }
    }

    /// Neighbors of `id`, or `None` if the id was not part of discovery.
    pub fn get(&self, id: AgentId) -> Option<&BTreeSet<AgentId>> {
        self.neighbors.get(&id)
    }

    /// Number of neighbors of `id` (zero for unknown ids).
    pub fn degree(&self, id: AgentId) -> usize {
        self.neighbors.get(&id).map_or(0, BTreeSet::len)
    }

    /// Iterates `(id, neighbors)` in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, &BTreeSet<AgentId>)> {
        self.neighbors.iter()
    }

    /// Each undirected edge once, as `(lower id, higher id)`.
    pub fn edges(&self) -> Vec<(AgentId, AgentId)> {
        self.neighbors
            .iter()
            .flat_map(|(&a, set)| set.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}
