//! Agents and their ground-truth geometry.
//!
//! An [`Agent`] is an immutable, trial-scoped record: a stable id, a true position and the noise
//! model of its ranging radio. Anything derived during a trial (neighbor sets, estimates) is kept
//! in separate maps keyed by [`AgentId`], never on the agent itself.

use crate::noise::NoiseModel;

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use nalgebra::Point2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable, unique agent identifier. Ordering on ids is the tie-break rule throughout the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rb{}", self.0)
    }
}

/// A point agent with a known (ground-truth) position.
#[derive(Clone, Copy, Debug)]
pub struct Agent {
    pub id: AgentId,
    pub position: Point2<f64>,
    pub noise: NoiseModel,
}

impl Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Agent({}, x: {:.3}, y: {:.3}, noise_std: {})",
            self.id,
            self.position.x,
            self.position.y,
            self.noise.std()
        )
    }
}

impl Agent {
    pub fn new(id: AgentId, x: f64, y: f64, noise: NoiseModel) -> Self {
        Agent {
            id,
            position: Point2::new(x, y),
            noise,
        }
    }

    pub fn position(&self) -> Point2<f64> {
        self.position
    }

    /// True Euclidean distance to another agent.
    pub fn distance_to(&self, other: &Agent) -> f64 {
        nalgebra::distance(&self.position, &other.position)
    }

    /// Noisy range to another agent, measured by this agent's radio.
    ///
    /// The noise model is fed the true distance; see [`NoiseModel::measure`].
    pub fn measure_distance<R: Rng + ?Sized>(&self, other: &Agent, rng: &mut R) -> f64 {
        self.noise.measure(self.distance_to(other), rng)
    }

    /// Ids of every other agent within `range` of this one, by true distance.
    pub fn neighbors(&self, agents: &[Agent], range: f64) -> BTreeSet<AgentId> {
        agents
            .iter()
            .filter(|other| other.id != self.id && self.distance_to(other) <= range)
            .map(|other| other.id)
            .collect()
    }
}
