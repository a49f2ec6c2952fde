//! Trial orchestration for swarm localization simulations.
//!
//! This module provides:
//! - [`SimulationConfig`], the value-only configuration surface of a run, with validation
//! - [`Environment`], the ground-truth swarm of one trial
//! - [`Environment::run_trial`], the full pipeline from neighbor discovery to error metrics
//! - [`TrialRecord`], the structured per-iteration result handed to reporting code
//! - [`run_simulation`], the Monte Carlo driver over fresh random swarms
//!
//! A single seeded [`StdRng`] feeds scenario generation and every range measurement of a run, in a
//! fixed order, so a seed reproduces a run exactly. Nothing here prints or touches the filesystem;
//! the `swarm-sim` binary consumes the records.

use crate::agent::{Agent, AgentId};
use crate::error::LocalizationError;
use crate::evaluation::{TrialStatistics, distance_mse, position_mse};
use crate::frame::{FrameAlignment, LocalFrame};
use crate::leader::{LeaderState, elect_leader, select_references};
use crate::multilateration::{RangeSet, multilaterate_all};
use crate::network::NeighborMap;
use crate::noise::NoiseModel;

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Axis-aligned region in which random swarms are placed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for Arena {
    fn default() -> Self {
        Arena {
            min_x: 0.0,
            max_x: 10.0,
            min_y: 0.0,
            max_y: 10.0,
        }
    }
}

/// Configuration of a simulation run.
///
/// `communication_range` decides who counts as a neighbor (and therefore who leads), while
/// `ranging_range` optionally limits how far an agent can be ranged by the anchors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of agents in each random swarm (at least 3)
    pub num_agents: usize,
    /// Neighbor discovery radius
    pub communication_range: f64,
    /// Standard deviation of the noise added to squared ranges
    pub std_noise: f64,
    /// Number of independent trials
    pub num_iterations: usize,
    /// RNG seed; a random one is drawn (and logged) when absent
    pub seed: Option<u64>,
    /// Maximum true distance at which an anchor can range an agent
    pub ranging_range: Option<f64>,
    /// Solve multilateration on the rayon thread pool
    pub parallel: bool,
    /// Placement region for random swarms
    pub arena: Arena,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_agents: 15,
            communication_range: 2.0,
            std_noise: 0.1,
            num_iterations: 5,
            seed: None,
            ranging_range: None,
            parallel: false,
            arena: Arena::default(),
        }
    }
}

impl SimulationConfig {
    /// Checks every value against its domain. Run this before any trial.
    pub fn validate(&self) -> Result<(), LocalizationError> {
        let invalid = |msg: String| Err(LocalizationError::InvalidConfig(msg));
        if self.num_agents < 3 {
            return invalid(format!("num_agents must be at least 3, got {}", self.num_agents));
        }
        if !(self.communication_range.is_finite() && self.communication_range > 0.0) {
            return invalid(format!(
                "communication_range must be positive, got {}",
                self.communication_range
            ));
        }
        if !(self.std_noise.is_finite() && self.std_noise >= 0.0) {
            return invalid(format!("std_noise must be non-negative, got {}", self.std_noise));
        }
        if self.num_iterations < 1 {
            return invalid("num_iterations must be at least 1".to_string());
        }
        if let Some(range) = self.ranging_range
            && !(range.is_finite() && range > 0.0)
        {
            return invalid(format!("ranging_range must be positive, got {range}"));
        }
        let arena = &self.arena;
        if !(arena.min_x < arena.max_x && arena.min_y < arena.max_y)
            || ![arena.min_x, arena.max_x, arena.min_y, arena.max_y]
                .iter()
                .all(|v| v.is_finite())
        {
            return invalid(format!("arena bounds are empty or not finite: {arena:?}"));
        }
        Ok(())
    }
}

/// Outcome of a trial.
#[derive(Clone, Debug, PartialEq)]
pub enum TrialStatus {
    /// A frame was built; individual agents may still be unresolved.
    Ok,
    /// No frame could be built; the trial is excluded from aggregate metrics.
    InvalidTrial(LocalizationError),
}

/// Structured result of one trial.
///
/// `estimated_positions` and `local_positions` only ever contain resolved agents. Agents that
/// could not be fixed are listed in `unresolved` with the reason.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialRecord {
    pub iteration: usize,
    pub true_positions: BTreeMap<AgentId, Point2<f64>>,
    /// Estimates in the swarm's own frame (leader at the origin)
    pub local_positions: BTreeMap<AgentId, Point2<f64>>,
    /// Estimates mapped into the world frame through the anchors
    pub estimated_positions: BTreeMap<AgentId, Point2<f64>>,
    pub unresolved: BTreeMap<AgentId, LocalizationError>,
    pub leader_id: Option<AgentId>,
    pub reference_ids: Option<[AgentId; 2]>,
    pub position_mse: Option<f64>,
    pub distance_mse: Option<f64>,
    pub status: TrialStatus,
}

impl TrialRecord {
    /// A record with no data yet.
    pub fn empty(iteration: usize) -> Self {
        TrialRecord {
            iteration,
            true_positions: BTreeMap::new(),
            local_positions: BTreeMap::new(),
            estimated_positions: BTreeMap::new(),
            unresolved: BTreeMap::new(),
            leader_id: None,
            reference_ids: None,
            position_mse: None,
            distance_mse: None,
            status: TrialStatus::Ok,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == TrialStatus::Ok
    }

    fn invalidate(mut self, error: LocalizationError) -> Self {
        warn!("Trial {} invalid: {}", self.iteration, error);
        self.local_positions.clear();
        self.estimated_positions.clear();
        self.unresolved.clear();
        self.position_mse = None;
        self.distance_mse = None;
        self.status = TrialStatus::InvalidTrial(error);
        self
    }
}

/// Ground truth of one trial.
#[derive(Clone, Debug)]
pub struct Environment {
    agents: Vec<Agent>,
    communication_range: f64,
    ranging_range: Option<f64>,
}

impl Environment {
    /// Wraps a set of agents. Agents are kept in ascending id order.
    ///
    /// # Errors
    /// [`LocalizationError::InvalidConfig`] on duplicate ids or a non-positive range.
    pub fn new(mut agents: Vec<Agent>, communication_range: f64) -> Result<Self, LocalizationError> {
        if !(communication_range.is_finite() && communication_range > 0.0) {
            return Err(LocalizationError::InvalidConfig(format!(
                "communication_range must be positive, got {communication_range}"
            )));
        }
        agents.sort_by_key(|a| a.id);
        if agents.windows(2).any(|w| w[0].id == w[1].id) {
            return Err(LocalizationError::InvalidConfig(
                "agent ids must be unique".to_string(),
            ));
        }
        Ok(Environment {
            agents,
            communication_range,
            ranging_range: None,
        })
    }

    /// Builds a swarm at fixed coordinates; agent `i` gets id `i`.
    pub fn from_positions(
        points: &[(f64, f64)],
        communication_range: f64,
        noise: NoiseModel,
    ) -> Result<Self, LocalizationError> {
        let agents = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Agent::new(AgentId(i), x, y, noise))
            .collect();
        Environment::new(agents, communication_range)
    }

    /// Places `config.num_agents` agents uniformly at random in the arena.
    pub fn random_uniform<R: Rng + ?Sized>(
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Result<Self, LocalizationError> {
        let noise = NoiseModel::new(config.std_noise)?;
        let arena = config.arena;
        let agents = (0..config.num_agents)
            .map(|i| {
                let x = rng.random_range(arena.min_x..arena.max_x);
                let y = rng.random_range(arena.min_y..arena.max_y);
                Agent::new(AgentId(i), x, y, noise)
            })
            .collect();
        Ok(Environment::new(agents, config.communication_range)?.with_ranging_range(config.ranging_range))
    }

    /// Limits how far anchors can range an agent. `None` removes the limit.
    pub fn with_ranging_range(mut self, ranging_range: Option<f64>) -> Self {
        self.ranging_range = ranging_range;
        self
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents
            .binary_search_by_key(&id, |a| a.id)
            .ok()
            .map(|i| &self.agents[i])
    }

    pub fn communication_range(&self) -> f64 {
        self.communication_range
    }

    pub fn true_positions(&self) -> BTreeMap<AgentId, Point2<f64>> {
        self.agents.iter().map(|a| (a.id, a.position)).collect()
    }

    pub fn neighbors(&self) -> NeighborMap {
        NeighborMap::discover(&self.agents, self.communication_range)
    }

    fn require(&self, id: AgentId) -> Result<&Agent, LocalizationError> {
        self.agent(id).ok_or(LocalizationError::UnknownAgent(id))
    }

    /// Ranges from `agent` to each anchor, measured by the anchors' radios.
    fn anchor_ranges<R: Rng + ?Sized>(
        &self,
        agent: &Agent,
        anchors: &[&Agent; 3],
        rng: &mut R,
    ) -> Result<[f64; 3], LocalizationError> {
        if let Some(limit) = self.ranging_range
            && let Some(far) = anchors.iter().find(|anchor| anchor.distance_to(agent) > limit)
        {
            return Err(LocalizationError::OutOfRange {
                agent: agent.id,
                anchor: far.id,
            });
        }
        Ok([
            anchors[0].measure_distance(agent, rng),
            anchors[1].measure_distance(agent, rng),
            anchors[2].measure_distance(agent, rng),
        ])
    }

    /// Runs the full localization pipeline once.
    ///
    /// Geometric failures never escape: frame-level failures yield an
    /// [`TrialStatus::InvalidTrial`] record, agent-level failures leave that agent unresolved.
    pub fn run_trial<R: Rng + ?Sized>(
        &self,
        iteration: usize,
        rng: &mut R,
        parallel: bool,
    ) -> TrialRecord {
        let mut record = TrialRecord {
            true_positions: self.true_positions(),
            ..TrialRecord::empty(iteration)
        };

        let neighbors = self.neighbors();
        let leader_id = match elect_leader(&self.agents, &neighbors) {
            Ok(id) => id,
            Err(e) => return record.invalidate(e),
        };
        record.leader_id = Some(leader_id);
        let reference_ids = match select_references(leader_id, &self.agents, &neighbors) {
            Ok(ids) => ids,
            Err(e) => return record.invalidate(e),
        };
        record.reference_ids = Some(reference_ids);
        let state = LeaderState {
            leader_id,
            reference_ids,
        };

        match self.localize(&state, &neighbors, &mut record, rng, parallel) {
            Ok(()) => {
                debug!(
                    "Trial {}: leader {}, {} resolved, {} unresolved, position MSE {:?}, distance MSE {:?}",
                    iteration,
                    leader_id,
                    record.estimated_positions.len(),
                    record.unresolved.len(),
                    record.position_mse,
                    record.distance_mse
                );
                record
            }
            Err(e) => record.invalidate(e),
        }
    }

    fn localize<R: Rng + ?Sized>(
        &self,
        state: &LeaderState,
        neighbors: &NeighborMap,
        record: &mut TrialRecord,
        rng: &mut R,
        parallel: bool,
    ) -> Result<(), LocalizationError> {
        let leader = self.require(state.leader_id)?;
        let reference_a = self.require(state.reference_ids[0])?;
        let reference_b = self.require(state.reference_ids[1])?;

        let z_la = leader.measure_distance(reference_a, rng);
        let z_lb = leader.measure_distance(reference_b, rng);
        let z_ab = reference_a.measure_distance(reference_b, rng);
        let frame = LocalFrame::from_ranges(z_la, z_lb, z_ab)?;

        let anchor_agents = [leader, reference_a, reference_b];
        let anchor_ids: BTreeSet<AgentId> = anchor_agents.iter().map(|a| a.id).collect();
        for (agent, position) in anchor_agents.iter().zip(frame.anchors()) {
            record.local_positions.insert(agent.id, position);
        }

        // Measurements are drawn in id order on this thread so the RNG stream does not depend on
        // whether the solves run in parallel.
        let range_sets: Vec<RangeSet> = self
            .agents
            .iter()
            .filter(|agent| !anchor_ids.contains(&agent.id))
            .map(|agent| RangeSet {
                agent: agent.id,
                ranges: self.anchor_ranges(agent, &anchor_agents, rng),
            })
            .collect();
        for (id, fix) in multilaterate_all(&frame.anchors(), &range_sets, parallel) {
            match fix {
                Ok(position) => {
                    record.local_positions.insert(id, position);
                }
                Err(e) => {
                    debug!("Agent {} unresolved: {}", id, e);
                    record.unresolved.insert(id, e);
                }
            }
        }

        let world_anchors = anchor_agents.map(|a| a.position);
        let alignment = FrameAlignment::fit(&frame.anchors(), &world_anchors)?;
        record.estimated_positions = record
            .local_positions
            .iter()
            .map(|(&id, p)| (id, alignment.apply(p)))
            .collect();

        record.position_mse = position_mse(&record.true_positions, &record.estimated_positions);
        record.distance_mse = distance_mse(&record.true_positions, &record.local_positions, neighbors);
        Ok(())
    }

    /// Repeats [`Environment::run_trial`] on this fixed topology.
    pub fn run_trials<R: Rng + ?Sized>(
        &self,
        trials: usize,
        rng: &mut R,
        parallel: bool,
    ) -> Vec<TrialRecord> {
        (0..trials)
            .map(|i| self.run_trial(i, rng, parallel))
            .collect()
    }
}

/// Records and aggregate statistics of a run.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    /// Seed actually used, so runs without a configured seed can be repeated
    pub seed: u64,
    pub records: Vec<TrialRecord>,
    pub statistics: TrialStatistics,
}

/// Runs `config.num_iterations` trials, each on a freshly generated random swarm.
///
/// # Errors
/// Only configuration errors are returned; they are detected before the first trial.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationResult, LocalizationError> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    info!(
        "Running {} trial(s) of {} agents (range {}, noise std {}, seed {})",
        config.num_iterations, config.num_agents, config.communication_range, config.std_noise, seed
    );
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(config.num_iterations);
    let mut statistics = TrialStatistics::new();
    for iteration in 0..config.num_iterations {
        let environment = Environment::random_uniform(config, &mut rng)?;
        let record = environment.run_trial(iteration, &mut rng, config.parallel);
        statistics.push(&record);
        records.push(record);
    }
    info!(
        "Completed {} trial(s): {} valid, {} invalid",
        statistics.trials,
        statistics.valid_trials,
        statistics.invalid_trials()
    );
    Ok(SimulationResult {
        seed,
        records,
        statistics,
    })
}
