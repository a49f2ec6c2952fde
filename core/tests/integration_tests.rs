//! End-to-end tests of the localization pipeline on fixed scenarios
//!
//! These tests drive [`Environment::run_trial`] from neighbor discovery to error metrics and check
//! the behavior a reporting layer relies on:
//! 1. Noise-free ranging recovers ground truth exactly on well-posed topologies
//! 2. Election and reference selection are reproducible
//! 3. Invalid trials and unresolved agents never leak into the error metrics
//! 4. Localization error grows with range noise (checked statistically over many trials)
use std::collections::BTreeSet;

use assert_approx_eq::assert_approx_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use swarmloc::evaluation::TrialStatistics;
use swarmloc::leader::elect;
use swarmloc::noise::NoiseModel;
use swarmloc::sim::{Environment, SimulationConfig, TrialStatus, run_simulation};
use swarmloc::{AgentId, LocalizationError};

/// Five agents where agent 0 is the only one with three neighbors at range 2.0.
const FIVE_AGENTS: [(f64, f64); 5] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.2), (-1.5, -0.5), (3.0, 1.0)];

/// A spread-out swarm, fully connected at large range, with well-conditioned anchors.
const SPREAD: [(f64, f64); 8] = [
    (0.0, 0.0),
    (1.5, 0.0),
    (0.0, 1.5),
    (3.0, 3.0),
    (-2.0, 2.5),
    (2.5, -2.0),
    (-2.0, -2.5),
    (4.0, 1.0),
];

fn assert_recovers_truth(points: &[(f64, f64)], range: f64) {
    let env = Environment::from_positions(points, range, NoiseModel::noiseless()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let record = env.run_trial(0, &mut rng, false);

    assert_eq!(record.status, TrialStatus::Ok);
    assert!(record.unresolved.is_empty(), "unresolved: {:?}", record.unresolved);
    assert_eq!(record.estimated_positions.len(), points.len());
    for (id, truth) in &record.true_positions {
        let estimate = record.estimated_positions[id];
        assert_approx_eq!(estimate.x, truth.x, 1e-6);
        assert_approx_eq!(estimate.y, truth.y, 1e-6);
    }
    assert!(record.position_mse.unwrap() < 1e-12);
    assert!(record.distance_mse.unwrap() < 1e-12);
}

#[test]
fn test_five_agent_scenario_without_noise() {
    let env = Environment::from_positions(&FIVE_AGENTS, 2.0, NoiseModel::noiseless()).unwrap();
    let neighbors = env.neighbors();
    assert_eq!(neighbors.degree(AgentId(0)), 3);
    for id in 1..5 {
        assert!(neighbors.degree(AgentId(id)) < 3);
    }

    let mut rng = StdRng::seed_from_u64(1);
    let record = env.run_trial(0, &mut rng, false);
    assert_eq!(record.leader_id, Some(AgentId(0)));
    assert_eq!(record.reference_ids, Some([AgentId(1), AgentId(2)]));
    assert_recovers_truth(&FIVE_AGENTS, 2.0);
}

#[test]
fn test_noise_free_recovery_on_spread_swarm() {
    assert_recovers_truth(&SPREAD, 100.0);
    assert_recovers_truth(&SPREAD, 4.0);
}

#[test]
fn test_local_frame_is_anchored_at_leader() {
    let env = Environment::from_positions(&SPREAD, 100.0, NoiseModel::noiseless()).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let record = env.run_trial(0, &mut rng, false);
    let leader = record.leader_id.unwrap();
    let [a, b] = record.reference_ids.unwrap();

    let origin = record.local_positions[&leader];
    assert_eq!((origin.x, origin.y), (0.0, 0.0));
    assert_eq!(record.local_positions[&a].y, 0.0);
    assert!(record.local_positions[&b].y >= 0.0);
}

#[test]
fn test_election_is_deterministic() {
    let config = SimulationConfig {
        num_agents: 20,
        communication_range: 2.5,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(77);
    for _ in 0..20 {
        let env = Environment::random_uniform(&config, &mut rng).unwrap();
        let neighbors = env.neighbors();
        let first = elect(env.agents(), &neighbors);
        for _ in 0..3 {
            assert_eq!(elect(env.agents(), &env.neighbors()), first);
        }
    }
}

#[test]
fn test_references_are_two_nearest_leader_neighbors() {
    let config = SimulationConfig {
        num_agents: 25,
        communication_range: 3.0,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..20 {
        let env = Environment::random_uniform(&config, &mut rng).unwrap();
        let neighbors = env.neighbors();
        let Ok(state) = elect(env.agents(), &neighbors) else {
            continue;
        };
        let [a, b] = state.reference_ids;
        assert_ne!(a, b);
        let leader_neighbors = neighbors.get(state.leader_id).unwrap();
        assert!(leader_neighbors.contains(&a) && leader_neighbors.contains(&b));

        let leader = env.agent(state.leader_id).unwrap();
        let d_a = leader.distance_to(env.agent(a).unwrap());
        let d_b = leader.distance_to(env.agent(b).unwrap());
        assert!(d_a <= d_b);
        for other in leader_neighbors.iter().filter(|id| **id != a && **id != b) {
            assert!(leader.distance_to(env.agent(*other).unwrap()) >= d_b);
        }
    }
}

#[test]
fn test_leader_with_one_neighbor_invalidates_trial() {
    let isolated = Environment::from_positions(
        &[(0.0, 0.0), (1.0, 0.0), (10.0, 10.0)],
        2.0,
        NoiseModel::noiseless(),
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let invalid = isolated.run_trial(0, &mut rng, false);
    assert_eq!(
        invalid.status,
        TrialStatus::InvalidTrial(LocalizationError::InsufficientNeighbors {
            leader: AgentId(0),
            count: 1,
        })
    );
    assert!(invalid.estimated_positions.is_empty());
    assert_eq!(invalid.position_mse, None);
    assert_eq!(invalid.distance_mse, None);

    // A noisy valid trial has strictly positive error; the invalid one must not dilute it.
    let noisy = Environment::from_positions(&SPREAD, 100.0, NoiseModel::new(0.05).unwrap()).unwrap();
    let valid = noisy.run_trial(1, &mut rng, false);
    assert!(valid.is_valid());
    let valid_mse = valid.position_mse.unwrap();
    assert!(valid_mse > 0.0);

    let stats: TrialStatistics = [&invalid, &valid].into_iter().collect();
    assert_eq!(stats.valid_trials, 1);
    assert_eq!(stats.invalid_trials(), 1);
    assert_eq!(stats.failures.get("InsufficientNeighbors"), Some(&1));
    assert_approx_eq!(stats.position_mse.mean().unwrap(), valid_mse, 1e-15);
}

#[test]
fn test_colinear_anchors_leave_agent_unresolved() {
    // Leader, both references and the fourth agent all lie on the x-axis.
    let env = Environment::from_positions(
        &[(0.0, 0.0), (1.0, 0.0), (-1.5, 0.0), (3.0, 0.0)],
        2.0,
        NoiseModel::noiseless(),
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let record = env.run_trial(0, &mut rng, false);

    assert!(record.is_valid());
    assert_eq!(record.leader_id, Some(AgentId(0)));
    assert_eq!(record.reference_ids, Some([AgentId(1), AgentId(2)]));
    assert!(matches!(
        record.unresolved.get(&AgentId(3)),
        Some(LocalizationError::SingularSystem { .. })
    ));
    assert!(!record.estimated_positions.contains_key(&AgentId(3)));
    assert!(!record.local_positions.contains_key(&AgentId(3)));

    let resolved: BTreeSet<AgentId> = record.estimated_positions.keys().copied().collect();
    assert_eq!(resolved, BTreeSet::from([AgentId(0), AgentId(1), AgentId(2)]));
    for id in &resolved {
        let truth = record.true_positions[id];
        let estimate = record.estimated_positions[id];
        assert_approx_eq!(estimate.x, truth.x, 1e-9);
        assert_approx_eq!(estimate.y, truth.y, 1e-9);
    }
    // Neither metric is pulled toward zero or infinity by the unresolved agent.
    assert!(record.position_mse.unwrap() < 1e-12);
    assert!(record.distance_mse.unwrap() < 1e-12);
}

#[test]
fn test_inconsistent_triangle_invalidates_trial() {
    // Squared-range noise this large regularly breaks the leader/reference triangle.
    let env = Environment::from_positions(&SPREAD, 100.0, NoiseModel::new(20.0).unwrap()).unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    let records = env.run_trials(200, &mut rng, false);
    let degenerate: Vec<_> = records
        .iter()
        .filter(|r| {
            matches!(
                r.status,
                TrialStatus::InvalidTrial(LocalizationError::DegenerateTriangle { .. })
            )
        })
        .collect();
    assert!(!degenerate.is_empty());
    for record in degenerate {
        assert!(record.estimated_positions.is_empty());
        assert!(record.local_positions.is_empty());
        assert_eq!(record.position_mse, None);
        assert_eq!(record.reference_ids.map(|r| r.len()), Some(2));
    }
}

#[test]
fn test_position_mse_grows_with_noise() {
    let noise_levels = [0.0, 0.02, 0.2, 1.0];
    let mut means = Vec::new();
    for &std in &noise_levels {
        let env = Environment::from_positions(&SPREAD, 100.0, NoiseModel::new(std).unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        let records = env.run_trials(400, &mut rng, false);
        let stats: TrialStatistics = records.iter().collect();
        let mean = stats.position_mse.mean().unwrap();
        println!(
            "std {std}: mean position MSE {mean:.6} over {} valid trials",
            stats.valid_trials
        );
        means.push(mean);
    }
    assert!(means[0] < 1e-12);
    for pair in means.windows(2) {
        assert!(pair[0] <= pair[1], "MSE decreased with more noise: {means:?}");
    }
}

#[test]
fn test_parallel_multilateration_matches_sequential() {
    let env = Environment::from_positions(&SPREAD, 100.0, NoiseModel::new(0.1).unwrap()).unwrap();
    let sequential = env.run_trials(25, &mut StdRng::seed_from_u64(99), false);
    let parallel = env.run_trials(25, &mut StdRng::seed_from_u64(99), true);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_random_runs_never_emit_placeholders() {
    let config = SimulationConfig {
        num_agents: 15,
        communication_range: 2.0,
        std_noise: 0.1,
        num_iterations: 50,
        seed: Some(7),
        ..Default::default()
    };
    let result = run_simulation(&config).unwrap();
    assert_eq!(result.records.len(), 50);
    for record in &result.records {
        assert_eq!(record.true_positions.len(), 15);
        match &record.status {
            TrialStatus::Ok => {
                assert_eq!(
                    record.estimated_positions.len() + record.unresolved.len(),
                    15,
                    "every agent is either resolved or explained"
                );
                for id in record.unresolved.keys() {
                    assert!(!record.estimated_positions.contains_key(id));
                }
                for p in record.estimated_positions.values() {
                    assert!(p.x.is_finite() && p.y.is_finite());
                }
            }
            TrialStatus::InvalidTrial(_) => {
                assert!(record.estimated_positions.is_empty());
            }
        }
    }
    assert_eq!(
        result.statistics.valid_trials + result.statistics.invalid_trials(),
        50
    );
}
