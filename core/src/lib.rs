//! Range-only relative localization for point swarms
//!
//! This crate simulates a swarm of point agents that have no absolute positioning and can only
//! measure noisy ranges to one another. From those ranges the swarm:
//!
//! 1. discovers who can talk to whom under a communication radius,
//! 2. elects the best-connected agent as leader (lowest id on ties),
//! 3. takes the leader's two nearest neighbors as reference agents,
//! 4. builds a local 2D frame from the three leader/reference ranges (bilateration),
//! 5. places every other agent in that frame by multilateration against the three anchors,
//!
//! and the result is scored against ground truth with position and pairwise-distance mean squared
//! errors.
//!
//! Primarily built off of:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): points, vectors and the SVD used to align
//!   the local frame with the world frame for scoring.
//! - [`rand`](https://crates.io/crates/rand) and [`rand_distr`](https://crates.io/crates/rand_distr):
//!   seeded random number generation for scenario placement and range noise.
//! - [`rayon`](https://crates.io/crates/rayon): optional data-parallel multilateration.
//!
//! ## Crate overview
//!
//! - [noise]: range noise on squared distances with a non-negativity clamp.
//! - [agent]: agent ids, true positions and noisy range measurement.
//! - [network]: neighbor discovery over true distances.
//! - [leader]: leader election and reference selection.
//! - [frame]: local frame construction and world-frame alignment.
//! - [multilateration]: three-anchor linearized range solves.
//! - [evaluation]: error metrics and run statistics.
//! - [sim]: configuration, trial pipeline and Monte Carlo driver.
//! - [error]: the error taxonomy shared by all of the above.
//!
//! ## Noise and measurement model
//!
//! Neighbor discovery uses true distances, so the communication graph is symmetric and
//! deterministic. Ranging, on the other hand, is noisy: a zero-mean Gaussian sample with standard
//! deviation $\sigma$ is added to the squared distance and clamped so that the measured range
//! $\sqrt{d^2 + n}$ is always real.
//!
//! ## Failure handling
//!
//! Failures are local. A leader with fewer than two neighbors, or leader/reference ranges that do
//! not form a triangle, invalidate the trial. Colinear anchors or an agent beyond the ranging limit
//! leave only that agent unresolved. Unresolved agents never receive placeholder coordinates and
//! are excluded from both error metrics.
//!
//! ```
//! use swarmloc::noise::NoiseModel;
//! use swarmloc::sim::Environment;
//! use rand::SeedableRng;
//!
//! let env = Environment::from_positions(
//!     &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.2), (-1.5, -0.5), (3.0, 1.0)],
//!     2.0,
//!     NoiseModel::noiseless(),
//! )
//! .unwrap();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let record = env.run_trial(0, &mut rng, false);
//! assert!(record.is_valid());
//! assert!(record.position_mse.unwrap() < 1e-12);
//! ```

pub mod agent;
pub mod error;
pub mod evaluation;
pub mod frame;
pub mod leader;
pub mod multilateration;
pub mod network;
pub mod noise;
pub mod sim;

pub use agent::{Agent, AgentId};
pub use error::LocalizationError;
pub use sim::{Environment, SimulationConfig, TrialRecord, TrialStatus, run_simulation};
