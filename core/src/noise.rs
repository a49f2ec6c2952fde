//! Range measurement noise.
//!
//! Ranges are corrupted in the squared domain: given a true distance $d$, a zero-mean Gaussian
//! sample $n \sim \mathcal{N}(0, \sigma^2)$ is drawn and the measured range is
//!
//! $$
//! z = \sqrt{d^2 + \max(n, -d^2)}
//! $$
//!
//! The lower clamp on the noise sample keeps the radicand non-negative, so the measured range is
//! always real and never negative. Note that $\sigma$ therefore has units of squared distance.
//!
//! The model does not own a random number generator. Callers pass one in so that a single
//! seeded generator can drive an entire run and tests can fix the seed.

use crate::error::LocalizationError;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Gaussian noise on squared ranges with a non-negativity clamp.
#[derive(Clone, Copy, Debug)]
pub struct NoiseModel {
    std: f64,
}

impl NoiseModel {
    /// Creates a noise model with standard deviation `std` (units of distance squared).
    ///
    /// # Errors
    /// Returns [`LocalizationError::InvalidConfig`] if `std` is negative or not finite.
    pub fn new(std: f64) -> Result<Self, LocalizationError> {
        if !std.is_finite() || std < 0.0 {
            return Err(LocalizationError::InvalidConfig(format!(
                "noise standard deviation must be finite and non-negative, got {std}"
            )));
        }
        Ok(NoiseModel { std })
    }

    /// A model that returns every range unchanged.
    pub const fn noiseless() -> Self {
        NoiseModel { std: 0.0 }
    }

    pub fn std(&self) -> f64 {
        self.std
    }

    /// Corrupts a true distance and returns the measured range.
    ///
    /// A sample is drawn on every call, including when `std` is zero, so the generator advances
    /// identically regardless of the noise level.
    pub fn measure<R: Rng + ?Sized>(&self, true_distance: f64, rng: &mut R) -> f64 {
        let squared = true_distance * true_distance;
        let unit: f64 = StandardNormal.sample(rng);
        let noise = (self.std * unit).max(-squared);
        (squared + noise).max(0.0).sqrt()
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::noiseless()
    }
}
