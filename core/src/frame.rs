//! Local frame construction (bilateration) and alignment to the world frame.
//!
//! The swarm has no absolute positioning, so it builds its own frame from three ranges between
//! the leader $L$ and the references $A$ and $B$. The leader sits at the origin and $A$ on the
//! positive x-axis:
//!
//! $$
//! L = (0, 0), \quad A = (z_{LA}, 0)
//! $$
//!
//! and $B$ follows from intersecting the circles of radius $z_{LB}$ about $L$ and $z_{AB}$ about $A$
//! (law of cosines), taking the upper half-plane solution:
//!
//! $$
//! x_B = \frac{z_{LB}^2 - z_{AB}^2 + z_{LA}^2}{2 z_{LA}}, \quad y_B = \sqrt{z_{LB}^2 - x_B^2}
//! $$
//!
//! Such a frame matches the world frame only up to a rigid motion, possibly with a reflection.
//! [`FrameAlignment`] recovers that transform from the anchors' true positions so that
//! estimates can be scored against ground truth.

use crate::error::LocalizationError;

use nalgebra::{Matrix2, Point2, Vector2};

/// Radicands down to `-TRIANGLE_TOLERANCE * z_LB^2` are treated as zero height.
pub const TRIANGLE_TOLERANCE: f64 = 1e-9;
/// Baselines shorter than this cannot anchor a frame.
pub const MIN_BASELINE: f64 = 1e-12;

/// Anchor placements of the leader and its two references in the local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalFrame {
    pub leader: Point2<f64>,
    pub reference_a: Point2<f64>,
    pub reference_b: Point2<f64>,
}

impl LocalFrame {
    /// Embeds the leader and references from their pairwise ranges.
    ///
    /// # Arguments
    /// * `z_la` - range from the leader to reference A
    /// * `z_lb` - range from the leader to reference B
    /// * `z_ab` - range between the two references
    ///
    /// # Errors
    /// [`LocalizationError::DegenerateTriangle`] if the baseline is (numerically) zero or the
    /// ranges violate the triangle inequality beyond [`TRIANGLE_TOLERANCE`].
    pub fn from_ranges(z_la: f64, z_lb: f64, z_ab: f64) -> Result<Self, LocalizationError> {
        if !(z_la > MIN_BASELINE) {
            return Err(LocalizationError::DegenerateTriangle { radicand: f64::NAN });
        }
        let x_b = (z_lb.powi(2) - z_ab.powi(2) + z_la.powi(2)) / (2.0 * z_la);
        let radicand = z_lb.powi(2) - x_b.powi(2);
        if radicand < -TRIANGLE_TOLERANCE * z_lb.powi(2).max(1.0) {
            return Err(LocalizationError::DegenerateTriangle { radicand });
        }
        Ok(LocalFrame {
            leader: Point2::origin(),
            reference_a: Point2::new(z_la, 0.0),
            reference_b: Point2::new(x_b, radicand.max(0.0).sqrt()),
        })
    }

    /// Anchors in multilateration order: leader, reference A, reference B.
    pub fn anchors(&self) -> [Point2<f64>; 3] {
        [self.leader, self.reference_a, self.reference_b]
    }
}

/// Orthogonal transform (rotation or reflection) plus translation from the local frame to the
/// world frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameAlignment {
    pub rotation: Matrix2<f64>,
    pub translation: Vector2<f64>,
}

impl FrameAlignment {
    /// Least-squares fit of `local` onto `world` (orthogonal Procrustes, reflections allowed).
    ///
    /// With centroids $\bar{p}$, $\bar{q}$ and $H = \sum (p_i - \bar{p})(q_i - \bar{q})^T = U \Sigma V^T$,
    /// the orthogonal matrix minimizing $\sum \lVert R p_i + t - q_i \rVert^2$ is $R = V U^T$ and
    /// $t = \bar{q} - R \bar{p}$.
    ///
    /// # Errors
    /// [`LocalizationError::AlignmentFailed`] if the point sets differ in size, are empty, or the
    /// SVD does not produce its factors.
    pub fn fit(local: &[Point2<f64>], world: &[Point2<f64>]) -> Result<Self, LocalizationError> {
        if local.is_empty() || local.len() != world.len() {
            return Err(LocalizationError::AlignmentFailed(format!(
                "need matching non-empty point sets, got {} local and {} world",
                local.len(),
                world.len()
            )));
        }
        let n = local.len() as f64;
        let local_centroid = local.iter().map(|p| p.coords).sum::<Vector2<f64>>() / n;
        let world_centroid = world.iter().map(|p| p.coords).sum::<Vector2<f64>>() / n;

        let covariance = local
            .iter()
            .zip(world)
            .map(|(p, q)| (p.coords - local_centroid) * (q.coords - world_centroid).transpose())
            .sum::<Matrix2<f64>>();
        let svd = covariance.svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                return Err(LocalizationError::AlignmentFailed(
                    "SVD of the cross-covariance did not converge".to_string(),
                ));
            }
        };
        let rotation = v_t.transpose() * u.transpose();
        let translation = world_centroid - rotation * local_centroid;
        Ok(FrameAlignment {
            rotation,
            translation,
        })
    }

    /// Maps a local-frame point into the world frame.
    pub fn apply(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.rotation * point.coords + self.translation)
    }
}
