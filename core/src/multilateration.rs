//! Range-only position fixes from three placed anchors.
//!
//! Subtracting the circle equations $(x - x_i)^2 + (y - y_i)^2 = d_i^2$ pairwise removes the
//! quadratic terms and leaves a 2x2 linear system:
//!
//! $$
//! \begin{aligned}
//! 2(x_2 - x_1)x + 2(y_2 - y_1)y &= d_1^2 - d_2^2 - x_1^2 + x_2^2 - y_1^2 + y_2^2 \\\\
//! 2(x_3 - x_2)x + 2(y_3 - y_2)y &= d_2^2 - d_3^2 - x_2^2 + x_3^2 - y_2^2 + y_3^2
//! \end{aligned}
//! $$
//!
//! which is solved by Cramer's rule. Colinear anchors make the determinant vanish and the fix is
//! refused rather than divided through.

use crate::agent::AgentId;
use crate::error::LocalizationError;

use nalgebra::Point2;
use rayon::prelude::*;

/// Determinants with magnitude below this are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-9;

/// Solves for the point at ranges `ranges[i]` from `anchors[i]`.
///
/// # Errors
/// [`LocalizationError::SingularSystem`] if the anchors are (numerically) colinear.
pub fn multilaterate(
    anchors: &[Point2<f64>; 3],
    ranges: &[f64; 3],
) -> Result<Point2<f64>, LocalizationError> {
    let [p1, p2, p3] = anchors;
    let [d1, d2, d3] = ranges;

    let a11 = 2.0 * (p2.x - p1.x);
    let a12 = 2.0 * (p2.y - p1.y);
    let a21 = 2.0 * (p3.x - p2.x);
    let a22 = 2.0 * (p3.y - p2.y);
    let b1 = d1.powi(2) - d2.powi(2) - p1.x.powi(2) + p2.x.powi(2) - p1.y.powi(2) + p2.y.powi(2);
    let b2 = d2.powi(2) - d3.powi(2) - p2.x.powi(2) + p3.x.powi(2) - p2.y.powi(2) + p3.y.powi(2);

    let determinant = a11 * a22 - a12 * a21;
    if !(determinant.abs() >= SINGULAR_EPSILON) {
        return Err(LocalizationError::SingularSystem { determinant });
    }
    let x = (b1 * a22 - a12 * b2) / determinant;
    let y = (a11 * b2 - b1 * a21) / determinant;
    Ok(Point2::new(x, y))
}

/// Ranges from one agent to the three anchors, or the reason they could not be taken.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeSet {
    pub agent: AgentId,
    pub ranges: Result<[f64; 3], LocalizationError>,
}

/// Fixes every agent in `range_sets` against the same anchors.
///
/// Results are returned in input order. Each agent's fix depends only on the anchors and its own
/// ranges, so with `parallel` set the solves are spread over the rayon thread pool; the output is
/// identical either way.
pub fn multilaterate_all(
    anchors: &[Point2<f64>; 3],
    range_sets: &[RangeSet],
    parallel: bool,
) -> Vec<(AgentId, Result<Point2<f64>, LocalizationError>)> {
    let solve = |set: &RangeSet| {
        let fix = set
            .ranges
            .clone()
            .and_then(|ranges| multilaterate(anchors, &ranges));
        (set.agent, fix)
    };
    if parallel {
        range_sets.par_iter().map(solve).collect()
    } else {
        range_sets.iter().map(solve).collect()
    }
}
