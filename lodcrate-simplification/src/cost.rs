//! Edge collapse cost evaluation

use lodcrate_core::Point3d;

use crate::quadric::Quadric;

/// Candidate result of collapsing one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollapseCost {
    pub cost: f64,
    pub position: Point3d,
    /// `q1 + q2`, the quadric the surviving vertex takes on.
    pub quadric: Quadric,
}

/// Score the collapse of the edge `(p1, p2)`.
///
/// The merge position solves the quadric's 3x3 system; a singular system
/// falls back to the midpoint of the two endpoints. Pure, so callers may
/// evaluate independent edges in parallel.
pub fn evaluate_collapse(q1: &Quadric, q2: &Quadric, p1: &Point3d, p2: &Point3d) -> CollapseCost {
    let quadric = *q1 + *q2;
    let position = quadric
        .optimal_point()
        .unwrap_or_else(|| nalgebra::center(p1, p2));
    // Rounding can push an exact zero slightly negative
    let cost = quadric.evaluate(&position).max(0.0);
    CollapseCost {
        cost,
        position,
        quadric,
    }
}
