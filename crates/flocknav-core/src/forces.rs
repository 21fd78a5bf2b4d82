//! Pure potential functions and the per-category force accumulator.
//!
//! Each force category (goal attraction, peer repulsion, obstacle
//! repulsion) produces a direction vector scaled to the agent's maximum
//! speed and a non-negative scalar magnitude; categories are later blended
//! by their accumulated magnitudes. An empty candidate set accumulates to a
//! zero vector with zero magnitude, which is a valid (weightless) result,
//! not an error.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Keeps the near-singular obstacle potential finite when an agent's
/// clearance equals the combined radii exactly.
const POTENTIAL_CAP: f64 = 1e12;

/// Shape constants of the sigmoid potential family shared by goal
/// attraction and peer repulsion. The additive offset is carried per agent
/// because it evolves over a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmoidParams {
    pub alpha: f64,
    pub beta: f64,
    pub delta: f64,
}

/// Sigmoid-of-distance potential:
/// `r_a * r_b * alpha / (1 + beta * exp(delta * distance)) + offset`.
///
/// With a negative `delta` the value grows monotonically with distance,
/// saturating near `offset` at close range and near
/// `r_a * r_b * alpha + offset` far away.
pub fn sigmoid_potential(
    params: SigmoidParams,
    offset: f64,
    radius_a: f64,
    radius_b: f64,
    distance: f64,
) -> f64 {
    radius_a * radius_b * params.alpha / (1.0 + params.beta * (params.delta * distance).exp())
        + offset
}

/// Obstacle repulsion:
/// `r_a * r_o * beta / sqrt(|boundary_distance - r_o - r_a|)`.
///
/// The absolute value keeps the square root in-domain when the agent is
/// already closer than the combined radii; the result rises sharply as
/// clearance shrinks and is capped so the blend arithmetic stays finite
/// when the denominator reaches zero.
pub fn clearance_potential(
    beta: f64,
    agent_radius: f64,
    obstacle_radius: f64,
    boundary_distance: f64,
) -> f64 {
    let gap = (boundary_distance - obstacle_radius - agent_radius).abs();
    let value = agent_radius * obstacle_radius * beta / gap.sqrt();
    if value.is_finite() {
        value.min(POTENTIAL_CAP)
    } else {
        POTENTIAL_CAP
    }
}

/// Distance-preference strategy used when sampling flock neighbors: a
/// Gaussian bump centered on the preferred peer distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborPreference {
    pub mean: f64,
    pub sigma: f64,
}

/// Gaussian probability density of `distance` under the preference
/// strategy. Peers near the preferred distance score highest.
pub fn neighbor_preference(distance: f64, pref: NeighborPreference) -> f64 {
    let z = (distance - pref.mean) / pref.sigma;
    (-0.5 * z * z).exp() / (2.5066282746310002 * pref.sigma)
}

/// Accumulates one force category: the magnitude-weighted vector sum and
/// the scalar magnitude total used as the category's blend weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceAccum {
    vector: Point,
    magnitude: f64,
}

impl ForceAccum {
    /// Add one contribution: `magnitude` times a speed-scaled `direction`.
    pub fn push(&mut self, magnitude: f64, direction: Point) {
        self.vector[0] += magnitude * direction[0];
        self.vector[1] += magnitude * direction[1];
        self.magnitude += magnitude;
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// The accumulated vector normalized by the accumulated magnitude —
    /// the category's mean direction at speed scale. Zero when nothing was
    /// accumulated.
    pub fn mean_direction(&self) -> Point {
        if self.magnitude > 0.0 {
            [self.vector[0] / self.magnitude, self.vector[1] / self.magnitude]
        } else {
            [0.0, 0.0]
        }
    }
}
