//! Flock-wide configuration: every tunable named by the controller and the
//! force model, with defaults matching the reference tuning.

use crate::forces::{NeighborPreference, SigmoidParams};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A tunable that must be a positive finite number was not.
    NonPositive { field: &'static str, value: f64 },
    /// A tunable that must be finite was NaN or infinite.
    NonFinite { field: &'static str, value: f64 },
    ZeroFlock,
    /// Stuck detection needs at least two history entries to difference.
    HistoryWindowTooShort { actual: usize },
    /// The severe threshold must not exceed the stuck threshold.
    ThresholdOrder { stuck: f64, severe: f64 },
    ZeroSampleInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositive { field, value } => {
                write!(f, "{field} must be positive and finite, got {value}")
            }
            ConfigError::NonFinite { field, value } => {
                write!(f, "{field} must be finite, got {value}")
            }
            ConfigError::ZeroFlock => write!(f, "flock_size must be at least 1"),
            ConfigError::HistoryWindowTooShort { actual } => {
                write!(f, "history_window must be at least 2, got {actual}")
            }
            ConfigError::ThresholdOrder { stuck, severe } => write!(
                f,
                "severe_stuck_threshold ({severe}) must not exceed stuck_threshold ({stuck})"
            ),
            ConfigError::ZeroSampleInterval => write!(f, "sample_every must be positive"),
        }
    }
}

impl Error for ConfigError {}

/// All configuration consumed by the core. Environment geometry and the
/// roadmap arrive separately from the loader and planner collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockConfig {
    pub seed: u64,
    pub flock_size: usize,
    /// Macro launch point; agents spawn jittered around it.
    pub start: Point,
    /// Macro destination; must agree with the roadmap's final node.
    pub end: Point,
    /// Standard deviation of the Gaussian spawn jitter.
    pub start_jitter: f64,
    pub world_width: f64,
    pub world_height: f64,
    /// Agents may overshoot the world rectangle by this much before a
    /// candidate position is rejected.
    pub bounds_margin: f64,
    pub boid_radius: f64,
    pub max_speed: f64,
    /// Number of peers whose headings are averaged each tick.
    pub neighbor_count: usize,
    /// Radius of the goals derived from the canonical launch path.
    pub goal_radius: f64,
    /// Radius of the sub-goals created by a replan.
    pub sub_goal_radius: f64,
    /// Length of the position-history window used for stuck detection.
    pub history_window: usize,
    /// Net Manhattan displacement below this over a full window ⇒ stuck.
    pub stuck_threshold: f64,
    /// Stricter displacement threshold for the informational severe flag.
    pub severe_stuck_threshold: f64,
    /// Obstacles farther than this from the agent exert no repulsion.
    pub obstacle_influence_radius: f64,
    /// Goal attraction is suppressed when any obstacle boundary is closer
    /// than this, unless the agent is stuck.
    pub min_obstacle_clearance: f64,
    pub obstacle_beta: f64,
    /// Obstacle repulsion is divided by this while stuck, softening
    /// avoidance enough to squeeze past.
    pub stuck_obstacle_softening: f64,
    pub goal_attraction: SigmoidParams,
    /// Initial additive offset of the goal-attraction sigmoid; re-derived
    /// on every goal advance.
    pub goal_offset: f64,
    pub peer_repulsion: SigmoidParams,
    pub repulsion_offset: f64,
    /// Repulsion offset after an agent completes, discouraging crowding at
    /// the finish.
    pub done_repulsion_offset: f64,
    /// Peer-influence radius is this base plus twice the agent radius.
    pub peer_influence_base: f64,
    pub cruise_preference: NeighborPreference,
    pub stuck_preference: NeighborPreference,
    /// Blend weight of the neighbor-heading category per configured
    /// neighbor.
    pub neighbor_weight_scale: f64,
    /// Temporal smoothing weights: previous heading vs. candidate heading.
    pub previous_heading_weight: f64,
    pub candidate_heading_weight: f64,
    /// How many upcoming path nodes are penalized on a replan.
    pub replan_lookahead: usize,
    /// Edge-weight multiplier applied to the penalized nodes.
    pub replan_penalty: f64,
    pub max_ticks: usize,
    /// Metrics sampling interval for `Flock::run`.
    pub sample_every: usize,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            flock_size: 30,
            start: [356.0, 42.0],
            end: [852.0, 450.0],
            start_jitter: 10.0,
            world_width: 1000.0,
            world_height: 600.0,
            bounds_margin: 100.0,
            boid_radius: 5.0,
            max_speed: 30.0,
            neighbor_count: 3,
            goal_radius: 20.0,
            sub_goal_radius: 20.0,
            history_window: 20,
            stuck_threshold: 30.0,
            severe_stuck_threshold: 6.0,
            obstacle_influence_radius: 30.0,
            min_obstacle_clearance: 20.0,
            obstacle_beta: 1800.0,
            stuck_obstacle_softening: 10.0,
            goal_attraction: SigmoidParams {
                alpha: 0.5,
                beta: 40.0,
                delta: -0.7,
            },
            goal_offset: 60.0,
            peer_repulsion: SigmoidParams {
                alpha: 30.0,
                beta: 30.0,
                delta: -0.7,
            },
            repulsion_offset: 40.0,
            done_repulsion_offset: 100.0,
            peer_influence_base: 5.0,
            cruise_preference: NeighborPreference {
                mean: 10.0,
                sigma: 1.0,
            },
            stuck_preference: NeighborPreference {
                mean: 5.0,
                sigma: 0.5,
            },
            neighbor_weight_scale: 10.0,
            previous_heading_weight: 3.0,
            candidate_heading_weight: 1.0,
            replan_lookahead: 4,
            replan_penalty: 3.0,
            max_ticks: 800,
            sample_every: 1,
        }
    }
}

impl FlockConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("start_jitter", self.start_jitter),
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("boid_radius", self.boid_radius),
            ("max_speed", self.max_speed),
            ("goal_radius", self.goal_radius),
            ("sub_goal_radius", self.sub_goal_radius),
            ("obstacle_influence_radius", self.obstacle_influence_radius),
            ("min_obstacle_clearance", self.min_obstacle_clearance),
            ("stuck_obstacle_softening", self.stuck_obstacle_softening),
            ("peer_influence_base", self.peer_influence_base),
            ("neighbor_weight_scale", self.neighbor_weight_scale),
            ("previous_heading_weight", self.previous_heading_weight),
            ("candidate_heading_weight", self.candidate_heading_weight),
            ("replan_penalty", self.replan_penalty),
            ("stuck_threshold", self.stuck_threshold),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        let finite = [
            ("start.x", self.start[0]),
            ("start.y", self.start[1]),
            ("end.x", self.end[0]),
            ("end.y", self.end[1]),
            ("bounds_margin", self.bounds_margin),
            ("obstacle_beta", self.obstacle_beta),
            ("goal_offset", self.goal_offset),
            ("repulsion_offset", self.repulsion_offset),
            ("done_repulsion_offset", self.done_repulsion_offset),
            ("severe_stuck_threshold", self.severe_stuck_threshold),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        if self.flock_size == 0 {
            return Err(ConfigError::ZeroFlock);
        }
        if self.history_window < 2 {
            return Err(ConfigError::HistoryWindowTooShort {
                actual: self.history_window,
            });
        }
        if self.severe_stuck_threshold > self.stuck_threshold {
            return Err(ConfigError::ThresholdOrder {
                stuck: self.stuck_threshold,
                severe: self.severe_stuck_threshold,
            });
        }
        if self.sample_every == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        Ok(())
    }

    /// Peer-influence radius for an agent of the configured radius.
    pub fn peer_influence_radius(&self) -> f64 {
        self.peer_influence_base + 2.0 * self.boid_radius
    }

    /// World rectangle test with the configured overshoot margin.
    pub fn in_world(&self, p: Point) -> bool {
        p[0] > -self.bounds_margin
            && p[0] < self.world_width + self.bounds_margin
            && p[1] > -self.bounds_margin
            && p[1] < self.world_height + self.bounds_margin
    }
}
