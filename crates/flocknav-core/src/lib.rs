//! Potential-field flock navigation over 2-D polygonal maps.
//!
//! A flock of point agents steers toward a sequence of disc goals derived
//! from a sparse global roadmap, blending four force categories per tick:
//! goal attraction, polygon-obstacle repulsion, peer repulsion and
//! neighbor-heading alignment. Agents that stop making progress reweight
//! their private roadmap view and request a fresh route from an external
//! shortest-path solver.
//!
//! The coordinator runs a strict snapshot/commit protocol: within one tick
//! every agent reads the same frozen pre-tick state, and all writes land
//! together after the last agent has decided. Runs are deterministic per
//! configuration seed.
//!
//! External collaborators — the roadmap builder, the shortest-path solver,
//! map loading, rendering and statistics sinks — stay outside this crate
//! and connect through [`roadmap::ShortestPathSolver`], the
//! [`roadmap::RoadmapArena`] queries and the read accessors on
//! [`flock::Flock`].

pub mod boid;
pub mod config;
pub mod flock;
pub mod forces;
pub mod geometry;
pub mod goal;
pub mod metrics;
pub mod obstacle;
pub mod roadmap;
pub mod spatial;

#[cfg(test)]
pub(crate) mod testutil;

pub use boid::Boid;
pub use config::{ConfigError, FlockConfig};
pub use flock::{Flock, FlockInitError, TickStats};
pub use forces::{NeighborPreference, SigmoidParams};
pub use geometry::Point;
pub use goal::Goal;
pub use metrics::{RunSummary, TickSample};
pub use obstacle::{PolyObstacle, PolygonError};
pub use roadmap::{
    AgentRoadmap, NodeId, PlanError, RoadmapArena, RoadmapError, ShortestPathSolver,
};
