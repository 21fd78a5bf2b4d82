//! Sparse global roadmap shared by the flock.
//!
//! The node/edge arena is built once by the external planner tooling and
//! shared read-only. Each agent holds a lightweight view over the arena
//! with a private map of edge-weight multipliers, so one agent penalizing a
//! route segment never affects its peers and never clones the graph.

use crate::geometry::{self, Point};
use std::collections::HashMap;
use std::sync::Arc;
use std::{error::Error, fmt};

/// Index of a roadmap node in the arena.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum RoadmapError {
    /// An edge or seed-path entry referenced a node outside the arena.
    NodeOutOfRange { node: NodeId, count: usize },
    /// The canonical launch path must contain at least one node.
    EmptySeedPath,
}

impl fmt::Display for RoadmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadmapError::NodeOutOfRange { node, count } => {
                write!(f, "node id {node} is out of range for {count} nodes")
            }
            RoadmapError::EmptySeedPath => write!(f, "canonical seed path is empty"),
        }
    }
}

impl Error for RoadmapError {}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The solver could not connect the two nodes.
    NoPathFound { from: NodeId, to: NodeId },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::NoPathFound { from, to } => {
                write!(f, "no roadmap path from node {from} to node {to}")
            }
        }
    }
}

impl Error for PlanError {}

/// Read-only node/edge storage. Edges are kept as per-node adjacency lists
/// in both directions; weights are the planner's traversal costs.
#[derive(Debug)]
pub struct RoadmapArena {
    positions: Vec<Point>,
    adjacency: Vec<Vec<(NodeId, f64)>>,
    seed_path: Vec<NodeId>,
}

impl RoadmapArena {
    /// Build an arena from node positions, undirected weighted edges and
    /// the canonical launch path. Node references are validated here so
    /// later queries never go out of range.
    pub fn new(
        positions: Vec<Point>,
        edges: &[(NodeId, NodeId, f64)],
        seed_path: Vec<NodeId>,
    ) -> Result<Self, RoadmapError> {
        let count = positions.len();
        let check = |node: NodeId| {
            if node < count {
                Ok(())
            } else {
                Err(RoadmapError::NodeOutOfRange { node, count })
            }
        };
        let mut adjacency = vec![Vec::new(); count];
        for &(a, b, weight) in edges {
            check(a)?;
            check(b)?;
            adjacency[a].push((b, weight));
            adjacency[b].push((a, weight));
        }
        if seed_path.is_empty() {
            return Err(RoadmapError::EmptySeedPath);
        }
        for &node in &seed_path {
            check(node)?;
        }
        Ok(Self {
            positions,
            adjacency,
            seed_path,
        })
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn node_position(&self, node: NodeId) -> Point {
        self.positions[node]
    }

    /// The canonical node path from the launch point to the destination,
    /// used to seed every agent's initial goal list.
    pub fn goal_node_sequence(&self) -> &[NodeId] {
        &self.seed_path
    }

    /// Nearest node to `p` that is not listed in `exclude`. Falls back to
    /// the nearest node overall when every node is excluded.
    pub fn nearest_node(&self, p: Point, exclude: &[NodeId]) -> NodeId {
        let pick = |skip_excluded: bool| {
            let mut best = None;
            let mut best_dist = f64::INFINITY;
            for (node, &pos) in self.positions.iter().enumerate() {
                if skip_excluded && exclude.contains(&node) {
                    continue;
                }
                let d = geometry::dist(p, pos);
                if d < best_dist {
                    best_dist = d;
                    best = Some(node);
                }
            }
            best
        };
        pick(true).or_else(|| pick(false)).unwrap_or(0)
    }
}

/// One agent's view of the shared arena: base weights plus a private,
/// sparse map of directed edge multipliers.
#[derive(Debug, Clone)]
pub struct AgentRoadmap {
    arena: Arc<RoadmapArena>,
    multipliers: HashMap<(NodeId, NodeId), f64>,
}

impl AgentRoadmap {
    pub fn new(arena: Arc<RoadmapArena>) -> Self {
        Self {
            arena,
            multipliers: HashMap::new(),
        }
    }

    pub fn arena(&self) -> &RoadmapArena {
        &self.arena
    }

    pub fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    pub fn node_position(&self, node: NodeId) -> Point {
        self.arena.node_position(node)
    }

    /// Outgoing neighbors of `node` with this agent's effective weights.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.arena.adjacency[node].iter().map(move |&(to, weight)| {
            let multiplier = self.multipliers.get(&(node, to)).copied().unwrap_or(1.0);
            (to, weight * multiplier)
        })
    }

    /// Effective weight of the directed edge `from -> to`, if present.
    pub fn edge_weight(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self.neighbors(from)
            .find(|&(node, _)| node == to)
            .map(|(_, weight)| weight)
    }

    /// Multiply every outgoing edge of `node` by `factor` in this agent's
    /// private view. Repeated penalties compound.
    pub fn penalize_outgoing(&mut self, node: NodeId, factor: f64) {
        for &(to, _) in &self.arena.adjacency[node] {
            let entry = self.multipliers.entry((node, to)).or_insert(1.0);
            *entry *= factor;
        }
    }
}

/// The narrow contract the flock uses to ask the external global planner
/// for a route. The solver sees the requesting agent's effective weights.
pub trait ShortestPathSolver {
    /// Ordered node path from `from` to `to`, both inclusive.
    fn shortest_path(
        &self,
        roadmap: &AgentRoadmap,
        from: NodeId,
        to: NodeId,
    ) -> Result<Vec<NodeId>, PlanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arc<RoadmapArena> {
        // 0 -- 1 -- 2, plus a detour 0 -- 3 -- 2.
        Arc::new(
            RoadmapArena::new(
                vec![[0.0, 0.0], [10.0, 0.0], [20.0, 0.0], [10.0, 10.0]],
                &[
                    (0, 1, 1.0),
                    (1, 2, 1.0),
                    (0, 3, 5.0),
                    (3, 2, 5.0),
                ],
                vec![0, 1, 2],
            )
            .unwrap(),
        )
    }

    #[test]
    fn construction_validates_node_references() {
        let err = RoadmapArena::new(vec![[0.0, 0.0]], &[(0, 7, 1.0)], vec![0]).unwrap_err();
        assert_eq!(err, RoadmapError::NodeOutOfRange { node: 7, count: 1 });
        let err = RoadmapArena::new(vec![[0.0, 0.0]], &[], vec![]).unwrap_err();
        assert_eq!(err, RoadmapError::EmptySeedPath);
        let err = RoadmapArena::new(vec![[0.0, 0.0]], &[], vec![3]).unwrap_err();
        assert_eq!(err, RoadmapError::NodeOutOfRange { node: 3, count: 1 });
    }

    #[test]
    fn nearest_node_honors_exclusions() {
        let arena = arena();
        assert_eq!(arena.nearest_node([9.0, 1.0], &[]), 1);
        assert_eq!(arena.nearest_node([9.0, 1.0], &[1]), 0);
        // Everything excluded: fall back to the global nearest.
        assert_eq!(arena.nearest_node([9.0, 1.0], &[0, 1, 2, 3]), 1);
    }

    #[test]
    fn penalties_are_directed_and_private() {
        let arena = arena();
        let mut penalized = AgentRoadmap::new(Arc::clone(&arena));
        let pristine = AgentRoadmap::new(Arc::clone(&arena));

        penalized.penalize_outgoing(1, 3.0);
        assert_eq!(penalized.edge_weight(1, 2), Some(3.0));
        // Only the outgoing direction is reweighted.
        assert_eq!(penalized.edge_weight(2, 1), Some(1.0));
        // Another agent's view is untouched.
        assert_eq!(pristine.edge_weight(1, 2), Some(1.0));
    }

    #[test]
    fn penalties_compound() {
        let mut view = AgentRoadmap::new(arena());
        view.penalize_outgoing(0, 3.0);
        view.penalize_outgoing(0, 3.0);
        assert_eq!(view.edge_weight(0, 1), Some(9.0));
        assert_eq!(view.edge_weight(0, 3), Some(45.0));
    }
}
