//! Shared test fixtures: a reference shortest-path solver and small
//! roadmap builders.

use crate::roadmap::{AgentRoadmap, NodeId, PlanError, RoadmapArena, ShortestPathSolver};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::sync::Arc;

/// Reference solver backed by `petgraph`; stands in for the external
/// global planner. Sees the requesting agent's effective (possibly
/// penalized) edge weights.
pub(crate) struct GraphSolver;

impl ShortestPathSolver for GraphSolver {
    fn shortest_path(
        &self,
        roadmap: &AgentRoadmap,
        from: NodeId,
        to: NodeId,
    ) -> Result<Vec<NodeId>, PlanError> {
        let mut graph: DiGraph<(), f64> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..roadmap.node_count())
            .map(|_| graph.add_node(()))
            .collect();
        for node in 0..roadmap.node_count() {
            for (neighbor, weight) in roadmap.neighbors(node) {
                graph.add_edge(nodes[node], nodes[neighbor], weight);
            }
        }
        let (_, path) = astar(
            &graph,
            nodes[from],
            |n| n == nodes[to],
            |e| *e.weight(),
            |_| 0.0,
        )
        .ok_or(PlanError::NoPathFound { from, to })?;
        Ok(path.into_iter().map(NodeIndex::index).collect())
    }
}

/// Solver double that never finds a route; exercises the stuck-retry path.
pub(crate) struct NoRouteSolver;

impl ShortestPathSolver for NoRouteSolver {
    fn shortest_path(
        &self,
        _roadmap: &AgentRoadmap,
        from: NodeId,
        to: NodeId,
    ) -> Result<Vec<NodeId>, PlanError> {
        Err(PlanError::NoPathFound { from, to })
    }
}

/// A one-node roadmap whose seed path is just that node: the simplest
/// environment for goal-seeking tests.
pub(crate) fn single_node_arena(position: [f64; 2]) -> Arc<RoadmapArena> {
    Arc::new(RoadmapArena::new(vec![position], &[], vec![0]).unwrap())
}
