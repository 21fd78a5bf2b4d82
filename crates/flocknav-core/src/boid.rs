//! Per-agent navigation controller.
//!
//! Each tick a boid reads a frozen snapshot of its peers, blends goal
//! attraction, obstacle repulsion, peer repulsion and neighbor alignment
//! into a new heading, and stages a position update that the coordinator
//! commits once every agent has decided. Stuck agents reroute through
//! their private roadmap view before computing forces.

use crate::config::FlockConfig;
use crate::forces::{self, ForceAccum};
use crate::geometry::{self, Point};
use crate::goal::Goal;
use crate::obstacle::PolyObstacle;
use crate::roadmap::{AgentRoadmap, NodeId, ShortestPathSolver};
use crate::spatial::{self, PeerLocation};
use rstar::RTree;
use std::collections::VecDeque;
use tracing::debug;

/// Frozen pre-tick agent state read by every peer during the decide phase.
#[derive(Debug, Clone)]
pub struct PeerView {
    pub position: Point,
    pub heading: Point,
    pub stuck: bool,
    pub goal_center: Point,
}

/// Staged outcome of one decide phase, applied at commit time.
#[derive(Debug, Clone)]
struct Pending {
    heading: Point,
    /// `None` when the candidate position was rejected (out of bounds or
    /// failing an obstacle clearance check): the agent holds this tick.
    position: Option<Point>,
}

pub struct Boid {
    pub(crate) id: usize,
    pub(crate) position: Point,
    pub(crate) heading: Point,
    pub(crate) radius: f64,
    pub(crate) speed: f64,
    pub(crate) goals: Vec<Goal>,
    pub(crate) goal_index: usize,
    pub(crate) history: VecDeque<Point>,
    pub(crate) stuck: bool,
    pub(crate) severely_stuck: bool,
    pub(crate) done: bool,
    pub(crate) roadmap: AgentRoadmap,
    /// Current best-known node path; indexed in lockstep with `goals`.
    pub(crate) path: Vec<NodeId>,
    pub(crate) destination: NodeId,
    /// Additive offset of the goal-attraction sigmoid; re-derived on each
    /// goal advance.
    pub(crate) goal_offset: f64,
    /// Additive offset of the peer-repulsion sigmoid; boosted permanently
    /// once the agent completes.
    pub(crate) repulsion_offset: f64,
    pending: Option<Pending>,
}

impl Boid {
    pub(crate) fn new(id: usize, position: Point, roadmap: AgentRoadmap, config: &FlockConfig) -> Self {
        let seed_path = roadmap.arena().goal_node_sequence().to_vec();
        let goals: Vec<Goal> = seed_path
            .iter()
            .map(|&node| Goal::new(roadmap.node_position(node), config.goal_radius))
            .collect();
        // Launch heading: aim at the second goal of the route (the first
        // sits at the launch point itself), falling back for short routes.
        let aim = goals.get(1).or_else(|| goals.first());
        let heading = aim
            .and_then(|g| geometry::scale_to_speed(geometry::sub(g.position, position), config.max_speed))
            .unwrap_or([0.0, 0.0]);
        let destination = seed_path[seed_path.len() - 1];
        Self {
            id,
            position,
            heading,
            radius: config.boid_radius,
            speed: config.max_speed,
            goals,
            goal_index: 0,
            history: VecDeque::with_capacity(config.history_window + 1),
            stuck: false,
            severely_stuck: false,
            done: false,
            roadmap,
            path: seed_path,
            destination,
            goal_offset: config.goal_offset,
            repulsion_offset: config.repulsion_offset,
            pending: None,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn heading(&self) -> Point {
        self.heading
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    pub fn is_severely_stuck(&self) -> bool {
        self.severely_stuck
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Index of the goal currently pursued; advances monotonically except
    /// when a replan resets it to the head of a fresh route.
    pub fn goal_index(&self) -> usize {
        self.goal_index
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn current_goal(&self) -> Goal {
        self.goals[self.goal_index]
    }

    pub(crate) fn snapshot(&self) -> PeerView {
        PeerView {
            position: self.position,
            heading: self.heading,
            stuck: self.stuck,
            goal_center: self.current_goal().position,
        }
    }

    /// Decide phase: reads only the frozen `peers` snapshot and the
    /// pre-tick obstacle set, stages the new heading/position for commit.
    pub(crate) fn decide(
        &mut self,
        peers: &[PeerView],
        tree: &RTree<PeerLocation>,
        obstacles: &[PolyObstacle],
        solver: &dyn ShortestPathSolver,
        config: &FlockConfig,
    ) {
        if self.stuck && !self.done {
            self.replan(solver, config);
        }
        if !self.done && self.current_goal().contains(self.position) {
            self.advance_goal(config);
        }

        let peer_force = self.peer_repulsion(peers, tree, config);

        let mut weights = [0.0; 4];
        let mut directions = [[0.0; 2]; 4];
        weights[1] = peer_force.magnitude();
        directions[1] = peer_force.mean_direction();

        if !self.done {
            let obstacles_too_close = obstacles.iter().any(|ob| {
                geometry::dist(ob.closest_boundary_point(self.position), self.position)
                    < config.min_obstacle_clearance
            });
            // Goal pull is dropped while skirting an obstacle, but kept
            // while stuck so a trapped agent can still climb out.
            if self.stuck || !obstacles_too_close {
                let goal_force = self.goal_attraction(config);
                weights[2] = goal_force.magnitude();
                directions[2] = goal_force.mean_direction();
            }
            let (neighbor_weight, neighbor_dir) = self.neighbor_alignment(peers, config);
            weights[0] = neighbor_weight;
            directions[0] = neighbor_dir;
            let obstacle_force = self.obstacle_repulsion(obstacles, config);
            weights[3] = obstacle_force.magnitude();
            directions[3] = obstacle_force.mean_direction();
        }

        let candidate = Self::weighted_mean(&weights, &directions);
        let prev_w = config.previous_heading_weight;
        let cand_w = config.candidate_heading_weight;
        let heading = [
            (prev_w * self.heading[0] + cand_w * candidate[0]) / (prev_w + cand_w),
            (prev_w * self.heading[1] + cand_w * candidate[1]) / (prev_w + cand_w),
        ];

        let next = geometry::add(self.position, heading);
        let allowed =
            config.in_world(next) && obstacles.iter().all(|ob| ob.clearance_ok(next, self.radius));
        self.pending = Some(Pending {
            heading,
            position: allowed.then_some(next),
        });
    }

    /// Commit phase: apply the staged heading/position. Peers never see
    /// these writes until every agent has decided.
    pub(crate) fn commit(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.heading = pending.heading;
            if let Some(position) = pending.position {
                self.position = position;
            }
        }
    }

    /// History phase: record the committed position and refresh the stuck
    /// flags from the net Manhattan displacement across a full window.
    pub(crate) fn update_history(&mut self, config: &FlockConfig) {
        self.history.push_back(self.position);
        while self.history.len() > config.history_window {
            self.history.pop_front();
        }
        if self.history.len() == config.history_window {
            if let (Some(&first), Some(&last)) = (self.history.front(), self.history.back()) {
                let net = geometry::manhattan(last, first);
                self.stuck = net < config.stuck_threshold;
                self.severely_stuck = net < config.severe_stuck_threshold;
            }
        } else {
            // A partial window (fresh agent or just replanned) carries no
            // displacement evidence either way.
            self.stuck = false;
            self.severely_stuck = false;
        }
    }

    /// Reroute through the private roadmap view.
    ///
    /// Penalizes the outgoing edges of the next few route nodes so the
    /// solver is biased away from the segment that trapped the agent, then
    /// requests a fresh path from the nearest off-route node to the fixed
    /// destination. A failed request leaves all route state untouched so
    /// the agent retries on a later tick.
    fn replan(&mut self, solver: &dyn ShortestPathSolver, config: &FlockConfig) {
        let remaining = &self.path[self.goal_index..];
        let from = self.roadmap.arena().nearest_node(self.position, remaining);
        let penalized_end = (self.goal_index + config.replan_lookahead).min(self.path.len());
        for i in self.goal_index..penalized_end {
            let node = self.path[i];
            self.roadmap.penalize_outgoing(node, config.replan_penalty);
        }
        match solver.shortest_path(&self.roadmap, from, self.destination) {
            Ok(path) if !path.is_empty() => {
                debug!(agent = self.id, from, nodes = path.len(), "rerouted");
                self.goals = path
                    .iter()
                    .map(|&node| Goal::new(self.roadmap.node_position(node), config.sub_goal_radius))
                    .collect();
                self.path = path;
                self.goal_index = 0;
                // Fresh route: drop the stale displacement history so the
                // stuck flag cannot re-trigger before a full new window.
                self.history.clear();
            }
            Ok(_) | Err(_) => {
                debug!(agent = self.id, from, "reroute unavailable; retrying next tick");
            }
        }
    }

    fn advance_goal(&mut self, config: &FlockConfig) {
        if self.goal_index + 1 < self.goals.len() {
            self.goal_index += 1;
        }
        if self.goal_index + 1 >= self.goals.len() {
            self.done = true;
            self.repulsion_offset = config.done_repulsion_offset;
            debug!(agent = self.id, "final goal reached");
        } else {
            // Feed the previous offset back through the sigmoid at the new
            // goal's distance, so the pull re-saturates per leg.
            let goal = self.goals[self.goal_index];
            self.goal_offset = forces::sigmoid_potential(
                config.goal_attraction,
                self.goal_offset,
                self.radius,
                goal.radius,
                geometry::dist(self.position, goal.position),
            );
        }
    }

    fn goal_attraction(&self, config: &FlockConfig) -> ForceAccum {
        let goal = self.current_goal();
        let mut accum = ForceAccum::default();
        let magnitude = forces::sigmoid_potential(
            config.goal_attraction,
            self.goal_offset,
            self.radius,
            goal.radius,
            geometry::dist(self.position, goal.position),
        );
        if let Some(direction) =
            geometry::scale_to_speed(geometry::sub(goal.position, self.position), self.speed)
        {
            accum.push(magnitude, direction);
        }
        accum
    }

    fn obstacle_repulsion(&self, obstacles: &[PolyObstacle], config: &FlockConfig) -> ForceAccum {
        // Softer avoidance while stuck lets the agent squeeze past the
        // obstacle that trapped it.
        let beta = if self.stuck {
            config.obstacle_beta / config.stuck_obstacle_softening
        } else {
            config.obstacle_beta
        };
        let mut accum = ForceAccum::default();
        for ob in obstacles {
            let boundary = ob.closest_boundary_point(self.position);
            let boundary_dist = geometry::dist(boundary, self.position);
            if boundary_dist >= config.obstacle_influence_radius {
                continue;
            }
            let magnitude =
                forces::clearance_potential(beta, self.radius, ob.nominal_radius(), boundary_dist);
            if let Some(direction) =
                geometry::scale_to_speed(geometry::sub(self.position, boundary), self.speed)
            {
                accum.push(magnitude, direction);
            }
        }
        accum
    }

    fn peer_repulsion(
        &self,
        peers: &[PeerView],
        tree: &RTree<PeerLocation>,
        config: &FlockConfig,
    ) -> ForceAccum {
        let goal = self.current_goal();
        let mut accum = ForceAccum::default();
        for index in
            spatial::peers_within(tree, self.position, config.peer_influence_radius(), self.id)
        {
            let peer = &peers[index];
            // Peers already inside the goal disc are not pushed away from.
            if goal.contains(peer.position) {
                continue;
            }
            let magnitude = forces::sigmoid_potential(
                config.peer_repulsion,
                self.repulsion_offset,
                self.radius,
                self.radius,
                geometry::dist(self.position, peer.position),
            );
            if let Some(direction) =
                geometry::scale_to_speed(geometry::sub(self.position, peer.position), self.speed)
            {
                accum.push(magnitude, direction);
            }
        }
        accum
    }

    /// Sample `neighbor_count` peers through the distance-preference
    /// strategy and average their headings.
    ///
    /// Stuck peers and peers pursuing the identical goal score zero; ties
    /// resolve by roster order. The average divides by the configured
    /// neighbor count, so a thin candidate set contributes proportionally
    /// less.
    fn neighbor_alignment(&self, peers: &[PeerView], config: &FlockConfig) -> (f64, Point) {
        let pref = if self.stuck {
            config.stuck_preference
        } else {
            config.cruise_preference
        };
        let own_goal = self.current_goal().position;
        let mut scored: Vec<(f64, usize)> = peers
            .iter()
            .enumerate()
            .filter(|&(index, _)| index != self.id)
            .map(|(index, peer)| {
                let score = if peer.stuck || peer.goal_center == own_goal {
                    0.0
                } else {
                    forces::neighbor_preference(geometry::dist(self.position, peer.position), pref)
                };
                (score, index)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let k = config.neighbor_count;
        let mut sum = [0.0; 2];
        for &(_, index) in scored.iter().take(k) {
            sum[0] += peers[index].heading[0];
            sum[1] += peers[index].heading[1];
        }
        let direction = if k > 0 {
            geometry::scale(sum, 1.0 / k as f64)
        } else {
            [0.0, 0.0]
        };
        (config.neighbor_weight_scale * k as f64, direction)
    }

    fn weighted_mean(weights: &[f64; 4], directions: &[Point; 4]) -> Point {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return [0.0, 0.0];
        }
        let mut mean = [0.0; 2];
        for (w, d) in weights.iter().zip(directions) {
            mean[0] += w * d[0];
            mean[1] += w * d[1];
        }
        [mean[0] / total, mean[1] / total]
    }
}
