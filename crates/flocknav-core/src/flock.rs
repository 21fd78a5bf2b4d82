//! Flock coordinator: owns the agents, obstacles and the shared roadmap,
//! and drives the synchronized tick protocol.
//!
//! A tick is three phases. Decide: every agent computes its next heading
//! and candidate position against a frozen snapshot of pre-tick peer state
//! and the pre-tick obstacle set, so no agent ever observes a same-tick
//! write. Commit: obstacle motion and all staged agent writes are applied.
//! History: stuck flags are re-derived from the committed positions.

use crate::boid::{Boid, PeerView};
use crate::config::{ConfigError, FlockConfig};
use crate::geometry;
use crate::metrics::{self, RunSummary, TickSample};
use crate::obstacle::PolyObstacle;
use crate::roadmap::{AgentRoadmap, RoadmapArena, ShortestPathSolver};
use crate::spatial;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;
use std::{error::Error, fmt};
use tracing::{debug, trace};

#[derive(Debug)]
pub enum FlockInitError {
    Config(ConfigError),
    /// The configured end macro point does not sit on the roadmap's
    /// destination node (within the goal radius).
    DestinationMismatch {
        destination: [f64; 2],
        end: [f64; 2],
    },
}

impl fmt::Display for FlockInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlockInitError::Config(e) => write!(f, "{e}"),
            FlockInitError::DestinationMismatch { destination, end } => write!(
                f,
                "end point ({}, {}) does not match the roadmap destination node at ({}, {})",
                end[0], end[1], destination[0], destination[1]
            ),
        }
    }
}

impl From<ConfigError> for FlockInitError {
    fn from(err: ConfigError) -> Self {
        FlockInitError::Config(err)
    }
}

impl Error for FlockInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FlockInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Aggregate counts reported after every tick.
#[derive(Debug, Clone, Copy)]
pub struct TickStats {
    pub tick: usize,
    pub finished: usize,
    pub stuck: usize,
    pub severely_stuck: usize,
}

pub struct Flock {
    boids: Vec<Boid>,
    obstacles: Vec<PolyObstacle>,
    planner: Box<dyn ShortestPathSolver>,
    config: FlockConfig,
    tick: usize,
}

impl fmt::Debug for Flock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flock")
            .field("boids", &self.boids.len())
            .field("obstacles", &self.obstacles)
            .field("config", &self.config)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Flock {
    /// Build the flock: validates the configuration, checks the end macro
    /// point against the roadmap destination, and spawns agents jittered
    /// around the start macro point with a seeded RNG.
    pub fn new(
        config: FlockConfig,
        obstacles: Vec<PolyObstacle>,
        arena: Arc<RoadmapArena>,
        planner: Box<dyn ShortestPathSolver>,
    ) -> Result<Self, FlockInitError> {
        config.validate()?;
        let seed_path = arena.goal_node_sequence();
        let destination = arena.node_position(seed_path[seed_path.len() - 1]);
        if geometry::dist(destination, config.end) > config.goal_radius {
            return Err(FlockInitError::DestinationMismatch {
                destination,
                end: config.end,
            });
        }

        let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
        let jitter = Normal::new(0.0, config.start_jitter).map_err(|_| {
            ConfigError::NonPositive {
                field: "start_jitter",
                value: config.start_jitter,
            }
        })?;
        let boids = (0..config.flock_size)
            .map(|id| {
                let position = [
                    config.start[0] + jitter.sample(&mut rng),
                    config.start[1] + jitter.sample(&mut rng),
                ];
                Boid::new(id, position, AgentRoadmap::new(Arc::clone(&arena)), &config)
            })
            .collect();

        Ok(Self {
            boids,
            obstacles,
            planner,
            config,
            tick: 0,
        })
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn obstacles(&self) -> &[PolyObstacle] {
        &self.obstacles
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn finished_count(&self) -> usize {
        self.boids.iter().filter(|b| b.is_done()).count()
    }

    pub fn all_done(&self) -> bool {
        self.boids.iter().all(Boid::is_done)
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) -> TickStats {
        self.tick += 1;

        // Decide phase: frozen snapshot, shared spatial index.
        let snapshot: Vec<PeerView> = self.boids.iter().map(Boid::snapshot).collect();
        let tree = spatial::build_index(&snapshot);
        for boid in &mut self.boids {
            boid.decide(
                &snapshot,
                &tree,
                &self.obstacles,
                self.planner.as_ref(),
                &self.config,
            );
        }

        // Commit phase: obstacle motion first (computed from pre-tick
        // state), then every staged agent write.
        for obstacle in &mut self.obstacles {
            obstacle.advance();
        }
        for boid in &mut self.boids {
            boid.commit();
        }

        // History phase: flags derive from the committed positions.
        for boid in &mut self.boids {
            boid.update_history(&self.config);
        }

        let stats = TickStats {
            tick: self.tick,
            finished: self.finished_count(),
            stuck: self.boids.iter().filter(|b| b.is_stuck()).count(),
            severely_stuck: self.boids.iter().filter(|b| b.is_severely_stuck()).count(),
        };
        trace!(
            tick = stats.tick,
            finished = stats.finished,
            stuck = stats.stuck,
            "tick committed"
        );
        stats
    }

    /// Run until every agent is done or the tick budget is exhausted,
    /// collecting a metrics sample every `sample_every` ticks.
    pub fn run(&mut self) -> RunSummary {
        let mut samples: Vec<TickSample> = Vec::new();
        while self.tick < self.config.max_ticks && !self.all_done() {
            self.step();
            if self.tick % self.config.sample_every == 0 || self.all_done() {
                samples.push(metrics::collect_tick_sample(self.tick, &self.boids));
            }
        }
        let summary = RunSummary {
            ticks_run: self.tick,
            flock_size: self.boids.len(),
            completed: self.finished_count(),
            samples,
        };
        debug!(
            ticks = summary.ticks_run,
            completed = summary.completed,
            flock = summary.flock_size,
            "run finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{single_node_arena, NoRouteSolver};

    fn lone_boid_config() -> FlockConfig {
        FlockConfig {
            flock_size: 1,
            start: [0.0, 0.0],
            end: [100.0, 100.0],
            start_jitter: 0.001,
            max_speed: 10.0,
            ..FlockConfig::default()
        }
    }

    #[test]
    fn lone_boid_converges_to_the_goal_and_reports_done() {
        let config = lone_boid_config();
        let mut flock = Flock::new(
            config,
            Vec::new(),
            single_node_arena([100.0, 100.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap();

        let summary = flock.run();
        assert_eq!(summary.completed, 1);
        assert!(
            summary.ticks_run < 100,
            "convergence took {} ticks",
            summary.ticks_run
        );
        let boid = &flock.boids()[0];
        assert!(boid.is_done());
        assert!(geometry::dist(boid.position(), [100.0, 100.0]) < 20.0);
    }

    #[test]
    fn run_stops_at_the_tick_budget_when_goals_are_unreachable() {
        // The only goal sits outside the reachable world rectangle, so the
        // agent can never enter its disc and never completes.
        let config = FlockConfig {
            flock_size: 2,
            start: [500.0, 300.0],
            end: [2000.0, 300.0],
            max_ticks: 50,
            ..FlockConfig::default()
        };
        let mut flock = Flock::new(
            config,
            Vec::new(),
            single_node_arena([2000.0, 300.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap();
        let summary = flock.run();
        assert_eq!(summary.ticks_run, 50);
        assert_eq!(summary.completed, 0);
        assert!(!flock.all_done());
    }

    #[test]
    fn construction_rejects_mismatched_end_point() {
        let config = FlockConfig {
            end: [900.0, 100.0],
            ..lone_boid_config()
        };
        let err = Flock::new(
            config,
            Vec::new(),
            single_node_arena([100.0, 100.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap_err();
        assert!(matches!(err, FlockInitError::DestinationMismatch { .. }));
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let config = FlockConfig {
            flock_size: 0,
            ..lone_boid_config()
        };
        let err = Flock::new(
            config,
            Vec::new(),
            single_node_arena([100.0, 100.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FlockInitError::Config(ConfigError::ZeroFlock)
        ));
    }

    #[test]
    fn spawn_positions_are_deterministic_per_seed() {
        let build = |seed: u64| {
            let config = FlockConfig {
                flock_size: 5,
                seed,
                ..lone_boid_config()
            };
            Flock::new(
                config,
                Vec::new(),
                single_node_arena([100.0, 100.0]),
                Box::new(NoRouteSolver),
            )
            .unwrap()
        };
        let a = build(7);
        let b = build(7);
        let c = build(8);
        for (x, y) in a.boids().iter().zip(b.boids()) {
            assert_eq!(x.position(), y.position());
        }
        assert!(a
            .boids()
            .iter()
            .zip(c.boids())
            .any(|(x, y)| x.position() != y.position()));
    }

    #[test]
    fn same_tick_updates_never_leak_between_agents() {
        // Mirror-symmetric scenario: both agents share the goal on the
        // symmetry axis. With the snapshot/commit protocol the pair stays
        // exactly mirror-symmetric tick after tick; sequential in-place
        // updates would let the second agent react to the first agent's
        // already-moved position and break the symmetry.
        let config = FlockConfig {
            flock_size: 2,
            start: [5.0, 0.0],
            end: [5.0, 200.0],
            ..lone_boid_config()
        };
        let mut flock = Flock::new(
            config,
            Vec::new(),
            single_node_arena([5.0, 200.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap();
        flock.boids[0].position = [0.0, 0.0];
        flock.boids[1].position = [10.0, 0.0];
        flock.boids[0].heading = [0.0, 10.0];
        flock.boids[1].heading = [0.0, 10.0];

        for _ in 0..5 {
            flock.step();
            let p0 = flock.boids()[0].position();
            let p1 = flock.boids()[1].position();
            assert!(
                ((p0[0] - 5.0) + (p1[0] - 5.0)).abs() < 1e-9,
                "mirror symmetry broken: {p0:?} vs {p1:?}"
            );
            assert!((p0[1] - p1[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn failed_replans_do_not_abort_the_tick() {
        // Both agents are forced stuck; the solver always fails. The tick
        // must still complete and leave both agents stuck but alive.
        let config = FlockConfig {
            flock_size: 2,
            start: [500.0, 300.0],
            end: [2000.0, 300.0],
            max_ticks: 30,
            ..FlockConfig::default()
        };
        let mut flock = Flock::new(
            config.clone(),
            Vec::new(),
            single_node_arena([2000.0, 300.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap();
        for boid in &mut flock.boids {
            boid.heading = [0.0, 0.0];
            for _ in 0..config.history_window {
                boid.update_history(&config);
            }
            assert!(boid.is_stuck());
        }
        let stats = flock.step();
        assert_eq!(stats.tick, 1);
        assert_eq!(stats.finished, 0);
        assert!(flock.boids().iter().all(|b| b.is_stuck()));
    }

    #[test]
    fn dynamic_obstacles_advance_with_the_tick() {
        let config = lone_boid_config();
        let obstacle = PolyObstacle::with_motion(
            vec![[400.0, 400.0], [420.0, 400.0], [420.0, 420.0], [400.0, 420.0]],
            [1.0, 0.0],
            50.0,
        )
        .unwrap();
        let mut flock = Flock::new(
            config,
            vec![obstacle],
            single_node_arena([100.0, 100.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap();
        let x_before = flock.obstacles()[0].vertices()[0][0];
        flock.step();
        let x_after = flock.obstacles()[0].vertices()[0][0];
        assert!((x_after - x_before - 1.0).abs() < 1e-12);
    }

    #[test]
    fn finished_count_is_monotone() {
        let config = FlockConfig {
            flock_size: 4,
            ..lone_boid_config()
        };
        let mut flock = Flock::new(
            config,
            Vec::new(),
            single_node_arena([100.0, 100.0]),
            Box::new(NoRouteSolver),
        )
        .unwrap();
        let mut previous = 0;
        for _ in 0..120 {
            let stats = flock.step();
            assert!(stats.finished >= previous);
            previous = stats.finished;
            if flock.all_done() {
                break;
            }
        }
        assert!(flock.all_done());
    }
}
