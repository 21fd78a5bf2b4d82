//! Per-tick flock statistics exposed to the reporting collaborator.
//!
//! The core only aggregates; writing samples out (CSV or otherwise) is the
//! consumer's concern.

use crate::boid::Boid;
use crate::geometry;
use serde::{Deserialize, Serialize};

/// One sampled tick: completion/stuck counts plus the spread measures of
/// the flock (mean pairwise distance and mean nearest-peer distance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSample {
    pub tick: usize,
    pub finished: usize,
    pub stuck: usize,
    pub mean_peer_distance: f64,
    pub mean_nearest_peer_distance: f64,
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks_run: usize,
    pub flock_size: usize,
    pub completed: usize,
    pub samples: Vec<TickSample>,
}

/// Aggregate the current flock state into a sample. Spread measures are
/// zero for flocks of fewer than two agents.
pub fn collect_tick_sample(tick: usize, boids: &[Boid]) -> TickSample {
    let mut mean_sum = 0.0;
    let mut nearest_sum = 0.0;
    let mut counted = 0usize;
    for (i, a) in boids.iter().enumerate() {
        let mut total = 0.0;
        let mut nearest = f64::INFINITY;
        for (j, b) in boids.iter().enumerate() {
            if i == j {
                continue;
            }
            let d = geometry::dist(a.position(), b.position());
            total += d;
            nearest = nearest.min(d);
        }
        if boids.len() > 1 {
            mean_sum += total / (boids.len() - 1) as f64;
            nearest_sum += nearest;
            counted += 1;
        }
    }
    let (mean_peer_distance, mean_nearest_peer_distance) = if counted > 0 {
        (mean_sum / counted as f64, nearest_sum / counted as f64)
    } else {
        (0.0, 0.0)
    };
    TickSample {
        tick,
        finished: boids.iter().filter(|b| b.is_done()).count(),
        stuck: boids.iter().filter(|b| b.is_stuck()).count(),
        mean_peer_distance,
        mean_nearest_peer_distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlockConfig;
    use crate::roadmap::AgentRoadmap;
    use crate::testutil::single_node_arena;

    fn boid_at(id: usize, x: f64, y: f64) -> Boid {
        let config = FlockConfig::default();
        Boid::new(
            id,
            [x, y],
            AgentRoadmap::new(single_node_arena([500.0, 0.0])),
            &config,
        )
    }

    #[test]
    fn spread_measures_match_hand_computation() {
        // Collinear flock at x = 0, 3, 9.
        let boids = vec![boid_at(0, 0.0, 0.0), boid_at(1, 3.0, 0.0), boid_at(2, 9.0, 0.0)];
        let sample = collect_tick_sample(4, &boids);
        assert_eq!(sample.tick, 4);
        assert_eq!(sample.finished, 0);
        // Per-agent means: (3+9)/2 = 6, (3+6)/2 = 4.5, (9+6)/2 = 7.5.
        assert!((sample.mean_peer_distance - 6.0).abs() < 1e-12);
        // Nearest distances: 3, 3, 6.
        assert!((sample.mean_nearest_peer_distance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_flocks_report_zero_spread() {
        assert_eq!(collect_tick_sample(0, &[]).mean_peer_distance, 0.0);
        let lone = vec![boid_at(0, 5.0, 5.0)];
        let sample = collect_tick_sample(1, &lone);
        assert_eq!(sample.mean_peer_distance, 0.0);
        assert_eq!(sample.mean_nearest_peer_distance, 0.0);
    }

    #[test]
    fn summary_round_trips_through_json() {
        let boids = vec![boid_at(0, 0.0, 0.0), boid_at(1, 4.0, 0.0)];
        let summary = RunSummary {
            ticks_run: 10,
            flock_size: 2,
            completed: 1,
            samples: vec![collect_tick_sample(10, &boids)],
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
