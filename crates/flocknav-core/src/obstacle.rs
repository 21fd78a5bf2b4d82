//! Polygonal obstacle engine: clearance, containment and crossing queries,
//! plus the oscillating translation applied to dynamic obstacles.

use crate::geometry::{self, Point};
use std::{error::Error, fmt};

/// Shift applied to a query ordinate that coincides exactly with a vertex
/// ordinate, so the containment ray never passes through a vertex.
const RAY_EPS: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub enum PolygonError {
    /// A polygon needs at least three vertices to bound an area.
    TooFewVertices { actual: usize },
}

impl fmt::Display for PolygonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolygonError::TooFewVertices { actual } => {
                write!(f, "polygon needs at least 3 vertices, got {actual}")
            }
        }
    }
}

impl Error for PolygonError {}

/// Back-and-forth translation descriptor for a dynamic obstacle.
#[derive(Debug, Clone)]
struct Motion {
    velocity: Point,
    displacement: f64,
    max_displacement: f64,
}

/// A simple (not necessarily convex) polygon, optionally translating back
/// and forth along a velocity vector.
///
/// The vertex list is treated as cyclic: the edge from the last vertex back
/// to the first is always included.
#[derive(Debug, Clone)]
pub struct PolyObstacle {
    vertices: Vec<Point>,
    motion: Option<Motion>,
}

impl PolyObstacle {
    /// A static polygon. Fails if fewer than three vertices are given.
    pub fn new(vertices: Vec<Point>) -> Result<Self, PolygonError> {
        if vertices.len() < 3 {
            return Err(PolygonError::TooFewVertices {
                actual: vertices.len(),
            });
        }
        Ok(Self {
            vertices,
            motion: None,
        })
    }

    /// A polygon that translates by `velocity` each tick, reversing
    /// direction once the accumulated displacement reaches
    /// `max_displacement`.
    pub fn with_motion(
        vertices: Vec<Point>,
        velocity: Point,
        max_displacement: f64,
    ) -> Result<Self, PolygonError> {
        let mut obstacle = Self::new(vertices)?;
        obstacle.motion = Some(Motion {
            velocity,
            displacement: 0.0,
            max_displacement,
        });
        Ok(obstacle)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn is_dynamic(&self) -> bool {
        self.motion.is_some()
    }

    /// Unit clearance value. Polygons always report 1; the slot exists so
    /// the potential formulas stay shape-agnostic.
    pub fn nominal_radius(&self) -> f64 {
        1.0
    }

    /// Closest point on the polygon boundary to `p`.
    ///
    /// Scans the cyclic edge list with a clamped point-to-segment
    /// projection; the first edge attaining the minimum distance wins ties.
    pub fn closest_boundary_point(&self, p: Point) -> Point {
        let mut best = self.vertices[0];
        let mut best_dist = f64::INFINITY;
        for (a, b) in self.edges() {
            let candidate = geometry::closest_point_on_segment(a, b, p);
            let d = geometry::dist(p, candidate);
            if d < best_dist {
                best_dist = d;
                best = candidate;
            }
        }
        best
    }

    /// Ray-casting parity test for containment.
    ///
    /// Casts a horizontal ray in +x and counts edge crossings with a
    /// half-open vertex convention (the smaller-y endpoint is inclusive,
    /// the larger exclusive), so a ray through a shared vertex is counted
    /// once. A query ordinate equal to any vertex ordinate is first nudged
    /// upward by a small epsilon to dodge the degenerate case entirely.
    pub fn contains_point(&self, p: Point) -> bool {
        let mut py = p[1];
        if self.vertices.iter().any(|v| v[1] == py) {
            py += RAY_EPS;
        }
        let px = p[0];
        let mut crossings = 0usize;
        for (a, b) in self.edges() {
            if (a[1] > py) != (b[1] > py) {
                let x_hit = a[0] + (py - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
                if x_hit > px {
                    crossings += 1;
                }
            }
        }
        crossings % 2 == 1
    }

    /// True when `p` keeps more than `agent_radius` of clearance from the
    /// boundary and is not inside the polygon. A point inside is always
    /// disallowed regardless of boundary distance.
    pub fn clearance_ok(&self, p: Point, agent_radius: f64) -> bool {
        geometry::dist(p, self.closest_boundary_point(p)) > agent_radius && !self.contains_point(p)
    }

    /// True when the segment `(a, b)` crosses any polygon edge.
    ///
    /// Per edge: axis-aligned bounding-box overlap prefilter, then an
    /// orientation-sign test (the segment endpoints lie strictly on
    /// opposite sides of the edge's supporting line).
    pub fn segment_crosses(&self, a: Point, b: Point) -> bool {
        self.edges().any(|(e0, e1)| {
            geometry::bounding_boxes_overlap(e0, e1, a, b)
                && geometry::orientation(e0, e1, a) * geometry::orientation(e0, e1, b) < 0.0
        })
    }

    /// Advance the obstacle by one tick. Static obstacles are unchanged.
    ///
    /// Translates every vertex by the velocity vector and accumulates the
    /// scalar step length; reaching the travel limit reverses the velocity
    /// and zeroes the accumulator, producing an oscillating sweep.
    pub fn advance(&mut self) {
        let Some(motion) = &mut self.motion else {
            return;
        };
        for v in &mut self.vertices {
            v[0] += motion.velocity[0];
            v[1] += motion.velocity[1];
        }
        motion.displacement += geometry::magnitude(motion.velocity);
        if motion.displacement >= motion.max_displacement {
            motion.velocity = [-motion.velocity[0], -motion.velocity[1]];
            motion.displacement = 0.0;
        }
    }

    fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}
