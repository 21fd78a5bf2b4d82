//! Per-tick spatial index over the frozen peer snapshot.
//!
//! Built once per tick and shared by every agent's repulsion query, so the
//! peer-influence-radius scan does not degrade to all-pairs work.

use crate::boid::PeerView;
use crate::geometry::Point;
use rstar::{RTree, RTreeObject, AABB};

/// Position-only entry so the tree never clones agent state.
#[derive(Clone, Debug)]
pub struct PeerLocation {
    pub index: usize,
    pub position: Point,
}

impl RTreeObject for PeerLocation {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Build an R*-tree over the snapshot via bulk load.
pub fn build_index(peers: &[PeerView]) -> RTree<PeerLocation> {
    let locations: Vec<PeerLocation> = peers
        .iter()
        .enumerate()
        .map(|(index, peer)| PeerLocation {
            index,
            position: peer.position,
        })
        .collect();
    RTree::bulk_load(locations)
}

/// Indices of peers strictly within `radius` of `center`, excluding
/// `self_index`. Sorted ascending so downstream float accumulation is
/// order-deterministic.
pub fn peers_within(
    tree: &RTree<PeerLocation>,
    center: Point,
    radius: f64,
    self_index: usize,
) -> Vec<usize> {
    let envelope = AABB::from_corners(
        [center[0] - radius, center[1] - radius],
        [center[0] + radius, center[1] + radius],
    );
    let r_sq = radius * radius;
    let mut found: Vec<usize> = tree
        .locate_in_envelope(&envelope)
        .filter(|loc| {
            if loc.index == self_index {
                return false;
            }
            let dx = loc.position[0] - center[0];
            let dy = loc.position[1] - center[1];
            dx * dx + dy * dy < r_sq
        })
        .map(|loc| loc.index)
        .collect();
    found.sort_unstable();
    found
}
