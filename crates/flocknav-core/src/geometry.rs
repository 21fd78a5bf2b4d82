//! Planar point/vector helpers shared by the obstacle engine and the
//! steering controller.
//!
//! Positions and displacements use the same representation. Every operation
//! here is total: zero-magnitude inputs never escape as a division by zero.

/// A 2-D point or displacement.
pub type Point = [f64; 2];

/// Euclidean distance between two points.
pub fn dist(a: Point, b: Point) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Net Manhattan displacement between two points.
pub fn manhattan(a: Point, b: Point) -> f64 {
    (a[0] - b[0]).abs() + (a[1] - b[1]).abs()
}

/// Vector magnitude.
pub fn magnitude(v: Point) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

pub fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1]]
}

pub fn add(a: Point, b: Point) -> Point {
    [a[0] + b[0], a[1] + b[1]]
}

pub fn scale(v: Point, s: f64) -> Point {
    [v[0] * s, v[1] * s]
}

/// Rescale `v` so its magnitude equals `speed`.
///
/// Returns `None` for a zero-length (or non-finite) input; callers treat
/// that as "no contribution" rather than propagating a degenerate division.
pub fn scale_to_speed(v: Point, speed: f64) -> Option<Point> {
    let mag = magnitude(v);
    if mag > 0.0 && mag.is_finite() {
        Some([v[0] * speed / mag, v[1] * speed / mag])
    } else {
        None
    }
}

/// Closest point to `p` on the segment `(a, b)`.
///
/// Clamped parametric projection: when the projection parameter falls
/// outside `[0, 1]` the nearer endpoint is returned. A degenerate segment
/// (`a == b`) yields `a`.
pub fn closest_point_on_segment(a: Point, b: Point, p: Point) -> Point {
    let ab = sub(b, a);
    let ab_len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    if ab_len_sq == 0.0 {
        return a;
    }
    let ap = sub(p, a);
    let t = ((ap[0] * ab[0] + ap[1] * ab[1]) / ab_len_sq).clamp(0.0, 1.0);
    [a[0] + ab[0] * t, a[1] + ab[1] * t]
}

/// Cross product of `(b - a)` and `(p - a)`; the sign gives which side of
/// the directed line `a -> b` the point `p` lies on.
pub fn orientation(a: Point, b: Point, p: Point) -> f64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Axis-aligned bounding boxes of segments `(a, b)` and `(c, d)` overlap.
pub fn bounding_boxes_overlap(a: Point, b: Point, c: Point, d: Point) -> bool {
    a[0].max(b[0]) >= c[0].min(d[0])
        && c[0].max(d[0]) >= a[0].min(b[0])
        && a[1].max(b[1]) >= c[1].min(d[1])
        && c[1].max(d[1]) >= a[1].min(b[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_to_speed_rescales_magnitude() {
        let v = scale_to_speed([3.0, 4.0], 10.0).unwrap();
        assert!((magnitude(v) - 10.0).abs() < 1e-12);
        assert!((v[0] - 6.0).abs() < 1e-12);
        assert!((v[1] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn scale_to_speed_rejects_zero_vector() {
        assert!(scale_to_speed([0.0, 0.0], 10.0).is_none());
    }

    #[test]
    fn closest_point_projects_onto_interior() {
        let p = closest_point_on_segment([0.0, 0.0], [10.0, 0.0], [4.0, 3.0]);
        assert!((p[0] - 4.0).abs() < 1e-12);
        assert!(p[1].abs() < 1e-12);
    }

    #[test]
    fn closest_point_clamps_to_endpoints() {
        let p = closest_point_on_segment([0.0, 0.0], [10.0, 0.0], [-5.0, 2.0]);
        assert_eq!(p, [0.0, 0.0]);
        let q = closest_point_on_segment([0.0, 0.0], [10.0, 0.0], [15.0, -2.0]);
        assert_eq!(q, [10.0, 0.0]);
    }

    #[test]
    fn closest_point_handles_degenerate_segment() {
        let p = closest_point_on_segment([2.0, 2.0], [2.0, 2.0], [5.0, 5.0]);
        assert_eq!(p, [2.0, 2.0]);
    }

    #[test]
    fn closest_point_never_beats_endpoints() {
        // The returned point must be at least as close as either endpoint.
        let cases = [
            ([0.0, 0.0], [7.0, 3.0], [2.0, -4.0]),
            ([-3.0, 1.0], [5.0, 9.0], [0.0, 0.0]),
            ([1.0, 1.0], [1.0, 8.0], [4.0, 4.0]),
        ];
        for (a, b, p) in cases {
            let c = closest_point_on_segment(a, b, p);
            assert!(dist(p, c) <= dist(p, a) + 1e-12);
            assert!(dist(p, c) <= dist(p, b) + 1e-12);
        }
    }

    #[test]
    fn orientation_sign_distinguishes_sides() {
        assert!(orientation([0.0, 0.0], [10.0, 0.0], [5.0, 1.0]) > 0.0);
        assert!(orientation([0.0, 0.0], [10.0, 0.0], [5.0, -1.0]) < 0.0);
        assert_eq!(orientation([0.0, 0.0], [10.0, 0.0], [5.0, 0.0]), 0.0);
    }
}
