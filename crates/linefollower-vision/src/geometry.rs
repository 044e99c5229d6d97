//! Convex hull and minimum-area enclosing rectangle.

use linefollower_types::vision::PixelPoint;

const SNAP_EPSILON: f64 = 1e-6;

/// Rotated rectangle in continuous image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: (f64, f64),
    /// Corners in order around the rectangle.
    pub corners: [(f64, f64); 4],
    pub width: f64,
    pub height: f64,
}

impl RotatedRect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Center with each axis truncated toward zero.
    pub fn center_point(&self) -> PixelPoint {
        PixelPoint::new(truncate(self.center.0), truncate(self.center.1))
    }

    /// Corners rounded to the nearest pixel.
    pub fn corner_points(&self) -> [PixelPoint; 4] {
        self.corners
            .map(|(x, y)| PixelPoint::new(x.round() as i32, y.round() as i32))
    }
}

/// Truncate toward zero, first snapping values within float noise of an integer.
fn truncate(value: f64) -> i32 {
    let nearest = value.round();
    if (value - nearest).abs() < SNAP_EPSILON {
        nearest as i32
    } else {
        value.trunc() as i32
    }
}

fn cross(o: (i64, i64), a: (i64, i64), b: (i64, i64)) -> i64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Convex hull by monotone chain; collinear points are dropped.
///
/// The hull starts at the smallest `(x, y)` point. Fewer than three distinct
/// input points are returned deduplicated and sorted.
pub fn convex_hull(mut points: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    points.sort_unstable();
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let mut hull: Vec<(i64, i64)> = Vec::with_capacity(points.len() * 2);
    for &p in &points {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Smallest-area rectangle enclosing `hull`, found with rotating calipers.
///
/// Each hull edge is tried as a rectangle side in hull order; on equal area
/// the earliest edge wins. Returns `None` for an empty hull.
pub fn min_area_rect(hull: &[(i64, i64)]) -> Option<RotatedRect> {
    match hull {
        [] => None,
        [only] => {
            let p = (only.0 as f64, only.1 as f64);
            Some(RotatedRect {
                center: p,
                corners: [p; 4],
                width: 0.0,
                height: 0.0,
            })
        }
        _ => {
            let mut best: Option<RotatedRect> = None;
            for i in 0..hull.len() {
                let a = hull[i];
                let b = hull[(i + 1) % hull.len()];
                let (dx, dy) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
                let length = dx.hypot(dy);
                if length == 0.0 {
                    continue;
                }
                let u = (dx / length, dy / length);
                let v = (-u.1, u.0);
                let candidate = enclose_along(hull, u, v);
                let better = best
                    .as_ref()
                    .map_or(true, |current| candidate.area() < current.area() - SNAP_EPSILON);
                if better {
                    best = Some(candidate);
                }
            }
            best
        }
    }
}

fn enclose_along(hull: &[(i64, i64)], u: (f64, f64), v: (f64, f64)) -> RotatedRect {
    let mut min_u = f64::INFINITY;
    let mut max_u = f64::NEG_INFINITY;
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for &(x, y) in hull {
        let (x, y) = (x as f64, y as f64);
        let pu = x * u.0 + y * u.1;
        let pv = x * v.0 + y * v.1;
        min_u = min_u.min(pu);
        max_u = max_u.max(pu);
        min_v = min_v.min(pv);
        max_v = max_v.max(pv);
    }

    let at = |a: f64, b: f64| (u.0 * a + v.0 * b, u.1 * a + v.1 * b);
    RotatedRect {
        center: at((min_u + max_u) / 2.0, (min_v + max_v) / 2.0),
        corners: [
            at(min_u, min_v),
            at(max_u, min_v),
            at(max_u, max_v),
            at(min_u, max_v),
        ],
        width: max_u - min_u,
        height: max_v - min_v,
    }
}
