//! Planar helpers over lng/lat positions.
//!
//! Positions are GeoJSON ordered `[lng, lat]`. Distances are in degrees and
//! only meant for hit-testing at a single zoom level.

use crate::dataset::Coordinate;

/// Arithmetic mean of the coordinates; `None` for an empty ring.
pub fn centroid(ring: &[Coordinate]) -> Option<Coordinate> {
    let valid: Vec<&Coordinate> = ring.iter().filter(|c| c.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }
    let n = valid.len() as f64;
    let lat = valid.iter().map(|c| c.lat).sum::<f64>() / n;
    let lng = valid.iter().map(|c| c.lng).sum::<f64>() / n;
    Some(Coordinate::new(lat, lng))
}

/// Distinct vertices of a ring, dropping an explicit closing coordinate.
fn open_ring(ring: &[Coordinate]) -> &[Coordinate] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Closed polygon ring in GeoJSON positions, or `None` when the relation has
/// fewer than three vertices and cannot form an area.
pub fn closed_ring(ring: &[Coordinate]) -> Option<Vec<Vec<f64>>> {
    let open = open_ring(ring);
    if open.len() < 3 || open.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let mut positions: Vec<Vec<f64>> = open.iter().map(Coordinate::position).collect();
    positions.push(open[0].position());
    Some(positions)
}

/// Bounding box as `[min_lng, min_lat, max_lng, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn of_position(p: &[f64]) -> Self {
        Self {
            min_lng: p[0],
            min_lat: p[1],
            max_lng: p[0],
            max_lat: p[1],
        }
    }

    pub fn extend(&mut self, p: &[f64]) {
        self.min_lng = self.min_lng.min(p[0]);
        self.min_lat = self.min_lat.min(p[1]);
        self.max_lng = self.max_lng.max(p[0]);
        self.max_lat = self.max_lat.max(p[1]);
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.min_lng, self.min_lat, self.max_lng, self.max_lat]
    }
}

fn dist(a: &[f64], b: &[f64]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

pub fn point_distance(p: &[f64], q: &[f64]) -> f64 {
    dist(p, q)
}

/// Distance from `p` to the segment `a`-`b`.
pub fn segment_distance(p: &[f64], a: &[f64], b: &[f64]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return dist(p, a);
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0);
    dist(p, &[a[0] + t * dx, a[1] + t * dy])
}

pub fn polyline_distance(p: &[f64], line: &[Vec<f64>]) -> f64 {
    match line {
        [] => f64::INFINITY,
        [only] => dist(p, only),
        _ => line
            .windows(2)
            .map(|w| segment_distance(p, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Even-odd ray cast against a single ring.
pub fn point_in_ring(p: &[f64], ring: &[Vec<f64>]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        if (yi > p[1]) != (yj > p[1]) && p[0] < (xj - xi) * (p[1] - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
