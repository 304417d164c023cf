//! Ring geometry for query polygons
//!
//! Query polygons arrive as an ordered ring of `(longitude, latitude)` pairs.
//! [`normalize_ring`] closes and validates the ring once; everything else in
//! the crate works on the resulting [`Ring`].
//!
//! Point-in-polygon membership is boundary-inclusive: a point lying exactly on
//! an edge or vertex counts as inside.

use crate::error::{Error, Result};
use geo::{Area, BoundingRect, Centroid};
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Distance (in coordinate units) under which a point is considered to lie on an edge.
const EDGE_EPSILON: f64 = 1e-12;

/// Rings whose points all lie within this fraction of their extent from one
/// line are treated as collapsed onto that line.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// A closed, validated polygon ring (first coordinate == last coordinate).
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    line: LineString<f64>,
}

impl Ring {
    /// Coordinates of the closed ring, including the repeated closing point
    pub fn coords(&self) -> &[Coord<f64>] {
        &self.line.0
    }

    /// Number of distinct vertices (closing point not counted)
    pub fn vertex_count(&self) -> usize {
        self.line.0.len() - 1
    }

    pub fn bounding_box(&self) -> BoundingBox {
        bounding_box(self)
    }

    /// Boundary-inclusive point-in-polygon test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        point_in_polygon((x, y), self)
    }

    /// Shoelace area in squared coordinate units (always positive)
    pub fn area(&self) -> f64 {
        self.to_polygon().unsigned_area()
    }

    /// Area-weighted centroid, falling back to the bounding-box centre when
    /// the ring has no usable area.
    pub fn centroid(&self) -> (f64, f64) {
        match self.to_polygon().centroid() {
            Some(p) if p.x().is_finite() && p.y().is_finite() => (p.x(), p.y()),
            _ => self.bounding_box().center(),
        }
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.line.clone(), vec![])
    }
}

/// Close an open ring and validate it.
///
/// Appends the first point when the ring is open. Fails with
/// [`Error::Geometry`] when a coordinate is not finite, when fewer than three
/// distinct points are supplied, or when the ring collapses onto a line.
/// Self-intersecting rings are accepted as-is.
pub fn normalize_ring(points: &[[f64; 2]]) -> Result<Ring> {
    if let Some(bad) = points.iter().find(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return Err(Error::Geometry(format!(
            "non-finite coordinate ({}, {})",
            bad[0], bad[1]
        )));
    }

    let mut distinct: Vec<(f64, f64)> = points.iter().map(|p| (p[0], p[1])).collect();
    distinct.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    distinct.dedup();
    if distinct.len() < 3 {
        return Err(Error::Geometry(format!(
            "ring needs at least 3 distinct points, got {}",
            distinct.len()
        )));
    }

    let mut coords: Vec<Coord<f64>> = points.iter().map(|p| Coord { x: p[0], y: p[1] }).collect();
    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }

    if is_collinear(&distinct) {
        return Err(Error::Geometry("ring collapses onto a line".into()));
    }

    Ok(Ring { line: LineString::new(coords) })
}

/// True when every point lies on the line through the first point and the
/// point farthest from it.
fn is_collinear(points: &[(f64, f64)]) -> bool {
    let (x0, y0) = points[0];
    let (fx, fy) = points
        .iter()
        .copied()
        .max_by(|a, b| {
            let da = (a.0 - x0).hypot(a.1 - y0);
            let db = (b.0 - x0).hypot(b.1 - y0);
            da.total_cmp(&db)
        })
        .unwrap_or((x0, y0));

    let (dx, dy) = (fx - x0, fy - y0);
    let extent = dx.hypot(dy);
    if extent == 0.0 {
        return true;
    }

    let max_offset = points
        .iter()
        .map(|&(x, y)| (dx * (y - y0) - dy * (x - x0)).abs() / extent)
        .fold(0.0, f64::max);
    max_offset <= extent * COLLINEAR_TOLERANCE
}

/// Bounding box of a ring as (min_x, min_y, max_x, max_y)
pub fn bounding_box(ring: &Ring) -> BoundingBox {
    match ring.line.bounding_rect() {
        Some(rect) => BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
        None => BoundingBox::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN),
    }
}

/// Even-odd ray-casting test. Points on an edge or vertex are inside.
pub fn point_in_polygon(point: (f64, f64), ring: &Ring) -> bool {
    let (x, y) = point;
    let coords = ring.coords();

    if coords.windows(2).any(|edge| on_segment(x, y, edge[0], edge[1])) {
        return true;
    }

    let mut inside = false;
    for edge in coords.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        if (a.y > y) != (b.y > y) {
            let x_cross = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_segment(x: f64, y: f64, a: Coord<f64>, b: Coord<f64>) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (x - a.x).hypot(y - a.y) <= EDGE_EPSILON;
    }

    let cross = dx * (y - a.y) - dy * (x - a.x);
    if cross.abs() / len > EDGE_EPSILON {
        return false;
    }

    let dot = (x - a.x) * dx + (y - a.y) * dy;
    dot >= -EDGE_EPSILON * len && dot <= len * len + EDGE_EPSILON * len
}
