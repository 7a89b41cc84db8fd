//! Screen-space and geographic primitives shared by the mapper

use serde::{Deserialize, Serialize};

/// A 2D point in screen (pixel) coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A geographic location in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Axis-aligned extent of a point set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Compute the bounding box of a point set, `None` when it is empty
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };

        Some(points.iter().fold(init, |bbox, p| Self {
            min_x: bbox.min_x.min(p.x),
            max_x: bbox.max_x.max(p.x),
            min_y: bbox.min_y.min(p.y),
            max_y: bbox.max_y.max(p.y),
        }))
    }

    /// Whether the point lies on one of the box extents.
    ///
    /// Uses exact comparison: the extents were taken from the same values,
    /// so projection rounding cannot separate a point from its own extent.
    #[inline]
    pub fn is_edge_point(&self, p: &Point) -> bool {
        p.x == self.min_x || p.x == self.max_x || p.y == self.min_y || p.y == self.max_y
    }
}

/// Linear interpolation between two points
#[inline]
pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

/// Euclidean distance between two points
#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Slope of the line through two points (infinite or NaN for vertical/coincident pairs)
#[inline]
pub fn slope(a: Point, b: Point) -> f64 {
    (a.y - b.y) / (a.x - b.x)
}
