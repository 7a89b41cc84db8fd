//! Corner detection for quadrilateral outlines
//!
//! Takes the unordered screen-space outline of a shape and picks the four
//! points that bound it, returned in top-left, top-right, bottom-right,
//! bottom-left order. When the orientation cannot be resolved the edge
//! points are handed back as-is so the caller can degrade instead of failing.

use tracing::warn;

use crate::geometry::{slope, BoundingBox, Point};

/// Four corners of a quadrilateral.
/// Order: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerSet(pub [Point; 4]);

impl CornerSet {
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self([top_left, top_right, bottom_right, bottom_left])
    }

    /// Wrap four points in whatever order they arrive in
    pub fn from_slice(points: &[Point]) -> Option<Self> {
        match points {
            [a, b, c, d] => Some(Self([*a, *b, *c, *d])),
            _ => None,
        }
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }
}

/// Result of corner extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Corners {
    /// Corners resolved and ordered
    Ordered(CornerSet),
    /// Orientation could not be resolved; these are the raw edge points
    Unresolved(Vec<Point>),
}

impl Corners {
    /// Corners usable for texture mapping.
    ///
    /// An unresolved result still maps when it holds exactly four points;
    /// the texture lands in whatever orientation those points describe.
    pub fn usable(&self) -> Option<CornerSet> {
        match self {
            Corners::Ordered(set) => Some(*set),
            Corners::Unresolved(points) => CornerSet::from_slice(points),
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, Corners::Ordered(_))
    }
}

/// Find the four corners of a quadrilateral outline.
///
/// `points` may be a closed ring (first point repeated at the end).
pub fn extract_corners(points: &[Point]) -> Corners {
    let Some(bbox) = BoundingBox::from_points(points) else {
        return Corners::Unresolved(Vec::new());
    };

    let mut edge_points: Vec<Point> = points
        .iter()
        .copied()
        .filter(|p| bbox.is_edge_point(p))
        .collect();

    // Closed ring: the closing point duplicates the first
    if edge_points.len() == 5 && edge_points[0] == edge_points[4] {
        edge_points.truncate(4);
    }

    if edge_points.len() > 4 {
        return axis_aligned_corners(&edge_points, &bbox)
            .map(Corners::Ordered)
            .unwrap_or(Corners::Unresolved(edge_points));
    }

    if edge_points.len() < 4 {
        warn!(
            "Outline has {} edge points, cannot treat it as a quadrilateral",
            edge_points.len()
        );
        return Corners::Unresolved(edge_points);
    }

    let top_left = top_left_of_diagonal(edge_points[0], edge_points[2])
        .or_else(|| top_left_of_diagonal(edge_points[1], edge_points[3]));

    let Some(top_left) = top_left else {
        warn!("Could not determine top left corner with the slope method");
        return Corners::Unresolved(edge_points);
    };

    // top_left was taken from edge_points, so the lookup always hits
    let start = edge_points
        .iter()
        .position(|p| p.x == top_left.x && p.y == top_left.y)
        .unwrap_or(0);
    edge_points.rotate_left(start);

    CornerSet::from_slice(&edge_points)
        .map(Corners::Ordered)
        .unwrap_or(Corners::Unresolved(edge_points))
}

/// Corner selection when more than four points sit on the box extents,
/// which happens when the quadrilateral edges run parallel to the axes
fn axis_aligned_corners(edge_points: &[Point], bbox: &BoundingBox) -> Option<CornerSet> {
    let left: Vec<Point> = edge_points.iter().copied().filter(|p| p.x == bbox.min_x).collect();
    let right: Vec<Point> = edge_points.iter().copied().filter(|p| p.x == bbox.max_x).collect();

    let (top_left, bottom_left) = top_bottom(&left)?;
    let (top_right, bottom_right) = top_bottom(&right)?;

    Some(CornerSet::new(top_left, top_right, bottom_right, bottom_left))
}

/// Topmost and bottommost points of a group; ties keep the earliest point
fn top_bottom(points: &[Point]) -> Option<(Point, Point)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(top, bottom), p| {
        let top = if p.y < top.y { *p } else { top };
        let bottom = if p.y > bottom.y { *p } else { bottom };
        (top, bottom)
    }))
}

/// The upper point of a diagonal whose slope is positive.
///
/// A non-positive (or undefined) slope does not identify the top-left corner.
fn top_left_of_diagonal(a: Point, b: Point) -> Option<Point> {
    let s = slope(a, b);
    if !(s > 0.0) {
        return None;
    }

    if a.y < b.y {
        Some(a)
    } else {
        Some(b)
    }
}
