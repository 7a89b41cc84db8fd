//! Geographic to screen projection and boundary topology tests
//!
//! Stands in for the host renderer's camera pipeline: an equirectangular
//! projection `x = lon * x_scale + dx`, `y = lat * y_scale + dy`.
//!
//! There is no ring splitting here. A ring crossing the antimeridian projects
//! as one polygon spanning the long way round the map, so filling it covers
//! the complement of the intended sliver.

use serde::{Deserialize, Serialize};

use crate::geometry::{Location, Point};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Projection {
    pub x_scale: f64,
    pub y_scale: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Default for Projection {
    /// Frames the default boundary (south-east England) in a 640x480 viewport
    fn default() -> Self {
        Self {
            x_scale: 100.0,
            y_scale: -100.0,
            dx: 500.0,
            dy: 5200.0,
        }
    }
}

impl Projection {
    #[inline]
    pub fn project(&self, location: &Location) -> Point {
        Point::new(
            location.longitude * self.x_scale + self.dx,
            location.latitude * self.y_scale + self.dy,
        )
    }

    pub fn project_all(&self, locations: &[Location]) -> Vec<Point> {
        locations.iter().map(|l| self.project(l)).collect()
    }
}

/// Whether any boundary segment jumps across the 180th meridian
pub fn crosses_antimeridian(boundary: &[Location]) -> bool {
    ring_segments(boundary).any(|(a, b)| (b.longitude - a.longitude).abs() > 180.0)
}

/// Whether the boundary ring encloses a pole.
///
/// Walking a ring around a pole accumulates a full turn of longitude;
/// any other ring nets out to zero.
pub fn contains_pole(boundary: &[Location]) -> bool {
    let winding: f64 = ring_segments(boundary)
        .map(|(a, b)| {
            let mut delta = b.longitude - a.longitude;
            if delta > 180.0 {
                delta -= 360.0;
            } else if delta < -180.0 {
                delta += 360.0;
            }
            delta
        })
        .sum();

    winding.abs() > 180.0
}

/// Consecutive segments of the boundary, closing the ring if it is open
fn ring_segments(boundary: &[Location]) -> impl Iterator<Item = (&Location, &Location)> {
    let closing = match (boundary.first(), boundary.last()) {
        (Some(first), Some(last)) if boundary.len() > 1 && first != last => Some((last, first)),
        _ => None,
    };

    boundary
        .windows(2)
        .map(|w| (&w[0], &w[1]))
        .chain(closing)
}
