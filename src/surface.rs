//! The 2D immediate-mode drawing surface consumed by the shape renderer

use image::{Rgba, RgbaImage};

use crate::geometry::Point;

/// A destination rectangle in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A source rectangle in bitmap pixels.
/// May extend past the bitmap; implementations clip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[cfg(test)]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Drawing primitives a host renderer provides.
///
/// The current path is not part of the saved state: `restore` brings back
/// the clip region but leaves the path in place.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);

    /// Fill the current path
    fn fill(&mut self, color: Rgba<u8>);
    /// Stroke the current path
    fn stroke(&mut self, color: Rgba<u8>, line_width: f64);
    /// Intersect the clip region with the current path
    fn clip(&mut self);

    fn save(&mut self);
    fn restore(&mut self);

    /// Copy `src` out of `image`, scaled into `dst`
    fn draw_image(&mut self, image: &RgbaImage, src: PixelRect, dst: Rect);
}

/// Trace a polyline as the current path
pub fn trace_path(surface: &mut dyn Surface, points: &[Point]) {
    surface.begin_path();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        surface.move_to(*first);
    }
    for p in iter {
        surface.line_to(*p);
    }
}

#[cfg(test)]
pub use recording::{DrawCommand, RecordingSurface};
