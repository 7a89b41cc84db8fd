//! Grid texture mapping onto screen-space quadrilaterals
//!
//! Approximates a projective texture map without a homography: the
//! quadrilateral is split into a grid of small cells by bilinear
//! interpolation of its corners, and each cell receives a scaled,
//! axis-aligned copy of the matching slice of a downsampled texture.
//!
//! Known approximations:
//! - the texture's horizontal axis is chosen by comparing the raw x and y
//!   deltas of the first edge, which can pick the wrong axis for quads
//!   rotated close to 45 degrees;
//! - cells are axis-aligned rectangles, so strongly sheared quads show
//!   stair-stepping at small grid sizes.

use tracing::debug;

use crate::config::ShapeConfig;
use crate::corners::CornerSet;
use crate::geometry::{distance, lerp, Point};
use crate::scratch::ScratchBitmap;
use crate::surface::{PixelRect, Rect, Surface};
use crate::texture::Texture;

/// Counters from one texture render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Grid cells visited
    pub cells: u32,
    /// Cells copied to the surface
    pub blits: u32,
    /// Cells skipped because they fall outside the viewport
    pub culled: u32,
    /// Whether the working bitmap was resampled for this render
    pub resampled: bool,
    /// Working bitmap dimensions
    pub working_width: u32,
    pub working_height: u32,
}

/// A capability a shape can carry to draw its texture
pub trait TextureRenderer: Send {
    /// Map `texture` onto `corners`, drawing into `surface`
    fn render_texture(
        &mut self,
        surface: &mut dyn Surface,
        texture: &Texture,
        corners: &CornerSet,
        config: &ShapeConfig,
    ) -> RenderStats;

    /// Drop anything cached from earlier renders
    fn invalidate(&mut self);
}

/// Working-bitmap dimensions along the quad's two axes.
///
/// Whichever of the first edge's |dx| and |dy| is larger decides whether
/// the edge corner0-corner1 or corner0-corner3 is the horizontal axis.
pub fn axis_dimensions(corners: &CornerSet) -> (f64, f64) {
    let [c0, c1, _, c3] = *corners.points();
    let dx = (c0.x - c1.x).abs();
    let dy = (c0.y - c1.y).abs();

    if dx > dy {
        (distance(c0, c1), distance(c0, c3))
    } else {
        (distance(c0, c3), distance(c0, c1))
    }
}

/// Whether a destination rectangle may touch the viewport.
///
/// The bottom bound is exclusive while the right bound is inclusive.
#[inline]
pub fn is_rect_inside_viewport(origin: Point, width: f64, height: f64, viewport_width: f64, viewport_height: f64) -> bool {
    origin.x + width >= 0.0
        && origin.x <= viewport_width
        && origin.y + height >= 0.0
        && origin.y < viewport_height
}

/// Clamp a float dimension into a working bitmap size
fn working_size(dist: f64, max: u32) -> u32 {
    let size = dist.min(max as f64).floor();
    if size >= 1.0 {
        size as u32
    } else {
        1
    }
}

/// Maps textures by grid subdivision, blitting from an owned working bitmap
#[derive(Debug, Default)]
pub struct GridTextureMapper {
    scratch: ScratchBitmap,
}

impl GridTextureMapper {
    pub fn new(scratch: ScratchBitmap) -> Self {
        Self { scratch }
    }

    #[cfg(test)]
    pub fn scratch(&self) -> &ScratchBitmap {
        &self.scratch
    }

    /// Map `texture` onto the quadrilateral `corners`.
    ///
    /// Cells whose destination rectangle misses the
    /// `viewport_width` x `viewport_height` viewport are skipped.
    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        texture: &Texture,
        corners: &CornerSet,
        config: &ShapeConfig,
        viewport_width: u32,
        viewport_height: u32,
    ) -> RenderStats {
        let (dist_x, dist_y) = axis_dimensions(corners);
        let width = working_size(dist_x, config.max_image_width);
        let height = working_size(dist_y, config.max_image_height);
        let step = config.step.max(1);

        let (working, resampled) = self.scratch.prepare(texture, width, height);

        let mut stats = RenderStats {
            resampled,
            working_width: width,
            working_height: height,
            ..Default::default()
        };

        let [c0, c1, c2, c3] = *corners.points();
        let (w, h) = (width as f64, height as f64);
        let s = step as f64;
        let (vw, vh) = (viewport_width as f64, viewport_height as f64);

        for y in (0..height).step_by(step as usize) {
            let t0 = y as f64 / h;
            let t1 = (y as f64 + s) / h;
            let left_current = lerp(c0, c3, t0);
            let right_current = lerp(c1, c2, t0);
            let left_next = lerp(c0, c3, t1);
            let right_next = lerp(c1, c2, t1);

            for x in (0..width).step_by(step as usize) {
                let u0 = x as f64 / w;
                let u1 = (x as f64 + s) / w;
                let top_left = lerp(left_current, right_current, u0);
                let top_right = lerp(left_current, right_current, u1);
                let bottom_right = lerp(left_next, right_next, u1);
                let bottom_left = lerp(left_next, right_next, u0);

                // Over-estimate by a pixel so neighbouring cells overlap
                let dest_width = s
                    .max((top_right.x - top_left.x).abs())
                    .max((bottom_left.x - bottom_right.x).abs())
                    .ceil()
                    + 1.0;
                let dest_height = s
                    .max((top_left.y - bottom_left.y).abs())
                    .max((top_right.y - bottom_right.y).abs())
                    .ceil()
                    + 1.0;

                stats.cells += 1;
                if !is_rect_inside_viewport(top_left, dest_width, dest_height, vw, vh) {
                    stats.culled += 1;
                    continue;
                }

                surface.draw_image(
                    working,
                    PixelRect::new(x, y, step, step),
                    Rect::new(top_left.x, top_left.y, dest_width, dest_height),
                );
                stats.blits += 1;
            }
        }

        debug_assert_eq!(stats.cells as u64, config.cell_count(width, height));
        debug!(
            "Mapped texture {} over {}x{} grid: {} cells, {} blits, {} culled",
            texture.id(),
            width,
            height,
            stats.cells,
            stats.blits,
            stats.culled
        );

        stats
    }
}

impl TextureRenderer for GridTextureMapper {
    fn render_texture(
        &mut self,
        surface: &mut dyn Surface,
        texture: &Texture,
        corners: &CornerSet,
        config: &ShapeConfig,
    ) -> RenderStats {
        let (vw, vh) = (surface.width(), surface.height());
        self.render(surface, texture, corners, config, vw, vh)
    }

    fn invalidate(&mut self) {
        self.scratch.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;
    use image::Rgba;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn checkerboard(size: u32) -> Texture {
        Texture::checkerboard(size, size, 10, Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255])).unwrap()
    }

    fn square(origin: f64, size: f64) -> CornerSet {
        CornerSet::new(
            p(origin, origin),
            p(origin + size, origin),
            p(origin + size, origin + size),
            p(origin, origin + size),
        )
    }

    fn config(step: u32, max_w: u32, max_h: u32) -> ShapeConfig {
        ShapeConfig {
            step,
            max_image_width: max_w,
            max_image_height: max_h,
        }
    }

    #[test]
    fn test_four_by_four_grid() {
        let mut mapper = GridTextureMapper::default();
        let mut surface = RecordingSurface::new(4, 4);
        let stats = mapper.render_texture(&mut surface, &checkerboard(100), &square(0.0, 4.0), &config(1, 4, 4));

        let blits = surface.blits();
        assert_eq!(blits.len(), 16);
        assert_eq!(stats.blits, 16);
        assert_eq!(stats.cells, 16);
        assert!(blits.iter().all(|(src, _)| src.area() == 1));
        assert_eq!(blits[0].0, PixelRect::new(0, 0, 1, 1));
        assert_eq!(blits[0].1, Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(blits[5].0, PixelRect::new(1, 1, 1, 1));
        assert_eq!(blits[5].1, Rect::new(1.0, 1.0, 2.0, 2.0));
    }

    #[test]
    fn test_cell_count_follows_step() {
        let mut mapper = GridTextureMapper::default();
        let mut surface = RecordingSurface::new(200, 200);
        let stats = mapper.render_texture(&mut surface, &checkerboard(100), &square(10.0, 100.0), &config(3, 10, 10));
        // ceil(10 / 3) squared
        assert_eq!(stats.cells, 16);
        assert_eq!(stats.blits, 16);
    }

    #[test]
    fn test_working_size_limited_by_quad() {
        let mut mapper = GridTextureMapper::default();
        let mut surface = RecordingSurface::new(100, 100);
        let corners = CornerSet::new(p(0.0, 0.0), p(20.5, 0.0), p(20.5, 8.0), p(0.0, 8.0));
        let stats = mapper.render_texture(&mut surface, &checkerboard(100), &corners, &config(1, 64, 64));
        assert_eq!((stats.working_width, stats.working_height), (20, 8));
        assert_eq!(mapper.scratch().dimensions(), (20, 8));
    }

    #[test]
    fn test_axis_selection() {
        // Wide edge first: corner0-corner1 is the horizontal axis
        assert_eq!(axis_dimensions(&square(0.0, 4.0)), (4.0, 4.0));
        let wide = CornerSet::new(p(0.0, 0.0), p(30.0, 0.0), p(30.0, 10.0), p(0.0, 10.0));
        assert_eq!(axis_dimensions(&wide), (30.0, 10.0));

        // Corners listed starting down the left edge: axes swap
        let tall_first = CornerSet::new(p(0.0, 0.0), p(0.0, 10.0), p(30.0, 10.0), p(30.0, 0.0));
        assert_eq!(axis_dimensions(&tall_first), (30.0, 10.0));
    }

    #[test]
    fn test_viewport_bounds_are_asymmetric() {
        // Right edge inclusive, bottom edge exclusive
        assert!(is_rect_inside_viewport(p(100.0, 50.0), 2.0, 2.0, 100.0, 100.0));
        assert!(!is_rect_inside_viewport(p(50.0, 100.0), 2.0, 2.0, 100.0, 100.0));
        assert!(is_rect_inside_viewport(p(-2.0, -2.0), 2.0, 2.0, 100.0, 100.0));
        assert!(!is_rect_inside_viewport(p(-2.5, 10.0), 2.0, 2.0, 100.0, 100.0));
    }

    #[test]
    fn test_offscreen_cells_are_culled() {
        let mut mapper = GridTextureMapper::default();
        let mut surface = RecordingSurface::new(40, 40);
        let corners = CornerSet::new(p(-100.0, -100.0), p(50.0, -100.0), p(50.0, 50.0), p(-100.0, 50.0));
        let stats = mapper.render_texture(&mut surface, &checkerboard(100), &corners, &config(1, 10, 10));

        assert_eq!(stats.cells, 100);
        assert!(stats.culled > 0);
        assert_eq!(stats.blits + stats.culled, stats.cells);

        let blits = surface.blits();
        assert_eq!(blits.len() as u32, stats.blits);
        for (_, dst) in blits {
            assert!(dst.x + dst.width >= 0.0 && dst.x <= 40.0);
            assert!(dst.y + dst.height >= 0.0 && dst.y < 40.0);
        }
    }

    #[test]
    fn test_fully_offscreen_quad_issues_no_blits() {
        let mut mapper = GridTextureMapper::default();
        let mut surface = RecordingSurface::new(40, 40);
        let stats = mapper.render_texture(&mut surface, &checkerboard(16), &square(500.0, 50.0), &config(1, 8, 8));
        assert_eq!(stats.blits, 0);
        assert_eq!(stats.culled, 64);
        assert!(surface.blits().is_empty());
    }

    #[test]
    fn test_repeat_render_is_identical() {
        let mut mapper = GridTextureMapper::default();
        let tex = checkerboard(100);
        let corners = CornerSet::new(p(12.3, 20.1), p(140.7, 5.2), p(150.9, 99.4), p(20.6, 110.8));
        let cfg = config(2, 32, 32);

        let mut first = RecordingSurface::new(200, 200);
        let stats_a = mapper.render_texture(&mut first, &tex, &corners, &cfg);
        let mut second = RecordingSurface::new(200, 200);
        let stats_b = mapper.render_texture(&mut second, &tex, &corners, &cfg);

        assert!(stats_a.resampled);
        assert!(!stats_b.resampled);
        assert_eq!(first.commands, second.commands);
        assert_eq!(mapper.scratch().resample_count(), 1);
    }

    #[test]
    fn test_invalidate_forces_resample() {
        let mut mapper = GridTextureMapper::default();
        let tex = checkerboard(100);
        let mut surface = RecordingSurface::new(50, 50);
        mapper.render_texture(&mut surface, &tex, &square(0.0, 40.0), &config(4, 16, 16));
        mapper.invalidate();
        let stats = mapper.render_texture(&mut surface, &tex, &square(0.0, 40.0), &config(4, 16, 16));
        assert!(stats.resampled);
        assert_eq!(mapper.scratch().resample_count(), 2);
    }

    #[test]
    fn test_degenerate_quad_renders_one_cell() {
        let mut mapper = GridTextureMapper::default();
        let mut surface = RecordingSurface::new(50, 50);
        let point = p(10.0, 10.0);
        let corners = CornerSet::new(point, point, point, point);
        let stats = mapper.render_texture(&mut surface, &checkerboard(8), &corners, &config(1, 64, 64));
        assert_eq!((stats.working_width, stats.working_height), (1, 1));
        assert_eq!(stats.blits, 1);
    }
}
