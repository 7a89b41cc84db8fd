//! Raster drawing surface backed by an RGBA image
//!
//! Paths are rasterized into coverage masks with `imageproc`; fills, strokes
//! and image copies alpha-blend through the current clip mask.

use image::{GrayImage, ImageOutputFormat, Luma, Rgba, RgbaImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as IPoint;
use std::io::Cursor;

use crate::geometry::Point;
use crate::surface::{PixelRect, Rect, Surface};

const COVERED: Luma<u8> = Luma([255]);

/// Source-over composite of `src` onto `dst`, rounding to the nearest level.
/// An opaque destination stays opaque.
fn composite(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

pub struct Canvas {
    image: RgbaImage,
    /// Sub-paths of the current path
    path: Vec<Vec<Point>>,
    clip: Option<GrayImage>,
    saved: Vec<Option<GrayImage>>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, background),
            path: Vec::new(),
            clip: None,
            saved: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Encode the canvas as PNG
    pub fn encode_png(&self) -> anyhow::Result<Vec<u8>> {
        let mut png = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;
        Ok(png)
    }

    fn empty_mask(&self) -> GrayImage {
        GrayImage::new(self.image.width(), self.image.height())
    }

    /// Coverage of the current path's interior
    fn path_mask(&self) -> GrayImage {
        let mut mask = self.empty_mask();
        for sub_path in &self.path {
            let mut poly: Vec<IPoint<i32>> = Vec::with_capacity(sub_path.len());
            for p in sub_path {
                let q = IPoint::new(p.x.round() as i32, p.y.round() as i32);
                if poly.last() != Some(&q) {
                    poly.push(q);
                }
            }
            // The rasterizer closes the polygon itself and rejects an explicit closing point
            while poly.len() > 1 && poly.first() == poly.last() {
                poly.pop();
            }
            if poly.len() >= 2 {
                draw_polygon_mut(&mut mask, &poly, COVERED);
            }
        }
        mask
    }

    /// Coverage of the current path's outline at the given width
    fn stroke_mask(&self, line_width: f64) -> GrayImage {
        let mut mask = self.empty_mask();
        let half = (line_width / 2.0).max(0.0);
        let passes = (line_width * 2.0).ceil().max(1.0) as usize;

        for sub_path in &self.path {
            for seg in sub_path.windows(2) {
                let (a, b) = (seg[0], seg[1]);
                let len = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
                // Unit normal; a zero-length segment strokes as a single pass
                let (nx, ny) = if len > 0.0 {
                    (-(b.y - a.y) / len, (b.x - a.x) / len)
                } else {
                    (0.0, 0.0)
                };

                for i in 0..passes {
                    let offset = if passes > 1 {
                        -half + line_width * i as f64 / (passes - 1) as f64
                    } else {
                        0.0
                    };
                    draw_line_segment_mut(
                        &mut mask,
                        ((a.x + nx * offset) as f32, (a.y + ny * offset) as f32),
                        ((b.x + nx * offset) as f32, (b.y + ny * offset) as f32),
                        COVERED,
                    );
                }
            }
        }
        mask
    }

    #[inline]
    fn clip_allows(&self, x: u32, y: u32) -> bool {
        match &self.clip {
            Some(clip) => clip.get_pixel(x, y)[0] > 0,
            None => true,
        }
    }

    fn paint_mask(&mut self, mask: &GrayImage, color: Rgba<u8>) {
        for (x, y, coverage) in mask.enumerate_pixels() {
            if coverage[0] > 0 && self.clip_allows(x, y) {
                composite(self.image.get_pixel_mut(x, y), color);
            }
        }
    }
}

impl Surface for Canvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, p: Point) {
        self.path.push(vec![p]);
    }

    fn line_to(&mut self, p: Point) {
        match self.path.last_mut() {
            Some(sub_path) => sub_path.push(p),
            None => self.path.push(vec![p]),
        }
    }

    fn fill(&mut self, color: Rgba<u8>) {
        let mask = self.path_mask();
        self.paint_mask(&mask, color);
    }

    fn stroke(&mut self, color: Rgba<u8>, line_width: f64) {
        let mask = self.stroke_mask(line_width);
        self.paint_mask(&mask, color);
    }

    fn clip(&mut self) {
        let mut mask = self.path_mask();
        if let Some(current) = &self.clip {
            for (m, c) in mask.pixels_mut().zip(current.pixels()) {
                m[0] = m[0].min(c[0]);
            }
        }
        self.clip = Some(mask);
    }

    fn save(&mut self) {
        self.saved.push(self.clip.clone());
    }

    fn restore(&mut self) {
        if let Some(clip) = self.saved.pop() {
            self.clip = clip;
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, src: PixelRect, dst: Rect) {
        // Source rectangle clipped to the image
        let sx0 = src.x.min(image.width());
        let sy0 = src.y.min(image.height());
        let sx1 = src.x.saturating_add(src.width).min(image.width());
        let sy1 = src.y.saturating_add(src.height).min(image.height());
        if sx0 >= sx1 || sy0 >= sy1 || !(dst.width > 0.0) || !(dst.height > 0.0) {
            return;
        }

        // Scale as if the full requested source rect were present
        let scale_x = src.width as f64 / dst.width;
        let scale_y = src.height as f64 / dst.height;

        let px0 = dst.x.floor().max(0.0) as u32;
        let py0 = dst.y.floor().max(0.0) as u32;
        let px1 = (dst.x + dst.width).ceil().min(self.image.width() as f64).max(0.0) as u32;
        let py1 = (dst.y + dst.height).ceil().min(self.image.height() as f64).max(0.0) as u32;

        for py in py0..py1 {
            let fy = (py as f64 + 0.5 - dst.y) * scale_y;
            if fy < 0.0 {
                continue;
            }
            let sy = src.y as f64 + fy;
            if sy >= sy1 as f64 {
                continue;
            }
            let sy = sy as u32;

            for px in px0..px1 {
                let fx = (px as f64 + 0.5 - dst.x) * scale_x;
                if fx < 0.0 {
                    continue;
                }
                let sx = src.x as f64 + fx;
                if sx >= sx1 as f64 {
                    continue;
                }
                if !self.clip_allows(px, py) {
                    continue;
                }

                let texel = *image.get_pixel(sx as u32, sy);
                composite(self.image.get_pixel_mut(px, py), texel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::trace_path;

    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn square_path(canvas: &mut Canvas, x0: f64, y0: f64, x1: f64, y1: f64) {
        trace_path(canvas, &[p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1), p(x0, y0)]);
    }

    #[test]
    fn test_fill_closed_ring() {
        let mut canvas = Canvas::new(20, 20, CLEAR);
        square_path(&mut canvas, 2.0, 2.0, 10.0, 10.0);
        canvas.fill(RED);
        assert_eq!(*canvas.image().get_pixel(5, 5), RED);
        assert_eq!(*canvas.image().get_pixel(15, 15), CLEAR);
    }

    #[test]
    fn test_fill_blends_alpha() {
        let mut canvas = Canvas::new(4, 4, CLEAR);
        square_path(&mut canvas, 0.0, 0.0, 3.0, 3.0);
        canvas.fill(Rgba([255, 255, 255, 128]));
        let px = canvas.image().get_pixel(1, 1);
        assert!(px[0] > 100 && px[0] < 160);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_translucent_texel_keeps_destination_opaque() {
        let mut canvas = Canvas::new(2, 2, Rgba([0, 0, 255, 255]));
        let source = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 64]));
        canvas.draw_image(&source, PixelRect::new(0, 0, 1, 1), Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(*canvas.image().get_pixel(0, 0), Rgba([64, 0, 191, 255]));
    }

    #[test]
    fn test_composite_onto_transparent() {
        let mut dst = Rgba([0, 0, 0, 0]);
        composite(&mut dst, Rgba([200, 100, 50, 128]));
        assert_eq!(dst, Rgba([200, 100, 50, 128]));

        // Fully transparent source leaves the destination alone
        let mut dst = Rgba([1, 2, 3, 4]);
        composite(&mut dst, Rgba([255, 255, 255, 0]));
        assert_eq!(dst, Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn test_stroke_leaves_interior() {
        let mut canvas = Canvas::new(20, 20, CLEAR);
        square_path(&mut canvas, 2.0, 2.0, 16.0, 16.0);
        canvas.stroke(RED, 1.0);
        assert_eq!(*canvas.image().get_pixel(9, 2), RED);
        assert_eq!(*canvas.image().get_pixel(9, 9), CLEAR);
    }

    #[test]
    fn test_draw_image_scales() {
        let mut canvas = Canvas::new(8, 8, CLEAR);
        let mut source = RgbaImage::from_pixel(2, 2, BLUE);
        source.put_pixel(1, 0, RED);

        // One source pixel blown up to a 4x4 block
        canvas.draw_image(&source, PixelRect::new(1, 0, 1, 1), Rect::new(2.0, 2.0, 4.0, 4.0));
        assert_eq!(*canvas.image().get_pixel(2, 2), RED);
        assert_eq!(*canvas.image().get_pixel(5, 5), RED);
        assert_eq!(*canvas.image().get_pixel(6, 6), CLEAR);
        assert_eq!(*canvas.image().get_pixel(1, 1), CLEAR);
    }

    #[test]
    fn test_draw_image_clips_source_overhang() {
        let mut canvas = Canvas::new(8, 8, CLEAR);
        let source = RgbaImage::from_pixel(2, 2, BLUE);

        // Requested 2x2 source at (1,1) only has one real pixel
        canvas.draw_image(&source, PixelRect::new(1, 1, 2, 2), Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(*canvas.image().get_pixel(0, 0), BLUE);
        assert_eq!(*canvas.image().get_pixel(1, 1), BLUE);
        assert_eq!(*canvas.image().get_pixel(3, 3), CLEAR);
    }

    #[test]
    fn test_draw_image_offscreen_is_noop() {
        let mut canvas = Canvas::new(4, 4, CLEAR);
        let source = RgbaImage::from_pixel(2, 2, BLUE);
        canvas.draw_image(&source, PixelRect::new(0, 0, 2, 2), Rect::new(-10.0, -10.0, 3.0, 3.0));
        canvas.draw_image(&source, PixelRect::new(0, 0, 2, 2), Rect::new(10.0, 10.0, 3.0, 3.0));
        assert!(canvas.image().pixels().all(|px| *px == CLEAR));
    }

    #[test]
    fn test_clip_and_restore() {
        let mut canvas = Canvas::new(20, 20, CLEAR);
        let source = RgbaImage::from_pixel(1, 1, BLUE);

        canvas.save();
        square_path(&mut canvas, 0.0, 0.0, 8.0, 8.0);
        canvas.clip();
        canvas.draw_image(&source, PixelRect::new(0, 0, 1, 1), Rect::new(0.0, 0.0, 20.0, 20.0));
        assert_eq!(*canvas.image().get_pixel(4, 4), BLUE);
        assert_eq!(*canvas.image().get_pixel(15, 15), CLEAR);

        canvas.restore();
        canvas.draw_image(&source, PixelRect::new(0, 0, 1, 1), Rect::new(0.0, 0.0, 20.0, 20.0));
        assert_eq!(*canvas.image().get_pixel(15, 15), BLUE);
    }

    #[test]
    fn test_path_survives_restore() {
        let mut canvas = Canvas::new(20, 20, CLEAR);
        canvas.save();
        square_path(&mut canvas, 2.0, 2.0, 10.0, 10.0);
        canvas.clip();
        canvas.restore();
        canvas.fill(RED);
        assert_eq!(*canvas.image().get_pixel(5, 5), RED);
    }

    #[test]
    fn test_encode_png() {
        let canvas = Canvas::new(3, 3, RED);
        let png = canvas.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 3));
        assert_eq!(*decoded.get_pixel(1, 1), RED);
    }
}
