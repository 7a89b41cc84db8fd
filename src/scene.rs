//! The demo scene: one textured shape drawn into a fixed viewport

use anyhow::{Context, Result};
use image::Rgba;
use serde::Deserialize;
use tracing::{debug, info};

use crate::canvas::Canvas;
use crate::config::{Config, ShapeAttributes, ShapeConfig, ViewportConfig};
use crate::corners::Corners;
use crate::geometry::Location;
use crate::projection::Projection;
use crate::shape::{DrawContext, RenderOutcome, ShapeError, SurfaceShape};
use crate::texture::Texture;

/// Texture used when no image is configured
pub fn default_texture() -> Result<Texture> {
    Texture::checkerboard(100, 100, 10, Rgba([32, 32, 32, 255]), Rgba([240, 240, 240, 255]))
        .context("Failed to build checkerboard texture")
}

/// Partial change to the shape; unset fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShapeUpdate {
    pub boundary: Option<Vec<Location>>,
    pub attributes: Option<ShapeAttributes>,
    pub highlighted: Option<bool>,
    pub interior_inhibited: Option<bool>,
}

pub struct Scene {
    shape: SurfaceShape,
    projection: Projection,
    viewport: ViewportConfig,
    /// Last assigned texture, restored when the texture is toggled back on
    remembered: Option<Texture>,
}

impl Scene {
    pub fn from_config(config: &Config, texture: Texture, show_texture: bool) -> Result<Self> {
        let mut shape = SurfaceShape::textured(config.shape.boundary.clone(), config.shape.attributes)
            .context("Invalid shape boundary in configuration")?;
        shape
            .set_config(config.shape.mapping)
            .context("Invalid shape mapping settings in configuration")?;
        shape.set_highlight_attributes(config.shape.highlight);
        if show_texture {
            shape.set_texture(Some(texture.clone()));
        }

        info!(
            "Scene: {} boundary points, texture {}x{}, step {}, max {}x{}",
            config.shape.boundary.len(),
            texture.width(),
            texture.height(),
            config.shape.mapping.step,
            config.shape.mapping.max_image_width,
            config.shape.mapping.max_image_height
        );

        Ok(Self {
            shape,
            projection: config.projection,
            viewport: config.viewport.clone(),
            remembered: Some(texture),
        })
    }

    pub fn viewport(&self) -> &ViewportConfig {
        &self.viewport
    }

    pub fn shape(&self) -> &SurfaceShape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut SurfaceShape {
        &mut self.shape
    }

    pub fn corners(&self) -> Corners {
        self.shape.corners(&self.projection)
    }

    pub fn has_texture(&self) -> bool {
        self.shape.texture().is_some()
    }

    /// Assign a new texture and remember it for toggling
    pub fn set_texture(&mut self, texture: Texture) {
        self.remembered = Some(texture.clone());
        self.shape.set_texture(Some(texture));
    }

    /// Hide the texture if shown, otherwise show the remembered one.
    /// Returns whether a texture is now shown.
    pub fn toggle_texture(&mut self) -> bool {
        if self.shape.texture().is_some() {
            self.shape.set_texture(None);
        } else {
            self.shape.set_texture(self.remembered.clone());
        }
        self.has_texture()
    }

    pub fn set_mapping(&mut self, mapping: ShapeConfig) -> Result<(), ShapeError> {
        self.shape.set_config(mapping)
    }

    pub fn boundary(&self) -> &[Location] {
        self.shape.boundaries()
    }

    /// Apply `update`. A rejected boundary leaves the shape untouched.
    pub fn update_shape(&mut self, update: ShapeUpdate) -> Result<(), ShapeError> {
        if let Some(boundary) = update.boundary {
            self.shape.set_boundaries(boundary)?;
        }
        if let Some(attributes) = update.attributes {
            self.shape.set_attributes(attributes);
        }
        if let Some(highlighted) = update.highlighted {
            self.shape.set_highlighted(highlighted);
        }
        if let Some(inhibited) = update.interior_inhibited {
            self.shape.set_interior_inhibited(inhibited);
        }
        Ok(())
    }

    /// Draw one frame
    pub fn render(&mut self) -> (Canvas, RenderOutcome) {
        let mut canvas = Canvas::new(
            self.viewport.width,
            self.viewport.height,
            Rgba(self.viewport.background),
        );
        let mut dc = DrawContext::new();
        let outcome = self.shape.render(&mut dc, &self.projection, &mut canvas);
        debug!("Rendered frame: {:?}", outcome);
        (canvas, outcome)
    }

    /// Draw one frame in picking mode, where the shape is filled with its
    /// pick colour on a transparent background
    pub fn render_picking(&mut self) -> (Canvas, Option<Rgba<u8>>) {
        let mut canvas = Canvas::new(self.viewport.width, self.viewport.height, Rgba([0, 0, 0, 0]));
        let mut dc = DrawContext::picking();
        let outcome = self.shape.render(&mut dc, &self.projection, &mut canvas);
        let pick_color = self.shape.pick_color();
        debug!("Rendered pick frame: {:?}, pick colour {:?}", outcome, pick_color);
        (canvas, pick_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(show: bool) -> Scene {
        Scene::from_config(&Config::default(), default_texture().unwrap(), show).unwrap()
    }

    #[test]
    fn test_render_textured() {
        let mut scene = scene(true);
        let (canvas, outcome) = scene.render();
        assert_eq!(canvas.image().dimensions(), (640, 480));
        match outcome {
            RenderOutcome::Textured(stats) => assert_eq!(stats.blits, 4096),
            other => panic!("expected textured render, got {:?}", other),
        }
    }

    #[test]
    fn test_texture_pixels_land_inside_shape() {
        let mut scene = scene(true);
        let (canvas, _) = scene.render();
        let background = Rgba(scene.viewport().background);

        // Centre of the projected quad is covered, far corner is not
        assert_ne!(*canvas.image().get_pixel(290, 170), background);
        assert_eq!(*canvas.image().get_pixel(630, 470), background);
    }

    #[test]
    fn test_toggle() {
        let mut scene = scene(false);
        assert!(!scene.has_texture());
        assert_eq!(scene.render().1, RenderOutcome::Flat);

        assert!(scene.toggle_texture());
        assert!(matches!(scene.render().1, RenderOutcome::Textured(_)));

        assert!(!scene.toggle_texture());
        assert_eq!(scene.render().1, RenderOutcome::Flat);
    }

    #[test]
    fn test_set_texture_is_remembered() {
        let mut scene = scene(true);
        let tex = Texture::checkerboard(8, 8, 2, Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255])).unwrap();
        let id = tex.id();
        scene.set_texture(tex);
        scene.toggle_texture();
        scene.toggle_texture();
        assert_eq!(scene.shape().texture().map(|t| t.id()), Some(id));
    }

    #[test]
    fn test_set_mapping_rejects_invalid() {
        let mut scene = scene(true);
        let bad = ShapeConfig {
            step: 1,
            max_image_width: 0,
            max_image_height: 64,
        };
        assert!(scene.set_mapping(bad).is_err());
    }

    #[test]
    fn test_picking_frame_uses_pick_color() {
        let mut scene = scene(true);
        let (canvas, pick) = scene.render_picking();
        let pick = pick.unwrap();
        assert_eq!(*canvas.image().get_pixel(290, 170), pick);
        assert_eq!(*canvas.image().get_pixel(630, 470), Rgba([0, 0, 0, 0]));

        // Picking does not disturb the visible frame
        assert!(matches!(scene.render().1, RenderOutcome::Textured(_)));
    }

    #[test]
    fn test_update_shape() {
        let mut scene = scene(true);
        let key = scene.shape_mut().state_key().to_string();

        scene
            .update_shape(ShapeUpdate {
                interior_inhibited: Some(true),
                attributes: Some(ShapeAttributes {
                    draw_outline: true,
                    ..ShapeAttributes::default()
                }),
                ..ShapeUpdate::default()
            })
            .unwrap();
        assert_ne!(scene.shape_mut().state_key(), key);
        assert_eq!(scene.render().1, RenderOutcome::Flat);

        scene
            .update_shape(ShapeUpdate {
                interior_inhibited: Some(false),
                ..ShapeUpdate::default()
            })
            .unwrap();
        assert!(matches!(scene.render().1, RenderOutcome::Textured(_)));
    }

    #[test]
    fn test_update_shape_rejects_bad_boundary() {
        let mut scene = scene(true);
        let before = scene.boundary().to_vec();
        let err = scene
            .update_shape(ShapeUpdate {
                boundary: Some(vec![Location::new(0.0, 0.0)]),
                highlighted: Some(true),
                ..ShapeUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, ShapeError::InvalidBoundary(_)));
        assert_eq!(scene.boundary(), before.as_slice());
    }

    #[test]
    fn test_highlight_from_config() {
        let mut config = Config::default();
        config.shape.highlight = Some(ShapeAttributes {
            draw_interior: false,
            draw_outline: true,
            ..ShapeAttributes::default()
        });
        let mut scene = Scene::from_config(&config, default_texture().unwrap(), true).unwrap();
        scene
            .update_shape(ShapeUpdate {
                highlighted: Some(true),
                ..ShapeUpdate::default()
            })
            .unwrap();
        assert_eq!(scene.render().1, RenderOutcome::Flat);
    }
}
