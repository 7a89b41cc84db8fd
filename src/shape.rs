//! Surface shapes with optional texture mapping
//!
//! A shape holds a geographic boundary and draws it each frame as a flat
//! fill and/or outline. A shape built with a texture renderer can instead
//! fill its interior with a bitmap mapped onto the boundary's four corners.
//!
//! Texture mapping needs the boundary to describe a quadrilateral. Shapes
//! that cross the antimeridian or contain a pole always draw flat, texture
//! or not, and so does any boundary whose outline does not reduce to four
//! corners.
//!
//! The flat fill traces the projected ring as-is. Splitting rings at the
//! antimeridian belongs to the host's geometry pipeline, so with the stand-in
//! [`Projection`] such a shape fills the wrong side of the map.

use image::Rgba;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ShapeAttributes, ShapeConfig};
use crate::corners::{extract_corners, Corners};
use crate::geometry::{Location, Point};
use crate::mapper::{GridTextureMapper, RenderStats, TextureRenderer};
use crate::projection::{contains_pole, crosses_antimeridian, Projection};
use crate::scratch::ScratchBitmap;
use crate::surface::{trace_path, Surface};
use crate::texture::Texture;

static NEXT_STATE_ID: AtomicU64 = AtomicU64::new(1);

fn next_state_id() -> u64 {
    NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),
    #[error("invalid shape configuration: {0}")]
    InvalidConfig(String),
}

/// Per-frame context supplied by the host renderer
#[derive(Debug, Default)]
pub struct DrawContext {
    /// Draw pick colours instead of the visible appearance
    pub picking_mode: bool,
    next_pick_color: u32,
}

impl DrawContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn picking() -> Self {
        Self {
            picking_mode: true,
            next_pick_color: 0,
        }
    }

    /// A colour no other shape in this context has been given
    pub fn unique_pick_color(&mut self) -> Rgba<u8> {
        self.next_pick_color += 1;
        let [_, r, g, b] = self.next_pick_color.to_be_bytes();
        Rgba([r, g, b, 255])
    }
}

/// What a render call ended up drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderOutcome {
    /// Neither interior nor outline is enabled
    Skipped,
    /// Solid interior and/or outline
    Flat,
    /// Interior drawn from the texture
    Textured(RenderStats),
}

pub struct SurfaceShape {
    boundaries: Vec<Location>,
    attributes: ShapeAttributes,
    highlight_attributes: Option<ShapeAttributes>,
    highlighted: bool,
    interior_inhibited: bool,
    texture: Option<Texture>,
    config: ShapeConfig,
    renderer: Option<Box<dyn TextureRenderer>>,
    pick_color: Option<Rgba<u8>>,
    state_id: u64,
    state_key: Option<String>,
}

impl std::fmt::Debug for SurfaceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceShape")
            .field("boundaries", &self.boundaries.len())
            .field("texture", &self.texture.as_ref().map(|t| t.id()))
            .field("config", &self.config)
            .field("textured", &self.renderer.is_some())
            .field("state_id", &self.state_id)
            .finish()
    }
}

fn validate_boundaries(boundaries: &[Location]) -> Result<(), ShapeError> {
    if boundaries.len() < 3 {
        return Err(ShapeError::InvalidBoundary(format!(
            "expected at least 3 locations, got {}",
            boundaries.len()
        )));
    }
    if let Some(i) = boundaries.iter().position(|l| !l.is_finite()) {
        return Err(ShapeError::InvalidBoundary(format!(
            "location {} has non-finite coordinates",
            i
        )));
    }
    Ok(())
}

impl SurfaceShape {
    /// A shape without texture support; an assigned texture is kept but never drawn
    pub fn new(boundaries: Vec<Location>, attributes: ShapeAttributes) -> Result<Self, ShapeError> {
        validate_boundaries(&boundaries)?;
        Ok(Self {
            boundaries,
            attributes,
            highlight_attributes: None,
            highlighted: false,
            interior_inhibited: false,
            texture: None,
            config: ShapeConfig::default(),
            renderer: None,
            pick_color: None,
            state_id: next_state_id(),
            state_key: None,
        })
    }

    /// A shape that maps its texture with a `GridTextureMapper`
    pub fn textured(boundaries: Vec<Location>, attributes: ShapeAttributes) -> Result<Self, ShapeError> {
        Ok(Self::new(boundaries, attributes)?
            .with_renderer(Box::new(GridTextureMapper::new(ScratchBitmap::new()))))
    }

    pub fn with_renderer(mut self, renderer: Box<dyn TextureRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn boundaries(&self) -> &[Location] {
        &self.boundaries
    }

    pub fn set_boundaries(&mut self, boundaries: Vec<Location>) -> Result<(), ShapeError> {
        validate_boundaries(&boundaries)?;
        self.boundaries = boundaries;
        self.invalidate_state();
        Ok(())
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Assign or clear the texture. `None` makes the shape draw flat.
    pub fn set_texture(&mut self, texture: Option<Texture>) {
        self.texture = texture;
        self.invalidate_renderer();
        self.invalidate_state();
    }

    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ShapeConfig) -> Result<(), ShapeError> {
        config.validate().map_err(ShapeError::InvalidConfig)?;
        self.config = config;
        self.invalidate_renderer();
        self.invalidate_state();
        Ok(())
    }

    pub fn set_attributes(&mut self, attributes: ShapeAttributes) {
        self.attributes = attributes;
        self.invalidate_state();
    }

    pub fn set_highlight_attributes(&mut self, attributes: Option<ShapeAttributes>) {
        self.highlight_attributes = attributes;
        self.invalidate_state();
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
        self.invalidate_state();
    }

    pub fn set_interior_inhibited(&mut self, inhibited: bool) {
        self.interior_inhibited = inhibited;
        self.invalidate_state();
    }

    pub fn is_textured(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn pick_color(&self) -> Option<Rgba<u8>> {
        self.pick_color
    }

    /// Key that changes whenever anything affecting the drawn result changes
    pub fn state_key(&mut self) -> &str {
        let attributes = self.active_attributes();
        let highlighted = self.highlighted;
        let state_id = self.state_id;
        self.state_key.get_or_insert_with(|| {
            format!("{} hi {} pg {}", attributes.state_key(), highlighted as u8, state_id)
        })
    }

    fn invalidate_state(&mut self) {
        self.state_id = next_state_id();
        self.state_key = None;
    }

    fn invalidate_renderer(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.invalidate();
        }
    }

    fn active_attributes(&self) -> ShapeAttributes {
        if self.highlighted {
            self.highlight_attributes.unwrap_or(self.attributes)
        } else {
            self.attributes
        }
    }

    /// Corners the texture would be mapped onto under `projection`
    pub fn corners(&self, projection: &Projection) -> Corners {
        extract_corners(&projection.project_all(&self.boundaries))
    }

    /// Draw the shape for one frame
    pub fn render(&mut self, dc: &mut DrawContext, projection: &Projection, surface: &mut dyn Surface) -> RenderOutcome {
        let attributes = self.active_attributes();
        let draw_interior = !self.interior_inhibited && attributes.draw_interior;
        let draw_outline = attributes.strokes_outline();

        if !draw_interior && !draw_outline {
            return RenderOutcome::Skipped;
        }

        let pick_color = if dc.picking_mode {
            Some(*self.pick_color.get_or_insert_with(|| dc.unique_pick_color()))
        } else {
            None
        };
        let interior_color = pick_color.unwrap_or(attributes.interior_rgba());
        let outline_color = pick_color.unwrap_or(attributes.outline_rgba());

        let points = projection.project_all(&self.boundaries);
        trace_path(surface, &points);

        let mut outcome = RenderOutcome::Flat;
        if draw_interior {
            let textured = if dc.picking_mode || crosses_antimeridian(&self.boundaries) || contains_pole(&self.boundaries) {
                None
            } else {
                self.render_texture(surface, &points)
            };

            match textured {
                Some(stats) => outcome = RenderOutcome::Textured(stats),
                None => surface.fill(interior_color),
            }
        }

        if draw_outline {
            surface.stroke(outline_color, attributes.outline_width);
        }

        outcome
    }

    /// Clip to the current path and map the texture, if the shape has one
    /// and its outline resolves to four corners
    fn render_texture(&mut self, surface: &mut dyn Surface, points: &[Point]) -> Option<RenderStats> {
        let texture = self.texture.as_ref()?;
        let renderer = self.renderer.as_mut()?;

        let corners = extract_corners(points);
        if !corners.is_ordered() {
            warn!("Shape corners are ambiguous, texture placement may be wrong");
        }
        let Some(corners) = corners.usable() else {
            debug!("Shape outline is not a quadrilateral, drawing flat");
            return None;
        };

        surface.save();
        surface.clip();
        let stats = renderer.render_texture(surface, texture, &corners, &self.config);
        surface.restore();

        Some(stats)
    }
}
