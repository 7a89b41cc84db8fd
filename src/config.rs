//! Configuration management for quadtex

use anyhow::{Context, Result};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::geometry::Location;
use crate::projection::Projection;

/// Grid subdivision and downsampling settings for a textured shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShapeConfig {
    /// Grid step in working-bitmap pixels.
    /// Lower values give smoother textures at the cost of more cells.
    #[serde(default = "default_step")]
    pub step: u32,
    /// Upper bound on the working bitmap size.
    /// Higher values give sharper textures at the cost of more cells.
    #[serde(default = "default_max_image_size")]
    pub max_image_width: u32,
    #[serde(default = "default_max_image_size")]
    pub max_image_height: u32,
}

fn default_step() -> u32 {
    1
}

fn default_max_image_size() -> u32 {
    64
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            max_image_width: default_max_image_size(),
            max_image_height: default_max_image_size(),
        }
    }
}

impl ShapeConfig {
    /// Check the invariants, returning a description of the first violation
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.step < 1 {
            return Err(format!("step must be at least 1, got {}", self.step));
        }
        if self.max_image_width == 0 || self.max_image_height == 0 {
            return Err(format!(
                "max image size must be positive, got {}x{}",
                self.max_image_width, self.max_image_height
            ));
        }
        Ok(())
    }

    /// Number of grid cells for a working bitmap of the given size
    pub fn cell_count(&self, width: u32, height: u32) -> u64 {
        let step = self.step.max(1);
        width.div_ceil(step) as u64 * height.div_ceil(step) as u64
    }
}

/// How a shape's interior and outline are drawn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ShapeAttributes {
    #[serde(default = "default_true")]
    pub draw_interior: bool,
    #[serde(default)]
    pub draw_outline: bool,
    /// RGBA
    #[serde(default = "default_interior_color")]
    pub interior_color: [u8; 4],
    /// RGBA
    #[serde(default = "default_outline_color")]
    pub outline_color: [u8; 4],
    #[serde(default = "default_outline_width")]
    pub outline_width: f64,
}

fn default_true() -> bool {
    true
}

fn default_interior_color() -> [u8; 4] {
    [0, 255, 255, 128]
}

fn default_outline_color() -> [u8; 4] {
    [255, 0, 0, 255]
}

fn default_outline_width() -> f64 {
    1.0
}

impl Default for ShapeAttributes {
    fn default() -> Self {
        Self {
            draw_interior: true,
            draw_outline: false,
            interior_color: default_interior_color(),
            outline_color: default_outline_color(),
            outline_width: default_outline_width(),
        }
    }
}

impl ShapeAttributes {
    pub fn interior_rgba(&self) -> Rgba<u8> {
        Rgba(self.interior_color)
    }

    pub fn outline_rgba(&self) -> Rgba<u8> {
        Rgba(self.outline_color)
    }

    /// Whether the outline would produce any pixels
    pub fn strokes_outline(&self) -> bool {
        self.draw_outline && self.outline_width > 0.0
    }

    /// Compact key describing these attributes, used in shape state keys
    pub fn state_key(&self) -> String {
        format!(
            "di {} do {} ic {:?} oc {:?} ow {}",
            self.draw_interior as u8,
            self.draw_outline as u8,
            self.interior_color,
            self.outline_color,
            self.outline_width
        )
    }
}

/// Shape section: the demo's boundary, texture source and settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeSection {
    /// Boundary as a closed ring of locations
    pub boundary: Vec<Location>,

    /// Image file to use as texture; a checkerboard is generated when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,

    #[serde(default)]
    pub mapping: ShapeConfig,

    #[serde(default)]
    pub attributes: ShapeAttributes,

    /// Attributes used while the shape is highlighted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<ShapeAttributes>,
}

impl Default for ShapeSection {
    fn default() -> Self {
        Self {
            boundary: vec![
                Location::new(50.895195, -4.086130),
                Location::new(51.297443, -0.455342),
                Location::new(49.682980, -0.068631),
                Location::new(49.282902, -3.575818),
                Location::new(50.895195, -4.086130),
            ],
            image: None,
            mapping: ShapeConfig::default(),
            attributes: ShapeAttributes::default(),
            highlight: None,
        }
    }
}

/// Output viewport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    /// RGBA clear colour
    #[serde(default = "default_background")]
    pub background: [u8; 4],
}

fn default_background() -> [u8; 4] {
    [16, 24, 48, 255]
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            background: default_background(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8092,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub viewport: ViewportConfig,

    #[serde(default)]
    pub projection: Projection,

    #[serde(default)]
    pub shape: ShapeSection,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
