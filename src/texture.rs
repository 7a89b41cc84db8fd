//! Decoded source bitmaps assigned to shapes

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid data URL: {0}")]
    DataUrl(String),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image has zero width or height")]
    Empty,
}

/// A decoded RGBA bitmap.
///
/// Each texture gets a process-unique id; clones share the pixels and the id,
/// so caches keyed on the id see them as the same image.
#[derive(Debug, Clone)]
pub struct Texture {
    id: u64,
    image: Arc<RgbaImage>,
}

impl Texture {
    pub fn new(image: RgbaImage) -> Result<Self, TextureError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TextureError::Empty);
        }

        Ok(Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            image: Arc::new(image),
        })
    }

    /// Decode an encoded image (PNG, JPEG)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextureError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Self::new(image)
    }

    /// Load and decode an image file
    pub fn open(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path)?.to_rgba8();
        Self::new(image)
    }

    /// Decode a `data:<mime>;base64,<payload>` URL, as produced by a browser file reader
    pub fn from_data_url(url: &str) -> Result<Self, TextureError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| TextureError::DataUrl("missing data: prefix".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| TextureError::DataUrl("missing payload separator".to_string()))?;
        if !meta.ends_with(";base64") {
            return Err(TextureError::DataUrl("payload is not base64 encoded".to_string()));
        }

        let bytes = STANDARD.decode(payload.trim())?;
        Self::from_bytes(&bytes)
    }

    /// Two-colour checkerboard, `cell` pixels per square
    pub fn checkerboard(width: u32, height: u32, cell: u32, a: Rgba<u8>, b: Rgba<u8>) -> Result<Self, TextureError> {
        let cell = cell.max(1);
        let image = RgbaImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                a
            } else {
                b
            }
        });
        Self::new(image)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
