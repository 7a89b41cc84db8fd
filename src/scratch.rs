//! Working bitmap for the grid mapper
//!
//! The mapper blits every grid cell out of a pre-shrunk copy of the texture.
//! `ScratchBitmap` owns that copy. It is handed to the mapper at construction
//! and lives as long as the mapper does:
//!
//! - `prepare` resizes the bitmap to the requested dimensions and resamples
//!   the texture into it, unless the same texture was already resampled at
//!   the same dimensions (the cache hit costs nothing).
//! - `invalidate` forgets the cached resample; the next `prepare` redoes it.
//!
//! Access is exclusive (`&mut self`), so one scratch bitmap serves one render
//! at a time. Give each thread its own mapper to render in parallel.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::texture::Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScratchKey {
    texture_id: u64,
    width: u32,
    height: u32,
}

#[derive(Debug)]
pub struct ScratchBitmap {
    image: RgbaImage,
    key: Option<ScratchKey>,
    filter: FilterType,
    resamples: u64,
}

impl Default for ScratchBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl ScratchBitmap {
    pub fn new() -> Self {
        Self::with_filter(FilterType::Triangle)
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self {
            image: RgbaImage::new(0, 0),
            key: None,
            filter,
            resamples: 0,
        }
    }

    /// Size the bitmap and fill it with `texture` scaled to fit.
    /// Returns the bitmap and whether a resample happened.
    pub fn prepare(&mut self, texture: &Texture, width: u32, height: u32) -> (&RgbaImage, bool) {
        let width = width.max(1);
        let height = height.max(1);
        let key = ScratchKey {
            texture_id: texture.id(),
            width,
            height,
        };

        if self.key == Some(key) {
            return (&self.image, false);
        }

        if (width, height) == texture.image().dimensions() {
            self.image.clone_from(texture.image());
        } else {
            self.image = imageops::resize(texture.image(), width, height, self.filter);
        }
        self.key = Some(key);
        self.resamples += 1;

        tracing::debug!(
            "Resampled texture {} ({}x{}) into {}x{} working bitmap",
            texture.id(),
            texture.width(),
            texture.height(),
            width,
            height
        );

        (&self.image, true)
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// Number of resamples performed over the bitmap's lifetime
    #[cfg(test)]
    pub fn resample_count(&self) -> u64 {
        self.resamples
    }

    #[cfg(test)]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
