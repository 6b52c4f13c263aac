//! Decoded tile bitmaps.

use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbaImage};

use super::error::FetchError;
use crate::coord::GeoBounds;

/// Prefix browsers expect in front of inline PNG payloads.
const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// A rendered tile ready to be placed on the map.
///
/// The bitmap is shared so overlays can hold it without copying pixels.
#[derive(Debug, Clone)]
pub struct TileImage {
    bounds: GeoBounds,
    zoom: u8,
    pixels: Arc<RgbaImage>,
}

impl TileImage {
    pub fn new(bounds: GeoBounds, zoom: u8, pixels: RgbaImage) -> Self {
        Self {
            bounds,
            zoom,
            pixels: Arc::new(pixels),
        }
    }

    /// Decode a base64 PNG payload as returned by the backend.
    pub fn from_base64_png(bounds: GeoBounds, zoom: u8, payload: &str) -> Result<Self, FetchError> {
        let payload = payload.trim();
        let payload = payload.strip_prefix(DATA_URL_PREFIX).unwrap_or(payload);
        let bytes = STANDARD.decode(payload)?;
        let pixels = image::load_from_memory(&bytes)?.to_rgba8();
        Ok(Self::new(bounds, zoom, pixels))
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Encode the bitmap as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Cursor::new(Vec::new());
        self.pixels.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// Encode the bitmap the way the backend sends it.
    pub fn encode_base64_png(&self) -> Result<String, image::ImageError> {
        Ok(STANDARD.encode(self.encode_png()?))
    }
}
