//! Degrees-per-tile footprint as a function of zoom.

/// Standard tile edge length in pixels.
pub const DEFAULT_TILE_SIZE_PX: u32 = 256;

/// Computes how many degrees one tile covers at a zoom level.
///
/// Closures `Fn(u8) -> f64` implement this trait, so tests and callers can
/// pass a footprint inline.
pub trait TileFootprint {
    /// Edge length of a square tile in degrees at `zoom`.
    fn degrees(&self, zoom: u8) -> f64;
}

impl<F> TileFootprint for F
where
    F: Fn(u8) -> f64,
{
    fn degrees(&self, zoom: u8) -> f64 {
        self(zoom)
    }
}

/// Web Mercator style footprint: the world is 360° wide at zoom 0 for a
/// 256 px tile and halves with every zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebMercatorFootprint {
    tile_size_px: u32,
}

impl WebMercatorFootprint {
    pub fn new(tile_size_px: u32) -> Self {
        Self { tile_size_px }
    }

    pub fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }
}

impl Default for WebMercatorFootprint {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE_PX)
    }
}

impl TileFootprint for WebMercatorFootprint {
    fn degrees(&self, zoom: u8) -> f64 {
        let scale = self.tile_size_px as f64 / DEFAULT_TILE_SIZE_PX as f64;
        360.0 * scale / 2.0_f64.powi(zoom as i32)
    }
}

/// The same footprint at every zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFootprint(pub f64);

impl TileFootprint for FixedFootprint {
    fn degrees(&self, _zoom: u8) -> f64 {
        self.0
    }
}
