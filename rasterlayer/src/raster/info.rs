//! Raster metadata returned by the backend when a raster is opened.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::params::{BandSelection, ResamplingMethod};
use crate::coord::GeoBounds;

/// Lowest zoom level a raster is rendered at unless the backend says otherwise.
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Highest zoom level a raster is rendered at unless the backend says otherwise.
pub const DEFAULT_MAX_ZOOM: u8 = 22;

/// Global min/max of one band, used by the backend for normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStats {
    pub min: f64,
    pub max: f64,
}

/// Response of `POST /load-raster-info`.
///
/// Only `bounds` and `count` are required; the remaining fields are filled
/// when the backend reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    /// Extent in `[[south, west], [north, east]]` form.
    pub bounds: GeoBounds,

    /// Number of bands in the raster.
    pub count: u32,

    /// Width in pixels after reprojection to geographic coordinates.
    #[serde(default)]
    pub width: Option<u32>,

    /// Height in pixels after reprojection to geographic coordinates.
    #[serde(default)]
    pub height: Option<u32>,

    /// Affine geotransform coefficients.
    #[serde(default)]
    pub transform: Option<Vec<f64>>,

    /// Per-band statistics keyed by 1-based band index.
    #[serde(default)]
    pub stats: BTreeMap<u32, BandStats>,

    /// Resampling methods the backend accepts.
    #[serde(default)]
    pub resampling_methods: Vec<String>,

    #[serde(default)]
    pub min_zoom: Option<u8>,

    #[serde(default)]
    pub max_zoom: Option<u8>,
}

impl RasterInfo {
    /// Create minimal metadata with only bounds and band count.
    pub fn new(bounds: GeoBounds, count: u32) -> Self {
        Self {
            bounds,
            count,
            width: None,
            height: None,
            transform: None,
            stats: BTreeMap::new(),
            resampling_methods: Vec::new(),
            min_zoom: None,
            max_zoom: None,
        }
    }

    /// The extent the planner tiles against.
    pub fn extent(&self) -> RasterExtent {
        RasterExtent::new(self.bounds, self.count).with_zoom_range(
            self.min_zoom.unwrap_or(DEFAULT_MIN_ZOOM),
            self.max_zoom.unwrap_or(DEFAULT_MAX_ZOOM),
        )
    }

    /// Band selection to use right after the raster is opened.
    pub fn default_bands(&self) -> BandSelection {
        BandSelection::default_for(self.count)
    }

    pub fn band_stats(&self, band: u32) -> Option<&BandStats> {
        self.stats.get(&band)
    }

    /// Resampling methods advertised by the backend that this crate knows.
    ///
    /// Falls back to every known method when the backend advertises none.
    pub fn supported_resampling(&self) -> Vec<ResamplingMethod> {
        if self.resampling_methods.is_empty() {
            return ResamplingMethod::ALL.to_vec();
        }
        self.resampling_methods
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }
}

/// Full footprint and native zoom range of the open raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterExtent {
    pub bounds: GeoBounds,
    pub band_count: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl RasterExtent {
    pub fn new(bounds: GeoBounds, band_count: u32) -> Self {
        Self {
            bounds,
            band_count,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }

    /// Set the native zoom range. A reversed range is swapped.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self
    }

    /// Clamp a map zoom level into the native range.
    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
