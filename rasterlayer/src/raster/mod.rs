//! Raster rendering parameters and raster metadata.
//!
//! [`RasterParams`] captures everything that determines the pixels of a
//! rendered tile. Any change to it except opacity invalidates every cached
//! tile.

mod info;
mod params;

pub use info::{BandStats, RasterExtent, RasterInfo, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
pub use params::{BandSelection, ParamsError, RasterParams, ResamplingMethod};
