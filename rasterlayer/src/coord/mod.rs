//! Geographic coordinate types.
//!
//! Everything here lives in a single, non-wrapping lat/lng frame (degrees).
//! Rasters that cross the anti-meridian or reach the poles are not supported:
//! bounds are plain axis-aligned rectangles with `south <= north` and
//! `west <= east`.

mod bounds;
mod types;

pub use bounds::GeoBounds;
pub use types::{CoordError, TileKey, Viewport};
