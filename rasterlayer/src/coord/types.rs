//! Coordinate error type, tile keys and the sampled viewport.

use std::fmt;

use thiserror::Error;

use super::GeoBounds;

/// Errors raised when constructing geographic bounds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// One of the four edges is NaN or infinite.
    #[error("Bounds contain a non-finite value: [[{south}, {west}], [{north}, {east}]]")]
    NonFinite {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    },

    /// South edge lies above the north edge.
    #[error("Invalid latitude range: south {south} > north {north}")]
    InvertedLatitude { south: f64, north: f64 },

    /// West edge lies east of the east edge (anti-meridian crossing).
    #[error("Invalid longitude range: west {west} > east {east} (anti-meridian crossing is unsupported)")]
    InvertedLongitude { west: f64, east: f64 },
}

/// Canonical identity of a tile region.
///
/// Built from the exact bit patterns of the four edges, so two numerically
/// equal bounds always produce the same key regardless of how the values
/// would be formatted. Negative zero is folded into positive zero.
///
/// # Example
///
/// ```
/// use rasterlayer::coord::GeoBounds;
///
/// let a = GeoBounds::new(4.5, -74.2, 4.55, -74.15).unwrap();
/// let b = GeoBounds::new(4.5, -74.2, 4.55, -74.15).unwrap();
/// assert_eq!(a.key(), b.key());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    bits: [u64; 4],
}

impl TileKey {
    pub(crate) fn from_bounds(bounds: &GeoBounds) -> Self {
        Self {
            bits: [
                canonical_bits(bounds.south),
                canonical_bits(bounds.west),
                canonical_bits(bounds.north),
                canonical_bits(bounds.east),
            ],
        }
    }

    /// Recover the bounds this key was derived from.
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds {
            south: f64::from_bits(self.bits[0]),
            west: f64::from_bits(self.bits[1]),
            north: f64::from_bits(self.bits[2]),
            east: f64::from_bits(self.bits[3]),
        }
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bounds();
        write!(f, "{},{},{},{}", b.south, b.west, b.north, b.east)
    }
}

/// The visible map region, sampled from the map on every relevant event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bounds: GeoBounds,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(bounds: GeoBounds, zoom: u8) -> Self {
        Self { bounds, zoom }
    }
}
