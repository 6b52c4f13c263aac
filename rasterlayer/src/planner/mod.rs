//! Tile request planning.
//!
//! The planner turns the current viewport into the ordered list of tile
//! rectangles that should be on screen. It is a pure function of its inputs:
//! the same viewport, extent and footprint always yield the same rectangles
//! in the same order, so repeated passes hit the cache instead of flickering.
//!
//! # Grid layout
//!
//! ```text
//!   north ┌──────┬──────┬──────┬───┐
//!         │  4   │  5   │  6   │ 7 │ ← last row clipped to north edge
//!         ├──────┼──────┼──────┼───┤
//!         │  0   │  1   │  2   │ 3 │
//!   south └──────┴──────┴──────┴───┘
//!       west     footprint        east (last column clipped)
//! ```
//!
//! Tiles are emitted row by row from south to north, west to east within a
//! row.

mod footprint;

pub use footprint::{FixedFootprint, TileFootprint, WebMercatorFootprint, DEFAULT_TILE_SIZE_PX};

use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::coord::{GeoBounds, Viewport};
use crate::raster::RasterExtent;

/// Footprints below this many degrees are treated as degenerate.
pub const MIN_FOOTPRINT_DEGREES: f64 = 1e-9;

/// Default upper bound on tiles in a single plan.
pub const DEFAULT_MAX_TILES: usize = 1024;

/// Relative tolerance when counting grid steps, so that floating-point noise
/// in `width / footprint` does not produce sliver tiles.
const STEP_EPSILON: f64 = 1e-9;

/// Reasons a plan degenerates to the empty set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The footprint rounded to zero or is not finite.
    #[error("Degenerate tile footprint: {degrees} degrees at zoom {zoom}")]
    DegenerateFootprint { degrees: f64, zoom: u8 },

    /// The grid would exceed the configured tile budget.
    #[error("Plan would need {count} tiles (max {max})")]
    TooManyTiles { count: usize, max: usize },
}

/// Where grid lines are anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridAnchor {
    /// Anchor at the southwest corner of the viewport ∩ extent region and
    /// clip the last row/column to that region.
    #[default]
    Intersection,

    /// Anchor at the raster's southwest corner. Tiles are clipped to the
    /// raster extent only, so small pans reuse the same keys.
    Extent,
}

impl GridAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridAnchor::Intersection => "intersection",
            GridAnchor::Extent => "extent",
        }
    }
}

impl FromStr for GridAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intersection" => Ok(GridAnchor::Intersection),
            "extent" => Ok(GridAnchor::Extent),
            other => Err(format!("unknown grid anchor '{}'", other)),
        }
    }
}

/// Planner settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    pub anchor: GridAnchor,
    pub max_tiles: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            anchor: GridAnchor::default(),
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

/// Partitions the visible part of a raster into tile requests.
#[derive(Debug, Clone, Default)]
pub struct TileRequestPlanner {
    config: PlannerConfig,
}

impl TileRequestPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan the tiles for a viewport, treating degenerate cases as an empty
    /// plan.
    pub fn plan<F>(&self, viewport: &Viewport, extent: &RasterExtent, footprint: &F) -> Vec<GeoBounds>
    where
        F: TileFootprint + ?Sized,
    {
        match self.try_plan(viewport, extent, footprint) {
            Ok(tiles) => tiles,
            Err(e) => {
                debug!(error = %e, zoom = viewport.zoom, "Planning degenerate, no tiles requested");
                Vec::new()
            }
        }
    }

    /// Plan the tiles for a viewport.
    ///
    /// Returns `Ok(vec![])` when the viewport does not overlap the raster.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` when the footprint is degenerate or the grid
    /// exceeds `max_tiles`.
    pub fn try_plan<F>(
        &self,
        viewport: &Viewport,
        extent: &RasterExtent,
        footprint: &F,
    ) -> Result<Vec<GeoBounds>, PlanError>
    where
        F: TileFootprint + ?Sized,
    {
        let Some(region) = viewport.bounds.intersection(&extent.bounds) else {
            return Ok(Vec::new());
        };

        let zoom = extent.clamp_zoom(viewport.zoom);
        let size = footprint.degrees(zoom);
        if !size.is_finite() || size < MIN_FOOTPRINT_DEGREES {
            return Err(PlanError::DegenerateFootprint {
                degrees: size,
                zoom,
            });
        }

        let (lat_axis, lng_axis) = match self.config.anchor {
            GridAnchor::Intersection => (
                Axis::anchored(region.south, region.north, size),
                Axis::anchored(region.west, region.east, size),
            ),
            GridAnchor::Extent => (
                Axis::snapped(extent.bounds.south, extent.bounds.north, region.south, region.north, size),
                Axis::snapped(extent.bounds.west, extent.bounds.east, region.west, region.east, size),
            ),
        };

        let count = lat_axis.steps as f64 * lng_axis.steps as f64;
        if count > self.config.max_tiles as f64 {
            return Err(PlanError::TooManyTiles {
                count: count.min(usize::MAX as f64) as usize,
                max: self.config.max_tiles,
            });
        }

        let mut tiles = Vec::with_capacity(count as usize);
        for row in 0..lat_axis.steps {
            let (south, north) = lat_axis.span(row);
            for col in 0..lng_axis.steps {
                let (west, east) = lng_axis.span(col);
                tiles.push(GeoBounds {
                    south,
                    west,
                    north,
                    east,
                });
            }
        }

        debug!(
            tiles = tiles.len(),
            zoom,
            footprint = size,
            anchor = self.config.anchor.as_str(),
            "Planned tile grid"
        );
        Ok(tiles)
    }
}

/// One dimension of the tile grid.
#[derive(Debug, Clone, Copy)]
struct Axis {
    /// Grid origin.
    origin: f64,
    /// First grid index covered.
    first: u64,
    /// Number of grid cells.
    steps: u64,
    /// Clip edge for the final cell.
    limit: f64,
    size: f64,
}

impl Axis {
    /// Grid starting exactly at `start`, clipped at `end`.
    fn anchored(start: f64, end: f64, size: f64) -> Self {
        Self {
            origin: start,
            first: 0,
            steps: count_steps(end - start, size),
            limit: end,
            size,
        }
    }

    /// Grid anchored at `origin` (clipped at `limit`) covering `[lo, hi]`.
    fn snapped(origin: f64, limit: f64, lo: f64, hi: f64, size: f64) -> Self {
        let first = ((lo - origin) / size + STEP_EPSILON).floor().max(0.0) as u64;
        let last = ((hi - origin) / size - STEP_EPSILON).ceil().max(first as f64 + 1.0) as u64;
        Self {
            origin,
            first,
            steps: last - first,
            limit,
            size,
        }
    }

    /// Edges of cell `i` (relative to `first`). A cell reaching the clip
    /// edge ends exactly on it.
    fn span(&self, i: u64) -> (f64, f64) {
        let index = self.first + i;
        let lo = self.origin + index as f64 * self.size;
        let hi = self.origin + (index + 1) as f64 * self.size;
        if hi >= self.limit - self.size * STEP_EPSILON {
            (lo, self.limit)
        } else {
            (lo, hi)
        }
    }
}

fn count_steps(length: f64, size: f64) -> u64 {
    ((length / size) - STEP_EPSILON).ceil().max(1.0) as u64
}
