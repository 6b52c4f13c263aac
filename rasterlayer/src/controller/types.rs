//! Controller configuration, commands and errors.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::backend::BackendError;
use crate::cache::DEFAULT_PADDING;
use crate::coord::TileKey;
use crate::fetch::{FetchError, TileImage};
use crate::planner::{FixedFootprint, PlannerConfig, TileFootprint, WebMercatorFootprint, DEFAULT_TILE_SIZE_PX};
use crate::raster::{BandSelection, ParamsError, RasterInfo, ResamplingMethod};

/// Default quiet period before a burst of map events is planned.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Default overlay opacity.
pub const DEFAULT_OPACITY: f64 = 1.0;

/// Tunables for [`ViewportController`](super::ViewportController).
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Viewport padding fraction used for eviction.
    pub padding: f64,
    /// Quiet period before map events trigger planning.
    pub debounce: Duration,
    /// Tile edge in pixels for the Web Mercator footprint.
    pub tile_size_px: u32,
    /// Fixed tile edge in degrees; overrides the zoom-based footprint.
    pub fixed_degrees: Option<f64>,
    pub planner: PlannerConfig,
    /// Opacity applied to overlays until changed.
    pub opacity: f64,
    /// Resampling method used until changed.
    pub resampling: ResamplingMethod,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            debounce: DEFAULT_DEBOUNCE,
            tile_size_px: DEFAULT_TILE_SIZE_PX,
            fixed_degrees: None,
            planner: PlannerConfig::default(),
            opacity: DEFAULT_OPACITY,
            resampling: ResamplingMethod::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_tile_size_px(mut self, tile_size_px: u32) -> Self {
        self.tile_size_px = tile_size_px;
        self
    }

    pub fn with_fixed_degrees(mut self, degrees: f64) -> Self {
        self.fixed_degrees = Some(degrees);
        self
    }

    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_resampling(mut self, resampling: ResamplingMethod) -> Self {
        self.resampling = resampling;
        self
    }

    /// Footprint function selected by this configuration.
    pub fn footprint(&self) -> Box<dyn TileFootprint + Send + Sync> {
        match self.fixed_degrees {
            Some(degrees) => Box::new(FixedFootprint(degrees)),
            None => Box::new(WebMercatorFootprint::new(self.tile_size_px)),
        }
    }
}

/// Whether a raster is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Empty,
    Active,
}

/// A change to the rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamsChange {
    Bands(BandSelection),
    Opacity(f64),
    Resampling(ResamplingMethod),
}

impl ParamsChange {
    /// True when the change alters rendered pixels and therefore every
    /// cached tile.
    pub fn invalidates_tiles(&self) -> bool {
        !matches!(self, ParamsChange::Opacity(_))
    }
}

/// Result of one tile fetch, delivered back to the controller.
#[derive(Debug)]
pub struct FetchCompletion {
    pub key: TileKey,
    /// Generation the fetch was issued under.
    pub generation: u64,
    pub result: Result<TileImage, FetchError>,
}

/// Requests accepted by the controller event loop.
#[derive(Debug)]
pub enum ControllerCommand {
    /// Open a raster; the outcome is sent on `reply`.
    LoadRaster {
        path: String,
        reply: oneshot::Sender<Result<RasterInfo, ControllerError>>,
    },
    SetOpacity(f64),
    SetBands(BandSelection),
    SetResampling(ResamplingMethod),
    /// Close the current raster.
    Close,
}

/// Errors surfaced to the action that triggered them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    /// The backend could not open the raster.
    #[error("Failed to load raster: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Params(#[from] ParamsError),

    /// The operation needs an open raster.
    #[error("No raster is loaded")]
    NoRaster,
}
