//! RasterLayer - Viewport-driven GeoTIFF tile loading for map overlays
//!
//! This library renders a large georeferenced raster as a tiled overlay on a
//! pan/zoom map. Only the tiles that intersect the current viewport are
//! requested from a rendering backend, at a resolution matched to the zoom
//! level, and tiles that scroll out of view are released.
//!
//! # Pipeline
//!
//! ```text
//! map events ─▶ ViewportController ─▶ TileRequestPlanner ─▶ TileCache ─▶ TileFetcher
//!                                                             ▲              │
//!                                                             └── install ◀──┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rasterlayer::backend::{HttpRasterBackend, ReqwestClient};
//! use rasterlayer::controller::{ControllerConfig, ViewportController};
//! use rasterlayer::map::HeadlessMap;
//!
//! let backend = Arc::new(HttpRasterBackend::new(ReqwestClient::new()?, "http://127.0.0.1:5000"));
//! let mut controller = ViewportController::new(map, backend, ControllerConfig::default());
//! controller.load_raster("/data/vergel.tif").await?;
//! controller.settle().await;
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod controller;
pub mod coord;
pub mod fetch;
pub mod logging;
pub mod map;
pub mod planner;
pub mod raster;

pub use coord::{GeoBounds, TileKey, Viewport};
pub use raster::{BandSelection, RasterParams, ResamplingMethod};
