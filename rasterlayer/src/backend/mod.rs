//! Raster rendering backend abstraction.
//!
//! The backend opens rasters and renders tiles; this crate only talks to it.
//! Two endpoints are consumed:
//!
//! - `POST /load-raster-info {path}` → [`RasterInfo`](crate::raster::RasterInfo)
//! - `POST /load-raster-tile {path, bounds, bands, zoom, resampling}` →
//!   [`TileRenderResponse`] carrying a base64 PNG
//!
//! Either endpoint may answer `{"error": "..."}`, with or without an HTTP
//! error status. Both cases surface as [`BackendError::Backend`].
//!
//! # Example
//!
//! ```ignore
//! use rasterlayer::backend::{HttpRasterBackend, RasterBackend, ReqwestClient};
//!
//! let client = ReqwestClient::new()?;
//! let backend = HttpRasterBackend::new(client, "http://127.0.0.1:5000");
//! let info = backend.load_raster_info("/data/vergel.tif").await?;
//! ```

mod error;
mod http;
mod raster;
mod types;

pub use error::BackendError;
pub use http::{AsyncHttpClient, HttpResponse, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use raster::{HttpRasterBackend, RasterBackend, INFO_ENDPOINT, TILE_ENDPOINT};
pub use types::{RasterInfoRequest, TileRenderRequest, TileRenderResponse};

#[cfg(test)]
pub use http::tests::MockHttpClient;
#[cfg(test)]
pub use raster::tests::MockBackend;
