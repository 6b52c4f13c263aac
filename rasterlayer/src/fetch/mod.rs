//! Single-tile fetching.
//!
//! [`TileFetcher`] turns one tile rectangle plus the current
//! [`RasterParams`] into a decoded [`TileImage`]. It performs exactly one
//! backend request per call and never retries; retry happens implicitly when
//! the cache requests the key again.

mod error;
mod tile_image;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::backend::{RasterBackend, TileRenderRequest};
use crate::coord::GeoBounds;
use crate::raster::RasterParams;

pub use self::error::{FetchError, FetchErrorKind};
pub use self::tile_image::TileImage;

/// Issues tile render requests against a [`RasterBackend`].
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct TileFetcher {
    backend: Arc<dyn RasterBackend>,
}

impl TileFetcher {
    pub fn new(backend: Arc<dyn RasterBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn RasterBackend> {
        &self.backend
    }

    /// Fetch and decode one tile.
    ///
    /// Returns [`FetchError::Cancelled`] as soon as `cancel` fires, dropping
    /// the in-flight request.
    pub async fn fetch(
        &self,
        bounds: GeoBounds,
        zoom: u8,
        params: &RasterParams,
        cancel: &CancellationToken,
    ) -> Result<TileImage, FetchError> {
        let request = TileRenderRequest::new(bounds, zoom, params);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                trace!(bounds = ?bounds, "Tile fetch cancelled");
                return Err(FetchError::Cancelled);
            }
            result = self.backend.render_tile(&request) => result?,
        };

        TileImage::from_base64_png(bounds, zoom, &response.image)
    }
}
