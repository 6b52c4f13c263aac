//! Request and response bodies exchanged with the backend.

use serde::{Deserialize, Serialize};

use crate::coord::GeoBounds;
use crate::raster::{BandSelection, RasterParams, ResamplingMethod};

/// Body of `POST /load-raster-info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterInfoRequest<'a> {
    pub path: &'a str,
}

/// Body of `POST /load-raster-tile`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileRenderRequest {
    pub path: String,
    pub bounds: GeoBounds,
    pub bands: BandSelection,
    pub zoom: u8,
    pub resampling: ResamplingMethod,
}

impl TileRenderRequest {
    /// Build the request for one tile under the given parameters.
    pub fn new(bounds: GeoBounds, zoom: u8, params: &RasterParams) -> Self {
        Self {
            path: params.path().to_string(),
            bounds,
            bands: params.bands(),
            zoom,
            resampling: params.resampling(),
        }
    }
}

/// Successful body of `POST /load-raster-tile`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TileRenderResponse {
    /// Base64-encoded PNG.
    pub image: String,

    /// Bounds echoed back by the backend.
    #[serde(default)]
    pub bounds: Option<GeoBounds>,
}

/// Structured error payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: String,
}
