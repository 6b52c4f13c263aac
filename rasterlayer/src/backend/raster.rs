//! Raster backend trait and its HTTP implementation.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::error::BackendError;
use super::http::{AsyncHttpClient, HttpResponse};
use super::types::{ErrorPayload, RasterInfoRequest, TileRenderRequest, TileRenderResponse};
use crate::raster::RasterInfo;

/// Path of the raster metadata endpoint.
pub const INFO_ENDPOINT: &str = "/load-raster-info";

/// Path of the tile rendering endpoint.
pub const TILE_ENDPOINT: &str = "/load-raster-tile";

/// Operations the tile pipeline needs from the rendering backend.
pub trait RasterBackend: Send + Sync {
    /// Open `path` and return its extent and band metadata.
    fn load_raster_info<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RasterInfo, BackendError>>;

    /// Render one tile.
    fn render_tile<'a>(
        &'a self,
        request: &'a TileRenderRequest,
    ) -> BoxFuture<'a, Result<TileRenderResponse, BackendError>>;
}

/// [`RasterBackend`] over JSON-over-HTTP.
pub struct HttpRasterBackend<C: AsyncHttpClient> {
    client: C,
    base_url: String,
}

impl<C: AsyncHttpClient> HttpRasterBackend<C> {
    /// Create a backend rooted at `base_url`, e.g. `http://127.0.0.1:5000`.
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(endpoint);
        let body = serde_json::to_vec(body)
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to encode request: {}", e)))?;

        let response = self.client.post_json(&url, body).await?;
        debug!(url = %url, status = response.status, bytes = response.body.len(), "Backend response");
        parse_response(&url, response)
    }
}

impl<C: AsyncHttpClient> RasterBackend for HttpRasterBackend<C> {
    fn load_raster_info<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RasterInfo, BackendError>> {
        Box::pin(async move { self.post(INFO_ENDPOINT, &RasterInfoRequest { path }).await })
    }

    fn render_tile<'a>(
        &'a self,
        request: &'a TileRenderRequest,
    ) -> BoxFuture<'a, Result<TileRenderResponse, BackendError>> {
        Box::pin(async move { self.post(TILE_ENDPOINT, request).await })
    }
}

/// Decode a backend response.
///
/// An `{"error": ...}` payload wins over the status code so that error
/// bodies sent with HTTP 200 are not mistaken for data.
fn parse_response<T: DeserializeOwned>(url: &str, response: HttpResponse) -> Result<T, BackendError> {
    if let Ok(payload) = serde_json::from_slice::<ErrorPayload>(&response.body) {
        return Err(BackendError::Backend(payload.error));
    }

    if !response.is_success() {
        return Err(BackendError::Http {
            status: response.status,
            url: url.to_string(),
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| BackendError::InvalidResponse(e.to_string()))
}
