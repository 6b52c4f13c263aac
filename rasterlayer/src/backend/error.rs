//! Backend error type.

use thiserror::Error;

/// Errors talking to the raster backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// Connection, timeout or body read failure.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-success status without a structured error payload.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The backend answered with an `{"error": ...}` payload.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The response body was not the expected JSON document.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// True for failures of the network path rather than of the backend
    /// itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BackendError::Client(_) | BackendError::Transport(_) | BackendError::Http { .. }
        )
    }
}
