//! Tile fetch errors.

use thiserror::Error;

use crate::backend::BackendError;

/// Why a single tile could not be fetched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request never produced a usable HTTP answer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The image payload was not valid base64 PNG.
    #[error("Failed to decode tile image: {0}")]
    Decode(String),

    /// The fetch was aborted before completion.
    #[error("Fetch cancelled")]
    Cancelled,
}

/// Coarse classification of [`FetchError`] used for logging and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Transport,
    /// Error payloads and undecodable images.
    Backend,
    Cancelled,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport(_) => FetchErrorKind::Transport,
            FetchError::Backend(_) | FetchError::Decode(_) => FetchErrorKind::Backend,
            FetchError::Cancelled => FetchErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<BackendError> for FetchError {
    fn from(err: BackendError) -> Self {
        if err.is_transport() {
            FetchError::Transport(err.to_string())
        } else {
            FetchError::Backend(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for FetchError {
    fn from(err: base64::DecodeError) -> Self {
        FetchError::Decode(format!("invalid base64: {}", err))
    }
}

impl From<image::ImageError> for FetchError {
    fn from(err: image::ImageError) -> Self {
        FetchError::Decode(err.to_string())
    }
}
