//! CLI error type.

use std::path::PathBuf;

use rasterlayer::backend::BackendError;
use rasterlayer::config::ConfigError;
use rasterlayer::controller::ControllerError;
use rasterlayer::logging::LoggingError;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Controller(#[from] ControllerError),

    #[error("Invalid bounds '{0}': expected south,west,north,east in degrees")]
    InvalidBounds(String),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Timed out after {0}s waiting for tiles")]
    Timeout(u64),

    #[error("Interrupted")]
    Interrupted,

    #[error("Failed to write {}: {message}", .path.display())]
    Output { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CliError::InvalidBounds("1,2,3".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid bounds '1,2,3': expected south,west,north,east in degrees"
        );

        let err: CliError = BackendError::Backend("No such file".to_string()).into();
        assert_eq!(err.to_string(), "Backend error: No such file");

        assert_eq!(CliError::Timeout(30).to_string(), "Timed out after 30s waiting for tiles");
    }
}
