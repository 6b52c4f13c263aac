//! Tracing subscriber setup.
//!
//! Console output always goes to stderr. When a log file is configured, a
//! second layer writes plain-text events to it through a non-blocking
//! writer; keep the returned [`LoggingGuard`] alive for the lifetime of the
//! process or buffered events are lost.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter used when neither the configuration nor `RUST_LOG` sets one.
pub const DEFAULT_FILTER: &str = "rasterlayer=info";

/// Errors setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{spec}': {message}")]
    InvalidFilter { spec: String, message: String },

    #[error("Invalid log file path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Failed to open log file {}: {message}", .path.display())]
    File { path: PathBuf, message: String },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `rasterlayer=debug`.
    pub filter: String,
    /// Optional log file in addition to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG`, when set, overrides `config.filter`.
///
/// # Errors
///
/// Returns `LoggingError` if the filter does not parse, the log file cannot
/// be opened, or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(build_filter(&config.filter)?);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let appender = file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(build_filter(&config.filter)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

/// Filter from `RUST_LOG` if set, otherwise from `spec`.
pub fn build_filter(spec: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        return parse_filter(&env);
    }
    parse_filter(spec)
}

fn parse_filter(spec: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(spec).map_err(|e| LoggingError::InvalidFilter {
        spec: spec.to_string(),
        message: e.to_string(),
    })
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| LoggingError::File {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| LoggingError::File {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_filter() {
        assert!(parse_filter(DEFAULT_FILTER).is_ok());
        assert!(parse_filter("rasterlayer=debug,reqwest=warn").is_ok());
    }

    #[test]
    fn test_parse_invalid_filter() {
        let err = parse_filter("rasterlayer=loudly").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("logs").join("rasterlayer.log");

        let appender = file_appender(&path);

        assert!(appender.is_ok());
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_file_appender_rejects_directory_path() {
        let err = file_appender(Path::new("/")).err().unwrap();
        assert!(matches!(err, LoggingError::InvalidPath(_)));
    }

    #[test]
    fn test_config_builders() {
        let config = LoggingConfig::default()
            .with_filter("rasterlayer=trace")
            .with_file("/tmp/rl.log");
        assert_eq!(config.filter, "rasterlayer=trace");
        assert_eq!(config.file, Some(PathBuf::from("/tmp/rl.log")));
    }
}
