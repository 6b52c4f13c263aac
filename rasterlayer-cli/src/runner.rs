//! Shared setup for commands that talk to the backend.

use std::path::PathBuf;
use std::sync::Arc;

use rasterlayer::backend::{HttpRasterBackend, RasterBackend, ReqwestClient};
use rasterlayer::config::ConfigFile;
use rasterlayer::logging::{init_logging, LoggingGuard};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Filter used with `--verbose`.
const VERBOSE_FILTER: &str = "rasterlayer=debug,rasterlayer_cli=debug";

/// Options accepted by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub backend: Option<String>,
    pub verbose: bool,
}

impl GlobalOptions {
    /// Configuration file in effect.
    pub fn config_path(&self) -> Result<PathBuf, CliError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigFile::default_path()?),
        }
    }

    /// Load the configuration and apply command-line overrides.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        let mut config = ConfigFile::load_from(&self.config_path()?)?;
        if let Some(url) = &self.backend {
            config.backend.url = url.trim_end_matches('/').to_string();
        }
        if self.verbose {
            config.logging.filter = VERBOSE_FILTER.to_string();
        }
        Ok(config)
    }
}

/// Loaded configuration, logging and async runtime for one command.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let config = options.load_config()?;
        let logging = init_logging(&config.logging_config())?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            runtime,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// HTTP backend at the configured URL.
    pub fn backend(&self) -> Result<Arc<dyn RasterBackend>, CliError> {
        let client = ReqwestClient::with_timeout(self.config.backend.timeout_secs)?;
        let backend: Arc<dyn RasterBackend> =
            Arc::new(HttpRasterBackend::new(client, self.config.backend.url.as_str()));
        Ok(backend)
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            backend = %self.config.backend.url,
            "RasterLayer starting"
        );
    }
}
