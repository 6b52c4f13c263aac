//! INI configuration file.
//!
//! Lives at `~/.rasterlayer/config.ini` unless a path is given. Every key is
//! optional; a missing file yields the defaults.
//!
//! ```ini
//! [backend]
//! url = http://127.0.0.1:5000
//! timeout = 30
//!
//! [tiles]
//! tile_size = 256
//! ; fixed_degrees = 0.05
//! padding = 0.1
//! max_tiles = 1024
//! anchor = intersection
//!
//! [viewport]
//! debounce_ms = 150
//!
//! [overlay]
//! opacity = 1.0
//! resampling = bilinear
//!
//! [logging]
//! ; file = /var/log/rasterlayer.log
//! filter = rasterlayer=info
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::backend::DEFAULT_TIMEOUT_SECS;
use crate::cache::DEFAULT_PADDING;
use crate::controller::{ControllerConfig, DEFAULT_DEBOUNCE, DEFAULT_OPACITY};
use crate::logging::{LoggingConfig, DEFAULT_FILTER};
use crate::planner::{GridAnchor, PlannerConfig, DEFAULT_MAX_TILES, DEFAULT_TILE_SIZE_PX};
use crate::raster::ResamplingMethod;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

const CONFIG_DIR: &str = ".rasterlayer";
const CONFIG_FILE: &str = "config.ini";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for [{section}] {key}: '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileSettings {
    pub tile_size_px: u32,
    pub fixed_degrees: Option<f64>,
    pub padding: f64,
    pub max_tiles: usize,
    pub anchor: GridAnchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportSettings {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub opacity: f64,
    pub resampling: ResamplingMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub file: Option<PathBuf>,
    pub filter: String,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub backend: BackendSettings,
    pub tiles: TileSettings,
    pub viewport: ViewportSettings,
    pub overlay: OverlaySettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            backend: BackendSettings {
                url: DEFAULT_BACKEND_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            tiles: TileSettings {
                tile_size_px: DEFAULT_TILE_SIZE_PX,
                fixed_degrees: None,
                padding: DEFAULT_PADDING,
                max_tiles: DEFAULT_MAX_TILES,
                anchor: GridAnchor::default(),
            },
            viewport: ViewportSettings {
                debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            },
            overlay: OverlaySettings {
                opacity: DEFAULT_OPACITY,
                resampling: ResamplingMethod::default(),
            },
            logging: LoggingSettings {
                file: None,
                filter: DEFAULT_FILTER.to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// `~/.rasterlayer/config.ini`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, returning defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = get::<String>(ini, "backend", "url")? {
            config.backend.url = url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = get::<u64>(ini, "backend", "timeout")? {
            ensure(timeout > 0, "backend", "timeout", timeout)?;
            config.backend.timeout_secs = timeout;
        }

        if let Some(size) = get::<u32>(ini, "tiles", "tile_size")? {
            ensure(size > 0, "tiles", "tile_size", size)?;
            config.tiles.tile_size_px = size;
        }
        if let Some(degrees) = get::<f64>(ini, "tiles", "fixed_degrees")? {
            ensure(degrees.is_finite() && degrees > 0.0, "tiles", "fixed_degrees", degrees)?;
            config.tiles.fixed_degrees = Some(degrees);
        }
        if let Some(padding) = get::<f64>(ini, "tiles", "padding")? {
            ensure(padding.is_finite() && padding >= 0.0, "tiles", "padding", padding)?;
            config.tiles.padding = padding;
        }
        if let Some(max) = get::<usize>(ini, "tiles", "max_tiles")? {
            ensure(max > 0, "tiles", "max_tiles", max)?;
            config.tiles.max_tiles = max;
        }
        if let Some(anchor) = get::<GridAnchor>(ini, "tiles", "anchor")? {
            config.tiles.anchor = anchor;
        }

        if let Some(debounce) = get::<u64>(ini, "viewport", "debounce_ms")? {
            config.viewport.debounce_ms = debounce;
        }

        if let Some(opacity) = get::<f64>(ini, "overlay", "opacity")? {
            ensure((0.0..=1.0).contains(&opacity), "overlay", "opacity", opacity)?;
            config.overlay.opacity = opacity;
        }
        if let Some(resampling) = get::<ResamplingMethod>(ini, "overlay", "resampling")? {
            config.overlay.resampling = resampling;
        }

        if let Some(file) = get::<String>(ini, "logging", "file")? {
            config.logging.file = Some(PathBuf::from(file));
        }
        if let Some(filter) = get::<String>(ini, "logging", "filter")? {
            config.logging.filter = filter;
        }

        Ok(config)
    }

    /// Render as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("backend"))
            .set("url", self.backend.url.as_str())
            .set("timeout", self.backend.timeout_secs.to_string());

        ini.with_section(Some("tiles"))
            .set("tile_size", self.tiles.tile_size_px.to_string())
            .set("padding", self.tiles.padding.to_string())
            .set("max_tiles", self.tiles.max_tiles.to_string())
            .set("anchor", self.tiles.anchor.as_str());
        if let Some(degrees) = self.tiles.fixed_degrees {
            ini.with_section(Some("tiles"))
                .set("fixed_degrees", degrees.to_string());
        }

        ini.with_section(Some("viewport"))
            .set("debounce_ms", self.viewport.debounce_ms.to_string());

        ini.with_section(Some("overlay"))
            .set("opacity", self.overlay.opacity.to_string())
            .set("resampling", self.overlay.resampling.as_str());

        ini.with_section(Some("logging"))
            .set("filter", self.logging.filter.as_str());
        if let Some(file) = &self.logging.file {
            ini.with_section(Some("logging"))
                .set("file", file.display().to_string());
        }

        ini
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    /// Controller settings from the `[tiles]`, `[viewport]` and `[overlay]`
    /// sections.
    pub fn controller_config(&self) -> ControllerConfig {
        let mut config = ControllerConfig::default()
            .with_padding(self.tiles.padding)
            .with_debounce(Duration::from_millis(self.viewport.debounce_ms))
            .with_tile_size_px(self.tiles.tile_size_px)
            .with_planner(PlannerConfig {
                anchor: self.tiles.anchor,
                max_tiles: self.tiles.max_tiles,
            })
            .with_opacity(self.overlay.opacity)
            .with_resampling(self.overlay.resampling);
        if let Some(degrees) = self.tiles.fixed_degrees {
            config = config.with_fixed_degrees(degrees);
        }
        config
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            filter: self.logging.filter.clone(),
            file: self.logging.file.clone(),
        }
    }
}

/// Read and parse one key; blank values count as absent.
fn get<T: FromStr>(ini: &Ini, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
    let Some(raw) = ini.get_from(Some(section), key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| invalid(section, key, raw))
}

fn ensure(ok: bool, section: &str, key: &str, value: impl Display) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(invalid(section, key, value))
    }
}

fn invalid(section: &str, key: &str, value: impl Display) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}
