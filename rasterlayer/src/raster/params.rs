//! Band selection, resampling method and the combined render parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when validating render parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    /// Band indices are 1-based.
    #[error("Band indices must be positive (got {0})")]
    ZeroBand(u32),

    /// Band index exceeds the raster's band count.
    #[error("Band {band} is out of range (raster has {count} bands)")]
    BandOutOfRange { band: u32, count: u32 },

    /// Band list could not be parsed as `r,g,b`.
    #[error("Invalid band list '{0}' (expected r,g,b)")]
    InvalidBandList(String),

    /// Opacity outside `[0, 1]`.
    #[error("Opacity must be within [0, 1] (got {0})")]
    OpacityOutOfRange(f64),

    /// Resampling method name not recognised.
    #[error("Unknown resampling method '{0}'")]
    UnknownResampling(String),
}

/// Ordered red/green/blue triple of 1-based band indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BandSelection {
    r: u32,
    g: u32,
    b: u32,
}

impl BandSelection {
    /// Create a band selection.
    ///
    /// # Errors
    ///
    /// Returns `ParamsError::ZeroBand` if any index is zero.
    pub fn new(r: u32, g: u32, b: u32) -> Result<Self, ParamsError> {
        for band in [r, g, b] {
            if band == 0 {
                return Err(ParamsError::ZeroBand(band));
            }
        }
        Ok(Self { r, g, b })
    }

    /// Default selection for a raster with `count` bands: `(1, 2, 3)` with
    /// every index clamped to the band count.
    pub fn default_for(count: u32) -> Self {
        let max = count.max(1);
        Self {
            r: 1,
            g: 2.min(max),
            b: 3.min(max),
        }
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn g(&self) -> u32 {
        self.g
    }

    pub fn b(&self) -> u32 {
        self.b
    }

    /// Check every index against the raster's band count.
    pub fn validate_against(&self, count: u32) -> Result<(), ParamsError> {
        for band in [self.r, self.g, self.b] {
            if band > count {
                return Err(ParamsError::BandOutOfRange { band, count });
            }
        }
        Ok(())
    }
}

impl Default for BandSelection {
    fn default() -> Self {
        Self { r: 1, g: 2, b: 3 }
    }
}

impl fmt::Display for BandSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl FromStr for BandSelection {
    type Err = ParamsError;

    /// Parse `"r,g,b"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParamsError::InvalidBandList(s.to_string()))?;
        match parts.as_slice() {
            [r, g, b] => Self::new(*r, *g, *b),
            _ => Err(ParamsError::InvalidBandList(s.to_string())),
        }
    }
}

/// Pixel-interpolation algorithm used by the backend when rendering a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    Nearest,
    #[default]
    Bilinear,
    Cubic,
    Average,
    Lanczos,
    Mode,
}

impl ResamplingMethod {
    /// Every method the backend understands.
    pub const ALL: [ResamplingMethod; 6] = [
        ResamplingMethod::Nearest,
        ResamplingMethod::Bilinear,
        ResamplingMethod::Cubic,
        ResamplingMethod::Average,
        ResamplingMethod::Lanczos,
        ResamplingMethod::Mode,
    ];

    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResamplingMethod::Nearest => "nearest",
            ResamplingMethod::Bilinear => "bilinear",
            ResamplingMethod::Cubic => "cubic",
            ResamplingMethod::Average => "average",
            ResamplingMethod::Lanczos => "lanczos",
            ResamplingMethod::Mode => "mode",
        }
    }
}

impl fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResamplingMethod {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| ParamsError::UnknownResampling(s.to_string()))
    }
}

/// Everything that determines how a tile is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterParams {
    path: String,
    bands: BandSelection,
    opacity: f64,
    resampling: ResamplingMethod,
}

impl RasterParams {
    /// Create parameters for `path` with default bands, full opacity and
    /// bilinear resampling.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            bands: BandSelection::default(),
            opacity: 1.0,
            resampling: ResamplingMethod::default(),
        }
    }

    pub fn with_bands(mut self, bands: BandSelection) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_resampling(mut self, resampling: ResamplingMethod) -> Self {
        self.resampling = resampling;
        self
    }

    /// Set the overlay opacity.
    ///
    /// # Errors
    ///
    /// Returns `ParamsError::OpacityOutOfRange` outside `[0, 1]`.
    pub fn with_opacity(mut self, opacity: f64) -> Result<Self, ParamsError> {
        self.opacity = validate_opacity(opacity)?;
        Ok(self)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bands(&self) -> BandSelection {
        self.bands
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn resampling(&self) -> ResamplingMethod {
        self.resampling
    }

    pub(crate) fn set_bands(&mut self, bands: BandSelection) {
        self.bands = bands;
    }

    pub(crate) fn set_resampling(&mut self, resampling: ResamplingMethod) {
        self.resampling = resampling;
    }

    pub(crate) fn set_opacity(&mut self, opacity: f64) -> Result<(), ParamsError> {
        self.opacity = validate_opacity(opacity)?;
        Ok(())
    }
}

fn validate_opacity(opacity: f64) -> Result<f64, ParamsError> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(opacity)
    } else {
        Err(ParamsError::OpacityOutOfRange(opacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_selection_rejects_zero() {
        assert_eq!(BandSelection::new(1, 0, 3), Err(ParamsError::ZeroBand(0)));
    }

    #[test]
    fn test_band_selection_default_for_counts() {
        assert_eq!(BandSelection::default_for(1), BandSelection::new(1, 1, 1).unwrap());
        assert_eq!(BandSelection::default_for(2), BandSelection::new(1, 2, 2).unwrap());
        assert_eq!(BandSelection::default_for(8), BandSelection::new(1, 2, 3).unwrap());
        assert_eq!(BandSelection::default_for(0), BandSelection::new(1, 1, 1).unwrap());
    }

    #[test]
    fn test_band_selection_validate_against() {
        let bands = BandSelection::new(4, 3, 2).unwrap();
        assert!(bands.validate_against(4).is_ok());
        assert_eq!(
            bands.validate_against(3),
            Err(ParamsError::BandOutOfRange { band: 4, count: 3 })
        );
    }

    #[test]
    fn test_band_selection_parse() {
        let bands: BandSelection = "4, 3,2".parse().unwrap();
        assert_eq!(bands, BandSelection::new(4, 3, 2).unwrap());
        assert!(matches!(
            "1,2".parse::<BandSelection>(),
            Err(ParamsError::InvalidBandList(_))
        ));
        assert!("a,b,c".parse::<BandSelection>().is_err());
        assert_eq!(bands.to_string(), "4,3,2");
    }

    #[test]
    fn test_band_selection_wire_format() {
        let json = serde_json::to_string(&BandSelection::new(4, 3, 2).unwrap()).unwrap();
        assert_eq!(json, r#"{"r":4,"g":3,"b":2}"#);
    }

    #[test]
    fn test_resampling_parse_case_insensitive() {
        assert_eq!("Cubic".parse::<ResamplingMethod>(), Ok(ResamplingMethod::Cubic));
        assert_eq!(" nearest ".parse::<ResamplingMethod>(), Ok(ResamplingMethod::Nearest));
        assert!(matches!(
            "sinc".parse::<ResamplingMethod>(),
            Err(ParamsError::UnknownResampling(_))
        ));
    }

    #[test]
    fn test_resampling_wire_names() {
        for method in ResamplingMethod::ALL {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
        assert_eq!(ResamplingMethod::default(), ResamplingMethod::Bilinear);
    }

    #[test]
    fn test_params_defaults() {
        let params = RasterParams::new("/data/vergel.tif");
        assert_eq!(params.path(), "/data/vergel.tif");
        assert_eq!(params.bands(), BandSelection::default());
        assert_eq!(params.opacity(), 1.0);
        assert_eq!(params.resampling(), ResamplingMethod::Bilinear);
    }

    #[test]
    fn test_params_opacity_validation() {
        assert!(RasterParams::new("a").with_opacity(0.5).is_ok());
        assert_eq!(
            RasterParams::new("a").with_opacity(1.5),
            Err(ParamsError::OpacityOutOfRange(1.5))
        );
        assert!(RasterParams::new("a").with_opacity(f64::NAN).is_err());
    }
}
