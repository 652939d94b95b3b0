//! Conversion request configuration.
//!
//! A [`ConversionRequest`] holds every switch for one conversion call. It is
//! built once (by the CLI or by library callers), validated once at the start
//! of the call, and never mutated afterwards. Every field has an independent
//! default so callers only set what they need.

use crate::error::ConvertError;

/// Output raster format.
///
/// A closed enum rather than a free-form string: the writer dispatches on the
/// variant, so adding a third format is a compile-checked change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// GeoTIFF, one 32-bit float page per band.
    GeoTiff,
    /// ENVI band-sequential binary plus `.hdr` text header.
    Envi,
}

impl OutputFormat {
    /// Human-readable name for the format.
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::GeoTiff => "GTiff",
            OutputFormat::Envi => "ENVI",
        }
    }

    /// Extension of the main data file (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::GeoTiff => "tif",
            OutputFormat::Envi => "dat",
        }
    }

    /// Parse a format name as accepted on the command line.
    pub fn parse(name: &str) -> Result<Self, ConvertError> {
        match name {
            "GTiff" | "gtiff" | "tiff" => Ok(OutputFormat::GeoTiff),
            "ENVI" | "envi" => Ok(OutputFormat::Envi),
            other => Err(ConvertError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Which spectrometer wins in the VNIR/SWIR overlap region when fusing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinPriority {
    Vnir,
    #[default]
    Swir,
}

impl JoinPriority {
    pub fn name(&self) -> &'static str {
        match self {
            JoinPriority::Vnir => "VNIR",
            JoinPriority::Swir => "SWIR",
        }
    }
}

/// Configuration for a single conversion call.
///
/// Field names follow the switches of the conversion operation: the cube
/// selectors (`vnir`, `swir`, `full`), the ancillary selectors (`pan`,
/// `latlon`, `angles`, `cloud`, `err_matrix`), the georeferencing switches
/// (`base_georef`, `fill_gaps`) and the writer switches (`out_format`,
/// `overwrite`).
#[derive(Clone, Debug)]
pub struct ConversionRequest {
    /// Write the VNIR reflectance cube.
    pub vnir: bool,
    /// Write the SWIR reflectance cube.
    pub swir: bool,
    /// Write the fused VNIR+SWIR cube.
    pub full: bool,
    /// Write the panchromatic layer.
    pub pan: bool,
    /// Write latitude/longitude as a two-layer raster.
    pub latlon: bool,
    /// Write the view/sun angle layers.
    pub angles: bool,
    /// Write the cloud mask layer.
    pub cloud: bool,
    /// Write the per-pixel error matrices alongside each requested cube.
    pub err_matrix: bool,
    /// Apply GLT/bowtie base georeferencing to 2B/2C scenes.
    pub base_georef: bool,
    /// Fill unmapped cells left by the GLT from their 3x3 neighborhood.
    pub fill_gaps: bool,
    /// Overlap resolution for cube fusion.
    pub join_priority: JoinPriority,
    /// Requested VNIR wavelengths in nm; `None` keeps every band.
    pub selbands_vnir: Option<Vec<f32>>,
    /// Requested SWIR wavelengths in nm; `None` keeps every band.
    pub selbands_swir: Option<Vec<f32>>,
    /// Output raster format.
    pub out_format: OutputFormat,
    /// Replace existing output files instead of failing.
    pub overwrite: bool,
}

impl Default for ConversionRequest {
    fn default() -> Self {
        Self {
            vnir: false,
            swir: false,
            full: false,
            pan: false,
            latlon: false,
            angles: false,
            cloud: false,
            err_matrix: false,
            base_georef: true,
            fill_gaps: false,
            join_priority: JoinPriority::default(),
            selbands_vnir: None,
            selbands_swir: None,
            out_format: OutputFormat::GeoTiff,
            overwrite: false,
        }
    }
}

impl ConversionRequest {
    /// Check the request once at call start.
    ///
    /// Rejects requests that would produce no output at all, and wavelength
    /// lists that are empty or contain non-finite values (those would
    /// otherwise surface much later as confusing selector errors).
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !(self.vnir
            || self.swir
            || self.full
            || self.pan
            || self.latlon
            || self.angles
            || self.cloud)
        {
            return Err(ConvertError::InvalidRequest(
                "nothing requested: enable at least one of \
                 vnir, swir, full, pan, latlon, angles, cloud"
                    .to_string(),
            ));
        }

        for (name, list) in [
            ("selbands_vnir", &self.selbands_vnir),
            ("selbands_swir", &self.selbands_swir),
        ] {
            if let Some(wls) = list {
                if wls.is_empty() {
                    return Err(ConvertError::InvalidRequest(format!(
                        "{name} is empty; omit it to keep all bands"
                    )));
                }
                if let Some(bad) = wls.iter().find(|w| !w.is_finite() || **w <= 0.0) {
                    return Err(ConvertError::InvalidRequest(format!(
                        "{name} contains invalid wavelength {bad}"
                    )));
                }
            }
        }

        if self.err_matrix && !(self.vnir || self.swir || self.full) {
            return Err(ConvertError::InvalidRequest(
                "err_matrix needs at least one of vnir, swir, full".to_string(),
            ));
        }

        Ok(())
    }

    /// True when the request needs the VNIR cube read from the product.
    pub fn needs_vnir(&self) -> bool {
        self.vnir || self.full
    }

    /// True when the request needs the SWIR cube read from the product.
    pub fn needs_swir(&self) -> bool {
        self.swir || self.full
    }
}
