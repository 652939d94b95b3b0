//! Everything read from one Level-2 product, held in memory.

use ndarray::Array2;

use super::ancillary::{AncillaryLayer, SunGeometry};
use super::cube::HyperspectralCube;
use super::georef::{GeoTransform, Georeferencing};

/// PRISMA Level-2 processing sub-level.
///
/// 2B and 2C carry swath-geometry cubes with per-pixel geolocation; 2D is
/// already resampled onto a UTM grid by the ground segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProcessingLevel {
    L2B,
    L2C,
    #[default]
    L2D,
}

impl ProcessingLevel {
    /// Token used in product names and output file names ("2B", "2C", "2D").
    pub fn token(&self) -> &'static str {
        match self {
            ProcessingLevel::L2B => "2B",
            ProcessingLevel::L2C => "2C",
            ProcessingLevel::L2D => "2D",
        }
    }

    /// Parse "2B"/"2C"/"2D" (or the "L2B" spelling used in file names).
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim_start_matches('L') {
            "2B" => Some(ProcessingLevel::L2B),
            "2C" => Some(ProcessingLevel::L2C),
            "2D" => Some(ProcessingLevel::L2D),
            _ => None,
        }
    }

    /// Whether this level arrives already projected.
    pub fn is_projected(&self) -> bool {
        matches!(self, ProcessingLevel::L2D)
    }
}

/// One of the two hyperspectral spectrometers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spectrometer {
    Vnir,
    Swir,
}

impl Spectrometer {
    pub fn name(&self) -> &'static str {
        match self {
            Spectrometer::Vnir => "VNIR",
            Spectrometer::Swir => "SWIR",
        }
    }
}

/// Per-pixel geolocation arrays for one instrument grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Geolocation {
    pub latitude: Array2<f32>,
    pub longitude: Array2<f32>,
}

impl Geolocation {
    pub fn rows(&self) -> usize {
        self.latitude.shape()[0]
    }

    pub fn cols(&self) -> usize {
        self.latitude.shape()[1]
    }
}

/// An in-memory Level-2 scene: the cubes and layers one conversion call
/// works on. The reader fills only the fields the request needs; everything
/// else stays `None`.
#[derive(Clone, Debug, Default)]
pub struct L2Scene {
    /// Where the scene was read from; carried into dataset-missing errors.
    pub source_path: std::path::PathBuf,
    /// Product identifier, used as the stem of every output name.
    pub product_id: String,
    pub level: Option<ProcessingLevel>,
    pub vnir: Option<HyperspectralCube>,
    pub swir: Option<HyperspectralCube>,
    /// Per-pixel error matrices paired with the cubes, when requested.
    pub vnir_err: Option<HyperspectralCube>,
    pub swir_err: Option<HyperspectralCube>,
    /// Panchromatic layer with its own (finer) geolocation grid.
    pub pan: Option<AncillaryLayer>,
    pub pan_geolocation: Option<Geolocation>,
    /// Geolocation of the hyperspectral grid (2B/2C).
    pub geolocation: Option<Geolocation>,
    /// View/sun angle layers in product order.
    pub angles: Vec<AncillaryLayer>,
    pub cloud_mask: Option<AncillaryLayer>,
    pub sun_geometry: SunGeometry,
    /// Projected grid carried by 2D products (hyperspectral resolution).
    pub projected: Option<(u32, GeoTransform)>,
    /// Projected grid of the panchromatic layer (finer resolution).
    pub pan_projected: Option<(u32, GeoTransform)>,
    /// Dead bands (zero center wavelength) dropped while reading.
    pub dead_bands_dropped: usize,
}

impl L2Scene {
    /// Processing level, defaulting to 2D when the product did not say.
    pub fn level(&self) -> ProcessingLevel {
        self.level.unwrap_or_default()
    }

    /// Georeferencing state for pass-through output of a projected scene.
    pub fn projected_georeferencing(&self) -> Option<Georeferencing> {
        self.projected
            .map(|(epsg, transform)| Georeferencing::Projected { epsg, transform })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_both_spellings() {
        assert_eq!(ProcessingLevel::parse("2B"), Some(ProcessingLevel::L2B));
        assert_eq!(ProcessingLevel::parse("L2D"), Some(ProcessingLevel::L2D));
        assert_eq!(ProcessingLevel::parse("1"), None);
    }

    #[test]
    fn only_2d_is_projected() {
        assert!(ProcessingLevel::L2D.is_projected());
        assert!(!ProcessingLevel::L2B.is_projected());
        assert!(!ProcessingLevel::L2C.is_projected());
    }

    #[test]
    fn projected_georeferencing_comes_from_scene_grid() {
        let scene = L2Scene {
            projected: Some((32632, GeoTransform::north_up(600000.0, 4900000.0, 30.0, 30.0))),
            ..Default::default()
        };
        let georef = scene.projected_georeferencing().unwrap();
        assert_eq!(georef.epsg(), Some(32632));
    }
}
