//! Georeferencing state attached to every written raster.

use serde::{Deserialize, Serialize};

/// Affine grid-to-world mapping, GDAL convention: `origin` is the outer
/// corner of the top-left pixel and `pixel_height` is negative for north-up
/// rasters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform from the top-left corner and positive cell sizes.
    pub fn north_up(origin_x: f64, origin_y: f64, res_x: f64, res_y: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width: res_x,
            pixel_height: -res_y,
        }
    }
}

/// Georeferencing state of a cube or layer.
///
/// A scene moves through these states exactly as the processing level
/// dictates: 2D products arrive and stay `Projected`; 2B/2C products arrive
/// as `Swath` and become `Geographic` only through base georeferencing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Georeferencing {
    /// Sensor swath geometry, no grid-to-world mapping (north-up flipped).
    Swath,
    /// WGS84 geographic lat/lon grid (EPSG:4326) from GLT resampling.
    Geographic { transform: GeoTransform },
    /// Map projection carried over from the product, usually a UTM zone.
    Projected { epsg: u32, transform: GeoTransform },
}

impl Georeferencing {
    pub fn is_projected(&self) -> bool {
        matches!(self, Georeferencing::Projected { .. })
    }

    pub fn transform(&self) -> Option<GeoTransform> {
        match self {
            Georeferencing::Swath => None,
            Georeferencing::Geographic { transform } => Some(*transform),
            Georeferencing::Projected { transform, .. } => Some(*transform),
        }
    }

    /// EPSG code of the coordinate system, when there is one.
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Georeferencing::Swath => None,
            Georeferencing::Geographic { .. } => Some(4326),
            Georeferencing::Projected { epsg, .. } => Some(*epsg),
        }
    }
}
