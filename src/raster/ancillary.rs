//! Ancillary 2D layers and scalar acquisition geometry.

use ndarray::Array2;

/// A named 2D layer read alongside the cubes: latitude, longitude, view/sun
/// angles, cloud mask, panchromatic. Each layer has its own lifecycle; only
/// the layers the request asks for are read at all.
#[derive(Clone, Debug, PartialEq)]
pub struct AncillaryLayer {
    pub name: String,
    pub data: Array2<f32>,
}

impl AncillaryLayer {
    pub fn new(name: impl Into<String>, data: Array2<f32>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn cols(&self) -> usize {
        self.data.shape()[1]
    }

    /// Vertically flipped copy, same name.
    pub fn flipped_north_up(&self) -> Self {
        let mut data = self.data.clone();
        data.invert_axis(ndarray::Axis(0));
        Self {
            name: self.name.clone(),
            data,
        }
    }
}

/// Scalar sun/acquisition geometry for the side-car table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SunGeometry {
    /// Acquisition start time as recorded in the product (ISO 8601).
    pub acquisition_time: String,
    /// Sun zenith angle at scene center (degrees).
    pub sun_zenith: f64,
    /// Sun azimuth angle at scene center (degrees).
    pub sun_azimuth: f64,
}

impl SunGeometry {
    /// Decimal acquisition hour parsed from the time string, if present.
    ///
    /// `"2020-04-24T10:30:00.000Z"` parses to `10.5`.
    pub fn decimal_hour(&self) -> Option<f64> {
        let clock = self.acquisition_time.split('T').nth(1)?;
        let mut parts = clock
            .trim_end_matches('Z')
            .splitn(3, ':')
            .map(|p| p.parse::<f64>().ok());
        let hour = parts.next()??;
        let minute = parts.next().flatten().unwrap_or(0.0);
        let second = parts.next().flatten().unwrap_or(0.0);
        Some(hour + minute / 60.0 + second / 3600.0)
    }
}
