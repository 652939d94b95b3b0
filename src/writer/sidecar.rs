//! Side-car text tables written next to the rasters.
//!
//! Two tables per conversion: one wavelength/FWHM table per written cube
//! (band index, center wavelength, FWHM) and one acquisition-geometry table
//! per product (acquisition time, decimal hour, sun angles). Both are plain
//! CSV so they open in anything.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::ConvertError;
use crate::raster::{BandMetadata, SunGeometry};

/// One row of the wavelength/FWHM table. Band indices are 1-based, matching
/// how raster tools number bands.
#[derive(Debug, Serialize)]
struct BandRow {
    band: usize,
    wavelength: f32,
    fwhm: f32,
}

/// One row of the acquisition-geometry table.
#[derive(Debug, Serialize)]
struct GeometryRow {
    acquisition_time: String,
    hour: Option<f64>,
    sun_zenith: f64,
    sun_azimuth: f64,
}

/// Write the per-cube wavelength/FWHM table.
pub fn write_band_table(path: &Path, meta: &BandMetadata) -> Result<(), ConvertError> {
    let file = File::create(path).map_err(ConvertError::Io)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for (i, band) in meta.bands.iter().enumerate() {
        writer
            .serialize(BandRow {
                band: i + 1,
                wavelength: band.wavelength,
                fwhm: band.fwhm,
            })
            .map_err(|source| ConvertError::SidecarWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    writer
        .flush()
        .map_err(ConvertError::Io)?;
    Ok(())
}

/// Write the per-product acquisition-geometry table.
pub fn write_geometry_table(path: &Path, geometry: &SunGeometry) -> Result<(), ConvertError> {
    let file = File::create(path).map_err(ConvertError::Io)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer
        .serialize(GeometryRow {
            acquisition_time: geometry.acquisition_time.clone(),
            hour: geometry.decimal_hour(),
            sun_zenith: geometry.sun_zenith,
            sun_azimuth: geometry.sun_azimuth,
        })
        .map_err(|source| ConvertError::SidecarWrite {
            path: path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(ConvertError::Io)?;
    Ok(())
}
