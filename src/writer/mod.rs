//! Raster serialization: format dispatch, output naming, overwrite policy.
//!
//! Every output of a conversion goes through [`write_cube`] or
//! [`write_layers`]. Both dispatch on the closed [`OutputFormat`] enum and
//! share the naming convention `<product_id>_<LEVEL>_<SUFFIX>.<ext>`.
//! Overwrite protection covers the complete target set of one output (data
//! file, header, side-car) and is checked before the first byte of that
//! output is written.

pub mod envi;
pub mod geotiff;
pub mod sidecar;

use std::path::{Path, PathBuf};

use ndarray::{Array3, Axis};

use crate::error::ConvertError;
use crate::raster::{AncillaryLayer, Georeferencing, HyperspectralCube};
use crate::request::OutputFormat;

/// Paths produced for one written output.
#[derive(Debug)]
pub struct WrittenRaster {
    pub data_path: PathBuf,
    /// Wavelength/FWHM side-car, present for spectral cubes.
    pub band_table: Option<PathBuf>,
}

/// Output stem following the naming convention: product id, processing
/// level token, dataset suffix.
pub fn output_stem(product_id: &str, level: &str, suffix: &str) -> String {
    format!("{product_id}_{level}_{suffix}")
}

/// Fail with `OverwriteDenied` if any target exists and overwriting is off.
fn ensure_writable(paths: &[&Path], overwrite: bool) -> Result<(), ConvertError> {
    if overwrite {
        return Ok(());
    }
    for path in paths {
        if path.exists() {
            return Err(ConvertError::OverwriteDenied(path.to_path_buf()));
        }
    }
    Ok(())
}

/// Write a hyperspectral cube plus its wavelength/FWHM side-car.
pub fn write_cube(
    out_dir: &Path,
    stem: &str,
    cube: &HyperspectralCube,
    georef: &Georeferencing,
    format: OutputFormat,
    overwrite: bool,
) -> Result<WrittenRaster, ConvertError> {
    let data_path = out_dir.join(format!("{stem}.{}", format.extension()));
    let band_table = out_dir.join(format!("{stem}.wvl"));

    let mut targets = vec![data_path.as_path(), band_table.as_path()];
    let hdr_path = envi::header_path(&data_path);
    if format == OutputFormat::Envi {
        targets.push(hdr_path.as_path());
    }
    ensure_writable(&targets, overwrite)?;

    log::debug!(
        "writing {} band cube to {} ({})",
        cube.band_count(),
        data_path.display(),
        format.name()
    );
    match format {
        OutputFormat::GeoTiff => geotiff::write_geotiff(&data_path, cube.data(), georef)?,
        OutputFormat::Envi => {
            let names: Vec<String> = cube
                .meta()
                .bands
                .iter()
                .map(|b| format!("{} nm", b.wavelength))
                .collect();
            envi::write_envi(&data_path, cube.data(), &names, Some(cube.meta()), georef)?;
        }
    }
    sidecar::write_band_table(&band_table, cube.meta())?;

    Ok(WrittenRaster {
        data_path,
        band_table: Some(band_table),
    })
}

/// Write a stack of ancillary layers as one multi-band raster.
pub fn write_layers(
    out_dir: &Path,
    stem: &str,
    layers: &[AncillaryLayer],
    georef: &Georeferencing,
    format: OutputFormat,
    overwrite: bool,
) -> Result<WrittenRaster, ConvertError> {
    let data_path = out_dir.join(format!("{stem}.{}", format.extension()));
    let mut targets = vec![data_path.as_path()];
    let hdr_path = envi::header_path(&data_path);
    if format == OutputFormat::Envi {
        targets.push(hdr_path.as_path());
    }
    ensure_writable(&targets, overwrite)?;

    let data = stack_layers(layers)?;
    log::debug!(
        "writing {} layer(s) to {} ({})",
        layers.len(),
        data_path.display(),
        format.name()
    );
    match format {
        OutputFormat::GeoTiff => geotiff::write_geotiff(&data_path, &data, georef)?,
        OutputFormat::Envi => {
            let names: Vec<String> = layers.iter().map(|l| l.name.clone()).collect();
            envi::write_envi(&data_path, &data, &names, None, georef)?;
        }
    }

    Ok(WrittenRaster {
        data_path,
        band_table: None,
    })
}

/// Stack same-sized 2D layers into a (rows x cols x layers) array.
fn stack_layers(layers: &[AncillaryLayer]) -> Result<Array3<f32>, ConvertError> {
    let first = layers.first().ok_or_else(|| {
        ConvertError::InvalidRequest("cannot write an empty layer stack".to_string())
    })?;
    let (rows, cols) = (first.rows(), first.cols());
    for layer in layers {
        if layer.rows() != rows || layer.cols() != cols {
            return Err(ConvertError::IncompatibleGrids {
                left_rows: rows,
                left_cols: cols,
                right_rows: layer.rows(),
                right_cols: layer.cols(),
            });
        }
    }
    let mut data = Array3::<f32>::zeros((rows, cols, layers.len()));
    for (i, layer) in layers.iter().enumerate() {
        data.index_axis_mut(Axis(2), i).assign(&layer.data);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{BandMetadata, SpectralBand};
    use ndarray::{Array2, Array3};
    use tempfile::tempdir;

    fn small_cube() -> HyperspectralCube {
        let data = Array3::<f32>::zeros((2, 2, 2));
        let meta = BandMetadata::new(vec![
            SpectralBand::new(500.0, 10.0),
            SpectralBand::new(600.0, 10.0),
        ]);
        HyperspectralCube::new(data, meta)
    }

    #[test]
    fn naming_convention() {
        assert_eq!(output_stem("PRS_X", "2C", "FULL"), "PRS_X_2C_FULL");
    }

    #[test]
    fn overwrite_denied_before_any_byte_is_written() {
        let dir = tempdir().unwrap();
        let cube = small_cube();
        // Pre-create only the side-car: the raster itself must not appear.
        let table = dir.path().join("P_2B_VNIR.wvl");
        std::fs::write(&table, "occupied").unwrap();

        let err = write_cube(
            dir.path(),
            "P_2B_VNIR",
            &cube,
            &Georeferencing::Swath,
            OutputFormat::GeoTiff,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::OverwriteDenied(_)));
        assert!(!dir.path().join("P_2B_VNIR.tif").exists());
        assert_eq!(std::fs::read_to_string(&table).unwrap(), "occupied");
    }

    #[test]
    fn overwrite_allows_replacing() {
        let dir = tempdir().unwrap();
        let cube = small_cube();
        std::fs::write(dir.path().join("P_2B_VNIR.tif"), "old").unwrap();
        write_cube(
            dir.path(),
            "P_2B_VNIR",
            &cube,
            &Georeferencing::Swath,
            OutputFormat::GeoTiff,
            true,
        )
        .unwrap();
        let contents = geotiff::read_geotiff(&dir.path().join("P_2B_VNIR.tif")).unwrap();
        assert_eq!(contents.data.shape(), &[2, 2, 2]);
    }

    #[test]
    fn envi_cube_gets_header_and_band_table() {
        let dir = tempdir().unwrap();
        let cube = small_cube();
        let written = write_cube(
            dir.path(),
            "P_2D_SWIR",
            &cube,
            &Georeferencing::Swath,
            OutputFormat::Envi,
            false,
        )
        .unwrap();
        assert!(written.data_path.ends_with("P_2D_SWIR.dat"));
        assert!(dir.path().join("P_2D_SWIR.hdr").exists());
        assert!(dir.path().join("P_2D_SWIR.wvl").exists());
    }

    #[test]
    fn layer_stack_requires_matching_grids() {
        let layers = vec![
            AncillaryLayer::new("Latitude", Array2::<f32>::zeros((2, 2))),
            AncillaryLayer::new("Longitude", Array2::<f32>::zeros((3, 2))),
        ];
        assert!(matches!(
            stack_layers(&layers),
            Err(ConvertError::IncompatibleGrids { .. })
        ));
    }

    #[test]
    fn layers_roundtrip_through_envi() {
        let dir = tempdir().unwrap();
        let layers = vec![
            AncillaryLayer::new("Latitude", Array2::<f32>::from_elem((2, 3), 45.0)),
            AncillaryLayer::new("Longitude", Array2::<f32>::from_elem((2, 3), 9.0)),
        ];
        let written = write_layers(
            dir.path(),
            "P_2C_LATLON",
            &layers,
            &Georeferencing::Swath,
            OutputFormat::Envi,
            false,
        )
        .unwrap();
        let contents = envi::read_envi(&written.data_path).unwrap();
        assert_eq!(contents.band_names, vec!["Latitude", "Longitude"]);
        assert_eq!(contents.data[[0, 0, 0]], 45.0);
        assert_eq!(contents.data[[0, 0, 1]], 9.0);
    }
}
