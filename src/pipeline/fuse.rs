//! VNIR/SWIR cube fusion.
//!
//! The two spectrometers overlap around 920-1010 nm. Fusion keeps the bands
//! of the prioritized spectrometer inside the overlap, drops the other
//! side's, and merges the remainder into a single cube ordered by ascending
//! wavelength.

use ndarray::Array3;

use crate::error::ConvertError;
use crate::raster::{BandMetadata, HyperspectralCube, Spectrometer};
use crate::request::JoinPriority;

/// Result of fusing two cubes, with the overlap bookkeeping the report needs.
#[derive(Debug)]
pub struct FusedCube {
    pub cube: HyperspectralCube,
    /// Bands of the non-prioritized spectrometer dropped in the overlap.
    pub overlap_dropped: usize,
    /// Which spectrometer lost its overlap bands.
    pub dropped_from: Spectrometer,
}

/// Fuse VNIR and SWIR cubes into one, resolving the spectral overlap by
/// `priority`.
///
/// Fails with `IncompatibleGrids` when the spatial dimensions differ; band
/// counts are free to differ.
pub fn fuse_cubes(
    vnir: &HyperspectralCube,
    swir: &HyperspectralCube,
    priority: JoinPriority,
) -> Result<FusedCube, ConvertError> {
    if vnir.rows() != swir.rows() || vnir.cols() != swir.cols() {
        return Err(ConvertError::IncompatibleGrids {
            left_rows: vnir.rows(),
            left_cols: vnir.cols(),
            right_rows: swir.rows(),
            right_cols: swir.cols(),
        });
    }

    let (vnir_lo, vnir_hi) = cube_range(vnir);
    let (swir_lo, swir_hi) = cube_range(swir);
    let overlap_lo = vnir_lo.max(swir_lo);
    let overlap_hi = vnir_hi.min(swir_hi);
    let in_overlap = |w: f32| overlap_lo <= overlap_hi && w >= overlap_lo && w <= overlap_hi;

    let (keep_all, trimmed, dropped_from) = match priority {
        JoinPriority::Swir => (swir, vnir, Spectrometer::Vnir),
        JoinPriority::Vnir => (vnir, swir, Spectrometer::Swir),
    };

    // (source cube, band index, wavelength) for every band that survives.
    let mut picks: Vec<(&HyperspectralCube, usize, f32)> = Vec::new();
    for (i, band) in trimmed.meta().bands.iter().enumerate() {
        if !in_overlap(band.wavelength) {
            picks.push((trimmed, i, band.wavelength));
        }
    }
    let overlap_dropped = trimmed.band_count() - picks.len();
    for (i, band) in keep_all.meta().bands.iter().enumerate() {
        picks.push((keep_all, i, band.wavelength));
    }
    picks.sort_by(|a, b| a.2.total_cmp(&b.2));

    log::debug!(
        "fusing {} VNIR + {} SWIR bands, overlap [{overlap_lo}, {overlap_hi}] nm, \
         {overlap_dropped} {} band(s) dropped",
        vnir.band_count(),
        swir.band_count(),
        dropped_from.name()
    );

    let (rows, cols) = (vnir.rows(), vnir.cols());
    let mut data = Array3::<f32>::zeros((rows, cols, picks.len()));
    let mut bands = Vec::with_capacity(picks.len());
    for (out_b, (src, src_b, _)) in picks.iter().enumerate() {
        data.index_axis_mut(ndarray::Axis(2), out_b)
            .assign(&src.data().index_axis(ndarray::Axis(2), *src_b));
        bands.push(src.meta().bands[*src_b]);
    }

    Ok(FusedCube {
        cube: HyperspectralCube::new(data, BandMetadata::new(bands)),
        overlap_dropped,
        dropped_from,
    })
}

fn cube_range(cube: &HyperspectralCube) -> (f32, f32) {
    cube.meta().range().unwrap_or((f32::NAN, f32::NAN))
}
