//! Nearest-wavelength band selection.
//!
//! For each requested wavelength the band with the minimum absolute
//! wavelength difference is selected; ties break toward the lower band
//! index. A request is rejected with `InvalidWavelength` when it falls
//! outside the covered range by more than half the nominal spectral
//! sampling — inside that range the nearest band always wins, even across
//! gaps in the band list.

use ndarray::Array3;

use crate::error::ConvertError;
use crate::raster::{BandMetadata, HyperspectralCube};

/// Index of the band nearest to `wavelength`, ties toward the lower index.
///
/// Returns `None` for an empty band list.
pub fn nearest_band(meta: &BandMetadata, wavelength: f32) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, band) in meta.bands.iter().enumerate() {
        let dist = (band.wavelength - wavelength).abs();
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}

/// Resolve a requested wavelength list to a sorted, deduplicated set of
/// band indices.
pub fn resolve_bands(
    meta: &BandMetadata,
    requested: &[f32],
) -> Result<Vec<usize>, ConvertError> {
    let (min, max) = meta.range().ok_or_else(|| {
        ConvertError::InvalidRequest("cannot select bands from an empty cube".to_string())
    })?;
    let tolerance = meta.nominal_sampling() / 2.0;

    let mut indices = Vec::with_capacity(requested.len());
    for &wl in requested {
        if wl < min - tolerance || wl > max + tolerance {
            return Err(ConvertError::InvalidWavelength {
                requested: wl,
                min,
                max,
                tolerance,
            });
        }
        // Range is non-empty, so a nearest band always exists.
        indices.push(nearest_band(meta, wl).expect("non-empty band list"));
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

/// Reduce a cube to the bands nearest the requested wavelengths.
///
/// The output band order is ascending wavelength (band index order, which is
/// the same thing for sensor band lists). Duplicate hits collapse to one
/// band.
pub fn select_bands(
    cube: &HyperspectralCube,
    requested: &[f32],
) -> Result<HyperspectralCube, ConvertError> {
    let indices = resolve_bands(cube.meta(), requested)?;
    log::debug!(
        "band selection: {} requested -> {} of {} bands kept",
        requested.len(),
        indices.len(),
        cube.band_count()
    );
    Ok(take_bands(cube, &indices))
}

/// Copy the given band indices out of a cube, preserving order.
pub fn take_bands(cube: &HyperspectralCube, indices: &[usize]) -> HyperspectralCube {
    let (rows, cols) = (cube.rows(), cube.cols());
    let mut data = Array3::<f32>::zeros((rows, cols, indices.len()));
    for (out_b, &src_b) in indices.iter().enumerate() {
        data.index_axis_mut(ndarray::Axis(2), out_b)
            .assign(&cube.data().index_axis(ndarray::Axis(2), src_b));
    }
    let meta = BandMetadata::new(indices.iter().map(|&i| cube.meta().bands[i]).collect());
    HyperspectralCube::new(data, meta)
}
