//! Hyperspectral cube and per-band spectral metadata.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Center wavelength and bandwidth of one sensor band, both in nanometres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectralBand {
    /// Center wavelength (nm).
    pub wavelength: f32,
    /// Full width at half maximum (nm).
    pub fwhm: f32,
}

impl SpectralBand {
    pub fn new(wavelength: f32, fwhm: f32) -> Self {
        Self { wavelength, fwhm }
    }
}

/// Ordered per-band metadata for one cube.
///
/// Invariant: `len()` equals the band count of the cube it describes; the
/// pairing is enforced by [`HyperspectralCube::new`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandMetadata {
    pub bands: Vec<SpectralBand>,
}

impl BandMetadata {
    pub fn new(bands: Vec<SpectralBand>) -> Self {
        Self { bands }
    }

    /// Build from parallel wavelength/FWHM slices.
    pub fn from_pairs(wavelengths: &[f32], fwhms: &[f32]) -> Self {
        let bands = wavelengths
            .iter()
            .zip(fwhms)
            .map(|(&w, &f)| SpectralBand::new(w, f))
            .collect();
        Self { bands }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Center wavelengths in band order.
    pub fn wavelengths(&self) -> Vec<f32> {
        self.bands.iter().map(|b| b.wavelength).collect()
    }

    /// Covered wavelength range (min, max). `None` for an empty list.
    pub fn range(&self) -> Option<(f32, f32)> {
        let mut iter = self.bands.iter().map(|b| b.wavelength);
        let first = iter.next()?;
        let mut lo = first;
        let mut hi = first;
        for w in iter {
            if w < lo {
                lo = w;
            }
            if w > hi {
                hi = w;
            }
        }
        Some((lo, hi))
    }

    /// Nominal spectral sampling: covered range divided by interval count.
    ///
    /// Zero for lists with fewer than two bands.
    pub fn nominal_sampling(&self) -> f32 {
        if self.bands.len() < 2 {
            return 0.0;
        }
        let (lo, hi) = self.range().expect("non-empty checked above");
        (hi - lo) / (self.bands.len() - 1) as f32
    }
}

/// A hyperspectral cube: reflectance values in (rows x cols x bands) order
/// plus the matching band metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct HyperspectralCube {
    data: Array3<f32>,
    meta: BandMetadata,
}

impl HyperspectralCube {
    /// Build a cube, checking the band-count invariant.
    ///
    /// # Panics
    /// Panics if `meta.len()` differs from the band axis of `data`. The
    /// reader and every pipeline stage construct both sides together, so a
    /// mismatch is a programming error, not an input error.
    pub fn new(data: Array3<f32>, meta: BandMetadata) -> Self {
        assert_eq!(
            data.shape()[2],
            meta.len(),
            "band metadata length must equal the cube band count"
        );
        Self { data, meta }
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn meta(&self) -> &BandMetadata {
        &self.meta
    }

    pub fn rows(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn cols(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn band_count(&self) -> usize {
        self.data.shape()[2]
    }

    /// Consume the cube, returning its parts.
    pub fn into_parts(self) -> (Array3<f32>, BandMetadata) {
        (self.data, self.meta)
    }

    /// A new cube with the same metadata and vertically flipped rows.
    ///
    /// Swath cubes are stored with the first line southernmost; flipping
    /// makes the array north-up without touching georeferencing.
    pub fn flipped_north_up(&self) -> Self {
        let mut data = self.data.clone();
        data.invert_axis(ndarray::Axis(0));
        Self {
            data,
            meta: self.meta.clone(),
        }
    }
}
