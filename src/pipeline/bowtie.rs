//! GLT/bowtie base georeferencing for swath scenes.
//!
//! 2B/2C products carry per-pixel latitude/longitude arrays instead of a
//! grid-to-world mapping. Base georeferencing builds a geographic lookup
//! table (GLT): every source pixel is forward-mapped onto a regular WGS84
//! grid spanning the scene's bounding box, nearest-neighbor, and the cubes
//! and layers are resampled through that table. Cells no source pixel lands
//! in stay at NaN; `fill_gaps` copies the mapping of a 3x3 neighbor into
//! them first.

use ndarray::{Array2, Array3};

use crate::error::ConvertError;
use crate::raster::{
    AncillaryLayer, GeoTransform, Geolocation, Georeferencing, HyperspectralCube,
};

/// Geographic lookup table mapping target grid cells to source pixels.
pub struct Glt {
    map: Array2<Option<(usize, usize)>>,
    transform: GeoTransform,
    /// Cells with no source pixel after gap filling.
    pub unmapped: usize,
}

impl Glt {
    /// Target grid dimensions (same as the source grid).
    pub fn dims(&self) -> (usize, usize) {
        let s = self.map.shape();
        (s[0], s[1])
    }

    /// Georeferencing of every raster resampled through this table.
    pub fn georeferencing(&self) -> Georeferencing {
        Georeferencing::Geographic {
            transform: self.transform,
        }
    }
}

/// Build the lookup table from per-pixel geolocation.
///
/// The target grid keeps the source dimensions; its spacing is derived from
/// the lat/lon bounding box over valid coordinates. Later source pixels win
/// when several land in the same cell.
pub fn build_glt(geo: &Geolocation, fill_gaps: bool) -> Result<Glt, ConvertError> {
    if geo.latitude.shape() != geo.longitude.shape() {
        let (lr, lc) = (geo.latitude.shape()[0], geo.latitude.shape()[1]);
        let (gr, gc) = (geo.longitude.shape()[0], geo.longitude.shape()[1]);
        return Err(ConvertError::IncompatibleGrids {
            left_rows: lr,
            left_cols: lc,
            right_rows: gr,
            right_cols: gc,
        });
    }
    let (rows, cols) = (geo.rows(), geo.cols());
    if rows < 2 || cols < 2 {
        return Err(ConvertError::Georeference(
            "geolocation grid is too small to georeference".to_string(),
        ));
    }

    let mut lat_min = f32::INFINITY;
    let mut lat_max = f32::NEG_INFINITY;
    let mut lon_min = f32::INFINITY;
    let mut lon_max = f32::NEG_INFINITY;
    for (&lat, &lon) in geo.latitude.iter().zip(geo.longitude.iter()) {
        if !valid_coordinate(lat, lon) {
            continue;
        }
        lat_min = lat_min.min(lat);
        lat_max = lat_max.max(lat);
        lon_min = lon_min.min(lon);
        lon_max = lon_max.max(lon);
    }
    if !lat_min.is_finite() || lat_max <= lat_min || lon_max <= lon_min {
        return Err(ConvertError::Georeference(
            "geolocation arrays contain no usable coordinate spread".to_string(),
        ));
    }

    let res_x = (lon_max - lon_min) as f64 / (cols - 1) as f64;
    let res_y = (lat_max - lat_min) as f64 / (rows - 1) as f64;

    let mut map: Array2<Option<(usize, usize)>> = Array2::from_elem((rows, cols), None);
    for r in 0..rows {
        for c in 0..cols {
            let lat = geo.latitude[[r, c]];
            let lon = geo.longitude[[r, c]];
            if !valid_coordinate(lat, lon) {
                continue;
            }
            let tc = ((lon - lon_min) as f64 / res_x).round() as isize;
            let tr = ((lat_max - lat) as f64 / res_y).round() as isize;
            if tr >= 0 && tc >= 0 && (tr as usize) < rows && (tc as usize) < cols {
                map[[tr as usize, tc as usize]] = Some((r, c));
            }
        }
    }

    if fill_gaps {
        fill_from_neighbors(&mut map);
    }
    let unmapped = map.iter().filter(|m| m.is_none()).count();
    if unmapped > 0 {
        log::warn!("GLT left {unmapped} of {} cells unmapped", rows * cols);
    }

    // Corner convention: the tiepoint coordinates are cell centers, so the
    // grid origin sits half a cell out from the extremes.
    let transform = GeoTransform::north_up(
        lon_min as f64 - res_x / 2.0,
        lat_max as f64 + res_y / 2.0,
        res_x,
        res_y,
    );

    Ok(Glt {
        map,
        transform,
        unmapped,
    })
}

/// Resample a cube through the lookup table. Unmapped cells become NaN.
pub fn apply_to_cube(glt: &Glt, cube: &HyperspectralCube) -> Result<HyperspectralCube, ConvertError> {
    let (rows, cols) = glt.dims();
    if cube.rows() != rows || cube.cols() != cols {
        return Err(ConvertError::IncompatibleGrids {
            left_rows: rows,
            left_cols: cols,
            right_rows: cube.rows(),
            right_cols: cube.cols(),
        });
    }
    let bands = cube.band_count();
    let mut out = Array3::<f32>::from_elem((rows, cols, bands), f32::NAN);
    for r in 0..rows {
        for c in 0..cols {
            if let Some((sr, sc)) = glt.map[[r, c]] {
                for b in 0..bands {
                    out[[r, c, b]] = cube.data()[[sr, sc, b]];
                }
            }
        }
    }
    Ok(HyperspectralCube::new(out, cube.meta().clone()))
}

/// Resample a single layer through the lookup table.
pub fn apply_to_layer(glt: &Glt, layer: &AncillaryLayer) -> Result<AncillaryLayer, ConvertError> {
    let (rows, cols) = glt.dims();
    if layer.rows() != rows || layer.cols() != cols {
        return Err(ConvertError::IncompatibleGrids {
            left_rows: rows,
            left_cols: cols,
            right_rows: layer.rows(),
            right_cols: layer.cols(),
        });
    }
    let mut out = Array2::<f32>::from_elem((rows, cols), f32::NAN);
    for r in 0..rows {
        for c in 0..cols {
            if let Some((sr, sc)) = glt.map[[r, c]] {
                out[[r, c]] = layer.data[[sr, sc]];
            }
        }
    }
    Ok(AncillaryLayer::new(layer.name.clone(), out))
}

fn valid_coordinate(lat: f32, lon: f32) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Copy the mapping of a 3x3 neighbor into unmapped cells.
///
/// Works on a snapshot so filled cells do not cascade into their own
/// neighbors within the same pass.
fn fill_from_neighbors(map: &mut Array2<Option<(usize, usize)>>) {
    let (rows, cols) = (map.shape()[0], map.shape()[1]);
    let snapshot = map.clone();
    for r in 0..rows {
        for c in 0..cols {
            if snapshot[[r, c]].is_some() {
                continue;
            }
            'search: for dr in -1isize..=1 {
                for dc in -1isize..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    let (nr, nc) = (r as isize + dr, c as isize + dc);
                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        continue;
                    }
                    if let Some(src) = snapshot[[nr as usize, nc as usize]] {
                        map[[r, c]] = Some(src);
                        break 'search;
                    }
                }
            }
        }
    }
}
