//! GeoTIFF writer and reader.
//!
//! Cubes are written as multi-page TIFFs: one 32-bit float grayscale page
//! per band, in band order. Georeferencing travels in the standard GeoTIFF
//! tags on the first page (ModelPixelScale, ModelTiepoint, GeoKeyDirectory)
//! plus the GDAL nodata convention for the NaN fill used by unmapped cells.
//!
//! The reader exists for verification of written products; it decodes every
//! page and the georeferencing tags back.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::{TiffError, TiffFormatError};

use crate::error::ConvertError;
use crate::raster::{GeoTransform, Georeferencing};

// GeoTIFF and GDAL private tags.
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

// GeoKey ids.
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

/// Everything read back from a written GeoTIFF.
#[derive(Debug)]
pub struct GeoTiffContents {
    /// Pixel data in (rows x cols x bands) order, one band per page.
    pub data: Array3<f32>,
    pub pixel_scale: Option<Vec<f64>>,
    pub tiepoint: Option<Vec<f64>>,
    pub geo_keys: Option<Vec<u32>>,
}

impl GeoTiffContents {
    /// EPSG code recovered from the geokey directory, if present.
    pub fn epsg(&self) -> Option<u32> {
        let keys = self.geo_keys.as_ref()?;
        if keys.len() < 4 {
            return None;
        }
        // Entries of four shorts follow the four-short header.
        keys[4..].chunks_exact(4).find_map(|entry| {
            if entry[0] == u32::from(GEOGRAPHIC_TYPE) || entry[0] == u32::from(PROJECTED_CS_TYPE) {
                Some(entry[3])
            } else {
                None
            }
        })
    }
}

/// Write a cube or layer stack as a multi-page GeoTIFF.
pub fn write_geotiff(
    path: &Path,
    data: &Array3<f32>,
    georef: &Georeferencing,
) -> Result<(), ConvertError> {
    let shape = data.shape();
    let (rows, cols, bands) = (shape[0], shape[1], shape[2]);
    let tiff_err = |source: TiffError| ConvertError::GeoTiffWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(ConvertError::Io)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = TiffEncoder::new(&mut writer).map_err(tiff_err)?;

    for b in 0..bands {
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(cols as u32, rows as u32)
            .map_err(tiff_err)?;
        if b == 0 {
            // Georeferencing and nodata tags live on the first page; GDAL
            // and friends read them from there.
            image
                .encoder()
                .write_tag(Tag::Unknown(GDAL_NODATA), "nan")
                .map_err(tiff_err)?;
            if let Some(transform) = georef.transform() {
                let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
                let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
                let keys = geo_key_directory(georef);
                image
                    .encoder()
                    .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
                    .map_err(tiff_err)?;
                image
                    .encoder()
                    .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
                    .map_err(tiff_err)?;
                image
                    .encoder()
                    .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &keys[..])
                    .map_err(tiff_err)?;
            }
        }
        let band: Vec<f32> = data
            .index_axis(ndarray::Axis(2), b)
            .iter()
            .copied()
            .collect();
        image.write_data(&band).map_err(tiff_err)?;
    }
    drop(encoder);
    writer.flush().map_err(ConvertError::Io)?;
    Ok(())
}

/// Build the GeoKeyDirectory short array for a georeferenced raster.
fn geo_key_directory(georef: &Georeferencing) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::new();
    match georef {
        Georeferencing::Swath => {}
        Georeferencing::Geographic { .. } => {
            keys.push([GT_MODEL_TYPE, 0, 1, 2]); // geographic model
            keys.push([GT_RASTER_TYPE, 0, 1, 1]); // pixel-is-area
            keys.push([GEOGRAPHIC_TYPE, 0, 1, 4326]);
        }
        Georeferencing::Projected { epsg, .. } => {
            keys.push([GT_MODEL_TYPE, 0, 1, 1]); // projected model
            keys.push([GT_RASTER_TYPE, 0, 1, 1]);
            keys.push([PROJECTED_CS_TYPE, 0, 1, *epsg as u16]);
        }
    }
    let mut directory = vec![1, 1, 0, keys.len() as u16];
    for key in keys {
        directory.extend_from_slice(&key);
    }
    directory
}

/// Read back a multi-page GeoTIFF written by [`write_geotiff`].
pub fn read_geotiff(path: &Path) -> Result<GeoTiffContents, ConvertError> {
    let read_err = |message: String| ConvertError::GeoTiffRead {
        path: path.to_path_buf(),
        message,
    };
    let tiff_err = |source: TiffError| read_err(source.to_string());

    let file = File::open(path).map_err(ConvertError::Io)?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_err)?;

    let (cols, rows) = decoder.dimensions().map_err(tiff_err)?;
    let pixel_scale =
        optional_f64_vec(&mut decoder, Tag::Unknown(MODEL_PIXEL_SCALE)).map_err(tiff_err)?;
    let tiepoint =
        optional_f64_vec(&mut decoder, Tag::Unknown(MODEL_TIEPOINT)).map_err(tiff_err)?;
    let geo_keys =
        optional_u32_vec(&mut decoder, Tag::Unknown(GEO_KEY_DIRECTORY)).map_err(tiff_err)?;

    let mut bands: Vec<Vec<f32>> = Vec::new();
    loop {
        match decoder.read_image().map_err(tiff_err)? {
            DecodingResult::F32(values) => bands.push(values),
            _ => {
                return Err(read_err(format!(
                    "page {} is not 32-bit float data",
                    bands.len()
                )))
            }
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(tiff_err)?;
        let next_dims = decoder.dimensions().map_err(tiff_err)?;
        if next_dims != (cols, rows) {
            return Err(read_err(format!(
                "page {} dimensions {next_dims:?} differ from first page ({cols}, {rows})",
                bands.len()
            )));
        }
    }

    let (rows, cols) = (rows as usize, cols as usize);
    let mut data = Array3::<f32>::zeros((rows, cols, bands.len()));
    for (b, band) in bands.iter().enumerate() {
        if band.len() != rows * cols {
            return Err(read_err(format!(
                "page {b} holds {} samples, expected {}",
                band.len(),
                rows * cols
            )));
        }
        for r in 0..rows {
            for c in 0..cols {
                data[[r, c, b]] = band[r * cols + c];
            }
        }
    }

    Ok(GeoTiffContents {
        data,
        pixel_scale,
        tiepoint,
        geo_keys,
    })
}

/// Recover a [`GeoTransform`] from pixel-scale and tiepoint tags.
pub fn transform_from_tags(pixel_scale: &[f64], tiepoint: &[f64]) -> Option<GeoTransform> {
    if pixel_scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    Some(GeoTransform::north_up(
        tiepoint[3],
        tiepoint[4],
        pixel_scale[0],
        pixel_scale[1],
    ))
}

fn optional_f64_vec<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<f64>>, TiffError> {
    match decoder.get_tag_f64_vec(tag) {
        Ok(values) => Ok(Some(values)),
        Err(TiffError::FormatError(TiffFormatError::RequiredTagNotFound(_))) => Ok(None),
        Err(err) => Err(err),
    }
}

fn optional_u32_vec<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<u32>>, TiffError> {
    match decoder.get_tag_u32_vec(tag) {
        Ok(values) => Ok(Some(values)),
        Err(TiffError::FormatError(TiffFormatError::RequiredTagNotFound(_))) => Ok(None),
        Err(err) => Err(err),
    }
}
