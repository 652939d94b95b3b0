//! ENVI format writer and reader.
//!
//! The ENVI format is a raw band-sequential binary file paired with a small
//! text header (`.hdr`). We write 32-bit little-endian floats (`data type =
//! 4`, `byte order = 0`, `interleave = bsq`) and carry band names,
//! wavelength/FWHM lists and `map info` in the header.
//!
//! The reader exists so that written products can be verified (and so other
//! tooling in this crate can ingest its own output); it only accepts the
//! layout the writer produces.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ndarray::Array3;

use crate::error::ConvertError;
use crate::raster::{BandMetadata, GeoTransform, Georeferencing};

/// Everything read back from an ENVI data/header pair.
#[derive(Debug)]
pub struct EnviContents {
    /// Pixel data in (rows x cols x bands) order.
    pub data: Array3<f32>,
    pub band_names: Vec<String>,
    pub wavelengths: Vec<f32>,
    pub fwhm: Vec<f32>,
    /// Raw `map info` entry, when the file is georeferenced.
    pub map_info: Option<String>,
}

/// Path of the text header belonging to an ENVI data file.
pub fn header_path(data_path: &Path) -> PathBuf {
    data_path.with_extension("hdr")
}

/// Write a cube or layer stack as ENVI BSQ + header.
pub fn write_envi(
    data_path: &Path,
    data: &Array3<f32>,
    band_names: &[String],
    spectral: Option<&BandMetadata>,
    georef: &Georeferencing,
) -> Result<(), ConvertError> {
    let (rows, cols, bands) = dims(data);

    let file = File::create(data_path).map_err(ConvertError::Io)?;
    let mut writer = BufWriter::new(file);
    // Band-sequential: all of band 0, then band 1, ...
    for b in 0..bands {
        for r in 0..rows {
            for c in 0..cols {
                writer
                    .write_all(&data[[r, c, b]].to_le_bytes())
                    .map_err(ConvertError::Io)?;
            }
        }
    }
    writer.flush().map_err(ConvertError::Io)?;

    let header = render_header(rows, cols, bands, band_names, spectral, georef);
    std::fs::write(header_path(data_path), header).map_err(ConvertError::Io)?;
    Ok(())
}

fn dims(data: &Array3<f32>) -> (usize, usize, usize) {
    let s = data.shape();
    (s[0], s[1], s[2])
}

fn render_header(
    rows: usize,
    cols: usize,
    bands: usize,
    band_names: &[String],
    spectral: Option<&BandMetadata>,
    georef: &Georeferencing,
) -> String {
    let mut hdr = String::from("ENVI\n");
    hdr.push_str(&format!("samples = {cols}\n"));
    hdr.push_str(&format!("lines = {rows}\n"));
    hdr.push_str(&format!("bands = {bands}\n"));
    hdr.push_str("header offset = 0\n");
    hdr.push_str("file type = ENVI Standard\n");
    hdr.push_str("data type = 4\n");
    hdr.push_str("interleave = bsq\n");
    hdr.push_str("byte order = 0\n");

    if let Some(map_info) = map_info_entry(georef) {
        hdr.push_str(&format!("map info = {{{map_info}}}\n"));
    }
    if !band_names.is_empty() {
        hdr.push_str(&format!("band names = {{{}}}\n", band_names.join(", ")));
    }
    if let Some(meta) = spectral {
        hdr.push_str("wavelength units = Nanometers\n");
        hdr.push_str(&format!("wavelength = {{{}}}\n", join_floats(&meta.wavelengths())));
        let fwhms: Vec<f32> = meta.bands.iter().map(|b| b.fwhm).collect();
        hdr.push_str(&format!("fwhm = {{{}}}\n", join_floats(&fwhms)));
    }
    hdr
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format!("{v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_info_entry(georef: &Georeferencing) -> Option<String> {
    match georef {
        Georeferencing::Swath => None,
        Georeferencing::Geographic { transform } => Some(format!(
            "Geographic Lat/Lon, 1.0, 1.0, {}, {}, {}, {}, WGS-84, units=Degrees",
            transform.origin_x,
            transform.origin_y,
            transform.pixel_width,
            transform.pixel_height.abs()
        )),
        Georeferencing::Projected { epsg, transform } => Some(utm_map_info(*epsg, transform)),
    }
}

fn utm_map_info(epsg: u32, transform: &GeoTransform) -> String {
    let cell = format!(
        "1.0, 1.0, {}, {}, {}, {}",
        transform.origin_x,
        transform.origin_y,
        transform.pixel_width,
        transform.pixel_height.abs()
    );
    match epsg {
        32601..=32660 => format!("UTM, {cell}, {}, North, WGS-84, units=Meters", epsg - 32600),
        32701..=32760 => format!("UTM, {cell}, {}, South, WGS-84, units=Meters", epsg - 32700),
        _ => format!("Arbitrary, {cell}, units=Meters"),
    }
}

/// Read back an ENVI data/header pair written by [`write_envi`].
pub fn read_envi(data_path: &Path) -> Result<EnviContents, ConvertError> {
    let hdr_path = header_path(data_path);
    let header = std::fs::read_to_string(&hdr_path).map_err(ConvertError::Io)?;
    let fields = parse_header(&hdr_path, &header)?;

    let rows = required_usize(&fields, "lines", &hdr_path)?;
    let cols = required_usize(&fields, "samples", &hdr_path)?;
    let bands = required_usize(&fields, "bands", &hdr_path)?;

    for (key, expected) in [("data type", "4"), ("interleave", "bsq"), ("byte order", "0")] {
        let got = fields.get(key).map(String::as_str);
        if got != Some(expected) {
            return Err(ConvertError::EnviHeader {
                path: hdr_path.clone(),
                message: format!(
                    "unsupported {key} {:?} (only {expected} is understood)",
                    got.unwrap_or("<missing>")
                ),
            });
        }
    }

    let mut raw = Vec::new();
    let file = File::open(data_path).map_err(ConvertError::Io)?;
    BufReader::new(file)
        .read_to_end(&mut raw)
        .map_err(ConvertError::Io)?;
    let expected = rows * cols * bands * 4;
    if raw.len() != expected {
        return Err(ConvertError::EnviHeader {
            path: hdr_path,
            message: format!(
                "data file is {} bytes, header implies {expected}",
                raw.len()
            ),
        });
    }

    let mut data = Array3::<f32>::zeros((rows, cols, bands));
    let mut offset = 0;
    for b in 0..bands {
        for r in 0..rows {
            for c in 0..cols {
                let bytes: [u8; 4] = raw[offset..offset + 4].try_into().expect("length checked");
                data[[r, c, b]] = f32::from_le_bytes(bytes);
                offset += 4;
            }
        }
    }

    Ok(EnviContents {
        data,
        band_names: list_field(&fields, "band names").unwrap_or_default(),
        wavelengths: float_list(&fields, "wavelength"),
        fwhm: float_list(&fields, "fwhm"),
        map_info: fields.get("map info").cloned(),
    })
}

/// Parse `key = value` and `key = { multi, line, list }` entries.
fn parse_header(
    path: &Path,
    header: &str,
) -> Result<std::collections::BTreeMap<String, String>, ConvertError> {
    let mut fields = std::collections::BTreeMap::new();
    let mut lines = header.lines();
    match lines.next() {
        Some(first) if first.trim() == "ENVI" => {}
        _ => {
            return Err(ConvertError::EnviHeader {
                path: path.to_path_buf(),
                message: "missing ENVI magic line".to_string(),
            })
        }
    }

    let mut pending: Option<(String, String)> = None;
    for line in lines {
        if let Some((key, mut value)) = pending.take() {
            value.push(' ');
            value.push_str(line.trim());
            if value.ends_with('}') {
                fields.insert(key, strip_braces(&value));
            } else {
                pending = Some((key, value));
            }
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim().to_string();
        if value.starts_with('{') && !value.ends_with('}') {
            pending = Some((key, value));
        } else if value.starts_with('{') {
            fields.insert(key, strip_braces(&value));
        } else {
            fields.insert(key, value);
        }
    }
    Ok(fields)
}

fn strip_braces(value: &str) -> String {
    value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .to_string()
}

fn required_usize(
    fields: &std::collections::BTreeMap<String, String>,
    key: &str,
    path: &Path,
) -> Result<usize, ConvertError> {
    fields
        .get(key)
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| ConvertError::EnviHeader {
            path: path.to_path_buf(),
            message: format!("missing or non-numeric '{key}'"),
        })
}

fn list_field(
    fields: &std::collections::BTreeMap<String, String>,
    key: &str,
) -> Option<Vec<String>> {
    fields
        .get(key)
        .map(|v| v.split(',').map(|item| item.trim().to_string()).collect())
}

fn float_list(fields: &std::collections::BTreeMap<String, String>, key: &str) -> Vec<f32> {
    list_field(fields, key)
        .map(|items| items.iter().filter_map(|i| i.parse::<f32>().ok()).collect())
        .unwrap_or_default()
}
