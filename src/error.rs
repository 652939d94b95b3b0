use std::path::PathBuf;
use thiserror::Error;

/// The main error type for prisma-convert operations.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Requested wavelength {requested} nm is outside the covered range \
         [{min}, {max}] nm (tolerance {tolerance} nm)"
    )]
    InvalidWavelength {
        requested: f32,
        min: f32,
        max: f32,
        tolerance: f32,
    },

    #[error("Incompatible spatial grids: {left_rows}x{left_cols} vs {right_rows}x{right_cols}")]
    IncompatibleGrids {
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("Output file {0} already exists (pass overwrite to replace it)")]
    OverwriteDenied(PathBuf),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Requested dataset '{dataset}' is not present in {path}")]
    MissingInputDataset { dataset: String, path: PathBuf },

    #[error("Invalid conversion request: {0}")]
    InvalidRequest(String),

    #[error("Georeferencing failed: {0}")]
    Georeference(String),

    #[error("Malformed product {path}: {message}")]
    Product { path: PathBuf, message: String },

    #[error("Failed to write GeoTIFF {path}: {source}")]
    GeoTiffWrite {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("Failed to read GeoTIFF {path}: {message}")]
    GeoTiffRead { path: PathBuf, message: String },

    #[error("Malformed ENVI header {path}: {message}")]
    EnviHeader { path: PathBuf, message: String },

    #[error("Failed to write side-car table {path}: {source}")]
    SidecarWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ConvertError {
    /// Helper for reader-level failures that carry the product path.
    pub fn product(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConvertError::Product {
            path: path.into(),
            message: message.into(),
        }
    }
}
