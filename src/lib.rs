//! Prisma-convert: PRISMA Level-2 product converter.
//!
//! Converts PRISMA hyperspectral satellite Level-2 HDF5 imagery (sub-levels
//! 2B/2C/2D) into GeoTIFF or ENVI rasters, with optional band selection,
//! VNIR/SWIR fusion, GLT/bowtie base georeferencing and ancillary dataset
//! extraction. Side-car text tables carry the per-band wavelength/FWHM list
//! and the acquisition geometry.
//!
//! # Modules
//!
//! - [`raster`]: in-memory scene model (cubes, layers, georeferencing)
//! - [`pipeline`]: selection, fusion, georeferencing and reporting
//! - [`writer`]: GeoTIFF/ENVI serialization and side-car tables
//! - [`product`]: the HDF5 product reader (cargo feature `hdf5`)
//! - [`error`]: error types for prisma-convert operations
//!
//! The pipeline works on an [`raster::L2Scene`] already held in memory, so
//! everything except the reader itself is usable (and testable) without an
//! HDF5 installation.

pub mod error;
pub mod pipeline;
#[cfg(feature = "hdf5")]
pub mod product;
pub mod raster;
pub mod request;
pub mod writer;

pub use error::ConvertError;
pub use pipeline::{convert_scene, ConversionReport};
pub use request::{ConversionRequest, JoinPriority, OutputFormat};

#[cfg(feature = "hdf5")]
pub use product::convert;

#[cfg(feature = "hdf5")]
mod cli {
    use std::path::PathBuf;

    use clap::{Parser, ValueEnum};

    use crate::error::ConvertError;
    use crate::request::{ConversionRequest, JoinPriority, OutputFormat};

    /// The prisma-convert CLI application.
    #[derive(Parser)]
    #[command(name = "prisma-convert")]
    #[command(version, author, about)]
    pub(crate) struct Cli {
        /// PRISMA Level-2 HDF5 product to convert.
        pub input: PathBuf,

        /// Destination directory for rasters and side-car tables.
        pub out_dir: PathBuf,

        /// Write the VNIR reflectance cube.
        #[arg(long)]
        pub vnir: bool,

        /// Write the SWIR reflectance cube.
        #[arg(long)]
        pub swir: bool,

        /// Write the fused VNIR+SWIR cube.
        #[arg(long)]
        pub full: bool,

        /// Write the panchromatic layer.
        #[arg(long)]
        pub pan: bool,

        /// Write latitude/longitude as a two-layer raster.
        #[arg(long)]
        pub latlon: bool,

        /// Write the view/sun angle layers.
        #[arg(long)]
        pub angles: bool,

        /// Write the cloud mask layer.
        #[arg(long)]
        pub cloud: bool,

        /// Also write the per-pixel error matrix next to each cube.
        #[arg(long)]
        pub err_matrix: bool,

        /// Skip GLT/bowtie base georeferencing of 2B/2C scenes.
        #[arg(long)]
        pub no_base_georef: bool,

        /// Fill unmapped georeferenced cells from their 3x3 neighborhood.
        #[arg(long)]
        pub fill_gaps: bool,

        /// Spectrometer that wins the spectral overlap when fusing.
        #[arg(long, value_enum, default_value_t = JoinPriorityArg::Swir)]
        pub join_priority: JoinPriorityArg,

        /// VNIR wavelengths to keep, in nm (comma separated).
        #[arg(long, value_delimiter = ',')]
        pub selbands_vnir: Option<Vec<f32>>,

        /// SWIR wavelengths to keep, in nm (comma separated).
        #[arg(long, value_delimiter = ',')]
        pub selbands_swir: Option<Vec<f32>>,

        /// Output raster format.
        #[arg(long, value_enum, default_value_t = FormatArg::Gtiff)]
        pub format: FormatArg,

        /// Replace existing output files. Without this, a pre-existing
        /// target fails the conversion; files already written by earlier
        /// steps are not removed.
        #[arg(long)]
        pub overwrite: bool,

        /// How to render the conversion report.
        #[arg(long, value_enum, default_value_t = ReportArg::Text)]
        pub report: ReportArg,
    }

    /// CLI-side format names, decoupled from the core enum.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
    pub(crate) enum FormatArg {
        Gtiff,
        Envi,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
    pub(crate) enum JoinPriorityArg {
        Vnir,
        Swir,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
    pub(crate) enum ReportArg {
        Text,
        Json,
    }

    impl Cli {
        pub(crate) fn to_request(&self) -> ConversionRequest {
            ConversionRequest {
                vnir: self.vnir,
                swir: self.swir,
                full: self.full,
                pan: self.pan,
                latlon: self.latlon,
                angles: self.angles,
                cloud: self.cloud,
                err_matrix: self.err_matrix,
                base_georef: !self.no_base_georef,
                fill_gaps: self.fill_gaps,
                join_priority: match self.join_priority {
                    JoinPriorityArg::Vnir => JoinPriority::Vnir,
                    JoinPriorityArg::Swir => JoinPriority::Swir,
                },
                selbands_vnir: self.selbands_vnir.clone(),
                selbands_swir: self.selbands_swir.clone(),
                out_format: match self.format {
                    FormatArg::Gtiff => OutputFormat::GeoTiff,
                    FormatArg::Envi => OutputFormat::Envi,
                },
                overwrite: self.overwrite,
            }
        }
    }

    /// Run the prisma-convert CLI.
    ///
    /// This is the main entry point for the CLI, called from `main.rs`.
    pub fn run() -> Result<(), ConvertError> {
        let cli = Cli::parse();
        let request = cli.to_request();
        let report = crate::product::convert(&cli.input, &cli.out_dir, &request)?;
        match cli.report {
            ReportArg::Text => print!("{report}"),
            ReportArg::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .expect("report serialization cannot fail");
                println!("{json}");
            }
        }
        Ok(())
    }
}

#[cfg(feature = "hdf5")]
pub use cli::run;
