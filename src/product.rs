//! PRISMA Level-2 HDF5 product reader.
//!
//! Available with the `hdf5` cargo feature. The reader opens one product
//! file, keeps the handle for the duration of the call, and reads only the
//! datasets the request needs. Cubes are stored by the ground segment as
//! (lines x bands x samples) unsigned 16-bit counts; they come out of here
//! reordered to (rows x cols x bands) and scaled to reflectance with the
//! product's `L2Scale*` attributes. Band slots with a zero center
//! wavelength are dead and dropped together with their metadata.

use std::path::{Path, PathBuf};

use hdf5::types::VarLenAscii;
use ndarray::{Array2, Array3};

use crate::error::ConvertError;
use crate::pipeline::{convert_scene, ConversionReport};
use crate::raster::{
    AncillaryLayer, BandMetadata, GeoTransform, Geolocation, HyperspectralCube, L2Scene,
    ProcessingLevel, Spectrometer, SunGeometry,
};
use crate::request::ConversionRequest;

/// Convert one product file: open, read what the request needs, run the
/// pipeline, write the outputs. The one-stop entry point used by the CLI.
pub fn convert(
    input: &Path,
    out_dir: &Path,
    request: &ConversionRequest,
) -> Result<ConversionReport, ConvertError> {
    request.validate()?;
    let product = L2Product::open(input)?;
    let scene = product.read_scene(request)?;
    convert_scene(&scene, out_dir, request)
}

/// An open PRISMA Level-2 product.
pub struct L2Product {
    file: hdf5::File,
    path: PathBuf,
    level: ProcessingLevel,
    product_id: String,
}

impl L2Product {
    /// Open a product and determine its processing level.
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        let file = hdf5::File::open(path)
            .map_err(|e| ConvertError::product(path, e.to_string()))?;
        let product_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "PRISMA".to_string());
        let level = detect_level(&file, &product_id).ok_or_else(|| {
            ConvertError::product(
                path,
                "cannot determine processing level (no Processing_Level attribute, \
                 no PRS_L2x token in the file name)",
            )
        })?;
        log::debug!("opened {} as level {}", path.display(), level.token());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            level,
            product_id,
        })
    }

    pub fn level(&self) -> ProcessingLevel {
        self.level
    }

    /// Read everything the request needs into an [`L2Scene`].
    pub fn read_scene(&self, request: &ConversionRequest) -> Result<L2Scene, ConvertError> {
        let mut scene = L2Scene {
            source_path: self.path.clone(),
            product_id: self.product_id.clone(),
            level: Some(self.level),
            ..Default::default()
        };
        let hyper_needed =
            request.needs_vnir() || request.needs_swir() || request.angles || request.cloud;

        if request.needs_vnir() {
            scene.vnir = Some(self.cube(Spectrometer::Vnir, &mut scene.dead_bands_dropped)?);
        }
        if request.needs_swir() {
            scene.swir = Some(self.cube(Spectrometer::Swir, &mut scene.dead_bands_dropped)?);
        }
        if request.err_matrix {
            if request.vnir {
                scene.vnir_err = Some(self.err_cube(Spectrometer::Vnir)?);
            }
            if request.swir {
                scene.swir_err = Some(self.err_cube(Spectrometer::Swir)?);
            }
        }
        if request.angles {
            for name in ["Observing_Angle", "Rel_Azimuth_Angle", "Solar_Zenith_Angle"] {
                let data = self.read_2d(&self.field(&self.swath(), "Geometric Fields", name))?;
                scene.angles.push(AncillaryLayer::new(name, data));
            }
        }
        if request.cloud {
            let data = self.read_2d(&self.field(&self.swath(), "Data Fields", "Cloud_Mask"))?;
            scene.cloud_mask = Some(AncillaryLayer::new("Cloud_Mask", data));
        }
        if request.latlon
            || (request.base_georef && !self.level.is_projected() && hyper_needed)
        {
            scene.geolocation = Some(self.geolocation(&self.swath())?);
        }
        if request.pan {
            scene.pan = Some(self.pan_layer()?);
            if request.base_georef && !self.level.is_projected() {
                scene.pan_geolocation = Some(self.geolocation(&self.pan_swath())?);
            }
        }

        scene.sun_geometry = self.sun_geometry();
        if self.level.is_projected() {
            self.fill_projected_grids(&mut scene)?;
        }
        Ok(scene)
    }

    // ------------------------------------------------------------------
    // Dataset paths
    // ------------------------------------------------------------------

    fn swath(&self) -> String {
        format!("HDFEOS/SWATHS/PRS_L{}_HCO", self.level.token())
    }

    fn pan_swath(&self) -> String {
        format!("HDFEOS/SWATHS/PRS_L{}_PCO", self.level.token())
    }

    fn field(&self, swath: &str, group: &str, name: &str) -> String {
        format!("{swath}/{group}/{name}")
    }

    // ------------------------------------------------------------------
    // Cubes
    // ------------------------------------------------------------------

    fn cube(
        &self,
        which: Spectrometer,
        dead_bands: &mut usize,
    ) -> Result<HyperspectralCube, ConvertError> {
        let name = format!("{}_Cube", which.name());
        let dataset = self.dataset(&self.field(&self.swath(), "Data Fields", &name))?;
        let shape = dataset.shape();
        if shape.len() != 3 {
            return Err(self.malformed(format!("{name} is not a 3D dataset")));
        }
        let (lines, slots, samples) = (shape[0], shape[1], shape[2]);
        let counts: Vec<u16> = dataset
            .read_raw::<u16>()
            .map_err(|e| self.malformed(format!("reading {name}: {e}")))?;

        let (lo, hi) = self.scale_range(which.name())?;
        let meta = self.band_list(which, slots)?;
        let keep: Vec<usize> = meta
            .bands
            .iter()
            .enumerate()
            .filter(|(_, b)| b.wavelength != 0.0)
            .map(|(i, _)| i)
            .collect();
        let dropped = slots - keep.len();
        if dropped > 0 {
            log::warn!("{name}: dropping {dropped} dead band(s) with zero center wavelength");
            *dead_bands += dropped;
        }

        // (lines x bands x samples) counts -> (rows x cols x bands) reflectance.
        let scale = (hi - lo) / f32::from(u16::MAX);
        let mut data = Array3::<f32>::zeros((lines, samples, keep.len()));
        for r in 0..lines {
            for (b_out, &b_src) in keep.iter().enumerate() {
                let base = (r * slots + b_src) * samples;
                for c in 0..samples {
                    data[[r, c, b_out]] = lo + f32::from(counts[base + c]) * scale;
                }
            }
        }

        let kept_meta = BandMetadata::new(keep.iter().map(|&i| meta.bands[i]).collect());
        Ok(HyperspectralCube::new(data, kept_meta))
    }

    fn err_cube(&self, which: Spectrometer) -> Result<HyperspectralCube, ConvertError> {
        let name = format!("{}_PIXEL_L2_ERR_MATRIX", which.name());
        let dataset = self.dataset(&self.field(&self.swath(), "Data Fields", &name))?;
        let shape = dataset.shape();
        if shape.len() != 3 {
            return Err(self.malformed(format!("{name} is not a 3D dataset")));
        }
        let (lines, slots, samples) = (shape[0], shape[1], shape[2]);
        let codes: Vec<u8> = dataset
            .read_raw::<u8>()
            .map_err(|e| self.malformed(format!("reading {name}: {e}")))?;

        let meta = self.band_list(which, slots)?;
        let keep: Vec<usize> = meta
            .bands
            .iter()
            .enumerate()
            .filter(|(_, b)| b.wavelength != 0.0)
            .map(|(i, _)| i)
            .collect();

        let mut data = Array3::<f32>::zeros((lines, samples, keep.len()));
        for r in 0..lines {
            for (b_out, &b_src) in keep.iter().enumerate() {
                let base = (r * slots + b_src) * samples;
                for c in 0..samples {
                    data[[r, c, b_out]] = f32::from(codes[base + c]);
                }
            }
        }
        let kept_meta = BandMetadata::new(keep.iter().map(|&i| meta.bands[i]).collect());
        Ok(HyperspectralCube::new(data, kept_meta))
    }

    /// Wavelength/FWHM lists from the root attributes, one slot per cube
    /// band; checked against the cube's band dimension.
    fn band_list(&self, which: Spectrometer, slots: usize) -> Result<BandMetadata, ConvertError> {
        let suffix = match which {
            Spectrometer::Vnir => "Vnir",
            Spectrometer::Swir => "Swir",
        };
        let cw: Vec<f32> = self.attr_vec(&format!("List_Cw_{suffix}"))?;
        let fwhm: Vec<f32> = self.attr_vec(&format!("List_Fwhm_{suffix}"))?;
        if cw.len() != slots || fwhm.len() != slots {
            return Err(self.malformed(format!(
                "List_Cw_{suffix}/List_Fwhm_{suffix} hold {}/{} entries for {slots} bands",
                cw.len(),
                fwhm.len()
            )));
        }
        Ok(BandMetadata::from_pairs(&cw, &fwhm))
    }

    fn scale_range(&self, spectrometer: &str) -> Result<(f32, f32), ConvertError> {
        let prefix = match spectrometer {
            "VNIR" => "Vnir",
            "SWIR" => "Swir",
            other => other, // "Pan"
        };
        let lo = self.attr_scalar_f32(&format!("L2Scale{prefix}Min"))?;
        let hi = self.attr_scalar_f32(&format!("L2Scale{prefix}Max"))?;
        if hi <= lo {
            return Err(self.malformed(format!(
                "L2Scale{prefix}Min/Max define an empty range [{lo}, {hi}]"
            )));
        }
        Ok((lo, hi))
    }

    // ------------------------------------------------------------------
    // Ancillary layers
    // ------------------------------------------------------------------

    fn pan_layer(&self) -> Result<AncillaryLayer, ConvertError> {
        let path = self.field(&self.pan_swath(), "Data Fields", "Cube");
        let dataset = self.dataset(&path)?;
        let shape = dataset.shape();
        let counts: Vec<u16> = dataset
            .read_raw::<u16>()
            .map_err(|e| self.malformed(format!("reading PCO Cube: {e}")))?;
        let (rows, cols) = match shape.as_slice() {
            [rows, cols] => (*rows, *cols),
            [rows, 1, cols] => (*rows, *cols),
            other => {
                return Err(self.malformed(format!("PCO Cube has unexpected shape {other:?}")))
            }
        };
        let (lo, hi) = self.scale_range("Pan")?;
        let scale = (hi - lo) / f32::from(u16::MAX);
        let data = Array2::from_shape_vec(
            (rows, cols),
            counts.iter().map(|&dn| lo + f32::from(dn) * scale).collect(),
        )
        .map_err(|e| self.malformed(format!("PCO Cube layout: {e}")))?;
        Ok(AncillaryLayer::new("PAN", data))
    }

    fn geolocation(&self, swath: &str) -> Result<Geolocation, ConvertError> {
        let latitude = self.read_2d(&self.field(swath, "Geolocation Fields", "Latitude"))?;
        let longitude = self.read_2d(&self.field(swath, "Geolocation Fields", "Longitude"))?;
        if latitude.shape() != longitude.shape() {
            return Err(self.malformed(
                "Latitude and Longitude geolocation fields differ in shape".to_string(),
            ));
        }
        Ok(Geolocation {
            latitude,
            longitude,
        })
    }

    fn read_2d(&self, path: &str) -> Result<Array2<f32>, ConvertError> {
        let dataset = self.dataset(path)?;
        let shape = dataset.shape();
        if shape.len() != 2 {
            return Err(self.malformed(format!("{path} is not a 2D dataset")));
        }
        let values: Vec<f32> = dataset
            .read_raw::<f32>()
            .map_err(|e| self.malformed(format!("reading {path}: {e}")))?;
        Array2::from_shape_vec((shape[0], shape[1]), values)
            .map_err(|e| self.malformed(format!("{path} layout: {e}")))
    }

    // ------------------------------------------------------------------
    // Attributes and geometry
    // ------------------------------------------------------------------

    fn sun_geometry(&self) -> SunGeometry {
        SunGeometry {
            acquisition_time: self.attr_string("Product_StartTime").unwrap_or_default(),
            sun_zenith: self.attr_scalar_f64("Sun_zenith_angle").unwrap_or(f64::NAN),
            sun_azimuth: self.attr_scalar_f64("Sun_azimuth_angle").unwrap_or(f64::NAN),
        }
    }

    /// Derive the projected grids of a 2D product from its corner and EPSG
    /// attributes. Corner coordinates are cell centers.
    fn fill_projected_grids(&self, scene: &mut L2Scene) -> Result<(), ConvertError> {
        let epsg = self
            .attr_scalar_f64("Epsg_Code")
            .map_err(|_| self.malformed("2D product without Epsg_Code attribute".to_string()))?
            as u32;
        let ul_e = self.attr_scalar_f64("Product_ULcorner_easting")?;
        let ul_n = self.attr_scalar_f64("Product_ULcorner_northing")?;
        let lr_e = self.attr_scalar_f64("Product_LRcorner_easting")?;
        let lr_n = self.attr_scalar_f64("Product_LRcorner_northing")?;

        let hyper_dims = scene
            .vnir
            .as_ref()
            .map(|c| (c.rows(), c.cols()))
            .or_else(|| scene.swir.as_ref().map(|c| (c.rows(), c.cols())))
            .or_else(|| scene.angles.first().map(|l| (l.rows(), l.cols())))
            .or_else(|| scene.cloud_mask.as_ref().map(|l| (l.rows(), l.cols())))
            .or_else(|| scene.geolocation.as_ref().map(|g| (g.rows(), g.cols())));
        if let Some(dims) = hyper_dims {
            scene.projected = Some((epsg, corner_transform(ul_e, ul_n, lr_e, lr_n, dims)?));
        }
        if let Some(pan) = &scene.pan {
            scene.pan_projected = Some((
                epsg,
                corner_transform(ul_e, ul_n, lr_e, lr_n, (pan.rows(), pan.cols()))?,
            ));
        }
        Ok(())
    }

    fn attr_vec(&self, name: &str) -> Result<Vec<f32>, ConvertError> {
        self.file
            .attr(name)
            .and_then(|a| a.read_raw::<f32>())
            .map_err(|e| self.malformed(format!("attribute {name}: {e}")))
    }

    fn attr_scalar_f32(&self, name: &str) -> Result<f32, ConvertError> {
        self.file
            .attr(name)
            .and_then(|a| a.read_scalar::<f32>())
            .map_err(|e| self.malformed(format!("attribute {name}: {e}")))
    }

    fn attr_scalar_f64(&self, name: &str) -> Result<f64, ConvertError> {
        self.file
            .attr(name)
            .and_then(|a| a.read_scalar::<f64>())
            .map_err(|e| self.malformed(format!("attribute {name}: {e}")))
    }

    fn attr_string(&self, name: &str) -> Option<String> {
        self.file
            .attr(name)
            .and_then(|a| a.read_scalar::<VarLenAscii>())
            .map(|s| s.to_string())
            .ok()
    }

    /// Open a dataset, mapping a missing link to `MissingInputDataset`.
    fn dataset(&self, path: &str) -> Result<hdf5::Dataset, ConvertError> {
        if !self.link_exists(path) {
            return Err(ConvertError::MissingInputDataset {
                dataset: path.to_string(),
                path: self.path.clone(),
            });
        }
        self.file
            .dataset(path)
            .map_err(|e| self.malformed(format!("opening {path}: {e}")))
    }

    /// Stepwise link check so a missing intermediate group reads as a
    /// missing dataset rather than an HDF5 error.
    fn link_exists(&self, path: &str) -> bool {
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);
            if !self.file.link_exists(&current) {
                return false;
            }
        }
        true
    }

    fn malformed(&self, message: String) -> ConvertError {
        ConvertError::product(&self.path, message)
    }
}

/// Level from the `Processing_Level` attribute, falling back to the
/// `PRS_L2x` token in the product name.
fn detect_level(file: &hdf5::File, product_id: &str) -> Option<ProcessingLevel> {
    if let Ok(attr) = file.attr("Processing_Level") {
        if let Ok(value) = attr.read_scalar::<VarLenAscii>() {
            if let Some(level) = ProcessingLevel::parse(value.as_str().trim()) {
                return Some(level);
            }
        }
    }
    for token in ["L2B", "L2C", "L2D"] {
        if product_id.contains(token) {
            return ProcessingLevel::parse(token);
        }
    }
    None
}

fn corner_transform(
    ul_e: f64,
    ul_n: f64,
    lr_e: f64,
    lr_n: f64,
    dims: (usize, usize),
) -> Result<GeoTransform, ConvertError> {
    let (rows, cols) = dims;
    if rows < 2 || cols < 2 || lr_e <= ul_e || ul_n <= lr_n {
        return Err(ConvertError::Georeference(format!(
            "degenerate projected grid: corners ({ul_e}, {ul_n})/({lr_e}, {lr_n}) over {rows}x{cols}"
        )));
    }
    let res_x = (lr_e - ul_e) / (cols - 1) as f64;
    let res_y = (ul_n - lr_n) / (rows - 1) as f64;
    Ok(GeoTransform::north_up(
        ul_e - res_x / 2.0,
        ul_n + res_y / 2.0,
        res_x,
        res_y,
    ))
}
