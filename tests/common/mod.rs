//! Shared builders for integration tests: small synthetic scenes with
//! known band layouts and a regular geolocation grid.
#![allow(dead_code)]

use ndarray::{Array2, Array3};

use prisma_convert::raster::{
    BandMetadata, GeoTransform, Geolocation, HyperspectralCube, L2Scene, ProcessingLevel,
    SpectralBand, SunGeometry,
};

pub const ROWS: usize = 6;
pub const COLS: usize = 5;

/// VNIR-like band layout: visible bands plus two bands inside the
/// spectrometer overlap.
pub const VNIR_WAVELENGTHS: [f32; 5] = [447.0, 551.0, 649.0, 930.0, 1000.0];

/// SWIR-like band layout starting inside the overlap.
pub const SWIR_WAVELENGTHS: [f32; 4] = [920.0, 1010.0, 1500.0, 2400.0];

/// A cube whose every value is `tag + band_index`, so data provenance is
/// checkable after selection/fusion/placement.
pub fn tagged_cube(wavelengths: &[f32], tag: f32) -> HyperspectralCube {
    let mut data = Array3::<f32>::zeros((ROWS, COLS, wavelengths.len()));
    for b in 0..wavelengths.len() {
        data.index_axis_mut(ndarray::Axis(2), b).fill(tag + b as f32);
    }
    let meta = BandMetadata::new(
        wavelengths
            .iter()
            .map(|&w| SpectralBand::new(w, 10.0))
            .collect(),
    );
    HyperspectralCube::new(data, meta)
}

/// Regular north-up geolocation over the test grid.
pub fn regular_geolocation() -> Geolocation {
    let mut lat = Array2::<f32>::zeros((ROWS, COLS));
    let mut lon = Array2::<f32>::zeros((ROWS, COLS));
    for r in 0..ROWS {
        for c in 0..COLS {
            lat[[r, c]] = 45.0 - r as f32 * 0.01;
            lon[[r, c]] = 9.0 + c as f32 * 0.01;
        }
    }
    Geolocation {
        latitude: lat,
        longitude: lon,
    }
}

pub fn sun_geometry() -> SunGeometry {
    SunGeometry {
        acquisition_time: "2020-04-24T10:30:00.000Z".to_string(),
        sun_zenith: 35.2,
        sun_azimuth: 152.7,
    }
}

/// A 2B swath scene with both spectrometer cubes and geolocation.
pub fn swath_scene() -> L2Scene {
    L2Scene {
        product_id: "PRS_SWATH_TEST".to_string(),
        level: Some(ProcessingLevel::L2B),
        vnir: Some(tagged_cube(&VNIR_WAVELENGTHS, 100.0)),
        swir: Some(tagged_cube(&SWIR_WAVELENGTHS, 200.0)),
        geolocation: Some(regular_geolocation()),
        sun_geometry: sun_geometry(),
        ..Default::default()
    }
}

/// Write a miniature 2B product file the reader understands: two small
/// cubes (one dead VNIR band), geolocation, angle fields, scale and
/// wavelength attributes.
#[cfg(feature = "hdf5")]
pub fn write_fixture_product(path: &std::path::Path) -> hdf5::Result<()> {
    use hdf5::types::VarLenAscii;

    const LINES: usize = 6;
    const SAMPLES: usize = 5;

    let file = hdf5::File::create(path)?;
    let swaths = file.create_group("HDFEOS")?.create_group("SWATHS")?;
    let hco = swaths.create_group("PRS_L2B_HCO")?;
    let data_fields = hco.create_group("Data Fields")?;
    let geo_fields = hco.create_group("Geolocation Fields")?;
    let geom_fields = hco.create_group("Geometric Fields")?;

    // VNIR: 4 slots, slot 1 dead (zero center wavelength). Counts encode
    // (band, row, col) so scaled values are recognizable.
    let vnir_slots = 4usize;
    let mut vnir = vec![0u16; LINES * vnir_slots * SAMPLES];
    for r in 0..LINES {
        for b in 0..vnir_slots {
            for c in 0..SAMPLES {
                vnir[(r * vnir_slots + b) * SAMPLES + c] = (b * 1000 + r * 10 + c) as u16;
            }
        }
    }
    data_fields
        .new_dataset::<u16>()
        .shape((LINES, vnir_slots, SAMPLES))
        .create("VNIR_Cube")?
        .write_raw(&vnir)?;

    let swir_slots = 3usize;
    let mut swir = vec![0u16; LINES * swir_slots * SAMPLES];
    for r in 0..LINES {
        for b in 0..swir_slots {
            for c in 0..SAMPLES {
                swir[(r * swir_slots + b) * SAMPLES + c] = (20000 + b * 1000 + r * 10 + c) as u16;
            }
        }
    }
    data_fields
        .new_dataset::<u16>()
        .shape((LINES, swir_slots, SAMPLES))
        .create("SWIR_Cube")?
        .write_raw(&swir)?;

    // Geolocation: regular north-up grid.
    let mut lat = vec![0.0f32; LINES * SAMPLES];
    let mut lon = vec![0.0f32; LINES * SAMPLES];
    for r in 0..LINES {
        for c in 0..SAMPLES {
            lat[r * SAMPLES + c] = 45.0 - r as f32 * 0.01;
            lon[r * SAMPLES + c] = 9.0 + c as f32 * 0.01;
        }
    }
    geo_fields
        .new_dataset::<f32>()
        .shape((LINES, SAMPLES))
        .create("Latitude")?
        .write_raw(&lat)?;
    geo_fields
        .new_dataset::<f32>()
        .shape((LINES, SAMPLES))
        .create("Longitude")?
        .write_raw(&lon)?;

    for (name, value) in [
        ("Observing_Angle", 3.5f32),
        ("Rel_Azimuth_Angle", 120.0),
        ("Solar_Zenith_Angle", 35.2),
    ] {
        geom_fields
            .new_dataset::<f32>()
            .shape((LINES, SAMPLES))
            .create(name)?
            .write_raw(&vec![value; LINES * SAMPLES])?;
    }

    // Root attributes: wavelength lists, scaling, sun geometry.
    let vnir_cw = [447.0f32, 0.0, 551.0, 649.0];
    let vnir_fwhm = [10.0f32, 0.0, 9.5, 9.0];
    let swir_cw = [920.0f32, 1500.0, 2400.0];
    let swir_fwhm = [11.0f32, 10.5, 12.0];
    file.new_attr::<f32>()
        .shape(vnir_cw.len())
        .create("List_Cw_Vnir")?
        .write_raw(&vnir_cw)?;
    file.new_attr::<f32>()
        .shape(vnir_fwhm.len())
        .create("List_Fwhm_Vnir")?
        .write_raw(&vnir_fwhm)?;
    file.new_attr::<f32>()
        .shape(swir_cw.len())
        .create("List_Cw_Swir")?
        .write_raw(&swir_cw)?;
    file.new_attr::<f32>()
        .shape(swir_fwhm.len())
        .create("List_Fwhm_Swir")?
        .write_raw(&swir_fwhm)?;

    for (name, value) in [
        ("L2ScaleVnirMin", 0.0f32),
        ("L2ScaleVnirMax", 1.0),
        ("L2ScaleSwirMin", 0.0),
        ("L2ScaleSwirMax", 1.0),
    ] {
        file.new_attr::<f32>().create(name)?.write_scalar(&value)?;
    }
    file.new_attr::<f64>()
        .create("Sun_zenith_angle")?
        .write_scalar(&35.2f64)?;
    file.new_attr::<f64>()
        .create("Sun_azimuth_angle")?
        .write_scalar(&152.7f64)?;
    file.new_attr::<VarLenAscii>()
        .create("Processing_Level")?
        .write_scalar(&VarLenAscii::from_ascii("2B").expect("ascii"))?;
    file.new_attr::<VarLenAscii>()
        .create("Product_StartTime")?
        .write_scalar(&VarLenAscii::from_ascii("2020-04-24T10:30:00.000Z").expect("ascii"))?;

    Ok(())
}

/// A 2D scene already registered on a UTM grid.
pub fn projected_scene() -> L2Scene {
    L2Scene {
        product_id: "PRS_UTM_TEST".to_string(),
        level: Some(ProcessingLevel::L2D),
        vnir: Some(tagged_cube(&VNIR_WAVELENGTHS, 100.0)),
        swir: Some(tagged_cube(&SWIR_WAVELENGTHS, 200.0)),
        projected: Some((
            32632,
            GeoTransform::north_up(599985.0, 4900015.0, 30.0, 30.0),
        )),
        sun_geometry: sun_geometry(),
        ..Default::default()
    }
}
