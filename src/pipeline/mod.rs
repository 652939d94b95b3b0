//! The conversion pipeline: Selector -> Fuser -> Georeferencer -> Writer.
//!
//! [`convert_scene`] drives one conversion over an in-memory [`L2Scene`].
//! It validates the request once, decides the georeferencing placement for
//! each grid, runs band selection and fusion, and hands every produced cube
//! or layer stack to the writer. The call is single-threaded and
//! synchronous; a failure aborts the remaining outputs, and files written
//! before the failure are left on disk (no rollback).

pub mod bowtie;
pub mod fuse;
pub mod report;
pub mod select;

pub use report::{ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity};

use std::path::Path;

use crate::error::ConvertError;
use crate::raster::{AncillaryLayer, Georeferencing, HyperspectralCube, L2Scene, Spectrometer};
use crate::request::ConversionRequest;
use crate::writer;

/// How rasters of one grid get placed into the output geometry.
enum Placement {
    /// Pass the product's projected grid through unchanged.
    Projected(Georeferencing),
    /// Resample through a geographic lookup table.
    Geographic(bowtie::Glt),
    /// No georeferencing; flip rows so the scene is north-up.
    Flip,
}

impl Placement {
    fn cube(
        &self,
        cube: &HyperspectralCube,
    ) -> Result<(HyperspectralCube, Georeferencing), ConvertError> {
        match self {
            Placement::Projected(georef) => Ok((cube.clone(), *georef)),
            Placement::Geographic(glt) => {
                Ok((bowtie::apply_to_cube(glt, cube)?, glt.georeferencing()))
            }
            Placement::Flip => Ok((cube.flipped_north_up(), Georeferencing::Swath)),
        }
    }

    fn layer(
        &self,
        layer: &AncillaryLayer,
    ) -> Result<(AncillaryLayer, Georeferencing), ConvertError> {
        match self {
            Placement::Projected(georef) => Ok((layer.clone(), *georef)),
            Placement::Geographic(glt) => {
                Ok((bowtie::apply_to_layer(glt, layer)?, glt.georeferencing()))
            }
            Placement::Flip => Ok((layer.flipped_north_up(), Georeferencing::Swath)),
        }
    }
}

/// Convert one in-memory scene, writing every requested output into
/// `out_dir` and returning the conversion report.
///
/// Already-written files are not removed when a later output fails.
pub fn convert_scene(
    scene: &L2Scene,
    out_dir: &Path,
    request: &ConversionRequest,
) -> Result<ConversionReport, ConvertError> {
    request.validate()?;
    std::fs::create_dir_all(out_dir).map_err(ConvertError::Io)?;

    let level = scene.level().token();
    let mut rep = ConversionReport::new(&scene.product_id, level, request.out_format.name());
    log::debug!(
        "converting {} (level {level}) into {}",
        scene.product_id,
        out_dir.display()
    );

    if scene.dead_bands_dropped > 0 {
        rep.add(ConversionIssue::info(
            ConversionIssueCode::DeadBandsDropped,
            format!(
                "{} dead band(s) with zero center wavelength dropped at read",
                scene.dead_bands_dropped
            ),
        ));
    }

    let hyper_requested = request.vnir
        || request.swir
        || request.full
        || request.latlon
        || request.angles
        || request.cloud;
    if hyper_requested {
        let placement = hyperspectral_placement(scene, request, &mut rep)?;
        write_hyper_outputs(scene, request, &placement, out_dir, &mut rep)?;
    }

    // Panchromatic layer, which lives on its own finer grid.
    if request.pan {
        let pan = scene.pan.as_ref().ok_or_else(|| missing(scene, "PCO Cube"))?;
        let placement = pan_placement(scene, request, &mut rep)?;
        let (layer, georef) = placement.layer(pan)?;
        let stem = writer::output_stem(&scene.product_id, level, "PAN");
        let written = writer::write_layers(
            out_dir,
            &stem,
            std::slice::from_ref(&layer),
            &georef,
            request.out_format,
            request.overwrite,
        )?;
        rep.record(written.data_path, 1);
    }

    // Acquisition geometry side-car, once per conversion.
    let geom_path = out_dir.join(format!(
        "{}.csv",
        writer::output_stem(&scene.product_id, level, "GEOM")
    ));
    if geom_path.exists() && !request.overwrite {
        return Err(ConvertError::OverwriteDenied(geom_path));
    }
    writer::sidecar::write_geometry_table(&geom_path, &scene.sun_geometry)?;
    rep.record(geom_path, 0);

    Ok(rep)
}

/// Everything that lives on the hyperspectral grid: the spectrometer cubes,
/// the fused cube, and the ancillary layer stacks.
fn write_hyper_outputs(
    scene: &L2Scene,
    request: &ConversionRequest,
    placement: &Placement,
    out_dir: &Path,
    rep: &mut ConversionReport,
) -> Result<(), ConvertError> {
    let level = scene.level().token();

    if request.vnir {
        write_spectrometer(scene, request, placement, Spectrometer::Vnir, out_dir, rep)?;
    }
    if request.swir {
        write_spectrometer(scene, request, placement, Spectrometer::Swir, out_dir, rep)?;
    }

    if request.full {
        let vnir = selected_cube(scene, request, Spectrometer::Vnir)?;
        let swir = selected_cube(scene, request, Spectrometer::Swir)?;
        let fused = fuse::fuse_cubes(&vnir, &swir, request.join_priority)?;
        if fused.overlap_dropped > 0 {
            rep.add(ConversionIssue::info(
                ConversionIssueCode::OverlapBandsDropped,
                format!(
                    "fusion dropped {} {} band(s) in the spectral overlap",
                    fused.overlap_dropped,
                    fused.dropped_from.name()
                ),
            ));
        }
        let (cube, georef) = placement.cube(&fused.cube)?;
        let stem = writer::output_stem(&scene.product_id, level, "FULL");
        let written = writer::write_cube(
            out_dir,
            &stem,
            &cube,
            &georef,
            request.out_format,
            request.overwrite,
        )?;
        record_cube(rep, written, cube.band_count());
    }

    if request.latlon {
        let geo = scene
            .geolocation
            .as_ref()
            .ok_or_else(|| missing(scene, "Geolocation Fields"))?;
        let layers = [
            AncillaryLayer::new("Latitude", geo.latitude.clone()),
            AncillaryLayer::new("Longitude", geo.longitude.clone()),
        ];
        write_layer_stack(scene, request, placement, &layers, "LATLON", out_dir, rep)?;
    }
    if request.angles {
        if scene.angles.is_empty() {
            return Err(missing(scene, "Geometric Fields"));
        }
        write_layer_stack(scene, request, placement, &scene.angles, "ANGLES", out_dir, rep)?;
    }
    if request.cloud {
        let mask = scene
            .cloud_mask
            .as_ref()
            .ok_or_else(|| missing(scene, "Cloud_Mask"))?;
        write_layer_stack(
            scene,
            request,
            placement,
            std::slice::from_ref(mask),
            "CLD",
            out_dir,
            rep,
        )?;
    }
    Ok(())
}

/// Pick the placement for the hyperspectral grid and note it on the report.
fn hyperspectral_placement(
    scene: &L2Scene,
    request: &ConversionRequest,
    rep: &mut ConversionReport,
) -> Result<Placement, ConvertError> {
    if let Some(georef) = scene.projected_georeferencing() {
        rep.add(ConversionIssue::info(
            ConversionIssueCode::PassThroughProjectionUnverified,
            "projected 2D grid passed through unchanged; its accuracy is not verified here",
        ));
        return Ok(Placement::Projected(georef));
    }
    if request.base_georef {
        let geo = scene
            .geolocation
            .as_ref()
            .ok_or_else(|| missing(scene, "Geolocation Fields"))?;
        let glt = bowtie::build_glt(geo, request.fill_gaps)?;
        if glt.unmapped > 0 {
            rep.add(ConversionIssue::warning(
                ConversionIssueCode::UnmappedCells,
                format!(
                    "{} output cell(s) have no source pixel and stay NaN",
                    glt.unmapped
                ),
            ));
        }
        return Ok(Placement::Geographic(glt));
    }
    rep.add(ConversionIssue::info(
        ConversionIssueCode::UngeoreferencedOutput,
        "base georeferencing disabled; output stays in flipped swath geometry",
    ));
    Ok(Placement::Flip)
}

/// Placement for the panchromatic grid.
fn pan_placement(
    scene: &L2Scene,
    request: &ConversionRequest,
    rep: &mut ConversionReport,
) -> Result<Placement, ConvertError> {
    if let Some((epsg, transform)) = scene.pan_projected {
        return Ok(Placement::Projected(Georeferencing::Projected {
            epsg,
            transform,
        }));
    }
    if scene.projected.is_some() {
        return Err(ConvertError::Georeference(
            "projected product carries no registration for the panchromatic grid".to_string(),
        ));
    }
    if request.base_georef {
        let geo = scene
            .pan_geolocation
            .as_ref()
            .ok_or_else(|| missing(scene, "PCO Geolocation Fields"))?;
        let glt = bowtie::build_glt(geo, request.fill_gaps)?;
        if glt.unmapped > 0 {
            rep.add(ConversionIssue::warning(
                ConversionIssueCode::UnmappedCells,
                format!(
                    "{} panchromatic cell(s) have no source pixel and stay NaN",
                    glt.unmapped
                ),
            ));
        }
        return Ok(Placement::Geographic(glt));
    }
    Ok(Placement::Flip)
}

/// Select, place and write one spectrometer cube (and its error matrix).
fn write_spectrometer(
    scene: &L2Scene,
    request: &ConversionRequest,
    placement: &Placement,
    which: Spectrometer,
    out_dir: &Path,
    rep: &mut ConversionReport,
) -> Result<(), ConvertError> {
    let level = scene.level().token();
    let cube = selected_cube(scene, request, which)?;
    let (cube, georef) = placement.cube(&cube)?;
    let stem = writer::output_stem(&scene.product_id, level, which.name());
    let written = writer::write_cube(
        out_dir,
        &stem,
        &cube,
        &georef,
        request.out_format,
        request.overwrite,
    )?;
    record_cube(rep, written, cube.band_count());

    if request.err_matrix {
        let err = match which {
            Spectrometer::Vnir => scene.vnir_err.as_ref(),
            Spectrometer::Swir => scene.swir_err.as_ref(),
        }
        .ok_or_else(|| missing(scene, &format!("{}_PIXEL_L2_ERR_MATRIX", which.name())))?;
        let err = match selection_for(request, which) {
            Some(wls) => select::select_bands(err, wls)?,
            None => err.clone(),
        };
        let (err, georef) = placement.cube(&err)?;
        let stem = writer::output_stem(&scene.product_id, level, &format!("{}_ERR", which.name()));
        let written = writer::write_cube(
            out_dir,
            &stem,
            &err,
            &georef,
            request.out_format,
            request.overwrite,
        )?;
        record_cube(rep, written, err.band_count());
    }
    Ok(())
}

/// The spectrometer cube with the request's band selection applied.
fn selected_cube(
    scene: &L2Scene,
    request: &ConversionRequest,
    which: Spectrometer,
) -> Result<HyperspectralCube, ConvertError> {
    let cube = match which {
        Spectrometer::Vnir => scene.vnir.as_ref().ok_or_else(|| missing(scene, "VNIR_Cube")),
        Spectrometer::Swir => scene.swir.as_ref().ok_or_else(|| missing(scene, "SWIR_Cube")),
    }?;
    match selection_for(request, which) {
        Some(wls) => select::select_bands(cube, wls),
        None => Ok(cube.clone()),
    }
}

fn selection_for(request: &ConversionRequest, which: Spectrometer) -> Option<&[f32]> {
    match which {
        Spectrometer::Vnir => request.selbands_vnir.as_deref(),
        Spectrometer::Swir => request.selbands_swir.as_deref(),
    }
}

fn write_layer_stack(
    scene: &L2Scene,
    request: &ConversionRequest,
    placement: &Placement,
    layers: &[AncillaryLayer],
    suffix: &str,
    out_dir: &Path,
    rep: &mut ConversionReport,
) -> Result<(), ConvertError> {
    let mut placed = Vec::with_capacity(layers.len());
    let mut georef = Georeferencing::Swath;
    for layer in layers {
        let (layer, g) = placement.layer(layer)?;
        placed.push(layer);
        georef = g;
    }
    let stem = writer::output_stem(&scene.product_id, scene.level().token(), suffix);
    let written = writer::write_layers(
        out_dir,
        &stem,
        &placed,
        &georef,
        request.out_format,
        request.overwrite,
    )?;
    rep.record(written.data_path, placed.len());
    Ok(())
}

fn record_cube(rep: &mut ConversionReport, written: writer::WrittenRaster, bands: usize) {
    rep.record(written.data_path, bands);
    if let Some(table) = written.band_table {
        rep.record(table, 0);
    }
}

fn missing(scene: &L2Scene, dataset: &str) -> ConvertError {
    ConvertError::MissingInputDataset {
        dataset: dataset.to_string(),
        path: scene.source_path.clone(),
    }
}
