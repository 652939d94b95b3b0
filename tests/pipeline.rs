//! End-to-end pipeline properties on synthetic scenes: band selection,
//! fusion priority, georeferencing states per processing level, overwrite
//! protection, and the missing-dataset error.

mod common;

use common::{projected_scene, swath_scene, VNIR_WAVELENGTHS};
use prisma_convert::error::ConvertError;
use prisma_convert::request::{ConversionRequest, JoinPriority, OutputFormat};
use prisma_convert::writer::{envi, geotiff};
use prisma_convert::{convert_scene, raster::ProcessingLevel};
use tempfile::tempdir;

fn envi_request() -> ConversionRequest {
    ConversionRequest {
        out_format: OutputFormat::Envi,
        ..Default::default()
    }
}

#[test]
fn example_scenario_selects_three_native_bands() {
    // selbands_vnir = [450, 550, 650] against native 447/551/649 yields the
    // three native bands, ascending.
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    let request = ConversionRequest {
        vnir: true,
        selbands_vnir: Some(vec![450.0, 550.0, 650.0]),
        base_georef: false,
        ..envi_request()
    };
    convert_scene(&scene, dir.path(), &request).unwrap();

    let out = envi::read_envi(&dir.path().join("PRS_SWATH_TEST_2B_VNIR.dat")).unwrap();
    assert_eq!(out.data.shape()[2], 3);
    assert_eq!(out.wavelengths, vec![447.0, 551.0, 649.0]);
}

#[test]
fn full_fusion_with_swir_priority_keeps_swir_overlap_bands() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    let request = ConversionRequest {
        full: true,
        join_priority: JoinPriority::Swir,
        base_georef: false,
        ..envi_request()
    };
    convert_scene(&scene, dir.path(), &request).unwrap();

    let out = envi::read_envi(&dir.path().join("PRS_SWATH_TEST_2B_FULL.dat")).unwrap();
    // VNIR 930/1000 fall inside the [920, 1010] overlap and are dropped:
    // 5 + 4 - 2 bands remain, ascending.
    assert_eq!(
        out.wavelengths,
        vec![447.0, 551.0, 649.0, 920.0, 1010.0, 1500.0, 2400.0]
    );
    // In the overlap region the data comes from the SWIR cube (tag 200).
    let overlap_band = out.wavelengths.iter().position(|&w| w == 920.0).unwrap();
    assert_eq!(out.data[[0, 0, overlap_band]], 200.0);
}

#[test]
fn fused_band_count_is_union_minus_overlap() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    for (priority, expected) in [(JoinPriority::Swir, 7), (JoinPriority::Vnir, 8)] {
        let request = ConversionRequest {
            full: true,
            join_priority: priority,
            base_georef: false,
            overwrite: true,
            ..envi_request()
        };
        convert_scene(&scene, dir.path(), &request).unwrap();
        let out = envi::read_envi(&dir.path().join("PRS_SWATH_TEST_2B_FULL.dat")).unwrap();
        assert_eq!(out.data.shape()[2], expected, "priority {priority:?}");
    }
}

#[test]
fn projected_scene_output_is_always_projected() {
    let dir = tempdir().unwrap();
    let scene = projected_scene();
    assert!(scene.level.unwrap().is_projected());
    let request = ConversionRequest {
        vnir: true,
        ..Default::default()
    };
    let report = convert_scene(&scene, dir.path(), &request).unwrap();

    let out = geotiff::read_geotiff(&dir.path().join("PRS_UTM_TEST_2D_VNIR.tif")).unwrap();
    assert_eq!(out.epsg(), Some(32632));
    assert!(out.pixel_scale.is_some());
    // The pass-through caveat is surfaced on the report.
    use prisma_convert::pipeline::ConversionIssueCode;
    assert!(report
        .issues
        .iter()
        .any(|i| i.code == ConversionIssueCode::PassThroughProjectionUnverified));
}

#[test]
fn swath_scene_without_base_georef_is_never_projected() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    assert_eq!(scene.level, Some(ProcessingLevel::L2B));
    let request = ConversionRequest {
        vnir: true,
        base_georef: false,
        ..Default::default()
    };
    convert_scene(&scene, dir.path(), &request).unwrap();

    let out = geotiff::read_geotiff(&dir.path().join("PRS_SWATH_TEST_2B_VNIR.tif")).unwrap();
    assert!(out.pixel_scale.is_none());
    assert!(out.geo_keys.is_none());
}

#[test]
fn base_georef_produces_wgs84_grid() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    let request = ConversionRequest {
        vnir: true,
        base_georef: true,
        ..Default::default()
    };
    convert_scene(&scene, dir.path(), &request).unwrap();

    let out = geotiff::read_geotiff(&dir.path().join("PRS_SWATH_TEST_2B_VNIR.tif")).unwrap();
    assert_eq!(out.epsg(), Some(4326));
    let scale = out.pixel_scale.unwrap();
    assert!((scale[0] - 0.01).abs() < 1e-6);
}

#[test]
fn swath_output_is_flipped_north_up() {
    let dir = tempdir().unwrap();
    let mut scene = swath_scene();
    // Tag one corner of the first band so the flip is observable.
    let (mut data, meta) = scene.vnir.take().unwrap().into_parts();
    data[[0, 0, 0]] = -42.0; // first stored line, southernmost
    scene.vnir = Some(prisma_convert::raster::HyperspectralCube::new(data, meta));

    let request = ConversionRequest {
        vnir: true,
        base_georef: false,
        ..envi_request()
    };
    convert_scene(&scene, dir.path(), &request).unwrap();
    let out = envi::read_envi(&dir.path().join("PRS_SWATH_TEST_2B_VNIR.dat")).unwrap();
    let last_row = out.data.shape()[0] - 1;
    assert_eq!(out.data[[last_row, 0, 0]], -42.0);
}

#[test]
fn overwrite_denied_writes_no_bytes() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    let target = dir.path().join("PRS_SWATH_TEST_2B_VNIR.tif");
    std::fs::write(&target, "occupied").unwrap();

    let request = ConversionRequest {
        vnir: true,
        base_georef: false,
        ..Default::default()
    };
    let err = convert_scene(&scene, dir.path(), &request).unwrap_err();
    assert!(matches!(err, ConvertError::OverwriteDenied(_)));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "occupied");
}

#[test]
fn missing_cloud_mask_is_reported_as_missing_dataset() {
    let dir = tempdir().unwrap();
    let scene = swath_scene(); // has no cloud mask
    let request = ConversionRequest {
        cloud: true,
        base_georef: false,
        ..Default::default()
    };
    let err = convert_scene(&scene, dir.path(), &request).unwrap_err();
    match err {
        ConvertError::MissingInputDataset { dataset, .. } => {
            assert!(dataset.contains("Cloud_Mask"));
        }
        other => panic!("expected MissingInputDataset, got {other:?}"),
    }
}

#[test]
fn empty_request_is_rejected_before_touching_the_output_dir() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    let out_dir = dir.path().join("never_created");
    let err = convert_scene(&scene, &out_dir, &ConversionRequest::default()).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidRequest(_)));
    assert!(!out_dir.exists());
}

#[test]
fn latlon_and_geometry_sidecar_are_written() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    let request = ConversionRequest {
        latlon: true,
        base_georef: false,
        ..envi_request()
    };
    let report = convert_scene(&scene, dir.path(), &request).unwrap();

    let latlon = envi::read_envi(&dir.path().join("PRS_SWATH_TEST_2B_LATLON.dat")).unwrap();
    assert_eq!(latlon.band_names, vec!["Latitude", "Longitude"]);

    let geom = std::fs::read_to_string(dir.path().join("PRS_SWATH_TEST_2B_GEOM.csv")).unwrap();
    assert!(geom.contains("acquisition_time,hour,sun_zenith,sun_azimuth"));
    assert!(geom.contains("10.5"));
    assert_eq!(report.written.len(), 2);
}

#[test]
fn out_of_range_selection_aborts_whole_call() {
    let dir = tempdir().unwrap();
    let scene = swath_scene();
    let request = ConversionRequest {
        vnir: true,
        selbands_vnir: Some(vec![2000.0]), // far beyond the VNIR range
        base_georef: false,
        ..Default::default()
    };
    let err = convert_scene(&scene, dir.path(), &request).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidWavelength { .. }));
    assert!(!dir.path().join("PRS_SWATH_TEST_2B_VNIR.tif").exists());
}
