//! Criterion microbenches for the conversion pipeline hot spots.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - Nearest-wavelength band selection over a full-size band list
//! - VNIR/SWIR cube fusion on a realistically shaped grid

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use ndarray::Array3;
use prisma_convert::pipeline::fuse::fuse_cubes;
use prisma_convert::pipeline::select::select_bands;
use prisma_convert::raster::{BandMetadata, HyperspectralCube, SpectralBand};
use prisma_convert::request::JoinPriority;

/// A cube shaped like a (downscaled) sensor grid.
fn cube(rows: usize, cols: usize, wavelengths: &[f32]) -> HyperspectralCube {
    let bands = wavelengths.len();
    let data = Array3::<f32>::from_shape_fn((rows, cols, bands), |(r, c, b)| {
        (r * cols + c + b) as f32
    });
    let meta = BandMetadata::new(
        wavelengths
            .iter()
            .map(|&w| SpectralBand::new(w, 10.0))
            .collect(),
    );
    HyperspectralCube::new(data, meta)
}

/// 63 VNIR-like bands between 400 and 1010 nm.
fn vnir_wavelengths() -> Vec<f32> {
    (0..63).map(|i| 400.0 + i as f32 * (610.0 / 62.0)).collect()
}

/// 171 SWIR-like bands between 920 and 2500 nm.
fn swir_wavelengths() -> Vec<f32> {
    (0..171)
        .map(|i| 920.0 + i as f32 * (1580.0 / 170.0))
        .collect()
}

fn bench_band_selection(c: &mut Criterion) {
    let cube = cube(100, 100, &vnir_wavelengths());
    let requests = [450.0f32, 550.0, 650.0, 860.0];

    let mut group = c.benchmark_group("selection");
    group.throughput(Throughput::Elements(requests.len() as u64));
    group.bench_function("select_bands", |b| {
        b.iter(|| {
            let out = select_bands(black_box(&cube), black_box(&requests)).unwrap();
            black_box(out)
        })
    });
    group.finish();
}

fn bench_cube_fusion(c: &mut Criterion) {
    let vnir = cube(100, 100, &vnir_wavelengths());
    let swir = cube(100, 100, &swir_wavelengths());

    let mut group = c.benchmark_group("fusion");
    group.throughput(Throughput::Elements(
        (vnir.band_count() + swir.band_count()) as u64,
    ));
    group.bench_function("fuse_cubes_swir_priority", |b| {
        b.iter(|| {
            let out = fuse_cubes(black_box(&vnir), black_box(&swir), JoinPriority::Swir).unwrap();
            black_box(out)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_band_selection, bench_cube_fusion);
criterion_main!(benches);
