//! Benchmarks for zonal sampling

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use solarsite_algorithms::statistics::zonal_statistics;
use solarsite_core::{BoundingBox, GridRaster, RasterExtent};

fn create_layer(size: usize) -> GridRaster {
    let extent = RasterExtent::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), size, size).unwrap();
    GridRaster::from_fn(extent, |col, row| 3.0 + ((row * 7 + col * 13) % 100) as f64 / 50.0)
}

/// Irregular hexagon covering most of the raster
fn polygon() -> Vec<[f64; 2]> {
    vec![
        [1.0, 2.0],
        [5.0, 0.5],
        [9.0, 2.5],
        [9.5, 7.0],
        [5.5, 9.5],
        [0.5, 7.5],
        [1.0, 2.0],
    ]
}

fn bench_zonal(c: &mut Criterion) {
    let mut group = c.benchmark_group("zonal_statistics");
    let poly = polygon();

    for size in [256, 1024, 4096].iter() {
        let mut layer = create_layer(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| zonal_statistics(black_box(&mut layer), black_box(&poly)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_zonal);
criterion_main!(benches);
