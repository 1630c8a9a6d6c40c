use criterion::{black_box, criterion_group, criterion_main, Criterion};

use roadgraph::mapper::geometry::{decode_geometry, encode_geometry};
use roadgraph::nodes::Coordinate;

fn polyline(points: usize) -> Vec<Coordinate> {
    (0..points)
        .map(|i| Coordinate::new(14.25 + i as f64 * 1e-5, 40.85 - i as f64 * 7e-6))
        .collect()
}

fn geometry_benchmarks(c: &mut Criterion) {
    let line = polyline(64);
    let encoded = encode_geometry(&line);
    let legacy = line
        .iter()
        .map(|p| format!("Coordinate [longitude={}, latitude={}]", p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .join(", ");

    c.bench_function("encode_geometry/64", |b| {
        b.iter(|| encode_geometry(black_box(&line)))
    });
    c.bench_function("decode_geometry/64", |b| {
        b.iter(|| decode_geometry(black_box(&encoded)))
    });
    c.bench_function("decode_geometry_legacy/64", |b| {
        b.iter(|| decode_geometry(black_box(&legacy)))
    });
}

criterion_group!(benches, geometry_benchmarks);
criterion_main!(benches);
