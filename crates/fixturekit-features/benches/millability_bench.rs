//! Benchmarks for millability analysis and decomposition.
//!
//! Run with: cargo bench -p fixturekit-features

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fixturekit_core::{Mesh, Tolerances, VoxelPart};
use fixturekit_features::{FeatureDecomposer, MillabilityAnalyzer};
use nalgebra::{Point3, Vector3};

/// Block of `n x n` cells with a grid of blind holes every other cell
fn perforated_block(n: usize) -> Mesh {
    let mut part = VoxelPart::solid([n, n, 3]);
    for x in (1..n - 1).step_by(2) {
        for y in (1..n - 1).step_by(2) {
            part = part.without_box([x, y, 1], [x + 1, y + 1, 3]);
        }
    }
    part.to_mesh()
}

fn bench_millable_faces(c: &mut Criterion) {
    let mut group = c.benchmark_group("millable_faces");
    for n in [4usize, 8, 12] {
        let mesh = perforated_block(n);
        let analyzer = MillabilityAnalyzer::new(&mesh, Tolerances::default());
        group.bench_with_input(BenchmarkId::from_parameter(mesh.face_count()), &analyzer, |b, a| {
            b.iter(|| a.millable_faces(black_box(&Vector3::z())))
        });
    }
    group.finish();
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompose");
    group.sample_size(10);
    for n in [4usize, 8] {
        let part = perforated_block(n);
        let stock = Mesh::cuboid(Point3::origin(), Point3::new(n as f64, n as f64, 4.0));
        let decomposer = FeatureDecomposer::new(Tolerances::default());
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| decomposer.decompose(black_box(&stock), black_box(&part), &Vector3::z()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_millable_faces, bench_decompose);
criterion_main!(benches);
