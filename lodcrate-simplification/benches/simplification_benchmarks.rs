//! Benchmarks comparing the indexed and lazy collapse queues

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lodcrate_core::{Point3f, TriangleMesh};
use lodcrate_simplification::{DecimationConfig, DecimationContext, QuadricDecimator, QueueStrategy};

fn generate_grid_mesh(size: usize) -> TriangleMesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            vertices.push(Point3f::new(
                x as f32,
                y as f32,
                (fx.sin() * fy.sin()) * 2.0,
            ));
        }
    }
    let mut faces = Vec::with_capacity((size - 1) * (size - 1) * 2);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

fn bench_queue_strategies(c: &mut Criterion) {
    let sizes = [20, 40, 80];
    let keep = [0.5, 0.1];

    let mut group = c.benchmark_group("decimation");

    for &size in &sizes {
        let mesh = generate_grid_mesh(size);
        let face_count = mesh.face_count();

        for &fraction in &keep {
            let target = (face_count as f64 * fraction) as i64;
            for (name, strategy) in [("indexed", QueueStrategy::Indexed), ("lazy", QueueStrategy::Lazy)] {
                let decimator = QuadricDecimator::with_config(
                    DecimationConfig::default().with_queue_strategy(strategy),
                );
                group.bench_with_input(
                    BenchmarkId::new(name, format!("{}f_t{}", face_count, target)),
                    &(&mesh, target),
                    |b, &(mesh, target)| {
                        b.iter(|| {
                            let result = decimator.decimate(black_box(mesh), target).unwrap();
                            black_box(result);
                        });
                    },
                );
            }
        }
    }

    group.finish();
}

fn bench_initial_scoring(c: &mut Criterion) {
    let mesh = generate_grid_mesh(120);
    let mut group = c.benchmark_group("context_setup");

    for (name, parallel) in [("serial", false), ("parallel", true)] {
        let config = DecimationConfig::default().with_parallel_scoring(parallel);
        group.bench_function(name, |b| {
            b.iter(|| {
                let ctx = DecimationContext::new(black_box(&mesh), config.clone()).unwrap();
                black_box(ctx.queue_len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_queue_strategies, bench_initial_scoring);
criterion_main!(benches);
