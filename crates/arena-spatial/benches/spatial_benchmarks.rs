//! Grid transform throughput.
//!
//! Placement runs once per spawn/move notification and the inverse once per
//! drag release, so both should stay far below a frame budget even for a
//! full board sweep.
//!
//! Run with: `cargo bench --bench spatial_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arena_spatial::prelude::*;
use glam::Vec3;

fn default_mapper() -> SpatialMapper {
    SpatialMapper::from_parts(&GridCalibration::default(), default_descriptors())
        .expect("default calibration is valid")
}

fn bench_grid_to_world(c: &mut Criterion) {
    let mapper = default_mapper();
    let type_id = "6ce2da92-188d-4458-b9a3-8f4e7ae02864";
    c.bench_function("placement_full_board", |b| {
        b.iter(|| {
            for row in 0..30 {
                for col in 0..18 {
                    black_box(mapper.placement(type_id, GridCell::new(row, col)));
                }
            }
        })
    });
}

fn bench_world_to_grid(c: &mut Criterion) {
    let mapper = default_mapper();
    let points: Vec<Vec3> = (0..540)
        .map(|i| Vec3::new(-50.0 + i as f32 * 0.07, 0.0, 40.0 + i as f32 * 0.035))
        .collect();
    c.bench_function("world_to_grid_540_points", |b| {
        b.iter(|| {
            for p in &points {
                black_box(mapper.world_to_grid(*p));
            }
        })
    });
}

criterion_group!(benches, bench_grid_to_world, bench_world_to_grid);
criterion_main!(benches);
