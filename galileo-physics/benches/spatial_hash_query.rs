use criterion::{black_box, criterion_group, criterion_main, Criterion};
use galileo_physics::spatial_hash::{SpatialHash, AABB};
use glam::Vec2;

fn populated_grid(object_count: u32) -> SpatialHash<u32> {
    let mut grid = SpatialHash::new(20.0);
    for i in 0..object_count {
        let x = (i as f32 * 13.0) % 1000.0;
        let y = (i as f32 * 29.0) % 1000.0;
        grid.insert(i, AABB::from_sphere(Vec2::new(x, y), 5.0));
    }
    grid
}

fn query_dense_grid(c: &mut Criterion) {
    let grid = populated_grid(2000);
    c.bench_function("spatial_hash_query_unique_2000_objects", |b| {
        b.iter(|| {
            black_box(grid.query_unique(AABB::from_sphere(Vec2::new(500.0, 500.0), 25.0)));
        });
    });
}

fn insert_dense_grid(c: &mut Criterion) {
    c.bench_function("spatial_hash_insert_2000_objects", |b| {
        b.iter(|| {
            black_box(populated_grid(2000));
        });
    });
}

criterion_group!(benches, query_dense_grid, insert_dense_grid);
criterion_main!(benches);
