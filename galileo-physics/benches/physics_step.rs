use criterion::{black_box, criterion_group, criterion_main, Criterion};
use galileo_physics::{BodyOptions, EngineConfig, PhysicsEngine, Shape, WorldBounds};
use glam::Vec2;

fn build_engine(body_count: usize) -> PhysicsEngine {
    let mut engine = PhysicsEngine::new(EngineConfig {
        gravity: Vec2::new(0.0, 200.0),
        bounds: Some(WorldBounds {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(2000.0, 2000.0),
            bounce: Some(0.6),
        }),
        ..Default::default()
    });

    for i in 0..body_count {
        let x = 50.0 + (i as f32 * 37.0) % 1900.0;
        let y = 50.0 + (i as f32 * 53.0) % 1900.0;
        engine
            .add_body(BodyOptions {
                shape: Shape::Circle { radius: 10.0 },
                position: Vec2::new(x, y),
                velocity: Vec2::new((i as f32).sin() * 40.0, 0.0),
                mass: 1.0,
                restitution: 0.5,
                ..Default::default()
            })
            .unwrap();
    }
    engine
}

fn step_small_scene(c: &mut Criterion) {
    let mut engine = build_engine(16);
    c.bench_function("physics_step_16_bodies", |b| {
        b.iter(|| {
            engine.step(black_box(16));
        });
    });
}

fn step_medium_scene(c: &mut Criterion) {
    let mut engine = build_engine(128);
    c.bench_function("physics_step_128_bodies", |b| {
        b.iter(|| {
            engine.step(black_box(16));
        });
    });
}

criterion_group!(benches, step_small_scene, step_medium_scene);
criterion_main!(benches);
