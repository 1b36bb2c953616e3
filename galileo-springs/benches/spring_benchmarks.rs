use criterion::{black_box, criterion_group, criterion_main, Criterion};
use galileo_springs::{presets, ScalarSpring, UpdateOpts, VectorSpring};

fn scalar_step_benchmark(c: &mut Criterion) {
    let mut spring = ScalarSpring::new(presets::default());
    spring.update(100.0, UpdateOpts::default());

    c.bench_function("scalar_spring_step", |b| {
        b.iter(|| {
            black_box(spring.step(16));
        });
    });
}

fn vector_step_benchmark(c: &mut Criterion) {
    let mut spring: VectorSpring<3> = VectorSpring::new(presets::wobbly());
    spring.update([100.0, -50.0, 25.0], UpdateOpts::default());

    c.bench_function("vector_spring_step_3", |b| {
        b.iter(|| {
            black_box(spring.step(16));
        });
    });
}

criterion_group!(benches, scalar_step_benchmark, vector_step_benchmark);
criterion_main!(benches);
