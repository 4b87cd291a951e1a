use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use impactsph::finder::{Finder, FinderFlags, KdTreeFinder, PointQuery, UniformGridFinder};
use impactsph::quantity::Vector;
use impactsph::scheduler::Scheduler;

/// Xorshift cloud generator, matching `finder::uniform_grid`'s own test
/// helper rather than pulling in a dependency just for benches.
fn random_cloud(num_particles: usize, h: f64) -> Vec<Vector> {
    let mut state = 0x2545F4914F6CDD1Du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        ((state % 100_000) as f64 / 1000.0) - 50.0
    };
    (0..num_particles).map(|_| Vector::new(next(), next(), next(), h)).collect()
}

fn build_and_query(mut finder: Box<dyn Finder>, points: Vec<Vector>) {
    let scheduler = Scheduler::Sequential;
    finder.build(points.clone(), &scheduler, FinderFlags::default());
    let mut out = Vec::new();
    for i in 0..points.len() {
        out.clear();
        finder.find_all(PointQuery::Particle(i), 2.0 * points[i].h, &mut out);
    }
}

pub fn finder_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("finder");
    group.noise_threshold(0.05).measurement_time(Duration::from_secs(10)).sample_size(20);
    for num_particles in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(num_particles as u64));
        group.bench_function(BenchmarkId::new("uniform_grid", num_particles), |b| {
            b.iter_batched(
                || random_cloud(num_particles, 1.0),
                |points| build_and_query(Box::new(UniformGridFinder::new()), points),
                BatchSize::LargeInput,
            )
        });
        group.bench_function(BenchmarkId::new("kdtree", num_particles), |b| {
            b.iter_batched(
                || random_cloud(num_particles, 1.0),
                |points| build_and_query(Box::new(KdTreeFinder::default()), points),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, finder_benchmark);
criterion_main!(benches);
