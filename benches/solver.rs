use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use glam::DVec3;
use impactsph::equation::ContinuityEquation;
use impactsph::finder::DynamicFinder;
use impactsph::kernel::CubicSpline;
use impactsph::materials::eos::ideal_gas;
use impactsph::quantity::{Material, Order, QuantityId, Statistics, Storage, Vector};
use impactsph::scheduler::Scheduler;
use impactsph::solver::boundary::NoBoundary;
use impactsph::solver::Solver;

fn lattice_store(spacing: f64, h: f64, half_extent: i32) -> Storage {
    let material = Arc::new(Material::new("rock", ideal_gas(1.4)));
    let mut positions = Vec::new();
    for x in -half_extent..=half_extent {
        for y in -half_extent..=half_extent {
            for z in -half_extent..=half_extent {
                let p = DVec3::new(x as f64, y as f64, z as f64) * spacing;
                positions.push(Vector::from_xyz(p).with_h(h));
            }
        }
    }
    let n = positions.len();
    let mut store = Storage::new();
    store.insert(QuantityId::Position, Order::Second, positions).unwrap();
    store.insert(QuantityId::Mass, Order::Zero, vec![1.0; n]).unwrap();
    let volume = spacing.powi(3);
    store.insert(QuantityId::Density, Order::First, vec![1.0 / volume; n]).unwrap();
    store.insert(QuantityId::Energy, Order::First, vec![1.0; n]).unwrap();
    store.add_material_partition(material, n);
    store
}

fn build_solver() -> Solver {
    let mut solver = Solver::new(Box::new(CubicSpline), Box::new(DynamicFinder::new()), Box::new(NoBoundary));
    solver.push_term(Box::new(ContinuityEquation)).unwrap();
    solver
}

fn run_one_step((mut solver, mut store): (Solver, Storage)) {
    solver.create_schema(&mut store).unwrap();
    let mut stats = Statistics::new();
    solver.step(&mut store, &Scheduler::Sequential, &mut stats).unwrap();
}

pub fn solver_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");
    group.noise_threshold(0.05).measurement_time(Duration::from_secs(10)).sample_size(20);
    for half_extent in [2, 4, 6] {
        let store = lattice_store(0.3, 0.6, half_extent);
        let n = store.particle_count();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter_batched(|| (build_solver(), lattice_store(0.3, 0.6, half_extent)), run_one_step, BatchSize::LargeInput)
        });
    }
    group.finish();
}

criterion_group!(benches, solver_benchmark);
criterion_main!(benches);
