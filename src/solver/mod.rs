//! The solver (§4.6): owns the equation set, the derivative holder, the
//! spatial finder and the optional gravity phase, and runs one step of the
//! eight-stage pipeline. `EquationSet` and `DerivativeHolder` are fields
//! here rather than rebuilt per call, so per-particle state a derivative
//! keeps across steps (`ArtificialViscosityDerivative`'s `MorrisMonaghan`
//! switch) actually persists.

pub mod boundary;

use std::sync::Mutex;
use std::time::Instant;

use glam::DVec3;

use boundary::BoundaryCondition;

use crate::accumulator::Accumulated;
use crate::derivative::{DerivativeHolder, Phase};
use crate::equation::{EquationSet, EquationTerm};
use crate::error::SetupResult;
use crate::finder::{Finder, FinderFlags, Neighbour, PointQuery};
use crate::kernel::Kernel;
use crate::quantity::{QuantityId, Statistics, StatisticsId, Storage, Vector};
use crate::scheduler::Scheduler;

use crate::equation::Gravity;

pub struct Solver {
    kernel: Box<dyn Kernel>,
    finder: Box<dyn Finder>,
    boundary: Box<dyn BoundaryCondition>,
    gravity: Option<Gravity>,
    equations: EquationSet,
    derivatives: DerivativeHolder,
}

impl Solver {
    pub fn new(kernel: Box<dyn Kernel>, finder: Box<dyn Finder>, boundary: Box<dyn BoundaryCondition>) -> Self {
        Solver {
            kernel,
            finder,
            boundary,
            gravity: None,
            equations: EquationSet::new(),
            derivatives: DerivativeHolder::new(),
        }
    }

    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = Some(gravity);
        self
    }

    /// Registers an equation term and, through it, the derivatives it needs.
    pub fn push_term(&mut self, term: Box<dyn EquationTerm>) -> SetupResult<()> {
        term.set_derivatives(&mut self.derivatives)?;
        self.equations.push(term)
    }

    /// Schema setup: every term's `create` runs once, before the first step.
    pub fn create_schema(&self, store: &mut Storage) -> SetupResult<()> {
        self.equations.create_all(store)
    }

    pub fn step(&mut self, store: &mut Storage, scheduler: &Scheduler, stats: &mut Statistics) -> SetupResult<()> {
        let n_real = store.particle_count();

        self.boundary.apply(store)?;
        self.equations.initialize_all(store)?;
        self.derivatives.initialize_all(store)?;
        clamp_materials(store)?;

        let build_start = Instant::now();
        let positions = store.get_value::<Vector>(QuantityId::Position)?.to_vec();
        self.finder.build(
            positions,
            scheduler,
            FinderFlags { parallelize_build: scheduler.is_parallel() },
        );
        stats.set_duration(StatisticsId::PhaseTimingTreeBuild, build_start.elapsed());

        let symmetric = self.derivatives.is_symmetric();
        let neighbourhoods = compute_neighbourhoods(
            n_real,
            self.finder.points(),
            self.finder.as_ref(),
            self.kernel.as_ref(),
            symmetric,
            scheduler,
        );

        let sph_start = Instant::now();
        let pre = run_phase(Phase::PreEvaluation, n_real, &neighbourhoods, symmetric, &self.derivatives, store, scheduler)?;
        Accumulated::reduce_into(pre, store)?;
        let evaluation = run_phase(Phase::Evaluation, n_real, &neighbourhoods, symmetric, &self.derivatives, store, scheduler)?;
        Accumulated::reduce_into(evaluation, store)?;
        stats.set_duration(StatisticsId::PhaseTimingSphEval, sph_start.elapsed());

        self.equations.finalize_all(store)?;

        if let Some(gravity) = &self.gravity {
            let gravity_start = Instant::now();
            gravity.eval(store, scheduler)?;
            stats.set_duration(StatisticsId::PhaseTimingGravityEval, gravity_start.elapsed());
        }

        record_neighbour_count_stats(store, stats)?;

        let ghosts: Vec<usize> = (n_real..store.particle_count()).collect();
        if !ghosts.is_empty() {
            store.remove(&ghosts, true)?;
        }

        Ok(())
    }
}

fn clamp_materials(store: &mut Storage) -> SetupResult<()> {
    for slot_index in 0..store.material_count() {
        let (clamps, range) = {
            let (material, range) = store.material(slot_index)?;
            (material.clamps.clone(), range)
        };
        for (id, clamp) in clamps {
            if store.has(id) && id.value_type() == crate::quantity::ValueType::Float {
                let values = store.get_value_mut::<f64>(id)?;
                for i in range.clone() {
                    values[i] = clamp.apply(values[i]);
                }
            }
        }
    }
    Ok(())
}

fn record_neighbour_count_stats(store: &Storage, stats: &mut Statistics) -> SetupResult<()> {
    if !store.has(QuantityId::NeighbourCount) {
        return Ok(());
    }
    let counts = store.get_value::<u64>(QuantityId::NeighbourCount)?;
    if counts.is_empty() {
        return Ok(());
    }
    let min = *counts.iter().min().unwrap();
    let max = *counts.iter().max().unwrap();
    let mean = counts.iter().sum::<u64>() as f64 / counts.len() as f64;
    stats.set_int(StatisticsId::NeighbourCountMin, min as i64);
    stats.set_int(StatisticsId::NeighbourCountMax, max as i64);
    stats.set_float(StatisticsId::NeighbourCountMean, mean);
    Ok(())
}

/// Finds neighbours and precomputes their kernel gradients once per
/// particle, reused by both the PRE-EVALUATION and EVALUATION passes.
fn compute_neighbourhoods(
    n_real: usize,
    positions: &[Vector],
    finder: &dyn Finder,
    kernel: &dyn Kernel,
    symmetric: bool,
    scheduler: &Scheduler,
) -> Vec<(Vec<Neighbour>, Vec<DVec3>)> {
    let indices: Vec<usize> = (0..n_real).collect();
    let chunk_size = (n_real / scheduler.worker_count().max(1)).max(1);
    let results: Mutex<Vec<(usize, Vec<Neighbour>, Vec<DVec3>)>> = Mutex::new(Vec::new());

    scheduler.parallel_for_chunks(&indices, chunk_size, |chunk| {
        let mut local = Vec::with_capacity(chunk.len());
        for &i in chunk {
            let radius = kernel.support_radius_factor() * positions[i].h;
            let mut neighbours = Vec::new();
            if symmetric {
                finder.find_lower_rank(i, radius, &mut neighbours);
            } else {
                finder.find_all(PointQuery::Particle(i), radius, &mut neighbours);
            }
            neighbours.retain(|n| n.index != i);
            let mut gradients = Vec::with_capacity(neighbours.len());
            for n in &neighbours {
                let rel = positions[i].xyz - positions[n.index].xyz;
                let r = rel.length();
                if r <= 0.0 {
                    gradients.push(DVec3::ZERO);
                    continue;
                }
                let h_ij = 0.5 * (positions[i].h + positions[n.index].h);
                gradients.push(rel / r * kernel.grad(r, h_ij));
            }
            local.push((i, neighbours, gradients));
        }
        results.lock().expect("neighbourhood mutex poisoned").extend(local);
    });

    let mut out: Vec<(Vec<Neighbour>, Vec<DVec3>)> = vec![(Vec::new(), Vec::new()); n_real];
    for (i, neighbours, gradients) in results.into_inner().expect("neighbourhood mutex poisoned") {
        out[i] = (neighbours, gradients);
    }
    out
}

/// Runs every derivative in `phase` over `0..n_real` in parallel chunks,
/// each chunk accumulating into its own [`Accumulated`] instance; the
/// caller reduces the returned workers into the store.
fn run_phase(
    phase: Phase,
    n_real: usize,
    neighbourhoods: &[(Vec<Neighbour>, Vec<DVec3>)],
    symmetric: bool,
    derivatives: &DerivativeHolder,
    store: &Storage,
    scheduler: &Scheduler,
) -> SetupResult<Vec<Accumulated>> {
    let indices: Vec<usize> = (0..n_real).collect();
    let chunk_size = (n_real / scheduler.worker_count().max(1)).max(1);
    let particle_count = store.particle_count();
    let results: Mutex<Vec<Accumulated>> = Mutex::new(Vec::new());
    let first_error: Mutex<Option<crate::error::SetupError>> = Mutex::new(None);

    scheduler.parallel_for_chunks(&indices, chunk_size, |chunk| {
        let mut local = Accumulated::new(particle_count);
        if let Err(e) = derivatives.create_all(&mut local) {
            *first_error.lock().expect("error mutex poisoned") = Some(e);
            return;
        }
        for &i in chunk {
            let (neighbours, gradients) = &neighbourhoods[i];
            for derivative in derivatives.for_phase(phase) {
                let result = if symmetric {
                    derivative.eval_symmetric(i, neighbours, gradients, store, &mut local)
                } else {
                    derivative.eval_asymmetric(i, neighbours, gradients, store, &mut local)
                };
                if let Err(e) = result {
                    *first_error.lock().expect("error mutex poisoned") = Some(e);
                }
            }
        }
        results.lock().expect("results mutex poisoned").push(local);
    });

    if let Some(e) = first_error.into_inner().expect("error mutex poisoned") {
        return Err(e);
    }
    Ok(results.into_inner().expect("results mutex poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivative::VelocityDivergenceDerivative;
    use crate::equation::ContinuityEquation;
    use crate::kernel::CubicSpline;
    use crate::materials::eos::ideal_gas;
    use crate::quantity::{Material, Order};
    use boundary::NoBoundary;
    use std::sync::Arc;

    fn lattice_store_with(spacing: f64, h: f64, half_extent: i32, material: Arc<Material>) -> Storage {
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

    fn lattice_store(spacing: f64, h: f64, half_extent: i32) -> Storage {
        lattice_store_with(spacing, h, half_extent, Arc::new(Material::new("rock", ideal_gas(1.4))))
    }

    #[test]
    fn a_resting_lattice_keeps_near_zero_divergence_after_a_step() {
        let mut store = lattice_store(0.3, 0.6, 2);
        let finder = crate::finder::DynamicFinder::new();
        let mut solver = Solver::new(Box::new(CubicSpline), Box::new(finder), Box::new(NoBoundary));
        solver.push_term(Box::new(ContinuityEquation)).unwrap();
        solver.create_schema(&mut store).unwrap();

        let mut stats = Statistics::new();
        solver.step(&mut store, &Scheduler::Sequential, &mut stats).unwrap();

        let divergence = store.get_value::<f64>(QuantityId::VelocityDivergence).unwrap();
        let centre = divergence.len() / 2;
        assert!(divergence[centre].abs() < 1e-8, "got {}", divergence[centre]);
        assert!(stats.get(StatisticsId::PhaseTimingSphEval).is_some());
        assert!(stats.get(StatisticsId::PhaseTimingTreeBuild).is_some());
    }

    #[test]
    fn clamp_is_applied_before_the_neighbour_loop() {
        let material = Arc::new(
            Material::new("rock", ideal_gas(1.4))
                .with_clamp(QuantityId::Density, crate::quantity::Clamp { min: 1e-6, max: f64::MAX }),
        );
        let mut store = lattice_store_with(0.3, 0.6, 1, material);
        store.get_value_mut::<f64>(QuantityId::Density).unwrap()[0] = -5.0;

        let finder = crate::finder::DynamicFinder::new();
        let mut solver = Solver::new(Box::new(CubicSpline), Box::new(finder), Box::new(NoBoundary));
        solver.push_term(Box::new(ContinuityEquation)).unwrap();
        solver.create_schema(&mut store).unwrap();
        let mut stats = Statistics::new();
        solver.step(&mut store, &Scheduler::Sequential, &mut stats).unwrap();
        assert!(store.get_value::<f64>(QuantityId::Density).unwrap()[0] >= 1e-6);
    }

    #[test]
    fn derivative_holder_stays_symmetric_for_a_single_derivative() {
        let mut holder = DerivativeHolder::new();
        holder.require(Box::new(VelocityDivergenceDerivative)).unwrap();
        assert!(holder.is_symmetric());
    }
}
