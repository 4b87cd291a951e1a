use super::Integrator;
use crate::error::SetupResult;
use crate::quantity::{CloneVisitor, Statistics, Storage};
use crate::scheduler::Scheduler;
use crate::solver::Solver;
use crate::timestep::TimestepSelector;

/// Bulirsch-Stoer (§4.7), simplified to a single Richardson extrapolation
/// over two modified-midpoint integrations (2 and 4 substeps) rather than
/// the full adaptive-order tableau: cheaper to drive through this crate's
/// evaluate-a-snapshot interface while still getting the extrapolated
/// higher-order accuracy the scheme is chosen for.
pub struct BulirschStoerIntegrator {
    dt: f64,
}

impl BulirschStoerIntegrator {
    pub fn new(initial_timestep: f64) -> Self {
        BulirschStoerIntegrator { dt: initial_timestep }
    }
}

impl Integrator for BulirschStoerIntegrator {
    fn name(&self) -> &'static str {
        "bulirsch_stoer"
    }

    fn step(
        &mut self,
        store: &mut Storage,
        solver: &mut Solver,
        timestep: &TimestepSelector,
        scheduler: &Scheduler,
        stats: &mut Statistics,
    ) -> SetupResult<()> {
        solver.step(store, scheduler, stats)?;
        let dt = timestep.select(store, stats)?;
        let y0 = store.clone_selected(CloneVisitor::All);

        let coarse = modified_midpoint(&y0, solver, scheduler, stats, dt, 2)?;
        let fine = modified_midpoint(&y0, solver, scheduler, stats, dt, 4)?;

        // Richardson extrapolation for a second-order base method: (4*fine - coarse) / 3.
        *store = fine.clone_selected(CloneVisitor::All);
        store.scale_state_all(4.0 / 3.0);
        store.scale_add_state(&coarse, -1.0 / 3.0);

        self.dt = dt;
        Ok(())
    }

    fn timestep(&self) -> f64 {
        self.dt
    }
}

/// Integrates `y0` forward by `dt` using `n` substeps of the modified
/// midpoint method: `z1 = z0 + h*f(z0)`, `z_{m+1} = z_{m-1} + 2h*f(z_m)`,
/// final estimate `0.5*(z_n + z_{n-1} + h*f(z_n))`.
fn modified_midpoint(
    y0: &Storage,
    solver: &mut Solver,
    scheduler: &Scheduler,
    stats: &mut Statistics,
    dt: f64,
    n: usize,
) -> SetupResult<Storage> {
    let h = dt / n as f64;

    let mut scratch = y0.clone_selected(CloneVisitor::All);
    solver.step(&mut scratch, scheduler, stats)?;
    let mut prev = y0.clone_selected(CloneVisitor::All);
    let mut curr = y0.clone_selected(CloneVisitor::All);
    curr.accumulate_value_from(&scratch, h);
    curr.accumulate_dt_from(&scratch, h);

    for _ in 1..n {
        scratch = curr.clone_selected(CloneVisitor::All);
        solver.step(&mut scratch, scheduler, stats)?;
        let mut next = prev.clone_selected(CloneVisitor::All);
        next.accumulate_value_from(&scratch, 2.0 * h);
        next.accumulate_dt_from(&scratch, 2.0 * h);
        prev = curr;
        curr = next;
    }

    scratch = curr.clone_selected(CloneVisitor::All);
    solver.step(&mut scratch, scheduler, stats)?;
    let mut result = curr.clone_selected(CloneVisitor::All);
    result.scale_state_all(0.5);
    result.scale_add_state(&prev, 0.5);
    result.accumulate_value_from(&scratch, 0.5 * h);
    result.accumulate_dt_from(&scratch, 0.5 * h);
    Ok(result)
}
