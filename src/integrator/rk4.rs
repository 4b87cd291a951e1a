use super::Integrator;
use crate::error::SetupResult;
use crate::quantity::{CloneVisitor, Statistics, Storage};
use crate::scheduler::Scheduler;
use crate::solver::Solver;
use crate::timestep::TimestepSelector;

/// Classic 4-stage Runge-Kutta (§4.7). The store's value and first-
/// derivative buffers together form the state vector; each stage's
/// derivative (its post-evaluation dt/d2t buffers) is snapshotted and the
/// four are combined with the usual 1-2-2-1 weights. Four solver
/// evaluations per step.
pub struct Rk4Integrator {
    dt: f64,
}

impl Rk4Integrator {
    pub fn new(initial_timestep: f64) -> Self {
        Rk4Integrator { dt: initial_timestep }
    }
}

impl Integrator for Rk4Integrator {
    fn name(&self) -> &'static str {
        "rk4"
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
        let k1 = store.clone_selected(CloneVisitor::All);

        *store = y0.clone_selected(CloneVisitor::All);
        store.accumulate_value_from(&k1, 0.5 * dt);
        store.accumulate_dt_from(&k1, 0.5 * dt);
        solver.step(store, scheduler, stats)?;
        let k2 = store.clone_selected(CloneVisitor::All);

        *store = y0.clone_selected(CloneVisitor::All);
        store.accumulate_value_from(&k2, 0.5 * dt);
        store.accumulate_dt_from(&k2, 0.5 * dt);
        solver.step(store, scheduler, stats)?;
        let k3 = store.clone_selected(CloneVisitor::All);

        *store = y0.clone_selected(CloneVisitor::All);
        store.accumulate_value_from(&k3, dt);
        store.accumulate_dt_from(&k3, dt);
        solver.step(store, scheduler, stats)?;
        let k4 = store.clone_selected(CloneVisitor::All);

        *store = y0.clone_selected(CloneVisitor::All);
        let w = dt / 6.0;
        for (stage, weight) in [(&k1, w), (&k2, 2.0 * w), (&k3, 2.0 * w), (&k4, w)] {
            store.accumulate_value_from(stage, weight);
            store.accumulate_dt_from(stage, weight);
        }

        self.dt = dt;
        Ok(())
    }

    fn timestep(&self) -> f64 {
        self.dt
    }
}
