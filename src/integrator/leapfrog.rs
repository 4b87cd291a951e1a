use super::Integrator;
use crate::error::SetupResult;
use crate::quantity::{Statistics, Storage};
use crate::scheduler::Scheduler;
use crate::solver::Solver;
use crate::timestep::TimestepSelector;

/// Kick-drift-kick (§4.7): half a velocity kick at the old acceleration,
/// drift the full step, re-evaluate, then the remaining half kick at the
/// new acceleration. Two solver evaluations per step.
pub struct LeapfrogIntegrator {
    dt: f64,
}

impl LeapfrogIntegrator {
    pub fn new(initial_timestep: f64) -> Self {
        LeapfrogIntegrator { dt: initial_timestep }
    }
}

impl Integrator for LeapfrogIntegrator {
    fn name(&self) -> &'static str {
        "leapfrog"
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

        store.advance_dt_all(0.5 * dt);
        store.advance_value_all(dt);
        solver.step(store, scheduler, stats)?;
        store.advance_dt_all(0.5 * dt);

        self.dt = dt;
        Ok(())
    }

    fn timestep(&self) -> f64 {
        self.dt
    }
}
