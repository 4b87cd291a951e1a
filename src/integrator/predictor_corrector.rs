use super::Integrator;
use crate::error::SetupResult;
use crate::quantity::{CloneVisitor, Statistics, Storage};
use crate::scheduler::Scheduler;
use crate::solver::Solver;
use crate::timestep::TimestepSelector;

/// Predict a full step from the derivatives at the current state, evaluate
/// fresh derivatives at the predicted state, then correct using the
/// average of the two (§4.7). Two solver evaluations per step.
pub struct PredictorCorrectorIntegrator {
    dt: f64,
}

impl PredictorCorrectorIntegrator {
    pub fn new(initial_timestep: f64) -> Self {
        PredictorCorrectorIntegrator { dt: initial_timestep }
    }
}

impl Integrator for PredictorCorrectorIntegrator {
    fn name(&self) -> &'static str {
        "predictor_corrector"
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

        store.advance_value_all(dt);
        store.advance_dt_all(dt);
        solver.step(store, scheduler, stats)?;

        store.advance_value_all(0.5 * dt);
        store.accumulate_value_from(&y0, -0.5 * dt);
        store.advance_dt_all(0.5 * dt);
        store.accumulate_dt_from(&y0, -0.5 * dt);

        self.dt = dt;
        Ok(())
    }

    fn timestep(&self) -> f64 {
        self.dt
    }
}
