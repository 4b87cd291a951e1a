//! Integrators (§4.7): value-typed strategies that advance the store under
//! a chosen scheme, each driving the solver through one or more evaluations
//! per step and combining the resulting derivatives. Every scheme is built
//! from the same two generic primitives on [`Storage`]: `advance_*`/
//! `accumulate_*_from` fold a rate (this state's own, or another
//! snapshot's) into a value or first-derivative buffer.

mod bulirsch_stoer;
mod euler;
mod leapfrog;
mod predictor_corrector;
mod rk4;

pub use bulirsch_stoer::BulirschStoerIntegrator;
pub use euler::EulerIntegrator;
pub use leapfrog::LeapfrogIntegrator;
pub use predictor_corrector::PredictorCorrectorIntegrator;
pub use rk4::Rk4Integrator;

use crate::error::SetupResult;
use crate::quantity::{Statistics, Storage};
use crate::scheduler::Scheduler;
use crate::solver::Solver;
use crate::timestep::TimestepSelector;

pub trait Integrator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Advances `store` by one step: selects `dt`, drives `solver` through
    /// however many evaluations the scheme needs, and folds the resulting
    /// derivatives in. The chosen `dt` is recorded and returned by
    /// [`Integrator::timestep`] for the run driver to add to its clock.
    fn step(
        &mut self,
        store: &mut Storage,
        solver: &mut Solver,
        timestep: &TimestepSelector,
        scheduler: &Scheduler,
        stats: &mut Statistics,
    ) -> SetupResult<()>;

    /// The `dt` the most recent `step` call advanced by.
    fn timestep(&self) -> f64;
}
