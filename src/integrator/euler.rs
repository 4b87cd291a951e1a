use super::Integrator;
use crate::error::SetupResult;
use crate::quantity::{Statistics, Storage};
use crate::scheduler::Scheduler;
use crate::solver::Solver;
use crate::timestep::TimestepSelector;

/// `x += v*dt; v += a*dt; u += du*dt` (§4.7), one solver evaluation per
/// step.
pub struct EulerIntegrator {
    dt: f64,
}

impl EulerIntegrator {
    pub fn new(initial_timestep: f64) -> Self {
        EulerIntegrator { dt: initial_timestep }
    }
}

impl Integrator for EulerIntegrator {
    fn name(&self) -> &'static str {
        "euler"
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
        store.advance_value_all(dt);
        store.advance_dt_all(dt);
        self.dt = dt;
        Ok(())
    }

    fn timestep(&self) -> f64 {
        self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::{Order, QuantityId, Vector};
    use crate::solver::boundary::NoBoundary;
    use crate::finder::UniformGridFinder;
    use crate::kernel::CubicSpline;

    #[test]
    fn free_particle_drifts_at_constant_velocity() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Position, Order::Second, vec![Vector::new(0.0, 0.0, 0.0, 0.1)])
            .unwrap();
        store.get_dt_mut::<Vector>(QuantityId::Position).unwrap()[0].xyz = glam::DVec3::new(1.0, 0.0, 0.0);

        let mut solver = Solver::new(
            Box::new(CubicSpline),
            Box::new(UniformGridFinder::new()),
            Box::new(NoBoundary),
        );
        solver.create_schema(&mut store).unwrap();

        let timestep = TimestepSelector::new(0.5, 0.5);
        let scheduler = Scheduler::Sequential;
        let mut stats = Statistics::new();
        let mut integrator = EulerIntegrator::new(0.5);
        integrator.step(&mut store, &mut solver, &timestep, &scheduler, &mut stats).unwrap();

        let positions = store.get_value::<Vector>(QuantityId::Position).unwrap();
        assert!((positions[0].xyz.x - 0.5).abs() < 1e-9);
        assert_eq!(integrator.timestep(), 0.5);
    }
}
