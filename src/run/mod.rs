//! The run driver (§4.8): owns the store, solver, integrator, timestep
//! selector, output writer, log writer, trigger list and scheduler, and
//! drives the main loop until an end condition is met. Builder pattern
//! grounded on the teacher's `SimulationBuilder`
//! (`simulation_builder.rs`) — chained `&mut self -> &mut Self` setters,
//! a `build` that validates required fields.

pub mod end_condition;
pub mod log_writer;
pub mod output;
pub mod trigger;

use std::path::PathBuf;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::SetupResult;
use crate::integrator::Integrator;
use crate::io::{ssf, RunType};
use crate::quantity::{Statistics, StatisticsId, Storage};
use crate::scheduler::Scheduler;
use crate::solver::Solver;
use crate::timestep::TimestepSelector;

use end_condition::EndCondition;
use output::OutputTimer;
use trigger::TriggerList;

/// Hooks checked once per step, after triggers run (§4.8: "callbacks.on_time_step",
/// "callbacks.should_abort"). The default never aborts and does nothing.
pub trait Callbacks: Send {
    fn on_time_step(&mut self, _store: &Storage, _stats: &Statistics) {}
    fn should_abort(&self) -> bool {
        false
    }
}

pub struct NullCallbacks;
impl Callbacks for NullCallbacks {}

pub struct RunDriver {
    store: Storage,
    solver: Solver,
    integrator: Box<dyn Integrator>,
    timestep: TimestepSelector,
    scheduler: Scheduler,
    stats: Statistics,
    end_condition: EndCondition,
    output_timer: OutputTimer,
    output_dir: PathBuf,
    output_prefix: String,
    run_type: RunType,
    triggers: TriggerList,
    callbacks: Box<dyn Callbacks>,
    t: f64,
    t_end: f64,
    show_progress: bool,
}

impl RunDriver {
    /// Runs to completion, returning the final simulation time reached.
    /// Mirrors §4.8's loop body exactly: stats update, output, integrator
    /// step, log/trigger pass, callbacks, clock advance.
    pub fn run(mut self) -> SetupResult<f64> {
        let started_at = Instant::now();
        let mut i = 0usize;

        let progress = self.show_progress.then(|| {
            let bar = ProgressBar::new(((self.t_end - self.t).max(0.0) * 1000.0) as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{elapsed_precise}] t={msg} [{bar:40}]")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });

        while self.t < self.t_end && !self.end_condition.is_met(started_at, i) {
            self.stats.set_float(StatisticsId::RunTime, self.t);
            self.stats.set_duration(StatisticsId::WallClock, started_at.elapsed());
            self.stats.set_int(StatisticsId::StepIndex, i as i64);
            self.stats.set_float(
                StatisticsId::ProgressFraction,
                ((self.t / self.t_end.max(f64::EPSILON)).clamp(0.0, 1.0)),
            );

            if self.output_timer.is_due(self.t) {
                self.dump_output()?;
                self.output_timer.advance();
            }

            self.integrator.step(&mut self.store, &mut self.solver, &self.timestep, &self.scheduler, &mut self.stats)?;

            self.triggers.run(&mut self.store, &mut self.stats, self.t);
            self.callbacks.on_time_step(&self.store, &self.stats);
            if self.callbacks.should_abort() {
                break;
            }

            if let Some(bar) = &progress {
                bar.set_message(format!("{:.3}", self.t));
                bar.set_position(((self.t - 0.0) * 1000.0).max(0.0) as u64);
            }

            self.t += self.integrator.timestep();
            i += 1;
        }

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }
        Ok(self.t)
    }

    fn dump_output(&self) -> SetupResult<()> {
        let name = format!("{}_{:04}.ssf", self.output_prefix, self.output_timer.snapshot_num());
        let path = self.output_dir.join(name);
        ssf::dump(&path, &self.store, self.run_type).map_err(|e| {
            log::error!("failed to write output dump: {e}");
            crate::error::SetupError::InvalidConfiguration(e.to_string())
        })
    }
}

pub struct RunDriverBuilder {
    store: Option<Storage>,
    solver: Option<Solver>,
    integrator: Option<Box<dyn Integrator>>,
    timestep: Option<TimestepSelector>,
    scheduler: Scheduler,
    end_condition: EndCondition,
    output_timer: Option<OutputTimer>,
    output_dir: PathBuf,
    output_prefix: String,
    run_type: RunType,
    triggers: TriggerList,
    callbacks: Box<dyn Callbacks>,
    t_start: f64,
    t_end: f64,
    show_progress: bool,
}

impl Default for RunDriverBuilder {
    fn default() -> Self {
        RunDriverBuilder {
            store: None,
            solver: None,
            integrator: None,
            timestep: None,
            scheduler: Scheduler::Sequential,
            end_condition: EndCondition { max_wallclock: None, max_steps: None },
            output_timer: None,
            output_dir: PathBuf::from("."),
            output_prefix: "snapshot".to_string(),
            run_type: RunType::Sph,
            triggers: TriggerList::new(),
            callbacks: Box::new(NullCallbacks),
            t_start: 0.0,
            t_end: f64::INFINITY,
            show_progress: false,
        }
    }
}

impl RunDriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, store: Storage) -> &mut Self {
        self.store = Some(store);
        self
    }

    pub fn solver(&mut self, solver: Solver) -> &mut Self {
        self.solver = Some(solver);
        self
    }

    pub fn integrator(&mut self, integrator: Box<dyn Integrator>) -> &mut Self {
        self.integrator = Some(integrator);
        self
    }

    pub fn timestep(&mut self, timestep: TimestepSelector) -> &mut Self {
        self.timestep = Some(timestep);
        self
    }

    pub fn scheduler(&mut self, scheduler: Scheduler) -> &mut Self {
        self.scheduler = scheduler;
        self
    }

    pub fn end_condition(&mut self, end_condition: EndCondition) -> &mut Self {
        self.end_condition = end_condition;
        self
    }

    pub fn output(&mut self, timer: OutputTimer, dir: PathBuf, prefix: impl Into<String>) -> &mut Self {
        self.output_timer = Some(timer);
        self.output_dir = dir;
        self.output_prefix = prefix.into();
        self
    }

    pub fn run_type(&mut self, run_type: RunType) -> &mut Self {
        self.run_type = run_type;
        self
    }

    pub fn push_trigger(&mut self, trigger: Box<dyn trigger::Trigger>) -> &mut Self {
        self.triggers.push(trigger);
        self
    }

    pub fn callbacks(&mut self, callbacks: Box<dyn Callbacks>) -> &mut Self {
        self.callbacks = callbacks;
        self
    }

    pub fn time_range(&mut self, t_start: f64, t_end: f64) -> &mut Self {
        self.t_start = t_start;
        self.t_end = t_end;
        self
    }

    pub fn show_progress(&mut self, show: bool) -> &mut Self {
        self.show_progress = show;
        self
    }

    pub fn build(&mut self) -> SetupResult<RunDriver> {
        let store = self
            .store
            .take()
            .ok_or(crate::error::SetupError::MissingOption("store"))?;
        let solver = self
            .solver
            .take()
            .ok_or(crate::error::SetupError::MissingOption("solver"))?;
        let integrator = self
            .integrator
            .take()
            .ok_or(crate::error::SetupError::MissingOption("integrator"))?;
        let timestep = self
            .timestep
            .take()
            .ok_or(crate::error::SetupError::MissingOption("timestep"))?;
        let output_timer = self
            .output_timer
            .take()
            .unwrap_or_else(|| OutputTimer::new(output::OutputCadence::Linear { delta: f64::INFINITY }, self.t_start));

        Ok(RunDriver {
            store,
            solver,
            integrator,
            timestep,
            scheduler: std::mem::replace(&mut self.scheduler, Scheduler::Sequential),
            stats: Statistics::new(),
            end_condition: self.end_condition,
            output_timer,
            output_dir: self.output_dir.clone(),
            output_prefix: self.output_prefix.clone(),
            run_type: self.run_type,
            triggers: std::mem::take(&mut self.triggers),
            callbacks: std::mem::replace(&mut self.callbacks, Box::new(NullCallbacks)),
            t: self.t_start,
            t_end: self.t_end,
            show_progress: self.show_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::UniformGridFinder;
    use crate::integrator::EulerIntegrator;
    use crate::kernel::CubicSpline;
    use crate::quantity::{Order, QuantityId, Vector};
    use crate::solver::boundary::NoBoundary;

    #[test]
    fn a_free_particle_run_reaches_the_configured_end_time() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Position, Order::Second, vec![Vector::new(0.0, 0.0, 0.0, 0.1)])
            .unwrap();
        store.get_dt_mut::<Vector>(QuantityId::Position).unwrap()[0].xyz = glam::DVec3::new(1.0, 0.0, 0.0);

        let mut solver = Solver::new(Box::new(CubicSpline), Box::new(UniformGridFinder::new()), Box::new(NoBoundary));
        solver.create_schema(&mut store).unwrap();

        let timestep = TimestepSelector::new(0.1, 0.1);
        let mut builder = RunDriverBuilder::new();
        builder
            .store(store)
            .solver(solver)
            .integrator(Box::new(EulerIntegrator::new(0.1)))
            .timestep(timestep)
            .time_range(0.0, 0.5);
        let driver = builder.build().unwrap();
        let t_final = driver.run().unwrap();
        assert!(t_final >= 0.5 - 1e-9);
    }
}
