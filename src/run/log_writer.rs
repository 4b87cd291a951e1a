//! Log writers (§4.8, supplemented from `LogWriter.h`): `ILogWriter` is
//! itself a `PeriodicTrigger` subtype, so the main loop's separate
//! `log_writer.write(...)` call is modeled here as a trigger with period 0
//! (fires every step) wrapping a `LogWriter` implementation.

use crate::quantity::{QuantityId, Statistics, StatisticsId, Storage, Vector};
use crate::run::trigger::{PeriodicTiming, Trigger, TriggerKind};

pub trait LogWriter: Send {
    fn write(&mut self, store: &Storage, stats: &Statistics);
}

/// Discards everything; the default when no log output is wanted.
pub struct NullLogFile;

impl LogWriter for NullLogFile {
    fn write(&mut self, _store: &Storage, _stats: &Statistics) {}
}

/// Logs total mass, momentum and kinetic energy through the `log` facade —
/// the conserved-quantity sanity check the seed scenarios' "total mass
/// conserved to 1e-6" and "energy monotonically non-increasing" properties
/// (§8) are checked against over a run.
pub struct IntegralsLogWriter;

impl LogWriter for IntegralsLogWriter {
    fn write(&mut self, store: &Storage, stats: &Statistics) {
        let Ok(masses) = store.get_value::<f64>(QuantityId::Mass) else {
            return;
        };
        let positions = store.get_value::<Vector>(QuantityId::Position).ok();
        let velocities = store.get_dt::<Vector>(QuantityId::Position).ok();

        let total_mass: f64 = masses.iter().sum();
        let mut momentum = glam::DVec3::ZERO;
        let mut kinetic_energy = 0.0;
        if let Some(velocities) = velocities {
            for (&m, v) in masses.iter().zip(velocities) {
                momentum += m * v.xyz;
                kinetic_energy += 0.5 * m * v.length_squared();
            }
        }
        let _ = positions;

        let t = stats.get_float(StatisticsId::RunTime).unwrap_or(0.0);
        log::info!(
            "t={t:.6} mass={total_mass:.6e} |p|={:.6e} ke={kinetic_energy:.6e}",
            momentum.length()
        );
    }
}

/// Adapts any [`LogWriter`] into a [`Trigger`] firing every `period` of
/// simulation time (0 by default, matching the distilled spec's
/// every-step `log_writer.write(...)` call).
pub struct LogWriterTrigger<W: LogWriter> {
    writer: W,
    timing: PeriodicTiming,
}

impl<W: LogWriter> LogWriterTrigger<W> {
    pub fn new(writer: W, period: f64) -> Self {
        LogWriterTrigger { writer, timing: PeriodicTiming::new(period) }
    }
}

impl<W: LogWriter + Send> Trigger for LogWriterTrigger<W> {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Repeating
    }

    fn condition(&mut self, _store: &Storage, _stats: &Statistics, run_time: f64) -> bool {
        self.timing.is_due(run_time)
    }

    fn action(&mut self, store: &mut Storage, stats: &mut Statistics) -> Option<Box<dyn Trigger>> {
        self.writer.write(store, stats);
        self.timing.mark_fired(stats.get_float(StatisticsId::RunTime).unwrap_or(0.0));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Order;

    #[test]
    fn integrals_log_writer_does_not_panic_on_a_minimal_store() {
        let mut store = Storage::new();
        store.insert(QuantityId::Mass, Order::Zero, vec![1.0, 2.0]).unwrap();
        store.insert(QuantityId::Position, Order::Second, vec![Vector::ZERO; 2]).unwrap();
        let stats = Statistics::new();
        IntegralsLogWriter.write(&store, &stats);
    }
}
