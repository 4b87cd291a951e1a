//! Triggers (§4.8, supplemented from `Trigger.h`): user code hooked into
//! the main loop, checked once per step after the integrator has run. A
//! `OneTime` trigger is removed from the list the step it fires; a
//! `Repeating` one stays. `PeriodicTrigger` is the concrete timing rule
//! most triggers are built on: fire once `run_time` has passed
//! `last_action + period`.

use crate::error::Diagnostic;
use crate::quantity::{QuantityId, Statistics, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    OneTime,
    Repeating,
}

/// A hook into the run driver's main loop. `condition` is checked every
/// step; when it returns true, `action` runs and may return a follow-up
/// trigger to append to the list (e.g. a one-time trigger that schedules
/// the next one-time trigger).
pub trait Trigger: Send {
    fn kind(&self) -> TriggerKind;
    fn condition(&mut self, store: &Storage, stats: &Statistics, run_time: f64) -> bool;
    fn action(&mut self, store: &mut Storage, stats: &mut Statistics) -> Option<Box<dyn Trigger>>;
}

/// The `last_action`/`period` timing rule `Trigger.h`'s `PeriodicTrigger`
/// is built on: due once `run_time > last_action + period`. A period of
/// zero fires every step.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTiming {
    period: f64,
    last_action: f64,
}

impl PeriodicTiming {
    pub fn new(period: f64) -> Self {
        PeriodicTiming { period, last_action: f64::NEG_INFINITY }
    }

    pub fn is_due(&self, run_time: f64) -> bool {
        run_time > self.last_action + self.period
    }

    pub fn mark_fired(&mut self, run_time: f64) {
        self.last_action = run_time;
    }
}

/// Runs the whole list once per step: checks each trigger's condition,
/// runs its action, appends any follow-up trigger, and drops the ones
/// marked `OneTime` that fired.
pub struct TriggerList {
    triggers: Vec<Box<dyn Trigger>>,
}

impl Default for TriggerList {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerList {
    pub fn new() -> Self {
        TriggerList { triggers: Vec::new() }
    }

    pub fn push(&mut self, trigger: Box<dyn Trigger>) {
        self.triggers.push(trigger);
    }

    pub fn run(&mut self, store: &mut Storage, stats: &mut Statistics, run_time: f64) {
        let mut spawned = Vec::new();
        let mut keep = Vec::with_capacity(self.triggers.len());
        for mut trigger in std::mem::take(&mut self.triggers) {
            if trigger.condition(store, stats, run_time) {
                if let Some(new_trigger) = trigger.action(store, stats) {
                    spawned.push(new_trigger);
                }
                if trigger.kind() == TriggerKind::Repeating {
                    keep.push(trigger);
                }
            } else {
                keep.push(trigger);
            }
        }
        keep.extend(spawned);
        self.triggers = keep;
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

/// Watches for the non-aborting runtime diagnostics §7 names: non-finite
/// values, exploding neighbour counts. Logs through `log::warn!` rather
/// than aborting, which is the whole point of the diagnostics channel
/// being separate from `SetupError`.
pub struct DiagnosticsTrigger {
    timing: PeriodicTiming,
    max_neighbour_count: u64,
}

impl DiagnosticsTrigger {
    pub fn new(max_neighbour_count: u64) -> Self {
        DiagnosticsTrigger { timing: PeriodicTiming::new(0.0), max_neighbour_count }
    }
}

impl Trigger for DiagnosticsTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Repeating
    }

    fn condition(&mut self, _store: &Storage, _stats: &Statistics, run_time: f64) -> bool {
        self.timing.is_due(run_time)
    }

    fn action(&mut self, store: &mut Storage, _stats: &mut Statistics) -> Option<Box<dyn Trigger>> {
        if let Ok(positions) = store.get_value::<crate::quantity::Vector>(QuantityId::Position) {
            for (i, p) in positions.iter().enumerate() {
                if !p.is_finite() {
                    log::warn!("{}", Diagnostic::NonFiniteQuantity { id: QuantityId::Position, particle: i });
                }
            }
        }
        if let Ok(counts) = store.get_value::<u64>(QuantityId::NeighbourCount) {
            for (i, &count) in counts.iter().enumerate() {
                if count > self.max_neighbour_count {
                    log::warn!("{}", Diagnostic::NeighbourCountExploding { particle: i, count: count as usize });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingOneTime {
        fired: usize,
    }

    impl Trigger for CountingOneTime {
        fn kind(&self) -> TriggerKind {
            TriggerKind::OneTime
        }
        fn condition(&mut self, _store: &Storage, _stats: &Statistics, _run_time: f64) -> bool {
            true
        }
        fn action(&mut self, _store: &mut Storage, _stats: &mut Statistics) -> Option<Box<dyn Trigger>> {
            self.fired += 1;
            None
        }
    }

    #[test]
    fn one_time_trigger_is_removed_after_firing() {
        let mut list = TriggerList::new();
        list.push(Box::new(CountingOneTime { fired: 0 }));
        let mut store = Storage::new();
        let mut stats = Statistics::new();
        assert_eq!(list.len(), 1);
        list.run(&mut store, &mut stats, 0.0);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn periodic_timing_is_due_once_the_period_has_elapsed() {
        let mut timing = PeriodicTiming::new(2.0);
        assert!(timing.is_due(0.0));
        timing.mark_fired(0.0);
        assert!(!timing.is_due(1.0));
        assert!(timing.is_due(2.5));
    }
}
