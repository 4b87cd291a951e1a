//! Timestep selection (§4.7): each criterion proposes a desired `dt` from a
//! different stability argument (Courant, bounded relative derivative,
//! bounded acceleration); the selector takes the minimum of whichever
//! criteria are active and records which one limited the step.

mod acceleration;
mod courant;
mod derivative;

pub use acceleration::AccelerationCriterion;
pub use courant::CourantCriterion;
pub use derivative::DerivativeCriterion;

use crate::error::SetupResult;
use crate::quantity::{QuantityId, Statistics, StatisticsId, Storage};

/// What a criterion proposed: the desired timestep, and — for criteria that
/// can point at a specific offender — which quantity and particle limited
/// it.
#[derive(Debug, Clone, Copy)]
pub struct CriterionResult {
    pub dt: f64,
    pub limiting_particle: Option<(QuantityId, usize)>,
}

impl CriterionResult {
    pub fn unconstrained(max_timestep: f64) -> Self {
        CriterionResult {
            dt: max_timestep,
            limiting_particle: None,
        }
    }
}

pub trait TimestepCriterion: Send + Sync {
    fn name(&self) -> &'static str;

    /// Proposes a timestep from the current store state. `max_timestep` is
    /// the run's configured ceiling; a criterion with nothing to constrain
    /// (e.g. every derivative is zero) returns it unchanged rather than
    /// `f64::INFINITY`, so it never wins a minimum it has no opinion about.
    fn compute(&self, store: &Storage, max_timestep: f64) -> SetupResult<CriterionResult>;
}

/// Runs every held criterion and takes the minimum, clamped to
/// `max_timestep`. The initial timestep is configured directly, not derived
/// from a criterion (§4.7).
pub struct TimestepSelector {
    criteria: Vec<Box<dyn TimestepCriterion>>,
    pub initial_timestep: f64,
    pub max_timestep: f64,
}

impl TimestepSelector {
    pub fn new(initial_timestep: f64, max_timestep: f64) -> Self {
        TimestepSelector {
            criteria: Vec::new(),
            initial_timestep,
            max_timestep,
        }
    }

    pub fn push(&mut self, criterion: Box<dyn TimestepCriterion>) {
        self.criteria.push(criterion);
    }

    pub fn select(&self, store: &Storage, stats: &mut Statistics) -> SetupResult<f64> {
        if self.criteria.is_empty() {
            stats.set_text(StatisticsId::LimitingCriterion, "none");
            return Ok(self.max_timestep);
        }
        let mut best_dt = self.max_timestep;
        let mut best_name = "max_timestep";
        let mut best_particle = None;
        for criterion in &self.criteria {
            let result = criterion.compute(store, self.max_timestep)?;
            if result.dt < best_dt {
                best_dt = result.dt;
                best_name = criterion.name();
                best_particle = result.limiting_particle;
            }
        }
        let label = match best_particle {
            Some((id, index)) => format!("{best_name}:{id}:{index}"),
            None => best_name.to_string(),
        };
        stats.set_text(StatisticsId::LimitingCriterion, label);
        stats.set_float(StatisticsId::Timestep, best_dt);
        Ok(best_dt.min(self.max_timestep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);
    impl TimestepCriterion for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn compute(&self, _store: &Storage, _max_timestep: f64) -> SetupResult<CriterionResult> {
            Ok(CriterionResult {
                dt: self.0,
                limiting_particle: None,
            })
        }
    }

    #[test]
    fn minimum_of_active_criteria_is_taken() {
        let mut selector = TimestepSelector::new(0.1, 10.0);
        selector.push(Box::new(Fixed(3.0)));
        selector.push(Box::new(Fixed(1.5)));
        let store = Storage::new();
        let mut stats = Statistics::new();
        let dt = selector.select(&store, &mut stats).unwrap();
        assert_eq!(dt, 1.5);
    }

    #[test]
    fn never_exceeds_configured_maximum() {
        let mut selector = TimestepSelector::new(0.1, 2.0);
        selector.push(Box::new(Fixed(100.0)));
        let store = Storage::new();
        let mut stats = Statistics::new();
        let dt = selector.select(&store, &mut stats).unwrap();
        assert_eq!(dt, 2.0);
    }

    #[test]
    fn no_criteria_returns_configured_maximum() {
        let selector = TimestepSelector::new(0.1, 5.0);
        let store = Storage::new();
        let mut stats = Statistics::new();
        let dt = selector.select(&store, &mut stats).unwrap();
        assert_eq!(dt, 5.0);
    }
}
