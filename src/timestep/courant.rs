use super::{CriterionResult, TimestepCriterion};
use crate::error::SetupResult;
use crate::quantity::{QuantityId, Storage, Vector};

/// `dt_C = C * h / c_s`, minimised over particles. Absent `SoundSpeed`
/// (e.g. a pure N-body run) this has nothing to say and defers to
/// `max_timestep`.
pub struct CourantCriterion {
    pub courant_number: f64,
}

impl CourantCriterion {
    pub fn new(courant_number: f64) -> Self {
        CourantCriterion { courant_number }
    }
}

impl TimestepCriterion for CourantCriterion {
    fn name(&self) -> &'static str {
        "courant"
    }

    fn compute(&self, store: &Storage, max_timestep: f64) -> SetupResult<CriterionResult> {
        if !store.has(QuantityId::SoundSpeed) {
            return Ok(CriterionResult::unconstrained(max_timestep));
        }
        let positions = store.get_value::<Vector>(QuantityId::Position)?;
        let sound_speeds = store.get_value::<f64>(QuantityId::SoundSpeed)?;
        let mut best_dt = max_timestep;
        let mut best_index = None;
        for (i, (p, &c_s)) in positions.iter().zip(sound_speeds).enumerate() {
            if c_s <= 0.0 {
                continue;
            }
            let dt = self.courant_number * p.h / c_s;
            if dt < best_dt {
                best_dt = dt;
                best_index = Some(i);
            }
        }
        Ok(CriterionResult {
            dt: best_dt,
            limiting_particle: best_index.map(|i| (QuantityId::SoundSpeed, i)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Order;

    #[test]
    fn dt_is_courant_number_times_min_h_over_c() {
        let mut store = Storage::new();
        store
            .insert(
                QuantityId::Position,
                Order::Second,
                vec![Vector::new(0.0, 0.0, 0.0, 0.2), Vector::new(1.0, 0.0, 0.0, 0.4)],
            )
            .unwrap();
        store
            .insert(QuantityId::SoundSpeed, Order::Zero, vec![2.0, 2.0])
            .unwrap();
        let criterion = CourantCriterion::new(0.3);
        let result = criterion.compute(&store, 1.0).unwrap();
        assert!((result.dt - 0.3 * 0.2 / 2.0).abs() < 1e-12);
        assert_eq!(result.limiting_particle, Some((QuantityId::SoundSpeed, 0)));
    }

    #[test]
    fn absent_sound_speed_defers_to_max_timestep() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Position, Order::Second, vec![Vector::new(0.0, 0.0, 0.0, 0.2)])
            .unwrap();
        let criterion = CourantCriterion::new(0.3);
        let result = criterion.compute(&store, 5.0).unwrap();
        assert_eq!(result.dt, 5.0);
    }
}
