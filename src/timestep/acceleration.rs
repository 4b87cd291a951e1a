use super::{CriterionResult, TimestepCriterion};
use crate::error::SetupResult;
use crate::quantity::{QuantityId, Storage, Vector};

/// `dt_A = sqrt(h / |a|)` for positions, minimised over particles.
pub struct AccelerationCriterion {
    pub safety: f64,
}

impl AccelerationCriterion {
    pub fn new(safety: f64) -> Self {
        AccelerationCriterion { safety }
    }
}

impl TimestepCriterion for AccelerationCriterion {
    fn name(&self) -> &'static str {
        "acceleration"
    }

    fn compute(&self, store: &Storage, max_timestep: f64) -> SetupResult<CriterionResult> {
        let positions = store.get_value::<Vector>(QuantityId::Position)?;
        let Ok(accelerations) = store.get_d2t::<Vector>(QuantityId::Position) else {
            return Ok(CriterionResult::unconstrained(max_timestep));
        };
        let mut best_dt = max_timestep;
        let mut best_index = None;
        for (i, (p, a)) in positions.iter().zip(accelerations).enumerate() {
            let magnitude = a.xyz.length();
            if magnitude <= 0.0 {
                continue;
            }
            let dt = self.safety * (p.h / magnitude).sqrt();
            if dt < best_dt {
                best_dt = dt;
                best_index = Some(i);
            }
        }
        Ok(CriterionResult {
            dt: best_dt,
            limiting_particle: best_index.map(|i| (QuantityId::Position, i)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Order;

    #[test]
    fn dt_is_sqrt_h_over_a() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Position, Order::Second, vec![Vector::new(0.0, 0.0, 0.0, 1.0)])
            .unwrap();
        let d2t = store.get_d2t_mut::<Vector>(QuantityId::Position).unwrap();
        d2t[0].xyz = glam::DVec3::new(4.0, 0.0, 0.0);
        let criterion = AccelerationCriterion::new(1.0);
        let result = criterion.compute(&store, 10.0).unwrap();
        assert!((result.dt - (1.0_f64 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn zero_acceleration_defers_to_max_timestep() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Position, Order::Second, vec![Vector::new(0.0, 0.0, 0.0, 1.0)])
            .unwrap();
        let criterion = AccelerationCriterion::new(1.0);
        let result = criterion.compute(&store, 10.0).unwrap();
        assert_eq!(result.dt, 10.0);
    }
}
