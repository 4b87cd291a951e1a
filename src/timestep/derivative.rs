use super::{CriterionResult, TimestepCriterion};
use crate::error::SetupResult;
use crate::quantity::{QuantityId, Storage, ValueType};

/// `dt_D = factor * |value + min_clamp| / |derivative|`, minimised over
/// every particle and every `Float`-valued quantity that carries a `dt`
/// buffer. `min_clamp` is that particle's material clamp minimum for the
/// quantity (0 if the material sets none), keeping the criterion from
/// blowing up when a value legitimately passes through zero.
pub struct DerivativeCriterion {
    pub factor: f64,
}

impl DerivativeCriterion {
    pub fn new(factor: f64) -> Self {
        DerivativeCriterion { factor }
    }
}

impl TimestepCriterion for DerivativeCriterion {
    fn name(&self) -> &'static str {
        "derivative"
    }

    fn compute(&self, store: &Storage, max_timestep: f64) -> SetupResult<CriterionResult> {
        let mut best_dt = max_timestep;
        let mut best: Option<(QuantityId, usize)> = None;
        for id in store.quantity_ids().collect::<Vec<_>>() {
            if id.value_type() != ValueType::Float {
                continue;
            }
            let Ok(values) = store.get_value::<f64>(id) else {
                continue;
            };
            let Ok(derivatives) = store.get_dt::<f64>(id) else {
                continue;
            };
            for (index, (&value, &derivative)) in values.iter().zip(derivatives).enumerate() {
                if derivative == 0.0 {
                    continue;
                }
                let min_clamp = material_clamp_min(store, id, index)?;
                let dt = self.factor * (value + min_clamp).abs() / derivative.abs();
                if dt < best_dt {
                    best_dt = dt;
                    best = Some((id, index));
                }
            }
        }
        Ok(CriterionResult {
            dt: best_dt,
            limiting_particle: best,
        })
    }
}

fn material_clamp_min(store: &Storage, id: QuantityId, particle: usize) -> SetupResult<f64> {
    for slot in 0..store.material_count() {
        let (material, range) = store.material(slot)?;
        if range.contains(&particle) {
            return Ok(material.clamps.get(&id).map_or(0.0, |c| c.min));
        }
    }
    Ok(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Order;

    #[test]
    fn zero_derivative_everywhere_returns_configured_maximum() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Energy, Order::First, vec![1.0, 2.0, 3.0])
            .unwrap();
        let criterion = DerivativeCriterion::new(0.1);
        let result = criterion.compute(&store, 7.0).unwrap();
        assert_eq!(result.dt, 7.0);
        assert!(result.limiting_particle.is_none());
    }

    #[test]
    fn nonzero_derivative_yields_a_finite_bound() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Energy, Order::First, vec![1.0])
            .unwrap();
        let dt_buf = store.get_dt_mut::<f64>(QuantityId::Energy).unwrap();
        dt_buf[0] = 2.0;
        let criterion = DerivativeCriterion::new(0.5);
        let result = criterion.compute(&store, 100.0).unwrap();
        assert!((result.dt - 0.5 * 1.0 / 2.0).abs() < 1e-12);
        assert_eq!(result.limiting_particle, Some((QuantityId::Energy, 0)));
    }
}
