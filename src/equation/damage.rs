//! Scalar Grady-Kipp damage: integrates crack growth driven by the local
//! strain rate; `SolidStress`/`PressureForce` read the reduced `Damage`
//! value to weaken yield stress and (for a cracked, tensile material)
//! pressure.

use super::EquationTerm;
use crate::error::SetupResult;
use crate::quantity::{Order, QuantityId, Storage};

#[derive(Debug, Default, Clone, Copy)]
pub struct Damage;

impl EquationTerm for Damage {
    fn name(&self) -> &'static str {
        "damage"
    }

    fn create(&self, store: &mut Storage) -> SetupResult<()> {
        if !store.has(QuantityId::Damage) {
            let n = store.particle_count();
            store.insert(QuantityId::Damage, Order::First, vec![0.0; n])?;
        }
        Ok(())
    }

    /// Reads the strain rate's largest principal value as a scalar proxy
    /// (the traceless part's own invariant, since `VelocityGradient` is
    /// reduced by the time `finalize` runs) and integrates crack growth.
    fn finalize(&mut self, store: &mut Storage) -> SetupResult<()> {
        let damage = store.get_value::<f64>(QuantityId::Damage)?.to_vec();
        let strain_rate = if store.has(QuantityId::VelocityGradient) {
            store.get_value::<crate::quantity::SymmetricTensor>(QuantityId::VelocityGradient)?.to_vec()
        } else {
            return Ok(());
        };
        let mut growth = vec![0.0; damage.len()];
        super::for_each_material_range(store, |i, material| {
            if let Some(model) = &material.damage {
                let deviatoric = crate::quantity::TracelessTensor::from_symmetric(&strain_rate[i]);
                let magnitude = (deviatoric.double_contraction().max(0.0)).sqrt();
                growth[i] = model.growth_rate(magnitude, damage[i]);
            }
        })?;
        let damage_dt = store.get_dt_mut::<f64>(QuantityId::Damage)?;
        for i in 0..damage_dt.len() {
            damage_dt[i] += growth[i];
        }
        Ok(())
    }
}
