//! Deviatoric stress evolution (Hooke's law): `dS/dt = 2 G dev(strain_rate)`,
//! with a radial-return projection onto the material's yield surface.

use super::EquationTerm;
use crate::derivative::{DerivativeHolder, VelocityGradientDerivative};
use crate::error::SetupResult;
use crate::quantity::{Order, QuantityId, Storage, TracelessTensor};

#[derive(Debug, Default, Clone, Copy)]
pub struct SolidStress;

impl EquationTerm for SolidStress {
    fn name(&self) -> &'static str {
        "solid_stress"
    }

    fn create(&self, store: &mut Storage) -> SetupResult<()> {
        if !store.has(QuantityId::Stress) {
            let n = store.particle_count();
            store.insert(QuantityId::Stress, Order::First, vec![TracelessTensor::ZERO; n])?;
        }
        Ok(())
    }

    fn set_derivatives(&self, holder: &mut DerivativeHolder) -> SetupResult<()> {
        holder.require(Box::new(VelocityGradientDerivative))
    }

    /// Sets `dS/dt` from this step's (already-reduced) strain rate, then
    /// radial-returns the *current* stress value onto the yield surface for
    /// materials that carry a rheology.
    fn finalize(&mut self, store: &mut Storage) -> SetupResult<()> {
        let strain_rate = store.get_value::<crate::quantity::SymmetricTensor>(QuantityId::VelocityGradient)?.to_vec();
        let densities = store.get_value::<f64>(QuantityId::Density)?.to_vec();
        let damage = if store.has(QuantityId::Damage) {
            store.get_value::<f64>(QuantityId::Damage)?.to_vec()
        } else {
            vec![0.0; store.particle_count()]
        };

        let mut shear_modulus = vec![0.0; store.particle_count()];
        let mut yield_stress = vec![f64::INFINITY; store.particle_count()];
        super::for_each_material_range(store, |i, material| {
            if let Some(rheology) = &material.rheology {
                shear_modulus[i] = rheology.shear_modulus();
                yield_stress[i] = rheology.yield_stress(densities[i], damage[i]);
            }
        })?;

        let stress_dt = store.get_dt_mut::<TracelessTensor>(QuantityId::Stress)?;
        for i in 0..stress_dt.len() {
            let deviatoric_rate = TracelessTensor::from_symmetric(&strain_rate[i]);
            stress_dt[i] = deviatoric_rate * (2.0 * shear_modulus[i]);
        }

        let stress = store.get_value_mut::<TracelessTensor>(QuantityId::Stress)?;
        for i in 0..stress.len() {
            if !yield_stress[i].is_finite() {
                continue;
            }
            let invariant = (1.5 * stress[i].double_contraction()).sqrt();
            if invariant > yield_stress[i] && invariant > 0.0 {
                stress[i] = stress[i] * (yield_stress[i] / invariant);
            }
        }
        Ok(())
    }
}
