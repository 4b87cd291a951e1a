//! `-grad p / rho` contribution to `dv`, `p (div v) / rho` contribution to
//! `du`. Requires [`PressureGradientDerivative`] and
//! [`VelocityDivergenceDerivative`].

use super::EquationTerm;
use crate::derivative::{DerivativeHolder, PressureGradientDerivative, VelocityDivergenceDerivative};
use crate::error::SetupResult;
use crate::quantity::{Order, QuantityId, Storage};

#[derive(Debug, Default, Clone, Copy)]
pub struct PressureForce;

impl EquationTerm for PressureForce {
    fn name(&self) -> &'static str {
        "pressure_force"
    }

    fn create(&self, store: &mut Storage) -> SetupResult<()> {
        if !store.has(QuantityId::Pressure) {
            let n = store.particle_count();
            store.insert(QuantityId::Pressure, Order::Zero, vec![0.0; n])?;
        }
        if !store.has(QuantityId::SoundSpeed) {
            let n = store.particle_count();
            store.insert(QuantityId::SoundSpeed, Order::Zero, vec![0.0; n])?;
        }
        Ok(())
    }

    fn set_derivatives(&self, holder: &mut DerivativeHolder) -> SetupResult<()> {
        holder.require(Box::new(PressureGradientDerivative))?;
        holder.require(Box::new(VelocityDivergenceDerivative))?;
        Ok(())
    }

    /// Computes pressure and sound speed from each particle's material EoS
    /// before the derivative loop reads them.
    fn initialize(&mut self, store: &mut Storage) -> SetupResult<()> {
        let density = store.get_value::<f64>(QuantityId::Density)?.to_vec();
        let energy = store.get_value::<f64>(QuantityId::Energy)?.to_vec();
        let n = store.particle_count();
        let mut pressure = vec![0.0; n];
        let mut sound_speed = vec![0.0; n];
        super::for_each_material_range(store, |i, material| {
            let p = material.eos.pressure(density[i], energy[i]);
            pressure[i] = p;
            sound_speed[i] = material.eos.sound_speed(density[i], energy[i], p);
        })?;
        store.get_value_mut::<f64>(QuantityId::Pressure)?.copy_from_slice(&pressure);
        store.get_value_mut::<f64>(QuantityId::SoundSpeed)?.copy_from_slice(&sound_speed);
        Ok(())
    }

    /// Adds the `p (div v) / rho` energy term using the already-reduced
    /// velocity divergence and this step's pressure.
    fn finalize(&mut self, store: &mut Storage) -> SetupResult<()> {
        let pressure = store.get_value::<f64>(QuantityId::Pressure)?.to_vec();
        let density = store.get_value::<f64>(QuantityId::Density)?.to_vec();
        let divergence = store.get_value::<f64>(QuantityId::VelocityDivergence)?.to_vec();
        let energy_dt = store.get_dt_mut::<f64>(QuantityId::Energy)?;
        for i in 0..energy_dt.len() {
            if density[i] > 0.0 {
                energy_dt[i] += pressure[i] / density[i] * divergence[i];
            }
        }
        Ok(())
    }
}
