//! `drho/dt = -rho (div v)`.

use super::EquationTerm;
use crate::derivative::{DerivativeHolder, VelocityDivergenceDerivative};
use crate::error::SetupResult;
use crate::quantity::{QuantityId, Storage};

#[derive(Debug, Default, Clone, Copy)]
pub struct ContinuityEquation;

impl EquationTerm for ContinuityEquation {
    fn name(&self) -> &'static str {
        "continuity_equation"
    }

    fn set_derivatives(&self, holder: &mut DerivativeHolder) -> SetupResult<()> {
        holder.require(Box::new(VelocityDivergenceDerivative))
    }

    fn finalize(&mut self, store: &mut Storage) -> SetupResult<()> {
        let density = store.get_value::<f64>(QuantityId::Density)?.to_vec();
        let divergence = store.get_value::<f64>(QuantityId::VelocityDivergence)?.to_vec();
        let density_dt = store.get_dt_mut::<f64>(QuantityId::Density)?;
        for i in 0..density_dt.len() {
            density_dt[i] += -density[i] * divergence[i];
        }
        Ok(())
    }
}
