//! Thin configuration wrapper registering [`ArtificialViscosityDerivative`];
//! the derivative itself owns the `MorrisMonaghan` per-particle switch state
//! (via its own `initialize`), since the holder keeps one long-lived instance
//! per step rather than a fresh one.

pub use crate::derivative::ViscosityKind;

use super::EquationTerm;
use crate::derivative::{ArtificialViscosityDerivative, DerivativeHolder};
use crate::error::SetupResult;
use crate::quantity::{Order, QuantityId, Storage};

#[derive(Debug, Clone, Copy)]
pub struct ArtificialViscosity {
    kind: ViscosityKind,
    alpha: f64,
    beta: f64,
}

impl ArtificialViscosity {
    pub fn new(kind: ViscosityKind, alpha: f64, beta: f64) -> Self {
        ArtificialViscosity { kind, alpha, beta }
    }
}

impl EquationTerm for ArtificialViscosity {
    fn name(&self) -> &'static str {
        "artificial_viscosity"
    }

    fn create(&self, store: &mut Storage) -> SetupResult<()> {
        if !store.has(QuantityId::SoundSpeed) {
            let n = store.particle_count();
            store.insert(QuantityId::SoundSpeed, Order::Zero, vec![0.0; n])?;
        }
        Ok(())
    }

    fn set_derivatives(&self, holder: &mut DerivativeHolder) -> SetupResult<()> {
        holder.require(Box::new(ArtificialViscosityDerivative::new(self.kind, self.alpha, self.beta)))
    }
}
