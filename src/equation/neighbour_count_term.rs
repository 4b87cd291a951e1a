//! Diagnostic neighbour counter; contributes nothing to the equations of
//! motion but feeds `Statistics::NeighbourCountMin/Max/Mean` and the
//! `AdaptiveSmoothingLength` target-count correction.

use super::EquationTerm;
use crate::derivative::{DerivativeHolder, NeighbourCountDerivative};
use crate::error::SetupResult;
use crate::quantity::{Order, QuantityId, Storage};

#[derive(Debug, Default, Clone, Copy)]
pub struct NeighbourCountTerm;

impl EquationTerm for NeighbourCountTerm {
    fn name(&self) -> &'static str {
        "neighbour_count"
    }

    fn create(&self, store: &mut Storage) -> SetupResult<()> {
        if !store.has(QuantityId::NeighbourCount) {
            let n = store.particle_count();
            store.insert(QuantityId::NeighbourCount, Order::Zero, vec![0u64; n])?;
        }
        Ok(())
    }

    fn set_derivatives(&self, holder: &mut DerivativeHolder) -> SetupResult<()> {
        holder.require(Box::new(NeighbourCountDerivative))
    }
}
