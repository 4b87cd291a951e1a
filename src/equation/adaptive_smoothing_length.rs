//! `dh/dt = -(h/D)(div v)`, optionally corrected to track a target
//! neighbour count. The sole authoritative writer of the position buffer's
//! H lane derivative (§9 open question) — `EquationSet::push` refuses a
//! second term claiming the same ownership.

use super::EquationTerm;
use crate::derivative::{DerivativeHolder, VelocityDivergenceDerivative};
use crate::error::SetupResult;
use crate::quantity::{QuantityId, Storage, Vector};

const SPATIAL_DIMENSIONS: f64 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct AdaptiveSmoothingLength {
    /// Target mean neighbour count; `None` disables the correction term.
    pub target_neighbour_count: Option<f64>,
    /// Gain on the neighbour-count correction term.
    pub correction_gain: f64,
}

impl AdaptiveSmoothingLength {
    pub fn new() -> Self {
        AdaptiveSmoothingLength { target_neighbour_count: None, correction_gain: 0.1 }
    }

    pub fn with_target_neighbour_count(mut self, target: f64) -> Self {
        self.target_neighbour_count = Some(target);
        self
    }
}

impl Default for AdaptiveSmoothingLength {
    fn default() -> Self {
        Self::new()
    }
}

impl EquationTerm for AdaptiveSmoothingLength {
    fn name(&self) -> &'static str {
        "adaptive_smoothing_length"
    }

    fn set_derivatives(&self, holder: &mut DerivativeHolder) -> SetupResult<()> {
        holder.require(Box::new(VelocityDivergenceDerivative))
    }

    fn owns_smoothing_length_derivative(&self) -> bool {
        true
    }

    fn finalize(&mut self, store: &mut Storage) -> SetupResult<()> {
        let divergence = store.get_value::<f64>(QuantityId::VelocityDivergence)?.to_vec();
        let h = store.get_value::<Vector>(QuantityId::Position)?.iter().map(|p| p.h).collect::<Vec<_>>();
        let neighbour_count = if let Some(target) = self.target_neighbour_count {
            if store.has(QuantityId::NeighbourCount) {
                Some((store.get_value::<u64>(QuantityId::NeighbourCount)?.to_vec(), target))
            } else {
                None
            }
        } else {
            None
        };
        let velocity_dt = store.get_dt_mut::<Vector>(QuantityId::Position)?;
        for (i, v) in velocity_dt.iter_mut().enumerate() {
            let mut dh = -h[i] / SPATIAL_DIMENSIONS * divergence[i];
            if let Some((counts, target)) = &neighbour_count {
                let correction = self.correction_gain * (target - counts[i] as f64) / target;
                dh += correction * h[i] / SPATIAL_DIMENSIONS;
            }
            v.h = dh;
        }
        Ok(())
    }
}
