//! Diagnostic neighbour count, used by `NeighbourCountTerm` and by the
//! adaptive-smoothing-length target-neighbour-count correction.

use glam::DVec3;

use super::{Derivative, Phase};
use crate::accumulator::{Accumulated, AccumulationTag, DerivativeSlot};
use crate::error::SetupResult;
use crate::finder::Neighbour;
use crate::quantity::{QuantityId, Storage};

#[derive(Debug, Default, Clone, Copy)]
pub struct NeighbourCountDerivative;

impl Derivative for NeighbourCountDerivative {
    fn name(&self) -> &'static str {
        "neighbour_count"
    }

    fn phase(&self) -> Phase {
        Phase::PreEvaluation
    }

    fn create(&self, accumulated: &mut Accumulated) -> SetupResult<()> {
        accumulated.create::<u64>(QuantityId::NeighbourCount, DerivativeSlot::Value, AccumulationTag::Unique)
    }

    fn eval_symmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        _gradients: &[DVec3],
        _store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()> {
        for n in neighbours {
            accumulated.add::<u64>(QuantityId::NeighbourCount, DerivativeSlot::Value, n.index, 1)?;
        }
        accumulated.add::<u64>(
            QuantityId::NeighbourCount,
            DerivativeSlot::Value,
            i,
            neighbours.len() as u64,
        )?;
        Ok(())
    }

    fn eval_asymmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        _gradients: &[DVec3],
        _store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()> {
        accumulated.add::<u64>(
            QuantityId::NeighbourCount,
            DerivativeSlot::Value,
            i,
            neighbours.len() as u64,
        )?;
        Ok(())
    }
}
