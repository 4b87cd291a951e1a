//! Strain-rate tensor `(1/2)(dv_a/dx_b + dv_b/dx_a)`, used by `SolidStress`
//! to evolve the deviatoric stress.

use glam::DVec3;

use super::{Derivative, Phase};
use crate::accumulator::{Accumulated, AccumulationTag, DerivativeSlot};
use crate::error::SetupResult;
use crate::finder::Neighbour;
use crate::quantity::{QuantityId, Storage, SymmetricTensor, Vector};

#[derive(Debug, Default, Clone, Copy)]
pub struct VelocityGradientDerivative;

fn symmetric_outer(a: DVec3, b: DVec3) -> SymmetricTensor {
    SymmetricTensor {
        diag: DVec3::new(a.x * b.x, a.y * b.y, a.z * b.z),
        off: DVec3::new(
            0.5 * (a.x * b.y + a.y * b.x),
            0.5 * (a.x * b.z + a.z * b.x),
            0.5 * (a.y * b.z + a.z * b.y),
        ),
    }
}

impl VelocityGradientDerivative {
    fn per_pair(vi: DVec3, vj: DVec3, mass_other: f64, rho_self: f64, grad: DVec3) -> SymmetricTensor {
        if rho_self <= 0.0 {
            return SymmetricTensor::ZERO;
        }
        symmetric_outer(vi - vj, grad) * -(mass_other / rho_self)
    }
}

impl Derivative for VelocityGradientDerivative {
    fn name(&self) -> &'static str {
        "velocity_gradient"
    }

    fn phase(&self) -> Phase {
        Phase::PreEvaluation
    }

    fn create(&self, accumulated: &mut Accumulated) -> SetupResult<()> {
        accumulated.create::<SymmetricTensor>(
            QuantityId::VelocityGradient,
            DerivativeSlot::Value,
            AccumulationTag::Unique,
        )
    }

    fn eval_symmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        gradients: &[DVec3],
        store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()> {
        let velocities = store.get_dt::<Vector>(QuantityId::Position)?;
        let masses = store.get_value::<f64>(QuantityId::Mass)?;
        let densities = store.get_value::<f64>(QuantityId::Density)?;
        let vi = velocities[i].xyz;
        let rho_i = densities[i];
        let mut total_i = SymmetricTensor::ZERO;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let j = n.index;
            let vj = velocities[j].xyz;
            total_i += Self::per_pair(vi, vj, masses[j], rho_i, grad);
            let contribution_j = Self::per_pair(vj, vi, masses[i], densities[j], -grad);
            accumulated.add::<SymmetricTensor>(
                QuantityId::VelocityGradient,
                DerivativeSlot::Value,
                j,
                contribution_j,
            )?;
        }
        accumulated.add::<SymmetricTensor>(QuantityId::VelocityGradient, DerivativeSlot::Value, i, total_i)?;
        Ok(())
    }

    fn eval_asymmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        gradients: &[DVec3],
        store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()> {
        let velocities = store.get_dt::<Vector>(QuantityId::Position)?;
        let masses = store.get_value::<f64>(QuantityId::Mass)?;
        let densities = store.get_value::<f64>(QuantityId::Density)?;
        let vi = velocities[i].xyz;
        let rho_i = densities[i];
        let mut total_i = SymmetricTensor::ZERO;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let vj = velocities[n.index].xyz;
            total_i += Self::per_pair(vi, vj, masses[n.index], rho_i, grad);
        }
        accumulated.add::<SymmetricTensor>(QuantityId::VelocityGradient, DerivativeSlot::Value, i, total_i)?;
        Ok(())
    }
}
