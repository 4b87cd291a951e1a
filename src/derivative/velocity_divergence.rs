//! `(div v)_i = -(1/rho_i) sum_j (m_j/rho_i)(v_i - v_j) . grad W_ij`, used by
//! `ContinuityEquation` and the energy term of `PressureForce`.

use glam::DVec3;

use super::{Derivative, Phase};
use crate::accumulator::{Accumulated, AccumulationTag, DerivativeSlot};
use crate::error::SetupResult;
use crate::finder::Neighbour;
use crate::quantity::{QuantityId, Storage, Vector};

#[derive(Debug, Default, Clone, Copy)]
pub struct VelocityDivergenceDerivative;

impl VelocityDivergenceDerivative {
    fn per_pair(
        vi: DVec3,
        vj: DVec3,
        mass_other: f64,
        rho_self: f64,
        grad: DVec3,
    ) -> f64 {
        if rho_self <= 0.0 {
            return 0.0;
        }
        -(mass_other / rho_self) * (vi - vj).dot(grad)
    }
}

impl Derivative for VelocityDivergenceDerivative {
    fn name(&self) -> &'static str {
        "velocity_divergence"
    }

    fn phase(&self) -> Phase {
        Phase::PreEvaluation
    }

    fn create(&self, accumulated: &mut Accumulated) -> SetupResult<()> {
        accumulated.create::<f64>(
            QuantityId::VelocityDivergence,
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
        let mut total_i = 0.0;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let j = n.index;
            let vj = velocities[j].xyz;
            total_i += Self::per_pair(vi, vj, masses[j], rho_i, grad);
            let contribution_j = Self::per_pair(vj, vi, masses[i], densities[j], -grad);
            accumulated.add::<f64>(QuantityId::VelocityDivergence, DerivativeSlot::Value, j, contribution_j)?;
        }
        accumulated.add::<f64>(QuantityId::VelocityDivergence, DerivativeSlot::Value, i, total_i)?;
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
        let mut total_i = 0.0;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let vj = velocities[n.index].xyz;
            total_i += Self::per_pair(vi, vj, masses[n.index], rho_i, grad);
        }
        accumulated.add::<f64>(QuantityId::VelocityDivergence, DerivativeSlot::Value, i, total_i)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::{Order, Storage};

    #[test]
    fn diverging_velocity_field_yields_positive_divergence_near_three() {
        // v(r) = r on a small cubic lattice: div.r = 3 interior (§8).
        let spacing = 0.3;
        let h = 0.6;
        let mut positions = Vec::new();
        let mut velocities = Vec::new();
        for x in -2..=2 {
            for y in -2..=2 {
                for z in -2..=2 {
                    let p = DVec3::new(x as f64, y as f64, z as f64) * spacing;
                    positions.push(Vector::from_xyz(p).with_h(h));
                    velocities.push(Vector::from_xyz(p));
                }
            }
        }
        let n = positions.len();
        let mut store = Storage::new();
        store.insert(QuantityId::Position, Order::Second, positions.clone()).unwrap();
        for (i, v) in velocities.into_iter().enumerate() {
            store.get_dt_mut::<Vector>(QuantityId::Position).unwrap()[i] = v;
        }
        store.insert(QuantityId::Mass, Order::Zero, vec![1.0; n]).unwrap();
        let volume = spacing.powi(3);
        store.insert(QuantityId::Density, Order::First, vec![1.0 / volume; n]).unwrap();

        let kernel = crate::kernel::CubicSpline;
        use crate::kernel::Kernel;
        let derivative = VelocityDivergenceDerivative;
        let mut accumulated = Accumulated::new(n);
        derivative.create(&mut accumulated).unwrap();

        // Brute force neighbour loop (asymmetric, simplest to reason about).
        for i in 0..n {
            let mut neighbours = Vec::new();
            let mut gradients = Vec::new();
            for j in 0..n {
                if j == i {
                    continue;
                }
                let rel = positions[i].xyz - positions[j].xyz;
                let r = rel.length();
                if r < 2.0 * h {
                    neighbours.push(Neighbour { index: j, distance_sq: r * r });
                    let grad_mag = kernel.grad(r, h);
                    gradients.push(rel / r * grad_mag);
                }
            }
            derivative
                .eval_asymmetric(i, &neighbours, &gradients, &store, &mut accumulated)
                .unwrap();
        }
        let centre = n / 2;
        let div = accumulated.get::<f64>(QuantityId::VelocityDivergence, DerivativeSlot::Value).unwrap()[centre];
        assert!((div - 3.0).abs() < 0.3, "expected divergence near 3, got {div}");
    }
}
