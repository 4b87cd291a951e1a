//! `a_i = -sum_j m_j (p_i/rho_i^2 + p_j/rho_j^2) grad W_ij`, the symmetrized
//! SPH pressure-gradient acceleration used by `PressureForce`.

use glam::DVec3;

use super::{Derivative, Phase};
use crate::accumulator::{Accumulated, AccumulationTag, DerivativeSlot};
use crate::error::SetupResult;
use crate::finder::Neighbour;
use crate::quantity::{QuantityId, Storage, Vector};

#[derive(Debug, Default, Clone, Copy)]
pub struct PressureGradientDerivative;

impl PressureGradientDerivative {
    fn per_pair(pi: f64, rho_i: f64, pj: f64, rho_j: f64, mass_other: f64, grad: DVec3) -> DVec3 {
        if rho_i <= 0.0 || rho_j <= 0.0 {
            return DVec3::ZERO;
        }
        let coefficient = pi / (rho_i * rho_i) + pj / (rho_j * rho_j);
        -mass_other * coefficient * grad
    }
}

impl Derivative for PressureGradientDerivative {
    fn name(&self) -> &'static str {
        "pressure_gradient"
    }

    fn phase(&self) -> Phase {
        Phase::Evaluation
    }

    fn create(&self, accumulated: &mut Accumulated) -> SetupResult<()> {
        accumulated.create::<Vector>(QuantityId::Position, DerivativeSlot::D2t, AccumulationTag::Shared)
    }

    fn eval_symmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        gradients: &[DVec3],
        store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()> {
        let pressures = store.get_value::<f64>(QuantityId::Pressure)?;
        let densities = store.get_value::<f64>(QuantityId::Density)?;
        let masses = store.get_value::<f64>(QuantityId::Mass)?;
        let pi = pressures[i];
        let rho_i = densities[i];
        let mut total_i = DVec3::ZERO;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let j = n.index;
            let contribution = Self::per_pair(pi, rho_i, pressures[j], densities[j], masses[j], grad);
            total_i += contribution;
            let reaction = Self::per_pair(pressures[j], densities[j], pi, rho_i, masses[i], -grad);
            accumulated.add::<Vector>(
                QuantityId::Position,
                DerivativeSlot::D2t,
                j,
                Vector::from_xyz(reaction),
            )?;
        }
        accumulated.add::<Vector>(
            QuantityId::Position,
            DerivativeSlot::D2t,
            i,
            Vector::from_xyz(total_i),
        )?;
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
        let pressures = store.get_value::<f64>(QuantityId::Pressure)?;
        let densities = store.get_value::<f64>(QuantityId::Density)?;
        let masses = store.get_value::<f64>(QuantityId::Mass)?;
        let pi = pressures[i];
        let rho_i = densities[i];
        let mut total_i = DVec3::ZERO;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let j = n.index;
            total_i += Self::per_pair(pi, rho_i, pressures[j], densities[j], masses[j], grad);
        }
        accumulated.add::<Vector>(
            QuantityId::Position,
            DerivativeSlot::D2t,
            i,
            Vector::from_xyz(total_i),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{CubicSpline, Kernel};
    use crate::quantity::{Order, Storage};

    #[test]
    fn uniform_pressure_field_gives_near_zero_acceleration() {
        // Constant p and rho everywhere: the symmetrized gradient should
        // cancel to within truncation error on a regular lattice.
        let spacing = 0.3;
        let h = 0.6;
        let mut positions = Vec::new();
        for x in -2..=2 {
            for y in -2..=2 {
                for z in -2..=2 {
                    let p = DVec3::new(x as f64, y as f64, z as f64) * spacing;
                    positions.push(Vector::from_xyz(p).with_h(h));
                }
            }
        }
        let n = positions.len();
        let mut store = Storage::new();
        store.insert(QuantityId::Position, Order::Second, positions.clone()).unwrap();
        store.insert(QuantityId::Mass, Order::Zero, vec![1.0; n]).unwrap();
        let volume = spacing.powi(3);
        store.insert(QuantityId::Density, Order::First, vec![1.0 / volume; n]).unwrap();
        store.insert(QuantityId::Pressure, Order::Zero, vec![1.0; n]).unwrap();

        let kernel = CubicSpline;
        let derivative = PressureGradientDerivative;
        let mut accumulated = Accumulated::new(n);
        derivative.create(&mut accumulated).unwrap();

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
                    gradients.push(rel / r * kernel.grad(r, h));
                }
            }
            derivative
                .eval_asymmetric(i, &neighbours, &gradients, &store, &mut accumulated)
                .unwrap();
        }
        let centre = n / 2;
        let accel = accumulated.get::<Vector>(QuantityId::Position, DerivativeSlot::D2t).unwrap()[centre];
        assert!(accel.xyz.length() < 1e-8, "expected ~0 acceleration, got {:?}", accel.xyz);
    }
}
