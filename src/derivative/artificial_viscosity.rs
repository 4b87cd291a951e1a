//! Monaghan-Gingold / signal-velocity artificial viscosity, contributing to
//! both `dv` and `du`. Used by `ArtificialViscosity`.

use glam::DVec3;

use super::{Derivative, Phase};
use crate::accumulator::{Accumulated, AccumulationTag, DerivativeSlot};
use crate::error::SetupResult;
use crate::finder::Neighbour;
use crate::quantity::{QuantityId, Storage, Vector};

/// Which combination rule turns the approach speed `mu_ij` into a pressure
/// term `Pi_ij`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViscosityKind {
    /// Monaghan & Gingold (1983): linear + quadratic in `mu_ij`.
    Standard,
    /// Signal-velocity form (Monaghan 1997): a single coefficient times the
    /// approaching signal speed.
    Riemann,
    /// Morris & Monaghan (1997): `Standard`'s formula with a per-particle
    /// `alpha` that decays toward a floor except where compression is strong.
    MorrisMonaghan,
}

#[derive(Debug, Clone)]
pub struct ArtificialViscosityDerivative {
    pub kind: ViscosityKind,
    /// The fixed coefficient for `Standard`/`Riemann`; the ceiling `alpha_max`
    /// a particle's switch relaxes down from for `MorrisMonaghan`.
    pub alpha: f64,
    pub beta: f64,
    /// Floor the `MorrisMonaghan` switch decays toward between compressions.
    pub alpha_min: f64,
    /// Relaxation-timescale factor (`tau = decay_scale * h / c`).
    pub decay_scale: f64,
    /// Per-particle switch, populated by `initialize` once `kind` is
    /// `MorrisMonaghan`; empty (and unused) otherwise.
    switch: Vec<f64>,
}

impl ArtificialViscosityDerivative {
    const EPSILON_H_FACTOR: f64 = 0.01;

    pub fn new(kind: ViscosityKind, alpha: f64, beta: f64) -> Self {
        ArtificialViscosityDerivative {
            kind,
            alpha,
            beta,
            alpha_min: 0.1,
            decay_scale: 0.2,
            switch: Vec::new(),
        }
    }

    fn alpha_for(&self, particle: usize) -> f64 {
        match self.kind {
            ViscosityKind::MorrisMonaghan => self.switch.get(particle).copied().unwrap_or(self.alpha),
            _ => self.alpha,
        }
    }

    fn mu(vij: DVec3, rij: DVec3, h_ij: f64) -> f64 {
        let approach = vij.dot(rij);
        if approach >= 0.0 {
            return 0.0;
        }
        let eps2 = (Self::EPSILON_H_FACTOR * h_ij).powi(2);
        h_ij * approach / (rij.length_squared() + eps2)
    }

    /// `Pi_ij`, the viscous pressure term shared by the acceleration and
    /// energy contributions. `alpha` is per-particle-pair-averaged so
    /// `MorrisMonaghan` can vary it in space.
    fn pi(&self, vij: DVec3, rij: DVec3, h_ij: f64, c_ij: f64, rho_ij: f64, alpha: f64) -> f64 {
        if rho_ij <= 0.0 {
            return 0.0;
        }
        let mu = Self::mu(vij, rij, h_ij);
        if mu == 0.0 {
            return 0.0;
        }
        match self.kind {
            ViscosityKind::Standard | ViscosityKind::MorrisMonaghan => {
                (-alpha * c_ij * mu + self.beta * mu * mu) / rho_ij
            }
            ViscosityKind::Riemann => {
                let signal_speed = c_ij - self.beta * mu;
                -alpha * signal_speed * mu / rho_ij
            }
        }
    }

    fn pair_pi(
        &self,
        vi: DVec3,
        vj: DVec3,
        ri: DVec3,
        rj: DVec3,
        hi: f64,
        hj: f64,
        ci: f64,
        cj: f64,
        rho_i: f64,
        rho_j: f64,
        alpha_i: f64,
        alpha_j: f64,
    ) -> f64 {
        let h_ij = 0.5 * (hi + hj);
        let c_ij = 0.5 * (ci + cj);
        let rho_ij = 0.5 * (rho_i + rho_j);
        let alpha = 0.5 * (alpha_i + alpha_j);
        self.pi(vi - vj, ri - rj, h_ij, c_ij, rho_ij, alpha)
    }
}

impl Derivative for ArtificialViscosityDerivative {
    fn name(&self) -> &'static str {
        "artificial_viscosity"
    }

    fn phase(&self) -> Phase {
        Phase::Evaluation
    }

    fn config_key(&self) -> String {
        format!("{:?}/{}/{}", self.kind, self.alpha, self.beta)
    }

    fn create(&self, accumulated: &mut Accumulated) -> SetupResult<()> {
        accumulated.create::<Vector>(QuantityId::Position, DerivativeSlot::D2t, AccumulationTag::Shared)?;
        accumulated.create::<f64>(QuantityId::Energy, DerivativeSlot::Dt, AccumulationTag::Shared)
    }

    /// For `MorrisMonaghan`, relaxes each particle's switch toward
    /// `alpha_min` on a timescale `tau`, driven back up toward `alpha` where
    /// the flow is compressing (`-div v` large). A no-op for the other kinds.
    fn initialize(&mut self, store: &Storage) -> SetupResult<()> {
        if self.kind != ViscosityKind::MorrisMonaghan {
            return Ok(());
        }
        let n = store.particle_count();
        if self.switch.len() != n {
            self.switch = vec![self.alpha; n];
        }
        if !store.has(QuantityId::VelocityDivergence) || !store.has(QuantityId::SoundSpeed) {
            return Ok(());
        }
        let divergence = store.get_value::<f64>(QuantityId::VelocityDivergence)?;
        let sound_speed = store.get_value::<f64>(QuantityId::SoundSpeed)?;
        let positions = store.get_value::<Vector>(QuantityId::Position)?;
        for i in 0..n {
            let source = (-divergence[i]).max(0.0);
            if sound_speed[i] <= 0.0 {
                continue;
            }
            let tau = self.decay_scale * positions[i].h / sound_speed[i];
            let target = self.alpha_min + (self.alpha - self.alpha_min) * (source * tau).min(1.0);
            let relax = (1.0 / tau.max(1e-12)).min(1.0);
            self.switch[i] += (target - self.switch[i]) * relax;
        }
        Ok(())
    }

    fn eval_symmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        gradients: &[DVec3],
        store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()> {
        let positions = store.get_value::<Vector>(QuantityId::Position)?;
        let velocities = store.get_dt::<Vector>(QuantityId::Position)?;
        let masses = store.get_value::<f64>(QuantityId::Mass)?;
        let densities = store.get_value::<f64>(QuantityId::Density)?;
        let sound_speeds = store.get_value::<f64>(QuantityId::SoundSpeed)?;
        let ri = positions[i].xyz;
        let hi = positions[i].h;
        let vi = velocities[i].xyz;
        let ci = sound_speeds[i];
        let rho_i = densities[i];
        let mut accel_i = DVec3::ZERO;
        let mut energy_i = 0.0;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let j = n.index;
            let vj = velocities[j].xyz;
            let pi_coeff = self.pair_pi(
                vi, vj, ri, positions[j].xyz, hi, positions[j].h, ci, sound_speeds[j], rho_i, densities[j],
                self.alpha_for(i), self.alpha_for(j),
            );
            let vij = vi - vj;
            accel_i += -masses[j] * pi_coeff * grad;
            energy_i += 0.5 * masses[j] * pi_coeff * vij.dot(grad);
            accumulated.add::<Vector>(
                QuantityId::Position,
                DerivativeSlot::D2t,
                j,
                Vector::from_xyz(masses[i] * pi_coeff * grad),
            )?;
            accumulated.add::<f64>(
                QuantityId::Energy,
                DerivativeSlot::Dt,
                j,
                0.5 * masses[i] * pi_coeff * vij.dot(grad),
            )?;
        }
        accumulated.add::<Vector>(QuantityId::Position, DerivativeSlot::D2t, i, Vector::from_xyz(accel_i))?;
        accumulated.add::<f64>(QuantityId::Energy, DerivativeSlot::Dt, i, energy_i)?;
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
        let positions = store.get_value::<Vector>(QuantityId::Position)?;
        let velocities = store.get_dt::<Vector>(QuantityId::Position)?;
        let masses = store.get_value::<f64>(QuantityId::Mass)?;
        let densities = store.get_value::<f64>(QuantityId::Density)?;
        let sound_speeds = store.get_value::<f64>(QuantityId::SoundSpeed)?;
        let ri = positions[i].xyz;
        let hi = positions[i].h;
        let vi = velocities[i].xyz;
        let ci = sound_speeds[i];
        let rho_i = densities[i];
        let mut accel_i = DVec3::ZERO;
        let mut energy_i = 0.0;
        for (n, &grad) in neighbours.iter().zip(gradients) {
            let j = n.index;
            let vj = velocities[j].xyz;
            let pi_coeff = self.pair_pi(
                vi, vj, ri, positions[j].xyz, hi, positions[j].h, ci, sound_speeds[j], rho_i, densities[j],
                self.alpha_for(i), self.alpha_for(j),
            );
            accel_i += -masses[j] * pi_coeff * grad;
            energy_i += 0.5 * masses[j] * pi_coeff * (vi - vj).dot(grad);
        }
        accumulated.add::<Vector>(QuantityId::Position, DerivativeSlot::D2t, i, Vector::from_xyz(accel_i))?;
        accumulated.add::<f64>(QuantityId::Energy, DerivativeSlot::Dt, i, energy_i)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approaching_particles_produce_dissipative_pressure() {
        let derivative = ArtificialViscosityDerivative { kind: ViscosityKind::Standard, alpha: 1.0, beta: 2.0 };
        let pi = derivative.pair_pi(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::new(0.5, 0.0, 0.0),
            0.1,
            0.1,
            1.0,
            1.0,
            1.0,
            1.0,
            1.0,
            1.0,
        );
        assert!(pi > 0.0, "approaching particles should give a positive (repulsive) Pi_ij, got {pi}");
    }

    #[test]
    fn separating_particles_produce_no_viscosity() {
        let derivative = ArtificialViscosityDerivative { kind: ViscosityKind::Standard, alpha: 1.0, beta: 2.0 };
        let pi = derivative.pair_pi(
            DVec3::new(-1.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::new(0.5, 0.0, 0.0),
            0.1,
            0.1,
            1.0,
            1.0,
            1.0,
            1.0,
            1.0,
            1.0,
        );
        assert_eq!(pi, 0.0);
    }
}
