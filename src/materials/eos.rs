//! Equation-of-state strategies. Plugged into a [`crate::quantity::Material`]; the
//! `PressureForce` equation term (§4.5) calls `pressure`/`sound_speed` once
//! per particle per step in its `initialize` pass.

use crate::quantity::EquationOfState;

/// Γ-law ideal gas: p = (γ-1) ρ u, c_s = sqrt(γ p / ρ).
#[derive(Debug, Clone, Copy)]
pub struct IdealGas {
    pub gamma: f64,
}

impl EquationOfState for IdealGas {
    fn name(&self) -> &str {
        "ideal_gas"
    }

    fn pressure(&self, density: f64, energy: f64) -> f64 {
        (self.gamma - 1.0) * density * energy
    }

    fn sound_speed(&self, density: f64, _energy: f64, pressure: f64) -> f64 {
        if density <= 0.0 {
            return 0.0;
        }
        (self.gamma * pressure / density).max(0.0).sqrt()
    }

    fn clone_box(&self) -> Box<dyn EquationOfState> {
        Box::new(*self)
    }
}

pub fn ideal_gas(gamma: f64) -> Box<dyn EquationOfState> {
    Box::new(IdealGas { gamma })
}

/// Tillotson equation of state (Tillotson 1962), used for rocky/icy
/// impactors: compressed regime follows a Mie-Gruneisen-like form, expanded
/// regime (density below the reference and energy above the incipient
/// vaporization point) blends toward an ideal-gas-like expansion term.
#[derive(Debug, Clone, Copy)]
pub struct Tillotson {
    pub reference_density: f64,
    pub a: f64,
    pub b: f64,
    pub e0: f64,
    pub little_a: f64,
    pub little_b: f64,
    pub alpha: f64,
    pub beta: f64,
    pub e_iv: f64,
    pub e_cv: f64,
}

impl Tillotson {
    /// Parameters approximating basalt (Benz & Asphaug 1999, Table 1).
    pub fn basalt() -> Self {
        Tillotson {
            reference_density: 2700.0,
            a: 26.7e9,
            b: 2.67e9,
            e0: 487.0e6,
            little_a: 0.5,
            little_b: 1.5,
            alpha: 5.0,
            beta: 5.0,
            e_iv: 4.72e6,
            e_cv: 18.2e6,
        }
    }

    fn mu(&self, density: f64) -> f64 {
        density / self.reference_density - 1.0
    }
}

impl EquationOfState for Tillotson {
    fn name(&self) -> &str {
        "tillotson"
    }

    fn pressure(&self, density: f64, energy: f64) -> f64 {
        let mu = self.mu(density);
        let eta = density / self.reference_density;
        let compressed = (self.little_a + self.little_b / (energy / self.e0 + 1.0))
            * density
            * energy
            + self.a * mu
            + self.b * mu * mu;
        if density >= self.reference_density || energy < self.e_iv {
            return compressed;
        }
        // Expanded / partially vaporized regime blends compressed and
        // pure-expansion terms by energy (Benz & Asphaug eq. 5-8).
        let expanded = self.little_a * density * energy
            + (self.little_b * density * energy / (energy / self.e0 + 1.0)
                + self.a * mu * (-self.beta * (1.0 / eta - 1.0)).exp())
                * (-self.alpha * (1.0 / eta - 1.0).powi(2)).exp();
        if energy > self.e_cv {
            expanded
        } else {
            let f = (energy - self.e_iv) / (self.e_cv - self.e_iv);
            compressed * (1.0 - f) + expanded * f
        }
    }

    fn sound_speed(&self, density: f64, energy: f64, pressure: f64) -> f64 {
        // Finite-difference bulk modulus estimate, consistent with how
        // solvers without a closed-form dP/drho commonly approximate c_s.
        let d_rho = density * 1e-4;
        if d_rho <= 0.0 {
            return 0.0;
        }
        let p_plus = self.pressure(density + d_rho, energy);
        let dp_drho = (p_plus - pressure) / d_rho;
        dp_drho.max(0.0).sqrt()
    }

    fn clone_box(&self) -> Box<dyn EquationOfState> {
        Box::new(*self)
    }
}

pub fn tillotson_basalt() -> Box<dyn EquationOfState> {
    Box::new(Tillotson::basalt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_gas_pressure_matches_gamma_law() {
        let gas = IdealGas { gamma: 1.4 };
        assert!((gas.pressure(1.0, 2.5) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn tillotson_pressure_is_zero_at_reference_state() {
        let t = Tillotson::basalt();
        let p = t.pressure(t.reference_density, 0.0);
        assert!(p.abs() < 1e-6, "expected near-zero pressure at rest, got {p}");
    }
}
