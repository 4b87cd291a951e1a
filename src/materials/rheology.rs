//! Rheology strategies bounding the deviatoric stress the `SolidStress`
//! equation term (§4.5) integrates.

use crate::quantity::Rheology;

/// Von Mises plasticity: caps the second stress invariant at a
/// damage-reduced yield stress, independent of pressure.
#[derive(Debug, Clone, Copy)]
pub struct VonMises {
    pub shear_modulus: f64,
    pub yield_stress: f64,
}

impl Rheology for VonMises {
    fn name(&self) -> &str {
        "von_mises"
    }

    fn shear_modulus(&self) -> f64 {
        self.shear_modulus
    }

    fn yield_stress(&self, _density: f64, damage: f64) -> f64 {
        self.yield_stress * (1.0 - damage.clamp(0.0, 1.0))
    }

    fn clone_box(&self) -> Box<dyn Rheology> {
        Box::new(*self)
    }
}

pub fn von_mises(shear_modulus: f64, yield_stress: f64) -> Box<dyn Rheology> {
    Box::new(VonMises {
        shear_modulus,
        yield_stress,
    })
}

/// Drucker-Prager plasticity: yield stress grows linearly with pressure up
/// to a cohesion-free cap, used for granular/rubble-pile regolith.
#[derive(Debug, Clone, Copy)]
pub struct DruckerPrager {
    pub shear_modulus: f64,
    pub cohesion: f64,
    pub friction: f64,
    pub cap: f64,
}

impl Rheology for DruckerPrager {
    fn name(&self) -> &str {
        "drucker_prager"
    }

    fn shear_modulus(&self) -> f64 {
        self.shear_modulus
    }

    fn yield_stress(&self, pressure: f64, damage: f64) -> f64 {
        let undamaged = (self.cohesion + self.friction * pressure.max(0.0)).min(self.cap);
        undamaged * (1.0 - damage.clamp(0.0, 1.0))
    }

    fn clone_box(&self) -> Box<dyn Rheology> {
        Box::new(*self)
    }
}

pub fn drucker_prager(shear_modulus: f64, cohesion: f64, friction: f64, cap: f64) -> Box<dyn Rheology> {
    Box::new(DruckerPrager {
        shear_modulus,
        cohesion,
        friction,
        cap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn von_mises_yield_stress_scales_with_damage() {
        let rheology = VonMises {
            shear_modulus: 1.0e10,
            yield_stress: 3.5e9,
        };
        assert!((rheology.yield_stress(0.0, 0.0) - 3.5e9).abs() < 1.0);
        assert!((rheology.yield_stress(0.0, 1.0)).abs() < 1.0);
    }
}
