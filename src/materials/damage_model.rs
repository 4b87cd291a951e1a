//! Damage strategies integrated by the `Damage` equation term (§4.5).

use crate::quantity::DamageModel;

/// Scalar Grady-Kipp: crack growth rate ~ (strain_rate / strain_rate_crit)^(1/m)
/// independent of existing damage, clamped to [0, 1] by the integrator.
#[derive(Debug, Clone, Copy)]
pub struct GradyKipp {
    pub weibull_m: f64,
    pub crack_growth_speed: f64,
    pub critical_strain_rate: f64,
}

impl GradyKipp {
    pub fn basalt() -> Self {
        GradyKipp {
            weibull_m: 9.0,
            crack_growth_speed: 4000.0,
            critical_strain_rate: 1.0e-4,
        }
    }
}

impl DamageModel for GradyKipp {
    fn name(&self) -> &str {
        "grady_kipp"
    }

    fn growth_rate(&self, strain_rate: f64, damage: f64) -> f64 {
        if strain_rate <= 0.0 || damage >= 1.0 {
            return 0.0;
        }
        let ratio = strain_rate / self.critical_strain_rate;
        self.crack_growth_speed * ratio.max(0.0).powf(1.0 / self.weibull_m)
    }

    fn clone_box(&self) -> Box<dyn DamageModel> {
        Box::new(*self)
    }
}

pub fn grady_kipp_basalt() -> Box<dyn DamageModel> {
    Box::new(GradyKipp::basalt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_rate_vanishes_once_fully_damaged() {
        let damage = GradyKipp::basalt();
        assert_eq!(damage.growth_rate(1.0, 1.0), 0.0);
        assert!(damage.growth_rate(1.0, 0.5) > 0.0);
    }
}
