//! Cubic spline (M4) kernel, support radius 2h — the default SPH kernel.

use super::Kernel;

#[derive(Debug, Clone, Copy, Default)]
pub struct CubicSpline;

impl CubicSpline {
    fn sigma(h: f64) -> f64 {
        1.0 / (std::f64::consts::PI * h * h * h)
    }
}

impl Kernel for CubicSpline {
    fn support_radius_factor(&self) -> f64 {
        2.0
    }

    fn value(&self, r: f64, h: f64) -> f64 {
        let q = r / h;
        let sigma = Self::sigma(h);
        if q < 1.0 {
            sigma * (1.0 - 1.5 * q * q + 0.75 * q * q * q)
        } else if q < 2.0 {
            sigma * 0.25 * (2.0 - q).powi(3)
        } else {
            0.0
        }
    }

    fn grad(&self, r: f64, h: f64) -> f64 {
        if r == 0.0 {
            return 0.0;
        }
        let q = r / h;
        let sigma = Self::sigma(h);
        let dwdq = if q < 1.0 {
            sigma * (-3.0 * q + 2.25 * q * q)
        } else if q < 2.0 {
            sigma * (-0.75 * (2.0 - q).powi(2))
        } else {
            0.0
        };
        dwdq / h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_support::integrate_over_support;

    #[test]
    fn integrates_to_one_within_tolerance() {
        let kernel = CubicSpline;
        let total = integrate_over_support(&kernel, 1.0, 20_000);
        assert!((total - 1.0).abs() < 1e-3, "integral {total} not close to 1");
    }

    #[test]
    fn gradient_vanishes_at_origin() {
        let kernel = CubicSpline;
        assert_eq!(kernel.grad(0.0, 1.0), 0.0);
    }

    #[test]
    fn value_and_gradient_agree_with_finite_difference() {
        let kernel = CubicSpline;
        let h = 1.0;
        let r = 0.7;
        let eps = 1e-6;
        let numeric = (kernel.value(r + eps, h) - kernel.value(r - eps, h)) / (2.0 * eps);
        let analytic = kernel.grad(r, h);
        assert!((numeric - analytic).abs() < 1e-4, "{numeric} vs {analytic}");
    }
}
