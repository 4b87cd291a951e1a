//! Gaussian kernel, truncated at support radius 5h (beyond that the weight
//! is negligible relative to the table's float precision).

use super::Kernel;

#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl Gaussian {
    fn sigma(h: f64) -> f64 {
        1.0 / (std::f64::consts::PI.powf(1.5) * h * h * h)
    }
}

impl Kernel for Gaussian {
    fn support_radius_factor(&self) -> f64 {
        5.0
    }

    fn value(&self, r: f64, h: f64) -> f64 {
        let q = r / h;
        if q >= 5.0 {
            return 0.0;
        }
        Self::sigma(h) * (-q * q).exp()
    }

    fn grad(&self, r: f64, h: f64) -> f64 {
        if r == 0.0 {
            return 0.0;
        }
        let q = r / h;
        if q >= 5.0 {
            return 0.0;
        }
        let dwdq = Self::sigma(h) * (-2.0 * q) * (-q * q).exp();
        dwdq / h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_support::integrate_over_support;

    #[test]
    fn integrates_close_to_one_despite_truncation() {
        let kernel = Gaussian;
        let total = integrate_over_support(&kernel, 1.0, 40_000);
        assert!((total - 1.0).abs() < 1e-3, "integral {total} not close to 1");
    }
}
