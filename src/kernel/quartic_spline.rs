//! Fourth-order (quartic, "M5") B-spline kernel, support radius 2.5h.

use super::Kernel;

#[derive(Debug, Clone, Copy, Default)]
pub struct QuarticSpline;

impl QuarticSpline {
    fn sigma(h: f64) -> f64 {
        1.0 / (20.0 * std::f64::consts::PI * h * h * h)
    }

    fn pow4(x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            x * x * x * x
        }
    }
}

impl Kernel for QuarticSpline {
    fn support_radius_factor(&self) -> f64 {
        2.5
    }

    fn value(&self, r: f64, h: f64) -> f64 {
        let q = r / h;
        let sigma = Self::sigma(h);
        let a = Self::pow4(2.5 - q);
        let b = Self::pow4(1.5 - q);
        let c = Self::pow4(0.5 - q);
        sigma * (a - 5.0 * b + 10.0 * c)
    }

    fn grad(&self, r: f64, h: f64) -> f64 {
        if r == 0.0 {
            return 0.0;
        }
        let q = r / h;
        let sigma = Self::sigma(h);
        let dpow4 = |x: f64| if x <= 0.0 { 0.0 } else { -4.0 * x * x * x };
        let da = dpow4(2.5 - q);
        let db = dpow4(1.5 - q);
        let dc = dpow4(0.5 - q);
        let dwdq = sigma * (da - 5.0 * db + 10.0 * dc);
        dwdq / h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_support::integrate_over_support;

    #[test]
    fn integrates_to_one_within_tolerance() {
        let kernel = QuarticSpline;
        let total = integrate_over_support(&kernel, 1.0, 20_000);
        assert!((total - 1.0).abs() < 1e-3, "integral {total} not close to 1");
    }

    #[test]
    fn value_is_continuous_across_piecewise_breaks() {
        let kernel = QuarticSpline;
        let h = 1.0;
        for q in [0.5, 1.5, 2.5] {
            let just_below = kernel.value(q * h - 1e-6, h);
            let just_above = kernel.value(q * h + 1e-6, h);
            assert!((just_below - just_above).abs() < 1e-4);
        }
    }
}
