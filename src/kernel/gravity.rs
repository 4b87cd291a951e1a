//! Softened gravity kernel matching the cubic spline's compact support
//! (Price & Monaghan 2007): the potential `g` satisfies `laplacian(g) = 4*pi*K`
//! for the cubic spline `K`, giving a closed-form piecewise polynomial
//! instead of Newtonian `1/r`.

use super::Kernel;

#[derive(Debug, Clone, Copy, Default)]
pub struct GravityKernel;

impl GravityKernel {
    /// Unit-mass potential magnitude, `phi(q)/h`.
    fn phi(q: f64) -> f64 {
        if q < 1.0 {
            (2.0 / 3.0) * q * q - (3.0 / 10.0) * q.powi(4) + (1.0 / 10.0) * q.powi(5) - 7.0 / 5.0
        } else if q < 2.0 {
            (4.0 / 3.0) * q * q - q.powi(3) + (3.0 / 10.0) * q.powi(4) - (1.0 / 30.0) * q.powi(5)
                - 8.0 / 5.0
                + 1.0 / (15.0 * q)
        } else {
            -1.0 / q
        }
    }

    /// Force-kernel coefficient `f(q)` such that the softened acceleration
    /// is `-f(q) * separation`.
    fn f(q: f64) -> f64 {
        if q < 1.0 {
            (4.0 / 3.0) - (6.0 / 5.0) * q * q + 0.5 * q.powi(3)
        } else if q < 2.0 {
            (8.0 / 3.0) - 3.0 * q + (6.0 / 5.0) * q * q - (1.0 / 6.0) * q.powi(3)
                - 1.0 / (15.0 * q.powi(3))
        } else {
            1.0 / q.powi(3)
        }
    }
}

impl Kernel for GravityKernel {
    fn support_radius_factor(&self) -> f64 {
        2.0
    }

    fn value(&self, r: f64, h: f64) -> f64 {
        Self::phi(r / h).abs() / h
    }

    fn grad(&self, r: f64, h: f64) -> f64 {
        Self::f(r / h) / (h * h * h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_kernel_matches_newtonian_beyond_support() {
        let h = 1.0;
        let r = 4.0 * h;
        let got = GravityKernel.grad(r, h);
        let newtonian = 1.0 / r.powi(3);
        assert!((got - newtonian).abs() < 1e-10);
    }

    #[test]
    fn force_kernel_is_continuous_at_support_boundary() {
        let h = 1.0;
        let just_inside = GravityKernel.grad(2.0 * h - 1e-6, h);
        let just_outside = GravityKernel.grad(2.0 * h + 1e-6, h);
        assert!((just_inside - just_outside).abs() < 1e-4);
    }

    #[test]
    fn force_kernel_stays_finite_at_the_origin() {
        let h = 1.0;
        assert!(GravityKernel.grad(0.0, h).is_finite());
        assert!(GravityKernel.value(0.0, h).is_finite());
    }
}
