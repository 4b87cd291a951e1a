//! Smoothing kernels (§4.3): compact-support weight functions, LUT-cached
//! for runtime evaluation, plus the matching softened gravity kernel.

mod cubic_spline;
mod gaussian;
mod gravity;
mod lut;
mod quartic_spline;

pub use cubic_spline::CubicSpline;
pub use gaussian::Gaussian;
pub use gravity::GravityKernel;
pub use lut::LookupKernel;
pub use quartic_spline::QuarticSpline;

/// A kernel `K(q, h)` with compact support of radius `R*h`, `q = r/h`.
/// `value`/`grad` take the raw separation `r` and smoothing length `h`.
pub trait Kernel: Send + Sync {
    /// Compact support radius as a multiple of `h`.
    fn support_radius_factor(&self) -> f64;

    /// `K(r, h)`, normalized so `integral K d^3r = 1`.
    fn value(&self, r: f64, h: f64) -> f64;

    /// `dK/dr` at separation `r`. `grad(0, h) == 0` by construction for
    /// every kernel below (even power series in `q`).
    fn grad(&self, r: f64, h: f64) -> f64;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Kernel;

    /// Numerically integrates `4*pi*r^2*K(r,h)` over the support via the
    /// trapezoid rule; used to check kernel normalization (§8).
    pub fn integrate_over_support(kernel: &dyn Kernel, h: f64, steps: usize) -> f64 {
        let r_max = kernel.support_radius_factor() * h;
        let dr = r_max / steps as f64;
        let mut total = 0.0;
        for i in 0..steps {
            let r0 = i as f64 * dr;
            let r1 = (i + 1) as f64 * dr;
            let f0 = 4.0 * std::f64::consts::PI * r0 * r0 * kernel.value(r0, h);
            let f1 = 4.0 * std::f64::consts::PI * r1 * r1 * kernel.value(r1, h);
            total += 0.5 * (f0 + f1) * dr;
        }
        total
    }
}
