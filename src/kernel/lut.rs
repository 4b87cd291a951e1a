//! Lookup-table kernel (§4.3): tabulates a wrapped SPH kernel's dimensionless
//! shape on `q^2 in [0, R^2]` at a reference smoothing length, linearly
//! interpolated at query time. Built for the three compact-support SPH
//! kernels, whose `value` scales as `1/h^3` and `grad` as `1/h^4` — the
//! gravity kernel is evaluated directly instead of through a LUT (it already
//! is a cheap closed-form polynomial).

use super::Kernel;

const DEFAULT_ENTRIES: usize = 40_000;

pub struct LookupKernel {
    support_radius_factor: f64,
    value_table: Vec<f64>,
    grad_table: Vec<f64>,
    step: f64,
}

impl LookupKernel {
    pub fn build(kernel: &dyn Kernel, entries: usize) -> Self {
        let r = kernel.support_radius_factor();
        let q_max_sq = r * r;
        let step = q_max_sq / entries as f64;
        let mut value_table = Vec::with_capacity(entries + 1);
        let mut grad_table = Vec::with_capacity(entries + 1);
        for i in 0..=entries {
            let q_sq = i as f64 * step;
            let q = q_sq.sqrt();
            value_table.push(kernel.value(q, 1.0));
            grad_table.push(kernel.grad(q, 1.0));
        }
        LookupKernel {
            support_radius_factor: r,
            value_table,
            grad_table,
            step,
        }
    }

    pub fn with_default_resolution(kernel: &dyn Kernel) -> Self {
        Self::build(kernel, DEFAULT_ENTRIES)
    }

    fn interpolate(table: &[f64], q_sq: f64, step: f64) -> f64 {
        let max_index = table.len() - 1;
        let position = (q_sq / step).min(max_index as f64);
        let lo = position.floor() as usize;
        let hi = (lo + 1).min(max_index);
        let frac = position - lo as f64;
        table[lo] * (1.0 - frac) + table[hi] * frac
    }
}

impl Kernel for LookupKernel {
    fn support_radius_factor(&self) -> f64 {
        self.support_radius_factor
    }

    fn value(&self, r: f64, h: f64) -> f64 {
        let q = r / h;
        if q >= self.support_radius_factor {
            return 0.0;
        }
        Self::interpolate(&self.value_table, q * q, self.step) / (h * h * h)
    }

    fn grad(&self, r: f64, h: f64) -> f64 {
        if r == 0.0 {
            return 0.0;
        }
        let q = r / h;
        if q >= self.support_radius_factor {
            return 0.0;
        }
        Self::interpolate(&self.grad_table, q * q, self.step) / (h * h * h * h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CubicSpline;

    #[test]
    fn lookup_matches_analytic_kernel_within_table_resolution() {
        let analytic = CubicSpline;
        let lut = LookupKernel::build(&analytic, 40_000);
        for &r in &[0.0, 0.3, 0.9, 1.0, 1.5, 1.99] {
            let h = 1.3;
            let a = analytic.value(r, h);
            let b = lut.value(r, h);
            assert!((a - b).abs() < 1e-4, "value mismatch at r={r}: {a} vs {b}");
        }
    }

    #[test]
    fn lookup_is_zero_outside_support() {
        let analytic = CubicSpline;
        let lut = LookupKernel::build(&analytic, 1000);
        assert_eq!(lut.value(10.0, 1.0), 0.0);
        assert_eq!(lut.grad(10.0, 1.0), 0.0);
    }
}
