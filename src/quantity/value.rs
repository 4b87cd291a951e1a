//! Value types stored in quantity columns. `Vector` carries the smoothing
//! length H in its 4th lane per §3's convention: position's H lane defines
//! the particle's support radius, and velocity/acceleration carry dH/dt and
//! d²H/dt² in the same lane.

use std::ops::{Div, Mul};

use derive_more::{Add, AddAssign, Neg, Sub, SubAssign};
use glam::DVec3;

/// A 4-lane vector: three spatial components plus an H lane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Add, AddAssign, Sub, SubAssign, Neg)]
pub struct Vector {
    pub xyz: DVec3,
    pub h: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector {
        xyz: DVec3::ZERO,
        h: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64, h: f64) -> Self {
        Self {
            xyz: DVec3::new(x, y, z),
            h,
        }
    }

    pub fn from_xyz(xyz: DVec3) -> Self {
        Self { xyz, h: 0.0 }
    }

    pub fn with_h(mut self, h: f64) -> Self {
        self.h = h;
        self
    }

    pub fn length(&self) -> f64 {
        self.xyz.length()
    }

    pub fn length_squared(&self) -> f64 {
        self.xyz.length_squared()
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.xyz.dot(other.xyz)
    }

    pub fn is_finite(&self) -> bool {
        self.xyz.is_finite() && self.h.is_finite()
    }

    pub fn outer(&self, other: &Self) -> SymmetricTensor {
        let a = self.xyz;
        let b = other.xyz;
        SymmetricTensor {
            diag: DVec3::new(a.x * b.x, a.y * b.y, a.z * b.z),
            off: DVec3::new(
                0.5 * (a.x * b.y + a.y * b.x),
                0.5 * (a.x * b.z + a.z * b.x),
                0.5 * (a.y * b.z + a.z * b.y),
            ),
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Self {
        Vector {
            xyz: self.xyz * rhs,
            h: self.h * rhs,
        }
    }
}

impl Div<f64> for Vector {
    type Output = Vector;
    fn div(self, rhs: f64) -> Self {
        Vector {
            xyz: self.xyz / rhs,
            h: self.h / rhs,
        }
    }
}

/// A symmetric 3x3 tensor, stored as three diagonal and three off-diagonal
/// entries (xy, xz, yz).
#[derive(Debug, Clone, Copy, PartialEq, Default, Add, AddAssign, Sub, Neg)]
pub struct SymmetricTensor {
    pub diag: DVec3,
    pub off: DVec3,
}

impl SymmetricTensor {
    pub const ZERO: SymmetricTensor = SymmetricTensor {
        diag: DVec3::ZERO,
        off: DVec3::ZERO,
    };

    pub fn identity(scale: f64) -> Self {
        SymmetricTensor {
            diag: DVec3::splat(scale),
            off: DVec3::ZERO,
        }
    }

    pub fn trace(&self) -> f64 {
        self.diag.x + self.diag.y + self.diag.z
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        match (row.min(col), row.max(col)) {
            (0, 0) => self.diag.x,
            (1, 1) => self.diag.y,
            (2, 2) => self.diag.z,
            (0, 1) => self.off.x,
            (0, 2) => self.off.y,
            (1, 2) => self.off.z,
            _ => panic!("tensor index out of range: ({row}, {col})"),
        }
    }

    /// Contracts with a vector: (T . v).
    pub fn apply(&self, v: &Vector) -> Vector {
        let x = self.diag.x * v.xyz.x + self.off.x * v.xyz.y + self.off.y * v.xyz.z;
        let y = self.off.x * v.xyz.x + self.diag.y * v.xyz.y + self.off.z * v.xyz.z;
        let z = self.off.y * v.xyz.x + self.off.z * v.xyz.y + self.diag.z * v.xyz.z;
        Vector::new(x, y, z, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.diag.is_finite() && self.off.is_finite()
    }
}

impl Mul<f64> for SymmetricTensor {
    type Output = SymmetricTensor;
    fn mul(self, rhs: f64) -> Self {
        SymmetricTensor {
            diag: self.diag * rhs,
            off: self.off * rhs,
        }
    }
}

/// A traceless symmetric tensor, stored with 5 independent components; `zz`
/// is derived as `-(xx + yy)`. Used for the deviatoric stress tensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Add, AddAssign, Sub, Neg)]
pub struct TracelessTensor {
    pub xx: f64,
    pub yy: f64,
    pub xy: f64,
    pub xz: f64,
    pub yz: f64,
}

impl TracelessTensor {
    pub const ZERO: TracelessTensor = TracelessTensor {
        xx: 0.0,
        yy: 0.0,
        xy: 0.0,
        xz: 0.0,
        yz: 0.0,
    };

    pub fn zz(&self) -> f64 {
        -(self.xx + self.yy)
    }

    /// Projects a general symmetric tensor onto its traceless part.
    pub fn from_symmetric(t: &SymmetricTensor) -> Self {
        let mean = t.trace() / 3.0;
        TracelessTensor {
            xx: t.diag.x - mean,
            yy: t.diag.y - mean,
            xy: t.off.x,
            xz: t.off.y,
            yz: t.off.z,
        }
    }

    pub fn to_symmetric(&self) -> SymmetricTensor {
        SymmetricTensor {
            diag: DVec3::new(self.xx, self.yy, self.zz()),
            off: DVec3::new(self.xy, self.xz, self.yz),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.xx.is_finite()
            && self.yy.is_finite()
            && self.xy.is_finite()
            && self.xz.is_finite()
            && self.yz.is_finite()
    }

    /// `S:S`, the double contraction used to form the second stress
    /// invariant (`sqrt(1.5 * S:S)`) for yield checks.
    pub fn double_contraction(&self) -> f64 {
        self.xx * self.xx
            + self.yy * self.yy
            + self.zz() * self.zz()
            + 2.0 * (self.xy * self.xy + self.xz * self.xz + self.yz * self.yz)
    }
}

impl Mul<f64> for TracelessTensor {
    type Output = TracelessTensor;
    fn mul(self, rhs: f64) -> Self {
        TracelessTensor {
            xx: self.xx * rhs,
            yy: self.yy * rhs,
            xy: self.xy * rhs,
            xz: self.xz * rhs,
            yz: self.yz * rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_is_close(x: f64, y: f64) {
        assert!((x - y).abs() < 1e-10, "{x} not close to {y}");
    }

    #[test]
    fn traceless_projection_round_trips() {
        let t = SymmetricTensor {
            diag: DVec3::new(2.0, -1.0, -1.0),
            off: DVec3::new(0.5, 0.2, -0.3),
        };
        let traceless = TracelessTensor::from_symmetric(&t);
        assert_is_close(traceless.trace_zero_check(), 0.0);
        let back = traceless.to_symmetric();
        assert_is_close(back.off.x, t.off.x);
        assert_is_close(back.diag.x - back.diag.y, t.diag.x - t.diag.y);
    }

    impl TracelessTensor {
        fn trace_zero_check(&self) -> f64 {
            self.xx + self.yy + self.zz()
        }
    }

    #[test]
    fn vector_h_lane_travels_with_arithmetic() {
        let a = Vector::new(1.0, 0.0, 0.0, 0.1);
        let b = Vector::new(0.0, 1.0, 0.0, 0.2);
        let sum = a + b;
        assert_is_close(sum.h, 0.3);
        assert_is_close(sum.xyz.x, 1.0);
    }
}
