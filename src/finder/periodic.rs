//! Periodic wrapper (§4.2): composes another finder with a wrap box,
//! running one inner query per enabled axis-shift combination and
//! reporting each neighbour at its nearest (wrapped) image.

use glam::DVec3;

use super::{resolve_query_point, Finder, FinderFlags, Neighbour, PointQuery};
use crate::quantity::Vector;
use crate::scheduler::Scheduler;

/// Per-axis periodicity: `Some(length)` wraps that axis on a box of the
/// given side length; `None` leaves it open.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicBox {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl PeriodicBox {
    pub fn cubic(length: f64) -> Self {
        PeriodicBox {
            x: Some(length),
            y: Some(length),
            z: Some(length),
        }
    }

    fn offsets(&self) -> Vec<DVec3> {
        let axis_offsets = |l: Option<f64>| -> Vec<f64> {
            match l {
                Some(len) => vec![-len, 0.0, len],
                None => vec![0.0],
            }
        };
        let xs = axis_offsets(self.x);
        let ys = axis_offsets(self.y);
        let zs = axis_offsets(self.z);
        let mut out = Vec::with_capacity(xs.len() * ys.len() * zs.len());
        for &x in &xs {
            for &y in &ys {
                for &z in &zs {
                    out.push(DVec3::new(x, y, z));
                }
            }
        }
        out
    }
}

pub struct PeriodicFinder<F> {
    inner: F,
    wrap: PeriodicBox,
}

impl<F: Finder> PeriodicFinder<F> {
    pub fn new(inner: F, wrap: PeriodicBox) -> Self {
        PeriodicFinder { inner, wrap }
    }
}

impl<F: Finder> Finder for PeriodicFinder<F> {
    fn build(&mut self, points: Vec<Vector>, scheduler: &Scheduler, flags: FinderFlags) {
        self.inner.build(points, scheduler, flags);
    }

    fn find_all(&self, query: PointQuery, radius: f64, out: &mut Vec<Neighbour>) {
        let center = resolve_query_point(self.inner.points(), query).xyz;
        out.clear();
        let mut buf = Vec::new();
        for offset in self.wrap.offsets() {
            let shifted = Vector::from_xyz(center + offset);
            self.inner.find_all(PointQuery::Position(shifted), radius, &mut buf);
            for n in &buf {
                match out.iter_mut().find(|o: &&mut Neighbour| o.index == n.index) {
                    Some(existing) if existing.distance_sq <= n.distance_sq => {}
                    Some(existing) => *existing = *n,
                    None => out.push(*n),
                }
            }
        }
    }

    fn find_lower_rank(&self, particle: usize, radius: f64, out: &mut Vec<Neighbour>) {
        let center = self.inner.points()[particle].xyz;
        let rank = self.inner.rank_in_h(particle);
        self.find_all(PointQuery::Position(Vector::from_xyz(center)), radius, out);
        out.retain(|n| n.index != particle && self.inner.rank_in_h(n.index) < rank);
    }

    fn points(&self) -> &[Vector] {
        self.inner.points()
    }

    fn rank_in_h(&self, index: usize) -> usize {
        self.inner.rank_in_h(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::uniform_grid::UniformGridFinder;

    fn lattice(spacing: f64, k: usize) -> Vec<Vector> {
        let mut points = Vec::new();
        for x in 0..k {
            for y in 0..k {
                for z in 0..k {
                    points.push(Vector::new(
                        x as f64 * spacing,
                        y as f64 * spacing,
                        z as f64 * spacing,
                        0.2,
                    ));
                }
            }
        }
        points
    }

    #[test]
    fn query_count_is_shift_invariant_along_a_periodic_axis() {
        let spacing = 1.0;
        let k = 4;
        let length = spacing * k as f64;
        let points = lattice(spacing, k);
        let mut finder = PeriodicFinder::new(UniformGridFinder::new(), PeriodicBox::cubic(length));
        finder.build(points, &Scheduler::Sequential, FinderFlags::default());

        let mut a = Vec::new();
        let mut b = Vec::new();
        let base = Vector::new(0.0, 0.0, 0.0, 0.2);
        let shifted = Vector::new(length, 0.0, 0.0, 0.2);
        finder.find_all(PointQuery::Position(base), 1.5, &mut a);
        finder.find_all(PointQuery::Position(shifted), 1.5, &mut b);
        assert_eq!(a.len(), b.len());
    }
}
