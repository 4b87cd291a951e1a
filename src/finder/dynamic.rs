//! Dynamic finder (§4.2): picks uniform grid vs. k-d tree per build from an
//! empirical compactness metric, reusing the chosen instance across builds
//! when its type doesn't change.

use glam::DVec3;

use super::{Finder, FinderFlags, KdTreeFinder, Neighbour, PointQuery, UniformGridFinder};
use crate::quantity::Vector;
use crate::scheduler::Scheduler;

/// M <= this uses the uniform grid; above it, the k-d tree.
const COMPACTNESS_THRESHOLD: f64 = 0.4;

enum Inner {
    Grid(UniformGridFinder),
    Tree(KdTreeFinder),
}

pub struct DynamicFinder {
    inner: Inner,
}

impl Default for DynamicFinder {
    fn default() -> Self {
        DynamicFinder {
            inner: Inner::Grid(UniformGridFinder::new()),
        }
    }
}

impl DynamicFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// M = |dipole|/S + ||quadrupole||/S^2, S = diagonal(bbox) * N.
    fn compactness(points: &[Vector]) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }
        let mut min = points[0].xyz;
        let mut max = min;
        let mut centroid = DVec3::ZERO;
        for p in points {
            min = min.min(p.xyz);
            max = max.max(p.xyz);
            centroid += p.xyz;
        }
        let n = points.len() as f64;
        centroid /= n;
        let diagonal = (max - min).length();
        let s = diagonal * n;
        if s <= 0.0 {
            return 0.0;
        }

        let mut dipole = DVec3::ZERO;
        let mut quadrupole = 0.0_f64;
        for p in points {
            let d = p.xyz - centroid;
            dipole += d;
            quadrupole += d.length_squared();
        }
        dipole.length() / s + quadrupole / (s * s)
    }
}

impl Finder for DynamicFinder {
    fn build(&mut self, points: Vec<Vector>, scheduler: &Scheduler, flags: FinderFlags) {
        let use_grid = Self::compactness(&points) <= COMPACTNESS_THRESHOLD;
        match (&mut self.inner, use_grid) {
            (Inner::Grid(grid), true) => grid.build(points, scheduler, flags),
            (Inner::Tree(tree), false) => tree.build(points, scheduler, flags),
            (_, true) => {
                let mut grid = UniformGridFinder::new();
                grid.build(points, scheduler, flags);
                self.inner = Inner::Grid(grid);
            }
            (_, false) => {
                let mut tree = KdTreeFinder::default();
                tree.build(points, scheduler, flags);
                self.inner = Inner::Tree(tree);
            }
        }
    }

    fn find_all(&self, query: PointQuery, radius: f64, out: &mut Vec<Neighbour>) {
        match &self.inner {
            Inner::Grid(grid) => grid.find_all(query, radius, out),
            Inner::Tree(tree) => tree.find_all(query, radius, out),
        }
    }

    fn find_lower_rank(&self, particle: usize, radius: f64, out: &mut Vec<Neighbour>) {
        match &self.inner {
            Inner::Grid(grid) => grid.find_lower_rank(particle, radius, out),
            Inner::Tree(tree) => tree.find_lower_rank(particle, radius, out),
        }
    }

    fn points(&self) -> &[Vector] {
        match &self.inner {
            Inner::Grid(grid) => grid.points(),
            Inner::Tree(tree) => tree.points(),
        }
    }

    fn rank_in_h(&self, index: usize) -> usize {
        match &self.inner {
            Inner::Grid(grid) => grid.rank_in_h(index),
            Inner::Tree(tree) => tree.rank_in_h(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_cloud_is_compact() {
        let points: Vec<Vector> = (0..100)
            .map(|i| {
                let t = i as f64 / 100.0;
                Vector::new(t, 1.0 - t, 0.5, 0.1)
            })
            .collect();
        // A roughly centered, symmetric cloud should read as compact.
        assert!(DynamicFinder::compactness(&points) < 2.0);
    }

    #[test]
    fn picks_a_working_finder_regardless_of_shape() {
        let mut finder = DynamicFinder::new();
        let points: Vec<Vector> = (0..50)
            .map(|i| Vector::new(i as f64 * 10.0, 0.0, 0.0, 0.1))
            .collect();
        finder.build(points.clone(), &Scheduler::Sequential, FinderFlags::default());
        let mut out = Vec::new();
        finder.find_all(PointQuery::Particle(0), 5.0, &mut out);
        assert!(out.iter().all(|n| n.index == 0));
    }
}
