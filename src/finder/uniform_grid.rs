//! Uniform grid finder (§4.2): a bucket grid sized to roughly one particle
//! per cell, queried by walking the cell range the query sphere overlaps.

use glam::DVec3;

use super::{compute_rank_in_h, resolve_query_point, Finder, FinderFlags, Neighbour, PointQuery};
use crate::quantity::Vector;
use crate::scheduler::Scheduler;

/// Relative inflation applied to the tight bounding box so boundary
/// particles never land exactly on a cell face. Scales with box size and
/// with distance from the origin, since far-from-origin clouds lose
/// precision in absolute terms.
const BOUNDARY_EPSILON: f64 = 1e-9;

#[derive(Default)]
pub struct UniformGridFinder {
    points: Vec<Vector>,
    rank: Vec<usize>,
    origin: DVec3,
    cell_size: DVec3,
    dims: [usize; 3],
    cells: Vec<Vec<usize>>,
}

impl UniformGridFinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell_count_per_axis(n: usize) -> usize {
        let c = 1.0_f64;
        ((c * n as f64).cbrt().ceil() as usize + 1).max(1)
    }

    fn flat_index(&self, cell: [usize; 3]) -> usize {
        cell[0] + self.dims[0] * (cell[1] + self.dims[1] * cell[2])
    }

    fn cell_of(&self, p: DVec3) -> [usize; 3] {
        let rel = (p - self.origin) / self.cell_size;
        [
            (rel.x as isize).clamp(0, self.dims[0] as isize - 1) as usize,
            (rel.y as isize).clamp(0, self.dims[1] as isize - 1) as usize,
            (rel.z as isize).clamp(0, self.dims[2] as isize - 1) as usize,
        ]
    }

    fn axis_range(&self, axis: usize, center: f64, radius: f64) -> (usize, usize) {
        let origin = match axis {
            0 => self.origin.x,
            1 => self.origin.y,
            _ => self.origin.z,
        };
        let size = match axis {
            0 => self.cell_size.x,
            1 => self.cell_size.y,
            _ => self.cell_size.z,
        };
        let lo = ((center - radius - origin) / size).floor().max(0.0) as usize;
        let hi_raw = ((center + radius - origin) / size).floor();
        let hi = if hi_raw < 0.0 {
            0
        } else {
            (hi_raw as usize).min(self.dims[axis] - 1)
        };
        (lo.min(self.dims[axis] - 1), hi)
    }

    fn query_into(&self, center: DVec3, radius: f64, out: &mut Vec<Neighbour>) {
        out.clear();
        if self.points.is_empty() {
            return;
        }
        let r2 = radius * radius;
        let (x0, x1) = self.axis_range(0, center.x, radius);
        let (y0, y1) = self.axis_range(1, center.y, radius);
        let (z0, z1) = self.axis_range(2, center.z, radius);
        for z in z0..=z1 {
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let cell = &self.cells[self.flat_index([x, y, z])];
                    for &index in cell {
                        let d2 = (self.points[index].xyz - center).length_squared();
                        if d2 < r2 {
                            out.push(Neighbour {
                                index,
                                distance_sq: d2,
                            });
                        }
                    }
                }
            }
        }
    }
}

impl Finder for UniformGridFinder {
    fn build(&mut self, points: Vec<Vector>, _scheduler: &Scheduler, _flags: FinderFlags) {
        self.rank = compute_rank_in_h(&points);
        if points.is_empty() {
            self.points = points;
            self.dims = [1, 1, 1];
            self.cells = vec![Vec::new()];
            return;
        }
        let mut min = points[0].xyz;
        let mut max = points[0].xyz;
        for p in &points {
            min = min.min(p.xyz);
            max = max.max(p.xyz);
        }
        let extent = (max - min).max(DVec3::splat(f64::EPSILON));
        let scale = extent.length().max(min.length()).max(max.length()).max(1.0);
        let epsilon = extent * BOUNDARY_EPSILON + DVec3::splat(scale * BOUNDARY_EPSILON);
        min -= epsilon;
        max += epsilon;

        let d = Self::cell_count_per_axis(points.len());
        self.dims = [d, d, d];
        self.origin = min;
        self.cell_size = ((max - min) / d as f64).max(DVec3::splat(f64::EPSILON));
        self.cells = vec![Vec::new(); d * d * d];
        for (index, p) in points.iter().enumerate() {
            let cell = self.cell_of(p.xyz);
            let flat = self.flat_index(cell);
            self.cells[flat].push(index);
        }
        self.points = points;
    }

    fn find_all(&self, query: PointQuery, radius: f64, out: &mut Vec<Neighbour>) {
        let center = resolve_query_point(&self.points, query).xyz;
        self.query_into(center, radius, out);
    }

    fn find_lower_rank(&self, particle: usize, radius: f64, out: &mut Vec<Neighbour>) {
        let center = self.points[particle].xyz;
        let rank = self.rank[particle];
        self.query_into(center, radius, out);
        out.retain(|n| n.index != particle && self.rank[n.index] < rank);
    }

    fn points(&self) -> &[Vector] {
        &self.points
    }

    fn rank_in_h(&self, index: usize) -> usize {
        self.rank[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::brute_force_find_all;
    use crate::scheduler::Scheduler;

    fn random_cloud(n: usize, seed: u64) -> Vec<Vector> {
        let mut state = seed.wrapping_mul(2654435761).max(1);
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10000) as f64 / 1000.0
        };
        (0..n)
            .map(|_| Vector::new(next(), next(), next(), 0.1 + next() * 0.01))
            .collect()
    }

    #[test]
    fn find_all_matches_brute_force() {
        let points = random_cloud(200, 42);
        let mut finder = UniformGridFinder::new();
        finder.build(points.clone(), &Scheduler::Sequential, FinderFlags::default());
        let mut got = Vec::new();
        let mut expected = Vec::new();
        for (i, p) in points.iter().enumerate() {
            finder.find_all(PointQuery::Particle(i), 1.5, &mut got);
            brute_force_find_all(&points, *p, 1.5, &mut expected);
            let mut got_idx: Vec<_> = got.iter().map(|n| n.index).collect();
            let mut expected_idx: Vec<_> = expected.iter().map(|n| n.index).collect();
            got_idx.sort_unstable();
            expected_idx.sort_unstable();
            assert_eq!(got_idx, expected_idx);
        }
    }

    #[test]
    fn find_lower_rank_visits_each_pair_once() {
        let points = random_cloud(80, 7);
        let mut finder = UniformGridFinder::new();
        finder.build(points.clone(), &Scheduler::Sequential, FinderFlags::default());
        let mut pairs = std::collections::HashSet::new();
        let mut buf = Vec::new();
        for i in 0..points.len() {
            finder.find_lower_rank(i, 1.5, &mut buf);
            for n in &buf {
                let key = (i.min(n.index), i.max(n.index));
                assert!(pairs.insert(key), "pair {key:?} visited twice");
            }
        }
        let mut expected_pairs = std::collections::HashSet::new();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                if (points[i].xyz - points[j].xyz).length() < 1.5 {
                    expected_pairs.insert((i, j));
                }
            }
        }
        assert_eq!(pairs, expected_pairs);
    }
}
