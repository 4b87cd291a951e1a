//! Spatial finders (§4.2): given a point cloud with per-point smoothing
//! lengths, answer radius queries either for all neighbours or only those
//! with a lower rank-in-H, so the solver can iterate pairs exactly once.

mod dynamic;
mod kdtree;
mod periodic;
mod uniform_grid;

use ordered_float::OrderedFloat;

use crate::quantity::Vector;
use crate::scheduler::Scheduler;

pub use dynamic::DynamicFinder;
pub use kdtree::KdTreeFinder;
pub use periodic::PeriodicFinder;
pub use uniform_grid::UniformGridFinder;

/// One result of a radius query: the neighbour's index into the point array
/// passed to `build`, and the squared distance to the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub index: usize,
    pub distance_sq: f64,
}

/// What a query is centered on.
#[derive(Debug, Clone, Copy)]
pub enum PointQuery {
    Position(Vector),
    Particle(usize),
}

/// `FIND_ONLY_SMALLER_H` / `PARALLELIZE` equivalent: extra behaviour a
/// caller can request beyond the basic contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinderFlags {
    pub parallelize_build: bool,
}

/// Contract shared by every spatial index: build from a point cloud, then
/// answer `find_all`/`find_lower_rank` queries. Implementations never
/// allocate per query except to grow `out`.
pub trait Finder: Send + Sync {
    fn build(&mut self, points: Vec<Vector>, scheduler: &Scheduler, flags: FinderFlags);

    fn find_all(&self, query: PointQuery, radius: f64, out: &mut Vec<Neighbour>);

    /// Neighbours `j` of `particle` with `rank_in_h(j) < rank_in_h(particle)`.
    fn find_lower_rank(&self, particle: usize, radius: f64, out: &mut Vec<Neighbour>);

    fn points(&self) -> &[Vector];

    fn rank_in_h(&self, index: usize) -> usize;
}

/// Computes each point's position in the ascending-by-H order by sorting
/// indices and inverting the resulting permutation (`AbstractFinder.h`'s
/// `makeRankH`).
pub(crate) fn compute_rank_in_h(points: &[Vector]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| OrderedFloat(points[i].h));
    let mut rank = vec![0usize; points.len()];
    for (r, &i) in order.iter().enumerate() {
        rank[i] = r;
    }
    debug_assert!(is_valid_rank_permutation(&rank));
    rank
}

fn is_valid_rank_permutation(rank: &[usize]) -> bool {
    let mut seen = vec![false; rank.len()];
    for &r in rank {
        if r >= rank.len() || seen[r] {
            return false;
        }
        seen[r] = true;
    }
    true
}

pub(crate) fn resolve_query_point(points: &[Vector], query: PointQuery) -> Vector {
    match query {
        PointQuery::Position(p) => p,
        PointQuery::Particle(i) => points[i],
    }
}

/// Brute-force reference used by tests and by the smallest point clouds the
/// dynamic finder can fall back to.
pub fn brute_force_find_all(points: &[Vector], query: Vector, radius: f64, out: &mut Vec<Neighbour>) {
    out.clear();
    let r2 = radius * radius;
    for (index, p) in points.iter().enumerate() {
        let d2 = (p.xyz - query.xyz).length_squared();
        if d2 < r2 {
            out.push(Neighbour {
                index,
                distance_sq: d2,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_in_h_is_a_permutation_sorted_by_h() {
        let points = vec![
            Vector::new(0.0, 0.0, 0.0, 0.5),
            Vector::new(1.0, 0.0, 0.0, 0.1),
            Vector::new(2.0, 0.0, 0.0, 0.3),
        ];
        let rank = compute_rank_in_h(&points);
        assert_eq!(rank[1], 0);
        assert_eq!(rank[2], 1);
        assert_eq!(rank[0], 2);
    }
}
