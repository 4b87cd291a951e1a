//! K-d tree finder (§4.2): median-split on the widest axis down to a
//! configurable leaf size, built in parallel via the scheduler's thread
//! pool when requested.

use glam::DVec3;

use super::{compute_rank_in_h, resolve_query_point, Finder, FinderFlags, Neighbour, PointQuery};
use crate::quantity::Vector;
use crate::scheduler::Scheduler;

const DEFAULT_LEAF_SIZE: usize = 25;
/// Below this point count, parallel recursion stops paying for itself.
const PARALLEL_SPLIT_THRESHOLD: usize = 4096;

enum NodeKind {
    Leaf(Vec<usize>),
    Internal { left: usize, right: usize },
}

struct Node {
    bbox_min: DVec3,
    bbox_max: DVec3,
    kind: NodeKind,
}

pub struct KdTreeFinder {
    points: Vec<Vector>,
    rank: Vec<usize>,
    nodes: Vec<Node>,
    root: usize,
    leaf_size: usize,
}

impl Default for KdTreeFinder {
    fn default() -> Self {
        Self::with_leaf_size(DEFAULT_LEAF_SIZE)
    }
}

impl KdTreeFinder {
    pub fn with_leaf_size(leaf_size: usize) -> Self {
        KdTreeFinder {
            points: Vec::new(),
            rank: Vec::new(),
            nodes: Vec::new(),
            root: 0,
            leaf_size: leaf_size.max(1),
        }
    }

    fn bbox_of(points: &[Vector], indices: &[usize]) -> (DVec3, DVec3) {
        let mut min = points[indices[0]].xyz;
        let mut max = min;
        for &i in indices {
            min = min.min(points[i].xyz);
            max = max.max(points[i].xyz);
        }
        (min, max)
    }

    fn widest_axis(min: DVec3, max: DVec3) -> usize {
        let extent = max - min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    fn axis_value(p: DVec3, axis: usize) -> f64 {
        match axis {
            0 => p.x,
            1 => p.y,
            _ => p.z,
        }
    }

    /// Builds the subtree for `indices` (consumed), returning its node index
    /// in `nodes`. Not thread-safe to call concurrently on the same `nodes`
    /// vec; parallel builds build disjoint subtrees independently and
    /// splice them together in `build`.
    fn build_recursive(points: &[Vector], mut indices: Vec<usize>, leaf_size: usize, parallel: bool) -> Subtree {
        let (bbox_min, bbox_max) = Self::bbox_of(points, &indices);
        if indices.len() <= leaf_size {
            return Subtree {
                nodes: vec![Node {
                    bbox_min,
                    bbox_max,
                    kind: NodeKind::Leaf(indices),
                }],
                root: 0,
            };
        }
        let axis = Self::widest_axis(bbox_min, bbox_max);
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            Self::axis_value(points[a].xyz, axis)
                .partial_cmp(&Self::axis_value(points[b].xyz, axis))
                .unwrap()
        });
        let right_indices = indices.split_off(mid);
        let left_indices = indices;

        let recurse_parallel = parallel && (left_indices.len() + right_indices.len()) > PARALLEL_SPLIT_THRESHOLD;
        let (mut left, mut right) = if recurse_parallel {
            rayon::join(
                || Self::build_recursive(points, left_indices, leaf_size, parallel),
                || Self::build_recursive(points, right_indices, leaf_size, parallel),
            )
        } else {
            (
                Self::build_recursive(points, left_indices, leaf_size, parallel),
                Self::build_recursive(points, right_indices, leaf_size, parallel),
            )
        };

        let left_base = 1;
        let right_base = left_base + left.nodes.len();
        let mut nodes = Vec::with_capacity(1 + left.nodes.len() + right.nodes.len());
        nodes.push(Node {
            bbox_min,
            bbox_max,
            kind: NodeKind::Internal {
                left: left_base + left.root,
                right: right_base + right.root,
            },
        });
        shift_internal_indices(&mut left.nodes, left_base);
        shift_internal_indices(&mut right.nodes, right_base);
        nodes.extend(left.nodes);
        nodes.extend(right.nodes);
        Subtree { nodes, root: 0 }
    }

    fn query_into(&self, center: DVec3, radius: f64, out: &mut Vec<Neighbour>) {
        out.clear();
        if self.nodes.is_empty() {
            return;
        }
        let r2 = radius * radius;
        let mut stack = vec![self.root];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if !sphere_overlaps_bbox(center, radius, node.bbox_min, node.bbox_max) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(indices) => {
                    for &index in indices {
                        let d2 = (self.points[index].xyz - center).length_squared();
                        if d2 < r2 {
                            out.push(Neighbour {
                                index,
                                distance_sq: d2,
                            });
                        }
                    }
                }
                NodeKind::Internal { left, right } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }
    }
}

struct Subtree {
    nodes: Vec<Node>,
    root: usize,
}

fn shift_internal_indices(nodes: &mut [Node], base: usize) {
    for node in nodes {
        if let NodeKind::Internal { left, right } = &mut node.kind {
            *left += base;
            *right += base;
        }
    }
}

fn sphere_overlaps_bbox(center: DVec3, radius: f64, bbox_min: DVec3, bbox_max: DVec3) -> bool {
    let clamped = center.clamp(bbox_min, bbox_max);
    (clamped - center).length_squared() <= radius * radius
}

impl Finder for KdTreeFinder {
    fn build(&mut self, points: Vec<Vector>, _scheduler: &Scheduler, flags: FinderFlags) {
        self.rank = compute_rank_in_h(&points);
        if points.is_empty() {
            self.points = points;
            self.nodes.clear();
            return;
        }
        let indices: Vec<usize> = (0..points.len()).collect();
        let subtree = Self::build_recursive(&points, indices, self.leaf_size, flags.parallelize_build);
        self.nodes = subtree.nodes;
        self.root = subtree.root;
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

    fn grid_cloud(n_per_axis: usize) -> Vec<Vector> {
        let mut points = Vec::new();
        for x in 0..n_per_axis {
            for y in 0..n_per_axis {
                for z in 0..n_per_axis {
                    points.push(Vector::new(x as f64, y as f64, z as f64, 0.3));
                }
            }
        }
        points
    }

    #[test]
    fn find_all_matches_brute_force_on_a_lattice() {
        let points = grid_cloud(6);
        let mut finder = KdTreeFinder::with_leaf_size(4);
        finder.build(points.clone(), &Scheduler::Sequential, FinderFlags::default());
        let mut got = Vec::new();
        let mut expected = Vec::new();
        for p in &points {
            finder.find_all(PointQuery::Position(*p), 1.1, &mut got);
            brute_force_find_all(&points, *p, 1.1, &mut expected);
            let mut got_idx: Vec<_> = got.iter().map(|n| n.index).collect();
            let mut expected_idx: Vec<_> = expected.iter().map(|n| n.index).collect();
            got_idx.sort_unstable();
            expected_idx.sort_unstable();
            assert_eq!(got_idx, expected_idx);
        }
    }

    #[test]
    fn leaves_never_exceed_configured_size_by_much() {
        let points = grid_cloud(8);
        let mut finder = KdTreeFinder::with_leaf_size(10);
        finder.build(points, &Scheduler::Sequential, FinderFlags::default());
        for node in &finder.nodes {
            if let NodeKind::Leaf(indices) = &node.kind {
                assert!(indices.len() <= 10);
            }
        }
    }
}
