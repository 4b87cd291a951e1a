//! Gravity (§4.5): a separate solver phase rather than an `EquationTerm` —
//! it writes straight into the position buffer's `d2t` lane and is timed
//! under its own `Statistics::PhaseTimingGravityEval` entry instead of
//! running inside the SPH neighbour loop. Offered as brute force or a
//! Barnes-Hut octree with a monopole or quadrupole opening criterion,
//! softened with the same kernel the SPH force uses (§4.3) rather than a
//! bare Plummer fudge.

use glam::DVec3;

use crate::error::SetupResult;
use crate::kernel::{GravityKernel, Kernel};
use crate::quantity::{QuantityId, Storage, SymmetricTensor, TracelessTensor, Vector};
use crate::scheduler::Scheduler;

/// Newton's constant, SI units (the crate carries no unit system beyond
/// "everything is SI", per the core's non-goals).
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11;

/// How many multipole terms a Barnes-Hut cell's far-field approximation
/// carries past the monopole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipoleOrder {
    Monopole,
    Quadrupole,
}

#[derive(Debug, Clone, Copy)]
pub enum GravityMethod {
    BruteForce,
    BarnesHut {
        opening_angle: f64,
        leaf_size: usize,
        multipole_order: MultipoleOrder,
    },
}

/// Gravity phase configuration: the method plus a softening length handed
/// to [`GravityKernel`] so nearby particles don't diverge.
#[derive(Debug, Clone, Copy)]
pub struct Gravity {
    pub method: GravityMethod,
    pub softening_length: f64,
}

impl Gravity {
    pub fn brute_force(softening_length: f64) -> Self {
        Gravity {
            method: GravityMethod::BruteForce,
            softening_length,
        }
    }

    pub fn barnes_hut(opening_angle: f64, softening_length: f64) -> Self {
        Gravity {
            method: GravityMethod::BarnesHut {
                opening_angle,
                leaf_size: 8,
                multipole_order: MultipoleOrder::Monopole,
            },
            softening_length,
        }
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        if let GravityMethod::BarnesHut { leaf_size: slot, .. } = &mut self.method {
            *slot = leaf_size.max(1);
        }
        self
    }

    pub fn with_multipole_order(mut self, order: MultipoleOrder) -> Self {
        if let GravityMethod::BarnesHut { multipole_order, .. } = &mut self.method {
            *multipole_order = order;
        }
        self
    }

    /// Computes the acceleration on every particle and adds it into
    /// `Position`'s `d2t` buffer. Not an `EquationTerm`: the solver calls
    /// this directly, between the SPH evaluation phase and the timestep
    /// criterion, under its own timing statistic.
    pub fn eval(&self, store: &mut Storage, scheduler: &Scheduler) -> SetupResult<()> {
        let positions = store.get_value::<Vector>(QuantityId::Position)?.to_vec();
        let masses = store.get_value::<f64>(QuantityId::Mass)?.to_vec();
        let kernel = GravityKernel;
        let accelerations = match self.method {
            GravityMethod::BruteForce => brute_force(&positions, &masses, self.softening_length, &kernel, scheduler),
            GravityMethod::BarnesHut {
                opening_angle,
                leaf_size,
                multipole_order,
            } => {
                let tree = Octree::build(&positions, &masses, leaf_size);
                tree.accelerations(&positions, opening_angle, self.softening_length, multipole_order, &kernel, scheduler)
            }
        };
        let d2t = store.get_d2t_mut::<Vector>(QuantityId::Position)?;
        for (slot, acceleration) in d2t.iter_mut().zip(accelerations) {
            slot.xyz += acceleration;
        }
        Ok(())
    }
}

/// `-G*mass*separation*kernel.grad(|separation|, softening)`: Newtonian
/// beyond twice the softening length, smoothly softened inside it.
fn pairwise_acceleration(separation: DVec3, mass: f64, softening: f64, kernel: &GravityKernel) -> DVec3 {
    let r = separation.length();
    if r == 0.0 {
        return DVec3::ZERO;
    }
    -separation * GRAVITATIONAL_CONSTANT * mass * kernel.grad(r, softening)
}

fn brute_force(
    positions: &[Vector],
    masses: &[f64],
    softening: f64,
    kernel: &GravityKernel,
    scheduler: &Scheduler,
) -> Vec<DVec3> {
    let n = positions.len();
    let mut out = vec![DVec3::ZERO; n];
    if n == 0 {
        return out;
    }
    let indices: Vec<usize> = (0..n).collect();
    let chunk_size = (n / scheduler.worker_count().max(1)).max(1);
    let results = std::sync::Mutex::new(Vec::with_capacity(n));
    scheduler.parallel_for_chunks(&indices, chunk_size, |chunk| {
        let mut local = Vec::with_capacity(chunk.len());
        for &i in chunk {
            let mut acc = DVec3::ZERO;
            for j in 0..n {
                if i == j {
                    continue;
                }
                acc += pairwise_acceleration(positions[i].xyz - positions[j].xyz, masses[j], softening, kernel);
            }
            local.push((i, acc));
        }
        results.lock().expect("gravity worker panicked").extend(local);
    });
    for (i, acc) in results.into_inner().expect("gravity worker panicked") {
        out[i] = acc;
    }
    out
}

/// Mass moments of a tree node: total mass, center of mass, and (for
/// `Quadrupole` mode) the traceless second moment about that center,
/// `Q_ab = sum_i m_i (3 x_a x_b - r^2 delta_ab)` — combined across children
/// by the parallel-axis theorem in [`MassMoments::combine`].
#[derive(Debug, Clone, Copy)]
struct MassMoments {
    total_mass: f64,
    center_of_mass: DVec3,
    quadrupole: TracelessTensor,
}

impl MassMoments {
    fn from_points(positions: &[DVec3], masses: &[f64], indices: &[usize]) -> Self {
        let mut total_mass = 0.0;
        let mut weighted = DVec3::ZERO;
        for &i in indices {
            total_mass += masses[i];
            weighted += positions[i] * masses[i];
        }
        let center_of_mass = if total_mass > 0.0 {
            weighted / total_mass
        } else {
            DVec3::ZERO
        };
        let mut quadrupole = TracelessTensor::ZERO;
        for &i in indices {
            quadrupole += point_quadrupole(positions[i] - center_of_mass, masses[i]);
        }
        MassMoments {
            total_mass,
            center_of_mass,
            quadrupole,
        }
    }

    /// Re-centers and sums a set of child moments onto a shared center of
    /// mass, using the parallel-axis theorem to translate each child's
    /// quadrupole (computed about its own center of mass) onto the parent's.
    fn combine(children: &[MassMoments]) -> Self {
        let total_mass: f64 = children.iter().map(|c| c.total_mass).sum();
        let center_of_mass = if total_mass > 0.0 {
            children
                .iter()
                .map(|c| c.center_of_mass * c.total_mass)
                .fold(DVec3::ZERO, |a, b| a + b)
                / total_mass
        } else {
            DVec3::ZERO
        };
        let mut quadrupole = TracelessTensor::ZERO;
        for child in children {
            let offset = child.center_of_mass - center_of_mass;
            quadrupole += child.quadrupole + point_quadrupole(offset, child.total_mass);
        }
        MassMoments {
            total_mass,
            center_of_mass,
            quadrupole,
        }
    }
}

fn point_quadrupole(d: DVec3, mass: f64) -> TracelessTensor {
    if mass == 0.0 {
        return TracelessTensor::ZERO;
    }
    let r2 = d.length_squared();
    let sym = SymmetricTensor {
        diag: DVec3::new(3.0 * d.x * d.x - r2, 3.0 * d.y * d.y - r2, 3.0 * d.z * d.z - r2),
        off: DVec3::new(3.0 * d.x * d.y, 3.0 * d.x * d.z, 3.0 * d.y * d.z),
    };
    TracelessTensor::from_symmetric(&sym) * mass
}

/// `-G * Q.d/r^5 + 2.5*G * (d.Q.d) * d / r^7`: the acceleration contribution
/// from a cell's quadrupole moment, derived from `phi = -(G/2) (d.Q.d)/r^5`.
fn quadrupole_acceleration(d: DVec3, quadrupole: TracelessTensor, r: f64) -> DVec3 {
    if r == 0.0 {
        return DVec3::ZERO;
    }
    let q = quadrupole.to_symmetric();
    let qd = q.apply(&Vector::from_xyz(d)).xyz;
    let d_dot_qd = d.dot(qd);
    let r5 = r.powi(5);
    let r7 = r5 * r * r;
    GRAVITATIONAL_CONSTANT * qd / r5 - 2.5 * GRAVITATIONAL_CONSTANT * d_dot_qd * d / r7
}

enum NodeKind {
    Leaf(Vec<usize>),
    Internal(Vec<usize>),
}

struct Node {
    bbox_min: DVec3,
    bbox_max: DVec3,
    moments: MassMoments,
    kind: NodeKind,
}

/// An octree built by splitting each node's bounding box at its midpoint
/// into up to 8 octants (empty octants are skipped), grounded on the
/// teacher's quadtree-based Barnes-Hut solver generalized to three
/// dimensions. Keeps its own copy of positions/masses so leaves can resolve
/// member particles without threading the original buffers through every
/// recursive call.
struct Octree {
    positions: Vec<DVec3>,
    masses: Vec<f64>,
    nodes: Vec<Node>,
    root: usize,
}

impl Octree {
    fn build(positions: &[Vector], masses: &[f64], leaf_size: usize) -> Self {
        let xyz: Vec<DVec3> = positions.iter().map(|p| p.xyz).collect();
        let mut nodes = Vec::new();
        if xyz.is_empty() {
            return Octree {
                positions: xyz,
                masses: masses.to_vec(),
                nodes,
                root: 0,
            };
        }
        let indices: Vec<usize> = (0..xyz.len()).collect();
        let (bbox_min, bbox_max) = bbox_of(&xyz, &indices);
        let root = build_node(&xyz, masses, indices, bbox_min, bbox_max, leaf_size, &mut nodes);
        Octree {
            positions: xyz,
            masses: masses.to_vec(),
            nodes,
            root,
        }
    }

    fn accelerations(
        &self,
        positions: &[Vector],
        opening_angle: f64,
        softening: f64,
        multipole_order: MultipoleOrder,
        kernel: &GravityKernel,
        scheduler: &Scheduler,
    ) -> Vec<DVec3> {
        let n = positions.len();
        let mut out = vec![DVec3::ZERO; n];
        if self.nodes.is_empty() {
            return out;
        }
        let indices: Vec<usize> = (0..n).collect();
        let chunk_size = (n / scheduler.worker_count().max(1)).max(1);
        let results = std::sync::Mutex::new(Vec::with_capacity(n));
        scheduler.parallel_for_chunks(&indices, chunk_size, |chunk| {
            let mut local = Vec::with_capacity(chunk.len());
            for &i in chunk {
                let acc = self.acceleration_on(positions[i].xyz, i, opening_angle, softening, multipole_order, kernel);
                local.push((i, acc));
            }
            results.lock().expect("gravity worker panicked").extend(local);
        });
        for (i, acc) in results.into_inner().expect("gravity worker panicked") {
            out[i] = acc;
        }
        out
    }

    fn acceleration_on(
        &self,
        pos: DVec3,
        self_index: usize,
        opening_angle: f64,
        softening: f64,
        multipole_order: MultipoleOrder,
        kernel: &GravityKernel,
    ) -> DVec3 {
        let mut total = DVec3::ZERO;
        let mut stack = vec![self.root];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            match &node.kind {
                NodeKind::Leaf(members) => {
                    for &j in members {
                        if j == self_index {
                            continue;
                        }
                        total += pairwise_acceleration(pos - self.positions[j], self.masses[j], softening, kernel);
                    }
                }
                NodeKind::Internal(children) => {
                    let extent = node.bbox_max - node.bbox_min;
                    let size = extent.x.max(extent.y).max(extent.z);
                    let distance = (pos - node.moments.center_of_mass).length();
                    if distance > 0.0 && size / distance < opening_angle {
                        total += self.far_field(pos, node, softening, multipole_order, kernel);
                    } else {
                        stack.extend(children.iter().copied());
                    }
                }
            }
        }
        total
    }

    fn far_field(
        &self,
        pos: DVec3,
        node: &Node,
        softening: f64,
        multipole_order: MultipoleOrder,
        kernel: &GravityKernel,
    ) -> DVec3 {
        let d = pos - node.moments.center_of_mass;
        let mut acc = pairwise_acceleration(d, node.moments.total_mass, softening, kernel);
        if multipole_order == MultipoleOrder::Quadrupole {
            acc += quadrupole_acceleration(d, node.moments.quadrupole, d.length());
        }
        acc
    }
}

fn bbox_of(points: &[DVec3], indices: &[usize]) -> (DVec3, DVec3) {
    let mut min = points[indices[0]];
    let mut max = min;
    for &i in indices {
        min = min.min(points[i]);
        max = max.max(points[i]);
    }
    (min, max)
}

fn build_node(
    positions: &[DVec3],
    masses: &[f64],
    indices: Vec<usize>,
    bbox_min: DVec3,
    bbox_max: DVec3,
    leaf_size: usize,
    nodes: &mut Vec<Node>,
) -> usize {
    let moments = MassMoments::from_points(positions, masses, &indices);
    if indices.len() <= leaf_size {
        nodes.push(Node {
            bbox_min,
            bbox_max,
            moments,
            kind: NodeKind::Leaf(indices),
        });
        return nodes.len() - 1;
    }

    let center = 0.5 * (bbox_min + bbox_max);
    let mut octants: [Vec<usize>; 8] = Default::default();
    for i in indices {
        let p = positions[i];
        let octant = usize::from(p.x >= center.x) | (usize::from(p.y >= center.y) << 1) | (usize::from(p.z >= center.z) << 2);
        octants[octant].push(i);
    }

    let mut children = Vec::new();
    let mut child_moments = Vec::new();
    for (octant, members) in octants.into_iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let (child_min, child_max) = octant_bounds(bbox_min, bbox_max, center, octant);
        let (actual_min, actual_max) = bbox_of(positions, &members);
        let child_bbox_min = child_min.min(actual_min);
        let child_bbox_max = child_max.max(actual_max);
        let child_idx = build_node(positions, masses, members, child_bbox_min, child_bbox_max, leaf_size, nodes);
        child_moments.push(nodes[child_idx].moments);
        children.push(child_idx);
    }

    let moments = MassMoments::combine(&child_moments);
    nodes.push(Node {
        bbox_min,
        bbox_max,
        moments,
        kind: NodeKind::Internal(children),
    });
    nodes.len() - 1
}

fn octant_bounds(bbox_min: DVec3, bbox_max: DVec3, center: DVec3, octant: usize) -> (DVec3, DVec3) {
    let lo = |axis_min: f64, axis_center: f64, bit: bool| if bit { axis_center } else { axis_min };
    let hi = |axis_center: f64, axis_max: f64, bit: bool| if bit { axis_max } else { axis_center };
    let bx = octant & 1 != 0;
    let by = octant & 2 != 0;
    let bz = octant & 4 != 0;
    let min = DVec3::new(
        lo(bbox_min.x, center.x, bx),
        lo(bbox_min.y, center.y, by),
        lo(bbox_min.z, center.z, bz),
    );
    let max = DVec3::new(
        hi(center.x, bbox_max.x, bx),
        hi(center.y, bbox_max.y, by),
        hi(center.z, bbox_max.z, bz),
    );
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::{Order, Storage};

    fn two_body_store(separation: f64, mass: f64) -> Storage {
        let mut store = Storage::new();
        store
            .insert(
                QuantityId::Position,
                Order::Second,
                vec![Vector::new(-separation / 2.0, 0.0, 0.0, 0.1), Vector::new(separation / 2.0, 0.0, 0.0, 0.1)],
            )
            .unwrap();
        store.insert(QuantityId::Mass, Order::Zero, vec![mass, mass]).unwrap();
        store
    }

    #[test]
    fn brute_force_two_body_accelerates_toward_each_other() {
        let mut store = two_body_store(100.0, 1.0e10);
        let scheduler = Scheduler::Sequential;
        Gravity::brute_force(1e-6).eval(&mut store, &scheduler).unwrap();
        let d2t = store.get_d2t::<Vector>(QuantityId::Position).unwrap();
        assert!(d2t[0].xyz.x > 0.0, "left particle should accelerate toward the right one");
        assert!(d2t[1].xyz.x < 0.0, "right particle should accelerate toward the left one");
        assert!((d2t[0].xyz.x + d2t[1].xyz.x).abs() < 1e-12, "equal masses should feel equal and opposite force");
    }

    #[test]
    fn barnes_hut_matches_brute_force_for_a_distant_cluster() {
        let mut positions = vec![Vector::new(0.0, 0.0, 0.0, 0.1)];
        for k in 0..40 {
            let offset = k as f64 * 0.01;
            positions.push(Vector::new(1000.0 + offset, offset, -offset, 0.1));
        }
        let masses: Vec<f64> = std::iter::once(1.0).chain(std::iter::repeat(1.0e6).take(40)).collect();

        let mut brute_store = Storage::new();
        brute_store.insert(QuantityId::Position, Order::Second, positions.clone()).unwrap();
        brute_store.insert(QuantityId::Mass, Order::Zero, masses.clone()).unwrap();
        Gravity::brute_force(1e-6).eval(&mut brute_store, &Scheduler::Sequential).unwrap();

        let mut bh_store = Storage::new();
        bh_store.insert(QuantityId::Position, Order::Second, positions).unwrap();
        bh_store.insert(QuantityId::Mass, Order::Zero, masses).unwrap();
        Gravity::barnes_hut(0.3, 1e-6).eval(&mut bh_store, &Scheduler::Sequential).unwrap();

        let brute = store_accel(&brute_store, 0);
        let bh = store_accel(&bh_store, 0);
        let relative_diff = (bh - brute).length() / brute.length();
        assert!(relative_diff < 1e-2, "opening angle 0.3 should track brute force to 1%, got {relative_diff}");
    }

    fn store_accel(store: &Storage, index: usize) -> DVec3 {
        store.get_d2t::<Vector>(QuantityId::Position).unwrap()[index].xyz
    }
}
