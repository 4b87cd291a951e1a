//! Boundary conditions (§9 "ghost particles as transient storage
//! extension"): a condition appends mirrored ghost rows to the store before
//! a solver pass, via [`Storage::duplicate_rows`]; the solver truncates
//! every row past the pre-call particle count once the pass finishes.

use glam::DVec3;

use crate::error::SetupResult;
use crate::quantity::{QuantityId, Storage, Vector};

pub trait BoundaryCondition: Send + Sync {
    fn name(&self) -> &'static str;

    /// Injects ghost rows, returning how many particles the condition found
    /// eligible (for diagnostics only; the solver's cleanup doesn't consult
    /// this number, it just truncates back to the particle count observed
    /// before the call).
    fn apply(&self, store: &mut Storage) -> SetupResult<usize>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoBoundary;

impl BoundaryCondition for NoBoundary {
    fn name(&self) -> &'static str {
        "no_boundary"
    }

    fn apply(&self, _store: &mut Storage) -> SetupResult<usize> {
        Ok(0)
    }
}

/// Mirrors every particle within `margin` of an infinite rigid plane
/// (`point`, `normal`) to a ghost on the far side, with the velocity's
/// normal component reflected — the "rigid-bottom ghost boundary" an
/// oblique-cratering run sits on so ejecta can't fall through the floor.
#[derive(Debug, Clone, Copy)]
pub struct RigidPlaneBoundary {
    pub point: DVec3,
    pub normal: DVec3,
    pub margin: f64,
}

impl RigidPlaneBoundary {
    pub fn new(point: DVec3, normal: DVec3, margin: f64) -> Self {
        RigidPlaneBoundary {
            point,
            normal: normal.normalize(),
            margin,
        }
    }

    fn signed_distance(&self, p: DVec3) -> f64 {
        (p - self.point).dot(self.normal)
    }
}

impl BoundaryCondition for RigidPlaneBoundary {
    fn name(&self) -> &'static str {
        "rigid_plane_boundary"
    }

    fn apply(&self, store: &mut Storage) -> SetupResult<usize> {
        let positions = store.get_value::<Vector>(QuantityId::Position)?;
        let eligible: Vec<usize> = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                let d = self.signed_distance(p.xyz);
                (0.0..self.margin).contains(&d)
            })
            .map(|(i, _)| i)
            .collect();
        if eligible.is_empty() {
            return Ok(0);
        }
        store.duplicate_rows(&eligible)?;
        let ghost_start = store.particle_count() - eligible.len();

        let positions = store.get_value_mut::<Vector>(QuantityId::Position)?;
        for (offset, &source) in eligible.iter().enumerate() {
            let ghost = ghost_start + offset;
            let d = self.signed_distance(positions[source].xyz);
            positions[ghost].xyz -= 2.0 * d * self.normal;
        }

        let velocities = store.get_dt_mut::<Vector>(QuantityId::Position)?;
        for (offset, &source) in eligible.iter().enumerate() {
            let ghost = ghost_start + offset;
            let v = velocities[source].xyz;
            velocities[ghost].xyz = v - 2.0 * v.dot(self.normal) * self.normal;
        }

        Ok(eligible.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Order;

    fn store_with(positions: Vec<Vector>, velocities: Vec<DVec3>) -> Storage {
        let mut store = Storage::new();
        store.insert(QuantityId::Position, Order::Second, positions).unwrap();
        let dt = store.get_dt_mut::<Vector>(QuantityId::Position).unwrap();
        for (slot, v) in dt.iter_mut().zip(velocities) {
            slot.xyz = v;
        }
        store
    }

    #[test]
    fn no_boundary_never_grows_the_store() {
        let mut store = store_with(vec![Vector::new(0.0, 0.0, 0.0, 0.1)], vec![DVec3::ZERO]);
        let n = NoBoundary.apply(&mut store).unwrap();
        assert_eq!(n, 0);
        assert_eq!(store.particle_count(), 1);
    }

    #[test]
    fn rigid_plane_mirrors_particles_within_margin() {
        let mut store = store_with(
            vec![
                Vector::new(0.0, 0.05, 0.0, 0.1),
                Vector::new(0.0, 5.0, 0.0, 0.1),
            ],
            vec![DVec3::new(0.0, -1.0, 0.0), DVec3::new(0.0, -1.0, 0.0)],
        );
        let boundary = RigidPlaneBoundary::new(DVec3::ZERO, DVec3::Y, 0.3);
        let count = boundary.apply(&mut store).unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.particle_count(), 3);
        let positions = store.get_value::<Vector>(QuantityId::Position).unwrap();
        assert!(positions[2].xyz.y < 0.0, "ghost should sit below the plane");
        let velocities = store.get_dt::<Vector>(QuantityId::Position).unwrap();
        assert!(velocities[2].xyz.y > 0.0, "ghost's normal velocity should be reflected");
    }
}
