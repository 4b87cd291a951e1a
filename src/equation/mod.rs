//! Equation terms (§4.5): compose derivatives plus pre-/post-loop logic.
//! `set_derivatives` registers the pairwise derivatives a term needs with
//! the shared [`DerivativeHolder`](crate::derivative::DerivativeHolder);
//! `initialize`/`finalize` run once per step, outside the neighbour loop.

mod adaptive_smoothing_length;
mod artificial_viscosity;
mod continuity_equation;
mod damage;
pub mod gravity;
mod neighbour_count_term;
mod pressure_force;
mod solid_stress;

pub use adaptive_smoothing_length::AdaptiveSmoothingLength;
pub use artificial_viscosity::{ArtificialViscosity, ViscosityKind};
pub use continuity_equation::ContinuityEquation;
pub use damage::Damage;
pub use gravity::{Gravity, GravityMethod, MultipoleOrder};
pub use neighbour_count_term::NeighbourCountTerm;
pub use pressure_force::PressureForce;
pub use solid_stress::SolidStress;

use crate::derivative::DerivativeHolder;
use crate::error::{SetupError, SetupResult};
use crate::quantity::{Material, Storage};

pub trait EquationTerm: Send + Sync {
    fn name(&self) -> &'static str;

    /// Schema contribution: quantities this term needs present on creation.
    fn create(&self, _store: &mut Storage) -> SetupResult<()> {
        Ok(())
    }

    /// Registers the pairwise derivatives this term reads.
    fn set_derivatives(&self, _holder: &mut DerivativeHolder) -> SetupResult<()> {
        Ok(())
    }

    /// Pre-loop: e.g. compute pressure from the EoS before the derivative loop runs.
    fn initialize(&mut self, _store: &mut Storage) -> SetupResult<()> {
        Ok(())
    }

    /// Post-loop: e.g. integrate an energy derivative or apply stress limits,
    /// using quantities the (already-reduced) accumulator wrote into `store`.
    fn finalize(&mut self, _store: &mut Storage) -> SetupResult<()> {
        Ok(())
    }

    /// True for the one term allowed to own the position buffer's H-lane
    /// derivative (`AdaptiveSmoothingLength`); the solver refuses to register
    /// a second one (§9 open question).
    fn owns_smoothing_length_derivative(&self) -> bool {
        false
    }
}

/// The ordered collection of equation terms a solver runs each step.
/// Enforces the single-owner rule for the smoothing-length derivative at
/// registration time rather than leaving it to be discovered mid-run.
#[derive(Default)]
pub struct EquationSet {
    terms: Vec<Box<dyn EquationTerm>>,
    smoothing_length_owner: bool,
}

impl EquationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, term: Box<dyn EquationTerm>) -> SetupResult<()> {
        if term.owns_smoothing_length_derivative() {
            if self.smoothing_length_owner {
                return Err(SetupError::ConflictingSmoothingLengthOwner);
            }
            self.smoothing_length_owner = true;
        }
        self.terms.push(term);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn create_all(&self, store: &mut Storage) -> SetupResult<()> {
        for term in &self.terms {
            term.create(store)?;
        }
        Ok(())
    }

    pub fn set_derivatives_all(&self, holder: &mut DerivativeHolder) -> SetupResult<()> {
        for term in &self.terms {
            term.set_derivatives(holder)?;
        }
        Ok(())
    }

    pub fn initialize_all(&mut self, store: &mut Storage) -> SetupResult<()> {
        for term in &mut self.terms {
            term.initialize(store)?;
        }
        Ok(())
    }

    pub fn finalize_all(&mut self, store: &mut Storage) -> SetupResult<()> {
        for term in &mut self.terms {
            term.finalize(store)?;
        }
        Ok(())
    }
}

/// Applies `f(particle_index, material)` over every particle, resolving its
/// material partition. Most equation terms touch every particle through its
/// material's EoS/rheology/damage model, so this is the common iteration
/// shape instead of each term re-walking `store.materials()`.
pub fn for_each_material_range(store: &Storage, mut f: impl FnMut(usize, &Material)) -> SetupResult<()> {
    for slot_index in 0..store.material_count() {
        let (material, range) = store.material(slot_index)?;
        for particle in range {
            f(particle, material);
        }
    }
    Ok(())
}
