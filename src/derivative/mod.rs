//! Derivatives (§4.4): per-particle functors that sum a kernel-weighted
//! pairwise contribution into the accumulated pool. An [`EquationTerm`](crate::equation::EquationTerm)
//! composes one or more of these; the [`DerivativeHolder`] dedupes requires
//! by type and configuration so two equation terms that need the same
//! derivative share one instance.

mod artificial_viscosity;
mod neighbour_count;
mod pressure_gradient;
mod velocity_divergence;
mod velocity_gradient;

pub use artificial_viscosity::{ArtificialViscosityDerivative, ViscosityKind};
pub use neighbour_count::NeighbourCountDerivative;
pub use pressure_gradient::PressureGradientDerivative;
pub use velocity_divergence::VelocityDivergenceDerivative;
pub use velocity_gradient::VelocityGradientDerivative;

use glam::DVec3;

use crate::accumulator::Accumulated;
use crate::error::{SetupError, SetupResult};
use crate::finder::Neighbour;
use crate::quantity::Storage;

/// PRE-EVALUATION derivatives run (and are reduced) before EVALUATION
/// derivatives, so the latter can read quantities the former produced
/// (e.g. `SolidStress` reading `VelocityGradient`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreEvaluation,
    Evaluation,
}

pub trait Derivative: Send + Sync {
    fn name(&self) -> &'static str;
    fn phase(&self) -> Phase;

    /// Identifies this derivative's configuration (flags, parameters) for
    /// the holder's dedup check; derivatives with no meaningful
    /// configuration can leave this at the default.
    fn config_key(&self) -> String {
        String::new()
    }

    /// Whether this derivative supplies a meaningful `eval_symmetric`. The
    /// holder is symmetric overall only if every held derivative is.
    fn is_symmetric(&self) -> bool {
        true
    }

    /// Declares the accumulated buffers this derivative writes into.
    fn create(&self, accumulated: &mut Accumulated) -> SetupResult<()>;

    /// Optional per-step setup (e.g. validating required quantities are
    /// present); most derivatives don't need this.
    fn initialize(&mut self, _store: &Storage) -> SetupResult<()> {
        Ok(())
    }

    /// Called once per query particle `i` when neighbours are restricted to
    /// lower rank-in-H: updates the accumulator for both `i` and each `j`.
    fn eval_symmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        gradients: &[DVec3],
        store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()>;

    /// Called when neighbours are the full set within range: updates only
    /// the accumulator for `i`.
    fn eval_asymmetric(
        &self,
        i: usize,
        neighbours: &[Neighbour],
        gradients: &[DVec3],
        store: &Storage,
        accumulated: &mut Accumulated,
    ) -> SetupResult<()>;
}

#[derive(Default)]
pub struct DerivativeHolder {
    derivatives: Vec<Box<dyn Derivative>>,
}

impl DerivativeHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `derivative` unless one of the same name is already held; if
    /// one is, its configuration must match or this is a setup error
    /// (`PressureForce.h`'s `DerivativeHolder::require`).
    pub fn require(&mut self, derivative: Box<dyn Derivative>) -> SetupResult<()> {
        if let Some(existing) = self.derivatives.iter().find(|d| d.name() == derivative.name()) {
            if existing.config_key() != derivative.config_key() {
                return Err(SetupError::ConflictingDerivativeFlags {
                    name: derivative.name().to_string(),
                });
            }
            return Ok(());
        }
        self.derivatives.push(derivative);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.derivatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.derivatives.is_empty()
    }

    /// True iff every held derivative supplies a symmetric evaluator; the
    /// solver uses this to choose `find_all` vs `find_lower_rank`.
    pub fn is_symmetric(&self) -> bool {
        self.derivatives.iter().all(|d| d.is_symmetric())
    }

    pub fn create_all(&self, accumulated: &mut Accumulated) -> SetupResult<()> {
        for derivative in &self.derivatives {
            derivative.create(accumulated)?;
        }
        Ok(())
    }

    pub fn initialize_all(&mut self, store: &Storage) -> SetupResult<()> {
        for derivative in &mut self.derivatives {
            derivative.initialize(store)?;
        }
        Ok(())
    }

    pub fn for_phase(&self, phase: Phase) -> impl Iterator<Item = &dyn Derivative> {
        self.derivatives
            .iter()
            .filter(move |d| d.phase() == phase)
            .map(|d| d.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(Phase, &'static str);
    impl Derivative for Dummy {
        fn name(&self) -> &'static str {
            self.1
        }
        fn phase(&self) -> Phase {
            self.0
        }
        fn config_key(&self) -> String {
            "a".to_string()
        }
        fn create(&self, _accumulated: &mut Accumulated) -> SetupResult<()> {
            Ok(())
        }
        fn eval_symmetric(
            &self,
            _i: usize,
            _n: &[Neighbour],
            _g: &[DVec3],
            _s: &Storage,
            _a: &mut Accumulated,
        ) -> SetupResult<()> {
            Ok(())
        }
        fn eval_asymmetric(
            &self,
            _i: usize,
            _n: &[Neighbour],
            _g: &[DVec3],
            _s: &Storage,
            _a: &mut Accumulated,
        ) -> SetupResult<()> {
            Ok(())
        }
    }

    struct DummyConflict;
    impl Derivative for DummyConflict {
        fn name(&self) -> &'static str {
            "dummy"
        }
        fn phase(&self) -> Phase {
            Phase::Evaluation
        }
        fn config_key(&self) -> String {
            "b".to_string()
        }
        fn create(&self, _accumulated: &mut Accumulated) -> SetupResult<()> {
            Ok(())
        }
        fn eval_symmetric(
            &self,
            _i: usize,
            _n: &[Neighbour],
            _g: &[DVec3],
            _s: &Storage,
            _a: &mut Accumulated,
        ) -> SetupResult<()> {
            Ok(())
        }
        fn eval_asymmetric(
            &self,
            _i: usize,
            _n: &[Neighbour],
            _g: &[DVec3],
            _s: &Storage,
            _a: &mut Accumulated,
        ) -> SetupResult<()> {
            Ok(())
        }
    }

    #[test]
    fn requiring_same_derivative_twice_yields_one_instance() {
        let mut holder = DerivativeHolder::new();
        holder.require(Box::new(Dummy(Phase::Evaluation, "dummy"))).unwrap();
        holder.require(Box::new(Dummy(Phase::Evaluation, "dummy"))).unwrap();
        assert_eq!(holder.len(), 1);
    }

    #[test]
    fn requiring_with_incompatible_config_fails() {
        let mut holder = DerivativeHolder::new();
        holder.require(Box::new(Dummy(Phase::Evaluation, "dummy"))).unwrap();
        let err = holder.require(Box::new(DummyConflict)).unwrap_err();
        assert!(matches!(err, SetupError::ConflictingDerivativeFlags { .. }));
    }
}
