//! A material owns pluggable physics strategies (equation of state,
//! rheology, damage) plus a parameter dictionary and the clamping ranges the
//! timestep criterion reads (§3, §9 "strategy composition"). The strategies
//! are trait objects so a material can be built at runtime from a
//! configuration file; the inner kernel loops this crate's equation terms
//! run stay monomorphised.

use std::collections::HashMap;

use crate::quantity::id::QuantityId;

/// Converts density and specific energy into pressure and sound speed.
/// Concrete strategies live under `crate::materials`.
pub trait EquationOfState: Send + Sync {
    fn name(&self) -> &str;
    fn pressure(&self, density: f64, energy: f64) -> f64;
    fn sound_speed(&self, density: f64, energy: f64, pressure: f64) -> f64;
    fn clone_box(&self) -> Box<dyn EquationOfState>;
}

/// Evolves the deviatoric stress tensor. Optional: materials without solid
/// strength (pure fluids, ideal gas) carry `None`.
pub trait Rheology: Send + Sync {
    fn name(&self) -> &str;
    fn shear_modulus(&self) -> f64;
    fn yield_stress(&self, density: f64, damage: f64) -> f64;
    fn clone_box(&self) -> Box<dyn Rheology>;
}

/// Evolves a scalar or tensor damage field that weakens stress and pressure.
pub trait DamageModel: Send + Sync {
    fn name(&self) -> &str;
    /// Growth rate of the damage field given the local strain rate and
    /// material strength parameters; integrated by `Damage` (§4.5).
    fn growth_rate(&self, strain_rate: f64, damage: f64) -> f64;
    fn clone_box(&self) -> Box<dyn DamageModel>;
}

/// Inclusive clamp applied to a quantity before the timestep criterion scans
/// it, so that e.g. density never reads as exactly zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamp {
    pub min: f64,
    pub max: f64,
}

impl Clamp {
    pub fn apply(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

pub struct Material {
    pub name: String,
    pub eos: Box<dyn EquationOfState>,
    pub rheology: Option<Box<dyn Rheology>>,
    pub damage: Option<Box<dyn DamageModel>>,
    pub params: HashMap<String, f64>,
    pub clamps: HashMap<QuantityId, Clamp>,
}

impl Material {
    pub fn new(name: impl Into<String>, eos: Box<dyn EquationOfState>) -> Self {
        Material {
            name: name.into(),
            eos,
            rheology: None,
            damage: None,
            params: HashMap::new(),
            clamps: HashMap::new(),
        }
    }

    pub fn with_rheology(mut self, rheology: Box<dyn Rheology>) -> Self {
        self.rheology = Some(rheology);
        self
    }

    pub fn with_damage(mut self, damage: Box<dyn DamageModel>) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_clamp(mut self, id: QuantityId, clamp: Clamp) -> Self {
        self.clamps.insert(id, clamp);
        self
    }

    pub fn param(&self, key: &str) -> Option<f64> {
        self.params.get(key).copied()
    }

    pub fn clamp(&self, id: QuantityId, value: f64) -> f64 {
        match self.clamps.get(&id) {
            Some(c) => c.apply(value),
            None => value,
        }
    }

    /// Deep copy: clones the boxed strategies rather than sharing them.
    /// Cloning a `Material` via ordinary sharing (`Arc::clone`) is expected
    /// to be the common case; this is only for callers that need an
    /// independent instance to mutate.
    pub fn clone_independent(&self) -> Material {
        Material {
            name: self.name.clone(),
            eos: self.eos.clone_box(),
            rheology: self.rheology.as_ref().map(|r| r.clone_box()),
            damage: self.damage.as_ref().map(|d| d.clone_box()),
            params: self.params.clone(),
            clamps: self.clamps.clone(),
        }
    }
}
