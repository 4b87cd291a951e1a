//! The accumulated pool (§4.4, §3): one scratch buffer per (quantity,
//! derivative slot), zeroed every step. Thread-local copies are filled
//! during the parallel neighbour loop and reduced into the canonical store
//! afterwards by a deterministic serial sum in worker-index order, per the
//! resolved "accumulator reduction order" open question (§9) — this keeps
//! results bit-reproducible for a fixed scheduler configuration.

use std::collections::HashMap;
use std::ops::AddAssign;

use crate::error::{SetupError, SetupResult};
use crate::quantity::{Buffer, Column, Order, QuantityId, QuantityValue, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivativeSlot {
    Value,
    Dt,
    D2t,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccumulatedKey {
    pub id: QuantityId,
    pub slot: DerivativeSlot,
}

/// `SHARED`: multiple derivatives may sum into the same buffer.
/// `UNIQUE`: exactly one derivative may own it; a second `create` is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationTag {
    Shared,
    Unique,
}

pub struct Accumulated {
    particle_count: usize,
    columns: HashMap<AccumulatedKey, (Column, AccumulationTag)>,
}

impl Accumulated {
    pub fn new(particle_count: usize) -> Self {
        Accumulated {
            particle_count,
            columns: HashMap::new(),
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Declares a scratch buffer. Declaring the same `SHARED` key twice is
    /// fine (derivatives sum into it); declaring a `UNIQUE` key twice, or
    /// mixing tags on the same key, is a setup error.
    pub fn create<T: QuantityValue>(
        &mut self,
        id: QuantityId,
        slot: DerivativeSlot,
        tag: AccumulationTag,
    ) -> SetupResult<()> {
        let key = AccumulatedKey { id, slot };
        if let Some((_, existing_tag)) = self.columns.get(&key) {
            if tag == AccumulationTag::Unique || *existing_tag == AccumulationTag::Unique {
                return Err(SetupError::InvalidConfiguration(format!(
                    "accumulated buffer {id:?}/{slot:?} already declared and at least one side is UNIQUE"
                )));
            }
            return Ok(());
        }
        let buffer = Buffer::from_values(Order::Zero, vec![T::default(); self.particle_count]);
        self.columns.insert(key, (T::into_column(buffer), tag));
        Ok(())
    }

    pub fn has(&self, id: QuantityId, slot: DerivativeSlot) -> bool {
        self.columns.contains_key(&AccumulatedKey { id, slot })
    }

    pub fn get<T: QuantityValue>(&self, id: QuantityId, slot: DerivativeSlot) -> SetupResult<&[T]> {
        let key = AccumulatedKey { id, slot };
        let (column, _) = self.columns.get(&key).ok_or(SetupError::QuantityMissing { id })?;
        Ok(&T::buffer(column).ok_or(SetupError::TypeMismatch { id })?.value)
    }

    pub fn get_mut<T: QuantityValue>(
        &mut self,
        id: QuantityId,
        slot: DerivativeSlot,
    ) -> SetupResult<&mut [T]> {
        let key = AccumulatedKey { id, slot };
        let (column, _) = self
            .columns
            .get_mut(&key)
            .ok_or(SetupError::QuantityMissing { id })?;
        Ok(&mut T::buffer_mut(column).ok_or(SetupError::TypeMismatch { id })?.value)
    }

    /// Adds `delta` into the scratch buffer at `index`. This is the hot-path
    /// write derivatives perform once per (particle, neighbour) visit — no
    /// locking, since each thread owns its own `Accumulated` instance.
    pub fn add<T: QuantityValue + AddAssign<T> + Copy>(
        &mut self,
        id: QuantityId,
        slot: DerivativeSlot,
        index: usize,
        delta: T,
    ) -> SetupResult<()> {
        let values = self.get_mut::<T>(id, slot)?;
        values[index] += delta;
        Ok(())
    }

    fn keys(&self) -> impl Iterator<Item = AccumulatedKey> + '_ {
        self.columns.keys().copied()
    }

    /// Sums `workers` in index order into fresh buffers, then adds the
    /// result into `store`'s matching quantity buffers (not overwriting —
    /// accumulators contribute to whatever derivative the integrator has
    /// already started accumulating this step).
    pub fn reduce_into(workers: Vec<Accumulated>, store: &mut Storage) -> SetupResult<()> {
        let Some(first) = workers.first() else {
            return Ok(());
        };
        let keys: Vec<AccumulatedKey> = first.keys().collect();
        for key in keys {
            reduce_key_into_store(&workers, key, store)?;
        }
        Ok(())
    }
}

fn reduce_key_into_store(
    workers: &[Accumulated],
    key: AccumulatedKey,
    store: &mut Storage,
) -> SetupResult<()> {
    macro_rules! reduce_as {
        ($ty:ty) => {{
            let n = workers[0].particle_count;
            let mut total = vec![<$ty>::default(); n];
            for worker in workers {
                let values = worker.get::<$ty>(key.id, key.slot)?;
                for (t, v) in total.iter_mut().zip(values) {
                    *t += *v;
                }
            }
            let dest: &mut [$ty] = match key.slot {
                DerivativeSlot::Value => store.get_value_mut(key.id)?,
                DerivativeSlot::Dt => store.get_dt_mut(key.id)?,
                DerivativeSlot::D2t => store.get_d2t_mut(key.id)?,
            };
            for (d, t) in dest.iter_mut().zip(total) {
                *d += t;
            }
        }};
    }

    match key.id.value_type() {
        crate::quantity::ValueType::Float => reduce_as!(f64),
        crate::quantity::ValueType::Vector => reduce_as!(crate::quantity::Vector),
        crate::quantity::ValueType::SymmetricTensor => reduce_as!(crate::quantity::SymmetricTensor),
        crate::quantity::ValueType::TracelessTensor => reduce_as!(crate::quantity::TracelessTensor),
        crate::quantity::ValueType::Size => reduce_as!(u64),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Order as StoreOrder;

    #[test]
    fn unique_buffer_cannot_be_declared_twice() {
        let mut acc = Accumulated::new(4);
        acc.create::<f64>(QuantityId::Density, DerivativeSlot::Dt, AccumulationTag::Unique)
            .unwrap();
        let err = acc
            .create::<f64>(QuantityId::Density, DerivativeSlot::Dt, AccumulationTag::Unique)
            .unwrap_err();
        assert!(matches!(err, SetupError::InvalidConfiguration(_)));
    }

    #[test]
    fn shared_buffer_can_be_declared_by_multiple_derivatives() {
        let mut acc = Accumulated::new(4);
        acc.create::<f64>(QuantityId::Energy, DerivativeSlot::Dt, AccumulationTag::Shared)
            .unwrap();
        acc.create::<f64>(QuantityId::Energy, DerivativeSlot::Dt, AccumulationTag::Shared)
            .unwrap();
    }

    #[test]
    fn reduce_sums_worker_contributions_into_the_store() {
        let mut store = crate::quantity::Storage::new();
        store
            .insert(QuantityId::Energy, StoreOrder::First, vec![0.0, 0.0])
            .unwrap();

        let mut worker_a = Accumulated::new(2);
        worker_a
            .create::<f64>(QuantityId::Energy, DerivativeSlot::Dt, AccumulationTag::Shared)
            .unwrap();
        worker_a.add::<f64>(QuantityId::Energy, DerivativeSlot::Dt, 0, 1.0).unwrap();

        let mut worker_b = Accumulated::new(2);
        worker_b
            .create::<f64>(QuantityId::Energy, DerivativeSlot::Dt, AccumulationTag::Shared)
            .unwrap();
        worker_b.add::<f64>(QuantityId::Energy, DerivativeSlot::Dt, 0, 2.0).unwrap();
        worker_b.add::<f64>(QuantityId::Energy, DerivativeSlot::Dt, 1, 5.0).unwrap();

        Accumulated::reduce_into(vec![worker_a, worker_b], &mut store).unwrap();
        let dt = store.get_dt::<f64>(QuantityId::Energy).unwrap();
        assert_eq!(dt, &[3.0, 5.0]);
    }
}
