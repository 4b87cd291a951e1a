//! The quantity store (§4.1): a heterogeneous, quantity-keyed columnar
//! container with material partitioning. All columns share one particle
//! count; insertion, removal and merge preserve that invariant.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{SetupError, SetupResult};
use crate::quantity::column::{Buffer, Column, QuantityValue};
use crate::quantity::id::{Order, QuantityId};
use crate::quantity::material::Material;

#[derive(Clone)]
pub struct MaterialSlot {
    pub material: Arc<Material>,
    pub range: Range<usize>,
}

/// Controls which buffers [`Storage::clone_selected`] deep-copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneVisitor {
    /// Copy value, dt and d2t buffers for every quantity.
    All,
    /// Copy only the highest-order buffer present for each quantity (e.g.
    /// `d2t` for a second-order quantity), leaving lower orders default.
    HighestOrderOnly,
    /// Copy only the `value` buffers, dropping derivatives.
    ValuesOnly,
}

#[derive(Default)]
pub struct Storage {
    columns: BTreeMap<QuantityId, Column>,
    materials: Vec<MaterialSlot>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn particle_count(&self) -> usize {
        self.columns.values().next().map_or(0, Column::len)
    }

    pub fn has(&self, id: QuantityId) -> bool {
        self.columns.contains_key(&id)
    }

    pub fn quantity_ids(&self) -> impl Iterator<Item = QuantityId> + '_ {
        self.columns.keys().copied()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn material(&self, index: usize) -> SetupResult<(&Material, Range<usize>)> {
        self.materials
            .get(index)
            .map(|slot| (slot.material.as_ref(), slot.range.clone()))
            .ok_or(SetupError::MaterialOutOfRange {
                index,
                count: self.materials.len(),
            })
    }

    /// Appends a new material partition covering `[particle_count, particle_count + len)`.
    pub fn add_material_partition(&mut self, material: Arc<Material>, len: usize) {
        let start = self
            .materials
            .last()
            .map_or(0, |slot| slot.range.end);
        self.materials.push(MaterialSlot {
            material,
            range: start..(start + len),
        });
    }

    pub fn materials(&self) -> &[MaterialSlot] {
        &self.materials
    }

    /// Creates a quantity column on first use, or validates a matching
    /// resubmission of the same type/order (overwriting its `value` buffer).
    pub fn insert<T: QuantityValue>(
        &mut self,
        id: QuantityId,
        order: Order,
        values: Vec<T>,
    ) -> SetupResult<()> {
        let existing_count = self.particle_count();
        if !self.columns.is_empty() && existing_count != values.len() {
            return Err(SetupError::LengthMismatch {
                id,
                expected: existing_count,
                actual: values.len(),
            });
        }
        match self.columns.get(&id) {
            Some(existing) => {
                if existing.value_type() != T::VALUE_TYPE {
                    return Err(SetupError::TypeMismatch { id });
                }
                if existing.order() != order {
                    return Err(SetupError::OrderMismatch {
                        id,
                        existing: existing.order(),
                        requested: order,
                    });
                }
                let column = self.columns.get_mut(&id).unwrap();
                let buffer = T::buffer_mut(column).expect("value type checked above");
                buffer.value = values;
            }
            None => {
                let buffer = Buffer::from_values(order, values);
                self.columns.insert(id, T::into_column(buffer));
            }
        }
        Ok(())
    }

    /// Raw access to a quantity's buffers, type-erased. Used by the binary
    /// dump/load code (`crate::io::ssf`) which needs to walk every column
    /// uniformly rather than through the typed `get_value`/`get_dt` calls.
    pub fn column(&self, id: QuantityId) -> SetupResult<&Column> {
        self.columns
            .get(&id)
            .ok_or(SetupError::QuantityMissing { id })
    }

    /// Empty column of the same value type and order as `id`'s schema,
    /// ready for [`Storage::insert_column`] once a loader has decoded `n`
    /// rows into it.
    pub fn columns(&self) -> impl Iterator<Item = (&QuantityId, &Column)> {
        self.columns.iter()
    }

    /// Inserts a fully-formed column directly, bypassing the typed
    /// `insert::<T>` entry point. Used by `crate::io::ssf::load`, which
    /// decodes columns from their on-disk value-type tag rather than a
    /// compile-time type parameter.
    pub fn insert_column(&mut self, id: QuantityId, column: Column) -> SetupResult<()> {
        let existing_count = self.particle_count();
        if !self.columns.is_empty() && existing_count != column.len() {
            return Err(SetupError::LengthMismatch {
                id,
                expected: existing_count,
                actual: column.len(),
            });
        }
        self.columns.insert(id, column);
        Ok(())
    }

    pub fn get_value<T: QuantityValue>(&self, id: QuantityId) -> SetupResult<&[T]> {
        let column = self.column(id)?;
        let buffer = T::buffer(column).ok_or(SetupError::TypeMismatch { id })?;
        Ok(&buffer.value)
    }

    pub fn get_value_mut<T: QuantityValue>(&mut self, id: QuantityId) -> SetupResult<&mut [T]> {
        let column = self
            .columns
            .get_mut(&id)
            .ok_or(SetupError::QuantityMissing { id })?;
        let buffer = T::buffer_mut(column).ok_or(SetupError::TypeMismatch { id })?;
        Ok(&mut buffer.value)
    }

    pub fn get_dt<T: QuantityValue>(&self, id: QuantityId) -> SetupResult<&[T]> {
        let column = self.column(id)?;
        let order = column.order();
        let buffer = T::buffer(column).ok_or(SetupError::TypeMismatch { id })?;
        buffer
            .dt
            .as_deref()
            .ok_or(SetupError::OrderMismatch {
                id,
                existing: order,
                requested: Order::First,
            })
    }

    pub fn get_dt_mut<T: QuantityValue>(&mut self, id: QuantityId) -> SetupResult<&mut [T]> {
        let column = self
            .columns
            .get_mut(&id)
            .ok_or(SetupError::QuantityMissing { id })?;
        let order = column.order();
        let buffer = T::buffer_mut(column).ok_or(SetupError::TypeMismatch { id })?;
        buffer
            .dt
            .as_deref_mut()
            .ok_or(SetupError::OrderMismatch {
                id,
                existing: order,
                requested: Order::First,
            })
    }

    pub fn get_d2t<T: QuantityValue>(&self, id: QuantityId) -> SetupResult<&[T]> {
        let column = self.column(id)?;
        let order = column.order();
        let buffer = T::buffer(column).ok_or(SetupError::TypeMismatch { id })?;
        buffer
            .d2t
            .as_deref()
            .ok_or(SetupError::OrderMismatch {
                id,
                existing: order,
                requested: Order::Second,
            })
    }

    pub fn get_d2t_mut<T: QuantityValue>(&mut self, id: QuantityId) -> SetupResult<&mut [T]> {
        let column = self
            .columns
            .get_mut(&id)
            .ok_or(SetupError::QuantityMissing { id })?;
        let order = column.order();
        let buffer = T::buffer_mut(column).ok_or(SetupError::TypeMismatch { id })?;
        buffer
            .d2t
            .as_deref_mut()
            .ok_or(SetupError::OrderMismatch {
                id,
                existing: order,
                requested: Order::Second,
            })
    }

    /// Concatenates `other` after `self`: every quantity present in one side
    /// must be present in the other, buffers are appended, and `other`'s
    /// material partitions are appended (shifted) after `self`'s.
    pub fn merge(&mut self, other: Storage) -> SetupResult<()> {
        let left: Vec<QuantityId> = self.columns.keys().copied().collect();
        let right: Vec<QuantityId> = other.columns.keys().copied().collect();
        if left != right {
            return Err(SetupError::QuantitySetMismatch { left, right });
        }
        let offset = self.particle_count();
        for (id, other_column) in other.columns {
            let self_column = self.columns.get_mut(&id).expect("quantity sets matched");
            append_column(self_column, other_column, id)?;
        }
        for slot in other.materials {
            self.materials.push(MaterialSlot {
                material: slot.material,
                range: (slot.range.start + offset)..(slot.range.end + offset),
            });
        }
        Ok(())
    }

    /// Appends a copy of each given particle's row to every column, in the
    /// given order. Used by boundary conditions to inject ghost particles
    /// (§9 "ghost particles as transient storage extension"): the caller
    /// then mutates the newly appended range (e.g. mirroring position
    /// across a wall) and removes it again with [`Storage::remove`] once the
    /// solver pass finishes. Ghosts are not added to any material
    /// partition — code that walks `materials()` simply never sees them.
    pub fn duplicate_rows(&mut self, indices: &[usize]) -> SetupResult<()> {
        let n = self.particle_count();
        for &index in indices {
            if index >= n {
                return Err(SetupError::IndexOutOfRange { index, len: n });
            }
        }
        for column in self.columns.values_mut() {
            column.duplicate_rows(indices);
        }
        Ok(())
    }

    /// Removes the given particle indices, compacting every column and
    /// shrinking/shifting material partitions to match.
    pub fn remove(&mut self, indices: &[usize], sorted: bool) -> SetupResult<()> {
        let n = self.particle_count();
        let mut sorted_indices: Vec<usize> = indices.to_vec();
        if !sorted {
            sorted_indices.sort_unstable();
        }
        sorted_indices.dedup();
        for &index in &sorted_indices {
            if index >= n {
                return Err(SetupError::IndexOutOfRange { index, len: n });
            }
        }
        let mut keep = vec![true; n];
        for &index in &sorted_indices {
            keep[index] = false;
        }
        for column in self.columns.values_mut() {
            column.retain(&keep);
        }
        let mut removed_before = vec![0usize; n + 1];
        for i in 0..n {
            removed_before[i + 1] = removed_before[i] + usize::from(!keep[i]);
        }
        self.materials.retain_mut(|slot| {
            let new_start = slot.range.start - removed_before[slot.range.start];
            let new_end = slot.range.end - removed_before[slot.range.end];
            slot.range = new_start..new_end;
            new_end > new_start
        });
        Ok(())
    }

    /// `value += dt * dt_buf` across every column (§4.7 Euler's `x += v*dt`
    /// generalized to every quantity that carries a first derivative).
    pub fn advance_value_all(&mut self, dt: f64) {
        for column in self.columns.values_mut() {
            column.advance_value(dt);
        }
    }

    /// `dt_buf += dt * d2t_buf` across every column (Euler's `v += a*dt`).
    pub fn advance_dt_all(&mut self, dt: f64) {
        for column in self.columns.values_mut() {
            column.advance_dt(dt);
        }
    }

    /// `value += weight * other.dt_buf` for every quantity `other` also
    /// carries, used by the multi-stage integrators to fold in a stage's
    /// derivative computed on a different snapshot than `self`.
    pub fn accumulate_value_from(&mut self, other: &Storage, weight: f64) {
        for (id, column) in self.columns.iter_mut() {
            if let Some(other_column) = other.columns.get(id) {
                column.accumulate_value_from(other_column, weight);
            }
        }
    }

    /// `dt_buf += weight * other.d2t_buf`.
    pub fn accumulate_dt_from(&mut self, other: &Storage, weight: f64) {
        for (id, column) in self.columns.iter_mut() {
            if let Some(other_column) = other.columns.get(id) {
                column.accumulate_dt_from(other_column, weight);
            }
        }
    }

    /// Scales every column's value (and first derivative, if present) by
    /// `factor` in place.
    pub fn scale_state_all(&mut self, factor: f64) {
        for column in self.columns.values_mut() {
            column.scale_state(factor);
        }
    }

    /// `self += weight * other` over value (and first derivative, if
    /// present) for every quantity both sides carry — the modified-midpoint
    /// blend Bulirsch-Stoer combines two snapshots with.
    pub fn scale_add_state(&mut self, other: &Storage, weight: f64) {
        for (id, column) in self.columns.iter_mut() {
            if let Some(other_column) = other.columns.get(id) {
                column.scale_add_state(other_column, weight);
            }
        }
    }

    /// Deep-copies buffers according to `visitor`; material partitions are
    /// always shared (materials themselves are `Arc`-shared, not copied).
    pub fn clone_selected(&self, visitor: CloneVisitor) -> Storage {
        let columns = self
            .columns
            .iter()
            .map(|(id, column)| (*id, clone_column(column, visitor)))
            .collect();
        Storage {
            columns,
            materials: self.materials.clone(),
        }
    }
}

fn append_column(dst: &mut Column, src: Column, id: QuantityId) -> SetupResult<()> {
    match (dst, src) {
        (Column::Float(a), Column::Float(b)) => append_checked(a, b, id),
        (Column::Vector(a), Column::Vector(b)) => append_checked(a, b, id),
        (Column::SymmetricTensor(a), Column::SymmetricTensor(b)) => append_checked(a, b, id),
        (Column::TracelessTensor(a), Column::TracelessTensor(b)) => append_checked(a, b, id),
        (Column::Size(a), Column::Size(b)) => append_checked(a, b, id),
        _ => Err(SetupError::TypeMismatch { id }),
    }
}

fn append_checked<T: Clone + Default>(
    dst: &mut Buffer<T>,
    src: Buffer<T>,
    id: QuantityId,
) -> SetupResult<()> {
    if dst.order != src.order {
        return Err(SetupError::OrderMismatch {
            id,
            existing: dst.order,
            requested: src.order,
        });
    }
    dst.append(src);
    Ok(())
}

fn clone_column(column: &Column, visitor: CloneVisitor) -> Column {
    macro_rules! clone_buffer {
        ($variant:ident, $buf:expr) => {
            Column::$variant(clone_buffer_selected($buf, visitor))
        };
    }
    match column {
        Column::Float(b) => clone_buffer!(Float, b),
        Column::Vector(b) => clone_buffer!(Vector, b),
        Column::SymmetricTensor(b) => clone_buffer!(SymmetricTensor, b),
        Column::TracelessTensor(b) => clone_buffer!(TracelessTensor, b),
        Column::Size(b) => clone_buffer!(Size, b),
    }
}

fn clone_buffer_selected<T: Clone + Default>(
    buffer: &Buffer<T>,
    visitor: CloneVisitor,
) -> Buffer<T> {
    let len = buffer.len();
    match visitor {
        CloneVisitor::All => buffer.clone(),
        CloneVisitor::ValuesOnly => Buffer {
            order: buffer.order,
            value: buffer.value.clone(),
            dt: buffer.dt.as_ref().map(|_| vec![T::default(); len]),
            d2t: buffer.d2t.as_ref().map(|_| vec![T::default(); len]),
        },
        CloneVisitor::HighestOrderOnly => {
            if buffer.d2t.is_some() {
                Buffer {
                    order: buffer.order,
                    value: vec![T::default(); len],
                    dt: buffer.dt.as_ref().map(|_| vec![T::default(); len]),
                    d2t: buffer.d2t.clone(),
                }
            } else if buffer.dt.is_some() {
                Buffer {
                    order: buffer.order,
                    value: vec![T::default(); len],
                    dt: buffer.dt.clone(),
                    d2t: None,
                }
            } else {
                buffer.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::value::Vector;

    #[test]
    fn insert_creates_then_validates_schema() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Mass, Order::Zero, vec![1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(store.particle_count(), 3);
        let err = store
            .insert(QuantityId::Mass, Order::Zero, vec![Vector::ZERO; 3])
            .unwrap_err();
        assert!(matches!(err, SetupError::TypeMismatch { .. }));
        let err = store
            .insert(QuantityId::Mass, Order::First, vec![1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, SetupError::OrderMismatch { .. }));
    }

    #[test]
    fn insert_rejects_length_mismatch() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Mass, Order::Zero, vec![1.0, 2.0])
            .unwrap();
        let err = store
            .insert(QuantityId::Density, Order::First, vec![1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, SetupError::LengthMismatch { .. }));
    }

    #[test]
    fn get_dt_fails_for_zero_order_quantity() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Mass, Order::Zero, vec![1.0])
            .unwrap();
        let err = store.get_dt::<f64>(QuantityId::Mass).unwrap_err();
        assert!(matches!(err, SetupError::OrderMismatch { .. }));
    }

    #[test]
    fn remove_compacts_buffers_and_shrinks_material_ranges() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Mass, Order::Zero, vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        let material = Arc::new(super::super::material::Material::new(
            "rock",
            crate::materials::eos::ideal_gas(1.4),
        ));
        store.add_material_partition(material.clone(), 2);
        store.add_material_partition(material, 2);
        store.remove(&[1], false).unwrap();
        assert_eq!(store.particle_count(), 3);
        assert_eq!(store.get_value::<f64>(QuantityId::Mass).unwrap(), &[1.0, 3.0, 4.0]);
        assert_eq!(store.material(0).unwrap().1, 0..1);
        assert_eq!(store.material(1).unwrap().1, 1..3);
    }

    #[test]
    fn merge_requires_matching_quantity_sets() {
        let mut a = Storage::new();
        a.insert(QuantityId::Mass, Order::Zero, vec![1.0]).unwrap();
        let mut b = Storage::new();
        b.insert(QuantityId::Density, Order::First, vec![1.0])
            .unwrap();
        let err = a.merge(b).unwrap_err();
        assert!(matches!(err, SetupError::QuantitySetMismatch { .. }));
    }

    #[test]
    fn merge_concatenates_values_and_appends_material_ranges() {
        let mut a = Storage::new();
        a.insert(QuantityId::Mass, Order::Zero, vec![1.0, 2.0])
            .unwrap();
        let material = Arc::new(super::super::material::Material::new(
            "rock",
            crate::materials::eos::ideal_gas(1.4),
        ));
        a.add_material_partition(material.clone(), 2);
        let mut b = Storage::new();
        b.insert(QuantityId::Mass, Order::Zero, vec![3.0]).unwrap();
        b.add_material_partition(material, 1);
        a.merge(b).unwrap();
        assert_eq!(a.particle_count(), 3);
        assert_eq!(a.get_value::<f64>(QuantityId::Mass).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(a.material_count(), 2);
        assert_eq!(a.material(1).unwrap().1, 2..3);
    }
}
