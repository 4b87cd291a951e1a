//! Columnar buffers backing a single quantity. A [`Column`] wraps the
//! concrete element type in an enum so the store can hold heterogeneous
//! quantities in one map, while [`QuantityValue`] lets typed call sites
//! reach the concrete buffer without matching the enum by hand.

use super::id::{Order, ValueType};
use super::value::{SymmetricTensor, TracelessTensor, Vector};

/// The value, first-derivative and second-derivative buffers for one
/// quantity. `dt`/`d2t` are present only when `order` calls for them.
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    pub order: Order,
    pub value: Vec<T>,
    pub dt: Option<Vec<T>>,
    pub d2t: Option<Vec<T>>,
}

impl<T: Clone + Default> Buffer<T> {
    pub fn from_values(order: Order, value: Vec<T>) -> Self {
        let len = value.len();
        let dt = (order.buffer_count() >= 2).then(|| vec![T::default(); len]);
        let d2t = (order.buffer_count() >= 3).then(|| vec![T::default(); len]);
        Buffer {
            order,
            value,
            dt,
            d2t,
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn retain(&mut self, keep: &[bool]) {
        retain_by_mask(&mut self.value, keep);
        if let Some(dt) = self.dt.as_mut() {
            retain_by_mask(dt, keep);
        }
        if let Some(d2t) = self.d2t.as_mut() {
            retain_by_mask(d2t, keep);
        }
    }

    /// Appends a clone of each given row, in order, to the end of the
    /// buffer.
    pub fn duplicate_rows(&mut self, indices: &[usize]) {
        duplicate_by_indices(&mut self.value, indices);
        if let Some(dt) = self.dt.as_mut() {
            duplicate_by_indices(dt, indices);
        }
        if let Some(d2t) = self.d2t.as_mut() {
            duplicate_by_indices(d2t, indices);
        }
    }

    pub fn append(&mut self, other: Buffer<T>) {
        self.value.extend(other.value);
        match (self.dt.as_mut(), other.dt) {
            (Some(a), Some(b)) => a.extend(b),
            _ => {}
        }
        match (self.d2t.as_mut(), other.d2t) {
            (Some(a), Some(b)) => a.extend(b),
            _ => {}
        }
    }
}

impl<T> Buffer<T>
where
    T: Clone + Default + Copy + std::ops::Add<Output = T> + std::ops::Mul<f64, Output = T>,
{
    /// `value[i] += dt * dt_buf[i]`, folding a first derivative into the
    /// value (no-op when the buffer carries no first derivative).
    pub fn advance_value(&mut self, dt: f64) {
        if let Some(rate) = &self.dt {
            for (v, r) in self.value.iter_mut().zip(rate) {
                *v = *v + *r * dt;
            }
        }
    }

    /// `dt_buf[i] += dt * d2t_buf[i]`, folding a second derivative into the
    /// first (no-op when the buffer carries no second derivative).
    pub fn advance_dt(&mut self, dt: f64) {
        if let (Some(dtbuf), Some(d2t)) = (self.dt.as_mut(), &self.d2t) {
            for (v, r) in dtbuf.iter_mut().zip(d2t) {
                *v = *v + *r * dt;
            }
        }
    }

    /// `value[i] += weight * other.dt[i]`: folds in another snapshot's rate
    /// rather than this buffer's own, the building block the multi-stage
    /// integrators (predictor-corrector, RK4, Bulirsch-Stoer) use to blend
    /// stage derivatives computed at other points in state space.
    pub fn accumulate_value_from(&mut self, other: &Buffer<T>, weight: f64) {
        if let Some(rate) = &other.dt {
            for (v, r) in self.value.iter_mut().zip(rate) {
                *v = *v + *r * weight;
            }
        }
    }

    /// `dt_buf[i] += weight * other.d2t[i]`.
    pub fn accumulate_dt_from(&mut self, other: &Buffer<T>, weight: f64) {
        if let (Some(dtbuf), Some(d2t)) = (self.dt.as_mut(), &other.d2t) {
            for (v, r) in dtbuf.iter_mut().zip(d2t) {
                *v = *v + *r * weight;
            }
        }
    }

    /// Scales both the value and (if present) the first-derivative buffer
    /// in place, treating both as state components under combination
    /// (Bulirsch-Stoer's midpoint blend applies identically to a position
    /// and to its velocity).
    pub fn scale_state(&mut self, factor: f64) {
        for v in self.value.iter_mut() {
            *v = *v * factor;
        }
        if let Some(dt) = self.dt.as_mut() {
            for v in dt.iter_mut() {
                *v = *v * factor;
            }
        }
    }

    /// `self.value += weight*other.value` and, if both carry one,
    /// `self.dt += weight*other.dt`.
    pub fn scale_add_state(&mut self, other: &Buffer<T>, weight: f64) {
        for (v, o) in self.value.iter_mut().zip(&other.value) {
            *v = *v + *o * weight;
        }
        if let (Some(a), Some(b)) = (self.dt.as_mut(), &other.dt) {
            for (v, o) in a.iter_mut().zip(b) {
                *v = *v + *o * weight;
            }
        }
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut it = keep.iter();
    values.retain(|_| *it.next().expect("keep mask shorter than buffer"));
}

fn duplicate_by_indices<T: Clone>(values: &mut Vec<T>, indices: &[usize]) {
    let appended: Vec<T> = indices.iter().map(|&i| values[i].clone()).collect();
    values.extend(appended);
}

/// Type-erased storage for one quantity's buffers.
#[derive(Debug, Clone)]
pub enum Column {
    Float(Buffer<f64>),
    Vector(Buffer<Vector>),
    SymmetricTensor(Buffer<SymmetricTensor>),
    TracelessTensor(Buffer<TracelessTensor>),
    Size(Buffer<u64>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(b) => b.len(),
            Column::Vector(b) => b.len(),
            Column::SymmetricTensor(b) => b.len(),
            Column::TracelessTensor(b) => b.len(),
            Column::Size(b) => b.len(),
        }
    }

    pub fn order(&self) -> Order {
        match self {
            Column::Float(b) => b.order,
            Column::Vector(b) => b.order,
            Column::SymmetricTensor(b) => b.order,
            Column::TracelessTensor(b) => b.order,
            Column::Size(b) => b.order,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Column::Float(_) => ValueType::Float,
            Column::Vector(_) => ValueType::Vector,
            Column::SymmetricTensor(_) => ValueType::SymmetricTensor,
            Column::TracelessTensor(_) => ValueType::TracelessTensor,
            Column::Size(_) => ValueType::Size,
        }
    }

    pub fn retain(&mut self, keep: &[bool]) {
        match self {
            Column::Float(b) => b.retain(keep),
            Column::Vector(b) => b.retain(keep),
            Column::SymmetricTensor(b) => b.retain(keep),
            Column::TracelessTensor(b) => b.retain(keep),
            Column::Size(b) => b.retain(keep),
        }
    }

    pub fn duplicate_rows(&mut self, indices: &[usize]) {
        match self {
            Column::Float(b) => b.duplicate_rows(indices),
            Column::Vector(b) => b.duplicate_rows(indices),
            Column::SymmetricTensor(b) => b.duplicate_rows(indices),
            Column::TracelessTensor(b) => b.duplicate_rows(indices),
            Column::Size(b) => b.duplicate_rows(indices),
        }
    }

    /// `value += dt * dt_buf` for whichever buffer this column holds;
    /// a no-op for `Size` columns (always `Order::Zero`, no `dt` buffer to
    /// fold in). The integrators in `crate::integrator` compose this with
    /// [`Column::advance_dt`] to build every explicit scheme in §4.7.
    pub fn advance_value(&mut self, dt: f64) {
        match self {
            Column::Float(b) => b.advance_value(dt),
            Column::Vector(b) => b.advance_value(dt),
            Column::SymmetricTensor(b) => b.advance_value(dt),
            Column::TracelessTensor(b) => b.advance_value(dt),
            Column::Size(_) => {}
        }
    }

    /// `dt_buf += dt * d2t_buf` for whichever buffer this column holds.
    pub fn advance_dt(&mut self, dt: f64) {
        match self {
            Column::Float(b) => b.advance_dt(dt),
            Column::Vector(b) => b.advance_dt(dt),
            Column::SymmetricTensor(b) => b.advance_dt(dt),
            Column::TracelessTensor(b) => b.advance_dt(dt),
            Column::Size(_) => {}
        }
    }

    /// `value += weight * other.dt_buf`; `other` must be the same variant
    /// (true for any pair produced from the same schema, which is the only
    /// way integrators use this).
    pub fn accumulate_value_from(&mut self, other: &Column, weight: f64) {
        match (self, other) {
            (Column::Float(a), Column::Float(b)) => a.accumulate_value_from(b, weight),
            (Column::Vector(a), Column::Vector(b)) => a.accumulate_value_from(b, weight),
            (Column::SymmetricTensor(a), Column::SymmetricTensor(b)) => a.accumulate_value_from(b, weight),
            (Column::TracelessTensor(a), Column::TracelessTensor(b)) => a.accumulate_value_from(b, weight),
            _ => {}
        }
    }

    /// `dt_buf += weight * other.d2t_buf`.
    pub fn accumulate_dt_from(&mut self, other: &Column, weight: f64) {
        match (self, other) {
            (Column::Float(a), Column::Float(b)) => a.accumulate_dt_from(b, weight),
            (Column::Vector(a), Column::Vector(b)) => a.accumulate_dt_from(b, weight),
            (Column::SymmetricTensor(a), Column::SymmetricTensor(b)) => a.accumulate_dt_from(b, weight),
            (Column::TracelessTensor(a), Column::TracelessTensor(b)) => a.accumulate_dt_from(b, weight),
            _ => {}
        }
    }

    pub fn scale_state(&mut self, factor: f64) {
        match self {
            Column::Float(b) => b.scale_state(factor),
            Column::Vector(b) => b.scale_state(factor),
            Column::SymmetricTensor(b) => b.scale_state(factor),
            Column::TracelessTensor(b) => b.scale_state(factor),
            Column::Size(_) => {}
        }
    }

    pub fn scale_add_state(&mut self, other: &Column, weight: f64) {
        match (self, other) {
            (Column::Float(a), Column::Float(b)) => a.scale_add_state(b, weight),
            (Column::Vector(a), Column::Vector(b)) => a.scale_add_state(b, weight),
            (Column::SymmetricTensor(a), Column::SymmetricTensor(b)) => a.scale_add_state(b, weight),
            (Column::TracelessTensor(a), Column::TracelessTensor(b)) => a.scale_add_state(b, weight),
            _ => {}
        }
    }
}

/// Links a concrete Rust type to the [`Column`] variant it's stored in, so
/// generic store code can insert/fetch without matching the enum.
pub trait QuantityValue: Clone + Default + Send + Sync + 'static {
    const VALUE_TYPE: ValueType;

    fn into_column(buffer: Buffer<Self>) -> Column;
    fn buffer(column: &Column) -> Option<&Buffer<Self>>;
    fn buffer_mut(column: &mut Column) -> Option<&mut Buffer<Self>>;
}

macro_rules! impl_quantity_value {
    ($ty:ty, $variant:ident, $value_type:expr) => {
        impl QuantityValue for $ty {
            const VALUE_TYPE: ValueType = $value_type;

            fn into_column(buffer: Buffer<Self>) -> Column {
                Column::$variant(buffer)
            }

            fn buffer(column: &Column) -> Option<&Buffer<Self>> {
                match column {
                    Column::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn buffer_mut(column: &mut Column) -> Option<&mut Buffer<Self>> {
                match column {
                    Column::$variant(b) => Some(b),
                    _ => None,
                }
            }
        }
    };
}

impl_quantity_value!(f64, Float, ValueType::Float);
impl_quantity_value!(Vector, Vector, ValueType::Vector);
impl_quantity_value!(SymmetricTensor, SymmetricTensor, ValueType::SymmetricTensor);
impl_quantity_value!(TracelessTensor, TracelessTensor, ValueType::TracelessTensor);
impl_quantity_value!(u64, Size, ValueType::Size);
