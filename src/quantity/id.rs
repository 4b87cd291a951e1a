//! Quantity identity: a stable enum tag plus the value type and derivative
//! order that tag is fixed to carry (§3).

use std::fmt;

/// The set of value representations a quantity column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Vector,
    SymmetricTensor,
    TracelessTensor,
    Size,
}

/// How many time-derivative buffers a quantity carries alongside its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// Value only.
    Zero,
    /// Value and first derivative (`dt`).
    First,
    /// Value, first and second derivative (`dt`, `d2t`).
    Second,
}

impl Order {
    /// Number of buffers this order requires (1, 2 or 3).
    pub fn buffer_count(self) -> usize {
        match self {
            Order::Zero => 1,
            Order::First => 2,
            Order::Second => 3,
        }
    }
}

/// A stable tag identifying a quantity. Each variant is fixed to one
/// [`ValueType`] and a *default* [`Order`] (the order used by [`crate::quantity::Storage::insert`]'s
/// schema check when the caller doesn't pin one down elsewhere), queried via
/// [`QuantityId::value_type`] and [`QuantityId::default_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuantityId {
    Position,
    Mass,
    Density,
    Energy,
    Pressure,
    SoundSpeed,
    VelocityDivergence,
    VelocityGradient,
    Stress,
    Damage,
    Flag,
    NeighbourCount,
}

impl QuantityId {
    pub fn value_type(self) -> ValueType {
        match self {
            QuantityId::Position => ValueType::Vector,
            QuantityId::Mass => ValueType::Float,
            QuantityId::Density => ValueType::Float,
            QuantityId::Energy => ValueType::Float,
            QuantityId::Pressure => ValueType::Float,
            QuantityId::SoundSpeed => ValueType::Float,
            QuantityId::VelocityDivergence => ValueType::Float,
            QuantityId::VelocityGradient => ValueType::SymmetricTensor,
            QuantityId::Stress => ValueType::TracelessTensor,
            QuantityId::Damage => ValueType::Float,
            QuantityId::Flag => ValueType::Size,
            QuantityId::NeighbourCount => ValueType::Size,
        }
    }

    pub fn default_order(self) -> Order {
        match self {
            QuantityId::Position => Order::Second,
            QuantityId::Mass => Order::Zero,
            QuantityId::Density => Order::First,
            QuantityId::Energy => Order::First,
            QuantityId::Pressure => Order::Zero,
            QuantityId::SoundSpeed => Order::Zero,
            QuantityId::VelocityDivergence => Order::Zero,
            QuantityId::VelocityGradient => Order::Zero,
            QuantityId::Stress => Order::First,
            QuantityId::Damage => Order::First,
            QuantityId::Flag => Order::Zero,
            QuantityId::NeighbourCount => Order::Zero,
        }
    }
}

    /// A stable numeric tag for binary dump headers (§6 ssf descriptor
    /// table); indices, not discriminants, so the on-disk format survives
    /// variants being reordered in source.
    pub fn tag(self) -> u32 {
        match self {
            QuantityId::Position => 0,
            QuantityId::Mass => 1,
            QuantityId::Density => 2,
            QuantityId::Energy => 3,
            QuantityId::Pressure => 4,
            QuantityId::SoundSpeed => 5,
            QuantityId::VelocityDivergence => 6,
            QuantityId::VelocityGradient => 7,
            QuantityId::Stress => 8,
            QuantityId::Damage => 9,
            QuantityId::Flag => 10,
            QuantityId::NeighbourCount => 11,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0 => QuantityId::Position,
            1 => QuantityId::Mass,
            2 => QuantityId::Density,
            3 => QuantityId::Energy,
            4 => QuantityId::Pressure,
            5 => QuantityId::SoundSpeed,
            6 => QuantityId::VelocityDivergence,
            7 => QuantityId::VelocityGradient,
            8 => QuantityId::Stress,
            9 => QuantityId::Damage,
            10 => QuantityId::Flag,
            11 => QuantityId::NeighbourCount,
            _ => return None,
        })
    }
}

impl ValueType {
    /// Numeric tag for the ssf descriptor table, independent of variant order.
    pub fn tag(self) -> u32 {
        match self {
            ValueType::Float => 0,
            ValueType::Vector => 1,
            ValueType::SymmetricTensor => 2,
            ValueType::TracelessTensor => 3,
            ValueType::Size => 4,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0 => ValueType::Float,
            1 => ValueType::Vector,
            2 => ValueType::SymmetricTensor,
            3 => ValueType::TracelessTensor,
            4 => ValueType::Size,
            _ => return None,
        })
    }
}

impl Order {
    /// Numeric tag for the ssf descriptor table.
    pub fn order_tag(self) -> u32 {
        match self {
            Order::Zero => 0,
            Order::First => 1,
            Order::Second => 2,
        }
    }

    pub fn from_order_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0 => Order::Zero,
            1 => Order::First,
            2 => Order::Second,
            _ => return None,
        })
    }
}

impl fmt::Display for QuantityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
