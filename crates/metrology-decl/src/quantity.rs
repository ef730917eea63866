//! Raw quantity declarations and the members attached to them.

use crate::dimension::Dimension;
use crate::spanned::Spanned;
use metrology_foundation::TypeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of components of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Scalar,
    Vector2,
    Vector3,
    Vector4,
}

impl Arity {
    /// Number of components (1 for scalars).
    pub fn components(self) -> u8 {
        match self {
            Arity::Scalar => 1,
            Arity::Vector2 => 2,
            Arity::Vector3 => 3,
            Arity::Vector4 => 4,
        }
    }

    pub fn is_scalar(self) -> bool {
        self == Arity::Scalar
    }

    pub fn is_vector(self) -> bool {
        !self.is_scalar()
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Scalar => write!(f, "scalar"),
            other => write!(f, "vector{}", other.components()),
        }
    }
}

/// Which parent members a specialized quantity takes over.
///
/// Each flag toggles independently. Flags on a root quantity have no
/// effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct InheritFlags {
    /// Sum, difference, dot, cross and arithmetic operations.
    pub operations: bool,
    pub processes: bool,
    pub properties: bool,
    pub constants: bool,
    pub conversions: bool,
    /// The parent's effective unit set, as the base for this quantity's filter.
    pub units: bool,
}

impl Default for InheritFlags {
    fn default() -> Self {
        Self {
            operations: true,
            processes: true,
            properties: true,
            constants: true,
            conversions: true,
            units: true,
        }
    }
}

impl InheritFlags {
    /// Inherit nothing from the parent.
    pub const NONE: InheritFlags = InheritFlags {
        operations: false,
        processes: false,
        properties: false,
        constants: false,
        conversions: false,
        units: false,
    };
}

/// A scalar or vector quantity declaration.
///
/// Every optional field left unset on a specialized quantity is looked up
/// along its specialization chain, except `allow_negative` and
/// `use_unit_bias`, which each level states for itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQuantity {
    pub arity: Option<Arity>,
    /// The unit type measuring this quantity.
    pub unit: Option<Spanned<TypeId>>,
    /// Parent quantity this one specializes.
    pub specializes: Option<Spanned<TypeId>>,
    pub dimension: Option<Dimension>,
    pub allow_negative: Option<bool>,
    pub use_unit_bias: Option<bool>,
    pub implement_sum: Option<bool>,
    pub implement_difference: Option<bool>,
    /// Quantity produced by subtracting two values of this quantity.
    pub difference: Option<Spanned<TypeId>>,
    /// Unit instance used when a value is printed without a unit.
    pub default_unit: Option<Spanned<String>>,
    pub default_symbol: Option<String>,
    pub inherit: InheritFlags,
}

/// Whether a filter lists the instances to keep or the ones to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Include,
    Exclude,
}

/// How a filter composes with the one inherited from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackingMode {
    /// Ignore the parent's filter.
    Replace,
    /// Combine with the parent's list by set union.
    Union,
    /// Combine with the parent's list by set intersection.
    Intersect,
}

/// Include or exclude list of unit instance names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFilter {
    /// Serialized as `filter`, since `kind` tags the declaration itself.
    #[serde(rename = "filter")]
    pub kind: FilterKind,
    #[serde(default)]
    pub names: Vec<Spanned<String>>,
    /// `None` when the declaration omitted the mode.
    #[serde(default)]
    pub stacking: Option<StackingMode>,
}

/// Numeric literal or expression text, as written in a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Expression(String),
}

impl RawValue {
    /// An expression with no content. Numbers are never blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, RawValue::Expression(e) if e.trim().is_empty())
    }
}

/// Named constant attached to a quantity, e.g. `PlanckLength`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConstant {
    pub name: Option<Spanned<String>>,
    pub value: Option<Spanned<RawValue>>,
    /// Unit instance the value is expressed in.
    pub unit: Option<Spanned<String>>,
    /// Name of the "multiples of" member, e.g. `PlanckLengths`.
    pub multiples: Option<Spanned<String>>,
}
