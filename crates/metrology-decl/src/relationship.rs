//! Raw relationship declarations between quantities.
//!
//! The declaring quantity is always one operand; records only name the
//! *other* operand and the result.

use crate::spanned::Spanned;
use metrology_foundation::TypeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arithmetic operator of an [`RawOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OperatorKind {
    /// Whether `a op b == b op a`.
    pub fn is_commutative(self) -> bool {
        matches!(self, OperatorKind::Add | OperatorKind::Multiply)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Add => "+",
            OperatorKind::Subtract => "-",
            OperatorKind::Multiply => "*",
            OperatorKind::Divide => "/",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Side of the operator the declaring quantity stands on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandPosition {
    #[default]
    Left,
    Right,
}

/// How an operation is exposed by generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    Operator,
    Method,
    #[default]
    OperatorAndMethod,
    /// Declared for its result type only; nothing is generated.
    None,
}

/// Naming overrides shared by all binary relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawNaming {
    pub member: Option<Spanned<String>>,
    pub static_method: Option<Spanned<String>>,
    /// Name of the reversed counterpart, e.g. `DivideInto` for `Divide`.
    pub mirrored: Option<Spanned<String>>,
}

impl RawNaming {
    pub fn is_empty(&self) -> bool {
        self.member.is_none() && self.static_method.is_none() && self.mirrored.is_none()
    }
}

/// Sum, difference, dot or cross product with another quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBinary {
    pub other: Option<Spanned<TypeId>>,
    pub result: Option<Spanned<TypeId>>,
    pub naming: RawNaming,
}

/// Arithmetic operation with another quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOperation {
    pub operator: OperatorKind,
    #[serde(default)]
    pub position: OperandPosition,
    #[serde(default)]
    pub other: Option<Spanned<TypeId>>,
    #[serde(default)]
    pub result: Option<Spanned<TypeId>>,
    #[serde(default)]
    pub implementation: Implementation,
    /// Also generate the counterpart with operands swapped.
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub naming: RawNaming,
}

/// Parameter of a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParameter {
    /// Parameter type name, passed through to emission unchanged.
    pub ty: Option<String>,
    pub name: Option<Spanned<String>>,
}

/// Named computation on a quantity producing another quantity.
///
/// Properties use the same record and must have no parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProcess {
    pub name: Option<Spanned<String>>,
    pub expression: Option<Spanned<String>>,
    pub result: Option<Spanned<TypeId>>,
    pub parameters: Vec<RawParameter>,
    /// Also expose the process as a static method.
    pub implement_static: bool,
}

/// Relationship declared on a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "relation", rename_all = "snake_case")]
pub enum RawRelationship {
    Sum(RawBinary),
    Difference(RawBinary),
    Dot(RawBinary),
    Cross(RawBinary),
    Operation(RawOperation),
    Process(RawProcess),
    Property(RawProcess),
}

/// Cast strength of a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    #[default]
    Explicit,
    Implicit,
}

/// Conversion from the declaring quantity to another one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConversion {
    pub target: Option<Spanned<TypeId>>,
    pub cast: CastKind,
}
