//! The kind-tagged record the annotation parser produces per annotation.

use crate::quantity::{RawConstant, RawFilter, RawQuantity};
use crate::relationship::{RawConversion, RawRelationship};
use crate::unit::{RawDerivation, RawUnit, RawUnitInstance};
use metrology_foundation::{Span, TypeId};
use serde::{Deserialize, Serialize};

/// One raw declaration attached to a declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeclaration {
    /// The type the annotation was written on.
    pub owner: TypeId,
    /// Location of the whole annotation.
    #[serde(default)]
    pub span: Span,
    #[serde(flatten)]
    pub kind: DeclarationKind,
}

/// What a raw declaration declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclarationKind {
    Quantity(RawQuantity),
    Unit(RawUnit),
    Derivation(RawDerivation),
    UnitInstance(RawUnitInstance),
    Operation(RawRelationship),
    Conversion(RawConversion),
    Constant(RawConstant),
    Filter(RawFilter),
}

impl DeclarationKind {
    /// Short name used in diagnostics and logs.
    pub fn name(&self) -> &'static str {
        match self {
            DeclarationKind::Quantity(_) => "quantity",
            DeclarationKind::Unit(_) => "unit",
            DeclarationKind::Derivation(_) => "derivation",
            DeclarationKind::UnitInstance(_) => "unit instance",
            DeclarationKind::Operation(_) => "operation",
            DeclarationKind::Conversion(_) => "conversion",
            DeclarationKind::Constant(_) => "constant",
            DeclarationKind::Filter(_) => "filter",
        }
    }
}

impl RawDeclaration {
    pub fn new(owner: impl Into<TypeId>, span: Span, kind: DeclarationKind) -> Self {
        Self {
            owner: owner.into(),
            span,
            kind,
        }
    }
}
