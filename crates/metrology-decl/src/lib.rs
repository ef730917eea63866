//! Raw declarations for quantity and unit types.
//!
//! These records are what the annotation parser hands to resolution: one
//! [`RawDeclaration`] per annotation, tagged with its owner type and a
//! source span. Records are deliberately permissive. Every referenced type
//! and every literal is optional, since the parser reports syntax problems
//! itself and passes incomplete records along.

pub mod declaration;
pub mod dimension;
pub mod prefix;
pub mod quantity;
pub mod relationship;
pub mod spanned;
pub mod unit;

pub use declaration::{DeclarationKind, RawDeclaration};
pub use dimension::Dimension;
pub use prefix::MetricPrefix;
pub use quantity::{
    Arity, FilterKind, InheritFlags, RawConstant, RawFilter, RawQuantity, RawValue, StackingMode,
};
pub use relationship::{
    CastKind, Implementation, OperandPosition, OperatorKind, RawBinary, RawConversion,
    RawNaming, RawOperation, RawParameter, RawProcess, RawRelationship,
};
pub use spanned::Spanned;
pub use unit::{InstanceRule, RawDerivation, RawUnit, RawUnitInstance};
