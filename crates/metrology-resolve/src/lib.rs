//! Metrology Resolve
//!
//! Semantic resolution and validation of quantity and unit declarations.
//! Takes the raw records produced by the annotation parser and builds a
//! cross-referenced [`ResolvedModel`] together with every [`Diagnostic`]
//! found along the way. Resolution never stops at the first problem: each
//! declaration is checked on its own and invalid ones are left out of the
//! model.
//!
//! ```text
//! RawDeclaration[] ──► resolve() ──► Resolution { model, diagnostics }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod resolve;

pub use config::{ConfigError, ResolveConfig};
pub use diagnostics::Diagnostics;
pub use error::{Diagnostic, DiagnosticFormatter, DiagnosticKind, Label, Severity};
pub use model::{
    BinaryRelationship, Constant, ConversionRelationship, EffectiveUnitSet, Naming,
    OperationRelationship, Parameter, ProcessRelationship, QuantityFlags, Relationship,
    RelationshipCategory, RelationshipKey, Resolution, ResolvedDerivation, ResolvedInstance,
    ResolvedModel, ResolvedQuantity, ResolvedRule, ResolvedUnit, SignaturePermutation, Sourced,
};
pub use resolve::resolve;
