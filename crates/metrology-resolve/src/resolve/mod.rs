//! Resolution passes
//!
//! ```text
//! Intake → Derivations/Instances → Relationships → Specialization → Filters → Model
//! ```
//!
//! # Intake (`intake`)
//!
//! Groups raw declarations by owner type and drops declarations attached
//! to the wrong kind of type.
//!
//! # Units (`units`, `derivations`, `instances`)
//!
//! Per unit type:
//! - Derivations are checked against their expression and deduplicated by
//!   ID and by signature
//! - Instances are matched against surviving derivations and against the
//!   instances they modify
//!
//! # Relationships (`relationships`)
//!
//! Validates the operations, conversions and constants a quantity declares
//! itself: operand and result references, arity compatibility and naming.
//!
//! # Specialization (`ordering`, `specialization`, `filters`)
//!
//! Orders quantities parents first, then flattens each quantity's chain
//! into one view and computes its effective unit set.
//!
//! Every pass returns its own diagnostics; `pipeline` merges them in a
//! fixed order.

pub mod context;
pub mod derivations;
pub mod expression;
pub mod filters;
pub mod instances;
pub mod intake;
pub mod ordering;
pub mod pipeline;
pub mod relationships;
pub mod specialization;
pub mod units;

pub use pipeline::resolve;
