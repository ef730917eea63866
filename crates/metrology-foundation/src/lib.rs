//! Metrology Foundation
//!
//! Primitives shared by every metrology crate: typed identifiers for
//! declared types, opaque source spans with a source map for rendering,
//! and stable hashing used to fingerprint resolution output.

pub mod ids;
pub mod span;
pub mod stable_hash;

pub use ids::{Path, TypeId};
pub use span::{SourceFile, SourceMap, Span};
pub use stable_hash::{
    fnv1a64, fnv1a64_mix, fnv1a64_str, StableHasher, FNV1A_OFFSET_BASIS_64, FNV1A_PRIME_64,
};
