//! The resolved model handed to code emission.
//!
//! Everything in here has passed validation: references point at declared
//! types of the right kind, duplicates are gone, and each quantity carries
//! its flattened post-specialization view. Collections keep declaration
//! order so that two passes over the same input serialize identically.

use crate::error::Diagnostic;
use indexmap::IndexMap;
use metrology_decl::{
    Arity, CastKind, Dimension, Implementation, MetricPrefix, OperandPosition, OperatorKind,
    RawValue,
};
use metrology_foundation::{StableHasher, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Output of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedModel {
    pub units: IndexMap<TypeId, ResolvedUnit>,
    pub quantities: IndexMap<TypeId, ResolvedQuantity>,
}

impl ResolvedModel {
    pub fn unit(&self, id: &TypeId) -> Option<&ResolvedUnit> {
        self.units.get(id)
    }

    pub fn quantity(&self, id: &TypeId) -> Option<&ResolvedQuantity> {
        self.quantities.get(id)
    }

    /// Stable 64-bit fingerprint of the model's canonical JSON form.
    ///
    /// Identical declaration sets produce identical fingerprints across
    /// runs and platforms.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = StableHasher::new();
        // Serializing plain data into a String cannot fail.
        if let Ok(json) = serde_json::to_string(self) {
            hasher.write_str(&json);
        }
        hasher.value()
    }
}

/// A unit type with its surviving derivations and instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedUnit {
    pub id: TypeId,
    /// Quantity measured by this unit; `None` if the reference was invalid.
    pub quantity: Option<TypeId>,
    pub bias_term: bool,
    pub derivations: Vec<ResolvedDerivation>,
    pub instances: Vec<ResolvedInstance>,
}

impl ResolvedUnit {
    pub fn instance(&self, name: &str) -> Option<&ResolvedInstance> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn derivation(&self, id: &str) -> Option<&ResolvedDerivation> {
        self.derivations
            .iter()
            .find(|d| d.id.as_deref() == Some(id))
    }

    /// Instance names in declaration order.
    pub fn instance_names(&self) -> impl Iterator<Item = &str> {
        self.instances.iter().map(|i| i.name.as_str())
    }
}

/// A validated derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDerivation {
    pub id: Option<String>,
    pub expression: String,
    pub signature: Vec<TypeId>,
    /// Additional orderings accepted for this derivation.
    pub permutations: Vec<SignaturePermutation>,
}

/// One reordering of a derivation signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePermutation {
    pub signature: Vec<TypeId>,
    /// `placeholders[i]` is the expression placeholder bound by position `i`.
    pub placeholders: Vec<usize>,
}

/// A validated unit instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInstance {
    pub name: String,
    pub plural: Option<String>,
    pub symbol: Option<String>,
    pub rule: ResolvedRule,
}

/// Construction rule of a resolved instance. Every name it mentions
/// exists in the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ResolvedRule {
    Fixed,
    Alias {
        original: String,
    },
    Scaled {
        original: String,
        scale: RawValue,
    },
    Prefixed {
        original: String,
        prefix: MetricPrefix,
    },
    Biased {
        original: String,
        bias: RawValue,
    },
    Derived {
        /// ID of the matched derivation, if it has one.
        derivation: Option<String>,
        /// Contributing instances, positionally matching `signature`.
        units: Vec<String>,
        signature: Vec<TypeId>,
    },
}

/// A quantity after specialization and filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuantity {
    pub id: TypeId,
    pub arity: Arity,
    pub unit: Option<TypeId>,
    pub dimension: Option<Dimension>,
    /// Specialization chain, root first, ending with this quantity.
    pub chain: Vec<TypeId>,
    pub flags: QuantityFlags,
    /// Own and inherited relationships, parent entries first.
    pub relationships: Vec<Sourced<Relationship>>,
    pub constants: Vec<Sourced<Constant>>,
    pub units: EffectiveUnitSet,
}

impl ResolvedQuantity {
    /// Direct parent, if this quantity specializes another.
    pub fn parent(&self) -> Option<&TypeId> {
        self.chain.iter().rev().nth(1)
    }

    pub fn is_specialized(&self) -> bool {
        self.chain.len() > 1
    }

    /// Relationships declared on this quantity itself.
    pub fn own_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(|r| r.origin == self.id)
            .map(|r| &r.value)
    }

    /// Relationships taken over from ancestors.
    pub fn inherited_relationships(&self) -> impl Iterator<Item = &Sourced<Relationship>> {
        self.relationships.iter().filter(|r| r.origin != self.id)
    }
}

/// Flags after inheritance and defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityFlags {
    pub allow_negative: bool,
    pub use_unit_bias: bool,
    pub implement_sum: bool,
    pub implement_difference: bool,
    pub difference: TypeId,
    pub default_unit: Option<String>,
    pub default_symbol: Option<String>,
}

/// A member together with the quantity that declared it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub origin: TypeId,
    pub value: T,
}

impl<T> Sourced<T> {
    pub fn new(origin: TypeId, value: T) -> Self {
        Self { origin, value }
    }
}

/// Naming overrides carried verbatim from the declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Naming {
    pub member: Option<String>,
    pub static_method: Option<String>,
    pub mirrored: Option<String>,
}

/// Sum, difference, dot or cross product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryRelationship {
    pub other: TypeId,
    pub result: TypeId,
    pub naming: Naming,
}

/// Arithmetic operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationRelationship {
    pub operator: OperatorKind,
    pub position: OperandPosition,
    pub other: TypeId,
    pub result: TypeId,
    pub implementation: Implementation,
    pub mirror: bool,
    pub naming: Naming,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub ty: Option<String>,
    pub name: String,
}

/// Process or property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessRelationship {
    pub name: String,
    pub expression: String,
    pub result: TypeId,
    pub parameters: Vec<Parameter>,
    pub implement_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionRelationship {
    pub target: TypeId,
    pub cast: CastKind,
}

/// A validated relationship of a quantity with others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "relation", rename_all = "snake_case")]
pub enum Relationship {
    Sum(BinaryRelationship),
    Difference(BinaryRelationship),
    Dot(BinaryRelationship),
    Cross(BinaryRelationship),
    Operation(OperationRelationship),
    Process(ProcessRelationship),
    Property(ProcessRelationship),
    Conversion(ConversionRelationship),
}

/// Identity of a relationship for duplicate detection and overriding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipKey {
    Sum(TypeId),
    Difference(TypeId),
    Dot(TypeId),
    Cross(TypeId),
    Operation(OperatorKind, OperandPosition, TypeId),
    /// Processes and properties share one namespace.
    Member(String),
    Conversion(TypeId),
}

/// Inherit flag governing a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipCategory {
    Operation,
    Process,
    Property,
    Conversion,
}

impl Relationship {
    pub fn key(&self) -> RelationshipKey {
        match self {
            Relationship::Sum(b) => RelationshipKey::Sum(b.other.clone()),
            Relationship::Difference(b) => RelationshipKey::Difference(b.other.clone()),
            Relationship::Dot(b) => RelationshipKey::Dot(b.other.clone()),
            Relationship::Cross(b) => RelationshipKey::Cross(b.other.clone()),
            Relationship::Operation(op) => {
                RelationshipKey::Operation(op.operator, op.position, op.other.clone())
            }
            Relationship::Process(p) | Relationship::Property(p) => {
                RelationshipKey::Member(p.name.clone())
            }
            Relationship::Conversion(c) => RelationshipKey::Conversion(c.target.clone()),
        }
    }

    pub fn category(&self) -> RelationshipCategory {
        match self {
            Relationship::Sum(_)
            | Relationship::Difference(_)
            | Relationship::Dot(_)
            | Relationship::Cross(_)
            | Relationship::Operation(_) => RelationshipCategory::Operation,
            Relationship::Process(_) => RelationshipCategory::Process,
            Relationship::Property(_) => RelationshipCategory::Property,
            Relationship::Conversion(_) => RelationshipCategory::Conversion,
        }
    }

    /// The quantity produced by this relationship.
    pub fn result(&self) -> &TypeId {
        match self {
            Relationship::Sum(b)
            | Relationship::Difference(b)
            | Relationship::Dot(b)
            | Relationship::Cross(b) => &b.result,
            Relationship::Operation(op) => &op.result,
            Relationship::Process(p) | Relationship::Property(p) => &p.result,
            Relationship::Conversion(c) => &c.target,
        }
    }
}

/// A named constant of a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: RawValue,
    pub unit: String,
    pub multiples: Option<String>,
}

/// Unit instances a quantity exposes after filtering.
///
/// Both lists follow the unit's instance declaration order and together
/// cover every resolved instance of the unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveUnitSet {
    pub included: Vec<String>,
    pub excluded: Vec<String>,
}

impl EffectiveUnitSet {
    /// Every instance of `all` included.
    pub fn all<'a>(all: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            included: all.into_iter().map(String::from).collect(),
            excluded: Vec::new(),
        }
    }

    /// Splits `all` by membership in `included`, keeping `all`'s order.
    pub fn partition<'a>(
        all: impl IntoIterator<Item = &'a str>,
        included: &BTreeSet<String>,
    ) -> Self {
        let (inc, exc): (Vec<&str>, Vec<&str>) =
            all.into_iter().partition(|name| included.contains(*name));
        Self {
            included: inc.into_iter().map(String::from).collect(),
            excluded: exc.into_iter().map(String::from).collect(),
        }
    }

    pub fn includes(&self, name: &str) -> bool {
        self.included.iter().any(|n| n == name)
    }

    pub fn excludes(&self, name: &str) -> bool {
        self.excluded.iter().any(|n| n == name)
    }

    pub fn is_complete(&self) -> bool {
        self.excluded.is_empty()
    }
}

/// Model plus every diagnostic of the pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub model: ResolvedModel,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Whether emission may proceed for `ty`: no blocking diagnostic is
    /// attributed to it.
    pub fn is_emittable(&self, ty: &TypeId) -> bool {
        let declared = self.model.units.contains_key(ty) || self.model.quantities.contains_key(ty);
        declared
            && !self
                .diagnostics
                .iter()
                .any(|d| d.is_blocking() && d.owner.as_ref() == Some(ty))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_blocking)
    }

    /// Types emission may proceed for, units first, in declaration order.
    pub fn emittable_types(&self) -> Vec<&TypeId> {
        self.model
            .units
            .keys()
            .chain(self.model.quantities.keys())
            .filter(|ty| self.is_emittable(ty))
            .collect()
    }
}
