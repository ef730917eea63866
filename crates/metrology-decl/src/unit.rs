//! Raw unit declarations: unit types, derivations and unit instances.

use crate::prefix::MetricPrefix;
use crate::quantity::RawValue;
use crate::spanned::Spanned;
use metrology_foundation::TypeId;
use serde::{Deserialize, Serialize};

/// A unit type, e.g. `UnitOfLength`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUnit {
    /// The quantity this unit measures.
    pub quantity: Option<Spanned<TypeId>>,
    /// Whether instances carry an additive offset (e.g. temperature scales).
    pub bias_term: bool,
}

/// Rule expressing a unit as an algebraic combination of other units.
///
/// `expression` binds placeholders `{0}`, `{1}`, ... positionally to the
/// entries of `signature`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDerivation {
    pub id: Option<Spanned<String>>,
    pub expression: Option<Spanned<String>>,
    /// Unit types bound to the placeholders. `None` entries are unresolved
    /// type arguments.
    pub signature: Vec<Option<Spanned<TypeId>>>,
    /// Also accept every reordering of the signature.
    pub permutations: bool,
}

/// How a unit instance is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum InstanceRule {
    /// A base instance with no original.
    Fixed,
    Alias {
        #[serde(default)]
        original: Option<Spanned<String>>,
    },
    Scaled {
        #[serde(default)]
        original: Option<Spanned<String>>,
        #[serde(default)]
        scale: Option<Spanned<RawValue>>,
    },
    Prefixed {
        #[serde(default)]
        original: Option<Spanned<String>>,
        #[serde(default)]
        prefix: Option<MetricPrefix>,
    },
    Biased {
        #[serde(default)]
        original: Option<Spanned<String>>,
        #[serde(default)]
        bias: Option<Spanned<RawValue>>,
    },
    Derived {
        /// Derivation ID; may be omitted when the unit has one derivation.
        #[serde(default)]
        derivation: Option<Spanned<String>>,
        /// Contributing instance names, one per signature position.
        #[serde(default)]
        units: Vec<Option<Spanned<String>>>,
    },
}

impl InstanceRule {
    /// The instance of the same unit this rule modifies, if any.
    pub fn original(&self) -> Option<&Spanned<String>> {
        match self {
            InstanceRule::Alias { original }
            | InstanceRule::Scaled { original, .. }
            | InstanceRule::Prefixed { original, .. }
            | InstanceRule::Biased { original, .. } => original.as_ref(),
            InstanceRule::Fixed | InstanceRule::Derived { .. } => None,
        }
    }
}

/// One named unit instance, e.g. `Metre` or `Kilometre`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUnitInstance {
    #[serde(default)]
    pub name: Option<Spanned<String>>,
    #[serde(default)]
    pub plural: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(flatten)]
    pub rule: InstanceRule,
}
