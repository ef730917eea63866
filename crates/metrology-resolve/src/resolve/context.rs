//! Read-only facts shared by the per-type resolvers.
//!
//! Built once after intake and specialization ordering, before any type is
//! resolved, so that unit and quantity resolution can run in parallel
//! without consulting each other's results. Inherited values follow the
//! validated specialization chains, so broken parent links and cycles are
//! already cut.
//!
//! [`InstanceIndex`] is the exception: it is filled from resolved units.

use super::intake::DeclarationSet;
use super::ordering::SpecializationOrder;
use crate::config::ResolveConfig;
use crate::model::ResolvedUnit;
use indexmap::{IndexMap, IndexSet};
use metrology_decl::{Arity, Dimension, RawQuantity, Spanned};
use metrology_foundation::{Span, TypeId};

/// Shared lookup tables for one resolution pass.
#[derive(Debug)]
pub struct ResolveContext<'a> {
    pub decls: &'a DeclarationSet,
    pub order: &'a SpecializationOrder,
    pub config: &'a ResolveConfig,
    arities: IndexMap<TypeId, Arity>,
    dimensions: IndexMap<TypeId, Dimension>,
    units_of: IndexMap<TypeId, TypeId>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        decls: &'a DeclarationSet,
        order: &'a SpecializationOrder,
        config: &'a ResolveConfig,
    ) -> Self {
        let mut arities = IndexMap::new();
        let mut dimensions = IndexMap::new();
        let mut units_of = IndexMap::new();
        for id in decls.quantities.keys() {
            let chain = order.chain(id);
            let arity = nearest(decls, &chain, |q| q.arity).unwrap_or(Arity::Scalar);
            arities.insert(id.clone(), arity);
            if let Some(dimension) = nearest(decls, &chain, |q| q.dimension) {
                dimensions.insert(id.clone(), dimension);
            }
            let unit = nearest(decls, &chain, |q| {
                q.unit
                    .as_ref()
                    .filter(|u| decls.is_unit(&u.node))
                    .map(|u| u.node.clone())
            });
            if let Some(unit) = unit {
                units_of.insert(id.clone(), unit);
            }
        }

        Self {
            decls,
            order,
            config,
            arities,
            dimensions,
            units_of,
        }
    }

    /// Arity of a quantity after inheritance.
    pub fn arity(&self, quantity: &TypeId) -> Option<Arity> {
        self.arities.get(quantity).copied()
    }

    /// Declared or inherited dimension of a quantity.
    pub fn dimension(&self, quantity: &TypeId) -> Option<Dimension> {
        self.dimensions.get(quantity).copied()
    }

    /// Dimension of the quantity a unit measures.
    pub fn unit_dimension(&self, unit: &TypeId) -> Option<Dimension> {
        let quantity = self.decls.units.get(unit)?.unit.decl.quantity.as_ref()?;
        self.dimension(&quantity.node)
    }

    /// Unit type of a quantity after inheritance.
    pub fn unit_of(&self, quantity: &TypeId) -> Option<&TypeId> {
        self.units_of.get(quantity)
    }
}

/// Names of the instances each unit type resolved, as opposed to merely
/// declared. Derived instances and constants may only refer to these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceIndex {
    names: IndexMap<TypeId, IndexSet<String>>,
}

impl InstanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index over a resolved model's units.
    pub fn from_units(units: &IndexMap<TypeId, ResolvedUnit>) -> Self {
        let mut index = Self::new();
        for (id, unit) in units {
            index.insert(id, unit.instance_names());
        }
        index
    }

    pub fn insert<'n>(&mut self, unit: &TypeId, names: impl IntoIterator<Item = &'n str>) {
        self.names
            .entry(unit.clone())
            .or_default()
            .extend(names.into_iter().map(String::from));
    }

    /// Whether `unit` resolved an instance with this name.
    pub fn contains(&self, unit: &TypeId, name: &str) -> bool {
        self.names
            .get(unit)
            .is_some_and(|names| names.contains(name))
    }

    /// Total number of resolved instances across all units.
    pub fn len(&self) -> usize {
        self.names.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Value set by the quantity nearest the end of `chain` (root first).
pub fn nearest<T>(
    decls: &DeclarationSet,
    chain: &[TypeId],
    get: impl Fn(&RawQuantity) -> Option<T>,
) -> Option<T> {
    chain
        .iter()
        .rev()
        .filter_map(|id| decls.quantities.get(id))
        .find_map(|q| get(&q.quantity.decl))
}

/// Whether a member or instance name is usable as an identifier.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Span of an optional argument, or `fallback` when it is absent or was
/// supplied without a location.
pub fn locate<T>(value: Option<&Spanned<T>>, fallback: Span) -> Span {
    match value {
        Some(v) if v.span != Span::default() => v.span,
        _ => fallback,
    }
}
