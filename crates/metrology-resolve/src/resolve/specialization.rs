//! Specialization propagation.
//!
//! Produces the flattened view of one quantity: values inherited along its
//! specialization chain, the merged relationship and constant lists, and
//! the effective unit set. Parents are always propagated before their
//! children, so `parent` is the parent's finished view.
//!
//! # Pipeline Position
//!
//! ```text
//! Intake → Derivations/Instances → Relationships → Specialization → Filters → Model
//!                                                  ^^^^^^^^^^^^^^
//!                                                  YOU ARE HERE
//! ```
//!
//! ## Merge Order
//!
//! Inherited entries come first, in the parent's merged order, followed by
//! the quantity's own entries. An own entry with the same key as an
//! inherited one replaces it; the inherited one is dropped rather than
//! moved.

use super::context::{locate, nearest, ResolveContext};
use super::filters::effective_units;
use super::intake::QuantityDecls;
use super::relationships::OwnMembers;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{
    Constant, QuantityFlags, Relationship, RelationshipCategory,
    RelationshipKey, ResolvedQuantity, ResolvedUnit, Sourced,
};
use indexmap::IndexMap;
use metrology_decl::{Arity, InheritFlags};
use metrology_foundation::TypeId;
use std::collections::BTreeSet;
use tracing::debug;

/// Builds the resolved view of `quantity` from its own members and its
/// parent's resolved view.
pub fn propagate(
    quantity: &QuantityDecls,
    own: &OwnMembers,
    parent: Option<&ResolvedQuantity>,
    units: &IndexMap<TypeId, ResolvedUnit>,
    ctx: &ResolveContext<'_>,
) -> (ResolvedQuantity, Vec<Diagnostic>) {
    let mut errors = Vec::new();
    let id = &quantity.id;
    let raw = &quantity.quantity.decl;
    let chain = ctx.order.chain(id);

    if let Some(unit) = &raw.unit {
        if !ctx.decls.is_unit(&unit.node) {
            errors.push(
                Diagnostic::new(
                    DiagnosticKind::TypeNotUnit,
                    locate(Some(unit), quantity.quantity.span),
                    format!("'{id}' is measured in '{}', which is not a unit type", unit.node),
                )
                .with_origin(id, quantity.quantity.index),
            );
        }
    }

    if let Some(difference) = &raw.difference {
        if !ctx.decls.is_quantity(&difference.node) {
            let kind = if ctx.decls.is_unit(&difference.node) {
                DiagnosticKind::TypeNotQuantity
            } else {
                DiagnosticKind::UnrecognizedQuantity
            };
            errors.push(
                Diagnostic::new(
                    kind,
                    locate(Some(difference), quantity.quantity.span),
                    format!("difference of '{id}' is '{}', which is not a quantity", difference.node),
                )
                .with_origin(id, quantity.quantity.index),
            );
        }
    }

    let difference = nearest(ctx.decls, &chain, |q| {
        q.difference
            .as_ref()
            .filter(|d| ctx.decls.is_quantity(&d.node))
            .map(|d| d.node.clone())
    })
    .unwrap_or_else(|| id.clone());

    let mut flags = QuantityFlags {
        allow_negative: raw.allow_negative.unwrap_or(true),
        use_unit_bias: raw.use_unit_bias.unwrap_or(false),
        implement_sum: nearest(ctx.decls, &chain, |q| q.implement_sum).unwrap_or(true),
        implement_difference: nearest(ctx.decls, &chain, |q| q.implement_difference)
            .unwrap_or(true),
        difference,
        default_unit: nearest(ctx.decls, &chain, |q| {
            q.default_unit.as_ref().map(|u| u.node.clone())
        }),
        default_symbol: nearest(ctx.decls, &chain, |q| q.default_symbol.clone()),
    };

    let inherit = match parent {
        Some(_) => raw.inherit,
        None => InheritFlags::NONE,
    };
    let relationships = merge_relationships(id, own, parent, inherit);
    let constants = merge_constants(id, own, parent, inherit);

    let unit_id = ctx.unit_of(id).cloned();
    let unit = unit_id.as_ref().and_then(|u| units.get(u));
    let inherited_units = parent
        .filter(|p| inherit.units && p.unit.is_some() && p.unit == unit_id)
        .map(|p| &p.units);
    let (units, filter_errors) = effective_units(
        quantity,
        unit,
        inherited_units,
        ctx.config.default_stacking_mode,
    );
    errors.extend(filter_errors);

    if let Some(default_unit) = &flags.default_unit {
        if !units.includes(default_unit) {
            match &raw.default_unit {
                Some(own) => errors.push(
                    Diagnostic::new(
                        DiagnosticKind::UnrecognizedUnitName,
                        locate(Some(own), quantity.quantity.span),
                        format!("default unit '{default_unit}' is not a unit available to '{id}'"),
                    )
                    .with_origin(id, quantity.quantity.index),
                ),
                None => debug!(
                    quantity = %id,
                    default_unit = %default_unit,
                    "inherited default unit is filtered out"
                ),
            }
            flags.default_unit = None;
        }
    }

    let resolved = ResolvedQuantity {
        id: id.clone(),
        arity: ctx.arity(id).unwrap_or(Arity::Scalar),
        unit: unit_id,
        dimension: ctx.dimension(id),
        chain,
        flags,
        relationships,
        constants,
        units,
    };
    (resolved, errors)
}

fn inherits(inherit: InheritFlags, category: RelationshipCategory) -> bool {
    match category {
        RelationshipCategory::Operation => inherit.operations,
        RelationshipCategory::Process => inherit.processes,
        RelationshipCategory::Property => inherit.properties,
        RelationshipCategory::Conversion => inherit.conversions,
    }
}

fn merge_relationships(
    id: &TypeId,
    own: &OwnMembers,
    parent: Option<&ResolvedQuantity>,
    inherit: InheritFlags,
) -> Vec<Sourced<Relationship>> {
    let overridden: BTreeSet<RelationshipKey> =
        own.relationships.iter().map(Relationship::key).collect();

    let mut merged: Vec<Sourced<Relationship>> = parent
        .into_iter()
        .flat_map(|p| p.relationships.iter())
        .filter(|r| inherits(inherit, r.value.category()))
        .filter(|r| !overridden.contains(&r.value.key()))
        .cloned()
        .collect();
    let inherited = merged.len();

    merged.extend(
        own.relationships
            .iter()
            .map(|r| Sourced::new(id.clone(), r.clone())),
    );
    if inherited > 0 {
        debug!(quantity = %id, inherited, own = own.relationships.len(), "merged relationships");
    }
    merged
}

fn merge_constants(
    id: &TypeId,
    own: &OwnMembers,
    parent: Option<&ResolvedQuantity>,
    inherit: InheritFlags,
) -> Vec<Sourced<Constant>> {
    let mut merged: Vec<Sourced<Constant>> = match parent {
        Some(p) if inherit.constants => p
            .constants
            .iter()
            .filter(|c| !own.constants.iter().any(|o| o.name == c.value.name))
            .cloned()
            .collect(),
        _ => Vec::new(),
    };
    merged.extend(
        own.constants
            .iter()
            .map(|c| Sourced::new(id.clone(), c.clone())),
    );
    merged
}
