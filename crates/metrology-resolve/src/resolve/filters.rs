//! Inclusion/exclusion filters over unit instances.
//!
//! A quantity exposes a subset of its unit's instances. The subset starts
//! from the parent's effective set (or every instance, for roots) and is
//! narrowed or widened by the quantity's own filter according to its
//! stacking mode:
//!
//! | filter  | union                | intersect            | replace   |
//! |---------|----------------------|----------------------|-----------|
//! | include | parent ∪ listed      | parent ∩ listed      | listed    |
//! | exclude | excluded ∪ listed    | excluded ∩ listed    | listed    |
//!
//! For exclude filters the operation applies to the parent's *excluded*
//! names and the included set is the complement.

use super::intake::{Declared, QuantityDecls};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{EffectiveUnitSet, ResolvedUnit};
use metrology_decl::{FilterKind, RawFilter, StackingMode};
use std::collections::BTreeSet;
use tracing::trace;

/// Computes the effective unit set of `quantity`.
///
/// `unit` is the resolved unit the quantity measures; `inherited` is the
/// parent's effective set when the parent measures the same unit and the
/// quantity inherits units, `None` otherwise.
pub fn effective_units(
    quantity: &QuantityDecls,
    unit: Option<&ResolvedUnit>,
    inherited: Option<&EffectiveUnitSet>,
    default_mode: Option<StackingMode>,
) -> (EffectiveUnitSet, Vec<Diagnostic>) {
    let mut errors = Vec::new();
    let all: Vec<&str> = unit.map(|u| u.instance_names().collect()).unwrap_or_default();
    let parent = match inherited {
        Some(set) => {
            let included = set.included.iter().cloned().collect();
            EffectiveUnitSet::partition(all.iter().copied(), &included)
        }
        None => EffectiveUnitSet::all(all.iter().copied()),
    };

    let Some(filter) = &quantity.filter else {
        return (parent, errors);
    };
    let origin = |d: Diagnostic| d.with_origin(&quantity.id, filter.index);

    let Some(mode) = filter.decl.stacking.or(default_mode) else {
        errors.push(origin(Diagnostic::new(
            DiagnosticKind::MissingStackingMode,
            filter.span,
            format!("unit filter of '{}' has no stacking mode and is ignored", quantity.id),
        )));
        return (parent, errors);
    };

    let listed = listed_names(quantity, filter, &all, &mut errors);
    let excluded_by_parent: BTreeSet<String> = parent.excluded.iter().cloned().collect();
    let included_by_parent: BTreeSet<String> = parent.included.iter().cloned().collect();

    let included = match (filter.decl.kind, mode) {
        (FilterKind::Include, StackingMode::Union) => {
            if parent.is_complete() {
                errors.push(origin(Diagnostic::new(
                    DiagnosticKind::UnionInclusionRedundant,
                    filter.span,
                    format!(
                        "'{}' already includes every unit, so a union inclusion has no effect",
                        quantity.id
                    ),
                )));
            } else {
                for name in listed.iter().filter(|n| included_by_parent.contains(*n)) {
                    errors.push(origin(no_effect(filter, name, "already included")));
                }
            }
            included_by_parent.union(&listed).cloned().collect()
        }
        (FilterKind::Include, StackingMode::Intersect) => {
            included_by_parent.intersection(&listed).cloned().collect()
        }
        (FilterKind::Include, StackingMode::Replace) => listed,
        (FilterKind::Exclude, mode) => {
            let excluded: BTreeSet<String> = match mode {
                StackingMode::Union => {
                    for name in listed.iter().filter(|n| excluded_by_parent.contains(*n)) {
                        errors.push(origin(no_effect(filter, name, "already excluded")));
                    }
                    excluded_by_parent.union(&listed).cloned().collect()
                }
                StackingMode::Intersect => {
                    excluded_by_parent.intersection(&listed).cloned().collect()
                }
                StackingMode::Replace => listed,
            };
            all.iter()
                .filter(|name| !excluded.contains(**name))
                .map(|name| name.to_string())
                .collect()
        }
    };

    let set = EffectiveUnitSet::partition(all.iter().copied(), &included);
    trace!(
        quantity = %quantity.id,
        included = set.included.len(),
        excluded = set.excluded.len(),
        "unit filter applied"
    );
    (set, errors)
}

/// Names listed by the filter that exist on the unit; unknown and repeated
/// names are reported and skipped.
fn listed_names(
    quantity: &QuantityDecls,
    filter: &Declared<RawFilter>,
    all: &[&str],
    errors: &mut Vec<Diagnostic>,
) -> BTreeSet<String> {
    let mut listed = BTreeSet::new();
    for name in &filter.decl.names {
        let span = super::context::locate(Some(name), filter.span);
        if !all.contains(&name.node.as_str()) {
            errors.push(
                Diagnostic::new(
                    DiagnosticKind::UnrecognizedUnitName,
                    span,
                    format!("'{}' is not a unit instance of '{}'", name.node, quantity.id),
                )
                .with_origin(&quantity.id, filter.index),
            );
        } else if !listed.insert(name.node.clone()) {
            errors.push(
                no_effect(filter, &name.node, "listed more than once")
                    .with_origin(&quantity.id, filter.index),
            );
        }
    }
    listed
}

fn no_effect(filter: &Declared<RawFilter>, name: &str, reason: &str) -> Diagnostic {
    let span = filter
        .decl
        .names
        .iter()
        .find(|n| n.node == name)
        .map_or(filter.span, |n| super::context::locate(Some(n), filter.span));
    Diagnostic::new(
        DiagnosticKind::InclusionHadNoEffect,
        span,
        format!("'{name}' is {reason}"),
    )
}
