//! Unit instance resolution.
//!
//! Instances are checked in two rounds. Fixed and derived instances
//! resolve immediately; a derived instance's contributing names are looked
//! up in an [`InstanceIndex`] of instances that other units resolved.
//! Modified instances (alias, scaled, prefixed, biased) depend on another
//! instance of the same unit and resolve by fixpoint, so their declaration
//! order is irrelevant.
//!
//! The index itself comes from earlier rounds over all units; see
//! [`resolve_units`](super::units::resolve_units).

use super::context::{is_valid_name, locate, InstanceIndex};
use super::intake::{Declared, UnitDecls};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{ResolvedDerivation, ResolvedInstance, ResolvedRule};
use indexmap::IndexMap;
use metrology_decl::{InstanceRule, RawUnitInstance, RawValue, Spanned};
use metrology_foundation::Span;

/// A modified instance waiting for its original.
struct Pending<'d> {
    index: usize,
    name: &'d Spanned<String>,
    instance: &'d Declared<RawUnitInstance>,
    original: &'d Spanned<String>,
}

/// Resolves the instances of `unit` against its surviving derivations and
/// the instances already known to resolve.
pub fn resolve_instances(
    unit: &UnitDecls,
    derivations: &[ResolvedDerivation],
    known: &InstanceIndex,
) -> (Vec<ResolvedInstance>, Vec<Diagnostic>) {
    let mut errors = Vec::new();
    let mut names: IndexMap<&str, Span> = IndexMap::new();
    // Keyed by position in the unit's instance list to restore declaration order.
    let mut resolved: IndexMap<usize, ResolvedInstance> = IndexMap::new();
    let mut pending = Vec::new();

    for (index, instance) in unit.instances.iter().enumerate() {
        let origin = |d: Diagnostic| d.with_origin(&unit.id, instance.index);
        let raw = &instance.decl;

        let name = match raw.name.as_ref() {
            Some(name) if is_valid_name(&name.node) => name,
            other => {
                let shown = other.map(|n| n.node.as_str()).unwrap_or_default();
                errors.push(origin(Diagnostic::new(
                    DiagnosticKind::InvalidUnitName,
                    locate(other, instance.span),
                    format!("'{shown}' is not a valid unit instance name"),
                )));
                continue;
            }
        };
        let name_span = locate(Some(name), instance.span);
        if let Some(first) = names.get(name.node.as_str()) {
            errors.push(origin(
                Diagnostic::new(
                    DiagnosticKind::DuplicateUnitName,
                    name_span,
                    format!("'{}' already declares an instance named '{}'", unit.id, name.node),
                )
                .with_label(*first, "first declared here".to_string()),
            ));
            continue;
        }
        names.insert(name.node.as_str(), name_span);

        let rule = match &raw.rule {
            InstanceRule::Fixed => Some(ResolvedRule::Fixed),
            InstanceRule::Derived { derivation, units } => derived_rule(
                unit,
                instance,
                derivation.as_ref(),
                units,
                derivations,
                known,
                &mut errors,
            ),
            modified => {
                if check_modifier(unit, instance, modified, &mut errors) {
                    if let Some(original) = modified.original() {
                        pending.push(Pending {
                            index,
                            name,
                            instance,
                            original,
                        });
                    }
                }
                None
            }
        };
        if let Some(rule) = rule {
            resolved.insert(index, build(name, raw, rule));
        }
    }

    // Fixpoint over modified instances.
    loop {
        let before = pending.len();
        let mut waiting = Vec::new();
        for item in pending {
            let found = resolved
                .values()
                .any(|instance| instance.name == item.original.node);
            if found {
                let rule = modified_rule(&item.instance.decl.rule, &item.original.node);
                if let Some(rule) = rule {
                    resolved.insert(item.index, build(item.name, &item.instance.decl, rule));
                }
            } else {
                waiting.push(item);
            }
        }
        pending = waiting;
        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    for item in pending {
        errors.push(
            Diagnostic::new(
                DiagnosticKind::UnrecognizedUnitName,
                locate(Some(item.original), item.instance.span),
                format!(
                    "'{}' is derived from '{}', which is not a valid instance of '{}'",
                    item.name.node, item.original.node, unit.id
                ),
            )
            .with_origin(&unit.id, item.instance.index),
        );
    }

    resolved.sort_keys();
    (resolved.into_values().collect(), errors)
}

fn build(name: &Spanned<String>, raw: &RawUnitInstance, rule: ResolvedRule) -> ResolvedInstance {
    ResolvedInstance {
        name: name.node.clone(),
        plural: raw.plural.clone(),
        symbol: raw.symbol.clone(),
        rule,
    }
}

/// Local checks on a modified instance. Returns false if it is rejected.
fn check_modifier(
    unit: &UnitDecls,
    instance: &Declared<RawUnitInstance>,
    rule: &InstanceRule,
    errors: &mut Vec<Diagnostic>,
) -> bool {
    let origin = |d: Diagnostic| d.with_origin(&unit.id, instance.index);
    match rule {
        InstanceRule::Scaled { scale, .. } if is_blank(scale.as_ref()) => {
            errors.push(origin(Diagnostic::new(
                DiagnosticKind::InvalidScaledUnitExpression,
                locate(scale.as_ref(), instance.span),
                "scaled unit instance needs a non-empty scale".to_string(),
            )));
            false
        }
        InstanceRule::Biased { bias, .. } => {
            let mut ok = true;
            if is_blank(bias.as_ref()) {
                errors.push(origin(Diagnostic::new(
                    DiagnosticKind::InvalidBiasedUnitExpression,
                    locate(bias.as_ref(), instance.span),
                    "biased unit instance needs a non-empty bias".to_string(),
                )));
                ok = false;
            }
            if !unit.unit.decl.bias_term {
                errors.push(origin(
                    Diagnostic::new(
                        DiagnosticKind::UnitNotIncludingBiasTerm,
                        instance.span,
                        format!("'{}' does not include a bias term", unit.id),
                    )
                    .with_label(unit.unit.span, "unit declared here".to_string()),
                ));
                ok = false;
            }
            ok
        }
        // A missing prefix was reported by the annotation layer.
        InstanceRule::Prefixed { prefix: None, .. } => false,
        _ => true,
    }
}

fn is_blank(value: Option<&Spanned<RawValue>>) -> bool {
    value.map_or(true, |v| v.node.is_blank())
}

fn modified_rule(rule: &InstanceRule, original: &str) -> Option<ResolvedRule> {
    let original = original.to_string();
    Some(match rule {
        InstanceRule::Alias { .. } => ResolvedRule::Alias { original },
        InstanceRule::Scaled { scale, .. } => ResolvedRule::Scaled {
            original,
            scale: scale.as_ref()?.node.clone(),
        },
        InstanceRule::Prefixed { prefix, .. } => ResolvedRule::Prefixed {
            original,
            prefix: (*prefix)?,
        },
        InstanceRule::Biased { bias, .. } => ResolvedRule::Biased {
            original,
            bias: bias.as_ref()?.node.clone(),
        },
        InstanceRule::Fixed | InstanceRule::Derived { .. } => return None,
    })
}

fn derived_rule(
    unit: &UnitDecls,
    instance: &Declared<RawUnitInstance>,
    requested: Option<&Spanned<String>>,
    units: &[Option<Spanned<String>>],
    derivations: &[ResolvedDerivation],
    known: &InstanceIndex,
    errors: &mut Vec<Diagnostic>,
) -> Option<ResolvedRule> {
    let origin = |d: Diagnostic| d.with_origin(&unit.id, instance.index);

    if unit.derivations.is_empty() {
        errors.push(origin(Diagnostic::new(
            DiagnosticKind::UnitNotDerivable,
            instance.span,
            format!("'{}' declares no derivations", unit.id),
        )));
        return None;
    }

    let requested = requested.filter(|id| !id.node.is_empty());
    let chosen = match requested {
        Some(id) => derivations
            .iter()
            .find(|d| d.id.as_deref() == Some(id.node.as_str())),
        None if unit.derivations.len() == 1 => derivations.first(),
        None => None,
    };
    let Some(chosen) = chosen else {
        let message = match requested {
            Some(id) => format!("'{}' has no derivation with ID '{}'", unit.id, id.node),
            None if unit.derivations.len() == 1 => {
                format!("the only derivation of '{}' was rejected", unit.id)
            }
            None => format!(
                "'{}' declares {} derivations; the instance must name one",
                unit.id,
                unit.derivations.len()
            ),
        };
        errors.push(origin(Diagnostic::new(
            DiagnosticKind::UnrecognizedUnitDerivationId,
            locate(requested, instance.span),
            message,
        )));
        return None;
    };

    if units.len() != chosen.signature.len() {
        errors.push(origin(Diagnostic::new(
            DiagnosticKind::IncompatibleDerivedUnitListSize,
            instance.span,
            format!(
                "derivation expects {} unit(s) but {} were given",
                chosen.signature.len(),
                units.len()
            ),
        )));
        return None;
    }

    let mut names = Vec::with_capacity(units.len());
    let mut ok = true;
    for (element, contributing) in units.iter().zip(&chosen.signature) {
        match element {
            Some(name) if known.contains(contributing, &name.node) => {
                names.push(name.node.clone());
            }
            Some(name) if is_valid_name(&name.node) => {
                errors.push(origin(Diagnostic::new(
                    DiagnosticKind::UnrecognizedUnitName,
                    locate(Some(name), instance.span),
                    format!("'{}' is not an instance of '{}'", name.node, contributing),
                )));
                ok = false;
            }
            other => {
                let shown = other.as_ref().map(|n| n.node.as_str()).unwrap_or_default();
                errors.push(origin(Diagnostic::new(
                    DiagnosticKind::InvalidUnitName,
                    locate(other.as_ref(), instance.span),
                    format!("'{shown}' is not a valid unit instance name"),
                )));
                ok = false;
            }
        }
    }
    if !ok {
        return None;
    }

    Some(ResolvedRule::Derived {
        derivation: chosen.id.clone(),
        units: names,
        signature: chosen.signature.clone(),
    })
}
