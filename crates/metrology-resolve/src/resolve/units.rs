//! Per-unit resolution: quantity reference, derivations, instances.
//!
//! Derivations only depend on their own unit and resolve in one pass.
//! Instances do not: a derived instance names instances of other units,
//! which may themselves be derived. Instances therefore resolve in rounds
//! against an [`InstanceIndex`] of the previous round's results, starting
//! from an empty index. The resolved set only grows from round to round,
//! so the loop stops at the first round that adds no name. That round's
//! instances and diagnostics are final; names that never resolve (missing,
//! rejected, or part of a cycle across units) are reported there.

use super::context::{locate, InstanceIndex, ResolveContext};
use super::derivations::resolve_derivations;
use super::instances::resolve_instances;
use super::intake::UnitDecls;
use super::pipeline::map_stage;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{ResolvedDerivation, ResolvedUnit};
use indexmap::IndexMap;
use metrology_foundation::TypeId;
use tracing::{debug, trace};

/// Everything about a unit except its instances.
struct UnitHead<'d> {
    decls: &'d UnitDecls,
    quantity: Option<TypeId>,
    derivations: Vec<ResolvedDerivation>,
    errors: Vec<Diagnostic>,
}

/// Resolves every unit type, in declaration order. Never fails; problems
/// become diagnostics and the offending declarations are left out.
pub fn resolve_units(ctx: &ResolveContext<'_>) -> (IndexMap<TypeId, ResolvedUnit>, Vec<Diagnostic>) {
    let threshold = ctx.config.parallel_threshold;
    let unit_decls: Vec<&UnitDecls> = ctx.decls.units.values().collect();
    let heads = map_stage(&unit_decls, threshold, |unit| resolve_head(*unit, ctx));

    let mut known = InstanceIndex::new();
    let mut round = 0usize;
    let instances = loop {
        round += 1;
        let results = map_stage(&heads, threshold, |head| {
            resolve_instances(head.decls, &head.derivations, &known)
        });
        let mut next = InstanceIndex::new();
        for (head, (instances, _)) in heads.iter().zip(&results) {
            next.insert(&head.decls.id, instances.iter().map(|i| i.name.as_str()));
        }
        trace!(round, instances = next.len(), "instance round");
        if next == known {
            break results;
        }
        known = next;
    };
    debug!(rounds = round, instances = known.len(), "unit instances resolved");

    let mut units = IndexMap::with_capacity(heads.len());
    let mut errors = Vec::new();
    for (head, (instances, instance_errors)) in heads.into_iter().zip(instances) {
        errors.extend(head.errors);
        errors.extend(instance_errors);
        let id = head.decls.id.clone();
        units.insert(
            id.clone(),
            ResolvedUnit {
                id,
                quantity: head.quantity,
                bias_term: head.decls.unit.decl.bias_term,
                derivations: head.derivations,
                instances,
            },
        );
    }
    (units, errors)
}

fn resolve_head<'d>(unit: &'d UnitDecls, ctx: &ResolveContext<'_>) -> UnitHead<'d> {
    let mut errors = Vec::new();

    let quantity = match unit.unit.decl.quantity.as_ref() {
        Some(quantity) if ctx.decls.is_quantity(&quantity.node) => Some(quantity.node.clone()),
        Some(quantity) => {
            let kind = if ctx.decls.is_unit(&quantity.node) {
                DiagnosticKind::TypeNotQuantity
            } else {
                DiagnosticKind::UnrecognizedQuantity
            };
            errors.push(
                Diagnostic::new(
                    kind,
                    locate(Some(quantity), unit.unit.span),
                    format!("'{}' measures '{}', which is not a quantity", unit.id, quantity.node),
                )
                .with_origin(&unit.id, unit.unit.index),
            );
            None
        }
        None => None,
    };

    let (derivations, derivation_errors) = resolve_derivations(unit, ctx);
    errors.extend(derivation_errors);

    UnitHead {
        decls: unit,
        quantity,
        derivations,
        errors,
    }
}
