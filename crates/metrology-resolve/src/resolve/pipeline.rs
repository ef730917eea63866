//! The full resolution pass.
//!
//! # Pipeline Position
//!
//! ```text
//! Intake → Derivations/Instances → Relationships → Specialization → Filters → Model
//! ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//!                                 ALL STAGES
//! ```
//!
//! Own relationships are independent per type and resolve in parallel.
//! Units resolve in rounds until the set of resolved instances settles,
//! each round in parallel. Specialization runs one depth wave at a time; every quantity
//! in a wave only reads views from earlier waves. Results are collected in
//! input order, so the output does not depend on scheduling.
//!
//! Diagnostics are appended stage by stage: intake, then units in
//! declaration order, then own relationships of quantities in declaration
//! order, then specialization ordering and propagation per quantity in
//! declaration order.

use super::context::{InstanceIndex, ResolveContext};
use super::intake::{intake, QuantityDecls};
use super::ordering::specialization_order;
use super::relationships::{resolve_relationships, OwnMembers};
use super::specialization::propagate;
use super::units::resolve_units;
use crate::config::ResolveConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Diagnostic;
use crate::model::{Resolution, ResolvedModel, ResolvedQuantity};
use indexmap::IndexMap;
use metrology_decl::RawDeclaration;
use metrology_foundation::TypeId;
use rayon::prelude::*;
use tracing::{debug, info};

/// Resolves a declaration set into a model plus diagnostics.
///
/// Never fails: every problem is reported as a diagnostic and the
/// offending declaration is left out of the model. Resolving the same
/// declarations with the same configuration twice yields identical
/// results, including diagnostic order.
pub fn resolve(declarations: &[RawDeclaration], config: &ResolveConfig) -> Resolution {
    info!(declarations = declarations.len(), "resolution started");
    let mut diagnostics = Diagnostics::new();

    let (decls, intake_errors) = intake(declarations);
    diagnostics.extend(intake_errors);
    let (order, order_errors) = specialization_order(&decls);
    let ctx = ResolveContext::new(&decls, &order, config);

    // Units
    let (units, unit_errors) = resolve_units(&ctx);
    diagnostics.extend(unit_errors);
    let instances = InstanceIndex::from_units(&units);
    debug!(units = units.len(), instances = instances.len(), "units resolved");

    // Own relationships
    let quantity_decls: Vec<&QuantityDecls> = decls.quantities.values().collect();
    let resolved_own = map_stage(&quantity_decls, config.parallel_threshold, |quantity| {
        resolve_relationships(quantity, &instances, &ctx)
    });
    let mut own: IndexMap<TypeId, OwnMembers> = IndexMap::with_capacity(resolved_own.len());
    for (quantity, (members, errors)) in quantity_decls.iter().zip(resolved_own) {
        diagnostics.extend(errors);
        own.insert(quantity.id.clone(), members);
    }
    debug!(quantities = own.len(), "relationships resolved");

    // Specialization, parents first
    diagnostics.extend(order_errors);
    let mut views: IndexMap<TypeId, ResolvedQuantity> = IndexMap::new();
    let mut propagation_errors: IndexMap<TypeId, Vec<Diagnostic>> = IndexMap::new();
    let empty = OwnMembers::default();
    for (depth, wave) in order.waves.iter().enumerate() {
        let results = map_stage(wave, config.parallel_threshold, |id| {
            let quantity = &decls.quantities[id];
            let parent = order.parent(id).and_then(|p| views.get(p));
            let members = own.get(id).unwrap_or(&empty);
            propagate(quantity, members, parent, &units, &ctx)
        });
        debug!(depth, quantities = wave.len(), "specialization wave propagated");
        for (id, (view, errors)) in wave.iter().zip(results) {
            views.insert(id.clone(), view);
            propagation_errors.insert(id.clone(), errors);
        }
    }
    for id in decls.quantities.keys() {
        if let Some(errors) = propagation_errors.swap_remove(id) {
            diagnostics.extend(errors);
        }
    }

    if config.warnings_as_errors {
        diagnostics.promote_warnings();
    }

    let quantities: IndexMap<TypeId, ResolvedQuantity> = decls
        .quantities
        .keys()
        .filter_map(|id| views.swap_remove(id).map(|view| (id.clone(), view)))
        .collect();

    info!(
        units = units.len(),
        quantities = quantities.len(),
        diagnostics = diagnostics.len(),
        blocking = diagnostics.blocking_owners().len(),
        "resolution finished"
    );

    Resolution {
        model: ResolvedModel { units, quantities },
        diagnostics: diagnostics.collect(),
    }
}

/// Maps `f` over `items`, in parallel when there are at least `threshold`
/// of them. Output order always matches input order.
pub(super) fn map_stage<T, R, F>(items: &[T], threshold: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if items.len() < threshold {
        items.iter().map(f).collect()
    } else {
        items.par_iter().map(f).collect()
    }
}
