//! Specialization order.
//!
//! Every quantity names at most one parent, so the specialization graph is
//! a forest unless the input contains a cycle. This pass validates parent
//! references, breaks cycles and groups quantities into depth waves: wave
//! `d` holds every quantity whose chain has `d` ancestors, so wave `d` can
//! be propagated in parallel once wave `d - 1` is done.
//!
//! ## Cycle Handling
//!
//! Cycles are found by walking parent links from each quantity in
//! declaration order. Each cycle is reported once, as a warning on its
//! first declared member, and every member is treated as a root.

use super::context::locate;
use super::intake::DeclarationSet;
use crate::error::{Diagnostic, DiagnosticKind};
use indexmap::{IndexMap, IndexSet};
use metrology_foundation::TypeId;
use tracing::debug;

/// Validated parent links and propagation waves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecializationOrder {
    parents: IndexMap<TypeId, Option<TypeId>>,
    /// Quantities grouped by depth, each wave in declaration order.
    pub waves: Vec<Vec<TypeId>>,
}

impl SpecializationOrder {
    /// Validated parent of `id`; `None` for roots.
    pub fn parent(&self, id: &TypeId) -> Option<&TypeId> {
        self.parents.get(id)?.as_ref()
    }

    /// Specialization chain of `id`, root first, ending with `id`.
    pub fn chain(&self, id: &TypeId) -> Vec<TypeId> {
        let mut chain = vec![id.clone()];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }
}

/// Computes the specialization order of all declared quantities.
pub fn specialization_order(decls: &DeclarationSet) -> (SpecializationOrder, Vec<Diagnostic>) {
    let mut errors = Vec::new();
    let mut parents: IndexMap<TypeId, Option<TypeId>> = IndexMap::new();

    for (id, quantity) in &decls.quantities {
        let Some(parent) = quantity.quantity.decl.specializes.as_ref() else {
            parents.insert(id.clone(), None);
            continue;
        };
        if decls.is_quantity(&parent.node) {
            parents.insert(id.clone(), Some(parent.node.clone()));
            continue;
        }
        let kind = if decls.is_unit(&parent.node) {
            DiagnosticKind::TypeNotQuantity
        } else {
            DiagnosticKind::UnrecognizedQuantity
        };
        errors.push(
            Diagnostic::new(
                kind,
                locate(Some(parent), quantity.quantity.span),
                format!("'{id}' specializes '{}', which is not a quantity", parent.node),
            )
            .with_origin(id, quantity.quantity.index),
        );
        parents.insert(id.clone(), None);
    }

    for cycle in find_cycles(&parents) {
        let Some(first) = cycle.first() else {
            continue;
        };
        let quantity = &decls.quantities[first];
        let path = cycle
            .iter()
            .chain(std::iter::once(first))
            .map(TypeId::to_string)
            .collect::<Vec<_>>()
            .join(" → ");
        errors.push(
            Diagnostic::new(
                DiagnosticKind::CyclicSpecialization,
                locate(quantity.quantity.decl.specializes.as_ref(), quantity.quantity.span),
                format!("specialization cycle: {path}"),
            )
            .with_origin(first, quantity.quantity.index)
            .with_note("every quantity in the cycle is treated as unspecialized".to_string()),
        );
        for member in &cycle {
            parents.insert(member.clone(), None);
        }
    }

    let mut depths: IndexMap<TypeId, usize> = IndexMap::new();
    for id in parents.keys() {
        let mut depth = 0;
        let mut current = id;
        while let Some(Some(parent)) = parents.get(current) {
            depth += 1;
            current = parent;
        }
        depths.insert(id.clone(), depth);
    }

    let deepest = depths.values().copied().max().map_or(0, |d| d + 1);
    let mut waves = vec![Vec::new(); deepest];
    for (id, depth) in depths {
        waves[depth].push(id);
    }

    debug!(
        quantities = parents.len(),
        waves = waves.len(),
        "specialization order"
    );
    (SpecializationOrder { parents, waves }, errors)
}

/// Cycles among parent links, each listed from its first declared member
/// in link order.
fn find_cycles(parents: &IndexMap<TypeId, Option<TypeId>>) -> Vec<Vec<TypeId>> {
    let mut done: IndexSet<&TypeId> = IndexSet::new();
    let mut cycles = Vec::new();

    for start in parents.keys() {
        let mut path: Vec<&TypeId> = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if done.contains(id) {
                break;
            }
            if let Some(pos) = path.iter().position(|p| *p == id) {
                let mut cycle: Vec<TypeId> = path[pos..].iter().map(|p| (*p).clone()).collect();
                // Start at the member declared first.
                if let Some(first) = cycle
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, m)| parents.get_index_of(*m))
                    .map(|(i, _)| i)
                {
                    cycle.rotate_left(first);
                }
                cycles.push(cycle);
                break;
            }
            path.push(id);
            current = parents.get(id).and_then(Option::as_ref);
        }
        done.extend(path);
    }
    cycles
}
