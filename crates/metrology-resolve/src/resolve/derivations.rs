//! Unit derivation resolution.
//!
//! Validates each derivation declared on a unit type and reserves its
//! signature. A derivation survives only if its signature names units, its
//! expression parses, binds every signature position and (when dimensions
//! are known) produces the dimension of the measured quantity. A unit with
//! several derivations must name each of them, since derived instances
//! select a derivation by ID.
//!
//! Duplicate checks run against survivors only. Both the ID and the
//! signature are compared, but a derivation is reported once: when its ID
//! already collides, the signature collision is not reported on top.

use super::context::{locate, ResolveContext};
use super::expression::{self, Expr};
use super::intake::{Declared, UnitDecls};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{ResolvedDerivation, SignaturePermutation};
use indexmap::IndexMap;
use metrology_decl::{Dimension, RawDerivation};
use metrology_foundation::{Span, TypeId};
use tracing::trace;

/// Resolves every derivation of `unit`, in declaration order.
pub fn resolve_derivations(
    unit: &UnitDecls,
    ctx: &ResolveContext<'_>,
) -> (Vec<ResolvedDerivation>, Vec<Diagnostic>) {
    let mut errors = Vec::new();

    if unit.unit.decl.bias_term {
        for derivation in &unit.derivations {
            errors.push(
                Diagnostic::new(
                    DiagnosticKind::UnitWithBiasTermCannotBeDerived,
                    derivation.span,
                    format!(
                        "'{}' includes a bias term and cannot declare derivations",
                        unit.id
                    ),
                )
                .with_origin(&unit.id, derivation.index)
                .with_label(unit.unit.span, "bias term declared here".to_string()),
            );
        }
        return (Vec::new(), errors);
    }

    let mut resolved = Vec::new();
    // Reserved signature -> span of the derivation that reserved it.
    let mut reserved: IndexMap<Vec<TypeId>, Span> = IndexMap::new();
    let mut ids: IndexMap<String, Span> = IndexMap::new();

    for derivation in &unit.derivations {
        let Some(candidate) = check_derivation(unit, derivation, ctx, &mut errors) else {
            continue;
        };

        let mut duplicate = false;
        let raw = &derivation.decl;
        if let Some(id) = raw.id.as_ref().filter(|id| !id.node.is_empty()) {
            if let Some(first) = ids.get(&id.node) {
                errors.push(
                    Diagnostic::new(
                        DiagnosticKind::DuplicateUnitDerivationId,
                        locate(Some(id), derivation.span),
                        format!(
                            "derivation ID '{}' is already used by '{}'",
                            id.node, unit.id
                        ),
                    )
                    .with_origin(&unit.id, derivation.index)
                    .with_label(*first, "first used here".to_string()),
                );
                duplicate = true;
            }
        }
        // One diagnostic per rejected derivation; the ID check reports first.
        if let Some(first) = reserved.get(&candidate.signature).filter(|_| !duplicate) {
            errors.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicateUnitDerivationSignature,
                    derivation.span,
                    format!(
                        "'{}' already has a derivation with signature ({})",
                        unit.id,
                        join(&candidate.signature)
                    ),
                )
                .with_origin(&unit.id, derivation.index)
                .with_label(*first, "first derived here".to_string()),
            );
            duplicate = true;
        }
        if duplicate {
            continue;
        }

        if let Some(id) = raw.id.as_ref().filter(|id| !id.node.is_empty()) {
            ids.insert(id.node.clone(), locate(Some(id), derivation.span));
        }
        reserved.insert(candidate.signature.clone(), derivation.span);

        let permutations = if raw.permutations {
            permutations_of(unit, derivation, &candidate.signature, ctx, &mut errors)
                .into_iter()
                .filter(|p| !reserved.contains_key(&p.signature))
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };
        for permutation in &permutations {
            reserved.insert(permutation.signature.clone(), derivation.span);
        }

        trace!(
            unit = %unit.id,
            signature = %join(&candidate.signature),
            permutations = permutations.len(),
            "derivation reserved"
        );
        resolved.push(ResolvedDerivation {
            id: raw
                .id
                .as_ref()
                .map(|id| id.node.clone())
                .filter(|id| !id.is_empty()),
            expression: candidate.expression,
            signature: candidate.signature,
            permutations,
        });
    }

    (resolved, errors)
}

struct Candidate {
    expression: String,
    signature: Vec<TypeId>,
}

/// Checks a single derivation in isolation. Reports every problem found
/// and returns `None` if any was found.
fn check_derivation(
    unit: &UnitDecls,
    derivation: &Declared<RawDerivation>,
    ctx: &ResolveContext<'_>,
    errors: &mut Vec<Diagnostic>,
) -> Option<Candidate> {
    let raw = &derivation.decl;
    let origin = |d: Diagnostic| d.with_origin(&unit.id, derivation.index);

    // Incomplete signature: the annotation layer already reported it.
    let signature: Vec<_> = raw
        .signature
        .iter()
        .map(Option::as_ref)
        .collect::<Option<Vec<_>>>()?;

    let before = errors.len();
    let unnamed = raw.id.as_ref().map_or(true, |id| id.node.is_empty());
    if unnamed && unit.derivations.len() > 1 {
        errors.push(origin(Diagnostic::new(
            DiagnosticKind::MultipleDerivationsButNotNamed,
            derivation.span,
            format!(
                "'{}' declares {} derivations, so each needs an ID",
                unit.id,
                unit.derivations.len()
            ),
        )));
    }
    for element in &signature {
        if !ctx.decls.is_unit(&element.node) {
            let what = if ctx.decls.is_quantity(&element.node) {
                "a quantity"
            } else {
                "not declared"
            };
            errors.push(origin(Diagnostic::new(
                DiagnosticKind::TypeNotUnit,
                locate(Some(*element), derivation.span),
                format!(
                    "derivation signature names '{}', which is {what}, not a unit",
                    element.node
                ),
            )));
        }
    }
    let signature: Vec<TypeId> = signature.into_iter().map(|s| s.node.clone()).collect();

    let expression_span = locate(raw.expression.as_ref(), derivation.span);
    let text = raw
        .expression
        .as_ref()
        .map(|e| e.node.trim())
        .filter(|e| !e.is_empty());
    let parsed = match text {
        None => {
            errors.push(origin(Diagnostic::new(
                DiagnosticKind::MalformedDerivationExpression,
                expression_span,
                format!("derivation of '{}' has no expression", unit.id),
            )));
            None
        }
        Some(text) => match expression::parse(text) {
            Ok(expr) => Some(expr),
            Err(err) => {
                errors.push(origin(
                    Diagnostic::new(
                        DiagnosticKind::MalformedDerivationExpression,
                        expression_span,
                        format!("cannot parse derivation expression '{text}'"),
                    )
                    .with_note(err.to_string()),
                ));
                None
            }
        },
    };

    if let Some(expr) = &parsed {
        check_bindings(unit, expr, &signature, expression_span, ctx)
            .into_iter()
            .for_each(|d| errors.push(origin(d)));
    }

    if errors.len() > before {
        return None;
    }
    Some(Candidate {
        expression: text.unwrap_or_default().to_string(),
        signature,
    })
}

/// Placeholder arity and produced dimension.
fn check_bindings(
    unit: &UnitDecls,
    expr: &Expr,
    signature: &[TypeId],
    span: Span,
    ctx: &ResolveContext<'_>,
) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    let used = expr.placeholders();

    let out_of_range: Vec<String> = used
        .iter()
        .filter(|i| **i >= signature.len())
        .map(|i| format!("{{{i}}}"))
        .collect();
    if !out_of_range.is_empty() {
        errors.push(Diagnostic::new(
            DiagnosticKind::UnmatchedDerivationExpressionUnit,
            span,
            format!(
                "expression refers to {} but the signature has {} unit(s)",
                out_of_range.join(", "),
                signature.len()
            ),
        ));
    }

    let unused: Vec<String> = (0..signature.len())
        .filter(|i| !used.contains(i))
        .map(|i| format!("{} ({{{i}}})", signature[i]))
        .collect();
    if !unused.is_empty() {
        errors.push(Diagnostic::new(
            DiagnosticKind::UnmatchedDerivationExpressionUnit,
            span,
            format!("expression does not use {}", unused.join(", ")),
        ));
    }

    if !errors.is_empty() {
        return errors;
    }

    let Some(expected) = ctx.unit_dimension(&unit.id) else {
        return errors;
    };
    let bindings: Option<Vec<Dimension>> = signature
        .iter()
        .map(|element| ctx.unit_dimension(element))
        .collect();
    let Some(bindings) = bindings else {
        return errors;
    };

    match expr.dimension(&bindings) {
        Ok(produced) if produced == expected => {}
        Ok(produced) => errors.push(Diagnostic::new(
            DiagnosticKind::UnmatchedDerivationExpressionUnit,
            span,
            format!(
                "expression produces '{produced}' but '{}' measures '{expected}'",
                unit.id
            ),
        )),
        Err(err) => errors.push(
            Diagnostic::new(
                DiagnosticKind::UnmatchedDerivationExpressionUnit,
                span,
                format!("expression has no consistent dimension for '{}'", unit.id),
            )
            .with_note(err.to_string()),
        ),
    }
    errors
}

/// Distinct reorderings of `signature`, excluding the signature itself.
fn permutations_of(
    unit: &UnitDecls,
    derivation: &Declared<RawDerivation>,
    signature: &[TypeId],
    ctx: &ResolveContext<'_>,
    errors: &mut Vec<Diagnostic>,
) -> Vec<SignaturePermutation> {
    let all_identical = signature.windows(2).all(|w| w[0] == w[1]);
    if signature.len() <= 1 || all_identical {
        errors.push(
            Diagnostic::new(
                DiagnosticKind::DerivationPermutationsRedundant,
                derivation.span,
                format!(
                    "permutations requested for ({}) but no other ordering exists",
                    join(signature)
                ),
            )
            .with_origin(&unit.id, derivation.index),
        );
        return Vec::new();
    }
    let limit = ctx.config.max_permutation_arity;
    if signature.len() > limit {
        errors.push(
            Diagnostic::new(
                DiagnosticKind::DerivationPermutationsLimited,
                derivation.span,
                format!(
                    "permutations are not expanded for signatures longer than {limit}"
                ),
            )
            .with_origin(&unit.id, derivation.index),
        );
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..signature.len()).collect();
    let mut seen = vec![signature.to_vec()];
    let mut out = Vec::new();
    while next_permutation(&mut order) {
        let permuted: Vec<TypeId> = order.iter().map(|&i| signature[i].clone()).collect();
        if seen.contains(&permuted) {
            continue;
        }
        seen.push(permuted.clone());
        out.push(SignaturePermutation {
            signature: permuted,
            placeholders: order.clone(),
        });
    }
    out
}

/// Advances `order` to the next lexicographic permutation. Returns false
/// once the last permutation has been passed.
fn next_permutation(order: &mut [usize]) -> bool {
    let Some(pivot) = order.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(successor) = order.iter().rposition(|&x| x > order[pivot]) else {
        return false;
    };
    order.swap(pivot, successor);
    order[pivot + 1..].reverse();
    true
}

fn join(signature: &[TypeId]) -> String {
    signature
        .iter()
        .map(TypeId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
