//! End-to-end relationship checks and what they mean for emission.

use metrology_decl::{Arity, OperatorKind, RawQuantity, Spanned};
use metrology_foundation::{Span, TypeId};
use metrology_resolve::{DiagnosticKind, Relationship, ResolveConfig};
use metrology_tests::{declaration_span, kinds, mechanics, Declarations};
use pretty_assertions::assert_eq;

fn with_displacement() -> Declarations {
    mechanics().quantity_with(
        "Displacement",
        RawQuantity {
            arity: Some(Arity::Vector3),
            unit: Some(Spanned::new(TypeId::from("UnitOfLength"), Span::default())),
            ..Default::default()
        },
    )
}

/// Rejected relationships are dropped and block emission of their owner
/// only.
#[test]
fn test_rejected_relationships_block_owner() {
    let decls = with_displacement().operation("Length", OperatorKind::Divide, "Time", "Speed");
    let mismatched = decls.next_index();
    let resolution = decls
        .sum("Length", "Displacement", "Length")
        .operation("Length", OperatorKind::Multiply, "UnitOfTime", "Length")
        .resolve();

    assert_eq!(
        kinds(&resolution),
        vec![
            DiagnosticKind::InvalidQuantityOperation,
            DiagnosticKind::TypeNotQuantity,
        ]
    );
    assert_eq!(resolution.diagnostics[0].owner, Some(TypeId::from("Length")));
    assert!(resolution.diagnostics[0].span.start >= declaration_span(mismatched).start);

    let length = resolution.model.quantity(&TypeId::from("Length")).unwrap();
    assert!(matches!(
        length.relationships.as_slice(),
        [r] if matches!(&r.value, Relationship::Operation(op) if op.operator == OperatorKind::Divide)
    ));

    assert!(!resolution.is_emittable(&TypeId::from("Length")));
    assert!(resolution.is_emittable(&TypeId::from("Time")));
    assert!(resolution.is_emittable(&TypeId::from("UnitOfLength")));
    assert!(!resolution.is_emittable(&TypeId::from("Volume")));
}

#[test]
fn test_warnings_block_only_when_promoted() {
    let decls = with_displacement().conversion("Length", "Length");

    let lenient = decls.resolve();
    assert_eq!(kinds(&lenient), vec![DiagnosticKind::QuantityConvertibleToSelf]);
    assert!(lenient.is_emittable(&TypeId::from("Length")));
    assert!(lenient
        .model
        .quantity(&TypeId::from("Length"))
        .unwrap()
        .relationships
        .is_empty());

    let strict = decls.resolve_with(&ResolveConfig {
        warnings_as_errors: true,
        ..ResolveConfig::default()
    });
    assert_eq!(kinds(&strict), vec![DiagnosticKind::QuantityConvertibleToSelf]);
    assert!(!strict.is_emittable(&TypeId::from("Length")));
}

/// A vector specialization of a scalar parent keeps its own arity while
/// inheriting the parent's unit.
#[test]
fn test_specialization_overrides_arity() {
    let resolution = with_displacement()
        .quantity_with(
            "Position",
            RawQuantity {
                specializes: Some(Spanned::new(TypeId::from("Displacement"), Span::default())),
                ..Default::default()
            },
        )
        .quantity_with(
            "Velocity",
            RawQuantity {
                arity: Some(Arity::Vector3),
                unit: Some(Spanned::new(TypeId::from("UnitOfSpeed"), Span::default())),
                ..Default::default()
            },
        )
        .operation("Displacement", OperatorKind::Divide, "Time", "Velocity")
        .resolve();
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);

    let position = resolution.model.quantity(&TypeId::from("Position")).unwrap();
    assert_eq!(position.arity, Arity::Vector3);
    assert_eq!(position.unit, Some(TypeId::from("UnitOfLength")));
    assert_eq!(position.relationships.len(), 1);
    assert_eq!(position.relationships[0].origin, TypeId::from("Displacement"));
}

/// A constant's unit must be an instance that resolved, not merely one
/// that was declared.
#[test]
fn test_constant_on_rejected_instance() {
    let resolution = mechanics()
        .fixed("UnitOfLength", "Metre")
        .alias("UnitOfLength", "League", "Chain")
        .constant("Length", "League", 4828.0, "Metre")
        .constant("Length", "Marathon", 8.74, "League")
        .resolve();

    assert_eq!(kinds(&resolution), vec![DiagnosticKind::UnrecognizedUnitName; 2]);
    assert_eq!(resolution.diagnostics[0].owner, Some(TypeId::from("UnitOfLength")));
    assert_eq!(resolution.diagnostics[1].owner, Some(TypeId::from("Length")));

    let length = resolution.model.quantity(&TypeId::from("Length")).unwrap();
    let names: Vec<_> = length.constants.iter().map(|c| c.value.name.as_str()).collect();
    assert_eq!(names, ["League"]);
    assert!(!resolution.is_emittable(&TypeId::from("Length")));
}
