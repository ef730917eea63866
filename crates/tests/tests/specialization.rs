//! End-to-end specialization: inherited relationships and unit filters.

use metrology_decl::{FilterKind, InheritFlags, OperatorKind, RawQuantity, Spanned, StackingMode};
use metrology_foundation::{Span, TypeId};
use metrology_resolve::{DiagnosticKind, Relationship, ResolveConfig, ResolvedQuantity};
use metrology_tests::{kinds, mechanics, Declarations};
use pretty_assertions::assert_eq;

fn lengths() -> Declarations {
    mechanics()
        .fixed("UnitOfLength", "Metre")
        .fixed("UnitOfLength", "Foot")
        .fixed("UnitOfLength", "Yard")
        .fixed("UnitOfTime", "Second")
}

fn quantity<'r>(resolution: &'r metrology::Resolution, id: &str) -> &'r ResolvedQuantity {
    resolution
        .model
        .quantity(&TypeId::from(id))
        .unwrap_or_else(|| panic!("{id} not resolved"))
}

fn specializing(parent: &str, inherit: InheritFlags) -> RawQuantity {
    RawQuantity {
        specializes: Some(Spanned::new(TypeId::from(parent), Span::default())),
        inherit,
        ..Default::default()
    }
}

/// For A → B → C, every relationship on A not overridden below appears
/// unchanged on C.
#[test]
fn test_chain_keeps_unoverridden_relationships() {
    let resolution = lengths()
        .quantity("Area", "UnitOfLength")
        .specialization("Width", "Length")
        .specialization("Depth", "Width")
        .operation("Length", OperatorKind::Multiply, "Length", "Area")
        .operation("Length", OperatorKind::Divide, "Time", "Speed")
        .sum("Length", "Length", "Length")
        .operation("Width", OperatorKind::Divide, "Time", "Speed")
        .conversion("Depth", "Length")
        .resolve();
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);

    let length = quantity(&resolution, "Length");
    let depth = quantity(&resolution, "Depth");
    for relationship in length.own_relationships() {
        let overridden = matches!(
            relationship,
            Relationship::Operation(op) if op.operator == OperatorKind::Divide
        );
        let on_depth = depth
            .relationships
            .iter()
            .any(|r| r.origin == TypeId::from("Length") && &r.value == relationship);
        assert_eq!(on_depth, !overridden, "{relationship:?}");
    }

    let origins: Vec<&str> = depth.relationships.iter().map(|r| r.origin.name()).collect();
    assert_eq!(origins, vec!["Length", "Length", "Width", "Depth"]);
    assert_eq!(
        depth.chain,
        vec![TypeId::from("Length"), TypeId::from("Width"), TypeId::from("Depth")]
    );
    assert_eq!(depth.unit, Some(TypeId::from("UnitOfLength")));
}

#[test]
fn test_inherit_flags() {
    let resolution = lengths()
        .quantity("Area", "UnitOfLength")
        .quantity_with(
            "Span",
            specializing(
                "Length",
                InheritFlags {
                    operations: false,
                    ..InheritFlags::default()
                },
            ),
        )
        .quantity_with("Gap", specializing("Length", InheritFlags::NONE))
        .operation("Length", OperatorKind::Multiply, "Length", "Area")
        .conversion("Length", "Area")
        .constant("Length", "Reference", 1.0, "Metre")
        .resolve();
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);

    let span = quantity(&resolution, "Span");
    assert!(matches!(
        span.relationships.as_slice(),
        [r] if matches!(r.value, Relationship::Conversion(_))
    ));
    assert_eq!(span.constants.len(), 1);

    let gap = quantity(&resolution, "Gap");
    assert!(gap.relationships.is_empty());
    assert!(gap.constants.is_empty());
    assert!(gap.units.is_complete());
}

/// Parent excludes Foot; the child excludes Yard.
#[test]
fn test_exclusion_stacking() {
    let base = lengths()
        .specialization("Distance", "Length")
        .filter("Length", FilterKind::Exclude, &["Foot"], Some(StackingMode::Replace));

    let union = base
        .clone()
        .filter("Distance", FilterKind::Exclude, &["Yard"], Some(StackingMode::Union))
        .resolve();
    assert!(union.diagnostics.is_empty(), "{:?}", union.diagnostics);
    assert_eq!(quantity(&union, "Distance").units.excluded, vec!["Foot", "Yard"]);
    assert_eq!(quantity(&union, "Distance").units.included, vec!["Metre"]);

    let replace = base
        .filter("Distance", FilterKind::Exclude, &["Yard"], Some(StackingMode::Replace))
        .resolve();
    assert_eq!(quantity(&replace, "Distance").units.excluded, vec!["Yard"]);
    assert_eq!(quantity(&replace, "Length").units.excluded, vec!["Foot"]);
}

#[test]
fn test_filter_without_stacking_mode() {
    let decls = lengths().filter("Length", FilterKind::Include, &["Metre", "Parsec"], None);

    let ignored = decls.resolve();
    assert_eq!(kinds(&ignored), vec![DiagnosticKind::MissingStackingMode]);
    assert!(quantity(&ignored, "Length").units.is_complete());

    let config = ResolveConfig::default().with_default_stacking_mode(StackingMode::Replace);
    let applied = decls.resolve_with(&config);
    assert_eq!(kinds(&applied), vec![DiagnosticKind::UnrecognizedUnitName]);
    assert_eq!(quantity(&applied, "Length").units.included, vec!["Metre"]);
}

#[test]
fn test_specialization_cycle_is_broken() {
    let resolution = Declarations::new()
        .specialization("A", "B")
        .specialization("B", "A")
        .specialization("C", "B")
        .specialization("D", "Speedometer")
        .resolve();

    assert_eq!(
        kinds(&resolution),
        vec![
            DiagnosticKind::UnrecognizedQuantity,
            DiagnosticKind::CyclicSpecialization,
        ]
    );
    assert_eq!(resolution.diagnostics[1].owner, Some(TypeId::from("A")));
    assert!(!resolution.diagnostics[1].is_blocking());

    assert_eq!(quantity(&resolution, "A").chain, vec![TypeId::from("A")]);
    assert_eq!(
        quantity(&resolution, "C").chain,
        vec![TypeId::from("B"), TypeId::from("C")]
    );
    let ids: Vec<&str> = resolution.model.quantities.keys().map(TypeId::name).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D"]);
}
