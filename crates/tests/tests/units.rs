//! End-to-end unit resolution: derivations and the instances built on them.

use metrology_decl::{MetricPrefix, RawValue};
use metrology_foundation::TypeId;
use metrology_resolve::{DiagnosticKind, ResolvedRule};
use metrology_tests::{argument_span, instance_names, kinds, mechanics, Declarations};
use pretty_assertions::assert_eq;

fn with_instances() -> Declarations {
    mechanics()
        .fixed("UnitOfLength", "Metre")
        .fixed("UnitOfLength", "Foot")
        .fixed("UnitOfTime", "Second")
}

/// Two derivations sharing ID and signature reduce to one, flagged at the
/// second declaration's ID argument.
#[test]
fn test_duplicate_derivation_id() {
    let decls = with_instances()
        .derivation("UnitOfSpeed", Some("id"), "{0} / {1}", &["UnitOfLength", "UnitOfTime"]);
    let second = decls.next_index();
    let decls = decls
        .derivation("UnitOfSpeed", Some("id"), "{0} / {1}", &["UnitOfLength", "UnitOfTime"]);

    let resolution = decls.resolve();
    assert_eq!(kinds(&resolution), vec![DiagnosticKind::DuplicateUnitDerivationId]);
    assert_eq!(resolution.diagnostics[0].span, argument_span(second, 0));
    assert_eq!(resolution.diagnostics[0].owner, Some(TypeId::from("UnitOfSpeed")));

    let speed = resolution.model.unit(&TypeId::from("UnitOfSpeed")).unwrap();
    assert_eq!(speed.derivations.len(), 1);
    assert_eq!(speed.derivations[0].id.as_deref(), Some("id"));
    assert_eq!(
        speed.derivations[0].signature,
        vec![TypeId::from("UnitOfLength"), TypeId::from("UnitOfTime")]
    );
}

/// N derivations with one signature leave one survivor and N - 1
/// diagnostics.
#[test]
fn test_duplicate_signatures_reduce_to_one() {
    let signature = ["UnitOfLength", "UnitOfTime"];
    let resolution = with_instances()
        .derivation("UnitOfSpeed", Some("a"), "{0} / {1}", &signature)
        .derivation("UnitOfSpeed", Some("b"), "{0} / {1}", &signature)
        .derivation("UnitOfSpeed", Some("d"), "{0} / {1}", &signature)
        .derivation("UnitOfSpeed", Some("c"), "{1} / {0}", &["UnitOfTime", "UnitOfLength"])
        .resolve();

    assert_eq!(
        kinds(&resolution),
        vec![DiagnosticKind::DuplicateUnitDerivationSignature; 2]
    );
    let speed = resolution.model.unit(&TypeId::from("UnitOfSpeed")).unwrap();
    let ids: Vec<_> = speed.derivations.iter().map(|d| d.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("a"), Some("c")]);
}

/// Once a unit has several derivations, each needs an ID for derived
/// instances to pick from.
#[test]
fn test_unnamed_derivation_among_several() {
    let decls = with_instances()
        .derivation("UnitOfSpeed", Some("ratio"), "{0} / {1}", &["UnitOfLength", "UnitOfTime"]);
    let unnamed = decls.next_index();
    let resolution = decls
        .derivation("UnitOfSpeed", None, "{1} / {0}", &["UnitOfTime", "UnitOfLength"])
        .derived("UnitOfSpeed", "MetrePerSecond", Some("ratio"), &["Metre", "Second"])
        .resolve();

    assert_eq!(kinds(&resolution), vec![DiagnosticKind::MultipleDerivationsButNotNamed]);
    assert_eq!(resolution.diagnostics[0].declaration, Some(unnamed));
    let speed = resolution.model.unit(&TypeId::from("UnitOfSpeed")).unwrap();
    let ids: Vec<_> = speed.derivations.iter().map(|d| d.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("ratio")]);
    assert_eq!(instance_names(&resolution, "UnitOfSpeed"), vec!["MetrePerSecond"]);
}

/// Derived instances only build on instances that resolved, even when the
/// rejected one is declared after them.
#[test]
fn test_derived_from_rejected_instance() {
    let resolution = with_instances()
        .derivation("UnitOfSpeed", None, "{0} / {1}", &["UnitOfLength", "UnitOfTime"])
        .derived("UnitOfSpeed", "FurlongPerSecond", None, &["Furlong", "Second"])
        .derived("UnitOfSpeed", "MetrePerSecond", None, &["Metre", "Second"])
        .alias("UnitOfLength", "Furlong", "Chain")
        .resolve();

    assert_eq!(kinds(&resolution), vec![DiagnosticKind::UnrecognizedUnitName; 2]);
    assert_eq!(resolution.diagnostics[0].owner, Some(TypeId::from("UnitOfLength")));
    assert_eq!(resolution.diagnostics[1].owner, Some(TypeId::from("UnitOfSpeed")));
    assert_eq!(instance_names(&resolution, "UnitOfLength"), vec!["Metre", "Foot"]);
    assert_eq!(instance_names(&resolution, "UnitOfSpeed"), vec!["MetrePerSecond"]);
}

#[test]
fn test_derived_instance_list_size() {
    let resolution = with_instances()
        .derivation("UnitOfSpeed", Some("id"), "{0} / {1}", &["UnitOfLength", "UnitOfTime"])
        .derived("UnitOfSpeed", "MetrePerSecond", Some("id"), &["Metre"])
        .resolve();

    assert_eq!(kinds(&resolution), vec![DiagnosticKind::IncompatibleDerivedUnitListSize]);
    assert!(instance_names(&resolution, "UnitOfSpeed").is_empty());
    assert!(!resolution.is_emittable(&TypeId::from("UnitOfSpeed")));
    assert!(resolution.is_emittable(&TypeId::from("UnitOfLength")));
}

#[test]
fn test_derived_instances_match_derivations() {
    let resolution = with_instances()
        .derivation("UnitOfSpeed", Some("ratio"), "{0} / {1}", &["UnitOfLength", "UnitOfTime"])
        .derived("UnitOfSpeed", "MetrePerSecond", Some("ratio"), &["Metre", "Second"])
        .derived("UnitOfSpeed", "FootPerSecond", None, &["Foot", "Second"])
        .derived("UnitOfSpeed", "Knot", Some("nautical"), &["Metre", "Second"])
        .derived("UnitOfSpeed", "MilePerHour", Some("ratio"), &["Mile", "Hour"])
        .resolve();

    assert_eq!(
        kinds(&resolution),
        vec![
            DiagnosticKind::UnrecognizedUnitDerivationId,
            DiagnosticKind::UnrecognizedUnitName,
            DiagnosticKind::UnrecognizedUnitName,
        ]
    );
    assert_eq!(
        instance_names(&resolution, "UnitOfSpeed"),
        vec!["MetrePerSecond", "FootPerSecond"]
    );

    let speed = resolution.model.unit(&TypeId::from("UnitOfSpeed")).unwrap();
    assert_eq!(
        speed.instance("FootPerSecond").map(|i| &i.rule),
        Some(&ResolvedRule::Derived {
            derivation: Some("ratio".to_string()),
            units: vec!["Foot".to_string(), "Second".to_string()],
            signature: vec![TypeId::from("UnitOfLength"), TypeId::from("UnitOfTime")],
        })
    );
}

#[test]
fn test_unit_without_derivations_is_not_derivable() {
    let resolution = with_instances()
        .derived("UnitOfSpeed", "MetrePerSecond", None, &["Metre", "Second"])
        .derived("UnitOfSpeed", "FootPerSecond", Some("id"), &["Foot", "Second"])
        .resolve();

    assert_eq!(kinds(&resolution), vec![DiagnosticKind::UnitNotDerivable; 2]);
    assert!(instance_names(&resolution, "UnitOfSpeed").is_empty());
}

#[test]
fn test_bias_unit_rejects_derivations() {
    let resolution = Declarations::new()
        .quantity("Temperature", "UnitOfTemperature")
        .quantity("Length", "UnitOfLength")
        .bias_unit("UnitOfTemperature", "Temperature")
        .unit("UnitOfLength", "Length")
        .fixed("UnitOfTemperature", "Kelvin")
        .biased("UnitOfTemperature", "Celsius", "Kelvin", RawValue::Number(273.15))
        .biased("UnitOfLength", "Offset", "Metre", RawValue::Number(1.0))
        .fixed("UnitOfLength", "Metre")
        .derivation("UnitOfTemperature", Some("a"), "{0}", &["UnitOfTemperature"])
        .derivation("UnitOfTemperature", Some("b"), "{0} * {0}", &["UnitOfLength"])
        .resolve();

    assert_eq!(
        kinds(&resolution),
        vec![
            DiagnosticKind::UnitWithBiasTermCannotBeDerived,
            DiagnosticKind::UnitWithBiasTermCannotBeDerived,
            DiagnosticKind::UnitNotIncludingBiasTerm,
        ]
    );
    let temperature = resolution.model.unit(&TypeId::from("UnitOfTemperature")).unwrap();
    assert!(temperature.derivations.is_empty());
    assert_eq!(instance_names(&resolution, "UnitOfTemperature"), vec!["Kelvin", "Celsius"]);
    assert_eq!(instance_names(&resolution, "UnitOfLength"), vec!["Metre"]);
}

#[test]
fn test_modified_instances_in_any_order() {
    let resolution = with_instances()
        .prefixed("UnitOfLength", "Kilometre", "Metre", MetricPrefix::Kilo)
        .scaled("UnitOfLength", "Mile", "Yard", RawValue::Number(1760.0))
        .scaled("UnitOfLength", "Yard", "Foot", RawValue::Expression("3".to_string()))
        .alias("UnitOfLength", "Meter", "Metre")
        .scaled("UnitOfLength", "Fathom", "Yard", RawValue::Expression("  ".to_string()))
        .alias("UnitOfLength", "Parsec", "LightYear")
        .resolve();

    assert_eq!(
        kinds(&resolution),
        vec![
            DiagnosticKind::InvalidScaledUnitExpression,
            DiagnosticKind::UnrecognizedUnitName,
        ]
    );
    assert_eq!(
        instance_names(&resolution, "UnitOfLength"),
        vec!["Metre", "Foot", "Kilometre", "Mile", "Yard", "Meter"]
    );
}

#[test]
fn test_invalid_and_duplicate_instance_names() {
    let resolution = with_instances()
        .fixed("UnitOfLength", "Metre")
        .fixed("UnitOfLength", "light year")
        .resolve();

    assert_eq!(
        kinds(&resolution),
        vec![DiagnosticKind::DuplicateUnitName, DiagnosticKind::InvalidUnitName]
    );
    assert_eq!(instance_names(&resolution, "UnitOfLength"), vec!["Metre", "Foot"]);
}
