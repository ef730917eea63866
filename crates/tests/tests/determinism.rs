//! Repeated and differently scheduled runs produce identical output.

use metrology::{load_declarations, ResolveConfig};
use metrology_decl::{FilterKind, OperatorKind, RawValue, StackingMode};
use metrology_tests::{mechanics, Declarations};
use pretty_assertions::assert_eq;

fn world() -> Declarations {
    mechanics()
        .specialization("Height", "Length")
        .specialization("Altitude", "Height")
        .fixed("UnitOfLength", "Metre")
        .scaled("UnitOfLength", "Foot", "Metre", RawValue::Number(0.3048))
        .fixed("UnitOfTime", "Second")
        .derivation("UnitOfSpeed", Some("id"), "{0} / {1}", &["UnitOfLength", "UnitOfTime"])
        .derivation("UnitOfSpeed", Some("id"), "{0} / {1}", &["UnitOfLength", "UnitOfTime"])
        .derived("UnitOfSpeed", "MetrePerSecond", Some("id"), &["Metre", "Second"])
        .derived("UnitOfSpeed", "FootPerSecond", Some("id"), &["Foot"])
        .operation("Length", OperatorKind::Divide, "Time", "Speed")
        .operation("Speed", OperatorKind::Multiply, "Time", "Length")
        .filter("Height", FilterKind::Exclude, &["Foot", "Foot"], Some(StackingMode::Union))
        .filter("Altitude", FilterKind::Include, &["Foot"], Some(StackingMode::Union))
}

#[test]
fn test_resolution_is_idempotent() {
    let decls = world();
    let first = decls.resolve();
    let second = decls.resolve();

    assert!(!first.diagnostics.is_empty());
    assert_eq!(first, second);
    assert_eq!(first.model.fingerprint(), second.model.fingerprint());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_scheduling_does_not_change_output() {
    let decls = world();
    let sequential = ResolveConfig {
        parallel_threshold: usize::MAX,
        ..ResolveConfig::default()
    };
    let parallel = ResolveConfig {
        parallel_threshold: 1,
        ..ResolveConfig::default()
    };
    assert_eq!(decls.resolve_with(&sequential), decls.resolve_with(&parallel));
}

#[test]
fn test_declarations_round_trip_through_json() {
    let decls = world();
    let json = serde_json::to_string(&decls.clone().build()).unwrap();
    let loaded = load_declarations(&json).unwrap();

    let direct = decls.resolve();
    let reloaded = metrology::resolve(&loaded, &ResolveConfig::default()).unwrap();
    assert_eq!(direct.model.fingerprint(), reloaded.model.fingerprint());
    assert_eq!(direct.diagnostics, reloaded.diagnostics);
}

#[test]
fn test_fingerprint_tracks_model_changes() {
    let base = world().resolve();
    let changed = world().fixed("UnitOfLength", "Yard").resolve();
    assert_ne!(base.model.fingerprint(), changed.model.fingerprint());
}
