//! Metrology
//!
//! Entry point for resolving quantity and unit declarations. Loads the raw
//! declarations handed over by the annotation parser, runs every
//! resolution pass and returns the resolved model with its diagnostics.
//!
//! ```text
//! JSON ──► load_declarations() ──► resolve() ──► Resolution ──► emitter
//!                                                    │
//!                                                    └──► format_diagnostics()
//! ```
//!
//! Diagnostics are data: a declaration set full of mistakes still resolves.
//! [`ResolveError`] only covers problems outside the declarations
//! themselves, such as unreadable input or an invalid configuration.

use metrology_foundation::SourceMap;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

pub use metrology_decl as decl;
pub use metrology_foundation as foundation;
pub use metrology_resolve as resolver;

pub use metrology_decl::RawDeclaration;
pub use metrology_resolve::{
    ConfigError, Diagnostic, DiagnosticFormatter, DiagnosticKind, Resolution, ResolveConfig,
    ResolvedModel, Severity,
};

/// Facade result type
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Operational errors of the facade.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("malformed declaration input: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a JSON array of raw declarations.
pub fn load_declarations(json: &str) -> Result<Vec<RawDeclaration>> {
    let declarations: Vec<RawDeclaration> = serde_json::from_str(json)?;
    debug!(declarations = declarations.len(), "declarations loaded");
    Ok(declarations)
}

/// Parses a resolve configuration; omitted fields take their defaults.
pub fn load_config(json: &str) -> Result<ResolveConfig> {
    let config: ResolveConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Resolves `declarations` after validating `config`.
pub fn resolve(declarations: &[RawDeclaration], config: &ResolveConfig) -> Result<Resolution> {
    config.validate()?;
    let resolution = metrology_resolve::resolve(declarations, config);
    if resolution.has_errors() {
        info!(
            emittable = resolution.emittable_types().len(),
            "resolution reported blocking diagnostics"
        );
    }
    Ok(resolution)
}

/// Loads and resolves a JSON declaration array in one step.
pub fn resolve_json(json: &str, config: &ResolveConfig) -> Result<Resolution> {
    let declarations = load_declarations(json)?;
    resolve(&declarations, config)
}

/// Renders every diagnostic of `resolution` against `sources`.
pub fn format_diagnostics(resolution: &Resolution, sources: &SourceMap) -> String {
    DiagnosticFormatter::new(sources).format_all(&resolution.diagnostics)
}

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info` everywhere and `debug` for the metrology crates.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,metrology=debug,metrology_resolve=debug"));

    fmt().with_env_filter(filter).with_target(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrology_foundation::TypeId;
    use pretty_assertions::assert_eq;

    const SPEED: &str = r#"[
        {"owner": "Length", "kind": "quantity", "arity": "scalar", "unit": "UnitOfLength"},
        {"owner": "Time", "kind": "quantity", "arity": "scalar", "unit": "UnitOfTime"},
        {"owner": "Speed", "kind": "quantity", "arity": "scalar", "unit": "UnitOfSpeed"},
        {"owner": "UnitOfLength", "kind": "unit", "quantity": "Length"},
        {"owner": "UnitOfTime", "kind": "unit", "quantity": "Time"},
        {"owner": "UnitOfSpeed", "kind": "unit", "quantity": "Speed"},
        {"owner": "UnitOfLength", "kind": "unit_instance", "name": "Metre", "rule": "fixed"},
        {"owner": "UnitOfTime", "kind": "unit_instance", "name": "Second", "rule": "fixed"},
        {"owner": "UnitOfSpeed", "kind": "derivation", "id": "id",
         "expression": "{0} / {1}", "signature": ["UnitOfLength", "UnitOfTime"]},
        {"owner": "UnitOfSpeed", "kind": "unit_instance", "name": "MetrePerSecond",
         "rule": "derived", "units": ["Metre", "Second"]}
    ]"#;

    #[test]
    fn test_resolve_json() {
        let resolution = resolve_json(SPEED, &ResolveConfig::default()).unwrap();
        assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);

        let speed = resolution.model.unit(&TypeId::from("UnitOfSpeed")).unwrap();
        assert_eq!(speed.instance_names().collect::<Vec<_>>(), vec!["MetrePerSecond"]);
        assert_eq!(resolution.emittable_types().len(), 6);
    }

    #[test]
    fn test_malformed_json() {
        let err = load_declarations(r#"[{"owner": "Length"}]"#).unwrap_err();
        assert!(matches!(err, ResolveError::Json(_)));
        assert!(err.to_string().starts_with("malformed declaration input"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ResolveConfig {
            parallel_threshold: 0,
            ..ResolveConfig::default()
        };
        let err = resolve(&[], &config).unwrap_err();
        assert!(matches!(err, ResolveError::Config(_)));

        assert!(load_config(r#"{"max_permutation_arity": 0}"#).is_err());
        let config = load_config(r#"{"warnings_as_errors": true}"#).unwrap();
        assert!(config.warnings_as_errors);
    }

    #[test]
    fn test_format_diagnostics_without_sources() {
        let json = r#"[
            {"owner": "UnitOfLength", "kind": "unit", "quantity": "Length"},
            {"owner": "UnitOfLength", "kind": "unit_instance", "name": "2m", "rule": "fixed"}
        ]"#;
        let resolution = resolve_json(json, &ResolveConfig::default()).unwrap();
        let rendered = format_diagnostics(&resolution, &SourceMap::new());

        assert!(rendered.contains("unrecognized quantity"), "{rendered}");
        assert!(rendered.contains("invalid unit name"), "{rendered}");
        assert!(rendered.contains("--> UnitOfLength"), "{rendered}");
    }
}
