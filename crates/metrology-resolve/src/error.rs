//! Resolution diagnostics.
//!
//! Resolution never fails: every invariant violation becomes a
//! [`Diagnostic`] and the offending declaration is left out of the model.
//!
//! # Design
//!
//! - `Diagnostic`: single finding with a primary span and optional secondary labels
//! - `DiagnosticKind`: what went wrong, grouped by the resolver that detects it
//! - `Severity`: note, warning or error; only errors block emission
//! - `DiagnosticFormatter`: renders diagnostics with source snippets
//!
//! # Examples
//!
//! ```
//! # use metrology_resolve::error::*;
//! # use metrology_foundation::Span;
//! let span = Span::new(0, 12, 16, 1);
//! let diagnostic = Diagnostic::new(
//!     DiagnosticKind::DuplicateUnitDerivationId,
//!     span,
//!     "derivation ID 'id' is already used by UnitOfSpeed".to_string(),
//! );
//! assert!(diagnostic.is_blocking());
//! ```

use metrology_foundation::{SourceMap, Span, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution diagnostic with source location and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Category of this diagnostic
    pub kind: DiagnosticKind,
    /// Severity level
    pub severity: Severity,
    /// Primary source location
    pub span: Span,
    /// Primary message
    pub message: String,
    /// Type whose declaration is at fault
    pub owner: Option<TypeId>,
    /// Position of the offending declaration in the input
    pub declaration: Option<usize>,
    /// Additional labeled spans
    pub labels: Vec<Label>,
    /// Additional notes or hints
    pub notes: Vec<String>,
}

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticKind {
    // Declaration intake
    /// A type carries more than one quantity or unit declaration
    TypeAlreadyDefined,
    /// A unit was expected but the type is not a declared unit
    TypeNotUnit,
    /// A quantity was expected but the type is declared as something else
    TypeNotQuantity,
    /// A quantity was expected but the type is not declared at all
    UnrecognizedQuantity,
    /// A quantity declares more than one filter
    DuplicateFilter,

    // Unit derivations
    /// Unit declares several derivations and this one has no ID
    MultipleDerivationsButNotNamed,
    DuplicateUnitDerivationId,
    DuplicateUnitDerivationSignature,
    /// Expression placeholders or produced dimension do not fit the signature
    UnmatchedDerivationExpressionUnit,
    /// Expression is missing or does not parse
    MalformedDerivationExpression,
    UnitWithBiasTermCannotBeDerived,
    /// Permutations requested for a signature with a single ordering
    DerivationPermutationsRedundant,
    /// Permutations requested for a signature too long to expand
    DerivationPermutationsLimited,

    // Unit instances
    UnrecognizedUnitName,
    UnrecognizedUnitDerivationId,
    IncompatibleDerivedUnitListSize,
    UnitNotDerivable,
    InvalidUnitName,
    DuplicateUnitName,
    InvalidScaledUnitExpression,
    InvalidBiasedUnitExpression,
    UnitNotIncludingBiasTerm,

    // Quantity relationships
    /// Operand or result arities do not fit the relationship
    InvalidQuantityOperation,
    DuplicateQuantityOperation,
    DuplicateMemberName,
    InvalidMemberName,
    InvalidProcessExpression,
    /// Mirrored name on a relationship that has no distinct mirror
    MirrorNotApplicable,
    /// Name given for an implementation that is switched off
    NameSpecifiedForDisabledImplementation,
    QuantityConvertibleToSelf,

    // Constants
    DuplicateConstantName,
    ConstantSharesNameWithUnit,
    InvalidConstantValue,

    // Specialization
    CyclicSpecialization,

    // Unit filters
    /// Filter without a stacking mode and no configured default
    MissingStackingMode,
    InclusionHadNoEffect,
    UnionInclusionRedundant,
}

impl DiagnosticKind {
    /// Returns a human-readable name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::TypeAlreadyDefined => "type already defined",
            DiagnosticKind::TypeNotUnit => "type is not a unit",
            DiagnosticKind::TypeNotQuantity => "type is not a quantity",
            DiagnosticKind::UnrecognizedQuantity => "unrecognized quantity",
            DiagnosticKind::DuplicateFilter => "duplicate unit filter",
            DiagnosticKind::MultipleDerivationsButNotNamed => "unnamed unit derivation",
            DiagnosticKind::DuplicateUnitDerivationId => "duplicate unit derivation ID",
            DiagnosticKind::DuplicateUnitDerivationSignature => {
                "duplicate unit derivation signature"
            }
            DiagnosticKind::UnmatchedDerivationExpressionUnit => {
                "unmatched derivation expression unit"
            }
            DiagnosticKind::MalformedDerivationExpression => "malformed derivation expression",
            DiagnosticKind::UnitWithBiasTermCannotBeDerived => {
                "unit with bias term cannot be derived"
            }
            DiagnosticKind::DerivationPermutationsRedundant => "redundant derivation permutations",
            DiagnosticKind::DerivationPermutationsLimited => "derivation permutations not expanded",
            DiagnosticKind::UnrecognizedUnitName => "unrecognized unit name",
            DiagnosticKind::UnrecognizedUnitDerivationId => "unrecognized unit derivation ID",
            DiagnosticKind::IncompatibleDerivedUnitListSize => {
                "incompatible derived unit list size"
            }
            DiagnosticKind::UnitNotDerivable => "unit not derivable",
            DiagnosticKind::InvalidUnitName => "invalid unit name",
            DiagnosticKind::DuplicateUnitName => "duplicate unit name",
            DiagnosticKind::InvalidScaledUnitExpression => "invalid scaled unit expression",
            DiagnosticKind::InvalidBiasedUnitExpression => "invalid biased unit expression",
            DiagnosticKind::UnitNotIncludingBiasTerm => "unit does not include a bias term",
            DiagnosticKind::InvalidQuantityOperation => "invalid quantity operation",
            DiagnosticKind::DuplicateQuantityOperation => "duplicate quantity operation",
            DiagnosticKind::DuplicateMemberName => "duplicate member name",
            DiagnosticKind::InvalidMemberName => "invalid member name",
            DiagnosticKind::InvalidProcessExpression => "invalid process expression",
            DiagnosticKind::MirrorNotApplicable => "mirror not applicable",
            DiagnosticKind::NameSpecifiedForDisabledImplementation => {
                "name specified for disabled implementation"
            }
            DiagnosticKind::QuantityConvertibleToSelf => "quantity convertible to itself",
            DiagnosticKind::DuplicateConstantName => "duplicate constant name",
            DiagnosticKind::ConstantSharesNameWithUnit => "constant shares name with unit",
            DiagnosticKind::InvalidConstantValue => "invalid constant value",
            DiagnosticKind::CyclicSpecialization => "cyclic specialization",
            DiagnosticKind::MissingStackingMode => "missing stacking mode",
            DiagnosticKind::InclusionHadNoEffect => "inclusion or exclusion had no effect",
            DiagnosticKind::UnionInclusionRedundant => "union inclusion redundant",
        }
    }

    /// Severity a diagnostic of this kind is reported with.
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::DerivationPermutationsRedundant
            | DiagnosticKind::DerivationPermutationsLimited
            | DiagnosticKind::MirrorNotApplicable
            | DiagnosticKind::NameSpecifiedForDisabledImplementation
            | DiagnosticKind::QuantityConvertibleToSelf
            | DiagnosticKind::CyclicSpecialization
            | DiagnosticKind::InclusionHadNoEffect
            | DiagnosticKind::UnionInclusionRedundant => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational note
    Note,
    /// Declaration kept or ignored without effect on other declarations
    Warning,
    /// Declaration excluded from the model
    Error,
}

/// Secondary labeled span in a diagnostic, e.g. "first declared here".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Source location
    pub span: Span,
    /// Label text
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic with the kind's default severity.
    ///
    /// # Parameters
    ///
    /// * `kind` - Diagnostic category
    /// * `span` - Primary source location
    /// * `message` - Human-readable message
    pub fn new(kind: DiagnosticKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, kind.default_severity(), span, message)
    }

    /// Creates a warning regardless of the kind's default severity.
    pub fn warning(kind: DiagnosticKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, span, message)
    }

    /// Creates a note diagnostic.
    pub fn note(kind: DiagnosticKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Note, span, message)
    }

    fn with_severity(kind: DiagnosticKind, severity: Severity, span: Span, message: String) -> Self {
        Self {
            kind,
            severity,
            span,
            message,
            owner: None,
            declaration: None,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Attributes the diagnostic to a declaration of `owner`.
    ///
    /// # Returns
    ///
    /// Self (for chaining).
    pub fn with_origin(mut self, owner: &TypeId, declaration: usize) -> Self {
        self.owner = Some(owner.clone());
        self.declaration = Some(declaration);
        self
    }

    /// Adds a secondary labeled span.
    pub fn with_label(mut self, span: Span, message: String) -> Self {
        self.labels.push(Label { span, message });
        self
    }

    /// Adds a note or hint.
    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    /// Whether this diagnostic prevents emission for its owner.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.kind.name(), self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Formats diagnostics with source code context.
///
/// Spans that do not point into the source map are rendered without a
/// location, so diagnostics stay printable when the caller has no
/// sources at hand.
///
/// # Examples
///
/// ```
/// # use metrology_resolve::error::*;
/// # use metrology_foundation::{Span, SourceMap};
/// # use std::path::PathBuf;
/// let mut sources = SourceMap::new();
/// let file_id = sources.add_file(PathBuf::from("Speed.cs"), "[Derivation(\"id\")]".to_string());
/// let span = Span::new(file_id, 12, 16, 1);
///
/// let diagnostic = Diagnostic::new(
///     DiagnosticKind::DuplicateUnitDerivationId,
///     span,
///     "derivation ID 'id' is already used".to_string(),
/// );
///
/// let formatted = DiagnosticFormatter::new(&sources).format(&diagnostic);
/// assert!(formatted.contains("Speed.cs:1:13"));
/// ```
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    /// Creates a new diagnostic formatter.
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    /// Formats a diagnostic as a string with source context.
    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut output = format!(
            "{}: {}: {}\n",
            diagnostic.severity,
            diagnostic.kind.name(),
            diagnostic.message
        );

        if let (Some(file), Some((line, col))) = (
            self.sources.file(&diagnostic.span),
            self.sources.line_col(&diagnostic.span),
        ) {
            output.push_str(&format!("  --> {}:{}:{}\n", file.path.display(), line, col));

            if let Some(source_line) = file.line_text(line) {
                output.push_str("   |\n");
                output.push_str(&format!("{:3} | {}\n", line, source_line));

                let start_col = col as usize;
                let span_len = diagnostic.span.len() as usize;
                let end_col = (start_col + span_len).min(source_line.len() + 1);
                let underline = " ".repeat(start_col.saturating_sub(1))
                    + &"^".repeat(end_col.saturating_sub(start_col).max(1));
                output.push_str(&format!("   | {}\n", underline));
            }
        } else if let Some(owner) = &diagnostic.owner {
            output.push_str(&format!("  --> {}\n", owner));
        }

        for label in &diagnostic.labels {
            output.push_str(&format!("   = note: {}\n", label.message));
            if let (Some(path), Some((line, col))) = (
                self.sources.file_path(&label.span),
                self.sources.line_col(&label.span),
            ) {
                output.push_str(&format!("     at {}:{}:{}\n", path.display(), line, col));
            }
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("   = help: {}\n", note));
        }

        output
    }

    /// Formats multiple diagnostics separated by blank lines.
    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.format(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dummy_span() -> Span {
        Span::new(0, 0, 5, 1)
    }

    fn test_sources() -> SourceMap {
        let mut sources = SourceMap::new();
        sources.add_file(
            PathBuf::from("UnitOfSpeed.cs"),
            "[Derivation(\"id\", \"{0} / {1}\")]\n[Derivation(\"id\", \"{0} / {1}\")]".to_string(),
        );
        sources
    }

    #[test]
    fn test_default_severity() {
        let err = Diagnostic::new(
            DiagnosticKind::UnitNotDerivable,
            dummy_span(),
            "UnitOfLength has no derivations".to_string(),
        );
        assert_eq!(err.severity, Severity::Error);
        assert!(err.is_blocking());

        let warn = Diagnostic::new(
            DiagnosticKind::InclusionHadNoEffect,
            dummy_span(),
            "'Metre' is already included".to_string(),
        );
        assert_eq!(warn.severity, Severity::Warning);
        assert!(!warn.is_blocking());
    }

    #[test]
    fn test_explicit_severity() {
        let warn = Diagnostic::warning(
            DiagnosticKind::UnitNotDerivable,
            dummy_span(),
            "downgraded".to_string(),
        );
        assert_eq!(warn.severity, Severity::Warning);

        let note = Diagnostic::note(
            DiagnosticKind::UnitNotDerivable,
            dummy_span(),
            "fyi".to_string(),
        );
        assert_eq!(note.severity, Severity::Note);
    }

    #[test]
    fn test_builder_chaining() {
        let owner = TypeId::from("UnitOfSpeed");
        let err = Diagnostic::new(
            DiagnosticKind::DuplicateUnitDerivationId,
            dummy_span(),
            "duplicate derivation ID 'id'".to_string(),
        )
        .with_origin(&owner, 3)
        .with_label(dummy_span(), "first declared here".to_string())
        .with_note("derivation IDs must be unique per unit".to_string());

        assert_eq!(err.owner, Some(owner));
        assert_eq!(err.declaration, Some(3));
        assert_eq!(err.labels.len(), 1);
        assert_eq!(err.notes.len(), 1);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_display() {
        let err = Diagnostic::new(
            DiagnosticKind::IncompatibleDerivedUnitListSize,
            dummy_span(),
            "expected 2 units, found 1".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "error: incompatible derived unit list size: expected 2 units, found 1"
        );
    }

    #[test]
    fn test_formatter_with_location() {
        let sources = test_sources();
        let err = Diagnostic::new(
            DiagnosticKind::DuplicateUnitDerivationId,
            Span::new(0, 44, 48, 2),
            "derivation ID 'id' is already used".to_string(),
        )
        .with_label(Span::new(0, 12, 16, 1), "first declared here".to_string());

        let formatted = DiagnosticFormatter::new(&sources).format(&err);
        assert!(formatted.contains("duplicate unit derivation ID"));
        assert!(formatted.contains("UnitOfSpeed.cs:2:13"));
        assert!(formatted.contains("^^^^"));
        assert!(formatted.contains("first declared here"));
        assert!(formatted.contains("UnitOfSpeed.cs:1:13"));
    }

    #[test]
    fn test_formatter_without_sources_falls_back_to_owner() {
        let sources = SourceMap::new();
        let err = Diagnostic::new(
            DiagnosticKind::UnitNotDerivable,
            Span::new(4, 0, 1, 1),
            "no derivations".to_string(),
        )
        .with_origin(&TypeId::from("UnitOfLength"), 0)
        .with_note("declare a derivation first".to_string());

        let formatted = DiagnosticFormatter::new(&sources).format(&err);
        assert!(formatted.contains("--> UnitOfLength"));
        assert!(formatted.contains("help: declare a derivation first"));
    }

    #[test]
    fn test_format_all() {
        let sources = test_sources();
        let diagnostics = vec![
            Diagnostic::new(
                DiagnosticKind::InvalidUnitName,
                dummy_span(),
                "first".to_string(),
            ),
            Diagnostic::new(
                DiagnosticKind::InvalidUnitName,
                dummy_span(),
                "second".to_string(),
            ),
        ];
        let formatted = DiagnosticFormatter::new(&sources).format_all(&diagnostics);
        assert!(formatted.contains("first"));
        assert!(formatted.contains("second"));
    }
}
