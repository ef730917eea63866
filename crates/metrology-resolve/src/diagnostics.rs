//! Additive sink for diagnostics of one resolution pass.

use crate::error::{Diagnostic, DiagnosticKind, Severity};
use metrology_foundation::TypeId;
use std::collections::BTreeSet;

/// Accumulates diagnostics in the order they are reported.
///
/// Nothing is ever removed or reordered; the pipeline controls the order
/// in which stage results are appended, which keeps the final list
/// identical across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Whether any blocking diagnostic was reported.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_blocking)
    }

    /// Number of diagnostics of `kind`.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    /// Types with at least one blocking diagnostic attributed to them.
    pub fn blocking_owners(&self) -> BTreeSet<&TypeId> {
        self.items
            .iter()
            .filter(|d| d.is_blocking())
            .filter_map(|d| d.owner.as_ref())
            .collect()
    }

    /// Raises every warning to an error.
    pub fn promote_warnings(&mut self) {
        for diagnostic in &mut self.items {
            if diagnostic.severity == Severity::Warning {
                diagnostic.severity = Severity::Error;
            }
        }
    }

    /// Hands out the collected diagnostics.
    pub fn collect(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrology_foundation::Span;

    fn diagnostic(kind: DiagnosticKind, owner: &str) -> Diagnostic {
        Diagnostic::new(kind, Span::default(), format!("{kind} on {owner}"))
            .with_origin(&TypeId::from(owner), 0)
    }

    #[test]
    fn test_preserves_report_order() {
        let mut sink = Diagnostics::new();
        sink.push(diagnostic(DiagnosticKind::InvalidUnitName, "UnitOfLength"));
        sink.extend(vec![
            diagnostic(DiagnosticKind::UnitNotDerivable, "UnitOfTime"),
            diagnostic(DiagnosticKind::InvalidUnitName, "UnitOfMass"),
        ]);

        let owners: Vec<String> = sink
            .collect()
            .into_iter()
            .filter_map(|d| d.owner.map(|o| o.to_string()))
            .collect();
        assert_eq!(owners, vec!["UnitOfLength", "UnitOfTime", "UnitOfMass"]);
    }

    #[test]
    fn test_counts_and_blocking_owners() {
        let mut sink = Diagnostics::new();
        sink.push(diagnostic(DiagnosticKind::InvalidUnitName, "UnitOfLength"));
        sink.push(diagnostic(DiagnosticKind::InclusionHadNoEffect, "Length"));

        assert_eq!(sink.count(DiagnosticKind::InvalidUnitName), 1);
        assert!(sink.has_errors());
        let owners = sink.blocking_owners();
        assert_eq!(owners.len(), 1);
        assert!(owners.contains(&TypeId::from("UnitOfLength")));
    }

    #[test]
    fn test_promote_warnings() {
        let mut sink = Diagnostics::new();
        sink.push(diagnostic(DiagnosticKind::InclusionHadNoEffect, "Length"));
        assert!(!sink.has_errors());
        sink.promote_warnings();
        assert!(sink.has_errors());
    }
}
