//! Values tagged with the source location they were parsed from.

use metrology_foundation::Span;
use serde::{Deserialize, Deserializer, Serialize};

/// A declaration argument together with its source location.
///
/// Diagnostics about a single argument (a duplicate derivation ID, an
/// unknown unit name) point at the argument's span rather than at the
/// whole declaration.
///
/// On input the span may be omitted: `"Metre"` and
/// `{"node": "Metre", "span": {...}}` both deserialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spanned<T> {
    /// The wrapped value.
    pub node: T,
    /// Where the value was written.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Creates a new spanned value.
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    /// Maps the wrapped value, keeping the span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }

    /// Borrows the wrapped value, keeping the span.
    pub fn as_ref(&self) -> Spanned<&T> {
        Spanned {
            node: &self.node,
            span: self.span,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpannedRepr<T> {
    Located {
        node: T,
        #[serde(default)]
        span: Span,
    },
    Bare(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Spanned<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SpannedRepr::deserialize(deserializer)? {
            SpannedRepr::Located { node, span } => Spanned { node, span },
            SpannedRepr::Bare(node) => Spanned {
                node,
                span: Span::default(),
            },
        })
    }
}
