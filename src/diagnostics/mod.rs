//! Diagnostics for parse, compile and runtime errors
//!
//! A [`Diagnostic`] is a severity, a code, a message and a span, with
//! optional suggestions. The formatter renders `"<kind>: <message>"`, the
//! source line with a caret under the offending span, and suggestion
//! bullets. Messages never reference engine internals.

pub mod formatter;

use crate::parser::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use formatter::format_diagnostic;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Fatal for the expression
    Error,
    /// Worth reporting, evaluation can continue
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A position-annotated message with optional fix suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Short kind string ("parser error", "evaluation error", …)
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Offending span in the source expression
    pub span: Span,
    /// Suggested fixes, shown as bullets
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(kind: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            kind: kind.into(),
            message: message.into(),
            span,
            suggestions: Vec::new(),
        }
    }

    /// Create a warning diagnostic
    pub fn warning(kind: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            kind: kind.into(),
            message: message.into(),
            span,
            suggestions: Vec::new(),
        }
    }

    /// Attach a suggestion bullet
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Render against the source expression
    pub fn display(&self, source: &str) -> String {
        format_diagnostic(self, source)
    }
}
