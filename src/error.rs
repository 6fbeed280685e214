//! Top-level error type and diagnostic conversion

use crate::compiler::CompileError;
use crate::diagnostics::Diagnostic;
use crate::evaluator::EvaluationError;
use crate::parser::ParseError;
use thiserror::Error;

/// Any failure an engine entry point can report
#[derive(Error, Debug)]
pub enum FhirPathError {
    /// Tokenizer or parser failure; fatal for the expression
    #[error("{}: {}", .0.kind(), .0)]
    Parse(#[from] ParseError),

    /// Compilation failure
    #[error("{}: {}", .0.kind(), .0)]
    Compile(#[from] CompileError),

    /// Runtime failure, with the span of the responsible subtree
    #[error("{}: {}", .0.kind(), .0)]
    Evaluation(#[from] EvaluationError),
}

impl FhirPathError {
    /// Convert to a position-annotated diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Parse(e) => Diagnostic::error(e.kind(), e.to_string(), e.span()),
            Self::Compile(e) => {
                let diagnostic = Diagnostic::error(e.kind(), e.to_string(), e.span());
                match e {
                    CompileError::UnknownFunction {
                        suggestion: Some(s),
                        ..
                    } => diagnostic.suggest(format!("did you mean '{s}'?")),
                    _ => diagnostic,
                }
            }
            Self::Evaluation(e) => Diagnostic::error(e.kind(), e.to_string(), e.span()),
        }
    }

    /// Render the diagnostic against the source expression: message line,
    /// source line, caret, suggestions
    pub fn display_with_source(&self, source: &str) -> String {
        self.to_diagnostic().display(source)
    }
}
