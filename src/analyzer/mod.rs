//! Typed pipeline: type inference and semantic validation
//!
//! Only engaged when the caller supplies a model provider (and usually a
//! root type). The inference walk annotates every AST node with a type from
//! the lattice and a cardinality; validation turns impossible operand
//! combinations into diagnostics. Compilation proceeds only when no error
//! survives, mirroring the convert → infer → validate → compile pipeline.

pub mod infer;

use crate::ast::ExpressionNode;
use crate::compiler::CompiledExpression;
use crate::diagnostics::{Diagnostic, Severity};
use crate::model::{Cardinality, FhirPathType};
use crate::parser::span::Span;
use std::sync::Arc;

pub use infer::TypeInferencer;

/// One AST node's inferred typing, mirrored over the expression tree
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpression {
    /// Inferred type
    pub ty: FhirPathType,
    /// Inferred cardinality
    pub cardinality: Cardinality,
    /// The node's source span
    pub span: Span,
    /// Children in AST order
    pub children: Vec<TypedExpression>,
}

impl TypedExpression {
    pub(crate) fn leaf(ty: FhirPathType, cardinality: Cardinality, span: Span) -> Self {
        Self {
            ty,
            cardinality,
            span,
            children: Vec::new(),
        }
    }
}

/// Result of the typed pipeline
#[derive(Debug, Clone)]
pub struct TypedCompilationResult {
    /// The compiled tree, absent when an error diagnostic was produced
    pub compiled: Option<Arc<CompiledExpression>>,
    /// The typed overlay of the AST, when inference ran
    pub typed: Option<TypedExpression>,
    /// Errors and warnings from inference and validation
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of `validate`: the diagnostics split by severity
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Fatal findings
    pub errors: Vec<Diagnostic>,
    /// Non-fatal findings
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Split a diagnostic stream by severity
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let mut result = Self::default();
        for diagnostic in diagnostics {
            match diagnostic.severity {
                Severity::Error => result.errors.push(diagnostic),
                Severity::Warning => result.warnings.push(diagnostic),
            }
        }
        result
    }

    /// Whether validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Shorthand for running inference over a parsed expression
pub fn infer_types(
    ast: &ExpressionNode,
    inferencer: &TypeInferencer,
) -> (TypedExpression, Vec<Diagnostic>) {
    inferencer.infer(ast)
}
