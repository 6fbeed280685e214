//! An embeddable FHIRPath expression engine
//!
//! Tokenizer, precedence-climbing parser, closure-tree compiler and a
//! collection-oriented evaluator with FHIRPath's three-valued semantics,
//! behind an LRU-cached pipeline.
//!
//! ```
//! use serde_json::json;
//!
//! let ctx = fhirpath::create_context();
//! let patient = json!({
//!     "resourceType": "Patient",
//!     "name": [{ "use": "official", "given": ["John"] }]
//! });
//! let given = fhirpath::evaluate(&ctx, "Patient.name.where(use = 'official').given", &patient)
//!     .unwrap();
//! assert_eq!(given.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod analyzer;
pub mod ast;
pub mod cache;
pub mod compiler;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;

pub use analyzer::{TypedCompilationResult, ValidationResult};
pub use ast::{ExpressionNode, print_expression};
pub use compiler::{CompileError, CompileOptions, CompiledExpression};
pub use engine::FhirPathEngine;
pub use error::FhirPathError;
pub use evaluator::{EvaluationContext, EvaluationError};
pub use model::{Collection, EmptyModelProvider, ModelProvider, Value};
pub use parser::ParseError;
pub use registry::FunctionRegistry;

use serde_json::Value as JsonValue;
use std::sync::{Arc, LazyLock};

/// Process-wide engine behind the convenience functions
static ENGINE: LazyLock<FhirPathEngine> = LazyLock::new(FhirPathEngine::new);

/// Produce an empty runtime context to configure and reuse
pub fn create_context() -> EvaluationContext {
    EvaluationContext::new()
}

/// Parse an expression to its AST, using the shared parse cache
pub fn parse(source: &str, use_cache: bool) -> Result<Arc<ExpressionNode>, FhirPathError> {
    ENGINE.parse(source, use_cache)
}

/// Compile an expression, using the shared caches
pub fn compile(source: &str) -> Result<Arc<CompiledExpression>, FhirPathError> {
    ENGINE.compile(source, &CompileOptions::default())
}

/// Evaluate an expression against JSON-shaped data
pub fn evaluate(
    ctx: &EvaluationContext,
    expression: &str,
    data: &JsonValue,
) -> Result<Collection, FhirPathError> {
    ENGINE.evaluate(ctx, expression, data)
}

/// Run the typed pipeline: infer, validate, compile
pub fn typed_compile(
    source: &str,
    ctx: &EvaluationContext,
) -> Result<TypedCompilationResult, FhirPathError> {
    ENGINE.typed_compile(source, ctx)
}

/// Statically check an expression, returning errors and warnings
pub fn validate(
    source: &str,
    ctx: &EvaluationContext,
) -> Result<ValidationResult, FhirPathError> {
    ENGINE.validate(source, ctx)
}

/// Empty the shared parse and compile caches
pub fn clear_cache() {
    ENGINE.clear_cache();
}
