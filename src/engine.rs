//! Engine façade: parse and compile caches wrapped around the registry
//!
//! The engine is the long-lived object; contexts are per-evaluation. Both
//! caches are safe to share across threads, so one engine can serve many
//! concurrent evaluations.

use crate::analyzer::{TypeInferencer, TypedCompilationResult, ValidationResult};
use crate::ast::ExpressionNode;
use crate::cache::{DEFAULT_CACHE_CAPACITY, ExpressionCache};
use crate::compiler::{CompileOptions, CompiledExpression, Compiler};
use crate::error::FhirPathError;
use crate::evaluator::EvaluationContext;
use crate::model::Collection;
use crate::parser;
use crate::registry::FunctionRegistry;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// FHIRPath engine: registry plus memoized parse/compile pipeline
pub struct FhirPathEngine {
    registry: Arc<FunctionRegistry>,
    parse_cache: ExpressionCache<ExpressionNode>,
    compile_cache: ExpressionCache<CompiledExpression>,
}

impl FhirPathEngine {
    /// Engine with the standard function library
    pub fn new() -> Self {
        Self::with_registry(Arc::new(FunctionRegistry::standard()))
    }

    /// Engine with a caller-assembled registry (custom functions included)
    pub fn with_registry(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            parse_cache: ExpressionCache::new(DEFAULT_CACHE_CAPACITY),
            compile_cache: ExpressionCache::new(DEFAULT_CACHE_CAPACITY),
        }
    }

    /// The function registry this engine resolves against
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Parse an expression, reusing the cached AST when permitted
    pub fn parse(&self, source: &str, use_cache: bool) -> Result<Arc<ExpressionNode>, FhirPathError> {
        if use_cache {
            if let Some(ast) = self.parse_cache.get(source) {
                log::trace!("parse cache hit for {source:?}");
                return Ok(ast);
            }
        }
        let ast = Arc::new(parser::parse(source)?);
        if use_cache {
            self.parse_cache.put(source.to_string(), Arc::clone(&ast));
        }
        Ok(ast)
    }

    /// Compile an expression, reusing the cached tree when the options
    /// match
    pub fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<Arc<CompiledExpression>, FhirPathError> {
        let key = format!(
            "{}{}{}",
            if options.allow_unknown_functions { "u" } else { "-" },
            if options.constant_folding { "f" } else { "-" },
            source
        );
        if let Some(compiled) = self.compile_cache.get(&key) {
            log::trace!("compile cache hit for {source:?}");
            return Ok(compiled);
        }
        let ast = self.parse(source, true)?;
        let compiled = Arc::new(self.compile_ast(&ast, options)?);
        self.compile_cache.put(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Compile an already-parsed AST; not cached
    pub fn compile_ast(
        &self,
        ast: &ExpressionNode,
        options: &CompileOptions,
    ) -> Result<CompiledExpression, FhirPathError> {
        let compiler = Compiler::new(Arc::clone(&self.registry), options.clone());
        Ok(compiler.compile(ast)?)
    }

    /// Parse, compile and run an expression against JSON-shaped data
    pub fn evaluate(
        &self,
        ctx: &EvaluationContext,
        expression: &str,
        data: &JsonValue,
    ) -> Result<Collection, FhirPathError> {
        let options = CompileOptions {
            allow_unknown_functions: ctx.config.allow_unknown_functions,
            ..CompileOptions::default()
        };
        let compiled = self.compile(expression, &options)?;
        self.evaluate_compiled(ctx, &compiled, data)
    }

    /// Run an already-compiled expression against JSON-shaped data
    pub fn evaluate_compiled(
        &self,
        ctx: &EvaluationContext,
        compiled: &CompiledExpression,
        data: &JsonValue,
    ) -> Result<Collection, FhirPathError> {
        let root = Collection::from_json(data);
        let mut run = ctx.clone();
        run.input = root.share();
        run.root = root;
        Ok(compiled.evaluate(&run)?)
    }

    /// The typed pipeline: parse, infer, validate, then compile when no
    /// error diagnostic survived
    pub fn typed_compile(
        &self,
        source: &str,
        ctx: &EvaluationContext,
    ) -> Result<TypedCompilationResult, FhirPathError> {
        let ast = self.parse(source, true)?;
        let inferencer = TypeInferencer::new(
            ctx.model.clone(),
            Arc::clone(&self.registry),
            ctx.config.root_type.clone(),
        );
        let (typed, diagnostics) = inferencer.infer(&ast);

        let has_errors = diagnostics
            .iter()
            .any(|d| d.severity == crate::diagnostics::Severity::Error);
        let compiled = if has_errors {
            None
        } else {
            let options = CompileOptions {
                allow_unknown_functions: ctx.config.allow_unknown_functions,
                ..CompileOptions::default()
            };
            Some(Arc::new(self.compile_ast(&ast, &options)?))
        };

        Ok(TypedCompilationResult {
            compiled,
            typed: Some(typed),
            diagnostics,
        })
    }

    /// Static checking only: parse and infer, reporting errors and warnings
    pub fn validate(
        &self,
        source: &str,
        ctx: &EvaluationContext,
    ) -> Result<ValidationResult, FhirPathError> {
        let ast = self.parse(source, true)?;
        let inferencer = TypeInferencer::new(
            ctx.model.clone(),
            Arc::clone(&self.registry),
            ctx.config.root_type.clone(),
        );
        let (_, diagnostics) = inferencer.infer(&ast);
        Ok(ValidationResult::from_diagnostics(diagnostics))
    }

    /// Empty both caches
    pub fn clear_cache(&self) {
        self.parse_cache.clear();
        self.compile_cache.clear();
    }
}

impl Default for FhirPathEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use serde_json::json;

    #[test]
    fn test_cache_transparency() {
        let engine = FhirPathEngine::new();
        let ctx = EvaluationContext::new();
        let data = json!({ "age": 30 });

        let cold = engine.evaluate(&ctx, "age + 1", &data).unwrap();
        let warm = engine.evaluate(&ctx, "age + 1", &data).unwrap();
        assert_eq!(cold.to_vec(), warm.to_vec());
        assert_eq!(cold.to_vec(), vec![Value::Integer(31)]);

        engine.clear_cache();
        let cleared = engine.evaluate(&ctx, "age + 1", &data).unwrap();
        assert_eq!(cleared.to_vec(), cold.to_vec());
    }

    #[test]
    fn test_parse_cache_reuses_ast() {
        let engine = FhirPathEngine::new();
        let first = engine.parse("a.b.c", true).unwrap();
        let second = engine.parse("a.b.c", true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let uncached = engine.parse("a.b.c", false).unwrap();
        assert!(!Arc::ptr_eq(&first, &uncached));
    }
}
