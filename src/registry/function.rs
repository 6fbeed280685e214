//! Function registry
//!
//! Built-ins are declared with a [`FunctionSignature`] (name, arity bounds,
//! parameter kinds, return type) and registered either as *eager* functions
//! receiving evaluated argument collections, or as *lazy* functions
//! receiving compiled expression thunks they re-enter per item with
//! `$this`/`$index`/`$total` bound. The registry owns both forms behind one
//! lookup.

use crate::compiler::CompiledNode;
use crate::evaluator::context::EvaluationContext;
use crate::evaluator::error::{EvaluationError, EvaluationResult};
use crate::model::{Cardinality, Collection, FhirPathType};
use crate::parser::span::Span;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for eager function evaluation
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Errors raised by built-in functions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// Wrong number of arguments
    #[error("function '{name}' expects {min}..{} arguments, got {actual}", max.map_or("*".to_string(), |n| n.to_string()))]
    InvalidArity {
        /// Function name
        name: String,
        /// Minimum arguments
        min: usize,
        /// Maximum arguments, `None` for unbounded
        max: Option<usize>,
        /// Arguments provided
        actual: usize,
    },

    /// Argument of an unusable type or value
    #[error("function '{name}' argument {index}: {message}")]
    InvalidArgument {
        /// Function name
        name: String,
        /// Zero-based argument position
        index: usize,
        /// What went wrong
        message: String,
    },

    /// Input collection the function cannot work on
    #[error("function '{name}': {message}")]
    InvalidInput {
        /// Function name
        name: String,
        /// What went wrong
        message: String,
    },

    /// Any other evaluation failure
    #[error("function '{name}': {message}")]
    Evaluation {
        /// Function name
        name: String,
        /// What went wrong
        message: String,
    },
}

impl FunctionError {
    /// Attach a call-site span, producing an evaluation error
    pub fn at(self, span: Span) -> EvaluationError {
        EvaluationError::Function { source: self, span }
    }
}

/// How an argument is handled at the call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Evaluated once in the caller's context before the call
    Value,
    /// Compiled to a thunk the function runs per item
    Expression,
    /// A type name written in place, extracted from the AST
    TypeSpecifier,
}

/// Declarative metadata for one built-in
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Function name
    pub name: &'static str,
    /// Minimum number of arguments
    pub min_arity: usize,
    /// Maximum number of arguments; `None` for unbounded
    pub max_arity: Option<usize>,
    /// Kind of each declarable parameter
    pub parameters: Vec<ParameterKind>,
    /// Static return type, for the typed pipeline
    pub return_type: FhirPathType,
    /// Static return cardinality, for the typed pipeline
    pub return_cardinality: Cardinality,
}

impl FunctionSignature {
    /// Signature of a function taking no arguments
    pub fn nullary(name: &'static str, return_type: FhirPathType) -> Self {
        Self {
            name,
            min_arity: 0,
            max_arity: Some(0),
            parameters: Vec::new(),
            return_type,
            return_cardinality: Cardinality::Many,
        }
    }

    /// Signature with fixed value parameters
    pub fn values(name: &'static str, count: usize, return_type: FhirPathType) -> Self {
        Self {
            name,
            min_arity: count,
            max_arity: Some(count),
            parameters: vec![ParameterKind::Value; count],
            return_type,
            return_cardinality: Cardinality::Many,
        }
    }

    /// Signature with `min..=max` value parameters
    pub fn optional_values(
        name: &'static str,
        min: usize,
        max: usize,
        return_type: FhirPathType,
    ) -> Self {
        Self {
            name,
            min_arity: min,
            max_arity: Some(max),
            parameters: vec![ParameterKind::Value; max],
            return_type,
            return_cardinality: Cardinality::Many,
        }
    }

    /// Signature with expression parameters
    pub fn expressions(name: &'static str, min: usize, max: usize, return_type: FhirPathType) -> Self {
        Self {
            name,
            min_arity: min,
            max_arity: Some(max),
            parameters: vec![ParameterKind::Expression; max],
            return_type,
            return_cardinality: Cardinality::Many,
        }
    }

    /// Override the declared return cardinality
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.return_cardinality = cardinality;
        self
    }

    /// Check an argument count against the arity bounds
    pub fn check_arity(&self, actual: usize) -> FunctionResult<()> {
        let too_few = actual < self.min_arity;
        let too_many = self.max_arity.is_some_and(|max| actual > max);
        if too_few || too_many {
            return Err(FunctionError::InvalidArity {
                name: self.name.to_string(),
                min: self.min_arity,
                max: self.max_arity,
                actual,
            });
        }
        Ok(())
    }
}

/// Call-site information handed to every built-in
pub struct FunctionContext<'a> {
    /// The runtime context of the caller
    pub context: &'a EvaluationContext,
    /// The invocation base (the collection left of the dot)
    pub input: &'a Collection,
    /// Span of the call, for error reporting
    pub span: Span,
}

/// Eager built-in: arguments arrive evaluated
pub type EagerFn =
    dyn Fn(&FunctionContext<'_>, &[Collection]) -> FunctionResult<Collection> + Send + Sync;

/// Lazy built-in: arguments arrive as compiled thunks
pub type LazyFn =
    dyn Fn(&FunctionContext<'_>, &[CompiledNode]) -> EvaluationResult<Collection> + Send + Sync;

/// A registered function, eager or lazy
#[derive(Clone)]
pub enum FunctionImpl {
    /// Evaluates already-computed argument collections
    Eager(Arc<EagerFn>),
    /// Re-enters the evaluator through compiled argument thunks
    Lazy(Arc<LazyFn>),
}

/// One registry entry: signature plus implementation
#[derive(Clone)]
pub struct FunctionEntry {
    /// Declarative metadata
    pub signature: FunctionSignature,
    /// The implementation
    pub implementation: FunctionImpl,
}

impl std::fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.signature.name)
            .field(
                "kind",
                &match self.implementation {
                    FunctionImpl::Eager(_) => "eager",
                    FunctionImpl::Lazy(_) => "lazy",
                },
            )
            .finish()
    }
}

/// Registry of built-in (and caller-registered) functions
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<&'static str, FunctionEntry>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in registered
    pub fn standard() -> Self {
        let mut registry = Self::new();
        super::functions::register_all(&mut registry);
        registry
    }

    /// Register an eager function
    pub fn register_eager<F>(&mut self, signature: FunctionSignature, function: F)
    where
        F: Fn(&FunctionContext<'_>, &[Collection]) -> FunctionResult<Collection>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(
            signature.name,
            FunctionEntry {
                signature,
                implementation: FunctionImpl::Eager(Arc::new(function)),
            },
        );
    }

    /// Register a lazy function
    pub fn register_lazy<F>(&mut self, signature: FunctionSignature, function: F)
    where
        F: Fn(&FunctionContext<'_>, &[CompiledNode]) -> EvaluationResult<Collection>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(
            signature.name,
            FunctionEntry {
                signature,
                implementation: FunctionImpl::Lazy(Arc::new(function)),
            },
        );
    }

    /// Look a function up by name
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    /// Whether the name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// All registered names, for diagnostics and suggestions
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_bounds() {
        let sig = FunctionSignature::optional_values("substring", 1, 2, FhirPathType::String);
        assert!(sig.check_arity(1).is_ok());
        assert!(sig.check_arity(2).is_ok());
        assert!(matches!(
            sig.check_arity(0),
            Err(FunctionError::InvalidArity { .. })
        ));
        assert!(sig.check_arity(3).is_err());
    }

    #[test]
    fn test_standard_registry_has_core_functions() {
        let registry = FunctionRegistry::standard();
        for name in [
            "exists", "empty", "not", "where", "select", "first", "count", "distinct",
            "toInteger", "substring", "abs", "now", "children", "defineVariable", "trace",
            "iif", "aggregate", "repeat",
        ] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
    }
}
