//! Runtime error types

use crate::model::ModelError;
use crate::parser::span::Span;
use crate::registry::function::FunctionError;
use thiserror::Error;

/// Result type for evaluation
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Errors raised while executing a compiled expression
///
/// Every variant carries the span of the AST subtree responsible, so the
/// caller can point back into the source expression.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// A built-in function rejected its input or arguments
    #[error("{source}")]
    Function {
        /// The underlying function error
        #[source]
        source: FunctionError,
        /// Call site
        span: Span,
    },

    /// Division or modulo by zero
    #[error("division by zero")]
    DivisionByZero {
        /// The offending operation
        span: Span,
    },

    /// An operator needed a single value and got a larger collection
    #[error("'{operator}' requires a single value on the {side} side, got {count} items")]
    SingletonRequired {
        /// Operator symbol
        operator: &'static str,
        /// "left" or "right"
        side: &'static str,
        /// Observed collection size
        count: usize,
        /// The offending operand
        span: Span,
    },

    /// Operand types an operator has no rule for
    #[error("'{operator}' cannot be applied to {left} and {right}")]
    IncompatibleOperands {
        /// Operator symbol
        operator: &'static str,
        /// Left operand type
        left: String,
        /// Right operand type
        right: String,
        /// The offending operation
        span: Span,
    },

    /// Value of the wrong type where a specific type was needed
    #[error("expected {expected}, got {actual}")]
    TypeError {
        /// What was needed
        expected: String,
        /// What was found
        actual: String,
        /// Where
        span: Span,
    },

    /// Function name not present in the registry at runtime
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// The name
        name: String,
        /// Call site
        span: Span,
    },

    /// Strict mode: identifier resolved to nothing
    #[error("unknown identifier '{name}'")]
    UnknownIdentifier {
        /// The name
        name: String,
        /// Where
        span: Span,
    },

    /// `$`- or `%`-variable with no binding
    #[error("unknown variable '{name}'")]
    UnknownVariable {
        /// The name, sigil included
        name: String,
        /// Where
        span: Span,
    },

    /// `defineVariable` rebinding a name visible in the same chain
    #[error("variable '{name}' is already defined")]
    VariableAlreadyDefined {
        /// The name
        name: String,
        /// The rebinding call
        span: Span,
    },

    /// Pattern the regex engine rejected
    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// The pattern
        pattern: String,
        /// Engine message
        message: String,
        /// Where
        span: Span,
    },

    /// Literal that failed to decode at evaluation time
    #[error("invalid {kind} literal '{text}'")]
    InvalidLiteral {
        /// Literal kind ("decimal", "date", …)
        kind: &'static str,
        /// Source text
        text: String,
        /// Where
        span: Span,
    },

    /// `repeat` (or `descendants`) ran past the configured bound
    #[error("repeat exceeded {limit} iterations")]
    RepeatLimitExceeded {
        /// The configured bound
        limit: usize,
        /// The looping call
        span: Span,
    },

    /// Model provider failure, cause preserved
    #[error("{source}")]
    Model {
        /// The provider error
        #[source]
        source: ModelError,
        /// The operation that consulted the provider
        span: Span,
    },

    /// Anything else, described in prose
    #[error("{message}")]
    InvalidOperation {
        /// Description
        message: String,
        /// Where
        span: Span,
    },
}

impl EvaluationError {
    /// Span of the AST subtree responsible
    pub fn span(&self) -> Span {
        match self {
            Self::Function { span, .. }
            | Self::DivisionByZero { span }
            | Self::SingletonRequired { span, .. }
            | Self::IncompatibleOperands { span, .. }
            | Self::TypeError { span, .. }
            | Self::UnknownFunction { span, .. }
            | Self::UnknownIdentifier { span, .. }
            | Self::UnknownVariable { span, .. }
            | Self::VariableAlreadyDefined { span, .. }
            | Self::InvalidRegex { span, .. }
            | Self::InvalidLiteral { span, .. }
            | Self::RepeatLimitExceeded { span, .. }
            | Self::Model { span, .. }
            | Self::InvalidOperation { span, .. } => *span,
        }
    }

    /// Short classification used as the first line of formatted output
    pub fn kind(&self) -> &'static str {
        "evaluation error"
    }
}
