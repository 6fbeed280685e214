//! Compiler: AST to closure tree
//!
//! Lowers an [`ExpressionNode`] into a tree of `Fn(&EvaluationContext) ->
//! EvaluationResult<Collection>` closures, each paired with its source span.
//! Function names resolve against the registry exactly once; literal-only
//! subtrees fold to constants; `and`/`or`/`implies` emit short-circuit
//! nodes; `defineVariable` threads its binding through the rest of the dot
//! chain it appears in.

use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use crate::evaluator::context::EvaluationContext;
use crate::evaluator::error::{EvaluationError, EvaluationResult};
use crate::evaluator::{navigate, operations};
use crate::model::{Collection, Date, DateTime, Quantity, Time, Value};
use crate::parser::span::Span;
use crate::registry::function::{
    FunctionContext, FunctionImpl, FunctionRegistry, ParameterKind,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Compile-time errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Function name missing from the registry (and runtime lookup not
    /// enabled)
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// The name
        name: String,
        /// Call site
        span: Span,
        /// A registered name that differs only in case, when one exists
        suggestion: Option<String>,
    },

    /// Argument count outside the declared arity
    #[error("function '{name}' expects {min}..{} arguments, got {actual}", max.map_or("*".to_string(), |n| n.to_string()))]
    WrongArity {
        /// Function name
        name: String,
        /// Minimum arity
        min: usize,
        /// Maximum arity, `None` for unbounded
        max: Option<usize>,
        /// Supplied argument count
        actual: usize,
        /// Call site
        span: Span,
    },

    /// Argument that must be a type name but is not one
    #[error("function '{name}' expects a type specifier")]
    InvalidTypeSpecifier {
        /// Function name
        name: String,
        /// The offending argument
        span: Span,
    },

    /// Literal that does not decode (for example `@2021-02-30`)
    #[error("invalid {kind} literal '{text}'")]
    InvalidLiteral {
        /// Literal kind
        kind: &'static str,
        /// Source text
        text: String,
        /// Where
        span: Span,
    },
}

impl CompileError {
    /// Span of the offending AST node
    pub fn span(&self) -> Span {
        match self {
            Self::UnknownFunction { span, .. }
            | Self::WrongArity { span, .. }
            | Self::InvalidTypeSpecifier { span, .. }
            | Self::InvalidLiteral { span, .. } => *span,
        }
    }

    /// Short classification used as the first line of formatted output
    pub fn kind(&self) -> &'static str {
        "compile error"
    }
}

type EvalFn = dyn Fn(&EvaluationContext) -> EvaluationResult<Collection> + Send + Sync;

/// One compiled node: an evaluation closure plus the span it came from
#[derive(Clone)]
pub struct CompiledNode {
    eval: Arc<EvalFn>,
    span: Span,
}

impl CompiledNode {
    fn new<F>(span: Span, eval: F) -> Self
    where
        F: Fn(&EvaluationContext) -> EvaluationResult<Collection> + Send + Sync + 'static,
    {
        Self {
            eval: Arc::new(eval),
            span,
        }
    }

    /// Constant node returning a fixed collection
    fn constant(span: Span, value: Collection) -> Self {
        Self::new(span, move |_| Ok(value.share()))
    }

    /// Execute against a context; the focus is `ctx.input`
    pub fn eval(&self, ctx: &EvaluationContext) -> EvaluationResult<Collection> {
        (self.eval)(ctx)
    }

    /// Source span of the node
    pub fn span(&self) -> Span {
        self.span
    }
}

impl std::fmt::Debug for CompiledNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledNode").field("span", &self.span).finish()
    }
}

/// A fully compiled expression, ready to run against any context
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    root: CompiledNode,
}

impl CompiledExpression {
    /// Execute against a prepared context (input already installed)
    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvaluationResult<Collection> {
        self.root.eval(ctx)
    }

    /// Span of the whole expression
    pub fn span(&self) -> Span {
        self.root.span()
    }
}

/// Compiler options
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Defer unknown function names to a runtime registry lookup instead of
    /// failing the compile
    pub allow_unknown_functions: bool,
    /// Fold literal-only subtrees at compile time
    pub constant_folding: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            allow_unknown_functions: false,
            constant_folding: true,
        }
    }
}

/// AST-to-closures compiler
pub struct Compiler {
    registry: Arc<FunctionRegistry>,
    options: CompileOptions,
}

/// A step in a flattened dot chain
enum ChainStep {
    /// Evaluate against the running collection
    Node(CompiledNode),
    /// Bind a variable visible to the steps that follow
    Define {
        name: CompiledNode,
        value: Option<CompiledNode>,
        span: Span,
    },
}

impl Compiler {
    /// Create a compiler over a function registry
    pub fn new(registry: Arc<FunctionRegistry>, options: CompileOptions) -> Self {
        Self { registry, options }
    }

    /// Compile an AST into an executable closure tree
    pub fn compile(&self, ast: &ExpressionNode) -> Result<CompiledExpression, CompileError> {
        Ok(CompiledExpression {
            root: self.compile_node(ast)?,
        })
    }

    fn compile_node(&self, node: &ExpressionNode) -> Result<CompiledNode, CompileError> {
        let compiled = match node {
            ExpressionNode::Literal { value, span } => self.compile_literal(value, *span)?,
            ExpressionNode::Identifier { name, span } => {
                let name = name.clone();
                let span = *span;
                CompiledNode::new(span, move |ctx| {
                    navigate::identifier(ctx, &ctx.input, &name, span, true)
                })
            }
            ExpressionNode::Variable { name, span } => self.compile_variable(name, *span),
            ExpressionNode::EnvVariable { name, span } => self.compile_env_variable(name, *span),
            ExpressionNode::BinaryOp {
                op,
                left,
                right,
                span,
            } => {
                let compiled = self.compile_binary(*op, left, right, *span)?;
                self.maybe_fold(node, compiled)
            }
            ExpressionNode::UnaryOp { op, operand, span } => {
                let op = *op;
                let span = *span;
                let operand = self.compile_node(operand)?;
                let compiled = CompiledNode::new(span, move |ctx| {
                    operations::unary(op, &operand.eval(ctx)?, span)
                });
                self.maybe_fold(node, compiled)
            }
            ExpressionNode::FunctionCall { name, args, span } => {
                self.compile_function_call(name, args, *span)?
            }
            ExpressionNode::Index { .. } | ExpressionNode::Path { .. } => {
                self.compile_chain(node)?
            }
            ExpressionNode::TypeCheck {
                expression,
                type_name,
                span,
            } => {
                let expression = self.compile_node(expression)?;
                let type_name = type_name.clone();
                let span = *span;
                CompiledNode::new(span, move |ctx| {
                    operations::type_test(ctx, &expression.eval(ctx)?, &type_name, span)
                })
            }
            ExpressionNode::TypeCast {
                expression,
                type_name,
                span,
            } => {
                let expression = self.compile_node(expression)?;
                let type_name = type_name.clone();
                let span = *span;
                CompiledNode::new(span, move |ctx| {
                    operations::type_filter(ctx, &expression.eval(ctx)?, &type_name, span)
                })
            }
        };
        Ok(compiled)
    }

    fn compile_literal(
        &self,
        value: &LiteralValue,
        span: Span,
    ) -> Result<CompiledNode, CompileError> {
        let collection = match value {
            LiteralValue::Null => Collection::empty(),
            LiteralValue::Boolean(b) => Collection::singleton(Value::Boolean(*b)),
            LiteralValue::Integer(i) => Collection::singleton(Value::Integer(*i)),
            LiteralValue::Decimal(text) => {
                Collection::singleton(Value::Decimal(parse_decimal(text).ok_or_else(|| {
                    CompileError::InvalidLiteral {
                        kind: "decimal",
                        text: text.clone(),
                        span,
                    }
                })?))
            }
            LiteralValue::String(s) => Collection::singleton(Value::String(s.clone())),
            LiteralValue::Date(text) => Collection::singleton(Value::Date(
                Date::parse(text).ok_or_else(|| CompileError::InvalidLiteral {
                    kind: "date",
                    text: text.clone(),
                    span,
                })?,
            )),
            LiteralValue::DateTime(text) => Collection::singleton(Value::DateTime(
                DateTime::parse(text).ok_or_else(|| CompileError::InvalidLiteral {
                    kind: "datetime",
                    text: text.clone(),
                    span,
                })?,
            )),
            LiteralValue::Time(text) => Collection::singleton(Value::Time(
                Time::parse(text).ok_or_else(|| CompileError::InvalidLiteral {
                    kind: "time",
                    text: text.clone(),
                    span,
                })?,
            )),
            LiteralValue::Quantity { value, unit } => {
                let decimal = parse_decimal(value).ok_or_else(|| CompileError::InvalidLiteral {
                    kind: "quantity",
                    text: value.clone(),
                    span,
                })?;
                Collection::singleton(Value::Quantity(Quantity::new(
                    decimal,
                    Some(unit.clone()),
                )))
            }
        };
        Ok(CompiledNode::constant(span, collection))
    }

    fn compile_variable(&self, name: &str, span: Span) -> CompiledNode {
        let name = name.to_string();
        CompiledNode::new(span, move |ctx| match name.as_str() {
            "this" => Ok(ctx.input.share()),
            "index" => Ok(ctx
                .index
                .map(|i| Collection::singleton(Value::Integer(i)))
                .unwrap_or_default()),
            "total" => Ok(ctx.total.as_ref().map(Collection::share).unwrap_or_default()),
            _ => match ctx.variables.get(&name) {
                Some(value) => Ok(value.share()),
                None => Err(EvaluationError::UnknownVariable {
                    name: format!("${name}"),
                    span,
                }),
            },
        })
    }

    fn compile_env_variable(&self, name: &str, span: Span) -> CompiledNode {
        let name = name.to_string();
        CompiledNode::new(span, move |ctx| {
            if let Some(value) = ctx.environment.get(&name) {
                return Ok(value.share());
            }
            match name.as_str() {
                "context" => Ok(ctx.root.share()),
                "resource" | "rootResource" => Ok(ctx
                    .root_resource()
                    .map(|r| Collection::singleton(Value::Resource(r)))
                    .unwrap_or_else(|| ctx.root.share())),
                "ucum" => Ok(Collection::singleton(Value::String(
                    "http://unitsofmeasure.org".into(),
                ))),
                "sct" => Ok(Collection::singleton(Value::String(
                    "http://snomed.info/sct".into(),
                ))),
                "loinc" => Ok(Collection::singleton(Value::String(
                    "http://loinc.org".into(),
                ))),
                // defineVariable bindings are also reachable with the
                // %-sigil, matching common FHIR usage
                _ => match ctx.variables.get(&name) {
                    Some(value) => Ok(value.share()),
                    None => Err(EvaluationError::UnknownVariable {
                        name: format!("%{name}"),
                        span,
                    }),
                },
            }
        })
    }

    fn compile_binary(
        &self,
        op: BinaryOperator,
        left: &ExpressionNode,
        right: &ExpressionNode,
        span: Span,
    ) -> Result<CompiledNode, CompileError> {
        let left = self.compile_node(left)?;
        let right = self.compile_node(right)?;

        let node = match op {
            BinaryOperator::And => CompiledNode::new(span, move |ctx| {
                let l = operations::boolean_operand(&left.eval(ctx)?, "and", "left", span)?;
                if l == Some(false) {
                    return Ok(Collection::singleton(Value::Boolean(false)));
                }
                let r = operations::boolean_operand(&right.eval(ctx)?, "and", "right", span)?;
                Ok(operations::three_valued(match (l, r) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }))
            }),
            BinaryOperator::Or => CompiledNode::new(span, move |ctx| {
                let l = operations::boolean_operand(&left.eval(ctx)?, "or", "left", span)?;
                if l == Some(true) {
                    return Ok(Collection::singleton(Value::Boolean(true)));
                }
                let r = operations::boolean_operand(&right.eval(ctx)?, "or", "right", span)?;
                Ok(operations::three_valued(match (l, r) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }))
            }),
            BinaryOperator::Implies => CompiledNode::new(span, move |ctx| {
                let l = operations::boolean_operand(&left.eval(ctx)?, "implies", "left", span)?;
                if l == Some(false) {
                    return Ok(Collection::singleton(Value::Boolean(true)));
                }
                let r = operations::boolean_operand(&right.eval(ctx)?, "implies", "right", span)?;
                Ok(operations::three_valued(match (l, r) {
                    (Some(true), r) => r,
                    // left is empty here: true when the right side is true
                    (None, Some(true)) => Some(true),
                    _ => None,
                }))
            }),
            BinaryOperator::Xor => CompiledNode::new(span, move |ctx| {
                let l = operations::boolean_operand(&left.eval(ctx)?, "xor", "left", span)?;
                let r = operations::boolean_operand(&right.eval(ctx)?, "xor", "right", span)?;
                Ok(operations::three_valued(match (l, r) {
                    (Some(a), Some(b)) => Some(a ^ b),
                    _ => None,
                }))
            }),
            _ => CompiledNode::new(span, move |ctx| {
                let l = left.eval(ctx)?;
                let r = right.eval(ctx)?;
                operations::binary(op, &l, &r, span)
            }),
        };
        Ok(node)
    }

    /// Compile a flattened `a.b[0].f(x).c` chain, threading `defineVariable`
    /// bindings into the steps that follow them
    fn compile_chain(&self, node: &ExpressionNode) -> Result<CompiledNode, CompileError> {
        let mut flat: Vec<FlatStep<'_>> = Vec::new();
        flatten_chain(node, &mut flat);
        let mut iter = flat.into_iter();

        let mut steps = Vec::new();
        let head = match iter.next() {
            // defineVariable heading a chain binds over the whole chain;
            // the focus passes through unchanged
            Some(FlatStep::Head(
                expr @ ExpressionNode::FunctionCall { name, span, .. },
            )) if name == "defineVariable" => {
                let span = *span;
                steps.push(self.compile_member(expr)?);
                CompiledNode::new(span, |ctx| Ok(ctx.input.share()))
            }
            Some(FlatStep::Head(expr)) => self.compile_node(expr)?,
            _ => unreachable!("chain flattening always starts with a head"),
        };
        for flat_step in iter {
            steps.push(match flat_step {
                FlatStep::Head(_) => unreachable!("only the first step is a head"),
                FlatStep::Member(member) => self.compile_member(member)?,
                FlatStep::Index(index, span) => {
                    let index = self.compile_node(index)?;
                    ChainStep::Node(CompiledNode::new(span, move |ctx| {
                        operations::index(&ctx.input, &index.eval(ctx)?, span)
                    }))
                }
            });
        }

        let span = node.span();
        Ok(CompiledNode::new(span, move |ctx| {
            let mut scope_ctx = ctx.clone();
            let mut current = head.eval(&scope_ctx)?;
            for step in &steps {
                match step {
                    ChainStep::Node(node) => {
                        current = node.eval(&scope_ctx.with_input(current))?;
                    }
                    ChainStep::Define { name, value, span } => {
                        let item_ctx = scope_ctx.with_input(current.share());
                        let name = match name.eval(&item_ctx)?.as_singleton() {
                            Some(Value::String(s)) => s.clone(),
                            _ => {
                                return Err(EvaluationError::InvalidOperation {
                                    message: "defineVariable needs a string name".into(),
                                    span: *span,
                                });
                            }
                        };
                        if matches!(name.as_str(), "this" | "index" | "total" | "context" | "resource" | "rootResource")
                            || scope_ctx.variables.contains(&name)
                        {
                            return Err(EvaluationError::VariableAlreadyDefined {
                                name,
                                span: *span,
                            });
                        }
                        let bound = match value {
                            Some(value) => value.eval(&item_ctx)?,
                            None => current.share(),
                        };
                        scope_ctx = scope_ctx.bind_variable(name, bound);
                    }
                }
            }
            Ok(current)
        }))
    }

    /// Compile one member of a dot chain into a chain step
    fn compile_member(&self, member: &ExpressionNode) -> Result<ChainStep, CompileError> {
        match member {
            ExpressionNode::Identifier { name, span } => {
                let name = name.clone();
                let span = *span;
                Ok(ChainStep::Node(CompiledNode::new(span, move |ctx| {
                    navigate::identifier(ctx, &ctx.input, &name, span, false)
                })))
            }
            ExpressionNode::FunctionCall { name, args, span } if name == "defineVariable" => {
                if args.is_empty() || args.len() > 2 {
                    return Err(CompileError::WrongArity {
                        name: name.clone(),
                        min: 1,
                        max: Some(2),
                        actual: args.len(),
                        span: *span,
                    });
                }
                Ok(ChainStep::Define {
                    name: self.compile_node(&args[0])?,
                    value: args.get(1).map(|a| self.compile_node(a)).transpose()?,
                    span: *span,
                })
            }
            ExpressionNode::FunctionCall { name, args, span } => {
                Ok(ChainStep::Node(self.compile_function_call(name, args, *span)?))
            }
            other => Ok(ChainStep::Node(self.compile_node(other)?)),
        }
    }

    fn compile_function_call(
        &self,
        name: &str,
        args: &[ExpressionNode],
        span: Span,
    ) -> Result<CompiledNode, CompileError> {
        // Type-operator function forms take their argument as a written
        // type name, not an expression
        match name {
            "ofType" | "is" | "as" => {
                if args.len() != 1 {
                    return Err(CompileError::WrongArity {
                        name: name.to_string(),
                        min: 1,
                        max: Some(1),
                        actual: args.len(),
                        span,
                    });
                }
                let type_name =
                    type_name_of(&args[0]).ok_or_else(|| CompileError::InvalidTypeSpecifier {
                        name: name.to_string(),
                        span: args[0].span(),
                    })?;
                let test = name == "is";
                return Ok(CompiledNode::new(span, move |ctx| {
                    if test {
                        operations::type_test(ctx, &ctx.input, &type_name, span)
                    } else {
                        operations::type_filter(ctx, &ctx.input, &type_name, span)
                    }
                }));
            }
            _ => {}
        }

        match self.registry.get(name) {
            Some(entry) => {
                entry
                    .signature
                    .check_arity(args.len())
                    .map_err(|_| CompileError::WrongArity {
                        name: name.to_string(),
                        min: entry.signature.min_arity,
                        max: entry.signature.max_arity,
                        actual: args.len(),
                        span,
                    })?;

                // Type-specifier parameters are extracted from the AST, the
                // rest compile to nodes
                let mut compiled_args = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let kind = entry
                        .signature
                        .parameters
                        .get(i)
                        .copied()
                        .unwrap_or(ParameterKind::Value);
                    if kind == ParameterKind::TypeSpecifier {
                        let type_name = type_name_of(arg).ok_or_else(|| {
                            CompileError::InvalidTypeSpecifier {
                                name: name.to_string(),
                                span: arg.span(),
                            }
                        })?;
                        compiled_args.push(CompiledNode::constant(
                            arg.span(),
                            Collection::singleton(Value::String(type_name)),
                        ));
                    } else {
                        compiled_args.push(self.compile_node(arg)?);
                    }
                }

                Ok(emit_call(entry.implementation.clone(), compiled_args, span))
            }
            None if self.options.allow_unknown_functions => {
                // Permissive mode: resolve at runtime against whatever
                // registry the engine carries then
                let registry = Arc::clone(&self.registry);
                let name = name.to_string();
                let compiled_args: Result<Vec<_>, _> =
                    args.iter().map(|a| self.compile_node(a)).collect();
                let compiled_args = compiled_args?;
                Ok(CompiledNode::new(span, move |ctx| {
                    match registry.get(&name) {
                        Some(entry) => {
                            entry
                                .signature
                                .check_arity(compiled_args.len())
                                .map_err(|e| e.at(span))?;
                            emit_call(entry.implementation.clone(), compiled_args.clone(), span)
                                .eval(ctx)
                        }
                        None => Err(EvaluationError::UnknownFunction {
                            name: name.clone(),
                            span,
                        }),
                    }
                }))
            }
            None => Err(CompileError::UnknownFunction {
                name: name.to_string(),
                span,
                suggestion: self
                    .registry
                    .names()
                    .find(|candidate| candidate.eq_ignore_ascii_case(name))
                    .map(str::to_string),
            }),
        }
    }

    /// Replace a literal-only subtree with the constant it evaluates to.
    /// Folding that fails (division by zero, say) keeps the runtime node so
    /// the error surfaces at evaluation with its span.
    fn maybe_fold(&self, ast: &ExpressionNode, compiled: CompiledNode) -> CompiledNode {
        if !self.options.constant_folding || !is_constant(ast) {
            return compiled;
        }
        match compiled.eval(&EvaluationContext::new()) {
            Ok(value) => CompiledNode::constant(compiled.span(), value),
            Err(_) => compiled,
        }
    }
}

/// Evaluate arguments (eager) or hand over thunks (lazy) and run the call
fn emit_call(implementation: FunctionImpl, args: Vec<CompiledNode>, span: Span) -> CompiledNode {
    match implementation {
        FunctionImpl::Eager(f) => CompiledNode::new(span, move |ctx| {
            let mut values = Vec::with_capacity(args.len());
            for arg in &args {
                values.push(arg.eval(ctx)?);
            }
            let fc = FunctionContext {
                context: ctx,
                input: &ctx.input,
                span,
            };
            f(&fc, &values).map_err(|e| e.at(span))
        }),
        FunctionImpl::Lazy(f) => CompiledNode::new(span, move |ctx| {
            let fc = FunctionContext {
                context: ctx,
                input: &ctx.input,
                span,
            };
            f(&fc, &args)
        }),
    }
}

/// A dot/index chain flattened left to right
enum FlatStep<'a> {
    Head(&'a ExpressionNode),
    Member(&'a ExpressionNode),
    Index(&'a ExpressionNode, Span),
}

fn flatten_chain<'a>(node: &'a ExpressionNode, out: &mut Vec<FlatStep<'a>>) {
    match node {
        ExpressionNode::Path { base, member, .. } => {
            flatten_chain(base, out);
            out.push(FlatStep::Member(member));
        }
        ExpressionNode::Index { base, index, span } => {
            flatten_chain(base, out);
            out.push(FlatStep::Index(index, *span));
        }
        other => out.push(FlatStep::Head(other)),
    }
}

/// Extract a dotted type name from an argument written in type position
fn type_name_of(node: &ExpressionNode) -> Option<String> {
    match node {
        ExpressionNode::Identifier { name, .. } => Some(name.clone()),
        ExpressionNode::Path { base, member, .. } => {
            let base = type_name_of(base)?;
            let member = member.as_identifier()?;
            Some(format!("{base}.{member}"))
        }
        ExpressionNode::Literal {
            value: LiteralValue::String(s),
            ..
        } => Some(s.clone()),
        _ => None,
    }
}

fn is_constant(node: &ExpressionNode) -> bool {
    match node {
        ExpressionNode::Literal { .. } => true,
        ExpressionNode::UnaryOp { operand, .. } => is_constant(operand),
        ExpressionNode::BinaryOp { left, right, .. } => is_constant(left) && is_constant(right),
        _ => false,
    }
}

/// Parse a decimal literal, scientific notation included
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}
