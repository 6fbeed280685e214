//! Abstract syntax tree for FHIRPath expressions
//!
//! One tagged-union node type; every variant carries its source span, and a
//! child's span is always a subrange of its parent's. The root node of a
//! parse covers the whole source.

pub mod printer;

use crate::parser::span::Span;
use serde_json::{Value as JsonValue, json};

pub use printer::print_expression;

/// AST node for FHIRPath expressions
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    /// Literal value
    Literal {
        /// The decoded literal
        value: LiteralValue,
        /// Source span
        span: Span,
    },

    /// Bare identifier: property name, resource type guard or type name
    Identifier {
        /// Identifier text (delimited identifiers are already unescaped)
        name: String,
        /// Source span
        span: Span,
    },

    /// `$`-variable: `$this`, `$index`, `$total` or a user-defined name
    Variable {
        /// Name without the sigil
        name: String,
        /// Source span
        span: Span,
    },

    /// `%`-environment variable, bare or quoted form
    EnvVariable {
        /// Name without the sigil
        name: String,
        /// Source span
        span: Span,
    },

    /// Binary operation
    BinaryOp {
        /// The operator
        op: BinaryOperator,
        /// Left operand
        left: Box<ExpressionNode>,
        /// Right operand
        right: Box<ExpressionNode>,
        /// Source span
        span: Span,
    },

    /// Unary `+` / `-`
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
        /// Source span
        span: Span,
    },

    /// Function call, standalone or in member position
    FunctionCall {
        /// Function name (a keyword may serve as a name here)
        name: String,
        /// Arguments in source order
        args: Vec<ExpressionNode>,
        /// Source span
        span: Span,
    },

    /// Indexer `base[index]`
    Index {
        /// Collection expression
        base: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
        /// Source span
        span: Span,
    },

    /// Dot navigation `base.member`; `member` is an Identifier,
    /// FunctionCall or Variable node
    Path {
        /// Left of the dot
        base: Box<ExpressionNode>,
        /// Right of the dot
        member: Box<ExpressionNode>,
        /// Source span
        span: Span,
    },

    /// Type test `expression is TypeName`
    TypeCheck {
        /// Expression under test
        expression: Box<ExpressionNode>,
        /// Dotted type name
        type_name: String,
        /// Source span
        span: Span,
    },

    /// Type filter `expression as TypeName`
    TypeCast {
        /// Expression to filter
        expression: Box<ExpressionNode>,
        /// Dotted type name
        type_name: String,
        /// Source span
        span: Span,
    },
}

/// Literal values as decoded by the tokenizer
///
/// Decimal, date and time literals are kept as source text so precision is
/// preserved until evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// `{}` — the empty collection
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal literal text
    Decimal(String),
    /// String literal (escapes decoded)
    String(String),
    /// Date literal text, `@` stripped
    Date(String),
    /// DateTime literal text, `@` stripped
    DateTime(String),
    /// Time literal text, `@T` stripped
    Time(String),
    /// Quantity literal
    Quantity {
        /// Numeric text
        value: String,
        /// Unit text, pluralization preserved for calendar words
        unit: String,
    },
}

/// Binary operators, in surface syntax terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `div`
    IntegerDivide,
    /// `mod`
    Modulo,
    /// `&`
    Concatenate,
    /// `|`
    Union,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `~`
    Equivalent,
    /// `!~`
    NotEquivalent,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `and`
    And,
    /// `or`
    Or,
    /// `xor`
    Xor,
    /// `implies`
    Implies,
    /// `in`
    In,
    /// `contains`
    Contains,
}

impl BinaryOperator {
    /// Surface syntax of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::IntegerDivide => "div",
            Self::Modulo => "mod",
            Self::Concatenate => "&",
            Self::Union => "|",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Equivalent => "~",
            Self::NotEquivalent => "!~",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Implies => "implies",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `+`
    Plus,
    /// `-`
    Minus,
}

impl UnaryOperator {
    /// Surface syntax of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
        }
    }
}

impl ExpressionNode {
    /// Create a literal node
    pub fn literal(value: LiteralValue, span: Span) -> Self {
        Self::Literal { value, span }
    }

    /// Create an identifier node
    pub fn identifier(name: impl Into<String>, span: Span) -> Self {
        Self::Identifier {
            name: name.into(),
            span,
        }
    }

    /// Create a variable node
    pub fn variable(name: impl Into<String>, span: Span) -> Self {
        Self::Variable {
            name: name.into(),
            span,
        }
    }

    /// Create an environment-variable node
    pub fn env_variable(name: impl Into<String>, span: Span) -> Self {
        Self::EnvVariable {
            name: name.into(),
            span,
        }
    }

    /// Create a binary operation; the span covers both operands
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        let span = left.span().cover(right.span());
        Self::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }
    }

    /// Create a unary operation
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode, span: Span) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
            span,
        }
    }

    /// Create a function call
    pub fn function_call(name: impl Into<String>, args: Vec<ExpressionNode>, span: Span) -> Self {
        Self::FunctionCall {
            name: name.into(),
            args,
            span,
        }
    }

    /// Create an indexer; `span` runs through the closing bracket
    pub fn index(base: ExpressionNode, index: ExpressionNode, span: Span) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
            span,
        }
    }

    /// Create a dot navigation; the span covers base and member
    pub fn path(base: ExpressionNode, member: ExpressionNode) -> Self {
        let span = base.span().cover(member.span());
        Self::Path {
            base: Box::new(base),
            member: Box::new(member),
            span,
        }
    }

    /// Create a type test; `span` runs through the type name
    pub fn type_check(expression: ExpressionNode, type_name: impl Into<String>, span: Span) -> Self {
        Self::TypeCheck {
            expression: Box::new(expression),
            type_name: type_name.into(),
            span,
        }
    }

    /// Create a type filter; `span` runs through the type name
    pub fn type_cast(expression: ExpressionNode, type_name: impl Into<String>, span: Span) -> Self {
        Self::TypeCast {
            expression: Box::new(expression),
            type_name: type_name.into(),
            span,
        }
    }

    /// Source span of this node
    pub fn span(&self) -> Span {
        match self {
            Self::Literal { span, .. }
            | Self::Identifier { span, .. }
            | Self::Variable { span, .. }
            | Self::EnvVariable { span, .. }
            | Self::BinaryOp { span, .. }
            | Self::UnaryOp { span, .. }
            | Self::FunctionCall { span, .. }
            | Self::Index { span, .. }
            | Self::Path { span, .. }
            | Self::TypeCheck { span, .. }
            | Self::TypeCast { span, .. } => *span,
        }
    }

    /// Check if this node is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// Identifier name, if this is an identifier node
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Structural equality, ignoring spans. Used by the round-trip tests,
    /// where the printer's canonical parenthesization shifts offsets.
    pub fn structurally_eq(&self, other: &ExpressionNode) -> bool {
        use ExpressionNode::*;
        match (self, other) {
            (Literal { value: a, .. }, Literal { value: b, .. }) => a == b,
            (Identifier { name: a, .. }, Identifier { name: b, .. })
            | (Variable { name: a, .. }, Variable { name: b, .. })
            | (EnvVariable { name: a, .. }, EnvVariable { name: b, .. }) => a == b,
            (
                BinaryOp {
                    op: op_a,
                    left: la,
                    right: ra,
                    ..
                },
                BinaryOp {
                    op: op_b,
                    left: lb,
                    right: rb,
                    ..
                },
            ) => op_a == op_b && la.structurally_eq(lb) && ra.structurally_eq(rb),
            (
                UnaryOp {
                    op: op_a,
                    operand: oa,
                    ..
                },
                UnaryOp {
                    op: op_b,
                    operand: ob,
                    ..
                },
            ) => op_a == op_b && oa.structurally_eq(ob),
            (
                FunctionCall {
                    name: na, args: aa, ..
                },
                FunctionCall {
                    name: nb, args: ab, ..
                },
            ) => {
                na == nb
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| x.structurally_eq(y))
            }
            (
                Index {
                    base: ba,
                    index: ia,
                    ..
                },
                Index {
                    base: bb,
                    index: ib,
                    ..
                },
            ) => ba.structurally_eq(bb) && ia.structurally_eq(ib),
            (
                Path {
                    base: ba,
                    member: ma,
                    ..
                },
                Path {
                    base: bb,
                    member: mb,
                    ..
                },
            ) => ba.structurally_eq(bb) && ma.structurally_eq(mb),
            (
                TypeCheck {
                    expression: ea,
                    type_name: ta,
                    ..
                },
                TypeCheck {
                    expression: eb,
                    type_name: tb,
                    ..
                },
            )
            | (
                TypeCast {
                    expression: ea,
                    type_name: ta,
                    ..
                },
                TypeCast {
                    expression: eb,
                    type_name: tb,
                    ..
                },
            ) => ta == tb && ea.structurally_eq(eb),
            _ => false,
        }
    }

    /// Serialize for tooling interop: `{ kind, span: {start, end}, …fields }`,
    /// operators as their surface syntax
    pub fn to_json(&self) -> JsonValue {
        let span = |s: Span| json!({ "start": s.start, "end": s.end });
        match self {
            Self::Literal { value, span: s } => {
                let (data_type, val) = value.to_json_parts();
                json!({ "kind": "literal", "span": span(*s), "dataType": data_type, "value": val })
            }
            Self::Identifier { name, span: s } => {
                json!({ "kind": "identifier", "span": span(*s), "name": name })
            }
            Self::Variable { name, span: s } => {
                json!({ "kind": "variable", "span": span(*s), "name": name })
            }
            Self::EnvVariable { name, span: s } => {
                json!({ "kind": "envVariable", "span": span(*s), "name": name })
            }
            Self::BinaryOp {
                op,
                left,
                right,
                span: s,
            } => json!({
                "kind": "binary",
                "span": span(*s),
                "op": op.as_str(),
                "left": left.to_json(),
                "right": right.to_json(),
            }),
            Self::UnaryOp {
                op,
                operand,
                span: s,
            } => json!({
                "kind": "unary",
                "span": span(*s),
                "op": op.as_str(),
                "operand": operand.to_json(),
            }),
            Self::FunctionCall { name, args, span: s } => json!({
                "kind": "function",
                "span": span(*s),
                "name": name,
                "args": args.iter().map(|a| a.to_json()).collect::<Vec<_>>(),
            }),
            Self::Index {
                base,
                index,
                span: s,
            } => json!({
                "kind": "indexer",
                "span": span(*s),
                "expr": base.to_json(),
                "index": index.to_json(),
            }),
            Self::Path {
                base,
                member,
                span: s,
            } => json!({
                "kind": "dot",
                "span": span(*s),
                "left": base.to_json(),
                "right": member.to_json(),
            }),
            Self::TypeCheck {
                expression,
                type_name,
                span: s,
            } => json!({
                "kind": "is",
                "span": span(*s),
                "expression": expression.to_json(),
                "targetType": type_name,
            }),
            Self::TypeCast {
                expression,
                type_name,
                span: s,
            } => json!({
                "kind": "as",
                "span": span(*s),
                "expression": expression.to_json(),
                "targetType": type_name,
            }),
        }
    }
}

impl LiteralValue {
    fn to_json_parts(&self) -> (&'static str, JsonValue) {
        match self {
            Self::Null => ("null", JsonValue::Null),
            Self::Boolean(b) => ("boolean", json!(b)),
            Self::Integer(i) => ("integer", json!(i)),
            Self::Decimal(s) => ("decimal", json!(s)),
            Self::String(s) => ("string", json!(s)),
            Self::Date(s) => ("date", json!(s)),
            Self::DateTime(s) => ("datetime", json!(s)),
            Self::Time(s) => ("time", json!(s)),
            Self::Quantity { value, unit } => {
                ("quantity", json!({ "value": value, "unit": unit }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_span_covers_operands() {
        let left = ExpressionNode::identifier("a", Span::new(0, 1));
        let right = ExpressionNode::identifier("b", Span::new(4, 5));
        let node = ExpressionNode::binary_op(BinaryOperator::Add, left, right);
        assert_eq!(node.span(), Span::new(0, 5));
    }

    #[test]
    fn test_json_shape() {
        let node = ExpressionNode::binary_op(
            BinaryOperator::And,
            ExpressionNode::identifier("active", Span::new(0, 6)),
            ExpressionNode::literal(LiteralValue::Boolean(true), Span::new(11, 15)),
        );
        let v = node.to_json();
        assert_eq!(v["kind"], "binary");
        assert_eq!(v["op"], "and");
        assert_eq!(v["span"]["end"], 15);
        assert_eq!(v["left"]["name"], "active");
    }
}
