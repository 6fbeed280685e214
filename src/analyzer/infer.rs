//! The inference walk

use super::TypedExpression;
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use crate::diagnostics::Diagnostic;
use crate::model::{Cardinality, FhirPathType, ModelProvider};
use crate::registry::FunctionRegistry;
use std::sync::Arc;

/// Infers a type and cardinality for every AST node, collecting
/// diagnostics for combinations no runtime value could satisfy
pub struct TypeInferencer {
    provider: Option<Arc<dyn ModelProvider>>,
    registry: Arc<FunctionRegistry>,
    root_type: Option<String>,
}

impl TypeInferencer {
    /// Create an inferencer
    pub fn new(
        provider: Option<Arc<dyn ModelProvider>>,
        registry: Arc<FunctionRegistry>,
        root_type: Option<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            root_type,
        }
    }

    /// Run the walk from the root focus type
    pub fn infer(&self, ast: &ExpressionNode) -> (TypedExpression, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let focus = match &self.root_type {
            Some(name) => FhirPathType::Resource(name.clone()),
            None => FhirPathType::Any,
        };
        let typed = self.infer_node(ast, &focus, &mut diagnostics);
        (typed, diagnostics)
    }

    fn infer_node(
        &self,
        node: &ExpressionNode,
        focus: &FhirPathType,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TypedExpression {
        match node {
            ExpressionNode::Literal { value, span } => {
                let (ty, cardinality) = match value {
                    LiteralValue::Null => (FhirPathType::Empty, Cardinality::Optional),
                    LiteralValue::Boolean(_) => (FhirPathType::Boolean, Cardinality::Single),
                    LiteralValue::Integer(_) => (FhirPathType::Integer, Cardinality::Single),
                    LiteralValue::Decimal(_) => (FhirPathType::Decimal, Cardinality::Single),
                    LiteralValue::String(_) => (FhirPathType::String, Cardinality::Single),
                    LiteralValue::Date(_) => (FhirPathType::Date, Cardinality::Single),
                    LiteralValue::DateTime(_) => (FhirPathType::DateTime, Cardinality::Single),
                    LiteralValue::Time(_) => (FhirPathType::Time, Cardinality::Single),
                    LiteralValue::Quantity { .. } => (FhirPathType::Quantity, Cardinality::Single),
                };
                TypedExpression::leaf(ty, cardinality, *span)
            }

            ExpressionNode::Identifier { name, span } => {
                let (ty, cardinality) = self.property(focus, name, *span, diagnostics);
                TypedExpression::leaf(ty, cardinality, *span)
            }

            ExpressionNode::Variable { span, .. } | ExpressionNode::EnvVariable { span, .. } => {
                TypedExpression::leaf(FhirPathType::Any, Cardinality::Many, *span)
            }

            ExpressionNode::BinaryOp {
                op,
                left,
                right,
                span,
            } => {
                let l = self.infer_node(left, focus, diagnostics);
                let r = self.infer_node(right, focus, diagnostics);
                let (ty, cardinality) = self.binary_result(*op, &l, &r, *span, diagnostics);
                TypedExpression {
                    ty,
                    cardinality,
                    span: *span,
                    children: vec![l, r],
                }
            }

            ExpressionNode::UnaryOp { op, operand, span } => {
                let inner = self.infer_node(operand, focus, diagnostics);
                if !inner.ty.is_numeric() && inner.ty != FhirPathType::Any
                    && inner.ty != FhirPathType::Empty
                {
                    diagnostics.push(Diagnostic::error(
                        "type error",
                        format!("unary '{}' needs a number, got {}", op.as_str(), inner.ty),
                        *span,
                    ));
                }
                let ty = inner.ty.clone();
                TypedExpression {
                    ty,
                    cardinality: Cardinality::Optional,
                    span: *span,
                    children: vec![inner],
                }
            }

            ExpressionNode::FunctionCall { name, args, span } => {
                self.function_call(name, args, focus, *span, diagnostics)
            }

            ExpressionNode::Index { base, index, span } => {
                let base_typed = self.infer_node(base, focus, diagnostics);
                let index_typed = self.infer_node(index, focus, diagnostics);
                if !matches!(
                    index_typed.ty.element_type(),
                    FhirPathType::Integer | FhirPathType::Any | FhirPathType::Empty
                ) {
                    diagnostics.push(Diagnostic::error(
                        "type error",
                        format!("indexer needs an integer, got {}", index_typed.ty),
                        index_typed.span,
                    ));
                }
                let ty = base_typed.ty.element_type().clone();
                TypedExpression {
                    ty,
                    cardinality: Cardinality::Optional,
                    span: *span,
                    children: vec![base_typed, index_typed],
                }
            }

            ExpressionNode::Path { base, member, span } => {
                let base_typed = self.infer_node(base, focus, diagnostics);
                let member_focus = base_typed.ty.element_type().clone();
                let member_typed = self.infer_node(member, &member_focus, diagnostics);
                let ty = member_typed.ty.clone();
                let cardinality = base_typed.cardinality.widen(member_typed.cardinality);
                TypedExpression {
                    ty,
                    cardinality,
                    span: *span,
                    children: vec![base_typed, member_typed],
                }
            }

            ExpressionNode::TypeCheck { expression, span, .. } => {
                let inner = self.infer_node(expression, focus, diagnostics);
                TypedExpression {
                    ty: FhirPathType::Boolean,
                    cardinality: Cardinality::Optional,
                    span: *span,
                    children: vec![inner],
                }
            }

            ExpressionNode::TypeCast {
                expression,
                type_name,
                span,
            } => {
                let inner = self.infer_node(expression, focus, diagnostics);
                let target = FhirPathType::from_type_name(type_name)
                    .unwrap_or_else(|| FhirPathType::Resource(type_name.clone()));
                let narrowed = inner.ty.narrow(&target);
                if narrowed == FhirPathType::Empty && inner.ty != FhirPathType::Empty
                    && inner.ty != FhirPathType::Any
                {
                    diagnostics.push(Diagnostic::warning(
                        "type warning",
                        format!("'as {type_name}' can never match a {}", inner.ty),
                        *span,
                    ));
                }
                TypedExpression {
                    ty: narrowed,
                    cardinality: Cardinality::Many,
                    span: *span,
                    children: vec![inner],
                }
            }
        }
    }

    /// Type of a property lookup, or a type-guard identifier
    fn property(
        &self,
        focus: &FhirPathType,
        name: &str,
        span: crate::parser::span::Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (FhirPathType, Cardinality) {
        let FhirPathType::Resource(parent) = focus.element_type() else {
            return (FhirPathType::Any, Cardinality::Many);
        };

        // Type guard spelled as an identifier
        if name == parent {
            return (focus.element_type().clone(), Cardinality::Optional);
        }

        if let Some(provider) = &self.provider {
            match provider.property_type(parent, name) {
                Ok(Some((ty, cardinality))) => return (ty, cardinality),
                Ok(None) => {
                    if !name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                        diagnostics.push(Diagnostic::warning(
                            "type warning",
                            format!("'{parent}' has no element '{name}'"),
                            span,
                        ));
                    }
                }
                Err(e) => {
                    diagnostics.push(Diagnostic::warning(
                        "type warning",
                        format!("model provider failed for '{parent}.{name}': {e}"),
                        span,
                    ));
                }
            }
        }
        (FhirPathType::Any, Cardinality::Many)
    }

    fn function_call(
        &self,
        name: &str,
        args: &[ExpressionNode],
        focus: &FhirPathType,
        span: crate::parser::span::Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TypedExpression {
        let children: Vec<TypedExpression> = args
            .iter()
            .map(|arg| self.infer_node(arg, focus, diagnostics))
            .collect();

        // Type-operator function forms
        if matches!(name, "ofType" | "is" | "as") {
            let ty = if name == "is" {
                FhirPathType::Boolean
            } else {
                FhirPathType::Any
            };
            return TypedExpression {
                ty,
                cardinality: Cardinality::Many,
                span,
                children,
            };
        }

        match self.registry.get(name) {
            Some(entry) => {
                if entry.signature.check_arity(args.len()).is_err() {
                    diagnostics.push(Diagnostic::error(
                        "compile error",
                        format!(
                            "function '{name}' expects {}..{} arguments, got {}",
                            entry.signature.min_arity,
                            entry
                                .signature
                                .max_arity
                                .map_or("*".to_string(), |n| n.to_string()),
                            args.len()
                        ),
                        span,
                    ));
                }
                // Subsetting and filtering functions hand their input
                // through; select adopts its projection's type
                let ty = if input_preserving(name) {
                    focus.element_type().clone()
                } else if name == "select" {
                    children
                        .first()
                        .map(|c| c.ty.clone())
                        .unwrap_or(FhirPathType::Any)
                } else {
                    entry.signature.return_type.clone()
                };
                TypedExpression {
                    ty,
                    cardinality: entry.signature.return_cardinality,
                    span,
                    children,
                }
            }
            None => {
                diagnostics.push(Diagnostic::error(
                    "compile error",
                    format!("unknown function '{name}'"),
                    span,
                ));
                TypedExpression {
                    ty: FhirPathType::Any,
                    cardinality: Cardinality::Many,
                    span,
                    children,
                }
            }
        }
    }

    /// Result type of a binary operator, with incompatibility diagnostics
    fn binary_result(
        &self,
        op: BinaryOperator,
        left: &TypedExpression,
        right: &TypedExpression,
        span: crate::parser::span::Span,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (FhirPathType, Cardinality) {
        use BinaryOperator::*;

        let flexible = |t: &FhirPathType| {
            matches!(t, FhirPathType::Any | FhirPathType::Empty | FhirPathType::Choice(_))
        };

        match op {
            And | Or | Xor | Implies => {
                for side in [left, right] {
                    if !flexible(&side.ty)
                        && side.ty.element_type() != &FhirPathType::Boolean
                    {
                        diagnostics.push(Diagnostic::warning(
                            "type warning",
                            format!("'{}' treats a {} operand as true", op.as_str(), side.ty),
                            side.span,
                        ));
                    }
                }
                (FhirPathType::Boolean, Cardinality::Optional)
            }
            Equal | NotEqual | Equivalent | NotEquivalent | In | Contains => {
                (FhirPathType::Boolean, Cardinality::Optional)
            }
            LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
                for side in [left, right] {
                    if !flexible(&side.ty) && !side.ty.is_orderable() {
                        diagnostics.push(Diagnostic::error(
                            "type error",
                            format!("'{}' cannot order a {}", op.as_str(), side.ty),
                            side.span,
                        ));
                    }
                }
                (FhirPathType::Boolean, Cardinality::Optional)
            }
            Add | Subtract | Multiply | Divide | IntegerDivide | Modulo => {
                let string_concat = op == Add
                    && left.ty.element_type() == &FhirPathType::String
                    && right.ty.element_type() == &FhirPathType::String;
                let temporal_shift = matches!(op, Add | Subtract)
                    && matches!(
                        left.ty.element_type(),
                        FhirPathType::Date | FhirPathType::DateTime | FhirPathType::Time
                    )
                    && right.ty.element_type() == &FhirPathType::Quantity;
                if !string_concat && !temporal_shift {
                    for side in [left, right] {
                        if !flexible(&side.ty) && !side.ty.is_numeric() {
                            diagnostics.push(Diagnostic::error(
                                "type error",
                                format!("'{}' cannot be applied to a {}", op.as_str(), side.ty),
                                side.span,
                            ));
                        }
                    }
                }
                let ty = if string_concat {
                    FhirPathType::String
                } else if temporal_shift {
                    left.ty.element_type().clone()
                } else if matches!(op, Divide) {
                    FhirPathType::Decimal
                } else if matches!(op, IntegerDivide) {
                    FhirPathType::Integer
                } else {
                    left.ty.element_type().widen(right.ty.element_type())
                };
                (ty, Cardinality::Optional)
            }
            Concatenate => {
                for side in [left, right] {
                    if !flexible(&side.ty) && side.ty.element_type() != &FhirPathType::String {
                        diagnostics.push(Diagnostic::error(
                            "type error",
                            format!("'&' needs strings, got {}", side.ty),
                            side.span,
                        ));
                    }
                }
                (FhirPathType::String, Cardinality::Single)
            }
            Union => (
                left.ty.widen(&right.ty),
                Cardinality::Many,
            ),
        }
    }
}

/// Functions whose result is drawn from their input collection
fn input_preserving(name: &str) -> bool {
    matches!(
        name,
        "first"
            | "last"
            | "tail"
            | "skip"
            | "take"
            | "slice"
            | "single"
            | "distinct"
            | "where"
            | "intersect"
            | "exclude"
            | "union"
            | "combine"
            | "flatten"
            | "trace"
    )
}

impl std::fmt::Debug for TypeInferencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInferencer")
            .field("root_type", &self.root_type)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn infer(source: &str) -> (TypedExpression, Vec<Diagnostic>) {
        let ast = parser::parse(source).unwrap();
        let inferencer = TypeInferencer::new(
            None,
            Arc::new(FunctionRegistry::standard()),
            Some("Patient".into()),
        );
        inferencer.infer(&ast)
    }

    #[test]
    fn test_literal_types() {
        let (typed, diagnostics) = infer("1 + 2.5");
        assert!(diagnostics.is_empty());
        assert_eq!(typed.ty, FhirPathType::Decimal);
    }

    #[test]
    fn test_string_ordering_is_fine_but_arithmetic_is_not() {
        let (_, diagnostics) = infer("'a' < 'b'");
        assert!(diagnostics.is_empty());
        let (_, diagnostics) = infer("'a' * 2");
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_function_is_an_error() {
        let (_, diagnostics) = infer("name.frobnicate()");
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("unknown function"))
        );
    }

    #[test]
    fn test_comparison_yields_boolean() {
        let (typed, _) = infer("birthDate < today()");
        assert_eq!(typed.ty, FhirPathType::Boolean);
    }

    #[test]
    fn test_impossible_cast_warns() {
        let (_, diagnostics) = infer("'text' as Quantity");
        assert!(!diagnostics.is_empty());
    }
}
