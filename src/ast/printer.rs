//! Unparser for AST nodes
//!
//! Produces source text that parses back to a structurally equal tree.
//! Parentheses are re-introduced wherever a child binds looser than its
//! parent, so the output is canonical rather than byte-identical to the
//! original source.

use super::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};

/// Binding strength used to decide parenthesization; mirrors the parser's
/// precedence table
fn precedence(node: &ExpressionNode) -> u8 {
    match node {
        ExpressionNode::BinaryOp { op, .. } => binary_precedence(*op),
        ExpressionNode::TypeCheck { .. } | ExpressionNode::TypeCast { .. } => 7,
        ExpressionNode::UnaryOp { .. } => 11,
        ExpressionNode::Index { .. } | ExpressionNode::Path { .. } => 12,
        _ => 13,
    }
}

fn binary_precedence(op: BinaryOperator) -> u8 {
    use BinaryOperator::*;
    match op {
        Implies => 1,
        Or | Xor => 2,
        And => 3,
        In | Contains => 4,
        Equal | NotEqual | Equivalent | NotEquivalent => 5,
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => 6,
        Union => 8,
        Add | Subtract | Concatenate => 9,
        Multiply | Divide | IntegerDivide | Modulo => 10,
    }
}

/// Render `node` as parseable FHIRPath source
pub fn print_expression(node: &ExpressionNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &ExpressionNode) {
    match node {
        ExpressionNode::Literal { value, .. } => write_literal(out, value),
        ExpressionNode::Identifier { name, .. } => write_identifier(out, name),
        ExpressionNode::Variable { name, .. } => {
            out.push('$');
            out.push_str(name);
        }
        ExpressionNode::EnvVariable { name, .. } => {
            out.push('%');
            if is_plain_identifier(name) {
                out.push_str(name);
            } else {
                out.push('\'');
                write_escaped(out, name, '\'');
                out.push('\'');
            }
        }
        ExpressionNode::BinaryOp {
            op, left, right, ..
        } => {
            let prec = binary_precedence(*op);
            let right_assoc = matches!(op, BinaryOperator::Implies);
            let (left_min, right_min) = if right_assoc {
                (prec + 1, prec)
            } else {
                (prec, prec + 1)
            };
            write_child(out, left, left_min);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            write_child(out, right, right_min);
        }
        ExpressionNode::UnaryOp { op, operand, .. } => {
            out.push_str(op.as_str());
            write_child(out, operand, 11);
        }
        ExpressionNode::FunctionCall { name, args, .. } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_node(out, arg);
            }
            out.push(')');
        }
        ExpressionNode::Index { base, index, .. } => {
            write_child(out, base, 12);
            out.push('[');
            write_node(out, index);
            out.push(']');
        }
        ExpressionNode::Path { base, member, .. } => {
            write_child(out, base, 12);
            out.push('.');
            write_member(out, member);
        }
        ExpressionNode::TypeCheck {
            expression,
            type_name,
            ..
        } => {
            write_child(out, expression, 7);
            out.push_str(" is ");
            out.push_str(type_name);
        }
        ExpressionNode::TypeCast {
            expression,
            type_name,
            ..
        } => {
            write_child(out, expression, 7);
            out.push_str(" as ");
            out.push_str(type_name);
        }
    }
}

fn write_child(out: &mut String, child: &ExpressionNode, min_precedence: u8) {
    if precedence(child) < min_precedence {
        out.push('(');
        write_node(out, child);
        out.push(')');
    } else {
        write_node(out, child);
    }
}

/// Members after a dot may use keyword text bare; function names likewise
fn write_member(out: &mut String, member: &ExpressionNode) {
    match member {
        ExpressionNode::Identifier { name, .. } => {
            if is_plain_identifier(name) || is_keyword(name) {
                out.push_str(name);
            } else {
                write_identifier(out, name);
            }
        }
        other => write_node(out, other),
    }
}

fn write_literal(out: &mut String, value: &LiteralValue) {
    match value {
        LiteralValue::Null => out.push_str("{}"),
        LiteralValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        LiteralValue::Integer(i) => out.push_str(&i.to_string()),
        LiteralValue::Decimal(s) => out.push_str(s),
        LiteralValue::String(s) => {
            out.push('\'');
            write_escaped(out, s, '\'');
            out.push('\'');
        }
        LiteralValue::Date(s) => {
            out.push('@');
            out.push_str(s);
        }
        LiteralValue::DateTime(s) => {
            out.push('@');
            out.push_str(s);
        }
        LiteralValue::Time(s) => {
            out.push_str("@T");
            out.push_str(s);
        }
        LiteralValue::Quantity { value, unit } => {
            out.push_str(value);
            out.push(' ');
            if is_calendar_word(unit) {
                out.push_str(unit);
            } else {
                out.push('\'');
                write_escaped(out, unit, '\'');
                out.push('\'');
            }
        }
    }
}

fn write_identifier(out: &mut String, name: &str) {
    if is_plain_identifier(name) && !is_keyword(name) {
        out.push_str(name);
    } else {
        out.push('`');
        write_escaped(out, name, '`');
        out.push('`');
    }
}

fn write_escaped(out: &mut String, text: &str, quote: char) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{000C}' => out.push_str("\\f"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "true"
            | "false"
            | "and"
            | "or"
            | "xor"
            | "implies"
            | "is"
            | "as"
            | "in"
            | "contains"
            | "div"
            | "mod"
    )
}

fn is_calendar_word(unit: &str) -> bool {
    matches!(
        unit,
        "year"
            | "years"
            | "month"
            | "months"
            | "week"
            | "weeks"
            | "day"
            | "days"
            | "hour"
            | "hours"
            | "minute"
            | "minutes"
            | "second"
            | "seconds"
            | "millisecond"
            | "milliseconds"
    )
}
