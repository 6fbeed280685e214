//! Operator semantics
//!
//! Every operand is a collection. Arithmetic and comparison single-ize: an
//! empty side makes the result empty, a side with more than one item is an
//! error. Equality additionally broadcasts a many-valued side against a
//! singleton, comparing element-wise. The three-valued
//! logical tables live in the compiler's short-circuit nodes; the helpers
//! they share live here.

use super::error::{EvaluationError, EvaluationResult};
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::evaluator::context::EvaluationContext;
use crate::model::{CalendarUnit, Collection, FhirPathType, Quantity, Value};
use crate::parser::span::Span;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

/// Wrap a three-valued result: `None` is the empty collection
pub fn three_valued(value: Option<bool>) -> Collection {
    match value {
        Some(b) => Collection::singleton(Value::Boolean(b)),
        None => Collection::empty(),
    }
}

/// Boolean operand of a logical operator, with FHIRPath singleton
/// evaluation: one boolean reads as itself, one item of any other type
/// reads as true, empty is unknown, more than one item is an error
pub fn boolean_operand(
    operand: &Collection,
    operator: &'static str,
    side: &'static str,
    span: Span,
) -> EvaluationResult<Option<bool>> {
    match operand.len() {
        0 => Ok(None),
        1 => Ok(Some(match operand.first() {
            Some(Value::Boolean(b)) => *b,
            _ => true,
        })),
        count => Err(EvaluationError::SingletonRequired {
            operator,
            side,
            count,
            span,
        }),
    }
}

/// Evaluate a non-short-circuit binary operator
pub fn binary(
    op: BinaryOperator,
    left: &Collection,
    right: &Collection,
    span: Span,
) -> EvaluationResult<Collection> {
    use BinaryOperator::*;
    match op {
        Equal => equality(left, right, false, span),
        NotEqual => equality(left, right, true, span),
        Equivalent => Ok(Collection::singleton(Value::Boolean(
            left.equivalent(right),
        ))),
        NotEquivalent => Ok(Collection::singleton(Value::Boolean(
            !left.equivalent(right),
        ))),
        LessThan => ordering(left, right, "<", span, |o| o == Ordering::Less),
        LessThanOrEqual => ordering(left, right, "<=", span, |o| o != Ordering::Greater),
        GreaterThan => ordering(left, right, ">", span, |o| o == Ordering::Greater),
        GreaterThanOrEqual => ordering(left, right, ">=", span, |o| o != Ordering::Less),
        Add => arithmetic(left, right, "+", span, add_values),
        Subtract => arithmetic(left, right, "-", span, subtract_values),
        Multiply => arithmetic(left, right, "*", span, multiply_values),
        Divide => arithmetic(left, right, "/", span, divide_values),
        IntegerDivide => arithmetic(left, right, "div", span, integer_divide_values),
        Modulo => arithmetic(left, right, "mod", span, modulo_values),
        Concatenate => concatenate(left, right, span),
        Union => Ok(union(left, right)),
        In => membership(left, right, "in", span),
        Contains => membership(right, left, "contains", span),
        And | Or | Xor | Implies => unreachable!("logical operators compile to dedicated nodes"),
    }
}

/// Evaluate unary `+` / `-`
pub fn unary(op: UnaryOperator, operand: &Collection, span: Span) -> EvaluationResult<Collection> {
    if operand.is_empty() {
        return Ok(Collection::empty());
    }
    let Some(item) = operand.as_singleton() else {
        return Err(EvaluationError::SingletonRequired {
            operator: op.as_str(),
            side: "right",
            count: operand.len(),
            span,
        });
    };
    let value = match (op, item) {
        (UnaryOperator::Plus, Value::Integer(_) | Value::Decimal(_) | Value::Quantity(_)) => {
            item.clone()
        }
        (UnaryOperator::Minus, Value::Integer(i)) => Value::Integer(
            i.checked_neg().ok_or(EvaluationError::InvalidOperation {
                message: "integer overflow".into(),
                span,
            })?,
        ),
        (UnaryOperator::Minus, Value::Decimal(d)) => Value::Decimal(-*d),
        (UnaryOperator::Minus, Value::Quantity(q)) => Value::Quantity(q.negate()),
        _ => {
            return Err(EvaluationError::TypeError {
                expected: "a number or quantity".into(),
                actual: item.type_name().to_string(),
                span,
            });
        }
    };
    Ok(Collection::singleton(value))
}

/// `=` / `!=` with the broadcasting rule: a many-valued side against a
/// singleton compares element-wise; items whose comparison is unknown are
/// dropped, and an unknown singleton comparison is empty
fn equality(
    left: &Collection,
    right: &Collection,
    negate: bool,
    _span: Span,
) -> EvaluationResult<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }

    let apply = |eq: Option<bool>| eq.map(|b| if negate { !b } else { b });

    let result = match (left.len(), right.len()) {
        (1, 1) => three_valued(apply(left.first().unwrap().equals(right.first().unwrap()))),
        (_, 1) => {
            let rhs = right.first().unwrap();
            left.iter()
                .filter_map(|item| apply(item.equals(rhs)))
                .map(Value::Boolean)
                .collect()
        }
        (1, _) => {
            let lhs = left.first().unwrap();
            right
                .iter()
                .filter_map(|item| apply(lhs.equals(item)))
                .map(Value::Boolean)
                .collect()
        }
        _ => three_valued(apply(left.equals(right))),
    };
    Ok(result)
}

/// Order comparison; unknown outcomes (precision, units) are empty
fn ordering(
    left: &Collection,
    right: &Collection,
    operator: &'static str,
    span: Span,
    accept: impl Fn(Ordering) -> bool,
) -> EvaluationResult<Collection> {
    let Some((l, r)) = singleton_pair(left, right, operator, span)? else {
        return Ok(Collection::empty());
    };
    let outcome = match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
        (Value::Decimal(a), Value::Integer(b)) => Some(a.cmp(&Decimal::from(*b))),
        // Lexicographic code-point order
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => a.compare(b),
        (Value::DateTime(a), Value::DateTime(b)) => a.compare(b),
        (Value::Time(a), Value::Time(b)) => a.compare(b),
        (Value::Quantity(a), Value::Quantity(b)) => a.compare(b),
        (a, b) => {
            return Err(EvaluationError::IncompatibleOperands {
                operator,
                left: a.type_name().to_string(),
                right: b.type_name().to_string(),
                span,
            });
        }
    };
    Ok(three_valued(outcome.map(accept)))
}

type ArithmeticRule =
    fn(&Value, &Value, &'static str, Span) -> EvaluationResult<Option<Value>>;

fn arithmetic(
    left: &Collection,
    right: &Collection,
    operator: &'static str,
    span: Span,
    rule: ArithmeticRule,
) -> EvaluationResult<Collection> {
    let Some((l, r)) = singleton_pair(left, right, operator, span)? else {
        return Ok(Collection::empty());
    };
    match rule(l, r, operator, span)? {
        Some(value) => Ok(Collection::singleton(value)),
        None => Ok(Collection::empty()),
    }
}

fn singleton_pair<'a>(
    left: &'a Collection,
    right: &'a Collection,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Option<(&'a Value, &'a Value)>> {
    if left.is_empty() || right.is_empty() {
        return Ok(None);
    }
    let l = left
        .as_singleton()
        .ok_or(EvaluationError::SingletonRequired {
            operator,
            side: "left",
            count: left.len(),
            span,
        })?;
    let r = right
        .as_singleton()
        .ok_or(EvaluationError::SingletonRequired {
            operator,
            side: "right",
            count: right.len(),
            span,
        })?;
    Ok(Some((l, r)))
}

fn incompatible(
    operator: &'static str,
    l: &Value,
    r: &Value,
    span: Span,
) -> EvaluationError {
    EvaluationError::IncompatibleOperands {
        operator,
        left: l.type_name().to_string(),
        right: r.type_name().to_string(),
        span,
    }
}

fn overflow(span: Span) -> EvaluationError {
    EvaluationError::InvalidOperation {
        message: "arithmetic overflow".into(),
        span,
    }
}

/// Whole-unit count of a calendar quantity, truncating toward zero
fn calendar_amount(q: &Quantity) -> Option<(CalendarUnit, i64)> {
    let unit = q.calendar_unit()?;
    Some((unit, q.value.trunc().to_i64()?))
}

fn add_values(
    l: &Value,
    r: &Value,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Option<Value>> {
    use Value::*;
    Ok(match (l, r) {
        (Integer(a), Integer(b)) => Some(Integer(a.checked_add(*b).ok_or_else(|| overflow(span))?)),
        (Integer(a), Decimal(b)) => Some(Decimal(
            rust_decimal::Decimal::from(*a).checked_add(*b).ok_or_else(|| overflow(span))?,
        )),
        (Decimal(a), Integer(b)) => Some(Decimal(
            a.checked_add(rust_decimal::Decimal::from(*b)).ok_or_else(|| overflow(span))?,
        )),
        (Decimal(a), Decimal(b)) => Some(Decimal(a.checked_add(*b).ok_or_else(|| overflow(span))?)),
        (String(a), String(b)) => Some(String(format!("{a}{b}"))),
        (Quantity(a), Quantity(b)) => a.checked_add(b).map(Quantity),
        (Date(d), Quantity(q)) | (Quantity(q), Date(d)) => {
            let (unit, amount) = calendar_amount(q).ok_or_else(|| incompatible(operator, l, r, span))?;
            if unit.is_sub_day() {
                return Err(incompatible(operator, l, r, span));
            }
            d.add(unit, amount).map(Date)
        }
        (DateTime(d), Quantity(q)) | (Quantity(q), DateTime(d)) => {
            let (unit, amount) = calendar_amount(q).ok_or_else(|| incompatible(operator, l, r, span))?;
            d.add(unit, amount).map(DateTime)
        }
        (Time(t), Quantity(q)) | (Quantity(q), Time(t)) => {
            let (unit, amount) = calendar_amount(q).ok_or_else(|| incompatible(operator, l, r, span))?;
            // Calendar units above hours make no sense on a bare time
            if !unit.is_sub_day() {
                return Err(incompatible(operator, l, r, span));
            }
            t.add(unit, amount).map(Time)
        }
        _ => return Err(incompatible(operator, l, r, span)),
    })
}

fn subtract_values(
    l: &Value,
    r: &Value,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Option<Value>> {
    use Value::*;
    Ok(match (l, r) {
        (Integer(a), Integer(b)) => Some(Integer(a.checked_sub(*b).ok_or_else(|| overflow(span))?)),
        (Integer(a), Decimal(b)) => Some(Decimal(
            rust_decimal::Decimal::from(*a).checked_sub(*b).ok_or_else(|| overflow(span))?,
        )),
        (Decimal(a), Integer(b)) => Some(Decimal(
            a.checked_sub(rust_decimal::Decimal::from(*b)).ok_or_else(|| overflow(span))?,
        )),
        (Decimal(a), Decimal(b)) => Some(Decimal(a.checked_sub(*b).ok_or_else(|| overflow(span))?)),
        (Quantity(a), Quantity(b)) => a.checked_sub(b).map(Quantity),
        (Date(d), Quantity(q)) => {
            let (unit, amount) = calendar_amount(q).ok_or_else(|| incompatible(operator, l, r, span))?;
            if unit.is_sub_day() {
                return Err(incompatible(operator, l, r, span));
            }
            d.add(unit, -amount).map(Date)
        }
        (DateTime(d), Quantity(q)) => {
            let (unit, amount) = calendar_amount(q).ok_or_else(|| incompatible(operator, l, r, span))?;
            d.add(unit, -amount).map(DateTime)
        }
        (Time(t), Quantity(q)) => {
            let (unit, amount) = calendar_amount(q).ok_or_else(|| incompatible(operator, l, r, span))?;
            if !unit.is_sub_day() {
                return Err(incompatible(operator, l, r, span));
            }
            t.add(unit, -amount).map(Time)
        }
        _ => return Err(incompatible(operator, l, r, span)),
    })
}

fn multiply_values(
    l: &Value,
    r: &Value,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Option<Value>> {
    use Value::*;
    Ok(match (l, r) {
        (Integer(a), Integer(b)) => Some(Integer(a.checked_mul(*b).ok_or_else(|| overflow(span))?)),
        (Integer(a), Decimal(b)) => Some(Decimal(
            rust_decimal::Decimal::from(*a).checked_mul(*b).ok_or_else(|| overflow(span))?,
        )),
        (Decimal(a), Integer(b)) => Some(Decimal(
            a.checked_mul(rust_decimal::Decimal::from(*b)).ok_or_else(|| overflow(span))?,
        )),
        (Decimal(a), Decimal(b)) => Some(Decimal(a.checked_mul(*b).ok_or_else(|| overflow(span))?)),
        (Quantity(q), Integer(n)) | (Integer(n), Quantity(q)) => {
            q.scale(rust_decimal::Decimal::from(*n)).map(Quantity)
        }
        (Quantity(q), Decimal(d)) | (Decimal(d), Quantity(q)) => q.scale(*d).map(Quantity),
        _ => return Err(incompatible(operator, l, r, span)),
    })
}

fn divide_values(
    l: &Value,
    r: &Value,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Option<Value>> {
    use Value::*;
    let as_decimal = |v: &Value| match v {
        Integer(i) => Some(rust_decimal::Decimal::from(*i)),
        Decimal(d) => Some(*d),
        _ => None,
    };
    match (l, r) {
        (Integer(_) | Decimal(_), Integer(_) | Decimal(_)) => {
            let a = as_decimal(l).unwrap();
            let b = as_decimal(r).unwrap();
            if b.is_zero() {
                return Err(EvaluationError::DivisionByZero { span });
            }
            Ok(a.checked_div(b).map(Decimal))
        }
        (Quantity(q), Integer(n)) => {
            if *n == 0 {
                return Err(EvaluationError::DivisionByZero { span });
            }
            Ok(q.divide(rust_decimal::Decimal::from(*n)).map(Quantity))
        }
        (Quantity(q), Decimal(d)) => {
            if d.is_zero() {
                return Err(EvaluationError::DivisionByZero { span });
            }
            Ok(q.divide(*d).map(Quantity))
        }
        _ => Err(incompatible(operator, l, r, span)),
    }
}

fn integer_divide_values(
    l: &Value,
    r: &Value,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Option<Value>> {
    use Value::*;
    match (l, r) {
        (Integer(a), Integer(b)) => {
            if *b == 0 {
                return Err(EvaluationError::DivisionByZero { span });
            }
            // Truncating division
            Ok(Some(Integer(a.checked_div(*b).ok_or_else(|| overflow(span))?)))
        }
        (Integer(_) | Decimal(_), Integer(_) | Decimal(_)) => {
            let a = to_decimal(l).unwrap();
            let b = to_decimal(r).unwrap();
            if b.is_zero() {
                return Err(EvaluationError::DivisionByZero { span });
            }
            let quotient = a.checked_div(b).map(|q| q.trunc());
            Ok(quotient.and_then(|q| q.to_i64()).map(Integer))
        }
        _ => Err(incompatible(operator, l, r, span)),
    }
}

fn modulo_values(
    l: &Value,
    r: &Value,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Option<Value>> {
    use Value::*;
    match (l, r) {
        (Integer(a), Integer(b)) => {
            if *b == 0 {
                return Err(EvaluationError::DivisionByZero { span });
            }
            Ok(Some(Integer(a.checked_rem(*b).ok_or_else(|| overflow(span))?)))
        }
        (Integer(_) | Decimal(_), Integer(_) | Decimal(_)) => {
            let a = to_decimal(l).unwrap();
            let b = to_decimal(r).unwrap();
            if b.is_zero() {
                return Err(EvaluationError::DivisionByZero { span });
            }
            Ok(a.checked_rem(b).map(Decimal))
        }
        _ => Err(incompatible(operator, l, r, span)),
    }
}

/// Numeric view of an integer or decimal item
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

/// `&`: string concatenation with empty coerced to the empty string
fn concatenate(
    left: &Collection,
    right: &Collection,
    span: Span,
) -> EvaluationResult<Collection> {
    let side = |c: &Collection, side: &'static str| -> EvaluationResult<String> {
        match c.len() {
            0 => Ok(String::new()),
            1 => match c.first() {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(EvaluationError::TypeError {
                    expected: "a string".into(),
                    actual: other.type_name().to_string(),
                    span,
                }),
                None => unreachable!(),
            },
            count => Err(EvaluationError::SingletonRequired {
                operator: "&",
                side,
                count,
                span,
            }),
        }
    };
    let combined = format!("{}{}", side(left, "left")?, side(right, "right")?);
    Ok(Collection::singleton(Value::String(combined)))
}

/// `|`: union with duplicates removed by FHIRPath equality, first
/// occurrence order preserved
pub fn union(left: &Collection, right: &Collection) -> Collection {
    let mut items: Vec<Value> = Vec::with_capacity(left.len() + right.len());
    for item in left.iter().chain(right.iter()) {
        if !items.iter().any(|kept| kept.equals(item) == Some(true)) {
            items.push(item.clone());
        }
    }
    Collection::from_vec(items)
}

/// `in` (and, with sides swapped, `contains`)
fn membership(
    needle: &Collection,
    haystack: &Collection,
    operator: &'static str,
    span: Span,
) -> EvaluationResult<Collection> {
    if needle.is_empty() {
        return Ok(Collection::empty());
    }
    let item = needle
        .as_singleton()
        .ok_or(EvaluationError::SingletonRequired {
            operator,
            side: "left",
            count: needle.len(),
            span,
        })?;
    Ok(Collection::singleton(Value::Boolean(
        haystack.contains_value(item),
    )))
}

/// Indexer: out-of-range and empty indices yield empty; negative indices
/// count from the end
pub fn index(
    input: &Collection,
    index: &Collection,
    span: Span,
) -> EvaluationResult<Collection> {
    if index.is_empty() {
        return Ok(Collection::empty());
    }
    let idx = match index.as_singleton() {
        Some(Value::Integer(i)) => *i,
        Some(other) => {
            return Err(EvaluationError::TypeError {
                expected: "an integer index".into(),
                actual: other.type_name().to_string(),
                span,
            });
        }
        None => {
            return Err(EvaluationError::SingletonRequired {
                operator: "[]",
                side: "right",
                count: index.len(),
                span,
            });
        }
    };
    let effective = if idx < 0 { input.len() as i64 + idx } else { idx };
    if effective < 0 {
        return Ok(Collection::empty());
    }
    Ok(input
        .get(effective as usize)
        .map(|v| Collection::singleton(v.clone()))
        .unwrap_or_default())
}

/// Static type of a runtime item, for `is`/`as`
fn value_type(value: &Value) -> FhirPathType {
    match value {
        Value::Boolean(_) => FhirPathType::Boolean,
        Value::Integer(_) => FhirPathType::Integer,
        Value::Decimal(_) => FhirPathType::Decimal,
        Value::String(_) => FhirPathType::String,
        Value::Date(_) => FhirPathType::Date,
        Value::DateTime(_) => FhirPathType::DateTime,
        Value::Time(_) => FhirPathType::Time,
        Value::Quantity(_) => FhirPathType::Quantity,
        Value::Resource(r) => {
            FhirPathType::Resource(r.resource_type().unwrap_or("Resource").to_string())
        }
    }
}

/// Does one item match a written type name? Consults the model provider for
/// resource types when one is configured.
fn matches_type(
    ctx: &EvaluationContext,
    value: &Value,
    type_name: &str,
    span: Span,
) -> EvaluationResult<bool> {
    let bare = type_name
        .strip_prefix("System.")
        .or_else(|| type_name.strip_prefix("FHIR."))
        .unwrap_or(type_name);

    if let Some(expected) = FhirPathType::from_type_name(bare) {
        if value_type(value).is_subtype_of(&expected) {
            return Ok(true);
        }
        // Names like Quantity double as FHIR datatypes; a resource-shaped
        // value still gets the declared-type comparison below
        if !matches!(value, Value::Resource(_)) {
            return Ok(false);
        }
    }

    match value {
        Value::Resource(r) => {
            let actual = r.resource_type().unwrap_or("Resource");
            match &ctx.model {
                Some(provider) => provider
                    .is_subtype_of(actual, bare)
                    .map_err(|source| EvaluationError::Model { source, span }),
                None => Ok(actual == bare || bare == "Resource" || bare == "DomainResource"),
            }
        }
        _ => Ok(false),
    }
}

/// `is`: one boolean per input item
pub fn type_test(
    ctx: &EvaluationContext,
    input: &Collection,
    type_name: &str,
    span: Span,
) -> EvaluationResult<Collection> {
    let mut results = Vec::with_capacity(input.len());
    for item in input.iter() {
        results.push(Value::Boolean(matches_type(ctx, item, type_name, span)?));
    }
    Ok(Collection::from_vec(results))
}

/// `as` / `ofType`: keep the items matching the type
pub fn type_filter(
    ctx: &EvaluationContext,
    input: &Collection,
    type_name: &str,
    span: Span,
) -> EvaluationResult<Collection> {
    let mut kept = Vec::new();
    for item in input.iter() {
        if matches_type(ctx, item, type_name, span)? {
            kept.push(item.clone());
        }
    }
    Ok(Collection::from_vec(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ints(values: &[i64]) -> Collection {
        values.iter().copied().map(Value::Integer).collect()
    }

    fn span() -> Span {
        Span::new(0, 1)
    }

    #[test]
    fn test_empty_propagation() {
        let empty = Collection::empty();
        let one = ints(&[1]);
        for op in [
            BinaryOperator::Add,
            BinaryOperator::LessThan,
            BinaryOperator::Equal,
        ] {
            assert!(binary(op, &empty, &one, span()).unwrap().is_empty());
            assert!(binary(op, &one, &empty, span()).unwrap().is_empty());
        }
    }

    #[test]
    fn test_equality_broadcast() {
        let ages = ints(&[25, 30, 35]);
        let thirty = ints(&[30]);
        let result = binary(BinaryOperator::Equal, &ages, &thirty, span()).unwrap();
        let expected: Vec<Value> = [false, true, false].iter().map(|b| Value::Boolean(*b)).collect();
        assert_eq!(result.to_vec(), expected);
    }

    #[test]
    fn test_singleton_enforcement() {
        let many = ints(&[1, 2]);
        let one = ints(&[1]);
        assert!(matches!(
            binary(BinaryOperator::Add, &many, &one, span()),
            Err(EvaluationError::SingletonRequired { .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        let ten = ints(&[10]);
        let zero = ints(&[0]);
        for op in [
            BinaryOperator::Divide,
            BinaryOperator::IntegerDivide,
            BinaryOperator::Modulo,
        ] {
            assert!(matches!(
                binary(op, &ten, &zero, span()),
                Err(EvaluationError::DivisionByZero { .. })
            ));
        }
    }

    #[test]
    fn test_div_and_mod_truncate() {
        let result = binary(BinaryOperator::IntegerDivide, &ints(&[-7]), &ints(&[2]), span())
            .unwrap();
        assert_eq!(result.to_vec(), vec![Value::Integer(-3)]);
        let result = binary(BinaryOperator::Modulo, &ints(&[-7]), &ints(&[2]), span()).unwrap();
        assert_eq!(result.to_vec(), vec![Value::Integer(-1)]);
    }

    #[test]
    fn test_integer_division_promotes_to_decimal() {
        let result = binary(BinaryOperator::Divide, &ints(&[7]), &ints(&[2]), span()).unwrap();
        assert_eq!(
            result.to_vec(),
            vec![Value::Decimal(Decimal::from_str("3.5").unwrap())]
        );
    }

    #[test]
    fn test_union_dedups_by_equality() {
        let a = Collection::from_vec(vec![
            Value::String("John".into()),
            Value::String("Jane".into()),
        ]);
        let b = Collection::from_vec(vec![
            Value::String("Bob".into()),
            Value::String("John".into()),
        ]);
        let result = union(&a, &b);
        assert_eq!(result.len(), 3);
        assert_eq!(result.get(2), Some(&Value::String("Bob".into())));
    }

    #[test]
    fn test_concat_coerces_empty() {
        let empty = Collection::empty();
        let s = Collection::singleton(Value::String("x".into()));
        let result = binary(BinaryOperator::Concatenate, &empty, &s, span()).unwrap();
        assert_eq!(result.to_vec(), vec![Value::String("x".into())]);
    }

    #[test]
    fn test_membership() {
        let needle = ints(&[2]);
        let haystack = ints(&[1, 2, 3]);
        let result = binary(BinaryOperator::In, &needle, &haystack, span()).unwrap();
        assert_eq!(result.as_boolean(), Some(true));
        let result = binary(BinaryOperator::Contains, &haystack, &needle, span()).unwrap();
        assert_eq!(result.as_boolean(), Some(true));
    }

    #[test]
    fn test_date_plus_months_clamps() {
        let date = Collection::singleton(Value::Date(
            crate::model::Date::parse("2020-01-31").unwrap(),
        ));
        let one_month = Collection::singleton(Value::Quantity(Quantity::new(
            Decimal::from(1),
            Some("month".into()),
        )));
        let result = binary(BinaryOperator::Add, &date, &one_month, span()).unwrap();
        assert_eq!(result.as_singleton().unwrap().to_string(), "2020-02-29");
    }

    #[test]
    fn test_time_plus_calendar_unit_fails() {
        let time = Collection::singleton(Value::Time(crate::model::Time::parse("10:30").unwrap()));
        let one_month = Collection::singleton(Value::Quantity(Quantity::new(
            Decimal::from(1),
            Some("month".into()),
        )));
        assert!(binary(BinaryOperator::Add, &time, &one_month, span()).is_err());
    }

    #[test]
    fn test_quantity_unit_mismatch_is_empty() {
        let mg = Collection::singleton(Value::Quantity(Quantity::new(
            Decimal::from(5),
            Some("mg".into()),
        )));
        let kg = Collection::singleton(Value::Quantity(Quantity::new(
            Decimal::from(5),
            Some("kg".into()),
        )));
        assert!(binary(BinaryOperator::LessThan, &mg, &kg, span()).unwrap().is_empty());
        assert!(binary(BinaryOperator::Add, &mg, &kg, span()).unwrap().is_empty());
    }
}
