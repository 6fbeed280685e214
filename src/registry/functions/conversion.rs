//! Conversions: toX and convertsToX families

use super::super::function::{
    FunctionContext, FunctionRegistry, FunctionResult, FunctionSignature,
};
use super::expect_singleton;
use crate::compiler::parse_decimal;
use crate::model::{
    Cardinality, Collection, Date, DateTime, FhirPathType, Quantity, Time, Value,
};
use rust_decimal::Decimal;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    conversion_pair(registry, "toInteger", "convertsToInteger", FhirPathType::Integer, to_integer);
    conversion_pair(registry, "toDecimal", "convertsToDecimal", FhirPathType::Decimal, to_decimal);
    conversion_pair(registry, "toString", "convertsToString", FhirPathType::String, to_string);
    conversion_pair(registry, "toBoolean", "convertsToBoolean", FhirPathType::Boolean, to_boolean);
    conversion_pair(registry, "toDate", "convertsToDate", FhirPathType::Date, to_date);
    conversion_pair(registry, "toDateTime", "convertsToDateTime", FhirPathType::DateTime, to_datetime);
    conversion_pair(registry, "toTime", "convertsToTime", FhirPathType::Time, to_time);
    conversion_pair(registry, "toQuantity", "convertsToQuantity", FhirPathType::Quantity, to_quantity);
}

type ConvertFn = fn(&Value) -> Option<Value>;

/// Register a `toX` and its `convertsToX` probe from one conversion rule
fn conversion_pair(
    registry: &mut FunctionRegistry,
    to_name: &'static str,
    converts_name: &'static str,
    return_type: FhirPathType,
    convert: ConvertFn,
) {
    registry.register_eager(
        FunctionSignature::nullary(to_name, return_type.clone())
            .with_cardinality(Cardinality::Optional),
        move |fc: &FunctionContext<'_>, _: &[Collection]| -> FunctionResult<Collection> {
            match expect_singleton(to_name, fc.input)? {
                None => Ok(Collection::empty()),
                Some(value) => Ok(convert(value)
                    .map(Collection::singleton)
                    .unwrap_or_default()),
            }
        },
    );
    registry.register_eager(
        FunctionSignature::nullary(converts_name, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Optional),
        move |fc: &FunctionContext<'_>, _: &[Collection]| -> FunctionResult<Collection> {
            match expect_singleton(converts_name, fc.input)? {
                None => Ok(Collection::empty()),
                Some(value) => Ok(Collection::singleton(Value::Boolean(
                    convert(value).is_some(),
                ))),
            }
        },
    );
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(i) => Some(Value::Integer(*i)),
        Value::Boolean(b) => Some(Value::Integer(i64::from(*b))),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::Integer),
        _ => None,
    }
}

fn to_decimal(value: &Value) -> Option<Value> {
    match value {
        Value::Decimal(d) => Some(Value::Decimal(*d)),
        Value::Integer(i) => Some(Value::Decimal(Decimal::from(*i))),
        Value::Boolean(b) => Some(Value::Decimal(Decimal::from(i64::from(*b)))),
        Value::String(s) => parse_decimal(s.trim()).map(Value::Decimal),
        _ => None,
    }
}

fn to_string(value: &Value) -> Option<Value> {
    match value {
        Value::Resource(_) => None,
        other => Some(Value::String(other.to_string())),
    }
}

fn to_boolean(value: &Value) -> Option<Value> {
    let b = match value {
        Value::Boolean(b) => *b,
        Value::Integer(1) => true,
        Value::Integer(0) => false,
        Value::Decimal(d) if *d == Decimal::ONE => true,
        Value::Decimal(d) if d.is_zero() => false,
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => true,
            "false" | "f" | "no" | "n" | "0" | "0.0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Boolean(b))
}

fn to_date(value: &Value) -> Option<Value> {
    match value {
        Value::Date(d) => Some(Value::Date(*d)),
        Value::DateTime(dt) => Some(Value::Date(Date {
            date: dt.datetime.date(),
            precision: dt.precision.min(crate::model::TemporalPrecision::Day),
        })),
        Value::String(s) => Date::parse(s).map(Value::Date),
        _ => None,
    }
}

fn to_datetime(value: &Value) -> Option<Value> {
    match value {
        Value::DateTime(dt) => Some(Value::DateTime(*dt)),
        Value::Date(d) => Some(Value::DateTime(DateTime {
            datetime: d.date.and_hms_opt(0, 0, 0)?,
            offset: None,
            precision: d.precision,
        })),
        Value::String(s) => DateTime::parse(s).map(Value::DateTime),
        _ => None,
    }
}

fn to_time(value: &Value) -> Option<Value> {
    match value {
        Value::Time(t) => Some(Value::Time(*t)),
        Value::String(s) => Time::parse(s.strip_prefix('T').unwrap_or(s)).map(Value::Time),
        _ => None,
    }
}

fn to_quantity(value: &Value) -> Option<Value> {
    match value {
        Value::Quantity(q) => Some(Value::Quantity(q.clone())),
        Value::Integer(i) => Some(Value::Quantity(Quantity::unitless(Decimal::from(*i)))),
        Value::Decimal(d) => Some(Value::Quantity(Quantity::unitless(*d))),
        Value::Boolean(b) => Some(Value::Quantity(Quantity::unitless(Decimal::from(
            i64::from(*b),
        )))),
        Value::String(s) => parse_quantity_text(s),
        _ => None,
    }
}

/// Parse `5`, `5 mg`, `4.5 'mg'` or `3 days` text forms
fn parse_quantity_text(text: &str) -> Option<Value> {
    let text = text.trim();
    let (number, unit) = match text.split_once(char::is_whitespace) {
        Some((n, u)) => (n, Some(u.trim())),
        None => (text, None),
    };
    let value = parse_decimal(number)?;
    let unit = match unit {
        None => None,
        Some(u) => {
            let stripped = u.strip_prefix('\'').and_then(|u| u.strip_suffix('\'')).unwrap_or(u);
            if stripped.is_empty() {
                return None;
            }
            Some(stripped.to_string())
        }
    };
    Some(Value::Quantity(Quantity::new(value, unit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversions() {
        assert_eq!(
            to_integer(&Value::String(" 42 ".into())),
            Some(Value::Integer(42))
        );
        assert_eq!(to_integer(&Value::String("4.2".into())), None);
        assert!(matches!(
            to_boolean(&Value::String("YES".into())),
            Some(Value::Boolean(true))
        ));
    }

    #[test]
    fn test_decimal_does_not_narrow_to_integer() {
        assert_eq!(to_integer(&Value::Decimal(Decimal::from(3))), None);
    }

    #[test]
    fn test_quantity_text_forms() {
        assert!(matches!(
            parse_quantity_text("4.5 'mg'"),
            Some(Value::Quantity(q)) if q.unit.as_deref() == Some("mg")
        ));
        assert!(matches!(
            parse_quantity_text("3 days"),
            Some(Value::Quantity(q)) if q.unit.as_deref() == Some("days")
        ));
        assert!(parse_quantity_text("not a number").is_none());
    }
}
