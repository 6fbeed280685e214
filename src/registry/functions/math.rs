//! Numeric functions
//!
//! Transcendental functions (`sqrt`, `ln`, `log`, `exp`, `power`) go
//! through f64 and come back to decimals; domain errors yield empty rather
//! than failing, per the FHIRPath math appendix.

use super::super::function::{
    FunctionError, FunctionRegistry, FunctionResult, FunctionSignature,
};
use super::{expect_singleton, opt_arg_integer};
use crate::evaluator::operations::to_decimal;
use crate::model::{
    Cardinality, Collection, Date, DateTime, FhirPathType, Quantity, TemporalPrecision, Time,
    Value,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

fn numeric_input(name: &str, input: &Collection) -> FunctionResult<Option<Value>> {
    match expect_singleton(name, input)? {
        None => Ok(None),
        Some(v @ (Value::Integer(_) | Value::Decimal(_) | Value::Quantity(_))) => {
            Ok(Some(v.clone()))
        }
        Some(other) => Err(FunctionError::InvalidInput {
            name: name.to_string(),
            message: format!("expected a number, got {}", other.type_name()),
        }),
    }
}

/// Run an f64 computation over a numeric singleton; NaN/infinite results
/// become empty
fn float_unary(
    name: &'static str,
    input: &Collection,
    f: impl Fn(f64) -> f64,
) -> FunctionResult<Collection> {
    let Some(value) = numeric_input(name, input)? else {
        return Ok(Collection::empty());
    };
    let Some(x) = to_decimal(&value).and_then(|d| d.to_f64()) else {
        return Ok(Collection::empty());
    };
    let result = f(x);
    Ok(if result.is_finite() {
        Decimal::from_f64(result)
            .map(|d| Collection::singleton(Value::Decimal(d.normalize())))
            .unwrap_or_default()
    } else {
        Collection::empty()
    })
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_eager(
        FunctionSignature::nullary("abs", FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(match numeric_input("abs", fc.input)? {
                None => Collection::empty(),
                Some(Value::Integer(i)) => Collection::singleton(Value::Integer(i.abs())),
                Some(Value::Decimal(d)) => Collection::singleton(Value::Decimal(d.abs())),
                Some(Value::Quantity(q)) => Collection::singleton(Value::Quantity(Quantity {
                    value: q.value.abs(),
                    unit: q.unit,
                })),
                Some(_) => unreachable!(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("ceiling", FhirPathType::Integer)
            .with_cardinality(Cardinality::Optional),
        |fc, _| rounding(fc.input, "ceiling", Decimal::ceil),
    );

    registry.register_eager(
        FunctionSignature::nullary("floor", FhirPathType::Integer)
            .with_cardinality(Cardinality::Optional),
        |fc, _| rounding(fc.input, "floor", Decimal::floor),
    );

    registry.register_eager(
        FunctionSignature::optional_values("round", 0, 1, FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(value) = numeric_input("round", fc.input)? else {
                return Ok(Collection::empty());
            };
            let Some(d) = to_decimal(&value) else {
                return Ok(Collection::empty());
            };
            let precision = opt_arg_integer("round", args, 0)?.unwrap_or(0);
            if precision < 0 {
                return Err(FunctionError::InvalidArgument {
                    name: "round".into(),
                    index: 0,
                    message: "precision must not be negative".into(),
                });
            }
            Ok(Collection::singleton(Value::Decimal(
                d.round_dp(precision as u32),
            )))
        },
    );

    registry.register_eager(
        FunctionSignature::optional_values("truncate", 0, 1, FhirPathType::Integer)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(value) = numeric_input("truncate", fc.input)? else {
                return Ok(Collection::empty());
            };
            let Some(d) = to_decimal(&value) else {
                return Ok(Collection::empty());
            };
            Ok(match opt_arg_integer("truncate", args, 0)? {
                Some(precision) if precision >= 0 => {
                    Collection::singleton(Value::Decimal(d.trunc_with_scale(precision as u32)))
                }
                _ => d
                    .trunc()
                    .to_i64()
                    .map(|i| Collection::singleton(Value::Integer(i)))
                    .unwrap_or_default(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("sqrt", FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, _| float_unary("sqrt", fc.input, f64::sqrt),
    );

    registry.register_eager(
        FunctionSignature::nullary("ln", FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, _| float_unary("ln", fc.input, f64::ln),
    );

    registry.register_eager(
        FunctionSignature::nullary("exp", FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, _| float_unary("exp", fc.input, f64::exp),
    );

    registry.register_eager(
        FunctionSignature::optional_values("log", 0, 1, FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let base = match args.first().and_then(Collection::as_singleton) {
                Some(v) => to_decimal(v).and_then(|d| d.to_f64()).unwrap_or(10.0),
                None => 10.0,
            };
            float_unary("log", fc.input, |x| x.log(base))
        },
    );

    registry.register_eager(
        FunctionSignature::values("power", 1, FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let exponent_value = args[0].as_singleton().cloned();
            let Some(exponent) = exponent_value.as_ref().and_then(to_decimal) else {
                return Ok(Collection::empty());
            };
            let integral_inputs = matches!(
                (fc.input.first(), exponent_value.as_ref()),
                (Some(Value::Integer(_)), Some(Value::Integer(_)))
            );
            let result = float_unary("power", fc.input, |x| {
                x.powf(exponent.to_f64().unwrap_or(f64::NAN))
            })?;
            // Integer base and exponent keep an integer result when exact
            if integral_inputs {
                if let Some(Value::Decimal(d)) = result.as_singleton() {
                    if d.fract().is_zero() {
                        if let Some(i) = d.to_i64() {
                            return Ok(Collection::singleton(Value::Integer(i)));
                        }
                    }
                }
            }
            Ok(result)
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("precision", FhirPathType::Integer)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(match expect_singleton("precision", fc.input)? {
                None => Collection::empty(),
                Some(value) => precision_of(value)
                    .map(|p| Collection::singleton(Value::Integer(p)))
                    .unwrap_or_default(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("lowBoundary", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| boundary(fc.input, "lowBoundary", false),
    );

    registry.register_eager(
        FunctionSignature::nullary("highBoundary", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| boundary(fc.input, "highBoundary", true),
    );

    registry.register_eager(
        FunctionSignature::nullary("sum", FhirPathType::Decimal)
            .with_cardinality(Cardinality::Single),
        |fc, _| aggregate_numeric(fc.input, "sum", Aggregate::Sum),
    );

    registry.register_eager(
        FunctionSignature::nullary("avg", FhirPathType::Decimal)
            .with_cardinality(Cardinality::Optional),
        |fc, _| aggregate_numeric(fc.input, "avg", Aggregate::Avg),
    );

    registry.register_eager(
        FunctionSignature::nullary("min", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| extremum(fc.input, "min", std::cmp::Ordering::Less),
    );

    registry.register_eager(
        FunctionSignature::nullary("max", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| extremum(fc.input, "max", std::cmp::Ordering::Greater),
    );
}

fn rounding(
    input: &Collection,
    name: &'static str,
    f: impl Fn(&Decimal) -> Decimal,
) -> FunctionResult<Collection> {
    let Some(value) = numeric_input(name, input)? else {
        return Ok(Collection::empty());
    };
    let Some(d) = to_decimal(&value) else {
        return Ok(Collection::empty());
    };
    Ok(f(&d)
        .to_i64()
        .map(|i| Collection::singleton(Value::Integer(i)))
        .unwrap_or_default())
}

/// Number of significant digits of a decimal, or digits of a temporal value
fn precision_of(value: &Value) -> Option<i64> {
    match value {
        Value::Decimal(d) => {
            let digits: i64 = d
                .abs()
                .to_string()
                .chars()
                .filter(char::is_ascii_digit)
                .count() as i64;
            Some(digits)
        }
        Value::Integer(i) => Some(i.abs().to_string().len() as i64),
        Value::Date(d) => Some(match d.precision {
            TemporalPrecision::Year => 4,
            TemporalPrecision::Month => 6,
            _ => 8,
        }),
        Value::DateTime(dt) => Some(match dt.precision {
            TemporalPrecision::Year => 4,
            TemporalPrecision::Month => 6,
            TemporalPrecision::Day => 8,
            TemporalPrecision::Hour => 10,
            TemporalPrecision::Minute => 12,
            TemporalPrecision::Second => 14,
            TemporalPrecision::Millisecond => 17,
        }),
        Value::Time(t) => Some(match t.precision {
            TemporalPrecision::Hour => 2,
            TemporalPrecision::Minute => 4,
            TemporalPrecision::Second => 6,
            _ => 9,
        }),
        _ => None,
    }
}

/// Range boundaries of imprecise values: half an ulp for decimals, the
/// first/last covered instant for partial dates and times
fn boundary(input: &Collection, name: &str, high: bool) -> FunctionResult<Collection> {
    let Some(value) = expect_singleton(name, input)? else {
        return Ok(Collection::empty());
    };
    let result = match value {
        Value::Integer(i) => Some(Value::Integer(*i)),
        Value::Decimal(d) => Some(Value::Decimal(decimal_boundary(*d, high))),
        Value::Quantity(q) => Some(Value::Quantity(Quantity {
            value: decimal_boundary(q.value, high),
            unit: q.unit.clone(),
        })),
        Value::Date(d) => date_boundary(d, high).map(Value::Date),
        Value::DateTime(dt) => datetime_boundary(dt, high).map(Value::DateTime),
        Value::Time(t) => time_boundary(t, high).map(Value::Time),
        _ => None,
    };
    Ok(result.map(Collection::singleton).unwrap_or_default())
}

fn decimal_boundary(d: Decimal, high: bool) -> Decimal {
    let half_ulp = Decimal::new(5, d.scale() + 1);
    if high { d + half_ulp } else { d - half_ulp }
}

fn date_boundary(d: &Date, high: bool) -> Option<Date> {
    let mut widened = *d;
    while widened.precision < TemporalPrecision::Day {
        let next = match widened.precision {
            TemporalPrecision::Year => TemporalPrecision::Month,
            _ => TemporalPrecision::Day,
        };
        widened = if high {
            // Last covered instant: step to the next period and back one unit
            let unit = match widened.precision {
                TemporalPrecision::Year => crate::model::CalendarUnit::Year,
                _ => crate::model::CalendarUnit::Month,
            };
            let mut stepped = widened.add(unit, 1)?;
            stepped.precision = next;
            let back = match next {
                TemporalPrecision::Month => crate::model::CalendarUnit::Month,
                _ => crate::model::CalendarUnit::Day,
            };
            let mut result = stepped.add(back, -1)?;
            // Clamp to the true end of the period
            if next == TemporalPrecision::Day {
                result = Date {
                    date: last_day_of_month(result.date)?,
                    precision: next,
                };
            }
            result
        } else {
            Date {
                date: widened.date,
                precision: next,
            }
        };
    }
    Some(widened)
}

fn last_day_of_month(date: chrono::NaiveDate) -> Option<chrono::NaiveDate> {
    use chrono::Datelike;
    let (year, month) = (date.year(), date.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn datetime_boundary(dt: &DateTime, high: bool) -> Option<DateTime> {
    if dt.precision >= TemporalPrecision::Millisecond {
        return Some(*dt);
    }
    let date = Date {
        date: dt.datetime.date(),
        precision: dt.precision.min(TemporalPrecision::Day),
    };
    let bounded_date = if dt.precision < TemporalPrecision::Day {
        date_boundary(&date, high)?.date
    } else {
        date.date
    };
    let time = if high {
        match dt.precision {
            TemporalPrecision::Hour => chrono::NaiveTime::from_hms_milli_opt(
                chrono::Timelike::hour(&dt.datetime.time()),
                59,
                59,
                999,
            )?,
            TemporalPrecision::Minute => chrono::NaiveTime::from_hms_milli_opt(
                chrono::Timelike::hour(&dt.datetime.time()),
                chrono::Timelike::minute(&dt.datetime.time()),
                59,
                999,
            )?,
            TemporalPrecision::Second => chrono::NaiveTime::from_hms_milli_opt(
                chrono::Timelike::hour(&dt.datetime.time()),
                chrono::Timelike::minute(&dt.datetime.time()),
                chrono::Timelike::second(&dt.datetime.time()),
                999,
            )?,
            _ => chrono::NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?,
        }
    } else if dt.precision <= TemporalPrecision::Day {
        chrono::NaiveTime::from_hms_opt(0, 0, 0)?
    } else {
        dt.datetime.time()
    };
    Some(DateTime {
        datetime: bounded_date.and_time(time),
        offset: dt.offset,
        precision: TemporalPrecision::Millisecond,
    })
}

fn time_boundary(t: &Time, high: bool) -> Option<Time> {
    use chrono::Timelike;
    if t.precision >= TemporalPrecision::Millisecond {
        return Some(*t);
    }
    let time = if high {
        match t.precision {
            TemporalPrecision::Hour => {
                chrono::NaiveTime::from_hms_milli_opt(t.time.hour(), 59, 59, 999)?
            }
            TemporalPrecision::Minute => {
                chrono::NaiveTime::from_hms_milli_opt(t.time.hour(), t.time.minute(), 59, 999)?
            }
            _ => chrono::NaiveTime::from_hms_milli_opt(
                t.time.hour(),
                t.time.minute(),
                t.time.second(),
                999,
            )?,
        }
    } else {
        t.time
    };
    Some(Time {
        time,
        precision: TemporalPrecision::Millisecond,
    })
}

enum Aggregate {
    Sum,
    Avg,
}

fn aggregate_numeric(
    input: &Collection,
    name: &str,
    kind: Aggregate,
) -> FunctionResult<Collection> {
    if input.is_empty() {
        return Ok(match kind {
            // The sum of nothing is zero; the average of nothing is unknown
            Aggregate::Sum => Collection::singleton(Value::Integer(0)),
            Aggregate::Avg => Collection::empty(),
        });
    }
    let mut total = Decimal::ZERO;
    let mut all_integers = true;
    for item in input.iter() {
        match item {
            Value::Integer(i) => total += Decimal::from(*i),
            Value::Decimal(d) => {
                all_integers = false;
                total += *d;
            }
            other => {
                return Err(FunctionError::InvalidInput {
                    name: name.to_string(),
                    message: format!("expected numbers, got {}", other.type_name()),
                });
            }
        }
    }
    let result = match kind {
        Aggregate::Sum => {
            if all_integers {
                total
                    .to_i64()
                    .map(Value::Integer)
                    .unwrap_or(Value::Decimal(total))
            } else {
                Value::Decimal(total)
            }
        }
        Aggregate::Avg => Value::Decimal(
            total
                .checked_div(Decimal::from(input.len()))
                .unwrap_or(Decimal::ZERO),
        ),
    };
    Ok(Collection::singleton(result))
}

fn extremum(
    input: &Collection,
    name: &str,
    keep: std::cmp::Ordering,
) -> FunctionResult<Collection> {
    let mut best: Option<&Value> = None;
    for item in input.iter() {
        best = match best {
            None => Some(item),
            Some(current) => {
                let ordering = compare_orderable(current, item).ok_or_else(|| {
                    FunctionError::InvalidInput {
                        name: name.to_string(),
                        message: format!(
                            "cannot order {} against {}",
                            current.type_name(),
                            item.type_name()
                        ),
                    }
                })?;
                if ordering == keep.reverse() { Some(item) } else { Some(current) }
            }
        };
    }
    Ok(best
        .map(|v| Collection::singleton(v.clone()))
        .unwrap_or_default())
}

fn compare_orderable(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    use Value::*;
    match (a, b) {
        (Integer(x), Integer(y)) => Some(x.cmp(y)),
        (Integer(_) | Decimal(_), Integer(_) | Decimal(_)) => {
            Some(to_decimal(a)?.cmp(&to_decimal(b)?))
        }
        (String(x), String(y)) => Some(x.cmp(y)),
        (Date(x), Date(y)) => x.compare(y),
        (DateTime(x), DateTime(y)) => x.compare(y),
        (Time(x), Time(y)) => x.compare(y),
        (Quantity(x), Quantity(y)) => x.compare(y),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decimal_boundaries() {
        let d = Decimal::from_str("1.587").unwrap();
        assert_eq!(decimal_boundary(d, false).to_string(), "1.5865");
        assert_eq!(decimal_boundary(d, true).to_string(), "1.5875");
    }

    #[test]
    fn test_date_boundaries() {
        let month = Date::parse("2020-02").unwrap();
        assert_eq!(date_boundary(&month, false).unwrap().to_string(), "2020-02-01");
        assert_eq!(date_boundary(&month, true).unwrap().to_string(), "2020-02-29");
    }

    #[test]
    fn test_precision_counts() {
        assert_eq!(
            precision_of(&Value::Decimal(Decimal::from_str("1.58700").unwrap())),
            Some(6)
        );
        assert_eq!(precision_of(&Value::Date(Date::parse("2014").unwrap())), Some(4));
    }
}
