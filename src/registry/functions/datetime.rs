//! Clock functions: now, today, timeOfDay

use super::super::function::{FunctionRegistry, FunctionSignature};
use crate::model::{Cardinality, Collection, Date, DateTime, FhirPathType, TemporalPrecision, Time, Value};
use chrono::{Local, Offset};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_eager(
        FunctionSignature::nullary("now", FhirPathType::DateTime)
            .with_cardinality(Cardinality::Single),
        |_, _| {
            let now = Local::now();
            Ok(Collection::singleton(Value::DateTime(DateTime {
                datetime: now.naive_local(),
                offset: Some(now.offset().fix()),
                precision: TemporalPrecision::Millisecond,
            })))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("today", FhirPathType::Date)
            .with_cardinality(Cardinality::Single),
        |_, _| {
            Ok(Collection::singleton(Value::Date(Date {
                date: Local::now().date_naive(),
                precision: TemporalPrecision::Day,
            })))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("timeOfDay", FhirPathType::Time)
            .with_cardinality(Cardinality::Single),
        |_, _| {
            Ok(Collection::singleton(Value::Time(Time {
                time: Local::now().time(),
                precision: TemporalPrecision::Millisecond,
            })))
        },
    );
}
