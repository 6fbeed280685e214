//! Subsetting: first, last, tail, skip, take, single, distinct,
//! isDistinct, count, slice

use super::super::function::{FunctionError, FunctionRegistry, FunctionSignature};
use super::arg_integer;
use crate::model::{Cardinality, Collection, FhirPathType, Value};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_eager(
        FunctionSignature::nullary("first", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| Ok(subrange(fc.input, 0, 1)),
    );

    registry.register_eager(
        FunctionSignature::nullary("last", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(fc
                .input
                .last()
                .map(|v| Collection::singleton(v.clone()))
                .unwrap_or_default())
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("tail", FhirPathType::Any),
        |fc, _| Ok(subrange(fc.input, 1, usize::MAX)),
    );

    registry.register_eager(
        FunctionSignature::values("skip", 1, FhirPathType::Any),
        |fc, args| {
            let n = arg_integer("skip", args, 0)?.max(0) as usize;
            Ok(subrange(fc.input, n, usize::MAX))
        },
    );

    registry.register_eager(
        FunctionSignature::values("take", 1, FhirPathType::Any),
        |fc, args| {
            let n = arg_integer("take", args, 0)?;
            if n <= 0 {
                return Ok(Collection::empty());
            }
            Ok(subrange(fc.input, 0, n as usize))
        },
    );

    registry.register_eager(
        FunctionSignature::values("slice", 2, FhirPathType::Any),
        |fc, args| {
            let start = arg_integer("slice", args, 0)?;
            let length = arg_integer("slice", args, 1)?;
            if start < 0 || length <= 0 {
                return Ok(Collection::empty());
            }
            Ok(subrange(fc.input, start as usize, length as usize))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("single", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| match fc.input.len() {
            0 => Ok(Collection::empty()),
            1 => Ok(fc.input.share()),
            count => Err(FunctionError::InvalidInput {
                name: "single".into(),
                message: format!("expected a single item, got {count}"),
            }),
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("distinct", FhirPathType::Any),
        |fc, _| Ok(distinct(fc.input)),
    );

    registry.register_eager(
        FunctionSignature::nullary("isDistinct", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, _| {
            Ok(Collection::singleton(Value::Boolean(
                distinct(fc.input).len() == fc.input.len(),
            )))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("count", FhirPathType::Integer)
            .with_cardinality(Cardinality::Single),
        |fc, _| {
            Ok(Collection::singleton(Value::Integer(fc.input.len() as i64)))
        },
    );
}

fn subrange(input: &Collection, start: usize, length: usize) -> Collection {
    input
        .iter()
        .skip(start)
        .take(length)
        .cloned()
        .collect()
}

pub(crate) fn distinct(input: &Collection) -> Collection {
    let mut items: Vec<Value> = Vec::with_capacity(input.len());
    for item in input.iter() {
        if !items.iter().any(|kept| kept.equals(item) == Some(true)) {
            items.push(item.clone());
        }
    }
    Collection::from_vec(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_is_idempotent() {
        let input: Collection = [1, 2, 1, 3, 2]
            .iter()
            .map(|i| Value::Integer(*i))
            .collect();
        let once = distinct(&input);
        let twice = distinct(&once);
        assert_eq!(once.to_vec(), twice.to_vec());
        assert_eq!(once.len(), 3);
    }
}
