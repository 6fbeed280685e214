//! Combining: union, combine, intersect, exclude, subsetOf, supersetOf,
//! flatten

use super::super::function::{FunctionRegistry, FunctionSignature};
use super::subsetting::distinct;
use crate::evaluator::operations;
use crate::model::{Cardinality, Collection, FhirPathType, Value};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_eager(
        FunctionSignature::values("union", 1, FhirPathType::Any),
        |fc, args| Ok(operations::union(fc.input, &args[0])),
    );

    registry.register_eager(
        FunctionSignature::values("combine", 1, FhirPathType::Any),
        |fc, args| Ok(fc.input.concat(&args[0])),
    );

    registry.register_eager(
        FunctionSignature::values("intersect", 1, FhirPathType::Any),
        |fc, args| {
            let other = &args[0];
            let kept: Vec<Value> = distinct(fc.input)
                .iter()
                .filter(|item| other.contains_value(item))
                .cloned()
                .collect();
            Ok(Collection::from_vec(kept))
        },
    );

    registry.register_eager(
        FunctionSignature::values("exclude", 1, FhirPathType::Any),
        |fc, args| {
            let other = &args[0];
            let kept: Vec<Value> = fc
                .input
                .iter()
                .filter(|item| !other.contains_value(item))
                .cloned()
                .collect();
            Ok(Collection::from_vec(kept))
        },
    );

    registry.register_eager(
        FunctionSignature::values("subsetOf", 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, args| {
            let other = &args[0];
            let subset = fc.input.iter().all(|item| other.contains_value(item));
            Ok(Collection::singleton(Value::Boolean(subset)))
        },
    );

    registry.register_eager(
        FunctionSignature::values("supersetOf", 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, args| {
            let other = &args[0];
            let superset = other.iter().all(|item| fc.input.contains_value(item));
            Ok(Collection::singleton(Value::Boolean(superset)))
        },
    );

    // Collections never nest in this engine, so flattening is the identity;
    // the function exists so expressions written against engines with
    // nested results keep working
    registry.register_eager(
        FunctionSignature::nullary("flatten", FhirPathType::Any),
        |fc, _| Ok(fc.input.share()),
    );
}
