//! Existence functions: exists, empty, not, allTrue/anyTrue/allFalse/
//! anyFalse, all, any

use super::super::function::{
    FunctionContext, FunctionError, FunctionRegistry, FunctionResult, FunctionSignature,
};
use super::criteria_met;
use crate::compiler::CompiledNode;
use crate::evaluator::error::EvaluationResult;
use crate::model::{Cardinality, Collection, FhirPathType, Value};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_lazy(
        FunctionSignature::expressions("exists", 0, 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, args| any_matches(fc, args.first(), false),
    );

    registry.register_lazy(
        FunctionSignature::expressions("any", 1, 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, args| any_matches(fc, args.first(), false),
    );

    registry.register_lazy(
        FunctionSignature::expressions("all", 1, 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, args| any_matches(fc, args.first(), true),
    );

    registry.register_eager(
        FunctionSignature::nullary("empty", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, _| {
            Ok(Collection::singleton(Value::Boolean(fc.input.is_empty())))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("not", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Optional),
        |fc, _| match fc.input.len() {
            0 => Ok(Collection::empty()),
            1 => {
                let negated = match fc.input.first() {
                    Some(Value::Boolean(b)) => !b,
                    // Singleton evaluation: any other single item is true
                    _ => false,
                };
                Ok(Collection::singleton(Value::Boolean(negated)))
            }
            count => Err(FunctionError::InvalidInput {
                name: "not".into(),
                message: format!("expected at most one item, got {count}"),
            }),
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("allTrue", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, _| booleans_fold(fc, "allTrue", true, |all, b| all && b),
    );
    registry.register_eager(
        FunctionSignature::nullary("anyTrue", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, _| booleans_fold(fc, "anyTrue", false, |any, b| any || b),
    );
    registry.register_eager(
        FunctionSignature::nullary("allFalse", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, _| booleans_fold(fc, "allFalse", true, |all, b| all && !b),
    );
    registry.register_eager(
        FunctionSignature::nullary("anyFalse", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, _| booleans_fold(fc, "anyFalse", false, |any, b| any || !b),
    );
}

/// Shared core of `exists`/`any` and, inverted, `all`
fn any_matches(
    fc: &FunctionContext<'_>,
    criteria: Option<&CompiledNode>,
    require_all: bool,
) -> EvaluationResult<Collection> {
    let Some(criteria) = criteria else {
        return Ok(Collection::singleton(Value::Boolean(!fc.input.is_empty())));
    };
    for (i, item) in fc.input.iter().enumerate() {
        let item_ctx = fc
            .context
            .with_iteration(Collection::singleton(item.clone()), i as i64);
        let met = criteria_met(&criteria.eval(&item_ctx)?);
        if require_all && !met {
            return Ok(Collection::singleton(Value::Boolean(false)));
        }
        if !require_all && met {
            return Ok(Collection::singleton(Value::Boolean(true)));
        }
    }
    Ok(Collection::singleton(Value::Boolean(require_all)))
}

fn booleans_fold(
    fc: &FunctionContext<'_>,
    name: &str,
    start: bool,
    fold: impl Fn(bool, bool) -> bool,
) -> FunctionResult<Collection> {
    let mut acc = start;
    for item in fc.input.iter() {
        match item {
            Value::Boolean(b) => acc = fold(acc, *b),
            other => {
                return Err(FunctionError::InvalidInput {
                    name: name.to_string(),
                    message: format!("expected booleans, got {}", other.type_name()),
                });
            }
        }
    }
    Ok(Collection::singleton(Value::Boolean(acc)))
}
