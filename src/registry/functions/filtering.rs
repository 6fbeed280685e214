//! Filtering and projection: where, select, repeat, iif

use super::super::function::{FunctionRegistry, FunctionSignature};
use super::criteria_met;
use crate::evaluator::error::EvaluationError;
use crate::model::{Collection, FhirPathType, Value};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_lazy(
        FunctionSignature::expressions("where", 1, 1, FhirPathType::Any),
        |fc, args| {
            let criteria = &args[0];
            let mut kept: Vec<Value> = Vec::new();
            for (i, item) in fc.input.iter().enumerate() {
                let item_ctx = fc
                    .context
                    .with_iteration(Collection::singleton(item.clone()), i as i64);
                if criteria_met(&criteria.eval(&item_ctx)?) {
                    kept.push(item.clone());
                }
            }
            Ok(Collection::from_vec(kept))
        },
    );

    registry.register_lazy(
        FunctionSignature::expressions("select", 1, 1, FhirPathType::Any),
        |fc, args| {
            let projection = &args[0];
            let mut results: Vec<Value> = Vec::new();
            for (i, item) in fc.input.iter().enumerate() {
                let item_ctx = fc
                    .context
                    .with_iteration(Collection::singleton(item.clone()), i as i64);
                results.extend(projection.eval(&item_ctx)?.iter().cloned());
            }
            Ok(Collection::from_vec(results))
        },
    );

    registry.register_lazy(
        FunctionSignature::expressions("repeat", 1, 1, FhirPathType::Any),
        |fc, args| {
            let projection = &args[0];
            let limit = fc.context.config.max_repeat_iterations;
            let mut seen: Vec<Value> = Vec::new();
            let mut frontier: Vec<Value> = fc.input.to_vec();
            let mut processed = 0usize;

            while let Some(item) = frontier.pop() {
                processed += 1;
                if processed > limit {
                    return Err(EvaluationError::RepeatLimitExceeded {
                        limit,
                        span: fc.span,
                    });
                }
                let item_ctx = fc.context.with_input(Collection::singleton(item));
                for produced in projection.eval(&item_ctx)?.iter() {
                    // Identity tracking refuses cycles through self-referencing
                    // resource graphs
                    if !seen.contains(produced) {
                        seen.push(produced.clone());
                        frontier.push(produced.clone());
                    }
                }
            }
            Ok(Collection::from_vec(seen))
        },
    );

    registry.register_lazy(
        FunctionSignature::expressions("iif", 2, 3, FhirPathType::Any),
        |fc, args| {
            let condition = args[0].eval(fc.context)?;
            if condition.len() > 1 {
                return Err(EvaluationError::SingletonRequired {
                    operator: "iif",
                    side: "left",
                    count: condition.len(),
                    span: fc.span,
                });
            }
            if condition.as_boolean() == Some(true) {
                args[1].eval(fc.context)
            } else {
                match args.get(2) {
                    Some(otherwise) => otherwise.eval(fc.context),
                    None => Ok(Collection::empty()),
                }
            }
        },
    );
}
