//! Utility functions: defineVariable, trace, aggregate

use super::super::function::{FunctionRegistry, FunctionSignature};
use crate::evaluator::error::EvaluationError;
use crate::model::{Cardinality, Collection, FhirPathType, Value};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    // In a dot chain the compiler intercepts defineVariable and threads the
    // binding into the steps that follow. Standing alone there is nothing
    // chained after it, so the binding has no observer and the input passes
    // through; this entry validates the call and keeps the name resolvable.
    registry.register_lazy(
        FunctionSignature::expressions("defineVariable", 1, 2, FhirPathType::Any),
        |fc, args| {
            let name = args[0].eval(fc.context)?;
            if !matches!(name.as_singleton(), Some(Value::String(_))) {
                return Err(EvaluationError::InvalidOperation {
                    message: "defineVariable needs a string name".into(),
                    span: fc.span,
                });
            }
            if let Some(value) = args.get(1) {
                value.eval(fc.context)?;
            }
            Ok(fc.input.share())
        },
    );

    registry.register_lazy(
        FunctionSignature::expressions("trace", 1, 2, FhirPathType::Any),
        |fc, args| {
            let name = match args[0].eval(fc.context)?.as_singleton() {
                Some(Value::String(s)) => s.clone(),
                _ => {
                    return Err(EvaluationError::InvalidOperation {
                        message: "trace needs a string name".into(),
                        span: fc.span,
                    });
                }
            };
            let traced = match args.get(1) {
                Some(projection) => {
                    let mut projected: Vec<Value> = Vec::new();
                    for (i, item) in fc.input.iter().enumerate() {
                        let item_ctx = fc
                            .context
                            .with_iteration(Collection::singleton(item.clone()), i as i64);
                        projected.extend(projection.eval(&item_ctx)?.iter().cloned());
                    }
                    Collection::from_vec(projected)
                }
                None => fc.input.share(),
            };
            match &fc.context.trace_hook {
                Some(hook) => hook(&name, &traced),
                None => log::debug!("trace '{name}': {} item(s)", traced.len()),
            }
            Ok(fc.input.share())
        },
    );

    registry.register_lazy(
        FunctionSignature::expressions("aggregate", 1, 2, FhirPathType::Any)
            .with_cardinality(Cardinality::Many),
        |fc, args| {
            let aggregator = &args[0];
            let mut total = match args.get(1) {
                Some(init) => init.eval(fc.context)?,
                None => Collection::empty(),
            };
            for (i, item) in fc.input.iter().enumerate() {
                let item_ctx = fc
                    .context
                    .with_iteration(Collection::singleton(item.clone()), i as i64)
                    .with_total(total);
                total = aggregator.eval(&item_ctx)?;
            }
            Ok(total)
        },
    );
}
