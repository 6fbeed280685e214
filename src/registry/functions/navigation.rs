//! Navigation helpers: children, descendants, resolve, extension,
//! hasValue, getValue, type

use super::super::function::{FunctionRegistry, FunctionSignature};
use super::arg_string;
use crate::evaluator::error::{EvaluationError, EvaluationResult};
use crate::evaluator::navigate;
use crate::model::{Cardinality, Collection, EmptyModelProvider, FhirPathType, ModelProvider, Resource, Value};
use serde_json::json;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_eager(
        FunctionSignature::nullary("children", FhirPathType::Any),
        |fc, _| {
            let mut results: Vec<Value> = Vec::new();
            for item in fc.input.iter() {
                results.extend(navigate::children(item).iter().cloned());
            }
            Ok(Collection::from_vec(results))
        },
    );

    // Lazy so provider failures and the iteration bound surface with spans
    registry.register_lazy(
        FunctionSignature::nullary("descendants", FhirPathType::Any),
        |fc, _| descendants(fc.input, fc.context.config.max_repeat_iterations, fc.span),
    );

    registry.register_lazy(
        FunctionSignature::nullary("resolve", FhirPathType::Any),
        |fc, _| {
            let provider: &dyn ModelProvider = match &fc.context.model {
                Some(p) => p.as_ref(),
                None => &EmptyModelProvider,
            };
            let Some(root) = fc.context.root_resource() else {
                return Ok(Collection::empty());
            };
            let mut resolved: Vec<Value> = Vec::new();
            for item in fc.input.iter() {
                let reference = match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Resource(r) => r
                        .get("reference")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string),
                    _ => None,
                };
                if let Some(reference) = reference {
                    let target = provider
                        .resolve_reference(&reference, &root)
                        .map_err(|source| EvaluationError::Model {
                            source,
                            span: fc.span,
                        })?;
                    if let Some(target) = target {
                        resolved.push(Value::Resource(target));
                    }
                }
            }
            Ok(Collection::from_vec(resolved))
        },
    );

    registry.register_eager(
        FunctionSignature::values("extension", 1, FhirPathType::Any),
        |fc, args| {
            let url = arg_string("extension", args, 0)?;
            let mut results: Vec<Value> = Vec::new();
            for item in fc.input.iter() {
                let Value::Resource(resource) = item else {
                    continue;
                };
                let Some(extensions) = resource.get("extension").and_then(serde_json::Value::as_array)
                else {
                    continue;
                };
                for extension in extensions {
                    if extension.get("url").and_then(serde_json::Value::as_str) == Some(&url) {
                        results.push(Value::Resource(Resource::new(extension.clone())));
                    }
                }
            }
            Ok(Collection::from_vec(results))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("hasValue", FhirPathType::Boolean)
            .with_cardinality(Cardinality::Single),
        |fc, _| {
            let has = matches!(
                fc.input.as_singleton(),
                Some(v) if !matches!(v, Value::Resource(_))
            );
            Ok(Collection::singleton(Value::Boolean(has)))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("getValue", FhirPathType::Any)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(match fc.input.as_singleton() {
                Some(v) if !matches!(v, Value::Resource(_)) => Collection::singleton(v.clone()),
                _ => Collection::empty(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("type", FhirPathType::Any),
        |fc, _| {
            let infos: Vec<Value> = fc
                .input
                .iter()
                .map(|item| {
                    let (namespace, name) = match item {
                        Value::Resource(r) => ("FHIR", r.resource_type().unwrap_or("Resource")),
                        other => ("System", other.type_name()),
                    };
                    Value::Resource(Resource::new(json!({
                        "namespace": namespace,
                        "name": name,
                    })))
                })
                .collect();
            Ok(Collection::from_vec(infos))
        },
    );
}

/// Transitive children, cycle-safe by resource identity and bounded by the
/// repeat limit
fn descendants(
    input: &Collection,
    limit: usize,
    span: crate::parser::span::Span,
) -> EvaluationResult<Collection> {
    let mut results: Vec<Value> = Vec::new();
    let mut visited: Vec<usize> = Vec::new();
    let mut frontier: Vec<Value> = input.to_vec();
    let mut processed = 0usize;

    while let Some(item) = frontier.pop() {
        processed += 1;
        if processed > limit {
            return Err(EvaluationError::RepeatLimitExceeded { limit, span });
        }
        if let Value::Resource(resource) = &item {
            let identity = resource.identity();
            if visited.contains(&identity) {
                continue;
            }
            visited.push(identity);
        }
        for child in navigate::children(&item).iter() {
            results.push(child.clone());
            frontier.push(child.clone());
        }
    }
    Ok(Collection::from_vec(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::span::Span;

    #[test]
    fn test_descendants_walks_nested_structures() {
        let patient = Collection::from_json(&json!({
            "resourceType": "Patient",
            "name": [{ "given": ["John"], "family": "Doe" }]
        }));
        let all = descendants(&patient, 1000, Span::new(0, 1)).unwrap();
        // name object, given "John", family "Doe"
        assert_eq!(all.len(), 3);
    }
}
