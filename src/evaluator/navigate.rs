//! Path navigation over JSON-shaped data
//!
//! An absent field is empty, a scalar field is one item, an array field is N
//! items. A name that is not a field but starts with an uppercase letter
//! acts as a resource-type filter, which is what makes `Patient.name` a
//! type guard on the root. Choice-typed fields resolve through the model
//! provider when one is configured, with a structural prefix scan as the
//! fallback.

use super::context::EvaluationContext;
use super::error::{EvaluationError, EvaluationResult};
use crate::model::{Collection, Value};
use crate::parser::span::Span;

/// Resolve an identifier against a focus collection
pub fn identifier(
    ctx: &EvaluationContext,
    input: &Collection,
    name: &str,
    span: Span,
    root_position: bool,
) -> EvaluationResult<Collection> {
    let mut results: Vec<Value> = Vec::new();
    let mut recognized = input.is_empty();

    for item in input.iter() {
        let Value::Resource(resource) = item else {
            continue;
        };

        if let Some(json) = resource.get(name) {
            recognized = true;
            results.extend(Collection::from_json(json).iter().cloned());
            continue;
        }

        // Choice-typed field: provider first, structural scan otherwise.
        // Complex values keep the datatype the field name revealed, so
        // `ofType`/`is`/`as` still work on them.
        let choice = match &ctx.model {
            Some(provider) => provider
                .resolve_choice(resource, name)
                .map_err(|source| EvaluationError::Model { source, span })?
                .map(|(field, ty)| (field, ty.to_string())),
            None => resource
                .choice_field(name)
                .map(|(field, _, suffix)| (field.to_string(), suffix.to_string())),
        };
        if let Some((field, type_name)) = choice {
            if let Some(json) = resource.get(&field) {
                recognized = true;
                results.extend(Collection::from_json(json).iter().map(|v| match v {
                    Value::Resource(r) => Value::Resource(r.with_declared_type(&type_name)),
                    other => other.clone(),
                }));
                continue;
            }
        }

        // Type guard: keep the item when the name denotes its type
        if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            let actual = resource.resource_type().unwrap_or("Resource");
            let matches = match &ctx.model {
                Some(provider) => provider
                    .is_subtype_of(actual, name)
                    .map_err(|source| EvaluationError::Model { source, span })?,
                None => actual == name,
            };
            if matches {
                recognized = true;
                results.push(item.clone());
            }
        }
    }

    if root_position && ctx.config.strict_mode && !recognized {
        return Err(EvaluationError::UnknownIdentifier {
            name: name.to_string(),
            span,
        });
    }

    Ok(Collection::from_vec(results))
}

/// All immediate children of an item: every field of a resource, expanded;
/// scalars have none
pub fn children(item: &Value) -> Collection {
    let Value::Resource(resource) = item else {
        return Collection::empty();
    };
    let Some(fields) = resource.fields() else {
        return Collection::empty();
    };
    let mut results = Vec::new();
    for (name, json) in fields {
        if name == "resourceType" {
            continue;
        }
        results.extend(Collection::from_json(json).iter().cloned());
    }
    Collection::from_vec(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient() -> Collection {
        Collection::from_json(&json!({
            "resourceType": "Patient",
            "active": true,
            "name": [
                { "use": "official", "given": ["John", "David"] },
                { "use": "nickname", "given": ["Johnny"] }
            ]
        }))
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::new()
    }

    fn span() -> Span {
        Span::new(0, 1)
    }

    #[test]
    fn test_array_field_expands() {
        let names = identifier(&ctx(), &patient(), "name", span(), true).unwrap();
        assert_eq!(names.len(), 2);
        let given = identifier(&ctx(), &names, "given", span(), false).unwrap();
        assert_eq!(given.len(), 3);
    }

    #[test]
    fn test_absent_field_is_empty() {
        let result = identifier(&ctx(), &patient(), "telecom", span(), true).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_type_guard_on_root() {
        let kept = identifier(&ctx(), &patient(), "Patient", span(), true).unwrap();
        assert_eq!(kept.len(), 1);
        let dropped = identifier(&ctx(), &patient(), "Observation", span(), true).unwrap();
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_strict_mode_rejects_unknown_root_identifier() {
        let strict = EvaluationContext::new().with_strict_mode(true);
        let err = identifier(&strict, &patient(), "frobnicate", span(), true).unwrap_err();
        assert!(matches!(err, EvaluationError::UnknownIdentifier { .. }));
    }

    #[test]
    fn test_choice_field_scan() {
        let observation = Collection::from_json(&json!({
            "resourceType": "Observation",
            "valueQuantity": { "value": 7.0, "unit": "mg" }
        }));
        let value = identifier(&ctx(), &observation, "value", span(), false).unwrap();
        assert_eq!(value.len(), 1);
    }

    #[test]
    fn test_children_expands_all_fields() {
        let kids = children(patient().first().unwrap());
        // active + two name entries
        assert_eq!(kids.len(), 3);
    }
}
