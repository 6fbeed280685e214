//! End-to-end evaluation scenarios

use fhirpath::model::Value;
use fhirpath::{EvaluationError, FhirPathError, create_context, evaluate};
use pretty_assertions::assert_eq;
use serde_json::json;

fn eval(expression: &str, data: serde_json::Value) -> Vec<Value> {
    evaluate(&create_context(), expression, &data)
        .unwrap_or_else(|e| panic!("'{expression}' failed: {e}"))
        .to_vec()
}

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|s| Value::String(s.to_string())).collect()
}

#[test]
fn scalar_equality() {
    assert_eq!(eval("age = 30", json!({ "age": 30 })), vec![Value::Boolean(true)]);
}

#[test]
fn equality_broadcasts_over_collections() {
    assert_eq!(
        eval("ages = 30", json!({ "ages": [25, 30, 35] })),
        vec![
            Value::Boolean(false),
            Value::Boolean(true),
            Value::Boolean(false)
        ]
    );
}

#[test]
fn union_dedupes_preserving_order() {
    // FHIRPath mandates dedup for `|`; this suite pins that convention
    assert_eq!(
        eval(
            "names1 | names2",
            json!({ "names1": ["John", "Jane"], "names2": ["Bob", "John"] })
        ),
        strings(&["John", "Jane", "Bob"])
    );
}

#[test]
fn union_with_self_is_distinct() {
    assert_eq!(
        eval("items | items", json!({ "items": ["a", "b", "a"] })),
        strings(&["a", "b"])
    );
    assert_eq!(
        eval("items.distinct().distinct()", json!({ "items": ["a", "b", "a"] })),
        strings(&["a", "b"])
    );
}

#[test]
fn where_binds_dollar_index() {
    assert_eq!(
        eval(
            "items.where($index mod 2 = 0)",
            json!({ "items": ["first", "second", "third", "fourth", "fifth"] })
        ),
        strings(&["first", "third", "fifth"])
    );
}

#[test]
fn division_by_zero_is_an_error_with_the_whole_span() {
    let err = evaluate(&create_context(), "10 / 0", &json!({})).unwrap_err();
    match err {
        FhirPathError::Evaluation(EvaluationError::DivisionByZero { span }) => {
            assert_eq!(span.start, 0);
            assert_eq!(span.end, 6);
        }
        other => panic!("expected division by zero, got {other}"),
    }
}

#[test]
fn path_navigation_over_patient() {
    let patient = json!({
        "resourceType": "Patient",
        "active": true,
        "name": [
            { "use": "official", "family": "Doe", "given": ["John", "David"] },
            { "use": "nickname", "given": ["Johnny"] }
        ]
    });
    assert_eq!(
        eval("Patient.name.where(use = 'official').given", patient.clone()),
        strings(&["John", "David"])
    );
    // Type guard drops non-matching roots entirely
    assert!(eval("Observation.value", patient.clone()).is_empty());
    // Absent fields are silently empty
    assert!(eval("Patient.telecom.value", patient).is_empty());
}

#[test]
fn indexer_semantics() {
    let data = json!({ "items": [10, 20, 30] });
    assert_eq!(eval("items[1]", data.clone()), vec![Value::Integer(20)]);
    assert_eq!(eval("items[-1]", data.clone()), vec![Value::Integer(30)]);
    assert!(eval("items[7]", data.clone()).is_empty());
    assert!(eval("items[{}]", data).is_empty());
}

#[test]
fn choice_field_resolution_without_a_provider() {
    let observation = json!({
        "resourceType": "Observation",
        "valueQuantity": { "value": 7.2, "unit": "mg" }
    });
    let result = eval("Observation.value.unit", observation);
    assert_eq!(result, strings(&["mg"]));
}

#[test]
fn environment_variables() {
    let ctx = create_context().with_env_constant(
        "threshold",
        fhirpath::Collection::singleton(Value::Integer(5)),
    );
    let result = evaluate(&ctx, "count > %threshold", &json!({ "count": 7 })).unwrap();
    assert_eq!(result.as_boolean(), Some(true));

    let result = evaluate(&ctx, "%context.count", &json!({ "count": 7 })).unwrap();
    assert_eq!(result.to_vec(), vec![Value::Integer(7)]);

    let err = evaluate(&ctx, "%undefined", &json!({})).unwrap_err();
    assert!(matches!(
        err,
        FhirPathError::Evaluation(EvaluationError::UnknownVariable { .. })
    ));
}

#[test]
fn initial_variables_from_the_context() {
    let ctx = create_context().with_variable(
        "limit",
        fhirpath::Collection::singleton(Value::Integer(2)),
    );
    let result = evaluate(&ctx, "items.take($limit)", &json!({ "items": [1, 2, 3] })).unwrap();
    assert_eq!(result.len(), 2);
}

#[test]
fn define_variable_scopes_to_the_rest_of_the_chain() {
    let data = json!({ "name": [{ "given": ["a"] }, { "given": ["b"] }] });
    let result = eval(
        "name.defineVariable('all').select($all.count())",
        data.clone(),
    );
    assert_eq!(result, vec![Value::Integer(2), Value::Integer(2)]);

    // Rebinding the same name in one chain is rejected
    let err = evaluate(
        &create_context(),
        "name.defineVariable('v', 1).defineVariable('v', 2).first()",
        &data,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        FhirPathError::Evaluation(EvaluationError::VariableAlreadyDefined { .. })
    ));
}

#[test]
fn define_variable_heads_a_chain() {
    let result = eval("defineVariable('x', 2).items.take($x)", json!({ "items": [1, 2, 3] }));
    assert_eq!(result.len(), 2);
}

#[test]
fn trace_hook_observes_values_in_order() {
    use std::sync::{Arc, Mutex};

    let seen: Arc<Mutex<Vec<(String, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ctx = create_context().with_trace_hook(Arc::new(move |name, values| {
        sink.lock().unwrap().push((name.to_string(), values.len()));
    }));

    let data = json!({ "items": [1, 2, 3] });
    evaluate(&ctx, "items.trace('all').where($this > 1).trace('kept')", &data).unwrap();

    let calls = seen.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("all".to_string(), 3), ("kept".to_string(), 2)]);
}

#[test]
fn repeat_is_bounded() {
    let ctx = create_context().with_max_repeat_iterations(10);
    let err = evaluate(&ctx, "repeat($this + 1)", &json!({})).map(|_| ());
    // Empty input terminates immediately; a growing projection hits the bound
    assert!(err.is_ok());

    let err = evaluate(&ctx, "n.repeat($this + 1)", &json!({ "n": 1 })).unwrap_err();
    assert!(matches!(
        err,
        FhirPathError::Evaluation(EvaluationError::RepeatLimitExceeded { .. })
    ));
}

#[test]
fn strict_mode_flags_unknown_identifiers() {
    let strict = create_context().with_strict_mode(true);
    let err = evaluate(&strict, "nosuchfield", &json!({ "age": 1 })).unwrap_err();
    assert!(matches!(
        err,
        FhirPathError::Evaluation(EvaluationError::UnknownIdentifier { .. })
    ));
}

#[test]
fn unknown_functions_compile_error_or_runtime_defer() {
    let err = evaluate(&create_context(), "frobnicate()", &json!({})).unwrap_err();
    assert!(matches!(err, FhirPathError::Compile(_)));

    let permissive = create_context().with_allow_unknown_functions(true);
    let err = evaluate(&permissive, "frobnicate()", &json!({})).unwrap_err();
    assert!(matches!(
        err,
        FhirPathError::Evaluation(EvaluationError::UnknownFunction { .. })
    ));
}

#[test]
fn error_display_points_into_the_source() {
    let source = "name.where(";
    let err = evaluate(&create_context(), source, &json!({})).unwrap_err();
    let rendered = err.display_with_source(source);
    assert!(rendered.starts_with("parser error:"), "got: {rendered}");
    assert!(rendered.contains(source));
    assert!(rendered.contains('^'));
}
