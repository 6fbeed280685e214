//! Strict equality vs equivalence

use fhirpath::{create_context, evaluate};
use rstest::rstest;
use serde_json::json;

fn tri(expression: &str) -> Option<bool> {
    let result = evaluate(&create_context(), expression, &json!({})).unwrap();
    match result.len() {
        0 => None,
        _ => result.as_boolean(),
    }
}

#[rstest]
#[case("'A' = 'a'", Some(false))]
#[case("'A' ~ 'a'", Some(true))]
#[case("'hello  world' ~ 'Hello World'", Some(true))]
#[case("'hello' = 'hello'", Some(true))]
#[case("1.0 = 1.00", Some(true))]
#[case("1.0 ~ 1.00", Some(true))]
#[case("1 = 1.0", Some(true))]
#[case("@2020-01 = @2020-01-01", None)]
#[case("@2020-01 ~ @2020-01-01", Some(true))]
#[case("@2020-01 = @2020-01", Some(true))]
#[case("@2020-01 = @2021-03", Some(false))]
#[case("@2020-01-01T10:00:00+02:00 = @2020-01-01T08:00:00Z", Some(true))]
#[case("@T10:30 ~ @T10:30:00", Some(true))]
#[case("5 'mg' = 5 'mg'", Some(true))]
#[case("3 days = 3 'd'", Some(true))]
#[case("5 'mg' = 5 'kg'", None)]
#[case("5 'mg' ~ 5 'kg'", Some(false))]
fn equality_pairs(#[case] expression: &str, #[case] expected: Option<bool>) {
    assert_eq!(tri(expression), expected, "{expression}");
}

#[test]
fn mixed_type_equality_is_empty_not_an_error() {
    // The FHIRPath specification makes cross-type comparison unknown
    let result = evaluate(&create_context(), "age = '30'", &json!({ "age": 30 })).unwrap();
    assert!(result.is_empty());
}

#[test]
fn collection_equality_is_ordered_equivalence_is_multiset() {
    let data = json!({ "a": [1, 2], "b": [2, 1] });
    assert_eq!(tri_with("a = b", &data), Some(false));
    assert_eq!(tri_with("a ~ b", &data), Some(true));
    assert_eq!(tri_with("a = a", &data), Some(true));
}

#[test]
fn not_equivalent_of_empties() {
    assert_eq!(tri("{} ~ {}"), Some(true));
    assert_eq!(tri("{} !~ {}"), Some(false));
    assert_eq!(tri("{} = {}"), None);
}

fn tri_with(expression: &str, data: &serde_json::Value) -> Option<bool> {
    let result = evaluate(&create_context(), expression, data).unwrap();
    match result.len() {
        0 => None,
        _ => result.as_boolean(),
    }
}
