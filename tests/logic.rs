//! Exhaustive three-valued logic tables and empty propagation

use fhirpath::{create_context, evaluate};
use rstest::rstest;
use serde_json::json;

/// Evaluate a closed boolean expression; `None` is the empty collection
fn tri(expression: &str) -> Option<bool> {
    let result = evaluate(&create_context(), expression, &json!({})).unwrap();
    match result.len() {
        0 => None,
        1 => result.as_boolean(),
        n => panic!("'{expression}' produced {n} items"),
    }
}

const TRUE: &str = "true";
const FALSE: &str = "false";
const EMPTY: &str = "{}";

#[rstest]
#[case(TRUE, TRUE, Some(true))]
#[case(TRUE, FALSE, Some(false))]
#[case(TRUE, EMPTY, None)]
#[case(FALSE, TRUE, Some(false))]
#[case(FALSE, FALSE, Some(false))]
#[case(FALSE, EMPTY, Some(false))]
#[case(EMPTY, TRUE, None)]
#[case(EMPTY, FALSE, Some(false))]
#[case(EMPTY, EMPTY, None)]
fn and_table(#[case] a: &str, #[case] b: &str, #[case] expected: Option<bool>) {
    assert_eq!(tri(&format!("{a} and {b}")), expected, "{a} and {b}");
}

#[rstest]
#[case(TRUE, TRUE, Some(true))]
#[case(TRUE, FALSE, Some(true))]
#[case(TRUE, EMPTY, Some(true))]
#[case(FALSE, TRUE, Some(true))]
#[case(FALSE, FALSE, Some(false))]
#[case(FALSE, EMPTY, None)]
#[case(EMPTY, TRUE, Some(true))]
#[case(EMPTY, FALSE, None)]
#[case(EMPTY, EMPTY, None)]
fn or_table(#[case] a: &str, #[case] b: &str, #[case] expected: Option<bool>) {
    assert_eq!(tri(&format!("{a} or {b}")), expected, "{a} or {b}");
}

#[rstest]
#[case(TRUE, TRUE, Some(false))]
#[case(TRUE, FALSE, Some(true))]
#[case(TRUE, EMPTY, None)]
#[case(FALSE, TRUE, Some(true))]
#[case(FALSE, FALSE, Some(false))]
#[case(FALSE, EMPTY, None)]
#[case(EMPTY, TRUE, None)]
#[case(EMPTY, FALSE, None)]
#[case(EMPTY, EMPTY, None)]
fn xor_table(#[case] a: &str, #[case] b: &str, #[case] expected: Option<bool>) {
    assert_eq!(tri(&format!("{a} xor {b}")), expected, "{a} xor {b}");
}

#[rstest]
#[case(TRUE, TRUE, Some(true))]
#[case(TRUE, FALSE, Some(false))]
#[case(TRUE, EMPTY, None)]
#[case(FALSE, TRUE, Some(true))]
#[case(FALSE, FALSE, Some(true))]
#[case(FALSE, EMPTY, Some(true))]
#[case(EMPTY, TRUE, Some(true))]
#[case(EMPTY, FALSE, None)]
#[case(EMPTY, EMPTY, None)]
fn implies_table(#[case] a: &str, #[case] b: &str, #[case] expected: Option<bool>) {
    assert_eq!(tri(&format!("{a} implies {b}")), expected, "{a} implies {b}");
}

#[rstest]
#[case("{} + 1")]
#[case("1 + {}")]
#[case("{} - 1")]
#[case("{} * 2")]
#[case("{} / 2")]
#[case("{} div 2")]
#[case("{} mod 2")]
#[case("{} < 1")]
#[case("1 > {}")]
#[case("{} = 1")]
#[case("1 != {}")]
fn empty_propagates_through_arithmetic_and_comparison(#[case] expression: &str) {
    let result = evaluate(&create_context(), expression, &json!({})).unwrap();
    assert!(result.is_empty(), "'{expression}' should be empty");
}

#[test]
fn short_circuit_skips_the_right_side() {
    // The right side would fail with division by zero if evaluated
    assert_eq!(tri("false and (1 / 0 > 0)"), Some(false));
    assert_eq!(tri("true or (1 / 0 > 0)"), Some(true));
    assert_eq!(tri("false implies (1 / 0 > 0)"), Some(true));
}
