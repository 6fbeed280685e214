//! Standard library coverage

use fhirpath::model::Value;
use fhirpath::{create_context, evaluate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn eval(expression: &str, data: serde_json::Value) -> Vec<Value> {
    evaluate(&create_context(), expression, &data)
        .unwrap_or_else(|e| panic!("'{expression}' failed: {e}"))
        .to_vec()
}

fn eval_closed(expression: &str) -> Vec<Value> {
    eval(expression, json!({}))
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Integer).collect()
}

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|s| Value::String(s.to_string())).collect()
}

fn booleans(values: &[bool]) -> Vec<Value> {
    values.iter().copied().map(Value::Boolean).collect()
}

#[test]
fn existence_family() {
    let data = json!({ "items": [1, 2, 3], "flags": [true, true, false] });
    assert_eq!(eval("items.exists()", data.clone()), booleans(&[true]));
    assert_eq!(eval("items.exists($this > 2)", data.clone()), booleans(&[true]));
    assert_eq!(eval("items.all($this > 0)", data.clone()), booleans(&[true]));
    assert_eq!(eval("items.all($this > 1)", data.clone()), booleans(&[false]));
    assert_eq!(eval("items.any($this > 2)", data.clone()), booleans(&[true]));
    assert_eq!(eval("missing.empty()", data.clone()), booleans(&[true]));
    assert_eq!(eval("flags.allTrue()", data.clone()), booleans(&[false]));
    assert_eq!(eval("flags.anyTrue()", data.clone()), booleans(&[true]));
    assert_eq!(eval("flags.anyFalse()", data.clone()), booleans(&[true]));
    assert_eq!(eval("flags.allFalse()", data.clone()), booleans(&[false]));
    // exists() is count() > 0
    assert_eq!(
        eval("items.exists() = (items.count() > 0)", data),
        booleans(&[true])
    );
}

#[test]
fn not_semantics() {
    assert_eq!(eval_closed("true.not()"), booleans(&[false]));
    assert_eq!(eval_closed("false.not()"), booleans(&[true]));
    assert!(eval_closed("{}.not()").is_empty());
}

#[test]
fn subsetting_family() {
    let data = json!({ "items": [1, 2, 3, 4, 5] });
    assert_eq!(eval("items.first()", data.clone()), ints(&[1]));
    assert_eq!(eval("items.last()", data.clone()), ints(&[5]));
    assert_eq!(eval("items.tail()", data.clone()), ints(&[2, 3, 4, 5]));
    assert_eq!(eval("items.skip(2)", data.clone()), ints(&[3, 4, 5]));
    assert_eq!(eval("items.take(2)", data.clone()), ints(&[1, 2]));
    assert_eq!(eval("items.slice(1, 3)", data.clone()), ints(&[2, 3, 4]));
    assert_eq!(eval("items.count()", data.clone()), ints(&[5]));
    assert_eq!(eval("items.isDistinct()", data.clone()), booleans(&[true]));
    assert!(eval("missing.first()", data.clone()).is_empty());
    assert!(evaluate(&create_context(), "items.single()", &data).is_err());
}

#[test]
fn combining_family() {
    let data = json!({ "a": [1, 2, 3], "b": [3, 4] });
    assert_eq!(eval("a.union(b)", data.clone()), ints(&[1, 2, 3, 4]));
    assert_eq!(eval("a.combine(b)", data.clone()), ints(&[1, 2, 3, 3, 4]));
    assert_eq!(eval("a.intersect(b)", data.clone()), ints(&[3]));
    assert_eq!(eval("a.exclude(b)", data.clone()), ints(&[1, 2]));
    assert_eq!(eval("a.subsetOf(a.combine(b))", data.clone()), booleans(&[true]));
    assert_eq!(eval("a.supersetOf(b)", data.clone()), booleans(&[false]));
    assert_eq!(eval("a.flatten()", data), ints(&[1, 2, 3]));
}

#[rstest]
#[case("'42'.toInteger()", Value::Integer(42))]
#[case("1.toDecimal() = 1.0", Value::Boolean(true))]
#[case("2.5.toString()", Value::String("2.5".into()))]
#[case("'true'.toBoolean()", Value::Boolean(true))]
#[case("'2020-03-14'.toDate() = @2020-03-14", Value::Boolean(true))]
#[case("'13:30'.toTime() = @T13:30", Value::Boolean(true))]
#[case("'abc'.convertsToInteger()", Value::Boolean(false))]
#[case("'42'.convertsToInteger()", Value::Boolean(true))]
#[case("1.convertsToQuantity()", Value::Boolean(true))]
fn conversion_family(#[case] expression: &str, #[case] expected: Value) {
    assert_eq!(eval_closed(expression), vec![expected], "{expression}");
}

#[test]
fn string_family() {
    assert_eq!(eval_closed("'hello'.length()"), ints(&[5]));
    assert_eq!(eval_closed("'hello world'.substring(6)"), strings(&["world"]));
    assert_eq!(eval_closed("'hello world'.substring(0, 5)"), strings(&["hello"]));
    assert!(eval_closed("'short'.substring(10)").is_empty());
    assert_eq!(eval_closed("'hello'.contains('ell')"), booleans(&[true]));
    assert_eq!(eval_closed("'hello'.startsWith('he')"), booleans(&[true]));
    assert_eq!(eval_closed("'hello'.endsWith('lo')"), booleans(&[true]));
    assert_eq!(eval_closed("'Hello'.upper()"), strings(&["HELLO"]));
    assert_eq!(eval_closed("'Hello'.lower()"), strings(&["hello"]));
    assert_eq!(eval_closed("'  pad  '.trim()"), strings(&["pad"]));
    assert_eq!(eval_closed("'hello'.indexOf('l')"), ints(&[2]));
    assert_eq!(eval_closed("'hello'.indexOf('x')"), ints(&[-1]));
    assert_eq!(
        eval_closed("'a,b,c'.split(',')"),
        strings(&["a", "b", "c"])
    );
    assert_eq!(eval_closed("'a,b,c'.split(',', 2)"), strings(&["a", "b,c"]));
    assert_eq!(
        eval_closed("'banana'.replace('an', 'on')"),
        strings(&["bonona"])
    );
    assert_eq!(eval_closed("'abc'.toChars().count()"), ints(&[3]));
}

#[test]
fn join_collects_strings() {
    let data = json!({ "given": ["John", "David"] });
    assert_eq!(eval("given.join(' ')", data.clone()), strings(&["John David"]));
    assert_eq!(eval("given.join()", data), strings(&["JohnDavid"]));
}

#[test]
fn regex_functions() {
    assert_eq!(eval_closed(r"'12345'.matches('\\d+')"), booleans(&[true]));
    // matches is anchored over the whole string
    assert_eq!(eval_closed(r"'a12345'.matches('\\d+')"), booleans(&[false]));
    assert_eq!(
        eval_closed(r"'a1b2'.replaceMatches('\\d', '#')"),
        strings(&["a#b#"])
    );
    assert!(evaluate(&create_context(), "'x'.matches('(unclosed')", &json!({})).is_err());
}

#[test]
fn math_family() {
    assert_eq!(eval_closed("(-5).abs()"), ints(&[5]));
    assert_eq!(eval_closed("2.7.ceiling()"), ints(&[3]));
    assert_eq!(eval_closed("2.7.floor()"), ints(&[2]));
    assert_eq!(eval_closed("3.14159.round(2) = 3.14"), booleans(&[true]));
    assert_eq!(eval_closed("3.9.truncate()"), ints(&[3]));
    assert_eq!(eval_closed("16.sqrt() = 4"), booleans(&[true]));
    assert_eq!(eval_closed("2.power(10)"), ints(&[1024]));
    assert_eq!(eval_closed("100.log(10) = 2"), booleans(&[true]));
    assert!(eval_closed("(-1).sqrt()").is_empty());
    assert_eq!(eval_closed("1.58700.precision()"), ints(&[6]));
    assert_eq!(eval_closed("1.587.lowBoundary() = 1.5865"), booleans(&[true]));
    assert_eq!(eval_closed("1.587.highBoundary() = 1.5875"), booleans(&[true]));
}

#[test]
fn aggregates() {
    let data = json!({ "n": [1, 2, 3, 4] });
    assert_eq!(eval("n.sum()", data.clone()), ints(&[10]));
    assert_eq!(eval("n.avg() = 2.5", data.clone()), booleans(&[true]));
    assert_eq!(eval("n.min()", data.clone()), ints(&[1]));
    assert_eq!(eval("n.max()", data.clone()), ints(&[4]));
    assert_eq!(eval("missing.sum()", data.clone()), ints(&[0]));
    assert!(eval("missing.avg()", data.clone()).is_empty());
    assert_eq!(
        eval("n.aggregate($this + $total, 0)", data.clone()),
        ints(&[10])
    );
    assert_eq!(eval("n.aggregate($this + $total, 100)", data), ints(&[110]));
}

#[test]
fn clock_functions_are_self_consistent() {
    assert_eq!(eval_closed("now().exists()"), booleans(&[true]));
    assert_eq!(eval_closed("today() = today()"), booleans(&[true]));
    assert_eq!(eval_closed("timeOfDay().exists()"), booleans(&[true]));
}

#[test]
fn select_and_repeat() {
    let data = json!({ "name": [{ "given": ["a", "b"] }, { "given": ["c"] }] });
    assert_eq!(eval("name.select(given)", data), strings(&["a", "b", "c"]));

    let tree = json!({
        "item": [
            { "id": "1", "item": [{ "id": "1.1" }, { "id": "1.2" }] },
            { "id": "2" }
        ]
    });
    let ids = eval("repeat(item).id", tree);
    assert_eq!(ids.len(), 4);
}

#[test]
fn iif_branches_lazily() {
    assert_eq!(eval_closed("iif(true, 'yes', 'no')"), strings(&["yes"]));
    assert_eq!(eval_closed("iif(false, 'yes', 'no')"), strings(&["no"]));
    assert!(eval_closed("iif(false, 'yes')").is_empty());
    // The untaken branch must not run
    assert_eq!(eval_closed("iif(true, 1, 1 / 0)"), ints(&[1]));
}

#[test]
fn type_operations() {
    let observation = json!({
        "resourceType": "Observation",
        "valueQuantity": { "value": 7.2, "unit": "mg" }
    });
    assert_eq!(eval("1 is Integer", json!({})), booleans(&[true]));
    assert_eq!(eval("1 is String", json!({})), booleans(&[false]));
    assert_eq!(eval("'x' is System.String", json!({})), booleans(&[true]));
    assert_eq!(
        eval("$this is Observation", observation.clone()),
        booleans(&[true])
    );
    assert_eq!(eval("value.ofType(Quantity).count()", observation.clone()), ints(&[1]));
    assert_eq!(eval("(1 | 'a').ofType(Integer)", observation), ints(&[1]));
}

#[test]
fn navigation_helpers() {
    let data = json!({
        "resourceType": "MedicationRequest",
        "contained": [{ "resourceType": "Medication", "id": "m1", "code": "aspirin" }],
        "medicationReference": { "reference": "#m1" },
        "extension": [
            { "url": "http://example.org/weight", "valueDecimal": 72.5 },
            { "url": "http://example.org/height", "valueDecimal": 1.8 }
        ]
    });
    assert_eq!(
        eval("medicationReference.resolve().code", data.clone()),
        strings(&["aspirin"])
    );
    assert_eq!(
        eval("extension('http://example.org/weight').count()", data.clone()),
        ints(&[1])
    );
    assert_eq!(eval("children().count() > 0", data.clone()), booleans(&[true]));
    assert_eq!(
        eval("descendants().count() >= children().count()", data.clone()),
        booleans(&[true])
    );
    assert_eq!(eval("id.hasValue()", json!({ "id": "x" })), booleans(&[true]));
    assert_eq!(eval("type().name", json!({ "resourceType": "Patient" })), strings(&["Patient"]));
}

#[test]
fn date_arithmetic_through_operators() {
    assert_eq!(
        eval_closed("@2020-01-31 + 1 month = @2020-02-29"),
        booleans(&[true])
    );
    assert_eq!(
        eval_closed("@2020-02-29 + 1 year = @2021-02-28"),
        booleans(&[true])
    );
    assert_eq!(
        eval_closed("@2023-01-30 + 5 days = @2023-02-04"),
        booleans(&[true])
    );
    assert_eq!(
        eval_closed("@2020-03-31 - 1 month = @2020-02-29"),
        booleans(&[true])
    );
    assert_eq!(
        eval_closed("@T10:30 + 45 minutes = @T11:15"),
        booleans(&[true])
    );
    assert!(evaluate(&create_context(), "@T10:30 + 1 month", &json!({})).is_err());
}
