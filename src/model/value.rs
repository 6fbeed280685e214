//! Runtime values and collections
//!
//! Every FHIRPath evaluation result is a [`Collection`]: an ordered,
//! possibly empty sequence of items sharing an `Arc` slice so that passing
//! results around never copies. The empty collection is FHIRPath's only
//! notion of null. Strict equality (`=`) can itself be unknown — it returns
//! `Option<bool>` — while equivalence (`~`) is total.

use super::quantity::Quantity;
use super::resource::Resource;
use super::temporal::{Date, DateTime, Time};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A single item inside a collection
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Boolean(bool),
    /// 64-bit integer
    Integer(i64),
    /// Arbitrary-precision decimal
    Decimal(Decimal),
    /// String
    String(String),
    /// Date with precision
    Date(Date),
    /// DateTime with precision and optional offset
    DateTime(DateTime),
    /// Time-of-day with precision
    Time(Time),
    /// Quantity with optional unit
    Quantity(Quantity),
    /// Resource-like record
    Resource(Resource),
}

impl Value {
    /// FHIRPath type name of this item; resources report their declared type
    pub fn type_name(&self) -> &str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Time(_) => "Time",
            Value::Quantity(_) => "Quantity",
            Value::Resource(r) => r.resource_type().unwrap_or("Resource"),
        }
    }

    /// Strict FHIRPath equality. `None` means the comparison is unknown:
    /// mismatched temporal precisions, incomparable quantity units, or
    /// operands of different types.
    pub fn equals(&self, other: &Value) -> Option<bool> {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => Some(a == b),
            (Integer(a), Integer(b)) => Some(a == b),
            (Decimal(a), Decimal(b)) => Some(a == b),
            (Integer(a), Decimal(b)) => Some(&rust_decimal::Decimal::from(*a) == b),
            (Decimal(a), Integer(b)) => Some(a == &rust_decimal::Decimal::from(*b)),
            (String(a), String(b)) => Some(a == b),
            (Date(a), Date(b)) => match a.compare(b) {
                Some(ordering) => Some(ordering == Ordering::Equal),
                None => None,
            },
            (DateTime(a), DateTime(b)) => match a.compare(b) {
                Some(ordering) => Some(ordering == Ordering::Equal),
                None => None,
            },
            (Time(a), Time(b)) => match a.compare(b) {
                Some(ordering) => Some(ordering == Ordering::Equal),
                None => None,
            },
            (Quantity(a), Quantity(b)) => a.equals(b),
            (Resource(a), Resource(b)) => Some(a == b),
            _ => None,
        }
    }

    /// FHIRPath equivalence: total, forgiving about case, whitespace,
    /// trailing zeroes and precision
    pub fn equivalent(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Decimal(a), Decimal(b)) => a.normalize() == b.normalize(),
            (Integer(a), Decimal(b)) | (Decimal(b), Integer(a)) => {
                rust_decimal::Decimal::from(*a) == b.normalize()
            }
            (String(a), String(b)) => fold_string(a) == fold_string(b),
            (Date(a), Date(b)) => a.equivalent(b),
            (DateTime(a), DateTime(b)) => a.equivalent(b),
            (Time(a), Time(b)) => a.equivalent(b),
            (Quantity(a), Quantity(b)) => a.equivalent(b),
            (Resource(a), Resource(b)) => a == b,
            _ => false,
        }
    }

    /// Convert a JSON scalar or object into an item. Arrays have no single-
    /// item form; navigation expands them via [`Collection::from_json`].
    pub fn from_json(json: &JsonValue) -> Option<Value> {
        match json {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(Value::Boolean(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Integer(i))
                } else {
                    n.as_f64().and_then(Decimal::from_f64).map(Value::Decimal)
                }
            }
            JsonValue::String(s) => Some(Value::String(s.clone())),
            JsonValue::Object(_) => Some(Value::Resource(Resource::new(json.clone()))),
            JsonValue::Array(_) => None,
        }
    }

    /// Render as JSON for output
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Decimal(d) => {
                use rust_decimal::prelude::ToPrimitive;
                d.to_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or_else(|| JsonValue::String(d.to_string()))
            }
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Date(d) => JsonValue::String(d.to_string()),
            Value::DateTime(dt) => JsonValue::String(dt.to_string()),
            Value::Time(t) => JsonValue::String(t.to_string()),
            Value::Quantity(q) => serde_json::json!({
                "value": q.value.to_string(),
                "unit": q.unit,
            }),
            Value::Resource(r) => r.as_json().clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Quantity(q) => write!(f, "{q}"),
            Value::Resource(r) => write!(f, "{}", r.as_json()),
        }
    }
}

/// Case-folded, whitespace-collapsed form used by string equivalence
fn fold_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_whitespace = false;
    for ch in s.trim().chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
        } else {
            if in_whitespace {
                out.push(' ');
                in_whitespace = false;
            }
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// The universal result type: an ordered sequence of items behind an `Arc`
/// slice, so clones are cheap and inputs are never mutated
#[derive(Debug, Clone)]
pub struct Collection(Arc<[Value]>);

impl Collection {
    /// The empty collection
    pub fn empty() -> Self {
        Self(Arc::from([]))
    }

    /// A one-item collection
    pub fn singleton(value: Value) -> Self {
        Self(Arc::from([value]))
    }

    /// Build from a vector
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self(values.into())
    }

    /// Expand a JSON value the way path navigation does: null vanishes,
    /// arrays contribute one item per element, everything else is one item
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Array(items) => Self::from_vec(
                items.iter().filter_map(Value::from_json).collect(),
            ),
            other => match Value::from_json(other) {
                Some(v) => Self::singleton(v),
                None => Self::empty(),
            },
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no items
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the items
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// First item
    pub fn first(&self) -> Option<&Value> {
        self.0.first()
    }

    /// Last item
    pub fn last(&self) -> Option<&Value> {
        self.0.last()
    }

    /// Item by index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Underlying items as a slice
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Copy out as a vector
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.to_vec()
    }

    /// Cheap clone sharing the same backing slice
    pub fn share(&self) -> Self {
        Self(Arc::clone(&self.0))
    }

    /// Concatenate, reusing either side when the other is empty
    pub fn concat(&self, other: &Collection) -> Self {
        if self.is_empty() {
            return other.share();
        }
        if other.is_empty() {
            return self.share();
        }
        let mut items = self.to_vec();
        items.extend(other.iter().cloned());
        Self::from_vec(items)
    }

    /// The single item of a one-item collection
    pub fn as_singleton(&self) -> Option<&Value> {
        if self.0.len() == 1 { self.0.first() } else { None }
    }

    /// The boolean of a one-item boolean collection
    pub fn as_boolean(&self) -> Option<bool> {
        match self.as_singleton() {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Membership by FHIRPath equality
    pub fn contains_value(&self, value: &Value) -> bool {
        self.iter().any(|item| item.equals(value) == Some(true))
    }

    /// Strict collection equality: same length, pairwise equal in order.
    /// Unknown as soon as any pair is unknown.
    pub fn equals(&self, other: &Collection) -> Option<bool> {
        if self.len() != other.len() {
            return Some(false);
        }
        let mut result = true;
        for (a, b) in self.iter().zip(other.iter()) {
            match a.equals(b) {
                Some(true) => {}
                Some(false) => result = false,
                None => return None,
            }
        }
        Some(result)
    }

    /// Collection equivalence: same multiset under item equivalence
    pub fn equivalent(&self, other: &Collection) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut unmatched: Vec<&Value> = other.iter().collect();
        for item in self.iter() {
            match unmatched.iter().position(|candidate| item.equivalent(candidate)) {
                Some(idx) => {
                    unmatched.swap_remove(idx);
                }
                None => return false,
            }
        }
        true
    }

    /// Render as a JSON array for output
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(self.iter().map(Value::to_json).collect())
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Value>> for Collection {
    fn from(values: Vec<Value>) -> Self {
        Self::from_vec(values)
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_strict_equality_is_case_sensitive() {
        assert_eq!(
            Value::String("A".into()).equals(&Value::String("a".into())),
            Some(false)
        );
        assert!(Value::String("A".into()).equivalent(&Value::String("a".into())));
    }

    #[test]
    fn test_decimal_precision() {
        // 1.0 = 1.00 compares numerically
        assert_eq!(dec("1.0").equals(&dec("1.00")), Some(true));
        assert!(dec("1.0").equivalent(&dec("1.00")));
    }

    #[test]
    fn test_integer_decimal_promotion() {
        assert_eq!(Value::Integer(2).equals(&dec("2.0")), Some(true));
    }

    #[test]
    fn test_mixed_types_are_unknown() {
        assert_eq!(
            Value::Integer(30).equals(&Value::String("30".into())),
            None
        );
        assert!(!Value::Integer(30).equivalent(&Value::String("30".into())));
    }

    #[test]
    fn test_string_equivalence_collapses_whitespace() {
        assert!(
            Value::String("hello   World".into())
                .equivalent(&Value::String(" HELLO world ".into()))
        );
    }

    #[test]
    fn test_temporal_precision_equality() {
        let month = Value::Date(Date::parse("2020-01").unwrap());
        let day = Value::Date(Date::parse("2020-01-01").unwrap());
        assert_eq!(month.equals(&day), None);
        assert!(month.equivalent(&day));
    }

    #[test]
    fn test_collection_equivalence_is_multiset() {
        let a = Collection::from_vec(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Collection::from_vec(vec![Value::Integer(2), Value::Integer(1)]);
        assert!(a.equivalent(&b));
        assert_eq!(a.equals(&b), Some(false));
    }

    #[test]
    fn test_json_expansion() {
        let json = serde_json::json!([1, "two", null, true]);
        let collection = Collection::from_json(&json);
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.get(0), Some(&Value::Integer(1)));
    }
}
