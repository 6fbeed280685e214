//! JSON-shaped resource records
//!
//! A resource is an ordered map of field name to value, backed by a shared
//! `serde_json::Value`. Navigation treats an absent field as empty, a scalar
//! field as one item and an array field as N items; choice-typed fields
//! (`value[x]`) are found by prefix scan when no model provider refines them.

use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// A resource-like record (FHIR resource, backbone element or plain object)
///
/// Complex values navigated out of choice-typed fields carry no
/// `resourceType` of their own; `declared_type` preserves the datatype the
/// field name (or the model provider) revealed, so `is`/`as`/`ofType` keep
/// working below the resource level.
#[derive(Debug, Clone)]
pub struct Resource {
    json: Arc<JsonValue>,
    declared_type: Option<Arc<str>>,
}

impl Resource {
    /// Wrap a JSON object
    pub fn new(value: JsonValue) -> Self {
        Self {
            json: Arc::new(value),
            declared_type: None,
        }
    }

    /// Wrap an already-shared JSON value
    pub fn from_shared(value: Arc<JsonValue>) -> Self {
        Self {
            json: value,
            declared_type: None,
        }
    }

    /// Same record, annotated with the datatype its source field declared
    pub fn with_declared_type(&self, type_name: &str) -> Self {
        Self {
            json: Arc::clone(&self.json),
            declared_type: Some(Arc::from(type_name)),
        }
    }

    /// The underlying JSON
    pub fn as_json(&self) -> &JsonValue {
        &self.json
    }

    /// Shared handle to the underlying JSON
    pub fn share_json(&self) -> Arc<JsonValue> {
        Arc::clone(&self.json)
    }

    /// The object fields, when this is an object
    pub fn fields(&self) -> Option<&Map<String, JsonValue>> {
        self.json.as_object()
    }

    /// Declared type: the `resourceType` field, or the datatype annotation
    /// picked up during choice-field navigation
    pub fn resource_type(&self) -> Option<&str> {
        self.json
            .get("resourceType")
            .and_then(JsonValue::as_str)
            .or(self.declared_type.as_deref())
    }

    /// The `id` field, when present
    pub fn id(&self) -> Option<&str> {
        self.json.get("id").and_then(JsonValue::as_str)
    }

    /// Direct field access
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.json.get(name)
    }

    /// Resolve a choice-typed field by prefix scan: asking for `value` finds
    /// `valueQuantity`, `valueString` and so on. Returns the concrete field
    /// name, its value and the capitalized type suffix.
    pub fn choice_field(&self, name: &str) -> Option<(&str, &JsonValue, &str)> {
        let object = self.fields()?;
        for (key, value) in object {
            if let Some(suffix) = key.strip_prefix(name) {
                if suffix.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                    return Some((key.as_str(), value, suffix));
                }
            }
        }
        None
    }

    /// Look up a contained resource by local id (`#xyz` references)
    pub fn find_contained(&self, id: &str) -> Option<Resource> {
        let contained = self.json.get("contained")?.as_array()?;
        contained
            .iter()
            .find(|entry| entry.get("id").and_then(JsonValue::as_str) == Some(id))
            .map(|entry| Resource::new(entry.clone()))
    }

    /// Identity for cycle detection: pointer of the shared JSON
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.json) as *const () as usize
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        // Deep JSON equality; Arc pointer equality is just a fast path
        Arc::ptr_eq(&self.json, &other.json) || self.json == other.json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_choice_field_scan() {
        let r = Resource::new(json!({
            "resourceType": "Observation",
            "valueQuantity": { "value": 7.2, "unit": "mg" }
        }));
        let (field, _, suffix) = r.choice_field("value").unwrap();
        assert_eq!(field, "valueQuantity");
        assert_eq!(suffix, "Quantity");
        assert!(r.choice_field("component").is_none());
    }

    #[test]
    fn test_contained_lookup() {
        let r = Resource::new(json!({
            "resourceType": "MedicationRequest",
            "contained": [
                { "resourceType": "Medication", "id": "med1", "code": { "text": "x" } }
            ]
        }));
        let med = r.find_contained("med1").unwrap();
        assert_eq!(med.resource_type(), Some("Medication"));
        assert!(r.find_contained("nope").is_none());
    }
}
