//! Model provider interface
//!
//! The only schema collaborator the engine knows about. A provider answers
//! type questions about resource-shaped values; the engine falls back to
//! structural JSON behavior when none is configured. Provider failures
//! surface as runtime errors preserving the cause.

use super::resource::Resource;
use super::types::{Cardinality, FhirPathType};
use thiserror::Error;

/// Failure reported by a model provider
#[derive(Error, Debug)]
#[error("model provider error: {message}")]
pub struct ModelError {
    /// Human-readable description
    message: String,
    /// Underlying cause, when one exists
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ModelError {
    /// Create an error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result alias for provider calls
pub type ModelResult<T> = Result<T, ModelError>;

/// Schema interface consulted for `is`/`as`, choice-field resolution,
/// reference resolution and the typed pipeline
///
/// All methods are synchronous; implementations are free to block.
pub trait ModelProvider: Send + Sync {
    /// Declared type name of a resource-like value
    fn type_of(&self, resource: &Resource) -> ModelResult<Option<String>> {
        Ok(resource.resource_type().map(str::to_string))
    }

    /// Whether `sub` is a subtype of `sup` in the model's hierarchy
    fn is_subtype_of(&self, sub: &str, sup: &str) -> ModelResult<bool>;

    /// Resolve a choice-typed field: given the bare name (`value`), return
    /// the concrete field name (`valueQuantity`) and its type
    fn resolve_choice(
        &self,
        resource: &Resource,
        field: &str,
    ) -> ModelResult<Option<(String, FhirPathType)>>;

    /// Resolve a reference string to a value; local `#id` references search
    /// the root's contained resources
    fn resolve_reference(
        &self,
        reference: &str,
        root: &Resource,
    ) -> ModelResult<Option<Resource>>;

    /// Static type of a property, for the typed pipeline
    fn property_type(
        &self,
        parent: &str,
        property: &str,
    ) -> ModelResult<Option<(FhirPathType, Cardinality)>>;
}

/// Provider with no schema knowledge: name-equality subtyping, prefix-scan
/// choice resolution and contained-only reference resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyModelProvider;

impl ModelProvider for EmptyModelProvider {
    fn is_subtype_of(&self, sub: &str, sup: &str) -> ModelResult<bool> {
        Ok(sub == sup || sup == "Resource" || sup == "DomainResource")
    }

    fn resolve_choice(
        &self,
        resource: &Resource,
        field: &str,
    ) -> ModelResult<Option<(String, FhirPathType)>> {
        Ok(resource.choice_field(field).map(|(name, _, suffix)| {
            let ty = FhirPathType::from_type_name(suffix)
                .unwrap_or_else(|| FhirPathType::Resource(suffix.to_string()));
            (name.to_string(), ty)
        }))
    }

    fn resolve_reference(
        &self,
        reference: &str,
        root: &Resource,
    ) -> ModelResult<Option<Resource>> {
        match reference.strip_prefix('#') {
            Some(id) => Ok(root.find_contained(id)),
            None => Ok(None),
        }
    }

    fn property_type(
        &self,
        _parent: &str,
        _property: &str,
    ) -> ModelResult<Option<(FhirPathType, Cardinality)>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_provider_choice_scan() {
        let provider = EmptyModelProvider;
        let observation = Resource::new(json!({
            "resourceType": "Observation",
            "valueString": "positive"
        }));
        let (field, ty) = provider
            .resolve_choice(&observation, "value")
            .unwrap()
            .unwrap();
        assert_eq!(field, "valueString");
        assert_eq!(ty, FhirPathType::String);
    }

    #[test]
    fn test_empty_provider_contained_reference() {
        let provider = EmptyModelProvider;
        let root = Resource::new(json!({
            "resourceType": "MedicationRequest",
            "contained": [{ "resourceType": "Medication", "id": "m1" }]
        }));
        let resolved = provider.resolve_reference("#m1", &root).unwrap().unwrap();
        assert_eq!(resolved.resource_type(), Some("Medication"));
        assert!(provider.resolve_reference("Patient/123", &root).unwrap().is_none());
    }
}
