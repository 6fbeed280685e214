//! Static type lattice for the typed pipeline
//!
//! Only built and consulted when a model provider is configured. `Empty` is
//! the bottom of the lattice and `Any` the top; `Choice` covers FHIR
//! choice-typed elements and joins of unrelated types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred FHIRPath type of an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FhirPathType {
    /// Top: anything
    Any,
    /// Boolean
    Boolean,
    /// Integer
    Integer,
    /// Decimal
    Decimal,
    /// String
    String,
    /// Date
    Date,
    /// Time
    Time,
    /// DateTime
    DateTime,
    /// Quantity
    Quantity,
    /// Homogeneous collection
    Collection(Box<FhirPathType>),
    /// Named resource or complex type
    Resource(String),
    /// One of several alternatives
    Choice(Vec<FhirPathType>),
    /// Bottom: the type of `{}`
    Empty,
}

/// How many items an expression may produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// Exactly one
    Single,
    /// Zero or one
    Optional,
    /// Any number
    Many,
}

impl FhirPathType {
    /// Subtype test. `Empty` is below everything, `Any` above everything,
    /// `Integer` promotes to `Decimal`, choices are covered alternative by
    /// alternative.
    pub fn is_subtype_of(&self, other: &FhirPathType) -> bool {
        use FhirPathType::*;
        match (self, other) {
            (Empty, _) => true,
            (_, Any) => true,
            (Integer, Decimal) => true,
            (Collection(a), Collection(b)) => a.is_subtype_of(b),
            // A collection of T is still usable where T flows, FHIRPath
            // being collection-oriented throughout
            (Collection(a), b) => a.is_subtype_of(b),
            (a, Collection(b)) => a.is_subtype_of(b),
            (Choice(alternatives), b) => alternatives.iter().all(|a| a.is_subtype_of(b)),
            (a, Choice(alternatives)) => alternatives.iter().any(|b| a.is_subtype_of(b)),
            (Resource(a), Resource(b)) => a == b || b == "Resource" || b == "DomainResource",
            (a, b) => a == b,
        }
    }

    /// Least upper bound of two types
    pub fn widen(&self, other: &FhirPathType) -> FhirPathType {
        use FhirPathType::*;
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Empty, t) | (t, Empty) => t.clone(),
            (Any, _) | (_, Any) => Any,
            (Integer, Decimal) | (Decimal, Integer) => Decimal,
            (Choice(a), Choice(b)) => {
                let mut alternatives = a.clone();
                for t in b {
                    if !alternatives.contains(t) {
                        alternatives.push(t.clone());
                    }
                }
                Choice(alternatives)
            }
            (Choice(a), t) | (t, Choice(a)) => {
                let mut alternatives = a.clone();
                if !alternatives.contains(t) {
                    alternatives.push(t.clone());
                }
                Choice(alternatives)
            }
            (a, b) => {
                if a.is_subtype_of(b) {
                    b.clone()
                } else if b.is_subtype_of(a) {
                    a.clone()
                } else {
                    Choice(vec![a.clone(), b.clone()])
                }
            }
        }
    }

    /// Greatest lower bound of two types; `Empty` when they are disjoint
    pub fn narrow(&self, other: &FhirPathType) -> FhirPathType {
        use FhirPathType::*;
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Any, t) | (t, Any) => t.clone(),
            (Choice(alternatives), t) | (t, Choice(alternatives)) => {
                let kept: Vec<FhirPathType> = alternatives
                    .iter()
                    .filter(|a| a.is_subtype_of(t) || t.is_subtype_of(a))
                    .cloned()
                    .collect();
                match kept.len() {
                    0 => Empty,
                    1 => kept.into_iter().next().unwrap(),
                    _ => Choice(kept),
                }
            }
            (a, b) => {
                if a.is_subtype_of(b) {
                    a.clone()
                } else if b.is_subtype_of(a) {
                    b.clone()
                } else {
                    Empty
                }
            }
        }
    }

    /// Element type with any collection wrapper removed
    pub fn element_type(&self) -> &FhirPathType {
        match self {
            FhirPathType::Collection(inner) => inner.element_type(),
            other => other,
        }
    }

    /// Whether arithmetic applies
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.element_type(),
            FhirPathType::Integer | FhirPathType::Decimal | FhirPathType::Quantity
        )
    }

    /// Whether order comparison applies
    pub fn is_orderable(&self) -> bool {
        matches!(
            self.element_type(),
            FhirPathType::Integer
                | FhirPathType::Decimal
                | FhirPathType::String
                | FhirPathType::Date
                | FhirPathType::DateTime
                | FhirPathType::Time
                | FhirPathType::Quantity
        )
    }

    /// Resolve a simple type name as written in `is`/`as` expressions
    pub fn from_type_name(name: &str) -> Option<FhirPathType> {
        let bare = name.strip_prefix("System.").unwrap_or(name);
        match bare {
            "Boolean" | "boolean" => Some(FhirPathType::Boolean),
            "Integer" | "integer" => Some(FhirPathType::Integer),
            "Decimal" | "decimal" => Some(FhirPathType::Decimal),
            "String" | "string" => Some(FhirPathType::String),
            "Date" | "date" => Some(FhirPathType::Date),
            "DateTime" | "dateTime" => Some(FhirPathType::DateTime),
            "Time" | "time" => Some(FhirPathType::Time),
            "Quantity" => Some(FhirPathType::Quantity),
            _ => None,
        }
    }
}

impl Cardinality {
    /// Least upper bound of two cardinalities
    pub fn widen(&self, other: Cardinality) -> Cardinality {
        use Cardinality::*;
        match (self, other) {
            (Many, _) | (_, Many) => Many,
            (Optional, _) | (_, Optional) => Optional,
            _ => Single,
        }
    }
}

impl fmt::Display for FhirPathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Integer => write!(f, "Integer"),
            Self::Decimal => write!(f, "Decimal"),
            Self::String => write!(f, "String"),
            Self::Date => write!(f, "Date"),
            Self::Time => write!(f, "Time"),
            Self::DateTime => write!(f, "DateTime"),
            Self::Quantity => write!(f, "Quantity"),
            Self::Collection(inner) => write!(f, "Collection<{inner}>"),
            Self::Resource(name) => write!(f, "{name}"),
            Self::Choice(alternatives) => {
                let names: Vec<String> = alternatives.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", names.join(" | "))
            }
            Self::Empty => write!(f, "Empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtyping() {
        assert!(FhirPathType::Integer.is_subtype_of(&FhirPathType::Decimal));
        assert!(FhirPathType::Empty.is_subtype_of(&FhirPathType::Boolean));
        assert!(FhirPathType::Quantity.is_subtype_of(&FhirPathType::Any));
        assert!(!FhirPathType::Decimal.is_subtype_of(&FhirPathType::Integer));
        assert!(
            FhirPathType::Resource("Patient".into())
                .is_subtype_of(&FhirPathType::Resource("Resource".into()))
        );
    }

    #[test]
    fn test_widen_narrow() {
        let joined = FhirPathType::Integer.widen(&FhirPathType::Decimal);
        assert_eq!(joined, FhirPathType::Decimal);

        let choice = FhirPathType::String.widen(&FhirPathType::Quantity);
        assert!(matches!(choice, FhirPathType::Choice(_)));

        let met = choice.narrow(&FhirPathType::Quantity);
        assert_eq!(met, FhirPathType::Quantity);

        assert_eq!(
            FhirPathType::String.narrow(&FhirPathType::Boolean),
            FhirPathType::Empty
        );
    }

    #[test]
    fn test_cardinality_widen() {
        assert_eq!(
            Cardinality::Single.widen(Cardinality::Optional),
            Cardinality::Optional
        );
        assert_eq!(Cardinality::Optional.widen(Cardinality::Many), Cardinality::Many);
    }
}
