//! Quantity values
//!
//! A quantity pairs a decimal value with an optional unit string. Unit
//! handling is deliberately shallow: calendar words are normalized to their
//! UCUM codes so `3 days` and `3 'd'` agree, and all other units compare by
//! string equality. Dimensional analysis belongs to an external terminology
//! collaborator and is out of scope here.

use super::temporal::CalendarUnit;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Quantity value with optional unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Numeric value
    pub value: Decimal,
    /// Unit as written (calendar words keep their pluralization)
    pub unit: Option<String>,
}

impl Quantity {
    /// Create a new quantity
    pub fn new(value: Decimal, unit: Option<String>) -> Self {
        Self { value, unit }
    }

    /// Create a unitless quantity
    pub fn unitless(value: Decimal) -> Self {
        Self { value, unit: None }
    }

    /// The calendar unit, when the unit is a calendar word or time code
    pub fn calendar_unit(&self) -> Option<CalendarUnit> {
        self.unit.as_deref().and_then(CalendarUnit::from_unit)
    }

    /// Canonical unit key for comparison: calendar words collapse to their
    /// UCUM code, everything else compares verbatim
    fn unit_key(&self) -> Option<&str> {
        match &self.unit {
            None => None,
            Some(u) => Some(CalendarUnit::from_unit(u).map(|c| c.code()).unwrap_or(u)),
        }
    }

    /// Whether the units are trivially comparable
    pub fn same_dimension(&self, other: &Quantity) -> bool {
        self.unit_key() == other.unit_key()
    }

    /// FHIRPath equality: `None` when units are not comparable
    pub fn equals(&self, other: &Quantity) -> Option<bool> {
        if self.same_dimension(other) {
            Some(self.value == other.value)
        } else {
            None
        }
    }

    /// Equivalence: incomparable units are simply not equivalent
    pub fn equivalent(&self, other: &Quantity) -> bool {
        self.same_dimension(other) && self.value.normalize() == other.value.normalize()
    }

    /// Ordering: `None` when units are not comparable
    pub fn compare(&self, other: &Quantity) -> Option<Ordering> {
        if self.same_dimension(other) {
            Some(self.value.cmp(&other.value))
        } else {
            None
        }
    }

    /// Add or subtract a quantity with the same unit
    pub fn checked_add(&self, other: &Quantity) -> Option<Quantity> {
        if !self.same_dimension(other) {
            return None;
        }
        Some(Quantity {
            value: self.value.checked_add(other.value)?,
            unit: self.unit.clone(),
        })
    }

    /// Subtract a quantity with the same unit
    pub fn checked_sub(&self, other: &Quantity) -> Option<Quantity> {
        if !self.same_dimension(other) {
            return None;
        }
        Some(Quantity {
            value: self.value.checked_sub(other.value)?,
            unit: self.unit.clone(),
        })
    }

    /// Scale by a plain number
    pub fn scale(&self, factor: Decimal) -> Option<Quantity> {
        Some(Quantity {
            value: self.value.checked_mul(factor)?,
            unit: self.unit.clone(),
        })
    }

    /// Divide by a plain number
    pub fn divide(&self, divisor: Decimal) -> Option<Quantity> {
        if divisor.is_zero() {
            return None;
        }
        Some(Quantity {
            value: self.value.checked_div(divisor)?,
            unit: self.unit.clone(),
        })
    }

    /// Negate the value
    pub fn negate(&self) -> Quantity {
        Quantity {
            value: -self.value,
            unit: self.unit.clone(),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) if CalendarUnit::from_unit(unit).is_some() && !unit.contains('\'') => {
                write!(f, "{} {}", self.value, unit)
            }
            Some(unit) => write!(f, "{} '{}'", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}
