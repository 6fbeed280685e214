//! Value model: items, collections, temporals, quantities, resources and
//! the static type lattice

pub mod provider;
pub mod quantity;
pub mod resource;
pub mod temporal;
pub mod types;
pub mod value;

pub use provider::{EmptyModelProvider, ModelError, ModelProvider, ModelResult};
pub use quantity::Quantity;
pub use resource::Resource;
pub use temporal::{CalendarUnit, Date, DateTime, TemporalPrecision, Time};
pub use types::{Cardinality, FhirPathType};
pub use value::{Collection, Value};
