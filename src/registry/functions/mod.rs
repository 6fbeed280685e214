//! Built-in function library, grouped by category

pub mod combining;
pub mod conversion;
pub mod datetime;
pub mod existence;
pub mod filtering;
pub mod math;
pub mod navigation;
pub mod strings;
pub mod subsetting;
pub mod utility;

use super::function::{FunctionError, FunctionRegistry, FunctionResult};
use crate::model::{Collection, Value};

/// Register every built-in
pub fn register_all(registry: &mut FunctionRegistry) {
    existence::register(registry);
    filtering::register(registry);
    subsetting::register(registry);
    combining::register(registry);
    conversion::register(registry);
    strings::register(registry);
    math::register(registry);
    datetime::register(registry);
    navigation::register(registry);
    utility::register(registry);
}

/// The single item of the input, or `None` for empty; larger collections
/// are an error
pub(crate) fn expect_singleton<'a>(
    name: &str,
    input: &'a Collection,
) -> FunctionResult<Option<&'a Value>> {
    match input.len() {
        0 => Ok(None),
        1 => Ok(input.first()),
        count => Err(FunctionError::InvalidInput {
            name: name.to_string(),
            message: format!("expected at most one item, got {count}"),
        }),
    }
}

/// The single string of the input, or `None` for empty
pub(crate) fn input_string(name: &str, input: &Collection) -> FunctionResult<Option<String>> {
    match expect_singleton(name, input)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(FunctionError::InvalidInput {
            name: name.to_string(),
            message: format!("expected a string, got {}", other.type_name()),
        }),
    }
}

/// Required string argument
pub(crate) fn arg_string(
    name: &str,
    args: &[Collection],
    index: usize,
) -> FunctionResult<String> {
    match args.get(index).and_then(Collection::as_singleton) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(FunctionError::InvalidArgument {
            name: name.to_string(),
            index,
            message: format!("expected a string, got {}", other.type_name()),
        }),
        None => Err(FunctionError::InvalidArgument {
            name: name.to_string(),
            index,
            message: "expected a single string".to_string(),
        }),
    }
}

/// Required integer argument
pub(crate) fn arg_integer(
    name: &str,
    args: &[Collection],
    index: usize,
) -> FunctionResult<i64> {
    match args.get(index).and_then(Collection::as_singleton) {
        Some(Value::Integer(i)) => Ok(*i),
        Some(other) => Err(FunctionError::InvalidArgument {
            name: name.to_string(),
            index,
            message: format!("expected an integer, got {}", other.type_name()),
        }),
        None => Err(FunctionError::InvalidArgument {
            name: name.to_string(),
            index,
            message: "expected a single integer".to_string(),
        }),
    }
}

/// Optional integer argument; `None` when absent or empty
pub(crate) fn opt_arg_integer(
    name: &str,
    args: &[Collection],
    index: usize,
) -> FunctionResult<Option<i64>> {
    match args.get(index) {
        None => Ok(None),
        Some(c) if c.is_empty() => Ok(None),
        Some(_) => arg_integer(name, args, index).map(Some),
    }
}

/// Truthiness of an expression-argument result inside `where`/`exists`/…:
/// only the boolean `true` keeps an item
pub(crate) fn criteria_met(result: &Collection) -> bool {
    result.as_boolean() == Some(true)
}
