//! String functions
//!
//! All of these single-ize their input: empty in, empty out; more than one
//! item is an error. Regexes use the `regex` crate's dialect; `matches` is
//! anchored over the whole string, `replaceMatches` substitutes every
//! occurrence. Compiled patterns are cached process-wide.

use super::super::function::{
    FunctionError, FunctionRegistry, FunctionResult, FunctionSignature,
};
use super::{arg_string, input_string, opt_arg_integer};
use crate::model::{Cardinality, Collection, FhirPathType, Value};
use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock};

static REGEX_CACHE: LazyLock<Mutex<FxHashMap<String, Arc<Regex>>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// Compile (or fetch) a pattern, reporting failures as function errors
fn compile_regex(name: &str, pattern: &str) -> FunctionResult<Arc<Regex>> {
    if let Some(re) = REGEX_CACHE.lock().get(pattern) {
        return Ok(Arc::clone(re));
    }
    let re = Regex::new(pattern).map_err(|e| FunctionError::Evaluation {
        name: name.to_string(),
        message: format!("invalid regular expression '{pattern}': {e}"),
    })?;
    let re = Arc::new(re);
    let mut cache = REGEX_CACHE.lock();
    if cache.len() >= 512 {
        cache.clear();
    }
    cache.insert(pattern.to_string(), Arc::clone(&re));
    Ok(re)
}

fn string_result(s: String) -> Collection {
    Collection::singleton(Value::String(s))
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register_eager(
        FunctionSignature::nullary("length", FhirPathType::Integer)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(match input_string("length", fc.input)? {
                Some(s) => Collection::singleton(Value::Integer(s.chars().count() as i64)),
                None => Collection::empty(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::optional_values("substring", 1, 2, FhirPathType::String)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("substring", fc.input)? else {
                return Ok(Collection::empty());
            };
            let start = match opt_arg_integer("substring", args, 0)? {
                Some(start) => start,
                None => return Ok(Collection::empty()),
            };
            let chars: Vec<char> = s.chars().collect();
            if start < 0 || start as usize >= chars.len() {
                return Ok(Collection::empty());
            }
            let start = start as usize;
            let end = match opt_arg_integer("substring", args, 1)? {
                Some(len) if len <= 0 => return Ok(string_result(String::new())),
                Some(len) => (start + len as usize).min(chars.len()),
                None => chars.len(),
            };
            Ok(string_result(chars[start..end].iter().collect()))
        },
    );

    registry.register_eager(
        FunctionSignature::values("contains", 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("contains", fc.input)? else {
                return Ok(Collection::empty());
            };
            let needle = arg_string("contains", args, 0)?;
            Ok(Collection::singleton(Value::Boolean(s.contains(&needle))))
        },
    );

    registry.register_eager(
        FunctionSignature::values("startsWith", 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("startsWith", fc.input)? else {
                return Ok(Collection::empty());
            };
            let prefix = arg_string("startsWith", args, 0)?;
            Ok(Collection::singleton(Value::Boolean(s.starts_with(&prefix))))
        },
    );

    registry.register_eager(
        FunctionSignature::values("endsWith", 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("endsWith", fc.input)? else {
                return Ok(Collection::empty());
            };
            let suffix = arg_string("endsWith", args, 0)?;
            Ok(Collection::singleton(Value::Boolean(s.ends_with(&suffix))))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("upper", FhirPathType::String)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(match input_string("upper", fc.input)? {
                Some(s) => string_result(s.to_uppercase()),
                None => Collection::empty(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("lower", FhirPathType::String)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(match input_string("lower", fc.input)? {
                Some(s) => string_result(s.to_lowercase()),
                None => Collection::empty(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("trim", FhirPathType::String)
            .with_cardinality(Cardinality::Optional),
        |fc, _| {
            Ok(match input_string("trim", fc.input)? {
                Some(s) => string_result(s.trim().to_string()),
                None => Collection::empty(),
            })
        },
    );

    registry.register_eager(
        FunctionSignature::values("indexOf", 1, FhirPathType::Integer)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("indexOf", fc.input)? else {
                return Ok(Collection::empty());
            };
            let needle = arg_string("indexOf", args, 0)?;
            let index = match s.find(&needle) {
                Some(byte_idx) => s[..byte_idx].chars().count() as i64,
                None => -1,
            };
            Ok(Collection::singleton(Value::Integer(index)))
        },
    );

    registry.register_eager(
        FunctionSignature::values("replace", 2, FhirPathType::String)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("replace", fc.input)? else {
                return Ok(Collection::empty());
            };
            let pattern = arg_string("replace", args, 0)?;
            let substitution = arg_string("replace", args, 1)?;
            Ok(string_result(s.replace(&pattern, &substitution)))
        },
    );

    registry.register_eager(
        FunctionSignature::values("matches", 1, FhirPathType::Boolean)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("matches", fc.input)? else {
                return Ok(Collection::empty());
            };
            let pattern = arg_string("matches", args, 0)?;
            // Anchored over the whole input
            let re = compile_regex("matches", &format!("^(?:{pattern})$"))?;
            Ok(Collection::singleton(Value::Boolean(re.is_match(&s))))
        },
    );

    registry.register_eager(
        FunctionSignature::values("replaceMatches", 2, FhirPathType::String)
            .with_cardinality(Cardinality::Optional),
        |fc, args| {
            let Some(s) = input_string("replaceMatches", fc.input)? else {
                return Ok(Collection::empty());
            };
            let pattern = arg_string("replaceMatches", args, 0)?;
            let substitution = arg_string("replaceMatches", args, 1)?;
            let re = compile_regex("replaceMatches", &pattern)?;
            Ok(string_result(re.replace_all(&s, substitution.as_str()).into_owned()))
        },
    );

    registry.register_eager(
        FunctionSignature::optional_values("split", 1, 2, FhirPathType::String),
        |fc, args| {
            let Some(s) = input_string("split", fc.input)? else {
                return Ok(Collection::empty());
            };
            let separator = arg_string("split", args, 0)?;
            let parts: Vec<Value> = match opt_arg_integer("split", args, 1)? {
                Some(limit) if limit > 0 => s
                    .splitn(limit as usize, &separator)
                    .map(|p| Value::String(p.to_string()))
                    .collect(),
                _ => s
                    .split(&separator)
                    .map(|p| Value::String(p.to_string()))
                    .collect(),
            };
            Ok(Collection::from_vec(parts))
        },
    );

    registry.register_eager(
        FunctionSignature::optional_values("join", 0, 1, FhirPathType::String)
            .with_cardinality(Cardinality::Single),
        |fc, args| {
            let separator = match args.first() {
                Some(c) if !c.is_empty() => arg_string("join", args, 0)?,
                _ => String::new(),
            };
            let mut parts = Vec::with_capacity(fc.input.len());
            for item in fc.input.iter() {
                match item {
                    Value::String(s) => parts.push(s.clone()),
                    other => {
                        return Err(FunctionError::InvalidInput {
                            name: "join".into(),
                            message: format!("expected strings, got {}", other.type_name()),
                        });
                    }
                }
            }
            Ok(string_result(parts.join(&separator)))
        },
    );

    registry.register_eager(
        FunctionSignature::nullary("toChars", FhirPathType::String),
        |fc, _| {
            Ok(match input_string("toChars", fc.input)? {
                Some(s) => s
                    .chars()
                    .map(|c| Value::String(c.to_string()))
                    .collect(),
                None => Collection::empty(),
            })
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_matches() {
        let re = compile_regex("matches", "^(?:\\d+)$").unwrap();
        assert!(re.is_match("123"));
        assert!(!re.is_match("a123"));
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let err = compile_regex("matches", "(unclosed").unwrap_err();
        assert!(matches!(err, FunctionError::Evaluation { .. }));
    }
}
