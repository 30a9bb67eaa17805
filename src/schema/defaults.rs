//! Default overrides for missing document fields
//!
//! Overrides arrive as `key=value` strings. Values stay strings except for
//! `year`, which is coerced to an integer.

use serde_json::Value;
use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult};

/// Keys whose default values are coerced to integers.
const INTEGER_KEYS: [&str; 1] = ["year"];

/// Typed default values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultOverrides {
    values: BTreeMap<String, Value>,
}

impl DefaultOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key=value` pairs. The value may itself contain `=`.
    pub fn parse_pairs<S: AsRef<str>>(pairs: &[S]) -> SchemaResult<Self> {
        let mut overrides = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| SchemaError::invalid_default(pair, "expected key=value"))?;
            if key.is_empty() {
                return Err(SchemaError::invalid_default(pair, "empty key"));
            }
            overrides.insert_raw(key, raw)?;
        }
        Ok(overrides)
    }

    /// Inserts a raw string value, applying the coercion rule.
    pub fn insert_raw(&mut self, key: &str, raw: &str) -> SchemaResult<()> {
        let value = coerce_default(key, raw)
            .map_err(|reason| SchemaError::invalid_default(&format!("{}={}", key, raw), reason))?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Inserts an already-typed value without coercion.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Converts a raw default string to the value stored in the document.
pub fn coerce_default(key: &str, raw: &str) -> Result<Value, String> {
    if INTEGER_KEYS.contains(&key) {
        raw.trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("{} must be an integer", key))
    } else {
        Ok(Value::String(raw.to_string()))
    }
}
