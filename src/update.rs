//! `{PATH}={VALUE}` property assignments shared by the record tools.

use std::fmt::Display;
use std::str::FromStr;

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::record::Record;

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue<T> {
    pub path: String,
    pub value: T,
}

/// Parse `PATH=VALUE`. Used as a clap value parser.
pub fn parse_key_value<T>(raw: &str) -> std::result::Result<KeyValue<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    let Some((path, value)) = raw.split_once('=') else {
        return Err(format!("expected PATH=VALUE, got '{raw}'"));
    };
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("missing path in '{raw}'"));
    }
    let value = value
        .parse::<T>()
        .map_err(|err| format!("invalid value for '{path}': {err}"))?;
    Ok(KeyValue {
        path: path.to_string(),
        value,
    })
}

/// String, integer and float assignments applied in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyUpdates {
    pub strings: Vec<KeyValue<String>>,
    pub ints: Vec<KeyValue<i64>>,
    pub floats: Vec<KeyValue<f64>>,
}

impl PropertyUpdates {
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.ints.is_empty() && self.floats.is_empty()
    }

    /// Set every path whose current value differs. Returns true if anything changed.
    pub fn apply(&self, record: &mut Record) -> Result<bool> {
        // JSON has no NaN or infinity.
        if let Some(kv) = self.floats.iter().find(|kv| !kv.value.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "{} must be a finite number, got {}",
                kv.path, kv.value
            )));
        }

        let mut changed = false;

        for kv in &self.strings {
            let same = record.get(&kv.path).map(as_text).as_deref() == Some(kv.value.as_str());
            if !same {
                record.set(&kv.path, json!(kv.value))?;
                changed = true;
            }
        }

        for kv in &self.ints {
            let same = record.get(&kv.path).and_then(as_int) == Some(kv.value);
            if !same {
                record.set(&kv.path, json!(kv.value))?;
                changed = true;
            }
        }

        for kv in &self.floats {
            let same = record.get(&kv.path).and_then(as_float) == Some(kv.value);
            if !same {
                record.set(&kv.path, json!(kv.value))?;
                changed = true;
            }
        }

        Ok(changed)
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
