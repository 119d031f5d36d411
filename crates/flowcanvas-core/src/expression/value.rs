use std::fmt;

use serde_json::{Map, Number};

/// Runtime value of a condition expression.
///
/// Numbers are IEEE doubles, so `1 / 0` is infinite rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<serde_json::Value>),
    Object(Map<String, serde_json::Value>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Numeric coercion: null is 0, booleans are 0/1, strings parse (blank is 0), containers are NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) => f64::NAN,
        }
    }

    /// `==`: numeric coercion across number/string/bool, null only equals null,
    /// arrays and objects compare structurally.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
                self == other
            }
            _ => self.to_number() == other.to_number(),
        }
    }

    /// `===`: same type and equal value; NaN is never equal to itself.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self == other,
        }
    }

    /// Member lookup (`value.key` / `value[key]`). Missing members are null.
    /// Returns `None` when the receiver is null.
    pub fn member(&self, key: &Value) -> Option<Value> {
        match self {
            Value::Null => None,
            Value::Object(map) => Some(
                map.get(&key.to_string())
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            ),
            Value::Array(items) => match key {
                Value::Str(name) if name == "length" => Some(Value::Number(items.len() as f64)),
                _ => Some(index(items.len(), key).map_or(Value::Null, |i| Value::from(&items[i]))),
            },
            Value::Str(s) => match key {
                Value::Str(name) if name == "length" => {
                    Some(Value::Number(s.chars().count() as f64))
                }
                _ => Some(
                    index(s.chars().count(), key)
                        .and_then(|i| s.chars().nth(i))
                        .map_or(Value::Null, |c| Value::Str(c.to_string())),
                ),
            },
            Value::Bool(_) | Value::Number(_) => Some(Value::Null),
        }
    }
}

fn index(len: usize, key: &Value) -> Option<usize> {
    let n = key.to_number();
    if n.fract() != 0.0 || n < 0.0 || n >= len as f64 {
        return None;
    }
    Some(n as usize)
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.clone()),
            serde_json::Value::Object(map) => Value::Object(map.clone()),
        }
    }
}

impl From<Value> for serde_json::Value {
    /// Non-finite numbers have no JSON form and become null.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => Number::from_f64(n).map_or(serde_json::Value::Null, Into::into),
            Value::Str(s) => serde_json::Value::String(s),
            Value::Array(items) => serde_json::Value::Array(items),
            Value::Object(map) => serde_json::Value::Object(map),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.is_nan() => f.write_str("NaN"),
            Value::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                write!(f, "{}", serde_json::Value::Array(items.clone()))
            }
            Value::Object(map) => write!(f, "{}", serde_json::Value::Object(map.clone())),
        }
    }
}
