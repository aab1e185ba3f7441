//! Runtime values.
//!
//! Arrays and objects are plain values: scripts have no way to mutate them
//! in place, so copies are indistinguishable from references.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use super::error::ScriptError;

/// Host functions the sandbox injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `setHeader(key, value)`
    SetHeader,
    /// `setQuery(key, value)`
    SetQuery,
    /// `setBody(value)`
    SetBody,
    /// `setFormField(key, value)`
    SetFormField,
    /// `log(...)` and `console.log(...)`
    Log,
    /// `assert(condition, message)`
    Assert,
}

/// Pure functions available in every script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `JSON.parse`
    JsonParse,
    /// `JSON.stringify`
    JsonStringify,
    /// `String(value)`
    String,
    /// `Number(value)`
    Number,
    /// `Boolean(value)`
    Boolean,
    /// `Error(message)` called without `new`
    Error,
}

/// Something a script can call.
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    /// A host capability.
    Capability(Capability),
    /// A pure builtin.
    Builtin(Builtin),
    /// A string or array method bound to its receiver.
    Method {
        /// The value the method was read from.
        receiver: Box<ScriptValue>,
        /// Method name.
        name: String,
    },
}

/// A script value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Every number is a double.
    Number(f64),
    /// A string.
    String(String),
    /// An array.
    Array(Vec<ScriptValue>),
    /// An object with insertion-ordered keys.
    Object(IndexMap<String, ScriptValue>),
    /// An error built with `new Error(message)`.
    Error {
        /// Constructor name, e.g. `Error` or `TypeError`.
        name: String,
        /// The message.
        message: String,
    },
    /// A callable.
    Function(Callable),
}

const STRING_METHODS: &[&str] = &[
    "includes",
    "startsWith",
    "endsWith",
    "toUpperCase",
    "toLowerCase",
    "trim",
    "split",
];

const ARRAY_METHODS: &[&str] = &["includes", "join"];

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Largest value a script may build: string bytes, plus a few bytes per
/// scalar or element.
pub const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

/// Deepest array/object nesting a script may build.
pub const MAX_VALUE_DEPTH: usize = 256;

pub(crate) const SCALAR_WEIGHT: usize = 8;

/// Fails once `size` is past [`MAX_VALUE_SIZE`].
pub fn check_size(size: usize) -> Result<(), ScriptError> {
    if size > MAX_VALUE_SIZE {
        Err(ScriptError::too_large())
    } else {
        Ok(())
    }
}

impl ScriptValue {
    /// Approximate size of the value, counting it as nested `depth` levels deep.
    ///
    /// Returns `None` as soon as the size passes `budget` or the nesting
    /// passes [`MAX_VALUE_DEPTH`]; the walk stops there.
    #[must_use]
    pub fn weigh(&self, budget: usize, depth: usize) -> Option<usize> {
        let mut total = 0usize;
        let mut pending = vec![(self, depth)];
        while let Some((value, depth)) = pending.pop() {
            if depth > MAX_VALUE_DEPTH {
                return None;
            }
            total = total.saturating_add(match value {
                Self::String(s) => s.len(),
                Self::Error { name, message } => name.len() + message.len(),
                Self::Array(items) => {
                    pending.extend(items.iter().map(|item| (item, depth + 1)));
                    SCALAR_WEIGHT
                }
                Self::Object(map) => {
                    pending.extend(map.values().map(|item| (item, depth + 1)));
                    map.keys().map(String::len).sum::<usize>() + SCALAR_WEIGHT
                }
                Self::Function(Callable::Method { receiver, .. }) => {
                    pending.push((receiver, depth + 1));
                    SCALAR_WEIGHT
                }
                _ => SCALAR_WEIGHT,
            });
            if total > budget {
                return None;
            }
        }
        Some(total)
    }

    /// Passes the value through when it is within the sandbox limits.
    ///
    /// # Errors
    ///
    /// Returns a `RangeError` when it is too large or nested too deeply.
    pub fn within_limits(self) -> Result<Self, ScriptError> {
        match self.weigh(MAX_VALUE_SIZE, 0) {
            Some(_) => Ok(self),
            None => Err(ScriptError::too_large()),
        }
    }

    /// Creates a string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Converts a JSON document.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to JSON the way `JSON.stringify` does; `None` for values it skips.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        Some(match self {
            Self::Undefined | Self::Function(_) => return None,
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            // whole numbers serialize without a fraction
            Self::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serde_json::from_str(&format_number(*n)).unwrap_or(Value::Null)
            }
            Self::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(Value::Null))
                    .collect(),
            ),
            Self::Object(map) => Value::Object(
                map.iter()
                    .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
                    .collect::<Map<_, _>>(),
            ),
            Self::Error { .. } => Value::Object(Map::new()),
        })
    }

    /// JavaScript truthiness.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Error { .. } | Self::Function(_) => true,
        }
    }

    /// Returns true for `null` and `undefined`.
    #[must_use]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Result of `typeof`.
    #[must_use]
    pub const fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
            Self::Null | Self::Array(_) | Self::Object(_) | Self::Error { .. } => "object",
        }
    }

    /// String conversion, as `String(value)`.
    #[must_use]
    pub fn to_display(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_display()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => "[object Object]".to_string(),
            Self::Error { name, message } if message.is_empty() => name.clone(),
            Self::Error { name, message } => format!("{name}: {message}"),
            Self::Function(_) => "function () { [native code] }".to_string(),
        }
    }

    /// Text for logs: strings bare, structures as JSON.
    #[must_use]
    pub fn to_log_text(&self) -> String {
        match self {
            Self::Array(_) | Self::Object(_) => self
                .to_json()
                .map_or_else(|| self.to_display(), |json| json.to_string()),
            _ => self.to_display(),
        }
    }

    /// Number conversion, as `Number(value)`.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => Self::String(single.to_display()).to_number(),
                _ => f64::NAN,
            },
            Self::Undefined | Self::Object(_) | Self::Error { .. } | Self::Function(_) => f64::NAN,
        }
    }

    /// `===`
    #[must_use]
    pub fn strict_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            _ => self == other,
        }
    }

    /// `==`
    #[must_use]
    pub fn loose_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Self::Number(_), Self::String(_) | Self::Bool(_))
            | (Self::String(_) | Self::Bool(_), Self::Number(_))
            | (Self::Bool(_), Self::String(_))
            | (Self::String(_), Self::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }

    /// Reads `self[key]`.
    ///
    /// # Errors
    ///
    /// Reading a property of `null` or `undefined` is a type error.
    #[allow(clippy::cast_precision_loss)]
    pub fn get(&self, key: &str) -> Result<Self, ScriptError> {
        let method = |name: &str| {
            Self::Function(Callable::Method {
                receiver: Box::new(self.clone()),
                name: name.to_string(),
            })
        };

        Ok(match self {
            Self::Undefined | Self::Null => {
                return Err(ScriptError::Type(format!(
                    "Cannot read properties of {} (reading '{key}')",
                    self.to_display()
                )));
            }
            Self::String(s) => match key {
                "length" => Self::Number(s.encode_utf16().count() as f64),
                _ if STRING_METHODS.contains(&key) => method(key),
                _ => index(key)
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Self::Undefined, |c| Self::String(c.to_string())),
            },
            Self::Array(items) => match key {
                "length" => Self::Number(items.len() as f64),
                _ if ARRAY_METHODS.contains(&key) => method(key),
                _ => index(key)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Self::Undefined),
            },
            Self::Object(map) => match map.get(key) {
                Some(value) => value.clone(),
                None if key == "length" => Self::Number(map.len() as f64),
                None => Self::Undefined,
            },
            Self::Error { name, message } => match key {
                "name" => Self::String(name.clone()),
                "message" => Self::String(message.clone()),
                _ => Self::Undefined,
            },
            Self::Bool(_) | Self::Number(_) | Self::Function(_) => Self::Undefined,
        })
    }

    /// Message used when this value is thrown.
    #[must_use]
    pub fn thrown_message(&self) -> String {
        match self {
            Self::Error { message, .. } => message.clone(),
            Self::Object(map) => map
                .get("message")
                .map_or_else(|| self.to_display(), Self::to_display),
            _ => self.to_display(),
        }
    }
}

fn index(key: &str) -> Option<usize> {
    key.parse().ok()
}

/// Formats a number the way JavaScript prints it for common values.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}
