//! Pure builtins: `JSON`, conversions and string/array methods.

use std::io;

use super::error::ScriptError;
use super::value::{Builtin, MAX_VALUE_SIZE, SCALAR_WEIGHT, ScriptValue, check_size};

/// Output buffer that refuses to grow past [`MAX_VALUE_SIZE`].
#[derive(Default)]
struct BoundedBuffer(Vec<u8>);

impl io::Write for BoundedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.0.len() + buf.len() > MAX_VALUE_SIZE {
            return Err(io::Error::other("output too large"));
        }
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn arg(args: &[ScriptValue], index: usize) -> ScriptValue {
    args.get(index).cloned().unwrap_or(ScriptValue::Undefined)
}

/// Calls a builtin function.
pub fn call_builtin(builtin: Builtin, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
    let first = arg(args, 0);
    match builtin {
        Builtin::JsonParse => {
            let text = first.to_display();
            serde_json::from_str(&text)
                .map(|json| ScriptValue::from_json(&json))
                .map_err(|e| ScriptError::Thrown(format!("Unexpected token in JSON: {e}")))
        }
        Builtin::JsonStringify => {
            let Some(json) = first.to_json() else {
                return Ok(ScriptValue::Undefined);
            };
            let mut buffer = BoundedBuffer::default();
            let written = if arg(args, 2).to_number() >= 1.0 {
                serde_json::to_writer_pretty(&mut buffer, &json)
            } else {
                serde_json::to_writer(&mut buffer, &json)
            };
            written.map_err(|_| ScriptError::too_large())?;
            Ok(ScriptValue::String(
                String::from_utf8_lossy(&buffer.0).into_owned(),
            ))
        }
        Builtin::String => Ok(ScriptValue::String(if args.is_empty() {
            String::new()
        } else {
            first.to_display()
        })),
        Builtin::Number => Ok(ScriptValue::Number(if args.is_empty() {
            0.0
        } else {
            first.to_number()
        })),
        Builtin::Boolean => Ok(ScriptValue::Bool(first.is_truthy())),
        Builtin::Error => Ok(make_error("Error", &first)),
    }
}

/// Builds an error object as `new <name>(message)` does.
pub fn make_error(name: &str, message: &ScriptValue) -> ScriptValue {
    ScriptValue::Error {
        name: name.to_string(),
        message: if message.is_nullish() {
            String::new()
        } else {
            message.to_display()
        },
    }
}

/// Calls a method bound to a string or array.
pub fn call_method(
    receiver: &ScriptValue,
    name: &str,
    args: &[ScriptValue],
) -> Result<ScriptValue, ScriptError> {
    let first = arg(args, 0);
    match receiver {
        ScriptValue::String(s) => Ok(match name {
            "includes" => ScriptValue::Bool(s.contains(&first.to_display())),
            "startsWith" => ScriptValue::Bool(s.starts_with(&first.to_display())),
            "endsWith" => ScriptValue::Bool(s.ends_with(&first.to_display())),
            "toUpperCase" => ScriptValue::String(s.to_uppercase()),
            "toLowerCase" => ScriptValue::String(s.to_lowercase()),
            "trim" => ScriptValue::String(s.trim().to_string()),
            "split" => ScriptValue::Array(split(s, &first)?),
            _ => return Err(not_a_function(name)),
        }),
        ScriptValue::Array(items) => Ok(match name {
            "includes" => ScriptValue::Bool(items.iter().any(|item| {
                item.strict_equals(&first)
                    || matches!((item, &first), (ScriptValue::Number(a), ScriptValue::Number(b)) if a.is_nan() && b.is_nan())
            })),
            "join" => {
                let separator = if first.is_nullish() {
                    ",".to_string()
                } else {
                    first.to_display()
                };
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_display()
                        }
                    })
                    .collect();
                let size = parts
                    .iter()
                    .map(String::len)
                    .fold(0usize, usize::saturating_add)
                    .saturating_add(
                        separator
                            .len()
                            .saturating_mul(parts.len().saturating_sub(1)),
                    );
                check_size(size)?;
                ScriptValue::String(parts.join(&separator))
            }
            _ => return Err(not_a_function(name)),
        }),
        _ => Err(not_a_function(name)),
    }
}

fn split(s: &str, separator: &ScriptValue) -> Result<Vec<ScriptValue>, ScriptError> {
    if separator.is_nullish() {
        return Ok(vec![ScriptValue::string(s)]);
    }
    let separator = separator.to_display();
    let pieces = if separator.is_empty() {
        s.chars().count()
    } else {
        s.matches(separator.as_str()).count() + 1
    };
    check_size(s.len().saturating_add(pieces.saturating_mul(SCALAR_WEIGHT)))?;
    if separator.is_empty() {
        return Ok(s.chars().map(|c| ScriptValue::String(c.to_string())).collect());
    }
    Ok(s.split(separator.as_str()).map(ScriptValue::string).collect())
}

pub fn not_a_function(name: &str) -> ScriptError {
    ScriptError::Type(format!("{name} is not a function"))
}
