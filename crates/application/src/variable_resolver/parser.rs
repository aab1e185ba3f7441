//! Variable parser for `{{variable}}` syntax
//!
//! A token is `{{`, optional whitespace, a name of ASCII letters, digits,
//! `_`, `.` or `-`, optional whitespace and `}}`. Anything else is text.

use std::ops::Range;

/// Represents a parsed variable reference in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// The variable name, whitespace trimmed.
    pub name: String,

    /// Byte range of the whole token, braces included.
    pub span: Range<usize>,
}

impl VariableReference {
    /// Creates a new variable reference.
    #[must_use]
    pub fn new(name: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Returns true for characters allowed in a variable name.
const fn is_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-')
}

/// Tries to read a token starting at `start`, which must point at `{{`.
fn match_token(bytes: &[u8], start: usize) -> Option<(Range<usize>, Range<usize>)> {
    let mut pos = start + 2;
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    let name_start = pos;
    while pos < bytes.len() && is_name_char(bytes[pos]) {
        pos += 1;
    }
    let name_end = pos;
    if name_start == name_end {
        return None;
    }
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if bytes.get(pos..pos + 2) == Some(b"}}".as_slice()) {
        Some((start..pos + 2, name_start..name_end))
    } else {
        None
    }
}

/// Parses a string and extracts all variable references, left to right.
///
/// Malformed tokens are skipped, never reported as errors.
///
/// # Examples
///
/// ```
/// use courier_application::variable_resolver::parser::parse_variables;
///
/// let refs = parse_variables("{{base_url}}/users/{{ user.id }}");
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[1].name, "user.id");
/// ```
#[must_use]
pub fn parse_variables(input: &str) -> Vec<VariableReference> {
    let bytes = input.as_bytes();
    let mut references = Vec::new();
    let mut pos = 0;

    while pos + 1 < bytes.len() {
        if bytes[pos] == b'{' && bytes[pos + 1] == b'{' {
            if let Some((span, name)) = match_token(bytes, pos) {
                pos = span.end;
                references.push(VariableReference::new(&input[name], span));
                continue;
            }
        }
        pos += 1;
    }

    references
}
