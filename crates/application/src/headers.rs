//! Case-insensitive helpers over the ordered header map.

use courier_domain::HeaderMap;

/// Returns true if a header with this name is present, ignoring case.
#[must_use]
pub fn has_header(headers: &HeaderMap, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

/// Returns the value of a header, ignoring case.
#[must_use]
pub fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Sets a header, replacing any existing spelling of the same name.
pub fn force_header(headers: &mut HeaderMap, name: &str, value: impl Into<String>) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.into());
}

/// Sets a header only if no spelling of the name is present yet.
pub fn default_header(headers: &mut HeaderMap, name: &str, value: impl Into<String>) {
    if !has_header(headers, name) {
        headers.insert(name.to_string(), value.into());
    }
}
