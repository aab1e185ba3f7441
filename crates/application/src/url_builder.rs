//! Target URL construction.

use courier_domain::KeyValue;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Characters left unescaped by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Appends query parameters to a URL, preserving order and repetition.
///
/// Absolute URLs get form-urlencoded pairs through the URL parser. Anything
/// the parser rejects gets `?` or `&` and percent-encoded pairs appended
/// textually. Without parameters the input is returned unchanged.
#[must_use]
pub fn build_url_with_params(base: &str, params: &[KeyValue]) -> String {
    if params.is_empty() {
        return base.to_string();
    }

    if let Ok(mut url) = Url::parse(base) {
        {
            let mut pairs = url.query_pairs_mut();
            for param in params {
                pairs.append_pair(&param.key, &param.value);
            }
        }
        return url.to_string();
    }

    let query = params
        .iter()
        .map(|param| {
            format!(
                "{}={}",
                utf8_percent_encode(&param.key, URI_COMPONENT),
                utf8_percent_encode(&param.value, URI_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    let joiner = if base.contains('?') { '&' } else { '?' };
    format!("{base}{joiner}{query}")
}

/// Host name of a URL without the port; empty when the URL does not parse.
#[must_use]
pub fn hostname_of(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}
