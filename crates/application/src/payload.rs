//! Request body encoding per body mode.

use courier_domain::{BodyMode, HeaderMap, HttpMethod, KeyValue};
use serde_json::Value;

use crate::headers::{default_header, force_header};

/// The body handed to the transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestPayload {
    /// No body.
    #[default]
    None,
    /// A JSON document.
    Json(Value),
    /// Text sent as-is.
    Text(String),
    /// `multipart/form-data` fields.
    Multipart(Vec<KeyValue>),
    /// `application/x-www-form-urlencoded` pairs.
    UrlEncoded(Vec<KeyValue>),
}

impl RequestPayload {
    /// Returns true if no body will be sent.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

fn keyed_rows(rows: &[KeyValue]) -> Vec<KeyValue> {
    rows.iter().filter(|row| !row.key.is_empty()).cloned().collect()
}

/// Encodes the body for `method` and `mode`, adjusting `headers` as needed.
///
/// - `GET`/`HEAD` never carry a body.
/// - `json`: the trimmed body is parsed; unparseable text is sent as-is.
/// - `raw`/`xml`: sent unmodified unless whitespace-only.
/// - `formData`: multipart fields with non-empty keys; any explicit content
///   type is dropped so the transport can set the boundary.
/// - `urlencoded`: pairs with non-empty keys; the content type is forced.
///
/// Text modes get their default content type only when none is set.
#[must_use]
pub fn encode_payload(
    method: HttpMethod,
    mode: BodyMode,
    body: &str,
    form_fields: &[KeyValue],
    url_encoded: &[KeyValue],
    headers: &mut HeaderMap,
) -> RequestPayload {
    if !method.allows_body() {
        return RequestPayload::None;
    }

    let payload = match mode {
        BodyMode::Json => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                return RequestPayload::None;
            }
            serde_json::from_str(trimmed)
                .map_or_else(|_| RequestPayload::Text(body.to_string()), RequestPayload::Json)
        }
        BodyMode::Raw | BodyMode::Xml => {
            if body.trim().is_empty() {
                return RequestPayload::None;
            }
            RequestPayload::Text(body.to_string())
        }
        BodyMode::FormData => {
            headers.retain(|key, _| !key.eq_ignore_ascii_case("content-type"));
            return RequestPayload::Multipart(keyed_rows(form_fields));
        }
        BodyMode::Urlencoded => {
            force_header(headers, "Content-Type", "application/x-www-form-urlencoded");
            return RequestPayload::UrlEncoded(keyed_rows(url_encoded));
        }
    };

    if let Some(content_type) = mode.content_type() {
        default_header(headers, "Content-Type", content_type);
    }
    payload
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::headers::header_value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn encode(method: HttpMethod, mode: BodyMode, body: &str) -> (RequestPayload, HeaderMap) {
        let mut headers = HeaderMap::new();
        let payload = encode_payload(method, mode, body, &[], &[], &mut headers);
        (payload, headers)
    }

    #[test]
    fn test_get_and_head_never_attach_a_body() {
        for mode in [BodyMode::Json, BodyMode::Raw, BodyMode::Xml, BodyMode::FormData, BodyMode::Urlencoded] {
            let (payload, headers) = encode(HttpMethod::Get, mode, r#"{"a": 1}"#);
            assert_eq!(payload, RequestPayload::None);
            assert!(headers.is_empty());
            assert!(encode(HttpMethod::Head, mode, "text").0.is_none());
        }
    }

    #[test]
    fn test_json_parses_trimmed_body() {
        let (payload, headers) = encode(HttpMethod::Post, BodyMode::Json, "  {\"a\": [1, 2]}\n");
        assert_eq!(payload, RequestPayload::Json(json!({"a": [1, 2]})));
        assert_eq!(header_value(&headers, "content-type"), Some("application/json"));
    }

    #[test]
    fn test_invalid_json_degrades_to_text() {
        let (payload, _) = encode(HttpMethod::Put, BodyMode::Json, "{not json");
        assert_eq!(payload, RequestPayload::Text("{not json".to_string()));
    }

    #[test]
    fn test_blank_bodies_are_not_sent() {
        assert!(encode(HttpMethod::Post, BodyMode::Json, "  \n").0.is_none());
        assert!(encode(HttpMethod::Post, BodyMode::Raw, " ").0.is_none());
    }

    #[test]
    fn test_raw_and_xml_are_sent_unmodified_with_default_type() {
        let (payload, headers) = encode(HttpMethod::Post, BodyMode::Xml, " <a/> ");
        assert_eq!(payload, RequestPayload::Text(" <a/> ".to_string()));
        assert_eq!(header_value(&headers, "Content-Type"), Some("application/xml"));

        let mut headers = HeaderMap::new();
        headers.insert("content-type".to_string(), "text/csv".to_string());
        let payload = encode_payload(HttpMethod::Post, BodyMode::Raw, "a,b", &[], &[], &mut headers);
        assert_eq!(payload, RequestPayload::Text("a,b".to_string()));
        assert_eq!(header_value(&headers, "Content-Type"), Some("text/csv"));
    }

    #[test]
    fn test_form_data_skips_empty_keys() {
        let fields = vec![KeyValue::new("a", "1"), KeyValue::new("", "x"), KeyValue::new("b", "")];
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type".to_string(), "multipart/form-data".to_string());

        let payload = encode_payload(HttpMethod::Post, BodyMode::FormData, "", &fields, &[], &mut headers);

        assert_eq!(
            payload,
            RequestPayload::Multipart(vec![KeyValue::new("a", "1"), KeyValue::new("b", "")])
        );
        assert!(headers.is_empty());
    }

    #[test]
    fn test_urlencoded_forces_content_type() {
        let pairs = vec![KeyValue::new("k", "v w"), KeyValue::new("", "skip")];
        let mut headers = HeaderMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let payload = encode_payload(HttpMethod::Patch, BodyMode::Urlencoded, "", &[], &pairs, &mut headers);

        assert_eq!(payload, RequestPayload::UrlEncoded(vec![KeyValue::new("k", "v w")]));
        assert_eq!(headers.len(), 1);
        assert_eq!(
            header_value(&headers, "Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
    }
}
