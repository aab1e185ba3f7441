//! Conversion of transport results into normalized responses.

use courier_domain::{HeaderValue, NormalizedResponse, Protocol};
use indexmap::IndexMap;
use serde_json::Value;

use crate::ports::TransportResponse;

/// Builds the normalized response of an HTTP exchange.
///
/// The body is parsed as JSON when possible and kept as text otherwise.
/// Header names are lowercased and repeated headers become lists. A 4xx or
/// 5xx status is kept as-is with no error.
#[must_use]
pub fn normalize_http(response: &TransportResponse, duration_ms: u64) -> NormalizedResponse {
    let text = String::from_utf8_lossy(&response.body);
    let data = serde_json::from_str::<Value>(&text)
        .unwrap_or_else(|_| Value::String(text.into_owned()));

    let mut headers: IndexMap<String, HeaderValue> = IndexMap::new();
    for (name, value) in &response.headers {
        let name = name.to_ascii_lowercase();
        match headers.get_mut(&name) {
            Some(existing) => existing.push(value.clone()),
            None => {
                headers.insert(name, HeaderValue::Single(value.clone()));
            }
        }
    }

    NormalizedResponse::new(Some(response.status), response.status_text.clone(), data)
        .with_headers(headers)
        .with_duration(duration_ms)
}

/// Response for a stream that could not be opened.
#[must_use]
pub fn streaming_failure(protocol: Protocol, message: &str, duration_ms: u64) -> NormalizedResponse {
    let status_text = match protocol {
        Protocol::Sse => "SSE error",
        _ => "WebSocket error",
    };
    NormalizedResponse::new(None, status_text, Value::String(message.to_string()))
        .with_duration(duration_ms)
        .with_error(message)
        .with_size(0)
        .with_events(Vec::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn response(status: u16, body: &str, headers: &[(&str, &str)]) -> TransportResponse {
        TransportResponse {
            status,
            status_text: "OK".to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
            duration_ms: 3,
        }
    }

    #[test]
    fn test_json_body_is_parsed() {
        let normalized = normalize_http(&response(200, r#"{"ok":true}"#, &[]), 10);

        assert_eq!(normalized.status, Some(200));
        assert_eq!(normalized.data, json!({"ok": true}));
        assert_eq!(normalized.duration_ms, 10);
        assert_eq!(normalized.size, "{\n  \"ok\": true\n}".len());
        assert_eq!(normalized.error, None);
    }

    #[test]
    fn test_text_body_is_kept() {
        let normalized = normalize_http(&response(500, "boom", &[]), 1);

        assert_eq!(normalized.status, Some(500));
        assert_eq!(normalized.data, json!("boom"));
        assert_eq!(normalized.size, 4);
        assert_eq!(normalized.error, None);
    }

    #[test]
    fn test_repeated_headers_become_lists() {
        let normalized = normalize_http(
            &response(
                200,
                "",
                &[("Set-Cookie", "a=1"), ("Content-Type", "text/plain"), ("set-cookie", "b=2")],
            ),
            1,
        );

        assert_eq!(
            normalized.headers.get("set-cookie").unwrap(),
            &HeaderValue::Multiple(vec!["a=1".to_string(), "b=2".to_string()])
        );
        assert_eq!(
            normalized.headers.get("content-type").unwrap(),
            &HeaderValue::Single("text/plain".to_string())
        );
    }

    #[test]
    fn test_streaming_failure_texts() {
        let sse = streaming_failure(Protocol::Sse, "refused", 5);
        assert_eq!(sse.status_text, "SSE error");
        assert_eq!(sse.size, 0);
        assert_eq!(sse.error.as_deref(), Some("refused"));

        let ws = streaming_failure(Protocol::Websocket, "refused", 5);
        assert_eq!(ws.status_text, "WebSocket error");
        assert_eq!(ws.data, json!("refused"));
    }
}
