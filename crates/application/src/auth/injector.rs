//! Applies an auth descriptor to headers and query parameters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use courier_domain::{ApiKeyLocation, AuthDescriptor, HeaderMap, KeyValue};

use crate::headers::force_header;

/// Headers and parameters after auth injection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthApplied {
    /// Headers, auth header included.
    pub headers: HeaderMap,
    /// Query parameters, API key included when sent as a query parameter.
    pub params: Vec<KeyValue>,
}

/// Applies `auth` to copies of `headers` and `params`; the inputs are not touched.
///
/// - `bearer`/`oauth2`: `Authorization: Bearer <token>` when the token is non-empty.
/// - `basic`: `Authorization: Basic base64(username:password)` when either is non-empty.
/// - `apiKey`: when key and value are non-empty, a header or an appended query parameter.
#[must_use]
pub fn apply_auth(headers: &HeaderMap, params: &[KeyValue], auth: &AuthDescriptor) -> AuthApplied {
    let mut applied = AuthApplied {
        headers: headers.clone(),
        params: params.to_vec(),
    };

    match auth {
        AuthDescriptor::None => {}
        AuthDescriptor::Bearer { token } | AuthDescriptor::OAuth2 { token } => {
            if !token.is_empty() {
                force_header(&mut applied.headers, "Authorization", format!("Bearer {token}"));
            }
        }
        AuthDescriptor::Basic { username, password } => {
            if !username.is_empty() || !password.is_empty() {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                force_header(&mut applied.headers, "Authorization", format!("Basic {encoded}"));
            }
        }
        AuthDescriptor::ApiKey {
            key,
            value,
            location,
        } => {
            if !key.is_empty() && !value.is_empty() {
                match location {
                    ApiKeyLocation::Query => applied.params.push(KeyValue::new(key, value)),
                    ApiKeyLocation::Header => {
                        applied.headers.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }

    applied
}
