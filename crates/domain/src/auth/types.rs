//! Authentication descriptor types

use serde::{Deserialize, Serialize};

/// Authentication attached to a request draft.
///
/// Serialized in the flat editor shape: a `type` tag next to every possible
/// credential field (`token`, `oauthToken`, `username`, `password`,
/// `apiKeyKey`, `apiKeyValue`, `apiKeyAddTo`). Unknown or missing tags read
/// as [`AuthDescriptor::None`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "RawAuth", into = "RawAuth")]
pub enum AuthDescriptor {
    /// No authentication
    #[default]
    None,
    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },
    /// `OAuth2` access token, sent like a bearer token. No refresh flow.
    OAuth2 {
        /// The access token
        token: String,
    },
    /// Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
    /// API key authentication
    ApiKey {
        /// Header or query parameter name
        key: String,
        /// The API key value
        value: String,
        /// Where to add the key
        location: ApiKeyLocation,
    },
}

/// Location for API key authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    /// Add to request headers
    #[default]
    Header,
    /// Add to query parameters
    Query,
}

impl AuthDescriptor {
    /// Returns true if authentication is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Creates a bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates an `OAuth2` token authentication.
    #[must_use]
    pub fn oauth2(token: impl Into<String>) -> Self {
        Self::OAuth2 {
            token: token.into(),
        }
    }

    /// Creates a basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates an API key authentication sent as a header.
    #[must_use]
    pub fn api_key_header(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ApiKey {
            key: key.into(),
            value: value.into(),
            location: ApiKeyLocation::Header,
        }
    }

    /// Creates an API key authentication sent as a query parameter.
    #[must_use]
    pub fn api_key_query(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ApiKey {
            key: key.into(),
            value: value.into(),
            location: ApiKeyLocation::Query,
        }
    }
}

/// Flat wire shape shared with the editor and saved collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAuth {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    oauth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key_value: Option<String>,
    #[serde(alias = "addTo", skip_serializing_if = "Option::is_none")]
    api_key_add_to: Option<String>,
}

impl From<RawAuth> for AuthDescriptor {
    fn from(raw: RawAuth) -> Self {
        match raw.kind.as_deref() {
            Some("bearer") => Self::Bearer {
                token: raw.token.unwrap_or_default(),
            },
            Some("oauth2") => Self::OAuth2 {
                token: raw.oauth_token.or(raw.token).unwrap_or_default(),
            },
            Some("basic") => Self::Basic {
                username: raw.username.unwrap_or_default(),
                password: raw.password.unwrap_or_default(),
            },
            Some("apiKey") => Self::ApiKey {
                key: raw.api_key_key.unwrap_or_default(),
                value: raw.api_key_value.unwrap_or_default(),
                location: match raw.api_key_add_to.as_deref() {
                    Some("query") => ApiKeyLocation::Query,
                    _ => ApiKeyLocation::Header,
                },
            },
            _ => Self::None,
        }
    }
}

impl From<AuthDescriptor> for RawAuth {
    fn from(auth: AuthDescriptor) -> Self {
        match auth {
            AuthDescriptor::None => Self {
                kind: Some("none".to_string()),
                ..Self::default()
            },
            AuthDescriptor::Bearer { token } => Self {
                kind: Some("bearer".to_string()),
                token: Some(token),
                ..Self::default()
            },
            AuthDescriptor::OAuth2 { token } => Self {
                kind: Some("oauth2".to_string()),
                oauth_token: Some(token),
                ..Self::default()
            },
            AuthDescriptor::Basic { username, password } => Self {
                kind: Some("basic".to_string()),
                username: Some(username),
                password: Some(password),
                ..Self::default()
            },
            AuthDescriptor::ApiKey {
                key,
                value,
                location,
            } => Self {
                kind: Some("apiKey".to_string()),
                api_key_key: Some(key),
                api_key_value: Some(value),
                api_key_add_to: Some(
                    match location {
                        ApiKeyLocation::Header => "header",
                        ApiKeyLocation::Query => "query",
                    }
                    .to_string(),
                ),
                ..Self::default()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> AuthDescriptor {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_flat_editor_shape_is_read_by_type() {
        let json = r#"{"type": "bearer", "token": "abc", "username": "ignored",
                       "apiKeyKey": "", "apiKeyAddTo": "header"}"#;
        assert_eq!(parse(json), AuthDescriptor::bearer("abc"));
    }

    #[test]
    fn test_oauth2_reads_oauth_token_field() {
        assert_eq!(
            parse(r#"{"type": "oauth2", "oauthToken": "o", "token": "t"}"#),
            AuthDescriptor::oauth2("o")
        );
    }

    #[test]
    fn test_api_key_location_accepts_both_field_names() {
        let editor = r#"{"type": "apiKey", "apiKeyKey": "X-K", "apiKeyValue": "v", "apiKeyAddTo": "query"}"#;
        let short = r#"{"type": "apiKey", "apiKeyKey": "X-K", "apiKeyValue": "v", "addTo": "query"}"#;

        assert_eq!(parse(editor), AuthDescriptor::api_key_query("X-K", "v"));
        assert_eq!(parse(short), AuthDescriptor::api_key_query("X-K", "v"));
        assert_eq!(
            parse(r#"{"type": "apiKey", "apiKeyKey": "K", "apiKeyValue": "v"}"#),
            AuthDescriptor::api_key_header("K", "v")
        );
    }

    #[test]
    fn test_unknown_or_missing_type_is_none() {
        assert_eq!(parse(r#"{"type": "digest", "token": "x"}"#), AuthDescriptor::None);
        assert_eq!(parse(r#"{"token": "x"}"#), AuthDescriptor::None);
        assert!(!AuthDescriptor::None.is_configured());
    }

    #[test]
    fn test_serialization_uses_flat_shape() {
        let value = serde_json::to_value(AuthDescriptor::basic("u", "p")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "basic", "username": "u", "password": "p"})
        );
        assert_eq!(
            parse(&value.to_string()),
            AuthDescriptor::basic("u", "p")
        );
    }
}
