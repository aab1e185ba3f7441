//! TLS material for the HTTP transport.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Client certificate, key and CA paths plus server verification.
///
/// When any path is set, or verification is off, the transport builds a
/// dedicated client from this material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// PEM client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_path: Option<PathBuf>,
    /// PEM private key of the client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_path: Option<PathBuf>,
    /// PEM CA certificate to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_path: Option<PathBuf>,
    /// Whether to verify server certificates.
    #[serde(default = "default_true")]
    pub verify_server_certificate: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            client_cert_path: None,
            client_key_path: None,
            ca_path: None,
            verify_server_certificate: true,
        }
    }
}

impl TlsConfig {
    /// Returns true if any certificate path is configured.
    #[must_use]
    pub const fn has_certificates(&self) -> bool {
        self.client_cert_path.is_some() || self.client_key_path.is_some() || self.ca_path.is_some()
    }

    /// Returns true if the default transport can be used unchanged.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        !self.has_certificates() && self.verify_server_certificate
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_defaults_to_on() {
        let tls: TlsConfig = serde_json::from_str(r#"{"caPath": "/etc/ca.pem"}"#).unwrap();
        assert!(tls.verify_server_certificate);
        assert!(tls.has_certificates());
        assert!(TlsConfig::default().is_default());
    }
}
