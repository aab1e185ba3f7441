//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port with the reqwest library.
//! Requests carrying TLS material go through a dedicated client built from
//! that material; everything else shares one pooled client.

use std::error::Error as _;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use courier_application::RequestPayload;
use courier_application::ports::{
    HttpClientError, HttpTransport, TransportRequest, TransportResponse,
};
use courier_domain::{HttpMethod, KeyValue, TlsConfig};
use reqwest::multipart::Form;
use reqwest::{Certificate, Client, ClientBuilder, Identity, Method, RequestBuilder};
use tracing::debug;
use url::Url;

const MAX_REDIRECTS: usize = 10;
const USER_AGENT: &str = concat!("Courier/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by reqwest.
pub struct ReqwestHttpTransport {
    client: Client,
    tls_client: Mutex<Option<(TlsConfig, Client)>>,
}

impl ReqwestHttpTransport {
    /// Creates a transport with the default client.
    ///
    /// Default configuration:
    /// - Follow redirects: up to 10
    /// - TLS verification: enabled
    /// - User-Agent: "Courier/<version>"
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> Result<Self, HttpClientError> {
        let client = Self::builder()
            .build()
            .map_err(|e| HttpClientError::Other(e.to_string()))?;

        Ok(Self::with_client(client))
    }

    /// Creates a transport around a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
            tls_client: Mutex::new(None),
        }
    }

    fn builder() -> ClientBuilder {
        Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
    }

    /// Returns the client for a request, building the TLS client on first use.
    async fn client_for(&self, tls: Option<&TlsConfig>) -> Result<Client, HttpClientError> {
        let Some(tls) = tls.filter(|tls| !tls.is_default()) else {
            return Ok(self.client.clone());
        };

        let cached = self
            .tls_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|(cached, _)| cached == tls)
            .map(|(_, client)| client.clone());
        if let Some(client) = cached {
            return Ok(client);
        }

        let client = Self::build_tls_client(tls).await?;
        debug!(?tls, "Built TLS client");
        *self
            .tls_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((tls.clone(), client.clone()));
        Ok(client)
    }

    async fn build_tls_client(tls: &TlsConfig) -> Result<Client, HttpClientError> {
        let mut builder =
            Self::builder().danger_accept_invalid_certs(!tls.verify_server_certificate);

        if let (Some(cert_path), Some(key_path)) = (&tls.client_cert_path, &tls.client_key_path) {
            let mut pem = read_pem(cert_path).await?;
            pem.push(b'\n');
            pem.extend(read_pem(key_path).await?);
            let identity =
                Identity::from_pem(&pem).map_err(|e| HttpClientError::Tls(e.to_string()))?;
            builder = builder.identity(identity);
        }

        if let Some(ca_path) = &tls.ca_path {
            let ca = Certificate::from_pem(&read_pem(ca_path).await?)
                .map_err(|e| HttpClientError::Tls(e.to_string()))?;
            builder = builder.add_root_certificate(ca);
        }

        builder
            .build()
            .map_err(|e| HttpClientError::Tls(e.to_string()))
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Attaches the encoded payload.
    fn attach_payload(
        builder: RequestBuilder,
        payload: RequestPayload,
    ) -> Result<RequestBuilder, HttpClientError> {
        Ok(match payload {
            RequestPayload::None => builder,
            RequestPayload::Json(value) => builder.json(&value),
            RequestPayload::Text(text) => builder.body(text),
            RequestPayload::Multipart(fields) => builder.multipart(
                fields
                    .into_iter()
                    .fold(Form::new(), |form, field| form.text(field.key, field.value)),
            ),
            RequestPayload::UrlEncoded(pairs) => builder.body(encode_form(&pairs)?),
        })
    }

    /// Maps reqwest errors to `HttpClientError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> HttpClientError {
        if error.is_timeout() {
            return HttpClientError::Timeout { timeout_ms };
        }

        let message = error_chain(error);
        let host = || {
            error
                .url()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string())
        };

        if error.is_connect() {
            let lower = message.to_lowercase();
            if lower.contains("dns") || lower.contains("resolve") {
                return HttpClientError::DnsError {
                    host: host(),
                    message,
                };
            }
            if lower.contains("refused") {
                return HttpClientError::ConnectionRefused {
                    host: host(),
                    port: error
                        .url()
                        .and_then(Url::port_or_known_default)
                        .unwrap_or(80),
                };
            }
            if lower.contains("certificate") || lower.contains("tls") {
                return HttpClientError::Tls(message);
            }
            return HttpClientError::ConnectionFailed(message);
        }

        if error.is_redirect() {
            return HttpClientError::TooManyRedirects { max: MAX_REDIRECTS };
        }

        if error.is_builder() || error.is_body() {
            return HttpClientError::InvalidBody(message);
        }

        HttpClientError::Other(message)
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn perform_http(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, HttpClientError> {
        let TransportRequest {
            url,
            method,
            headers,
            payload,
            timeout_ms,
            tls,
            ..
        } = request;

        let parsed_url =
            Url::parse(&url).map_err(|e| HttpClientError::InvalidUrl(format!("{e}: {url}")))?;
        let client = self.client_for(tls.as_ref()).await?;

        let start = Instant::now();

        let mut builder = client
            .request(Self::to_reqwest_method(method), parsed_url)
            .timeout(Duration::from_millis(timeout_ms));
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }
        builder = Self::attach_payload(builder, payload)?;

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        let status = response.status();
        let response_headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?
            .to_vec();

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: response_headers,
            body,
            duration_ms,
        })
    }
}

async fn read_pem(path: &std::path::Path) -> Result<Vec<u8>, HttpClientError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| HttpClientError::Tls(format!("{}: {e}", path.display())))
}

fn encode_form(pairs: &[KeyValue]) -> Result<String, HttpClientError> {
    let pairs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|pair| (pair.key.as_str(), pair.value.as_str()))
        .collect();
    serde_urlencoded::to_string(pairs).map_err(|e| HttpClientError::InvalidBody(e.to_string()))
}

/// Joins an error with its sources; reqwest hides the root cause in the chain.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
