//! Streaming transport: WebSocket via tokio-tungstenite, SSE via reqwest.
//!
//! Each open spawns a reader task that forwards events into the
//! subscription channel and stops once the subscriber is gone.

use async_trait::async_trait;
use courier_application::ports::{
    StreamError, StreamEvent, StreamSubscription, StreamTransport,
};
use courier_domain::HeaderMap;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use super::sse_parser::SseParser;

const EVENT_BUFFER: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket and event-stream subscriptions over the network.
#[derive(Debug, Clone, Default)]
pub struct NetworkStreamTransport {
    client: Client,
}

impl NetworkStreamTransport {
    /// Creates a transport with a fresh HTTP client for event streams.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport around a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamTransport for NetworkStreamTransport {
    async fn open_websocket(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamSubscription, StreamError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| StreamError::InvalidUrl(format!("{e}: {url}")))?;

        let request_headers = request.headers_mut();
        for (key, value) in headers {
            if let (Ok(name), Ok(val)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                request_headers.insert(name, val);
            } else {
                warn!(header = %key, "Skipping invalid handshake header");
            }
        }

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;
        debug!(url, status = response.status().as_u16(), "WebSocket connected");

        let (sender, subscription) = StreamSubscription::channel(EVENT_BUFFER);
        tokio::spawn(pump_websocket(stream, sender));
        Ok(subscription)
    }

    async fn open_event_source(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamSubscription, StreamError> {
        let parsed_url =
            Url::parse(url).map_err(|e| StreamError::InvalidUrl(format!("{e}: {url}")))?;

        let mut builder = self
            .client
            .get(parsed_url)
            .header(reqwest::header::ACCEPT, mime::TEXT_EVENT_STREAM.as_ref());
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }
        debug!(url, "Event stream opened");

        let (sender, subscription) = StreamSubscription::channel(EVENT_BUFFER);
        tokio::spawn(pump_event_source(response, sender));
        Ok(subscription)
    }
}

async fn pump_websocket(mut stream: WsStream, sender: mpsc::Sender<StreamEvent>) {
    loop {
        let frame = tokio::select! {
            () = sender.closed() => break,
            frame = stream.next() => frame,
        };

        let event = match frame {
            Some(Ok(Message::Text(text))) => StreamEvent::Message {
                kind: "message".to_string(),
                data: text.as_str().to_string(),
            },
            Some(Ok(Message::Binary(bytes))) => StreamEvent::Message {
                kind: "message".to_string(),
                data: String::from_utf8_lossy(&bytes).into_owned(),
            },
            Some(Ok(Message::Close(_))) | None => {
                // The peer ended the session; nothing left to close.
                let _ = sender.send(StreamEvent::Closed).await;
                return;
            }
            Some(Ok(_)) => continue,
            Some(Err(error)) => {
                let _ = sender.send(StreamEvent::Error(Some(error.to_string()))).await;
                return;
            }
        };

        if sender.send(event).await.is_err() {
            break;
        }
    }

    if let Err(error) = stream.close(None).await {
        debug!(%error, "WebSocket close failed");
    }
}

async fn pump_event_source(response: reqwest::Response, sender: mpsc::Sender<StreamEvent>) {
    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();

    loop {
        let chunk = tokio::select! {
            () = sender.closed() => return,
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for message in parser.feed(&bytes) {
                    let event = StreamEvent::Message {
                        kind: message.kind,
                        data: message.data,
                    };
                    if sender.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Some(Err(error)) => {
                let _ = sender.send(StreamEvent::Error(Some(error.to_string()))).await;
                return;
            }
            None => {
                let _ = sender.send(StreamEvent::Closed).await;
                return;
            }
        }
    }
}
