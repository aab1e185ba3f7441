//! Streaming transport port (WebSocket and Server-Sent Events)

use async_trait::async_trait;
use courier_domain::HeaderMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Something that happened on an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A message was received.
    Message {
        /// `message` for WebSocket frames, the `event:` field for SSE.
        kind: String,
        /// Payload as text.
        data: String,
    },
    /// The stream reported an error, with its message when it has one.
    Error(Option<String>),
    /// The peer closed the stream.
    Closed,
}

/// Errors opening a stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The URL could not be parsed or has the wrong scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The connection or handshake failed.
    #[error("{0}")]
    Connection(String),

    /// The server answered the subscription with a non-success status.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status received.
        status: u16,
    },
}

/// An open stream. Dropping it closes the underlying connection.
#[derive(Debug)]
pub struct StreamSubscription {
    events: mpsc::Receiver<StreamEvent>,
}

impl StreamSubscription {
    /// Creates a subscription and the sender an adapter feeds events into.
    ///
    /// Adapters stop reading once `Sender::closed()` resolves.
    #[must_use]
    pub fn channel(buffer: usize) -> (mpsc::Sender<StreamEvent>, Self) {
        let (sender, events) = mpsc::channel(buffer.max(1));
        (sender, Self { events })
    }

    /// Waits for the next event; `None` once the adapter is gone.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Closes the stream without dropping the subscription.
    pub fn close(&mut self) {
        self.events.close();
    }
}

/// Port for opening WebSocket and SSE streams.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Opens a WebSocket connection, sending `headers` with the handshake.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] if the connection cannot be established.
    async fn open_websocket(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamSubscription, StreamError>;

    /// Opens an event-source subscription.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] if the subscription cannot be established.
    async fn open_event_source(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamSubscription, StreamError>;
}
