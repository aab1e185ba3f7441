//! Event accumulation and one-time finalization for streaming sends.

use std::time::Duration;

use courier_domain::{EventRecord, NormalizedResponse, Protocol};
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::ports::{Clock, StreamEvent, StreamSubscription};

/// Why a stream was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The peer closed the stream.
    Closed,
    /// The stream reported an error.
    Error,
    /// The safety ceiling elapsed.
    Timeout,
    /// The event limit was reached.
    MaxEvents,
}

/// Finalization triggers of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
    /// Ceiling measured from the start of the send.
    pub timeout: Duration,
    /// Event count that finalizes the stream, if any.
    pub max_events: Option<usize>,
}

/// Accumulates events and produces the response exactly once.
#[derive(Debug)]
pub struct StreamCollector {
    protocol: Protocol,
    events: Vec<EventRecord>,
    finished: bool,
}

impl StreamCollector {
    /// Creates a collector for a WebSocket or SSE send.
    #[must_use]
    pub const fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            events: Vec::new(),
            finished: false,
        }
    }

    /// Records an event. Ignored after finalization.
    pub fn push(&mut self, event: EventRecord) {
        if !self.finished {
            self.events.push(event);
        }
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no event was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns true once the response was produced.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Produces the final response on the first call and `None` afterwards.
    pub fn finish(
        &mut self,
        reason: FinishReason,
        error: Option<String>,
        duration_ms: u64,
    ) -> Option<NormalizedResponse> {
        if self.finished {
            return None;
        }
        self.finished = true;
        debug!(protocol = %self.protocol, ?reason, events = self.events.len(), "Stream finalized");

        let (status_text, data) = match self.protocol {
            Protocol::Sse => ("SSE stream", "Event stream"),
            _ => ("WebSocket", "WebSocket session"),
        };
        let events = std::mem::take(&mut self.events);
        let size = serde_json::to_string(&events).map_or(0, |json| json.len());

        let mut response = NormalizedResponse::new(None, status_text, Value::String(data.to_string()))
            .with_duration(duration_ms)
            .with_size(size)
            .with_events(events);
        response.error = error;
        Some(response)
    }

    /// Default error text when the stream reports an error without a message.
    fn default_error(&self) -> &'static str {
        match self.protocol {
            Protocol::Sse => "SSE error",
            _ => "WebSocket error",
        }
    }

    /// Reads `subscription` until close, error, the event limit or the deadline.
    ///
    /// The subscription is closed before the response is returned.
    pub async fn drive(
        mut self,
        mut subscription: StreamSubscription,
        limits: StreamLimits,
        started: Instant,
        clock: &dyn Clock,
    ) -> NormalizedResponse {
        let deadline = started + limits.timeout;
        let (reason, error) = loop {
            match tokio::time::timeout_at(deadline, subscription.next()).await {
                Err(_) => break (FinishReason::Timeout, None),
                Ok(None | Some(StreamEvent::Closed)) => break (FinishReason::Closed, None),
                Ok(Some(StreamEvent::Error(message))) => {
                    let message = message.unwrap_or_else(|| self.default_error().to_string());
                    break (FinishReason::Error, Some(message));
                }
                Ok(Some(StreamEvent::Message { kind, data })) => {
                    self.push(EventRecord::new(kind, data, clock.now()));
                    if limits.max_events.is_some_and(|max| self.len() >= max) {
                        break (FinishReason::MaxEvents, None);
                    }
                }
            }
        };
        subscription.close();
        drop(subscription);

        let duration_ms = elapsed_ms(started);
        self.finish(reason, error, duration_ms)
            .unwrap_or_else(|| NormalizedResponse::new(None, "", Value::Null))
    }
}

/// Milliseconds elapsed since `started`, saturating.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
