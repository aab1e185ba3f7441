//! Bulk runner
//!
//! Sends a list of drafts one after another through the same dispatch path
//! as interactive sends. Each item gets its own resolution, scripts and
//! history record.

use std::sync::Arc;

use courier_domain::{DispatchOutcome, RequestDraft};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatcher::{InFlightGuard, SendError, SendRequest};

/// One entry of a bulk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItem {
    /// Caller-chosen identifier, echoed in the result.
    pub id: String,
    /// The draft to send.
    pub request: RequestDraft,
}

impl BulkItem {
    /// Creates an item.
    #[must_use]
    pub fn new(id: impl Into<String>, request: RequestDraft) -> Self {
        Self {
            id: id.into(),
            request,
        }
    }
}

/// The original item paired with what its send produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    /// Identifier of the item.
    pub id: String,
    /// The draft as submitted.
    pub request: RequestDraft,
    /// What the send produced.
    #[serde(rename = "response")]
    pub outcome: DispatchOutcome,
}

/// Runs bulk lists sequentially.
pub struct BulkRunner {
    dispatcher: Arc<SendRequest>,
}

impl BulkRunner {
    /// Creates a runner sharing the interactive dispatcher.
    #[must_use]
    pub const fn new(dispatcher: Arc<SendRequest>) -> Self {
        Self { dispatcher }
    }

    /// Sends every item in order and returns one result per item.
    ///
    /// Items are not cancellable. An item with an empty URL is still sent
    /// and comes back as a failure response.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Busy`] if an interactive send is in flight.
    pub async fn run(&self, items: Vec<BulkItem>) -> Result<Vec<BulkResult>, SendError> {
        let _guard = InFlightGuard::acquire(self.dispatcher.in_flight_flag())?;
        info!(count = items.len(), "Starting bulk run");

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let outcome = self.dispatcher.dispatch(&item.request, None).await;
            results.push(BulkResult {
                id: item.id,
                request: item.request,
                outcome,
            });
        }

        info!(count = results.len(), "Bulk run finished");
        Ok(results)
    }
}
