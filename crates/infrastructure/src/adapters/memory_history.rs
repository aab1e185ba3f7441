//! In-memory history store

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use courier_application::ports::HistoryRecorder;
use courier_domain::ExchangeRecord;
use courier_domain::settings::DEFAULT_HISTORY_LIMIT;
use tracing::debug;

/// Keeps the most recent exchanges, newest first, up to a limit.
#[derive(Debug)]
pub struct InMemoryHistory {
    entries: RwLock<VecDeque<ExchangeRecord>>,
    limit: usize,
}

impl InMemoryHistory {
    /// Creates a store holding at most `limit` records.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(limit.min(256))),
            limit: limit.max(1),
        }
    }

    /// Records newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ExchangeRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every record.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryRecorder for InMemoryHistory {
    fn record(&self, record: ExchangeRecord) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        debug!(id = %record.id, protocol = %record.protocol, "Recording exchange");
        entries.push_front(record);
        entries.truncate(self.limit);
    }
}
