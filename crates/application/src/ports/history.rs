//! History recorder port

use courier_domain::ExchangeRecord;

/// Receives finished exchanges. Fire-and-forget: recording cannot fail the send.
pub trait HistoryRecorder: Send + Sync {
    /// Stores one exchange record.
    fn record(&self, record: ExchangeRecord);
}
