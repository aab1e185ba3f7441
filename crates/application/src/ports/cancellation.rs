//! Cooperative cancellation of an in-flight HTTP send.

use tokio::sync::watch;

/// Handle held by the caller; `cancel()` aborts the paired send.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: watch::Sender<bool>,
}

/// Receiving half passed into the dispatcher.
#[derive(Debug, Clone)]
pub struct CancellationReceiver {
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Creates a linked token and receiver.
    #[allow(clippy::new_ret_no_self)]
    #[must_use]
    pub fn new() -> (Self, CancellationReceiver) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancellationReceiver { receiver })
    }

    /// Requests cancellation. Calling it more than once has no further effect.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once `cancel()` was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl CancellationReceiver {
    /// A receiver that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (_, receiver) = CancellationToken::new();
        receiver
    }

    /// Returns true if cancellation was already requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when cancellation is requested.
    ///
    /// Never completes if the token is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        let result = self.receiver.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if result.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_receiver() {
        let (token, mut receiver) = CancellationToken::new();
        assert!(!receiver.is_cancelled());

        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), receiver.cancelled())
            .await
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_token_never_cancels() {
        let mut receiver = CancellationReceiver::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), receiver.cancelled()).await;
        assert!(waited.is_err());
    }
}
