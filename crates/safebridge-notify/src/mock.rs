//! Recording notification sink for tests and development.
//!
//! [`RecordingNotifier::new`] returns the sink and a [`NotificationLog`]
//! that receives every notification the sink was asked to send, in order.
//!
//! # Example
//!
//! ```
//! use safebridge_notify::NotificationSink;
//! use safebridge_notify::mock::RecordingNotifier;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (notifier, mut log) = RecordingNotifier::new();
//!     notifier.send("42", "hello").await.unwrap();
//!
//!     let sent = log.recv().await.unwrap();
//!     assert_eq!(sent.recipient, "42");
//!     assert_eq!(sent.text, "hello");
//! }
//! ```

use std::time::Duration;

use tokio::sync::mpsc;

use crate::{NotificationSink, NotifyError};

/// A notification the sink was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: String,
    pub text: String,
}

/// Sink that records every send instead of delivering it.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    sent_tx: mpsc::UnboundedSender<SentNotification>,

    /// Report delivery failure after recording.
    fail: bool,
}

impl RecordingNotifier {
    /// Create a sink whose sends succeed.
    pub fn new() -> (Self, NotificationLog) {
        Self::build(false)
    }

    /// Create a sink that records each send and then reports failure.
    pub fn failing() -> (Self, NotificationLog) {
        Self::build(true)
    }

    fn build(fail: bool) -> (Self, NotificationLog) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        (Self { sent_tx, fail }, NotificationLog { sent_rx })
    }
}

impl NotificationSink for RecordingNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        self.sent_tx
            .send(SentNotification {
                recipient: recipient.to_string(),
                text: text.to_string(),
            })
            .map_err(|_| NotifyError::Closed)?;

        if self.fail {
            return Err(NotifyError::Rejected {
                status: 503,
                description: "simulated delivery failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Receiving end of a [`RecordingNotifier`].
#[derive(Debug)]
pub struct NotificationLog {
    sent_rx: mpsc::UnboundedReceiver<SentNotification>,
}

impl NotificationLog {
    /// Wait for the next recorded notification.
    pub async fn recv(&mut self) -> Option<SentNotification> {
        self.sent_rx.recv().await
    }

    /// Wait for the next recorded notification for at most `timeout`.
    pub async fn recv_within(&mut self, timeout: Duration) -> Option<SentNotification> {
        tokio::time::timeout(timeout, self.sent_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Take a notification that was already recorded, without waiting.
    pub fn try_recv(&mut self) -> Option<SentNotification> {
        self.sent_rx.try_recv().ok()
    }
}
