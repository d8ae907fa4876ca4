//! Enum wrapper for notification sink dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn
//! NotificationSink>` is not available. `AnyNotifier` provides concrete
//! dispatch instead, the way the binary selects its sink at startup.

use crate::mock::RecordingNotifier;
use crate::{NotificationSink, NotifyError, TelegramNotifier};

/// Enum wrapper for notification sink dispatch.
///
/// # Examples
///
/// ```
/// use safebridge_notify::{AnyNotifier, NotificationSink};
/// use safebridge_notify::mock::RecordingNotifier;
///
/// #[tokio::main]
/// async fn main() {
///     let (recorder, mut log) = RecordingNotifier::new();
///     let notifier = AnyNotifier::Mock(recorder);
///
///     notifier.send("42", "ALERT").await.unwrap();
///     assert_eq!(log.recv().await.unwrap().text, "ALERT");
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyNotifier {
    /// Telegram bot delivery.
    Telegram(TelegramNotifier),

    /// Recording sink for development and testing.
    Mock(RecordingNotifier),
}

impl NotificationSink for AnyNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        match self {
            Self::Telegram(sink) => sink.send(recipient, text).await,
            Self::Mock(sink) => sink.send(recipient, text).await,
        }
    }
}
