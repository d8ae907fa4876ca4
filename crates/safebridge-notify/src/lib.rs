//! Owner notifications for the safe bridge.
//!
//! Device alerts and one-time codes reach the owner through a
//! [`NotificationSink`]. The core only relies on the send contract:
//! plain text to one recipient, no delivery confirmation. The concrete
//! channel can be swapped without touching correlation logic.
//!
//! # Sinks
//!
//! - [`TelegramNotifier`]: Telegram Bot API over HTTPS
//! - [`mock::RecordingNotifier`]: records every send, for tests
//! - [`AnyNotifier`]: enum dispatch over the above
//!
//! The trait uses native `async fn` (Edition 2024 RPITIT), so it is not
//! object-safe; [`AnyNotifier`] provides concrete dispatch where a single
//! type is needed.

#![allow(async_fn_in_trait)]

mod any;
mod error;
pub mod mock;
mod telegram;

pub use any::AnyNotifier;
pub use error::NotifyError;
pub use telegram::{DEFAULT_TELEGRAM_API, TelegramConfig, TelegramNotifier};

use std::future::Future;

/// Fire-and-forget plain text delivery to one recipient.
///
/// Implementations must be shareable across tasks; the dispatcher sends
/// every notification from its own spawned task.
pub trait NotificationSink: Send + Sync {
    /// Deliver `text` to `recipient`.
    ///
    /// Errors are reported to the caller for logging only; they never
    /// affect the device action that triggered the notification.
    fn send(
        &self,
        recipient: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}
