use thiserror::Error;

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP request failed (connect, timeout, decode).
    ///
    /// The request URL is stripped before wrapping because the Bot API
    /// embeds the credential in it.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The notification service refused the message
    #[error("Rejected by notification service (status {status}): {description}")]
    Rejected { status: u16, description: String },

    /// Invalid sink configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The sink is no longer accepting messages
    #[error("Notification channel closed")]
    Closed,
}
