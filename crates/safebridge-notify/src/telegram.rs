//! Telegram Bot API notification sink.
//!
//! Messages are delivered with a single `sendMessage` call:
//!
//! ```text
//! POST {api_base}/bot{token}/sendMessage
//! {"chat_id": "<recipient>", "text": "<text>"}
//! ```
//!
//! The bot token is part of the request path, so it is held in a
//! [`SecretString`] and stripped from every error before it can reach a log.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{NotificationSink, NotifyError};

/// Public Telegram Bot API endpoint.
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Default timeout for a single delivery attempt.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the Telegram sink
#[derive(Debug)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    pub token: SecretString,

    /// API base URL (overridable for tests and self-hosted Bot API servers)
    pub api_base: String,

    /// Timeout for each delivery attempt
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            api_base: DEFAULT_TELEGRAM_API.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the sink at a different API server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends notifications through a Telegram bot.
#[derive(Debug)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    /// Create a sink from `config`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if the token is empty, or
    /// `NotifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        if config.token.expose_secret().trim().is_empty() {
            return Err(NotifyError::Configuration(
                "Telegram bot token is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.token.expose_secret()
        )
    }
}

impl NotificationSink for TelegramNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&SendMessage {
                chat_id: recipient,
                text,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status();
        let reply = response.json::<ApiReply>().await.ok();

        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => {
                debug!(recipient, "Notification delivered");
                Ok(())
            }
            other => {
                let description = other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| status.to_string());
                warn!(
                    recipient,
                    status = status.as_u16(),
                    %description,
                    "Telegram rejected notification"
                );
                Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    description,
                })
            }
        }
    }
}
