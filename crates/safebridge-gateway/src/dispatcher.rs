//! Routing of unsolicited device events.
//!
//! The reactor hands every event line to the dispatcher over a bounded
//! channel and moves on. The dispatcher runs in its own task, so code
//! generation and notification delivery never delay line handling.
//!
//! | Event | Device write | Notification |
//! |---|---|---|
//! | `REQ_OTP` | `OTP:<code>` | `OTP Code Request: <code>` |
//! | `ALERT_INTRUDER` | none | intruder text |
//! | `ALERT_DURESS` | none | duress text |

use std::sync::Arc;

use safebridge_core::constants::NOTIFY_OTP_PREFIX;
use safebridge_notify::NotificationSink;
use safebridge_protocol::{CodeSource, DeviceEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::GatewayHandle;

/// Consumes device events and acts on them.
pub struct EventDispatcher<N, C> {
    gateway: GatewayHandle,
    sink: Arc<N>,
    codes: C,
    recipient: Arc<str>,
}

impl<N, C> EventDispatcher<N, C>
where
    N: NotificationSink + 'static,
    C: CodeSource,
{
    pub fn new(
        gateway: GatewayHandle,
        sink: Arc<N>,
        codes: C,
        recipient: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            gateway,
            sink,
            codes,
            recipient: recipient.into(),
        }
    }

    /// Handle events until the reactor closes the channel.
    pub async fn run(mut self, mut events: mpsc::Receiver<DeviceEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        debug!("Event channel closed; dispatcher stopped");
    }

    /// Handle a single event.
    pub async fn dispatch(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::CodeRequested => {
                info!("Keypad requested a one-time code");
                let code = self.codes.next_code();

                if let Err(e) = self.gateway.write_code(code.clone()).await {
                    error!(error = %e, "One-time code did not reach the device");
                }
                self.notify(format!("{NOTIFY_OTP_PREFIX}{code}"));
            }
            DeviceEvent::Alert(kind) => {
                warn!(%kind, "Security alert from device");
                self.notify(kind.notification_text().to_string());
            }
        }
    }

    /// Deliver `text` on a separate task; failures are logged and counted.
    fn notify(&self, text: String) {
        let sink = Arc::clone(&self.sink);
        let recipient = Arc::clone(&self.recipient);
        let stats = self.gateway.stats_handle();

        tokio::spawn(async move {
            match sink.send(&recipient, &text).await {
                Ok(()) => stats.notification_sent(),
                Err(e) => {
                    stats.notification_failed();
                    warn!(error = %e, "Notification delivery failed");
                }
            }
        });
    }
}
