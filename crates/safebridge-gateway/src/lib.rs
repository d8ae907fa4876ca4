//! Command/response correlation for the safe controller.
//!
//! The device protocol carries no request identifiers and mixes replies with
//! unsolicited events on one line stream. This crate turns it into a
//! request/response API:
//!
//! - [`CommandGateway`]: the reactor. Sole owner of the device link, it
//!   serializes commands (one in flight, bounded FIFO queue behind it),
//!   attributes replies, applies deadlines and forwards events.
//! - [`GatewayHandle`]: cloneable client used by the control plane.
//! - [`EventDispatcher`]: answers code requests and forwards alerts to a
//!   [`NotificationSink`](safebridge_notify::NotificationSink).
//! - [`GatewayStats`]: counters for timeouts, ambiguous and discarded replies.
//!
//! # Architecture
//!
//! ```text
//!  HTTP handlers ──> GatewayHandle ──mpsc──> CommandGateway <──> LineTransport
//!                                                │
//!                                           mpsc (events)
//!                                                v
//!                                         EventDispatcher ──> NotificationSink
//! ```
//!
//! # Example
//!
//! ```
//! use safebridge_core::Password;
//! use safebridge_gateway::{GatewayConfig, spawn};
//! use safebridge_notify::mock::RecordingNotifier;
//! use safebridge_protocol::OneTimeCodeGenerator;
//! use safebridge_serial::mock::MockDevice;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (transport, mut device) = MockDevice::connect();
//!     let (notifier, _log) = RecordingNotifier::new();
//!     let gateway = spawn(
//!         transport,
//!         GatewayConfig::default(),
//!         notifier,
//!         OneTimeCodeGenerator::new(),
//!         "12345",
//!     );
//!
//!     let handle = gateway.handle.clone();
//!     let open = tokio::spawn(async move { handle.open(Password::new("1234").unwrap()).await });
//!
//!     assert_eq!(device.next_line().await.unwrap().as_deref(), Some("CMD_OPEN:1234"));
//!     device.send_line("ERR_WRONG_PASS").await.unwrap();
//!
//!     let outcome = open.await.unwrap().unwrap();
//!     assert_eq!(outcome.message, "Wrong Password!");
//! }
//! ```

mod config;
mod dispatcher;
mod error;
mod handle;
mod reactor;
mod stats;

pub use config::{DEFAULT_EVENT_BUFFER, GatewayConfig};
pub use dispatcher::EventDispatcher;
pub use error::GatewayError;
pub use handle::GatewayHandle;
pub use reactor::{CommandGateway, DeviceTransport};
pub use stats::{GatewayStats, StatsSnapshot};

use std::sync::Arc;

use safebridge_notify::NotificationSink;
use safebridge_protocol::CodeSource;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the handle to reactor request channel.
const REQUEST_BUFFER: usize = 32;

/// A gateway whose reactor and dispatcher tasks are running.
#[derive(Debug)]
pub struct RunningGateway {
    pub handle: GatewayHandle,

    /// Ends with `Ok` on shutdown, `DeviceUnavailable` if the link dies.
    pub reactor: JoinHandle<Result<(), GatewayError>>,

    /// Ends once the reactor has stopped.
    pub dispatcher: JoinHandle<()>,
}

/// Start the reactor and the event dispatcher on the current runtime.
///
/// `recipient` is the notification target for codes and alerts.
pub fn spawn<T, N, C>(
    transport: T,
    config: GatewayConfig,
    sink: N,
    codes: C,
    recipient: impl Into<Arc<str>>,
) -> RunningGateway
where
    T: DeviceTransport,
    N: NotificationSink + 'static,
    C: CodeSource + Send + 'static,
{
    let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);
    let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
    let stats = Arc::new(GatewayStats::default());
    let shutdown = CancellationToken::new();

    let handle = GatewayHandle::new(request_tx, Arc::clone(&stats), shutdown.clone());
    let reactor = CommandGateway::new(transport, config, request_rx, event_tx, stats, shutdown);
    let dispatcher = EventDispatcher::new(handle.clone(), Arc::new(sink), codes, recipient);

    RunningGateway {
        handle,
        reactor: tokio::spawn(reactor.run()),
        dispatcher: tokio::spawn(dispatcher.run(event_rx)),
    }
}
