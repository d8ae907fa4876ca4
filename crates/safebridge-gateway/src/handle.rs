use std::sync::Arc;

use safebridge_core::{Command, CommandOutcome, OneTimeCode, Password};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::reactor::Request;
use crate::{GatewayError, GatewayStats, StatsSnapshot};

/// Cheap, cloneable entry point to a running gateway.
///
/// Every method funnels through the reactor's request channel; no handle
/// ever touches the device link directly.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    requests: mpsc::Sender<Request>,
    stats: Arc<GatewayStats>,
    shutdown: CancellationToken,
}

impl GatewayHandle {
    pub(crate) fn new(
        requests: mpsc::Sender<Request>,
        stats: Arc<GatewayStats>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            requests,
            stats,
            shutdown,
        }
    }

    /// Submit a command and wait for its outcome.
    ///
    /// Resolves once the device replies or the command times out. If other
    /// commands are ahead in the queue, their windows elapse first.
    ///
    /// # Errors
    ///
    /// - `Busy` if the queue is full
    /// - `WriteFailure` if the command could not be written
    /// - `DeviceUnavailable` / `Shutdown` if the gateway stopped
    pub async fn submit(&self, command: Command) -> Result<CommandOutcome, GatewayError> {
        let (respond_to, response) = oneshot::channel();
        self.requests
            .send(Request::Submit {
                command,
                respond_to,
            })
            .await
            .map_err(|_| GatewayError::Shutdown)?;

        response.await.map_err(|_| GatewayError::Shutdown)?
    }

    /// Open the safe with `password`.
    pub async fn open(&self, password: Password) -> Result<CommandOutcome, GatewayError> {
        self.submit(Command::open(password)).await
    }

    /// Lock the safe.
    pub async fn lock(&self) -> Result<CommandOutcome, GatewayError> {
        self.submit(Command::lock()).await
    }

    /// Write a one-time code to the keypad, bypassing correlation.
    pub async fn write_code(&self, code: OneTimeCode) -> Result<(), GatewayError> {
        let (respond_to, response) = oneshot::channel();
        self.requests
            .send(Request::WriteCode { code, respond_to })
            .await
            .map_err(|_| GatewayError::Shutdown)?;

        response.await.map_err(|_| GatewayError::Shutdown)?
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn stats_handle(&self) -> Arc<GatewayStats> {
        Arc::clone(&self.stats)
    }

    /// Ask the reactor to stop. Waiting callers receive `Shutdown`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Token cancelled when the gateway is asked to stop.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
