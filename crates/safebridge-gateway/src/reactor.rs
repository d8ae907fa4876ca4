//! The correlation reactor.
//!
//! A single task owns the device transport, the pending slot and the command
//! queue. Callers never touch any of them; they send [`Request`]s over a
//! channel and await a oneshot reply. Inbound lines are handled strictly in
//! arrival order, one at a time, on this task only.
//!
//! # Window states
//!
//! ```text
//!            submit              reply
//!   Idle ────────────> Pending ──────────> Idle (or next queued command)
//!                         │
//!                         │ deadline
//!                         v
//!                       Grace ───────────> Idle (or next queued command)
//!                           late reply / window elapsed
//! ```
//!
//! The device protocol has no request identifiers, so a reply can only be
//! attributed to "whatever is in flight". After a timeout the reactor holds
//! the line for `late_reply_grace` and discards any reply that arrives in
//! that window, rather than letting it resolve the next command.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use safebridge_core::{Command, CommandKind, CommandOutcome, DeviceLine, OneTimeCode, Resolution};
use safebridge_protocol::{
    Ambiguity, DeviceCommand, DeviceEvent, DeviceReply, Inbound, Interpretation, ProtocolError,
    classify,
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{GatewayConfig, GatewayError, GatewayStats};

/// Anything the reactor can drive as a device link.
///
/// Blanket-implemented for every framed line transport, serial or in-memory.
pub trait DeviceTransport:
    Stream<Item = Result<DeviceLine, ProtocolError>>
    + Sink<DeviceCommand, Error = ProtocolError>
    + Unpin
    + Send
    + 'static
{
}

impl<T> DeviceTransport for T where
    T: Stream<Item = Result<DeviceLine, ProtocolError>>
        + Sink<DeviceCommand, Error = ProtocolError>
        + Unpin
        + Send
        + 'static
{
}

pub(crate) type Responder = oneshot::Sender<Result<CommandOutcome, GatewayError>>;

/// Work funneled into the reactor.
#[derive(Debug)]
pub(crate) enum Request {
    /// A correlated command.
    Submit {
        command: Command,
        respond_to: Responder,
    },
    /// An uncorrelated one-time code write.
    WriteCode {
        code: OneTimeCode,
        respond_to: oneshot::Sender<Result<(), GatewayError>>,
    },
}

#[derive(Debug)]
struct Submission {
    command: Command,
    respond_to: Responder,
}

#[derive(Debug)]
struct PendingSlot {
    seq: u64,
    kind: CommandKind,
    respond_to: Responder,
    deadline: Instant,

    /// The previous command timed out with no grace window, so this
    /// command's reply may be the stale one.
    after_timeout: bool,
}

#[derive(Debug)]
enum Window {
    Idle,
    Pending(PendingSlot),
    Grace { seq: u64, until: Instant },
}

impl Window {
    fn wake_at(&self) -> Option<Instant> {
        match self {
            Self::Idle => None,
            Self::Pending(slot) => Some(slot.deadline),
            Self::Grace { until, .. } => Some(*until),
        }
    }

    fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// The single owner of the device link.
pub struct CommandGateway<T> {
    transport: T,
    config: GatewayConfig,
    requests: mpsc::Receiver<Request>,
    events: mpsc::Sender<DeviceEvent>,
    window: Window,
    queue: VecDeque<Submission>,
    next_seq: u64,
    predecessor_timed_out: bool,
    stats: Arc<GatewayStats>,
    shutdown: CancellationToken,
}

impl<T: DeviceTransport> CommandGateway<T> {
    pub(crate) fn new(
        transport: T,
        config: GatewayConfig,
        requests: mpsc::Receiver<Request>,
        events: mpsc::Sender<DeviceEvent>,
        stats: Arc<GatewayStats>,
        shutdown: CancellationToken,
    ) -> Self {
        if config.late_reply_grace.is_zero() {
            warn!("Late-reply window disabled; a reply arriving after its timeout will resolve the next command");
        }

        Self {
            transport,
            config,
            requests,
            events,
            window: Window::Idle,
            queue: VecDeque::new(),
            next_seq: 1,
            predecessor_timed_out: false,
            stats,
            shutdown,
        }
    }

    /// Run until shutdown or until the device link ends.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::DeviceUnavailable` when the transport reports
    /// end of stream or a read error. Every caller still waiting receives
    /// the same error.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        info!(
            timeout_ms = self.config.command_timeout.as_millis() as u64,
            grace_ms = self.config.late_reply_grace.as_millis() as u64,
            queue_depth = self.config.queue_depth,
            "Command gateway started"
        );

        let mut requests_open = true;

        let result = loop {
            let wake_at = self.window.wake_at();

            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break Ok(()),

                line = self.transport.next() => match line {
                    Some(Ok(line)) => self.on_line(line).await,
                    Some(Err(e)) => {
                        error!(error = %e, "Serial link read failed");
                        break Err(GatewayError::device_unavailable(e.to_string()));
                    }
                    None => {
                        error!("Serial link closed by device");
                        break Err(GatewayError::device_unavailable("serial link closed"));
                    }
                },

                () = wait_until(wake_at) => self.on_wake().await,

                request = self.requests.recv(), if requests_open => match request {
                    Some(request) => self.on_request(request).await,
                    None => {
                        debug!("All gateway handles dropped");
                        requests_open = false;
                    }
                },
            }

            self.stats.set_window(!self.window.is_idle(), self.queue.len());
        };

        let reason = match &result {
            Ok(()) => GatewayError::Shutdown,
            Err(e) => e.clone(),
        };
        self.close(&reason);
        info!(reason = %reason, "Command gateway stopped");

        result
    }

    async fn on_request(&mut self, request: Request) {
        match request {
            Request::Submit {
                command,
                respond_to,
            } => {
                self.stats.command_submitted();
                let submission = Submission {
                    command,
                    respond_to,
                };

                if self.window.is_idle() {
                    self.install(submission).await;
                } else if self.queue.len() < self.config.queue_depth {
                    self.queue.push_back(submission);
                    debug!(queued = self.queue.len(), "Command queued behind in-flight command");
                } else {
                    let queued = self.queue.len();
                    self.stats.busy_rejection();
                    warn!(queued, "Command queue full; rejecting");
                    // Caller may already be gone
                    let _ = submission
                        .respond_to
                        .send(Err(GatewayError::Busy { queued }));
                }
            }
            Request::WriteCode { code, respond_to } => {
                let result = match self.transport.send(DeviceCommand::Otp(code)).await {
                    Ok(()) => {
                        self.stats.code_written();
                        debug!("One-time code written to device");
                        Ok(())
                    }
                    Err(e) => {
                        self.stats.write_failure();
                        error!(error = %e, "Failed to write one-time code");
                        Err(GatewayError::write_failure(e.to_string()))
                    }
                };
                let _ = respond_to.send(result);
            }
        }
    }

    async fn on_line(&mut self, line: DeviceLine) {
        self.stats.line_received();
        trace!(line = line.raw(), "Device line");

        match classify(line.raw()) {
            Inbound::Unknown => {}
            Inbound::Event(event) => self.forward_event(event),
            Inbound::Reply(reply) => self.on_reply(reply, &line).await,
        }
    }

    fn forward_event(&self, event: DeviceEvent) {
        match self.events.try_send(event) {
            Ok(()) => {
                self.stats.event_dispatched();
                debug!(?event, "Event forwarded to dispatcher");
            }
            Err(TrySendError::Full(event)) => {
                self.stats.event_dropped();
                error!(?event, "Event dispatcher is saturated; dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                self.stats.event_dropped();
                error!(?event, "Event dispatcher is gone; dropping event");
            }
        }
    }

    async fn on_reply(&mut self, reply: DeviceReply, line: &DeviceLine) {
        match mem::replace(&mut self.window, Window::Idle) {
            Window::Pending(slot) => {
                let Interpretation { outcome, ambiguity } = reply.interpret(slot.kind);

                match ambiguity {
                    Some(Ambiguity::ImplicitAck) => {
                        self.stats.ambiguous_ack();
                        warn!(
                            seq = slot.seq,
                            kind = %slot.kind,
                            line = line.trimmed(),
                            "Reply has no recognized token; assuming success"
                        );
                    }
                    Some(Ambiguity::ForeignToken) => {
                        self.stats.foreign_token();
                        warn!(
                            seq = slot.seq,
                            kind = %slot.kind,
                            line = line.trimmed(),
                            "Reply token belongs to another command kind; assuming success"
                        );
                    }
                    None => {}
                }

                if slot.after_timeout {
                    self.stats.suspect_attribution();
                    warn!(
                        seq = slot.seq,
                        line = line.trimmed(),
                        "Previous command timed out; this reply may belong to it"
                    );
                }

                self.stats.reply_matched();
                debug!(
                    seq = slot.seq,
                    kind = %slot.kind,
                    status = ?outcome.status,
                    "Command resolved by device reply"
                );
                let _ = slot.respond_to.send(Ok(outcome));
                self.promote_next().await;
            }
            Window::Grace { seq, .. } => {
                self.stats.stale_reply();
                warn!(
                    seq,
                    line = line.trimmed(),
                    "Discarding late reply to timed-out command"
                );
                self.promote_next().await;
            }
            Window::Idle => {
                self.stats.unattributed_reply();
                warn!(line = line.trimmed(), "Discarding reply with no command in flight");
            }
        }
    }

    async fn on_wake(&mut self) {
        match mem::replace(&mut self.window, Window::Idle) {
            Window::Pending(slot) => {
                self.stats.timeout();
                warn!(
                    seq = slot.seq,
                    kind = %slot.kind,
                    timeout_ms = self.config.command_timeout.as_millis() as u64,
                    "No reply before deadline; assuming success"
                );
                let _ = slot
                    .respond_to
                    .send(Ok(slot.kind.default_outcome(Resolution::TimedOut)));

                if self.config.late_reply_grace.is_zero() {
                    self.predecessor_timed_out = true;
                    self.promote_next().await;
                    // Only a command written right after the timeout is suspect
                    self.predecessor_timed_out = false;
                } else {
                    self.window = Window::Grace {
                        seq: slot.seq,
                        until: Instant::now() + self.config.late_reply_grace,
                    };
                }
            }
            Window::Grace { seq, .. } => {
                trace!(seq, "Late-reply window closed");
                self.promote_next().await;
            }
            Window::Idle => {}
        }
    }

    /// Write the next live queued command, if any.
    async fn promote_next(&mut self) {
        while let Some(submission) = self.queue.pop_front() {
            if submission.respond_to.is_closed() {
                debug!("Skipping queued command abandoned by its caller");
                continue;
            }
            if self.install(submission).await {
                return;
            }
        }
    }

    /// Write `submission` and make it the pending slot.
    ///
    /// Returns `false` if the write failed; the caller has then been
    /// answered and the window stays idle.
    async fn install(&mut self, submission: Submission) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;
        let kind = submission.command.kind();

        debug!(seq, %kind, "Writing command to device");
        match self
            .transport
            .send(DeviceCommand::from(&submission.command))
            .await
        {
            Ok(()) => {
                self.window = Window::Pending(PendingSlot {
                    seq,
                    kind,
                    respond_to: submission.respond_to,
                    deadline: Instant::now() + self.config.command_timeout,
                    after_timeout: mem::take(&mut self.predecessor_timed_out),
                });
                true
            }
            Err(e) => {
                self.stats.write_failure();
                error!(seq, %kind, error = %e, "Failed to write command");
                let _ = submission
                    .respond_to
                    .send(Err(GatewayError::write_failure(e.to_string())));
                false
            }
        }
    }

    /// Answer every caller still waiting with `reason`.
    fn close(&mut self, reason: &GatewayError) {
        self.requests.close();

        if let Window::Pending(slot) = mem::replace(&mut self.window, Window::Idle) {
            let _ = slot.respond_to.send(Err(reason.clone()));
        }
        for submission in self.queue.drain(..) {
            let _ = submission.respond_to.send(Err(reason.clone()));
        }
        while let Ok(request) = self.requests.try_recv() {
            match request {
                Request::Submit { respond_to, .. } => {
                    let _ = respond_to.send(Err(reason.clone()));
                }
                Request::WriteCode { respond_to, .. } => {
                    let _ = respond_to.send(Err(reason.clone()));
                }
            }
        }

        self.stats.set_window(false, 0);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
