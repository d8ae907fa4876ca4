//! Correlation engine counters.
//!
//! The reactor and the dispatcher bump these as they work; the control plane
//! reads a [`StatsSnapshot`] for `GET /api/status`. Every ambiguous or
//! discarded reply lands in a counter here, so correlation hazards stay
//! visible to operators instead of being silently absorbed.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Live counters shared between the reactor, dispatcher and handles.
#[derive(Debug, Default)]
pub struct GatewayStats {
    lines_received: AtomicU64,
    commands_submitted: AtomicU64,
    replies_matched: AtomicU64,
    timeouts: AtomicU64,
    stale_replies: AtomicU64,
    unattributed_replies: AtomicU64,
    suspect_attributions: AtomicU64,
    ambiguous_acks: AtomicU64,
    foreign_tokens: AtomicU64,
    busy_rejections: AtomicU64,
    write_failures: AtomicU64,
    events_dispatched: AtomicU64,
    events_dropped: AtomicU64,
    codes_written: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    in_flight: AtomicBool,
    queued: AtomicUsize,
}

/// Point-in-time copy of [`GatewayStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub lines_received: u64,
    pub commands_submitted: u64,
    pub replies_matched: u64,
    pub timeouts: u64,
    /// Replies discarded inside a late-reply window
    pub stale_replies: u64,
    /// Replies with no command in flight
    pub unattributed_replies: u64,
    /// Replies accepted for a command whose predecessor timed out
    pub suspect_attributions: u64,
    /// Replies without any recognized token, taken as success
    pub ambiguous_acks: u64,
    /// Error tokens that belong to the other command kind
    pub foreign_tokens: u64,
    pub busy_rejections: u64,
    pub write_failures: u64,
    pub events_dispatched: u64,
    pub events_dropped: u64,
    pub codes_written: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub in_flight: bool,
    pub queued: usize,
}

macro_rules! counters {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl GatewayStats {
    counters! {
        line_received => lines_received,
        command_submitted => commands_submitted,
        reply_matched => replies_matched,
        timeout => timeouts,
        stale_reply => stale_replies,
        unattributed_reply => unattributed_replies,
        suspect_attribution => suspect_attributions,
        ambiguous_ack => ambiguous_acks,
        foreign_token => foreign_tokens,
        busy_rejection => busy_rejections,
        write_failure => write_failures,
        event_dispatched => events_dispatched,
        event_dropped => events_dropped,
        code_written => codes_written,
        notification_sent => notifications_sent,
        notification_failed => notifications_failed,
    }

    /// Publish the reactor's window state.
    pub(crate) fn set_window(&self, in_flight: bool, queued: usize) {
        self.in_flight.store(in_flight, Ordering::Relaxed);
        self.queued.store(queued, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        StatsSnapshot {
            lines_received: load(&self.lines_received),
            commands_submitted: load(&self.commands_submitted),
            replies_matched: load(&self.replies_matched),
            timeouts: load(&self.timeouts),
            stale_replies: load(&self.stale_replies),
            unattributed_replies: load(&self.unattributed_replies),
            suspect_attributions: load(&self.suspect_attributions),
            ambiguous_acks: load(&self.ambiguous_acks),
            foreign_tokens: load(&self.foreign_tokens),
            busy_rejections: load(&self.busy_rejections),
            write_failures: load(&self.write_failures),
            events_dispatched: load(&self.events_dispatched),
            events_dropped: load(&self.events_dropped),
            codes_written: load(&self.codes_written),
            notifications_sent: load(&self.notifications_sent),
            notifications_failed: load(&self.notifications_failed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
        }
    }
}
