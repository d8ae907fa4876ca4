use std::time::Duration;

use safebridge_core::constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_LATE_REPLY_GRACE_MS, DEFAULT_QUEUE_DEPTH,
};

/// Default capacity of the reactor to dispatcher event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 32;

/// Correlation engine settings
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use safebridge_gateway::GatewayConfig;
///
/// let config = GatewayConfig {
///     command_timeout: Duration::from_millis(800),
///     ..GatewayConfig::default()
/// };
/// assert_eq!(config.queue_depth, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// How long a written command waits for its reply
    pub command_timeout: Duration,

    /// Window after a timeout during which late replies are discarded.
    /// Zero promotes the next command immediately.
    pub late_reply_grace: Duration,

    /// Commands that may wait behind the one in flight. Zero rejects every
    /// overtaking command with `Busy`.
    pub queue_depth: usize,

    /// Events buffered for the dispatcher before new ones are dropped
    pub event_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            late_reply_grace: Duration::from_millis(DEFAULT_LATE_REPLY_GRACE_MS),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}
