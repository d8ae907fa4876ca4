//! Core constants for the safe controller line protocol.
//!
//! This module defines the protocol vocabulary, timing defaults and
//! user-facing messages shared by every safebridge crate.
//!
//! # Protocol Structure
//!
//! The safe controller speaks a line-oriented ASCII protocol over a serial
//! link. Each direction carries one message per line:
//!
//! ```text
//! host   -> device:  CMD_OPEN:<password>\n
//!                    CMD_LOCK\n
//!                    OTP:<6 digits>\n
//! device -> host:    REQ_OTP\r\n
//!                    ALERT_INTRUDER\r\n
//!                    ERR_WRONG_PASS\r\n
//!                    <anything else>\r\n
//! ```
//!
//! Device lines are matched by containment of a token, not equality: the
//! firmware may prefix or suffix diagnostic text.
//!
//! # Usage
//!
//! ```
//! use safebridge_core::constants::*;
//!
//! let line = format!("{CMD_OPEN_PREFIX}1234");
//! assert_eq!(line, "CMD_OPEN:1234");
//!
//! use std::time::Duration;
//! let timeout = Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS);
//! assert_eq!(timeout.as_millis(), 500);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Line terminator for both directions.
///
/// The device terminates its lines with `\r\n`; the trailing carriage return
/// is stripped by the decoder. Outbound lines use a bare `\n`.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Carriage return stripped from the end of inbound lines.
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Maximum inbound line length in bytes.
///
/// Longer lines are discarded up to the next terminator so a noisy link
/// cannot grow the receive buffer without bound.
pub const MAX_LINE_LENGTH: usize = 1024;

// ============================================================================
// Host -> device commands
// ============================================================================

/// Prefix of the open command; the password follows the colon.
pub const CMD_OPEN_PREFIX: &str = "CMD_OPEN:";

/// Lock command (no payload).
pub const CMD_LOCK: &str = "CMD_LOCK";

/// Prefix of a one-time code delivery; the code follows the colon.
pub const OTP_PREFIX: &str = "OTP:";

// ============================================================================
// Device -> host tokens
// ============================================================================

/// The keypad requests a one-time code.
pub const TOKEN_REQ_OTP: &str = "REQ_OTP";

/// Three wrong passwords were entered on the keypad.
pub const TOKEN_ALERT_INTRUDER: &str = "ALERT_INTRUDER";

/// The duress code was entered on the keypad.
pub const TOKEN_ALERT_DURESS: &str = "ALERT_DURESS";

/// Open rejected: the safe is in lockdown.
pub const TOKEN_ERR_LOCKED_OUT: &str = "ERR_LOCKED_OUT";

/// Open rejected: wrong password.
pub const TOKEN_ERR_WRONG_PASS: &str = "ERR_WRONG_PASS";

/// Lock rejected: the safe is empty.
pub const TOKEN_ERR_EMPTY: &str = "ERR_EMPTY";

/// Lock rejected: no password has been set on the keypad.
pub const TOKEN_ERR_NO_PASS: &str = "ERR_NO_PASS";

// ============================================================================
// One-time codes
// ============================================================================

/// Number of characters in a one-time code.
pub const OTP_LENGTH: usize = 6;

/// Alphabet one-time code characters are drawn from.
pub const OTP_ALPHABET: &[u8; 10] = b"0123456789";

// ============================================================================
// Passwords
// ============================================================================

/// Maximum password length accepted from the control plane.
///
/// Keeps the encoded open command well below [`MAX_LINE_LENGTH`].
pub const MAX_PASSWORD_LENGTH: usize = 64;

// ============================================================================
// Timing and capacity defaults
// ============================================================================

/// Default serial baud rate of the safe controller.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default time to wait for a reply before resolving with the default outcome.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 500;

/// Default window after a timeout during which late replies are discarded.
pub const DEFAULT_LATE_REPLY_GRACE_MS: u64 = 250;

/// Default number of commands allowed to wait behind the in-flight one.
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Default HTTP control plane port.
pub const DEFAULT_LISTEN_PORT: u16 = 3001;

// ============================================================================
// Control plane messages
// ============================================================================

/// Open rejected because the safe is in lockdown.
pub const MSG_OPEN_LOCKED_OUT: &str = "System is in Lockdown! Wait timer.";

/// Open rejected because of a wrong password.
pub const MSG_OPEN_WRONG_PASSWORD: &str = "Wrong Password!";

/// Open accepted (or no error reported).
pub const MSG_OPEN_SENT: &str = "Request Sent. Check Safe.";

/// Lock rejected because the safe is empty.
pub const MSG_LOCK_EMPTY: &str = "Safe is Empty! Cannot Lock.";

/// Lock rejected because no password is configured.
pub const MSG_LOCK_NO_PASSWORD: &str = "Setup Password on Keypad First!";

/// Lock accepted (or no error reported).
pub const MSG_LOCK_SENT: &str = "Lock Command Sent";

/// Open request without a password.
pub const MSG_PASSWORD_REQUIRED: &str = "Password Required";

/// Command rejected because the queue is full.
pub const MSG_DEVICE_BUSY: &str = "Device busy, try again";

// ============================================================================
// Notification messages
// ============================================================================

/// Prefix of the notification carrying a one-time code.
pub const NOTIFY_OTP_PREFIX: &str = "OTP Code Request: ";

/// Notification sent on an intruder alert.
pub const NOTIFY_INTRUDER: &str =
    "SECURITY ALERT! Someone entered wrong password 3 times! Safe is LOCKED OUT.";

/// Notification sent on a duress alert.
pub const NOTIFY_DURESS: &str = "Danger ALERT! User is under DURESS and forced to open the safe!";
