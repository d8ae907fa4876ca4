//! Classification of device lines.
//!
//! The device protocol carries no request identifiers. Every inbound line is
//! sorted into one of three buckets:
//!
//! - [`Inbound::Event`]: unsolicited (code requests, alerts)
//! - [`Inbound::Reply`]: a reply to whatever command is in flight
//! - [`Inbound::Unknown`]: blank lines, ignored entirely
//!
//! Tokens are matched by containment on the trimmed line and checked in a
//! fixed precedence order; the first match wins.
//!
//! | Precedence | Token | Classification |
//! |---|---|---|
//! | 1 | `REQ_OTP` | `Event(CodeRequested)` |
//! | 2 | `ALERT_INTRUDER` | `Event(Alert(Intruder))` |
//! | 3 | `ALERT_DURESS` | `Event(Alert(Duress))` |
//! | 4 | `ERR_LOCKED_OUT`, `ERR_WRONG_PASS` | `Reply` (open errors) |
//! | 5 | `ERR_EMPTY`, `ERR_NO_PASS` | `Reply` (lock errors) |
//! | 6 | anything else | `Reply(Ack)` |
//!
//! Treating any other text as an acknowledgement is a known weak point:
//! unexpected firmware output is accepted as success. [`Interpretation`]
//! reports it as an [`Ambiguity`] so callers can count it.

use safebridge_core::constants::{
    MSG_LOCK_EMPTY, MSG_LOCK_NO_PASSWORD, MSG_OPEN_LOCKED_OUT, MSG_OPEN_WRONG_PASSWORD,
    TOKEN_ALERT_DURESS, TOKEN_ALERT_INTRUDER, TOKEN_ERR_EMPTY, TOKEN_ERR_LOCKED_OUT,
    TOKEN_ERR_NO_PASS, TOKEN_ERR_WRONG_PASS, TOKEN_REQ_OTP,
};
use safebridge_core::{AlertKind, CommandKind, CommandOutcome, Resolution};

/// Unsolicited device event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The keypad asks for a one-time code.
    CodeRequested,
    /// Security alert.
    Alert(AlertKind),
}

/// Reply to the command in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceReply {
    /// `ERR_LOCKED_OUT`
    LockedOut,
    /// `ERR_WRONG_PASS`
    WrongPassword,
    /// `ERR_EMPTY`
    SafeEmpty,
    /// `ERR_NO_PASS`
    NoPasswordSet,
    /// No recognized error token.
    Ack,
}

/// Classified inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Event(DeviceEvent),
    Reply(DeviceReply),
    Unknown,
}

/// Why a reply was mapped to the default outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambiguity {
    /// No error token at all; success is assumed.
    ImplicitAck,
    /// An error token belonging to the other command kind.
    ForeignToken,
}

/// A reply mapped onto the outcome of a specific command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpretation {
    pub outcome: CommandOutcome,
    pub ambiguity: Option<Ambiguity>,
}

/// Classify a raw device line.
///
/// # Example
///
/// ```
/// use safebridge_protocol::{DeviceEvent, DeviceReply, Inbound, classify};
///
/// assert_eq!(classify("REQ_OTP\r"), Inbound::Event(DeviceEvent::CodeRequested));
/// assert_eq!(classify("dbg: ERR_WRONG_PASS"), Inbound::Reply(DeviceReply::WrongPassword));
/// assert_eq!(classify("OK"), Inbound::Reply(DeviceReply::Ack));
/// assert_eq!(classify("   "), Inbound::Unknown);
/// ```
#[must_use]
pub fn classify(line: &str) -> Inbound {
    let line = line.trim();

    if line.is_empty() {
        Inbound::Unknown
    } else if line.contains(TOKEN_REQ_OTP) {
        Inbound::Event(DeviceEvent::CodeRequested)
    } else if line.contains(TOKEN_ALERT_INTRUDER) {
        Inbound::Event(DeviceEvent::Alert(AlertKind::Intruder))
    } else if line.contains(TOKEN_ALERT_DURESS) {
        Inbound::Event(DeviceEvent::Alert(AlertKind::Duress))
    } else if line.contains(TOKEN_ERR_LOCKED_OUT) {
        Inbound::Reply(DeviceReply::LockedOut)
    } else if line.contains(TOKEN_ERR_WRONG_PASS) {
        Inbound::Reply(DeviceReply::WrongPassword)
    } else if line.contains(TOKEN_ERR_EMPTY) {
        Inbound::Reply(DeviceReply::SafeEmpty)
    } else if line.contains(TOKEN_ERR_NO_PASS) {
        Inbound::Reply(DeviceReply::NoPasswordSet)
    } else {
        Inbound::Reply(DeviceReply::Ack)
    }
}

impl DeviceReply {
    /// Map this reply onto the outcome of a command of `kind`.
    ///
    /// Error tokens only count for the command kind they belong to; a lock
    /// error received while an open is pending yields the open default.
    #[must_use]
    pub fn interpret(self, kind: CommandKind) -> Interpretation {
        let resolved = |outcome| Interpretation {
            outcome,
            ambiguity: None,
        };

        match (kind, self) {
            (CommandKind::Open, Self::LockedOut) => {
                resolved(CommandOutcome::error(MSG_OPEN_LOCKED_OUT, Resolution::Reply))
            }
            (CommandKind::Open, Self::WrongPassword) => {
                resolved(CommandOutcome::error(MSG_OPEN_WRONG_PASSWORD, Resolution::Reply))
            }
            (CommandKind::Lock, Self::SafeEmpty) => {
                resolved(CommandOutcome::error(MSG_LOCK_EMPTY, Resolution::Reply))
            }
            (CommandKind::Lock, Self::NoPasswordSet) => {
                resolved(CommandOutcome::error(MSG_LOCK_NO_PASSWORD, Resolution::Reply))
            }
            (_, Self::Ack) => Interpretation {
                outcome: kind.default_outcome(Resolution::Reply),
                ambiguity: Some(Ambiguity::ImplicitAck),
            },
            _ => Interpretation {
                outcome: kind.default_outcome(Resolution::Reply),
                ambiguity: Some(Ambiguity::ForeignToken),
            },
        }
    }
}
