use crate::{
    Result,
    constants::{
        MAX_PASSWORD_LENGTH, MSG_LOCK_SENT, MSG_OPEN_SENT, NOTIFY_DURESS, NOTIFY_INTRUDER,
        OTP_ALPHABET, OTP_LENGTH,
    },
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of command the control plane can send to the safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Open the safe with a password.
    Open,
    /// Lock the safe.
    Lock,
}

impl CommandKind {
    /// Outcome reported when the device sends no recognized error token.
    #[must_use]
    pub fn default_outcome(self, resolution: Resolution) -> CommandOutcome {
        match self {
            Self::Open => CommandOutcome::success(MSG_OPEN_SENT, resolution),
            Self::Lock => CommandOutcome::success(MSG_LOCK_SENT, resolution),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Lock => write!(f, "lock"),
        }
    }
}

/// Safe password submitted through the control plane.
///
/// # Security
/// The `Debug` implementation never prints the password, so values can be
/// logged through structured fields without leaking secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Create a new password with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPassword` if the password:
    /// - is empty
    /// - is longer than [`MAX_PASSWORD_LENGTH`] bytes
    /// - contains control characters (a line terminator would inject extra
    ///   device commands)
    pub fn new(password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::InvalidPassword {
                reason: "password is empty".to_string(),
            });
        }

        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(Error::InvalidPassword {
                reason: format!(
                    "password must be at most {MAX_PASSWORD_LENGTH} bytes, got {}",
                    password.len()
                ),
            });
        }

        if password.chars().any(char::is_control) {
            return Err(Error::InvalidPassword {
                reason: "password contains control characters".to_string(),
            });
        }

        Ok(Password(password.to_string()))
    }

    /// Get the password as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl std::str::FromStr for Password {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Password::new(s)
    }
}

/// A logical command submitted by a control plane caller.
///
/// Constructors guarantee that an open command always carries a password
/// and a lock command never does.
#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    password: Option<Password>,
    issued_at: DateTime<Utc>,
}

impl Command {
    /// Open the safe with `password`.
    #[must_use]
    pub fn open(password: Password) -> Self {
        Self {
            kind: CommandKind::Open,
            password: Some(password),
            issued_at: Utc::now(),
        }
    }

    /// Lock the safe.
    #[must_use]
    pub fn lock() -> Self {
        Self {
            kind: CommandKind::Lock,
            password: None,
            issued_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Password payload (only present on open commands).
    #[must_use]
    pub fn password(&self) -> Option<&Password> {
        self.password.as_ref()
    }

    /// Wall-clock time the caller submitted the command.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

/// Six-digit one-time code delivered to the keypad and the owner.
///
/// # Security
/// Like [`Password`], the `Debug` output is redacted. `Display` yields the
/// digits because they must reach the wire and the notification text.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Parse a code from its textual digits.
    ///
    /// # Errors
    /// Returns `Error::InvalidCode` unless `digits` is exactly
    /// [`OTP_LENGTH`] ASCII decimal digits.
    pub fn new(digits: &str) -> Result<Self> {
        if digits.len() != OTP_LENGTH {
            return Err(Error::InvalidCode {
                reason: format!("code must be {OTP_LENGTH} digits, got {}", digits.len()),
            });
        }

        if !digits.bytes().all(|b| OTP_ALPHABET.contains(&b)) {
            return Err(Error::InvalidCode {
                reason: "code must contain only digits".to_string(),
            });
        }

        Ok(OneTimeCode(digits.to_string()))
    }

    /// Build a code by drawing one alphabet index per position.
    ///
    /// `draw` must return indices below the alphabet size; any larger value
    /// wraps around.
    pub fn from_draws(mut draw: impl FnMut() -> usize) -> Self {
        let code = (0..OTP_LENGTH)
            .map(|_| char::from(OTP_ALPHABET[draw() % OTP_ALPHABET.len()]))
            .collect();
        OneTimeCode(code)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("OneTimeCode(******)")
    }
}

impl fmt::Display for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Security alert raised by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Three wrong passwords in a row; the keypad locked itself out.
    Intruder,
    /// The duress code was entered.
    Duress,
}

impl AlertKind {
    /// Fixed text sent to the owner for this alert.
    #[must_use]
    pub fn notification_text(self) -> &'static str {
        match self {
            Self::Intruder => NOTIFY_INTRUDER,
            Self::Duress => NOTIFY_DURESS,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Intruder => write!(f, "intruder"),
            Self::Duress => write!(f, "duress"),
        }
    }
}

/// Status reported to the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// How a command was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A device reply was attributed to the command.
    Reply,
    /// The deadline elapsed first and the default outcome was used.
    TimedOut,
}

/// Terminal result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub status: OutcomeStatus,
    pub message: &'static str,
    pub resolution: Resolution,
}

impl CommandOutcome {
    #[must_use]
    pub fn success(message: &'static str, resolution: Resolution) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message,
            resolution,
        }
    }

    #[must_use]
    pub fn error(message: &'static str, resolution: Resolution) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message,
            resolution,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// One complete line received from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLine {
    raw: String,
    received_at: DateTime<Utc>,
}

impl DeviceLine {
    /// Wrap a line (without terminator) received now.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            received_at: Utc::now(),
        }
    }

    /// The line as received, minus the terminator.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The line with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.raw.trim()
    }

    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
