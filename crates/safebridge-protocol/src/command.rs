//! Host to device command encoding.

use safebridge_core::constants::{CMD_LOCK, CMD_OPEN_PREFIX, OTP_PREFIX};
use safebridge_core::{Command, CommandKind, OneTimeCode, Password};

/// A single line the host writes to the device.
///
/// The derived `Debug` is safe to log: both payload types redact their
/// contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// `CMD_OPEN:<password>`
    Open(Password),
    /// `CMD_LOCK`
    Lock,
    /// `OTP:<code>`
    Otp(OneTimeCode),
}

impl DeviceCommand {
    /// Encode the command as a device line, without the terminator.
    ///
    /// # Example
    ///
    /// ```
    /// use safebridge_core::Password;
    /// use safebridge_protocol::DeviceCommand;
    ///
    /// let cmd = DeviceCommand::Open(Password::new("1234").unwrap());
    /// assert_eq!(cmd.encode(), "CMD_OPEN:1234");
    /// assert_eq!(DeviceCommand::Lock.encode(), "CMD_LOCK");
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(password) => format!("{CMD_OPEN_PREFIX}{}", password.as_str()),
            Self::Lock => CMD_LOCK.to_string(),
            Self::Otp(code) => format!("{OTP_PREFIX}{code}"),
        }
    }
}

impl From<&Command> for DeviceCommand {
    fn from(command: &Command) -> Self {
        match (command.kind(), command.password()) {
            (CommandKind::Open, Some(password)) => Self::Open(password.clone()),
            // Command::open always carries a password
            (CommandKind::Open, None) | (CommandKind::Lock, _) => Self::Lock,
        }
    }
}
