use thiserror::Error;

/// Why a command or code write did not produce a device outcome
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The queue behind the in-flight command is full
    #[error("Device busy: {queued} commands already waiting")]
    Busy { queued: usize },

    /// Writing the command line to the device failed
    #[error("Failed to write to device: {message}")]
    WriteFailure { message: String },

    /// The serial link is gone
    #[error("Device unavailable: {message}")]
    DeviceUnavailable { message: String },

    /// The gateway stopped before the request completed
    #[error("Gateway is shut down")]
    Shutdown,
}

impl GatewayError {
    pub fn write_failure(message: impl Into<String>) -> Self {
        Self::WriteFailure {
            message: message.into(),
        }
    }

    pub fn device_unavailable(message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            message: message.into(),
        }
    }
}
