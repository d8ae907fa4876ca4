use thiserror::Error;

/// Errors raised while opening or enumerating serial ports.
#[derive(Debug, Error)]
pub enum SerialError {
    /// The device could not be opened; the bridge cannot start without it.
    #[error("Device unavailable at {path}: {message}")]
    DeviceUnavailable { path: String, message: String },

    /// Invalid serial settings.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Port enumeration failed.
    #[error("Port enumeration failed: {0}")]
    Enumeration(String),
}

impl SerialError {
    /// Create a new device unavailable error.
    pub fn device_unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
