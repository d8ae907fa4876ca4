use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("Invalid password: {reason}")]
    InvalidPassword { reason: String },

    #[error("Invalid one-time code: {reason}")]
    InvalidCode { reason: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

impl Error {
    /// Whether this error was caused by caller input rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidPassword { .. } | Self::InvalidCode { .. })
    }

    /// Whether this error should prevent the process from starting.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::MissingConfig(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::InvalidPassword {
            reason: "empty".to_string(),
        };
        assert!(err.is_validation());
        assert!(!err.is_configuration());

        let err = Error::MissingConfig("SERIAL_PORT_PATH".to_string());
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Missing configuration key: SERIAL_PORT_PATH");
    }
}
