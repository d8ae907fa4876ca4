use thiserror::Error;

/// Errors raised by the line codec.
///
/// Malformed input never produces an error: oversized lines are discarded
/// and invalid UTF-8 is decoded lossily. Only the underlying transport can
/// fail.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Low-level I/O error from the serial link
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
