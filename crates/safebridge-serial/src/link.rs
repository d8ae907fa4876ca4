use safebridge_core::constants::DEFAULT_BAUD_RATE;
use safebridge_protocol::DeviceLineCodec;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tokio_util::codec::Framed;
use tracing::{error, info};

use crate::SerialError;

/// Framed line transport: a `Stream` of device lines and a `Sink` of commands.
pub type LineTransport<T> = Framed<T, DeviceLineCodec>;

/// Serial port settings.
///
/// # Example
///
/// ```
/// use safebridge_serial::SerialConfig;
///
/// let config = SerialConfig::new("/dev/ttyACM0", 9600);
/// assert!(config.validate().is_ok());
/// assert!(SerialConfig::new("", 9600).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path (e.g. "/dev/ttyACM0" or "COM3")
    pub path: String,

    /// Line speed in baud
    pub baud_rate: u32,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }

    /// Check the settings before touching the hardware.
    pub fn validate(&self) -> Result<(), SerialError> {
        if self.path.trim().is_empty() {
            return Err(SerialError::configuration("serial device path is empty"));
        }
        if self.baud_rate == 0 {
            return Err(SerialError::configuration("baud rate must be positive"));
        }
        Ok(())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Open the safe controller's serial port as a line transport.
///
/// The port is configured 8N1 without flow control. Must be called from
/// within a Tokio runtime.
///
/// # Errors
///
/// Returns `SerialError::Configuration` for invalid settings and
/// `SerialError::DeviceUnavailable` if the port cannot be opened. The
/// latter is fatal: the bridge must not start without its device.
pub fn open(config: &SerialConfig) -> Result<LineTransport<SerialStream>, SerialError> {
    config.validate()?;

    info!(
        path = %config.path,
        baud_rate = config.baud_rate,
        "Opening serial link"
    );

    let stream = tokio_serial::new(&config.path, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| {
            error!(path = %config.path, error = %e, "Failed to open serial link");
            SerialError::device_unavailable(&config.path, e.to_string())
        })?;

    Ok(frame(stream))
}

/// Frame any byte stream with the device line codec.
pub fn frame<T>(io: T) -> LineTransport<T>
where
    T: AsyncRead + AsyncWrite,
{
    Framed::new(io, DeviceLineCodec::new())
}
