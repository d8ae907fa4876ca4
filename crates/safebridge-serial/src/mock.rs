//! In-memory safe controller for tests and development.
//!
//! [`MockDevice::connect`] returns a [`LineTransport`] for the host side and
//! a scriptable device for the other side of an in-memory pipe. The device
//! reads whatever the host writes, one line at a time, and can emit any
//! reply or event line, including raw fragments.
//!
//! # Example
//!
//! ```
//! use futures::{SinkExt, StreamExt};
//! use safebridge_protocol::DeviceCommand;
//! use safebridge_serial::mock::MockDevice;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let (mut transport, mut device) = MockDevice::connect();
//!
//!     transport.send(DeviceCommand::Lock).await.unwrap();
//!     assert_eq!(device.next_line().await?.as_deref(), Some("CMD_LOCK"));
//!
//!     device.send_line("ERR_EMPTY").await?;
//!     let line = transport.next().await.unwrap().unwrap();
//!     assert_eq!(line.raw(), "ERR_EMPTY");
//!     Ok(())
//! }
//! ```

use std::io;
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tracing::trace;

use crate::{LineTransport, frame};

/// Size of the in-memory pipe in each direction.
const PIPE_CAPACITY: usize = 4 * 1024;

/// Scriptable device end of an in-memory serial link.
#[derive(Debug)]
pub struct MockDevice {
    /// Lines written by the host
    host_lines: Lines<BufReader<ReadHalf<DuplexStream>>>,

    /// Bytes towards the host
    writer: WriteHalf<DuplexStream>,
}

impl MockDevice {
    /// Create a connected host transport and mock device.
    pub fn connect() -> (LineTransport<DuplexStream>, Self) {
        let (host, device) = tokio::io::duplex(PIPE_CAPACITY);
        let (reader, writer) = tokio::io::split(device);

        let mock = Self {
            host_lines: BufReader::new(reader).lines(),
            writer,
        };

        (frame(host), mock)
    }

    /// Next line written by the host, or `None` once the host hung up.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = self.host_lines.next_line().await?;
        trace!(line = ?line, "Mock device received");
        Ok(line)
    }

    /// Next line written by the host within `timeout`.
    ///
    /// Returns `None` on timeout, hang-up or read error, which makes it
    /// convenient for asserting that nothing was written.
    pub async fn next_line_within(&mut self, timeout: Duration) -> Option<String> {
        match tokio::time::timeout(timeout, self.next_line()).await {
            Ok(Ok(line)) => line,
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Emit a complete line the way the firmware does (`\r\n` terminated).
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        trace!(line, "Mock device sending");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await
    }

    /// Emit raw bytes, e.g. a partial line.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// Close the link, as if the cable was pulled.
    pub async fn disconnect(mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use safebridge_core::Password;
    use safebridge_protocol::DeviceCommand;

    #[tokio::test]
    async fn test_device_reads_host_lines() {
        let (mut transport, mut device) = MockDevice::connect();

        transport
            .send(DeviceCommand::Open(Password::new("1234").unwrap()))
            .await
            .unwrap();

        assert_eq!(
            device.next_line().await.unwrap().as_deref(),
            Some("CMD_OPEN:1234")
        );
    }

    #[tokio::test]
    async fn test_host_reads_device_lines() {
        let (mut transport, mut device) = MockDevice::connect();

        device.send_raw(b"REQ_").await.unwrap();
        device.send_raw(b"OTP\r\n").await.unwrap();

        let line = transport.next().await.unwrap().unwrap();
        assert_eq!(line.raw(), "REQ_OTP");
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_line_within_times_out() {
        let (_transport, mut device) = MockDevice::connect();
        assert!(
            device
                .next_line_within(Duration::from_millis(50))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_disconnect_ends_host_stream() {
        let (mut transport, device) = MockDevice::connect();
        device.disconnect().await.unwrap();
        assert!(transport.next().await.is_none());
    }
}
