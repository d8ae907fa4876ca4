//! Serial line transport for the safe controller.
//!
//! This crate owns the physical connection. It opens the serial port and
//! frames it with [`DeviceLineCodec`](safebridge_protocol::DeviceLineCodec),
//! producing a [`LineTransport`]: a `Stream` of device lines and a `Sink` of
//! device commands. Whoever holds the transport is its only user; the
//! gateway reactor takes ownership of it at startup.
//!
//! # Architecture
//!
//! ```text
//! /dev/ttyACM0 ──> SerialStream ──> Framed<_, DeviceLineCodec> ──> gateway reactor
//!                                      (LineTransport)
//! ```
//!
//! For development and tests, [`mock::MockDevice`] provides the same
//! transport over an in-memory pipe with a scriptable device on the other end.
//!
//! # Example
//!
//! ```no_run
//! use safebridge_serial::{SerialConfig, open};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SerialConfig::new("/dev/ttyACM0", 9600);
//! let transport = open(&config)?;
//! # Ok(())
//! # }
//! ```

mod error;
mod link;
pub mod mock;
mod ports;

pub use error::SerialError;
pub use link::{LineTransport, SerialConfig, frame, open};
pub use ports::{PortInfo, list_ports};
