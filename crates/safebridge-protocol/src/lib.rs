//! Line protocol spoken by the safe controller.
//!
//! - [`DeviceCommand`]: host to device encoding
//! - [`classify`]: device line to [`Inbound`] classification
//! - [`DeviceLineCodec`]: newline framing for tokio `Framed` transports
//! - [`OneTimeCodeGenerator`]: six-digit codes for keypad unlock requests

pub mod classify;
pub mod codec;
pub mod command;
pub mod error;
pub mod otp;

pub use classify::{Ambiguity, DeviceEvent, DeviceReply, Inbound, Interpretation, classify};
pub use codec::DeviceLineCodec;
pub use command::DeviceCommand;
pub use error::ProtocolError;
pub use otp::{CodeSource, OneTimeCodeGenerator};
