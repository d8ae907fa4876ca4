//! Tokio codec for the safe controller's line framing.
//!
//! # Overview
//!
//! `DeviceLineCodec` turns the serial byte stream into [`DeviceLine`]s and
//! [`DeviceCommand`]s into terminated lines, for use with Tokio's `Framed`:
//!
//! ```text
//! Serial stream -> Decoder -> DeviceLine (one per '\n')
//! DeviceCommand -> Encoder -> "<line>\n" -> Serial stream
//! ```
//!
//! # Framing rules
//!
//! - Lines end at `\n`; one trailing `\r` is stripped.
//! - Partial lines stay buffered until their terminator arrives.
//! - An unterminated fragment left when the stream closes is discarded.
//! - Lines longer than the maximum length are discarded up to the next
//!   terminator. Decoding then resumes normally.
//! - Invalid UTF-8 is replaced lossily; the codec never fails on content.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use safebridge_protocol::DeviceLineCodec;
//!
//! let mut codec = DeviceLineCodec::new();
//! let mut buffer = BytesMut::from(&b"ERR_WRONG_PASS\r\nREQ"[..]);
//!
//! let line = codec.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(line.raw(), "ERR_WRONG_PASS");
//!
//! // "REQ" stays buffered until the rest of the line arrives
//! assert!(codec.decode(&mut buffer).unwrap().is_none());
//! ```

use bytes::{Buf, BufMut, BytesMut};
use safebridge_core::DeviceLine;
use safebridge_core::constants::{CARRIAGE_RETURN, LINE_TERMINATOR, MAX_LINE_LENGTH};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::{DeviceCommand, ProtocolError};

/// Line codec for the safe controller.
#[derive(Debug)]
pub struct DeviceLineCodec {
    /// Maximum accepted line length in bytes, terminator excluded.
    max_length: usize,

    /// Bytes already scanned for a terminator.
    next_index: usize,

    /// Dropping an oversized line until the next terminator.
    discarding: bool,
}

impl DeviceLineCodec {
    /// Create a codec with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

impl Default for DeviceLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DeviceLineCodec {
    type Item = DeviceLine;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<DeviceLine>, ProtocolError> {
        loop {
            let terminator = src[self.next_index..]
                .iter()
                .position(|b| *b == LINE_TERMINATOR)
                .map(|offset| self.next_index + offset);

            match (self.discarding, terminator) {
                (true, Some(index)) => {
                    // Tail of an oversized line; drop it and resume
                    src.advance(index + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    src.advance(src.len());
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(index)) => {
                    self.next_index = 0;

                    if index > self.max_length {
                        warn!(
                            length = index,
                            max_length = self.max_length,
                            "Discarding oversized device line"
                        );
                        src.advance(index + 1);
                        continue;
                    }

                    let frame = src.split_to(index + 1);
                    let mut content = &frame[..index];
                    if content.last() == Some(&CARRIAGE_RETURN) {
                        content = &content[..content.len() - 1];
                    }

                    let text = String::from_utf8_lossy(content).into_owned();
                    return Ok(Some(DeviceLine::new(text)));
                }
                (false, None) => {
                    if src.len() > self.max_length {
                        warn!(
                            buffered = src.len(),
                            max_length = self.max_length,
                            "Device line exceeds maximum length; discarding until terminator"
                        );
                        src.advance(src.len());
                        self.next_index = 0;
                        self.discarding = true;
                    } else {
                        self.next_index = src.len();
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<DeviceLine>, ProtocolError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        if !src.is_empty() {
            debug!(
                bytes = src.len(),
                "Discarding unterminated fragment at end of stream"
            );
            src.clear();
        }
        self.next_index = 0;
        self.discarding = false;
        Ok(None)
    }
}

impl Encoder<DeviceCommand> for DeviceLineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: DeviceCommand, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = item.encode();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(LINE_TERMINATOR);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safebridge_core::Password;

    fn decode_all(codec: &mut DeviceLineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(buf).unwrap() {
            lines.push(line.raw().to_string());
        }
        lines
    }

    #[test]
    fn test_decode_crlf_and_lf() {
        let mut codec = DeviceLineCodec::new();
        let mut buf = BytesMut::from(&b"REQ_OTP\r\nOK\nERR_EMPTY\r\n"[..]);

        assert_eq!(decode_all(&mut codec, &mut buf), ["REQ_OTP", "OK", "ERR_EMPTY"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_line_is_buffered() {
        let mut codec = DeviceLineCodec::new();
        let mut buf = BytesMut::from(&b"ALERT_"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"DURESS\r");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\n");
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line.raw(), "ALERT_DURESS");
    }

    #[test]
    fn test_empty_line() {
        let mut codec = DeviceLineCodec::new();
        let mut buf = BytesMut::from(&b"\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line.raw(), "");
    }

    #[test]
    fn test_eof_discards_unterminated_fragment() {
        let mut codec = DeviceLineCodec::new();
        let mut buf = BytesMut::from(&b"OK\nERR_WRO"[..]);

        let line = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(line.raw(), "OK");

        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_oversized_line_is_discarded() {
        let mut codec = DeviceLineCodec::with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789ABCDEF\nOK\n"[..]);

        assert_eq!(decode_all(&mut codec, &mut buf), ["OK"]);
    }

    #[test]
    fn test_oversized_line_split_across_reads() {
        let mut codec = DeviceLineCodec::with_max_length(12);
        let mut buf = BytesMut::from(&b"0123456789ABCDEF"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"still the same line");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b" end\nERR_EMPTY\n");
        assert_eq!(decode_all(&mut codec, &mut buf), ["ERR_EMPTY"]);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut codec = DeviceLineCodec::new();
        let mut buf = BytesMut::from(&b"\xffERR_NO_PASS\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.raw().ends_with("ERR_NO_PASS"));
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = DeviceLineCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(DeviceCommand::Open(Password::new("1234").unwrap()), &mut buf)
            .unwrap();
        codec.encode(DeviceCommand::Lock, &mut buf).unwrap();

        assert_eq!(&buf[..], b"CMD_OPEN:1234\nCMD_LOCK\n");
    }
}
