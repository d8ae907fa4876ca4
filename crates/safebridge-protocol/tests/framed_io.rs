//! Integration tests for DeviceLineCodec over an async byte stream.
//!
//! These tests drive the codec through tokio's `Framed` on an in-memory
//! duplex pipe, the same way the gateway drives it over a serial port.

use futures::{SinkExt, StreamExt};
use safebridge_core::{OneTimeCode, Password};
use safebridge_protocol::{DeviceCommand, DeviceLineCodec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::codec::Framed;

#[tokio::test]
async fn test_lines_arrive_in_order() {
    let (host, mut device) = tokio::io::duplex(256);
    let mut framed = Framed::new(host, DeviceLineCodec::new());

    device
        .write_all(b"OK\r\nALERT_DURESS\r\nERR_EMPTY\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    for _ in 0..3 {
        let line = framed.next().await.unwrap().unwrap();
        received.push(line.raw().to_string());
    }

    assert_eq!(received, ["OK", "ALERT_DURESS", "ERR_EMPTY"]);
}

#[tokio::test]
async fn test_fragment_at_close_is_dropped() {
    let (host, mut device) = tokio::io::duplex(256);
    let mut framed = Framed::new(host, DeviceLineCodec::new());

    device.write_all(b"REQ_OTP\r\nERR_WRO").await.unwrap();
    drop(device);

    let line = framed.next().await.unwrap().unwrap();
    assert_eq!(line.raw(), "REQ_OTP");
    assert!(framed.next().await.is_none());
}

#[tokio::test]
async fn test_commands_are_written_as_lines() {
    let (host, mut device) = tokio::io::duplex(256);
    let mut framed = Framed::new(host, DeviceLineCodec::new());

    framed
        .send(DeviceCommand::Open(Password::new("1234").unwrap()))
        .await
        .unwrap();
    framed.send(DeviceCommand::Lock).await.unwrap();
    framed
        .send(DeviceCommand::Otp(OneTimeCode::new("482913").unwrap()))
        .await
        .unwrap();
    drop(framed);

    let mut wire = String::new();
    device.read_to_string(&mut wire).await.unwrap();
    assert_eq!(wire, "CMD_OPEN:1234\nCMD_LOCK\nOTP:482913\n");
}
