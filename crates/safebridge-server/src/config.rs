//! Command line and environment configuration.
//!
//! Every option can come from a flag or from the environment variable the
//! deployment already uses (`SERIAL_PORT_PATH`, `TELEGRAM_TOKEN`, ...).
//! Required values are optional at the parser level so `--list-ports` works
//! on its own; [`ServerConfig::from_cli`] enforces them.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use safebridge_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_LATE_REPLY_GRACE_MS,
    DEFAULT_LISTEN_PORT, DEFAULT_QUEUE_DEPTH,
};
use safebridge_core::{Error, Result};
use safebridge_gateway::GatewayConfig;
use safebridge_notify::TelegramConfig;
use safebridge_serial::SerialConfig;

/// HTTP bridge between a web control panel and a serial safe controller.
#[derive(Parser)]
#[command(name = "safebridge", version, about)]
pub struct Cli {
    /// Serial device of the safe controller (e.g. /dev/ttyACM0, COM3)
    #[arg(long, env = "SERIAL_PORT_PATH")]
    pub serial_port: Option<String>,

    /// Serial line speed
    #[arg(long, env = "BAUD_RATE", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// How long a command waits for the device's reply
    #[arg(long, env = "COMMAND_TIMEOUT_MS", default_value_t = DEFAULT_COMMAND_TIMEOUT_MS)]
    pub command_timeout_ms: u64,

    /// Window after a timeout in which late replies are discarded (0 disables)
    #[arg(long, env = "LATE_REPLY_GRACE_MS", default_value_t = DEFAULT_LATE_REPLY_GRACE_MS)]
    pub late_reply_grace_ms: u64,

    /// Commands allowed to wait behind the one in flight (0 rejects them)
    #[arg(long, env = "COMMAND_QUEUE_DEPTH", default_value_t = DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat that receives codes and alerts
    #[arg(long, env = "MY_CHAT_ID")]
    pub chat_id: Option<String>,

    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// Print the detected serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

/// Validated runtime configuration.
#[derive(Debug)]
pub struct ServerConfig {
    pub serial: SerialConfig,
    pub gateway: GatewayConfig,
    pub telegram: TelegramConfig,
    pub recipient: String,
    pub listen_addr: SocketAddr,
}

impl ServerConfig {
    /// Validate parsed options.
    ///
    /// # Errors
    ///
    /// `Error::MissingConfig` names the environment variable of a missing
    /// required value; `Error::Config` reports an unusable one.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let serial_port = required(cli.serial_port, "SERIAL_PORT_PATH")?;
        let token = required(cli.telegram_token, "TELEGRAM_TOKEN")?;
        let recipient = required(cli.chat_id, "MY_CHAT_ID")?;

        if cli.baud_rate == 0 {
            return Err(Error::Config("baud rate must be positive".to_string()));
        }
        if cli.command_timeout_ms == 0 {
            return Err(Error::Config("command timeout must be positive".to_string()));
        }

        Ok(Self {
            serial: SerialConfig::new(serial_port, cli.baud_rate),
            gateway: GatewayConfig {
                command_timeout: Duration::from_millis(cli.command_timeout_ms),
                late_reply_grace: Duration::from_millis(cli.late_reply_grace_ms),
                queue_depth: cli.queue_depth,
                ..GatewayConfig::default()
            },
            telegram: TelegramConfig::new(token),
            recipient,
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.port)),
        })
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingConfig(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const REQUIRED: [&str; 7] = [
        "safebridge",
        "--serial-port",
        "/dev/ttyACM0",
        "--telegram-token",
        "123:abc",
        "--chat-id",
        "987654",
    ];

    fn parse(extra: &[&str]) -> Cli {
        let args = REQUIRED.iter().chain(extra.iter()).copied();
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_cli(parse(&[])).unwrap();

        assert_eq!(config.serial.path, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.gateway.command_timeout, Duration::from_millis(500));
        assert_eq!(config.gateway.late_reply_grace, Duration::from_millis(250));
        assert_eq!(config.gateway.queue_depth, 8);
        assert_eq!(config.recipient, "987654");
        assert_eq!(config.listen_addr.port(), 3001);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_cli(parse(&[
            "--baud-rate",
            "115200",
            "--command-timeout-ms",
            "800",
            "--late-reply-grace-ms",
            "0",
            "--queue-depth",
            "0",
            "--port",
            "8080",
        ]))
        .unwrap();

        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.gateway.command_timeout, Duration::from_millis(800));
        assert!(config.gateway.late_reply_grace.is_zero());
        assert_eq!(config.gateway.queue_depth, 0);
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[rstest]
    #[case("--serial-port", "SERIAL_PORT_PATH")]
    #[case("--telegram-token", "TELEGRAM_TOKEN")]
    #[case("--chat-id", "MY_CHAT_ID")]
    fn test_blank_required_value(#[case] flag: &str, #[case] key: &str) {
        let mut cli = parse(&[]);
        match flag {
            "--serial-port" => cli.serial_port = Some("  ".to_string()),
            "--telegram-token" => cli.telegram_token = None,
            _ => cli.chat_id = Some(String::new()),
        }

        let err = ServerConfig::from_cli(cli).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), format!("Missing configuration key: {key}"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ServerConfig::from_cli(parse(&["--command-timeout-ms", "0"])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_list_ports_needs_nothing_else() {
        let cli = Cli::try_parse_from(["safebridge", "--list-ports"]).unwrap();
        assert!(cli.list_ports);
    }
}
