//! `safebridge`: HTTP control plane for a serial safe controller.
//!
//! Startup order: configuration, serial link, notification sink, gateway,
//! HTTP listener. Failing to open the serial device is fatal. Once running,
//! the process exits on Ctrl-C or when the device link is lost.

mod api;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use safebridge_gateway::RunningGateway;
use safebridge_notify::{AnyNotifier, TelegramNotifier};
use safebridge_protocol::OneTimeCodeGenerator;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{Cli, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if cli.list_ports {
        return print_ports();
    }

    let config = ServerConfig::from_cli(cli).context("Invalid configuration")?;
    run(config).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .init();
}

fn print_ports() -> Result<()> {
    let ports = safebridge_serial::list_ports().context("Failed to enumerate serial ports")?;

    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

async fn run(config: ServerConfig) -> Result<()> {
    info!(version = safebridge_core::VERSION, "Starting safebridge");

    let transport = safebridge_serial::open(&config.serial)
        .with_context(|| format!("Cannot open serial device {}", config.serial.path))?;

    let notifier = AnyNotifier::Telegram(
        TelegramNotifier::new(config.telegram).context("Invalid Telegram settings")?,
    );

    let RunningGateway {
        handle,
        mut reactor,
        dispatcher,
    } = safebridge_gateway::spawn(
        transport,
        config.gateway,
        notifier,
        OneTimeCodeGenerator::new(),
        config.recipient,
    );

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Cannot listen on {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "Control plane listening");

    let server = axum::serve(listener, api::router(AppState::new(handle.clone())))
        .with_graceful_shutdown(handle.shutdown_token().cancelled_owned());
    let server = tokio::spawn(async move { server.await });

    let gateway_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
            handle.shutdown();
            reactor.await
        }
        result = &mut reactor => result,
    };

    // Also stops the HTTP server when the device link was lost
    handle.shutdown();
    server
        .await
        .context("HTTP server task failed")?
        .context("HTTP server error")?;
    dispatcher.await.context("Event dispatcher task failed")?;

    match gateway_result.context("Gateway task failed")? {
        Ok(()) => {
            info!("Stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Device link lost");
            Err(e).context("Device link lost")
        }
    }
}
