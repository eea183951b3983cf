//! macropadd
//!
//! Bluetooth HID macro pad daemon for Linux hosts. Registers a keyboard
//! HID profile with BlueZ, accepts a connection from a paired host, and
//! types keys, text and stored macro sequences on request over D-Bus.

mod bluetooth;
mod config;
mod control;
mod engine;
mod events;
mod scheduler;
mod service;
mod store;

use anyhow::{Context, Result};
use bluetooth::{BluezAdapter, HidProfile, PROFILE_PATH};
use clap::Parser;
use config::DaemonConfig;
use control::{ControlInterface, BUS_NAME, CONTROL_PATH};
use engine::HidEngine;
use std::sync::Arc;
use store::MacroStore;
use tokio::signal;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "macropadd")]
#[command(
    author,
    version,
    about = "Bluetooth HID macro pad daemon - emulate a keyboard over Bluetooth"
)]
#[command(long_about = "
Registers a Bluetooth HID keyboard profile with BlueZ and exposes a D-Bus
control interface (io.macropad.MacroPad) for sending keys, text and stored
macro sequences to the connected host.

EXAMPLES:
    # Run with default config
    macropadd

    # Run with custom config
    macropadd --config /path/to/daemon.toml

    # List stored macros and exit
    macropadd --list-macros

    # Run as systemd service
    macropadd --service

    # Run with debug logging
    macropadd --log-level debug

CONFIGURATION:
    The daemon looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/macropad/daemon.toml
    3. /etc/macropad/daemon.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Run as systemd service
    #[arg(long)]
    service: bool,

    /// List stored macros and exit
    #[arg(long)]
    list_macros: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn setup_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = DaemonConfig::default();
        let path = DaemonConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if args.config.is_some() {
        DaemonConfig::load(args.config.clone()).context("Failed to load configuration")?
    } else {
        DaemonConfig::load_or_default(None)
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.daemon.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("macropadd v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let store_path = config
        .store
        .path
        .clone()
        .unwrap_or_else(MacroStore::default_path);
    let store = MacroStore::load(store_path).context("Failed to load macro store")?;

    if args.list_macros {
        for def in store.list() {
            println!("{:<16} {:<20} {} steps", def.id, def.name, def.sequence.len());
        }
        return Ok(());
    }

    let service_mode = args.service || config.daemon.service_mode || service::is_systemd();
    let store = Arc::new(Mutex::new(store));

    // Profile connection events flow from BlueZ callbacks into the engine
    let (peer_tx, peer_rx) = mpsc::channel(16);

    // System bus: BlueZ lives there, and peers of the control interface
    // (a local UI) expect a well-known name there too
    let conn = zbus::connection::Builder::system()
        .context("Failed to configure system bus connection")?
        .name(BUS_NAME)
        .context("Failed to request bus name")?
        .serve_at(PROFILE_PATH, HidProfile::new(peer_tx))
        .context("Failed to export HID profile object")?
        .build()
        .await
        .context("Failed to connect to system bus")?;

    let adapter = BluezAdapter::new(&conn, &config.bluetooth.adapter_path)
        .await
        .context("Failed to bind BlueZ adapter")?;

    let (hid_engine, handle) = HidEngine::new(
        adapter,
        peer_rx,
        config.bluetooth.device_name.clone(),
    );
    let engine_task = tokio::spawn(hid_engine.run());

    let control = ControlInterface::new(handle.clone(), store);
    conn.object_server()
        .at(CONTROL_PATH, control)
        .await
        .context("Failed to export control interface")?;
    let iface = conn
        .object_server()
        .interface::<_, ControlInterface>(CONTROL_PATH)
        .await
        .context("Failed to resolve control interface")?;
    tokio::spawn(control::forward_events(iface, handle.subscribe()));

    // Initialization can fail at boot (adapter not plugged yet, bluetoothd
    // still starting); stay up so a client can retry Initialize over D-Bus
    match handle.initialize().await {
        Ok(()) => {
            if config.bluetooth.pairing_on_start {
                handle.start_pairing().await?;
                info!("Pairing mode enabled");
            }
        }
        Err(e) => {
            error!("Bluetooth initialization failed: {e}; waiting for Initialize over D-Bus");
        }
    }

    if service_mode {
        service::notify_ready()?;
        if let Err(e) = service::notify_status("Running") {
            warn!(error = %e, "sd_notify status failed");
        }
    }

    info!("macropadd running; press Ctrl+C to stop");
    signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    if service_mode {
        service::notify_stopping()?;
    }
    handle.shutdown().await;
    if let Err(e) = engine_task.await {
        error!("Engine task panicked: {:?}", e);
    }

    Ok(())
}
