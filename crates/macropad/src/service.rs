//! Systemd service integration
//!
//! Implements the sd-notify protocol so the daemon can run as a
//! Type=notify unit: readiness, shutdown and status messages go to the
//! socket systemd passes in NOTIFY_SOCKET.

use anyhow::{Context, Result};
use std::env;
use std::os::unix::net::UnixDatagram;
use tracing::{debug, info};

fn sd_notify(state: &str) -> Result<()> {
    if let Ok(socket_path) = env::var("NOTIFY_SOCKET") {
        let socket = UnixDatagram::unbound().context("Failed to create Unix socket")?;
        socket
            .send_to(state.as_bytes(), &socket_path)
            .with_context(|| format!("Failed to send '{state}' notification to systemd"))?;
    } else {
        debug!("NOTIFY_SOCKET not set, skipping systemd notification");
    }
    Ok(())
}

/// Notify systemd that the service has finished initializing
pub fn notify_ready() -> Result<()> {
    sd_notify("READY=1")?;
    info!("Notified systemd: service ready");
    Ok(())
}

/// Notify systemd that the service is beginning shutdown
pub fn notify_stopping() -> Result<()> {
    sd_notify("STOPPING=1")?;
    info!("Notified systemd: service stopping");
    Ok(())
}

/// Update the human-readable status line shown by `systemctl status`
pub fn notify_status(status: &str) -> Result<()> {
    sd_notify(&format!("STATUS={status}"))
}

/// Whether we were started by systemd
pub fn is_systemd() -> bool {
    env::var("NOTIFY_SOCKET").is_ok() || env::var("INVOCATION_ID").is_ok()
}
