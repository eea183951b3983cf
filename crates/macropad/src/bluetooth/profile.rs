//! org.bluez.Profile1 implementation
//!
//! BlueZ calls back into this object as the HID host connects. A HID
//! connection arrives as two `NewConnection` calls, one per L2CAP PSM:
//! control first (0x11), then interrupt (0x13). We hold the control fd
//! until its interrupt sibling shows up, then hand the pair to the engine
//! over a channel.

use std::collections::HashMap;
use std::os::fd::OwnedFd;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedValue, OwnedObjectPath};

/// Object path we export the profile under
pub const PROFILE_PATH: &str = "/io/macropad/hid";

/// Connection lifecycle events from BlueZ, consumed by the engine
#[derive(Debug)]
pub enum PeerEvent {
    Connected {
        control: OwnedFd,
        interrupt: OwnedFd,
        device: String,
    },
    Disconnected {
        device: String,
    },
}

pub struct HidProfile {
    pending_control: Option<OwnedFd>,
    peer_tx: mpsc::Sender<PeerEvent>,
}

impl HidProfile {
    pub fn new(peer_tx: mpsc::Sender<PeerEvent>) -> Self {
        Self {
            pending_control: None,
            peer_tx,
        }
    }
}

#[zbus::interface(name = "org.bluez.Profile1")]
impl HidProfile {
    async fn new_connection(
        &mut self,
        device: OwnedObjectPath,
        fd: zbus::zvariant::OwnedFd,
        _fd_properties: HashMap<String, OwnedValue>,
    ) -> zbus::fdo::Result<()> {
        let fd: OwnedFd = fd.into();
        let device = device.to_string();
        match self.pending_control.take() {
            None => {
                debug!(device, "control channel connected, waiting for interrupt");
                self.pending_control = Some(fd);
            }
            Some(control) => {
                info!(device, "HID host connected");
                let event = PeerEvent::Connected {
                    control,
                    interrupt: fd,
                    device,
                };
                if self.peer_tx.send(event).await.is_err() {
                    warn!("engine gone, dropping connection");
                }
            }
        }
        Ok(())
    }

    async fn request_disconnection(&mut self, device: OwnedObjectPath) -> zbus::fdo::Result<()> {
        let device = device.to_string();
        info!(device, "host requested disconnection");
        self.pending_control = None;
        if self
            .peer_tx
            .send(PeerEvent::Disconnected { device })
            .await
            .is_err()
        {
            warn!("engine gone, disconnect event dropped");
        }
        Ok(())
    }

    async fn release(&mut self) {
        // BlueZ is unregistering us (shutdown or bluetoothd restart)
        info!("profile released by BlueZ");
        self.pending_control = None;
    }
}
