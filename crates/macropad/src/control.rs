//! D-Bus control interface
//!
//! Exposes the engine to local clients (the touchscreen UI, scripts) as
//! `io.macropad.MacroPad1`. Method calls translate to engine commands;
//! engine events are forwarded as D-Bus signals by [`forward_events`].

use crate::engine::HidHandle;
use crate::events::HidEvent;
use crate::store::MacroStore;
use hidp::{KeyCode, MacroStep, Modifiers};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use zbus::object_server::SignalEmitter;

pub const BUS_NAME: &str = "io.macropad.MacroPad";
pub const CONTROL_PATH: &str = "/io/macropad/MacroPad";

fn to_fdo(e: hidp::HidError) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(e.to_string())
}

pub struct ControlInterface {
    hid: HidHandle,
    store: Arc<Mutex<MacroStore>>,
}

impl ControlInterface {
    pub fn new(hid: HidHandle, store: Arc<Mutex<MacroStore>>) -> Self {
        Self { hid, store }
    }
}

#[zbus::interface(name = "io.macropad.MacroPad1")]
impl ControlInterface {
    /// Bring the adapter up and register the HID profile
    async fn initialize(&self) -> zbus::fdo::Result<bool> {
        match self.hid.initialize().await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "initialize failed");
                Ok(false)
            }
        }
    }

    async fn send_key(&self, key_code: u8, modifiers: u8) -> zbus::fdo::Result<()> {
        self.hid
            .send_key(KeyCode(key_code), Modifiers(modifiers))
            .await
            .map_err(to_fdo)
    }

    async fn send_key_combo(&self, key_codes: Vec<u8>, modifiers: u8) -> zbus::fdo::Result<()> {
        let keys = key_codes.into_iter().map(KeyCode).collect();
        self.hid
            .send_key_combo(keys, Modifiers(modifiers))
            .await
            .map_err(to_fdo)
    }

    async fn send_text(&self, text: String) -> zbus::fdo::Result<()> {
        self.hid.send_text(text).await.map_err(to_fdo)
    }

    /// Run a stored macro by id
    async fn execute_macro(&self, id: String) -> zbus::fdo::Result<()> {
        let steps = self.store.lock().await.sequence(&id).map_err(to_fdo)?;
        self.hid.execute_steps(steps).await.map_err(to_fdo)
    }

    /// Run an ad-hoc step sequence given as JSON
    async fn execute_steps(&self, steps_json: String) -> zbus::fdo::Result<()> {
        let steps: Vec<MacroStep> = serde_json::from_str(&steps_json)
            .map_err(|e| zbus::fdo::Error::InvalidArgs(e.to_string()))?;
        self.hid.execute_steps(steps).await.map_err(to_fdo)
    }

    /// The full macro set as JSON, for UI rendering
    async fn list_macros(&self) -> zbus::fdo::Result<String> {
        let store = self.store.lock().await;
        serde_json::to_string(store.list())
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Re-read the macro store from disk
    async fn reload_macros(&self) -> zbus::fdo::Result<()> {
        let mut store = self.store.lock().await;
        let reloaded = MacroStore::load(store.path().to_path_buf())
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        *store = reloaded;
        Ok(())
    }

    async fn start_pairing(&self) -> zbus::fdo::Result<()> {
        self.hid.start_pairing().await.map_err(to_fdo)
    }

    async fn disconnect(&self) -> zbus::fdo::Result<()> {
        self.hid.disconnect().await.map_err(to_fdo)
    }

    async fn set_discoverable(&self, on: bool) -> zbus::fdo::Result<()> {
        self.hid.set_discoverable(on).await.map_err(to_fdo)
    }

    async fn set_device_name(&self, name: String) -> zbus::fdo::Result<()> {
        self.hid.set_device_name(name).await.map_err(to_fdo)
    }

    #[zbus(property)]
    async fn connected(&self) -> zbus::fdo::Result<bool> {
        Ok(self.hid.status().await.map_err(to_fdo)?.connected)
    }

    #[zbus(property)]
    async fn discoverable(&self) -> zbus::fdo::Result<bool> {
        Ok(self.hid.status().await.map_err(to_fdo)?.discoverable)
    }

    #[zbus(property)]
    async fn device_name(&self) -> zbus::fdo::Result<String> {
        Ok(self.hid.status().await.map_err(to_fdo)?.device_name)
    }

    #[zbus(property)]
    async fn status(&self) -> zbus::fdo::Result<String> {
        Ok(self.hid.status().await.map_err(to_fdo)?.status)
    }

    // Signal names must stay clear of `<property>Changed`: the interface
    // macro generates emitters by that name for every property above.
    #[zbus(signal)]
    pub async fn connection_state_changed(
        emitter: &SignalEmitter<'_>,
        connected: bool,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn discoverable_mode_changed(
        emitter: &SignalEmitter<'_>,
        discoverable: bool,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn device_alias_changed(
        emitter: &SignalEmitter<'_>,
        name: &str,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn status_text_changed(
        emitter: &SignalEmitter<'_>,
        status: &str,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn error_occurred(emitter: &SignalEmitter<'_>, message: &str) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn macro_complete(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;
}

/// Forward engine events to D-Bus signals until the engine goes away
pub async fn forward_events(
    iface: zbus::object_server::InterfaceRef<ControlInterface>,
    mut events: tokio::sync::broadcast::Receiver<HidEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                warn!(missed = n, "event forwarder lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        debug!(?event, "forwarding event");
        let emitter = iface.signal_emitter();
        let result = match &event {
            HidEvent::ConnectionChanged(connected) => {
                ControlInterface::connection_state_changed(emitter, *connected).await
            }
            HidEvent::DiscoverableChanged(on) => {
                ControlInterface::discoverable_mode_changed(emitter, *on).await
            }
            HidEvent::DeviceNameChanged(name) => {
                ControlInterface::device_alias_changed(emitter, name).await
            }
            HidEvent::StatusChanged(status) => {
                ControlInterface::status_text_changed(emitter, status).await
            }
            HidEvent::Error(message) => ControlInterface::error_occurred(emitter, message).await,
            HidEvent::MacroComplete => ControlInterface::macro_complete(emitter).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to emit signal");
        }
    }
    debug!("event forwarder stopped");
}
