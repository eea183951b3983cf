//! HID engine
//!
//! Single task owning the adapter binding, the connection channel and the
//! macro scheduler. Everything else talks to it through [`HidHandle`]
//! commands and watches it through the broadcast event channel, so there
//! is exactly one place where connection state can change.

use crate::bluetooth::{AdapterClient, AdapterState, ConnectionChannel, PeerEvent, PROFILE_PATH};
use crate::events::{EventSender, HidEvent, EVENT_CHANNEL_CAPACITY};
use crate::scheduler::{
    combo_actions, key_actions, text_actions, Action, MacroScheduler, Tick,
};
use hidp::{HidError, KeyCode, MacroStep, Modifiers, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Commands accepted by the engine task
#[derive(Debug)]
pub enum HidCommand {
    Initialize {
        respond_to: oneshot::Sender<Result<()>>,
    },
    SendKey {
        key: KeyCode,
        modifiers: Modifiers,
        respond_to: oneshot::Sender<Result<()>>,
    },
    SendKeyCombo {
        keys: Vec<KeyCode>,
        modifiers: Modifiers,
        respond_to: oneshot::Sender<Result<()>>,
    },
    SendText {
        text: String,
        respond_to: oneshot::Sender<Result<()>>,
    },
    ExecuteSteps {
        steps: Vec<MacroStep>,
        respond_to: oneshot::Sender<Result<()>>,
    },
    StartPairing {
        respond_to: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        respond_to: oneshot::Sender<()>,
    },
    SetDiscoverable {
        on: bool,
        respond_to: oneshot::Sender<Result<()>>,
    },
    SetDeviceName {
        name: String,
        respond_to: oneshot::Sender<Result<()>>,
    },
    Status {
        respond_to: oneshot::Sender<EngineStatus>,
    },
    Shutdown,
}

/// Snapshot of engine state for status queries
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub connected: bool,
    pub discoverable: bool,
    pub device_name: String,
    pub status: String,
    pub adapter_state: AdapterState,
}

/// Cloneable handle to the engine task
#[derive(Clone)]
pub struct HidHandle {
    cmd_tx: mpsc::Sender<HidCommand>,
    event_tx: EventSender,
}

impl HidHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<HidEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> HidCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| HidError::Bus("engine task gone".into()))?;
        rx.await.map_err(|_| HidError::Bus("engine task gone".into()))
    }

    pub async fn initialize(&self) -> Result<()> {
        self.request(|tx| HidCommand::Initialize { respond_to: tx })
            .await?
    }

    pub async fn send_key(&self, key: KeyCode, modifiers: Modifiers) -> Result<()> {
        self.request(|tx| HidCommand::SendKey {
            key,
            modifiers,
            respond_to: tx,
        })
        .await?
    }

    pub async fn send_key_combo(&self, keys: Vec<KeyCode>, modifiers: Modifiers) -> Result<()> {
        self.request(|tx| HidCommand::SendKeyCombo {
            keys,
            modifiers,
            respond_to: tx,
        })
        .await?
    }

    pub async fn send_text(&self, text: String) -> Result<()> {
        self.request(|tx| HidCommand::SendText {
            text,
            respond_to: tx,
        })
        .await?
    }

    pub async fn execute_steps(&self, steps: Vec<MacroStep>) -> Result<()> {
        self.request(|tx| HidCommand::ExecuteSteps {
            steps,
            respond_to: tx,
        })
        .await?
    }

    pub async fn start_pairing(&self) -> Result<()> {
        self.request(|tx| HidCommand::StartPairing { respond_to: tx })
            .await?
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.request(|tx| HidCommand::Disconnect { respond_to: tx })
            .await
    }

    pub async fn set_discoverable(&self, on: bool) -> Result<()> {
        self.request(|tx| HidCommand::SetDiscoverable { on, respond_to: tx })
            .await?
    }

    pub async fn set_device_name(&self, name: String) -> Result<()> {
        self.request(|tx| HidCommand::SetDeviceName {
            name,
            respond_to: tx,
        })
        .await?
    }

    pub async fn status(&self) -> Result<EngineStatus> {
        self.request(|tx| HidCommand::Status { respond_to: tx })
            .await
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(HidCommand::Shutdown).await;
    }
}

/// The engine task itself
pub struct HidEngine<A: AdapterClient> {
    adapter: A,
    channel: ConnectionChannel,
    scheduler: MacroScheduler,
    cmd_rx: mpsc::Receiver<HidCommand>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    event_tx: EventSender,
    state: AdapterState,
    device_name: String,
    discoverable: bool,
    status: String,
    /// Deadline of a scheduler Sleep in flight, if any
    resume_at: Option<Instant>,
}

impl<A: AdapterClient> HidEngine<A> {
    pub fn new(adapter: A, peer_rx: mpsc::Receiver<PeerEvent>, device_name: String) -> (Self, HidHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let engine = Self {
            adapter,
            channel: ConnectionChannel::new(),
            scheduler: MacroScheduler::new(),
            cmd_rx,
            peer_rx,
            event_tx: event_tx.clone(),
            state: AdapterState::Uninitialized,
            device_name,
            discoverable: false,
            status: String::new(),
            resume_at: None,
        };
        let handle = HidHandle { cmd_tx, event_tx };
        (engine, handle)
    }

    pub async fn run(mut self) {
        info!("HID engine started");
        loop {
            tokio::select! {
                () = Self::resume(self.resume_at) => {
                    self.resume_at = None;
                    self.pump();
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(HidCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                event = self.peer_rx.recv() => {
                    match event {
                        Some(event) => self.handle_peer_event(event),
                        None => {
                            warn!("profile channel closed");
                            break;
                        }
                    }
                }
            }
        }
        self.channel.close();
        info!("HID engine stopped");
    }

    /// Wait for the scheduler's pending deadline; pend forever when idle
    async fn resume(deadline: Option<Instant>) {
        match deadline {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    }

    async fn handle_command(&mut self, cmd: HidCommand) {
        match cmd {
            HidCommand::Initialize { respond_to } => {
                let _ = respond_to.send(self.initialize().await);
            }
            HidCommand::SendKey {
                key,
                modifiers,
                respond_to,
            } => {
                let _ = respond_to.send(self.send_key(key, modifiers).await);
            }
            HidCommand::SendKeyCombo {
                keys,
                modifiers,
                respond_to,
            } => {
                let _ = respond_to.send(self.send_key_combo(&keys, modifiers).await);
            }
            HidCommand::SendText { text, respond_to } => {
                let _ = respond_to.send(self.send_text(&text).await);
            }
            HidCommand::ExecuteSteps { steps, respond_to } => {
                let _ = respond_to.send(self.execute_steps(steps));
            }
            HidCommand::StartPairing { respond_to } => {
                let _ = respond_to.send(self.start_pairing().await);
            }
            HidCommand::Disconnect { respond_to } => {
                self.disconnect();
                let _ = respond_to.send(());
            }
            HidCommand::SetDiscoverable { on, respond_to } => {
                let _ = respond_to.send(self.set_discoverable(on).await);
            }
            HidCommand::SetDeviceName { name, respond_to } => {
                let _ = respond_to.send(self.set_device_name(name).await);
            }
            HidCommand::Status { respond_to } => {
                let _ = respond_to.send(EngineStatus {
                    connected: self.channel.is_connected(),
                    discoverable: self.discoverable,
                    device_name: self.device_name.clone(),
                    status: self.status.clone(),
                    adapter_state: self.state.clone(),
                });
            }
            HidCommand::Shutdown => unreachable!("handled in run loop"),
        }
    }

    fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Connected {
                control,
                interrupt,
                device,
            } => {
                self.channel.open(control, interrupt);
                info!(device, "peer connected");
                self.emit(HidEvent::ConnectionChanged(true));
                self.set_status("Connected".into());
            }
            PeerEvent::Disconnected { device } => {
                debug!(device, "peer disconnected");
                self.disconnect();
            }
        }
    }

    async fn initialize(&mut self) -> Result<()> {
        self.set_status("Initializing Bluetooth HID...".into());
        if let Err(e) = self.adapter.power_on().await {
            self.state = AdapterState::Error(e.to_string());
            self.set_status("Error: no Bluetooth adapter found".into());
            self.emit(HidEvent::Error(e.to_string()));
            return Err(e);
        }
        if let Err(e) = self.adapter.set_alias(&self.device_name).await {
            self.state = AdapterState::Error(e.to_string());
            self.set_status(format!("Error: {e}"));
            self.emit(HidEvent::Error(e.to_string()));
            return Err(e);
        }
        self.state = AdapterState::Bound;

        if let Err(e) = self
            .adapter
            .register_service(PROFILE_PATH, &self.device_name)
            .await
        {
            self.state = AdapterState::Error(e.to_string());
            self.set_status(format!("Error: {e}"));
            self.emit(HidEvent::Error(e.to_string()));
            return Err(e);
        }
        self.state = AdapterState::ProfileRegistered;

        // Discoverability is pairing's concern; a ready pad only accepts
        // already-paired hosts until start_pairing is requested.
        self.state = AdapterState::Ready;
        self.set_status("Ready - waiting for connection".into());
        Ok(())
    }

    /// Press-and-release of one key
    async fn send_key(&mut self, key: KeyCode, modifiers: Modifiers) -> Result<()> {
        self.run_actions(key_actions(key, modifiers)).await
    }

    /// Hold several keys under one modifier set, then release everything
    async fn send_key_combo(&mut self, keys: &[KeyCode], modifiers: Modifiers) -> Result<()> {
        self.run_actions(combo_actions(keys, modifiers)).await
    }

    /// Type a string, one press/release pair per mappable character
    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.run_actions(text_actions(text)).await
    }

    /// Execute a compiled action list inline; unlike macros this never
    /// emits a completion event
    ///
    /// A macro in flight is left alone: its scheduler state and pending
    /// deadline survive, so the queue resumes once this send has finished.
    async fn run_actions(&mut self, actions: Vec<Action>) -> Result<()> {
        if !self.channel.is_connected() {
            return Err(HidError::NotConnected);
        }
        for action in actions {
            match action {
                Action::Write(report) => self.channel.write(report.as_bytes())?,
                Action::Pause(duration) => sleep(duration).await,
            }
        }
        Ok(())
    }

    /// Start a macro; a macro already in flight is replaced
    fn execute_steps(&mut self, steps: Vec<MacroStep>) -> Result<()> {
        if !self.channel.is_connected() {
            return Err(HidError::NotConnected);
        }
        if self.scheduler.is_running() {
            debug!("replacing macro in flight");
        }
        self.resume_at = None;
        self.scheduler.start(steps);
        self.pump();
        Ok(())
    }

    /// Drain the scheduler until it sleeps, completes or idles
    fn pump(&mut self) {
        loop {
            match self.scheduler.tick() {
                Tick::Write(report) => {
                    if let Err(e) = self.channel.write(report.as_bytes()) {
                        error!(error = %e, "macro write failed, aborting macro");
                        self.scheduler.cancel();
                        self.emit(HidEvent::Error(e.to_string()));
                        return;
                    }
                }
                Tick::Sleep(duration) => {
                    self.resume_at = Some(Instant::now() + duration);
                    return;
                }
                Tick::Complete => {
                    self.emit(HidEvent::MacroComplete);
                    return;
                }
                Tick::Idle => return,
            }
        }
    }

    async fn start_pairing(&mut self) -> Result<()> {
        self.adapter.set_discoverable(true).await?;
        if !self.discoverable {
            self.discoverable = true;
            self.emit(HidEvent::DiscoverableChanged(true));
        }
        self.set_status("Pairing mode - waiting for connection...".into());
        Ok(())
    }

    /// Drop the connection, if any; safe to call when already disconnected
    fn disconnect(&mut self) {
        let was_connected = self.channel.is_connected();
        self.channel.close();
        self.scheduler.cancel();
        self.resume_at = None;
        if was_connected {
            info!("disconnected");
            self.emit(HidEvent::ConnectionChanged(false));
            self.set_status("Disconnected".into());
        }
    }

    async fn set_discoverable(&mut self, on: bool) -> Result<()> {
        if on == self.discoverable {
            return Ok(());
        }
        self.adapter.set_discoverable(on).await?;
        self.discoverable = on;
        self.emit(HidEvent::DiscoverableChanged(on));
        Ok(())
    }

    async fn set_device_name(&mut self, name: String) -> Result<()> {
        if name == self.device_name {
            return Ok(());
        }
        self.adapter.set_alias(&name).await?;
        self.device_name = name.clone();
        self.emit(HidEvent::DeviceNameChanged(name));
        Ok(())
    }

    fn set_status(&mut self, status: String) {
        if status != self.status {
            self.status = status.clone();
            self.emit(HidEvent::StatusChanged(status));
        }
    }

    fn emit(&self, event: HidEvent) {
        // send only fails with no subscribers, which is fine
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::fd::OwnedFd;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FakeAdapter {
        fail_power_on: bool,
        fail_alias: bool,
        fail_register: Arc<AtomicBool>,
        registered: Arc<AtomicBool>,
    }

    impl FakeAdapter {
        fn new() -> Self {
            Self {
                fail_power_on: false,
                fail_alias: false,
                fail_register: Arc::new(AtomicBool::new(false)),
                registered: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl AdapterClient for FakeAdapter {
        async fn power_on(&self) -> Result<()> {
            if self.fail_power_on {
                Err(HidError::AdapterUnavailable)
            } else {
                Ok(())
            }
        }
        async fn set_alias(&self, _name: &str) -> Result<()> {
            if self.fail_alias {
                Err(HidError::Bus("alias rejected".into()))
            } else {
                Ok(())
            }
        }
        async fn set_discoverable(&self, _on: bool) -> Result<()> {
            Ok(())
        }
        async fn register_service(&self, _path: &str, _name: &str) -> Result<()> {
            if self.fail_register.load(Ordering::SeqCst) {
                return Err(HidError::ProfileRegistration("record rejected".into()));
            }
            self.registered.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        handle: HidHandle,
        peer_tx: mpsc::Sender<PeerEvent>,
    }

    fn spawn_engine(adapter: FakeAdapter) -> Harness {
        let (peer_tx, peer_rx) = mpsc::channel(4);
        let (engine, handle) = HidEngine::new(adapter, peer_rx, "TestPad".into());
        tokio::spawn(engine.run());
        Harness { handle, peer_tx }
    }

    fn pipe_pair() -> (OwnedFd, std::fs::File) {
        let (r, w) = nix::unistd::pipe().unwrap();
        (w, std::fs::File::from(r))
    }

    /// Connect the engine to fresh pipes and return the interrupt reader
    async fn connect(h: &Harness) -> std::fs::File {
        let (ctrl_w, _ctrl_r) = pipe_pair();
        std::mem::forget(_ctrl_r);
        let (intr_w, intr_r) = pipe_pair();
        h.peer_tx
            .send(PeerEvent::Connected {
                control: ctrl_w,
                interrupt: intr_w,
                device: "/org/bluez/hci0/dev_TEST".into(),
            })
            .await
            .unwrap();
        // Wait for the engine to observe it
        loop {
            if h.handle.status().await.unwrap().connected {
                break;
            }
            tokio::task::yield_now().await;
        }
        intr_r
    }

    fn read_report(reader: &mut std::fs::File) -> [u8; 10] {
        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_initialize_reaches_ready() {
        let adapter = FakeAdapter::new();
        let registered = adapter.registered.clone();
        let h = spawn_engine(adapter);

        h.handle.initialize().await.unwrap();
        assert!(registered.load(Ordering::SeqCst));
        let status = h.handle.status().await.unwrap();
        assert_eq!(status.adapter_state, AdapterState::Ready);
        // Ready does not imply discoverable; that is pairing mode's job
        assert!(!status.discoverable);
        assert_eq!(status.status, "Ready - waiting for connection");
    }

    #[tokio::test]
    async fn test_pairing_mode_enables_discoverable() {
        let h = spawn_engine(FakeAdapter::new());

        h.handle.initialize().await.unwrap();
        h.handle.start_pairing().await.unwrap();
        let status = h.handle.status().await.unwrap();
        assert!(status.discoverable);
        assert_eq!(status.status, "Pairing mode - waiting for connection...");
    }

    #[tokio::test]
    async fn test_initialize_retry_after_registration_failure() {
        let adapter = FakeAdapter::new();
        let fail_register = adapter.fail_register.clone();
        fail_register.store(true, Ordering::SeqCst);
        let h = spawn_engine(adapter);

        let result = h.handle.initialize().await;
        assert!(matches!(result, Err(HidError::ProfileRegistration(_))));
        let status = h.handle.status().await.unwrap();
        assert!(matches!(status.adapter_state, AdapterState::Error(_)));

        // BlueZ comes back; the same engine initializes cleanly
        fail_register.store(false, Ordering::SeqCst);
        h.handle.initialize().await.unwrap();
        let status = h.handle.status().await.unwrap();
        assert_eq!(status.adapter_state, AdapterState::Ready);
    }

    #[tokio::test]
    async fn test_alias_failure_reports_error_state() {
        let mut adapter = FakeAdapter::new();
        adapter.fail_alias = true;
        let h = spawn_engine(adapter);
        let mut events = h.handle.subscribe();

        let result = h.handle.initialize().await;
        assert!(matches!(result, Err(HidError::Bus(_))));
        let status = h.handle.status().await.unwrap();
        assert!(matches!(status.adapter_state, AdapterState::Error(_)));
        assert!(status.status.starts_with("Error:"));

        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, HidEvent::Error(_)) {
                saw_error = true;
            }
        }
        assert!(saw_error, "alias failure must reach the error channel");
    }

    #[tokio::test]
    async fn test_initialize_without_adapter_reports_error() {
        let mut adapter = FakeAdapter::new();
        adapter.fail_power_on = true;
        let h = spawn_engine(adapter);

        let result = h.handle.initialize().await;
        assert!(matches!(result, Err(HidError::AdapterUnavailable)));
        let status = h.handle.status().await.unwrap();
        assert_eq!(status.status, "Error: no Bluetooth adapter found");
        assert!(matches!(status.adapter_state, AdapterState::Error(_)));
    }

    #[tokio::test]
    async fn test_send_key_writes_press_and_release() {
        let h = spawn_engine(FakeAdapter::new());
        let mut reader = connect(&h).await;

        // Ctrl+C
        h.handle
            .send_key(KeyCode::C, Modifiers::LEFT_CTRL)
            .await
            .unwrap();

        let press = read_report(&mut reader);
        assert_eq!(press, [0xA1, 0x01, 0x01, 0x00, 0x06, 0, 0, 0, 0, 0]);
        let release = read_report(&mut reader);
        assert_eq!(release, [0xA1, 0x01, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_send_text_emits_pair_per_character() {
        let h = spawn_engine(FakeAdapter::new());
        let mut reader = connect(&h).await;

        h.handle.send_text("Hi!".into()).await.unwrap();

        // Three characters, each a press and a release
        let shift = Modifiers::LEFT_SHIFT.0;
        let expected_presses = [
            (shift, 0x0B), // H
            (0x00, 0x0C),  // i
            (shift, 0x1E), // ! = Shift+1
        ];
        for (modifiers, key) in expected_presses {
            let press = read_report(&mut reader);
            assert_eq!(press[2], modifiers);
            assert_eq!(press[4], key);
            let release = read_report(&mut reader);
            assert_eq!(&release[2..], &[0u8; 8]);
        }
    }

    #[tokio::test]
    async fn test_send_without_connection_is_rejected() {
        let h = spawn_engine(FakeAdapter::new());
        let result = h.handle.send_key(KeyCode::A, Modifiers::NONE).await;
        assert!(matches!(result, Err(HidError::NotConnected)));
        let result = h.handle.send_text("hello".into()).await;
        assert!(matches!(result, Err(HidError::NotConnected)));
        let result = h.handle.execute_steps(vec![MacroStep::Delay { ms: 5 }]).await;
        assert!(matches!(result, Err(HidError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_twice_is_harmless() {
        let h = spawn_engine(FakeAdapter::new());
        let mut events = h.handle.subscribe();
        let _reader = connect(&h).await;

        h.handle.disconnect().await.unwrap();
        h.handle.disconnect().await.unwrap();
        assert!(!h.handle.status().await.unwrap().connected);

        // Exactly one ConnectionChanged(false) among the emitted events
        let mut down_events = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, HidEvent::ConnectionChanged(false)) {
                down_events += 1;
            }
        }
        assert_eq!(down_events, 1);
    }

    #[tokio::test]
    async fn test_macro_runs_to_completion() {
        let h = spawn_engine(FakeAdapter::new());
        let mut events = h.handle.subscribe();
        let mut reader = connect(&h).await;

        h.handle
            .execute_steps(vec![MacroStep::Key {
                key_code: KeyCode::C,
                modifiers: Modifiers::LEFT_CTRL,
            }])
            .await
            .unwrap();

        // Both reports are buffered in the pipe once the macro completes
        loop {
            match events.recv().await.unwrap() {
                HidEvent::MacroComplete => break,
                _ => continue,
            }
        }
        let press = read_report(&mut reader);
        assert_eq!((press[2], press[4]), (0x01, 0x06));
        let release = read_report(&mut reader);
        assert_eq!(&release[2..], &[0u8; 8]);
    }

    #[tokio::test]
    async fn test_macro_replacement_single_completion() {
        let h = spawn_engine(FakeAdapter::new());
        let mut events = h.handle.subscribe();
        let mut reader = connect(&h).await;

        // First macro parks in a long delay, second replaces it
        h.handle
            .execute_steps(vec![
                MacroStep::Delay { ms: 60_000 },
                MacroStep::Key {
                    key_code: KeyCode::A,
                    modifiers: Modifiers::NONE,
                },
            ])
            .await
            .unwrap();
        h.handle
            .execute_steps(vec![MacroStep::Key {
                key_code: KeyCode::B,
                modifiers: Modifiers::NONE,
            }])
            .await
            .unwrap();

        // Only the replacement's key ever hits the wire
        let press = read_report(&mut reader);
        assert_eq!(press[4], KeyCode::B.0);

        let mut completions = 0;
        loop {
            match events.recv().await.unwrap() {
                HidEvent::MacroComplete => {
                    completions += 1;
                    break;
                }
                _ => continue,
            }
        }
        // Give a lagging second completion a chance to show up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        while let Ok(event) = events.try_recv() {
            if matches!(event, HidEvent::MacroComplete) {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn test_direct_send_interleaves_with_running_macro() {
        let h = spawn_engine(FakeAdapter::new());
        let mut events = h.handle.subscribe();
        let mut reader = connect(&h).await;

        // Macro parks in a delay; a direct send arrives in the meantime
        h.handle
            .execute_steps(vec![
                MacroStep::Delay { ms: 200 },
                MacroStep::Key {
                    key_code: KeyCode::A,
                    modifiers: Modifiers::NONE,
                },
            ])
            .await
            .unwrap();
        h.handle
            .send_key(KeyCode::B, Modifiers::NONE)
            .await
            .unwrap();

        // The macro still runs to completion after the interleaved send
        loop {
            match events.recv().await.unwrap() {
                HidEvent::MacroComplete => break,
                _ => continue,
            }
        }

        // Wire order: the direct B pair first, then the macro's A pair
        let press = read_report(&mut reader);
        assert_eq!(press[4], KeyCode::B.0);
        let release = read_report(&mut reader);
        assert_eq!(&release[2..], &[0u8; 8]);
        let press = read_report(&mut reader);
        assert_eq!(press[4], KeyCode::A.0);
        let release = read_report(&mut reader);
        assert_eq!(&release[2..], &[0u8; 8]);
    }
}
