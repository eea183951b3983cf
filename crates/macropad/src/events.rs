//! Engine notifications
//!
//! Everything observable about the engine fans out through a single
//! broadcast channel; the D-Bus control interface re-emits these as
//! signals.

use tokio::sync::broadcast;

/// Notifications emitted by the HID engine
#[derive(Debug, Clone)]
pub enum HidEvent {
    /// Peer connection established or lost
    ConnectionChanged(bool),
    /// Adapter discoverable/pairable flags toggled
    DiscoverableChanged(bool),
    /// Advertised device name re-applied
    DeviceNameChanged(String),
    /// Human-readable engine status changed
    StatusChanged(String),
    /// An operation failed; message for display/logging
    Error(String),
    /// A macro queue ran to completion
    MacroComplete,
}

/// Broadcast sender for engine notifications
pub type EventSender = broadcast::Sender<HidEvent>;

/// Capacity of the notification channel; slow subscribers lag rather than
/// block the engine.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
