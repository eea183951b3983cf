//! HID error taxonomy

use thiserror::Error;

/// Errors surfaced by the HID engine and its collaborators
#[derive(Debug, Error)]
pub enum HidError {
    /// No Bluetooth adapter found on the system bus
    #[error("no Bluetooth adapter found")]
    AdapterUnavailable,

    /// BlueZ rejected the HID service record
    #[error("failed to register HID profile: {0}")]
    ProfileRegistration(String),

    /// A send was attempted without a connected peer
    #[error("not connected to any device")]
    NotConnected,

    /// Writing a report to the interrupt channel failed
    #[error("failed to write HID report: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// The macro store has no macro with this id
    #[error("macro not found: {0}")]
    MacroNotFound(String),

    /// D-Bus transport failure talking to the Bluetooth stack
    #[error("bus error: {0}")]
    Bus(String),
}

/// Type alias for HID results
pub type Result<T> = std::result::Result<T, HidError>;
