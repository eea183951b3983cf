//! BlueZ integration: adapter binding, HID profile object, channel fds

pub mod adapter;
pub mod channel;
pub mod profile;

pub use adapter::{AdapterClient, AdapterState, BluezAdapter};
pub use channel::ConnectionChannel;
pub use profile::{HidProfile, PROFILE_PATH, PeerEvent};
