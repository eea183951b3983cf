//! HID input report encoding
//!
//! Keyboard input reports carried over the interrupt channel use a fixed
//! 10-byte layout:
//!
//! | byte | content                               |
//! |------|---------------------------------------|
//! | 0    | report kind marker (0xA1 = input)     |
//! | 1    | report ID (always 1)                  |
//! | 2    | modifier bitmask                      |
//! | 3    | reserved, always 0                    |
//! | 4-9  | keycode slots (up to 6 simultaneous)  |
//!
//! This implementation sends one active key per report; slots 5-9 are
//! always zero.

use crate::keys::{KeyCode, Modifiers};

/// Total size of an input report in bytes
pub const REPORT_SIZE: usize = 10;

/// Report kind marker for input reports (DATA | INPUT)
pub const REPORT_KIND_INPUT: u8 = 0xA1;

/// Report ID matching the report descriptor
pub const REPORT_ID_KEYBOARD: u8 = 0x01;

/// A fixed-layout keyboard input report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReport([u8; REPORT_SIZE]);

impl InputReport {
    /// Encode a report carrying one key and a modifier mask
    pub fn new(modifiers: Modifiers, key: KeyCode) -> Self {
        let mut buf = [0u8; REPORT_SIZE];
        buf[0] = REPORT_KIND_INPUT;
        buf[1] = REPORT_ID_KEYBOARD;
        buf[2] = modifiers.0;
        buf[3] = 0x00;
        buf[4] = key.0;
        InputReport(buf)
    }

    /// The canonical "all keys released" report
    pub fn release_all() -> Self {
        Self::new(Modifiers::NONE, KeyCode::NONE)
    }

    /// Raw report bytes as written to the interrupt channel
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
