//! HID keyboard protocol library for bt-macropad
//!
//! This crate defines everything needed to speak the Bluetooth HID keyboard
//! profile at the byte level: usage-table keycodes and modifier masks, the
//! character-to-scancode mapper, the fixed-layout input report encoder, the
//! macro step definitions consumed by the scheduler, and the SDP service
//! record advertised to peers.
//!
//! It is deliberately free of I/O and async so the daemon and its tests can
//! share it without a Bluetooth stack present.
//!
//! # Example
//!
//! ```
//! use hidp::{InputReport, Modifiers, keymap};
//!
//! // 'A' needs shift: same scancode as 'a', LEFT_SHIFT in the modifier byte.
//! let (code, shift) = keymap::map_char('A');
//! let mods = if shift { Modifiers::LEFT_SHIFT } else { Modifiers::NONE };
//! let report = InputReport::new(mods, code);
//! assert_eq!(report.as_bytes()[2], 0x02);
//! ```

pub mod error;
pub mod keymap;
pub mod keys;
pub mod report;
pub mod sdp;
pub mod steps;

pub use error::{HidError, Result};
pub use keys::{KeyCode, Modifiers};
pub use report::{InputReport, REPORT_SIZE};
pub use sdp::{HID_PROFILE_UUID, PSM_HID_CONTROL, PSM_HID_INTERRUPT, service_record_xml};
pub use steps::MacroStep;
