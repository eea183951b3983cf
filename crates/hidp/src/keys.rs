//! Keycode and modifier definitions
//!
//! Scancodes follow the USB HID keyboard usage table (usage page 0x07),
//! which the Bluetooth HID profile reuses unchanged.

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// 8-bit HID keyboard usage ID
///
/// `KeyCode::NONE` (0x00) means "no key" and is used both for empty report
/// slots and as the mapper's result for characters it cannot type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub const NONE: KeyCode = KeyCode(0x00);

    pub const A: KeyCode = KeyCode(0x04);
    pub const B: KeyCode = KeyCode(0x05);
    pub const C: KeyCode = KeyCode(0x06);
    pub const D: KeyCode = KeyCode(0x07);
    pub const E: KeyCode = KeyCode(0x08);
    pub const F: KeyCode = KeyCode(0x09);
    pub const G: KeyCode = KeyCode(0x0A);
    pub const H: KeyCode = KeyCode(0x0B);
    pub const I: KeyCode = KeyCode(0x0C);
    pub const J: KeyCode = KeyCode(0x0D);
    pub const K: KeyCode = KeyCode(0x0E);
    pub const L: KeyCode = KeyCode(0x0F);
    pub const M: KeyCode = KeyCode(0x10);
    pub const N: KeyCode = KeyCode(0x11);
    pub const O: KeyCode = KeyCode(0x12);
    pub const P: KeyCode = KeyCode(0x13);
    pub const Q: KeyCode = KeyCode(0x14);
    pub const R: KeyCode = KeyCode(0x15);
    pub const S: KeyCode = KeyCode(0x16);
    pub const T: KeyCode = KeyCode(0x17);
    pub const U: KeyCode = KeyCode(0x18);
    pub const V: KeyCode = KeyCode(0x19);
    pub const W: KeyCode = KeyCode(0x1A);
    pub const X: KeyCode = KeyCode(0x1B);
    pub const Y: KeyCode = KeyCode(0x1C);
    pub const Z: KeyCode = KeyCode(0x1D);

    pub const NUM_1: KeyCode = KeyCode(0x1E);
    pub const NUM_2: KeyCode = KeyCode(0x1F);
    pub const NUM_3: KeyCode = KeyCode(0x20);
    pub const NUM_4: KeyCode = KeyCode(0x21);
    pub const NUM_5: KeyCode = KeyCode(0x22);
    pub const NUM_6: KeyCode = KeyCode(0x23);
    pub const NUM_7: KeyCode = KeyCode(0x24);
    pub const NUM_8: KeyCode = KeyCode(0x25);
    pub const NUM_9: KeyCode = KeyCode(0x26);
    pub const NUM_0: KeyCode = KeyCode(0x27);

    pub const ENTER: KeyCode = KeyCode(0x28);
    pub const ESCAPE: KeyCode = KeyCode(0x29);
    pub const BACKSPACE: KeyCode = KeyCode(0x2A);
    pub const TAB: KeyCode = KeyCode(0x2B);
    pub const SPACE: KeyCode = KeyCode(0x2C);

    pub const F1: KeyCode = KeyCode(0x3A);
    pub const F2: KeyCode = KeyCode(0x3B);
    pub const F3: KeyCode = KeyCode(0x3C);
    pub const F4: KeyCode = KeyCode(0x3D);
    pub const F5: KeyCode = KeyCode(0x3E);
    pub const F6: KeyCode = KeyCode(0x3F);
    pub const F7: KeyCode = KeyCode(0x40);
    pub const F8: KeyCode = KeyCode(0x41);
    pub const F9: KeyCode = KeyCode(0x42);
    pub const F10: KeyCode = KeyCode(0x43);
    pub const F11: KeyCode = KeyCode(0x44);
    pub const F12: KeyCode = KeyCode(0x45);

    pub const PRINT_SCREEN: KeyCode = KeyCode(0x46);
    pub const DELETE: KeyCode = KeyCode(0x4C);
    pub const ARROW_RIGHT: KeyCode = KeyCode(0x4F);
    pub const ARROW_LEFT: KeyCode = KeyCode(0x50);
    pub const ARROW_DOWN: KeyCode = KeyCode(0x51);
    pub const ARROW_UP: KeyCode = KeyCode(0x52);

    pub const VOLUME_MUTE: KeyCode = KeyCode(0x7F);
    pub const VOLUME_UP: KeyCode = KeyCode(0x80);
    pub const VOLUME_DOWN: KeyCode = KeyCode(0x81);

    /// Whether this code represents an actual key
    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

impl From<u8> for KeyCode {
    fn from(raw: u8) -> Self {
        KeyCode(raw)
    }
}

/// Modifier-byte bitmask (byte 2 of the input report)
///
/// One bit per modifier key; masks combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0x00);
    pub const LEFT_CTRL: Modifiers = Modifiers(0x01);
    pub const LEFT_SHIFT: Modifiers = Modifiers(0x02);
    pub const LEFT_ALT: Modifiers = Modifiers(0x04);
    pub const LEFT_GUI: Modifiers = Modifiers(0x08);
    pub const RIGHT_CTRL: Modifiers = Modifiers(0x10);
    pub const RIGHT_SHIFT: Modifiers = Modifiers(0x20);
    pub const RIGHT_ALT: Modifiers = Modifiers(0x40);
    pub const RIGHT_GUI: Modifiers = Modifiers(0x80);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl From<u8> for Modifiers {
    fn from(raw: u8) -> Self {
        Modifiers(raw)
    }
}
