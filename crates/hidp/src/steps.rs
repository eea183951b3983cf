//! Macro step definitions
//!
//! A macro is an ordered sequence of steps executed by the scheduler. The
//! JSON shape matches the persisted macro store: a `type` tag plus
//! per-variant fields, e.g. `{"type": "key", "keyCode": 6, "modifiers": 1}`.
//!
//! The variant set is closed: an unknown `type` is a deserialization error,
//! never silently ignored.

use crate::keys::{KeyCode, Modifiers};
use serde::{Deserialize, Serialize};

fn default_delay_ms() -> u64 {
    100
}

/// One step of a macro sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MacroStep {
    /// Press and release a single key
    Key {
        #[serde(rename = "keyCode")]
        key_code: KeyCode,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Type a string character by character
    Text { text: String },
    /// Pause for the given number of milliseconds
    Delay {
        #[serde(default = "default_delay_ms")]
        ms: u64,
    },
    /// Press several keys together, then release all at once
    Combo {
        keys: Vec<KeyCode>,
        #[serde(default)]
        modifiers: Modifiers,
    },
}
