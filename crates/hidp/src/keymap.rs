//! Character to scancode mapping
//!
//! Covers the US keyboard layout subset the pad can type: letters, digits,
//! whitespace, and the shifted digit-row punctuation. Anything else maps to
//! `KeyCode::NONE` and is silently skipped by callers; an untypable
//! character is not an error.

use crate::keys::KeyCode;

/// Map a character to its scancode and whether shift must be held
///
/// Returns `(KeyCode::NONE, false)` for characters without a mapping.
pub fn map_char(c: char) -> (KeyCode, bool) {
    match c {
        'a'..='z' => (KeyCode(KeyCode::A.0 + (c as u8 - b'a')), false),
        'A'..='Z' => (KeyCode(KeyCode::A.0 + (c as u8 - b'A')), true),
        '1'..='9' => (KeyCode(KeyCode::NUM_1.0 + (c as u8 - b'1')), false),
        '0' => (KeyCode::NUM_0, false),
        ' ' => (KeyCode::SPACE, false),
        '\n' | '\r' => (KeyCode::ENTER, false),
        '\t' => (KeyCode::TAB, false),
        '!' => (KeyCode::NUM_1, true),
        '@' => (KeyCode::NUM_2, true),
        '#' => (KeyCode::NUM_3, true),
        '$' => (KeyCode::NUM_4, true),
        '%' => (KeyCode::NUM_5, true),
        '^' => (KeyCode::NUM_6, true),
        '&' => (KeyCode::NUM_7, true),
        '*' => (KeyCode::NUM_8, true),
        '(' => (KeyCode::NUM_9, true),
        ')' => (KeyCode::NUM_0, true),
        _ => (KeyCode::NONE, false),
    }
}
