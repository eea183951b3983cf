//! HID service record and report descriptor
//!
//! The SDP record advertised through BlueZ describes a standard keyboard:
//! HID profile UUID 0x1124, L2CAP PSMs 0x11 (control) and 0x13 (interrupt),
//! and an embedded report descriptor with a modifier byte, a reserved byte,
//! 5 LED output bits plus 3 padding bits, and up to 6 simultaneous keycodes
//! in the range 0-101.

use std::fmt::Write;

/// Bluetooth HID profile UUID
pub const HID_PROFILE_UUID: &str = "00001124-0000-1000-8000-00805f9b34fb";

/// L2CAP PSM of the HID control channel
pub const PSM_HID_CONTROL: u16 = 0x11;

/// L2CAP PSM of the HID interrupt channel
pub const PSM_HID_INTERRUPT: u16 = 0x13;

/// HID report descriptor for a standard keyboard
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute) - modifier byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant) - reserved byte
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute) - LED states
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant) - LED padding
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array) - 6 key slots
    0xC0, // End Collection
];

/// Build the SDP service record XML for the given display name
///
/// The record carries the profile UUID, both protocol descriptor lists with
/// their PSMs, language/encoding attributes, and the report descriptor as a
/// hex-encoded blob.
pub fn service_record_xml(name: &str) -> String {
    let descriptor_hex = hex_encode(REPORT_DESCRIPTOR);
    let name = xml_escape(name);

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" ?>"#,
            "<record>",
            r#"<attribute id="0x0001"><sequence><uuid value="0x1124" /></sequence></attribute>"#,
            r#"<attribute id="0x0004"><sequence>"#,
            r#"<sequence><uuid value="0x0100" /><uint16 value="0x{ctrl:04x}" /></sequence>"#,
            r#"<sequence><uuid value="0x0011" /></sequence>"#,
            "</sequence></attribute>",
            r#"<attribute id="0x0005"><sequence><uuid value="0x1002" /></sequence></attribute>"#,
            r#"<attribute id="0x0006"><sequence>"#,
            r#"<uint16 value="0x656e" /><uint16 value="0x006a" /><uint16 value="0x0100" />"#,
            "</sequence></attribute>",
            r#"<attribute id="0x0009"><sequence>"#,
            r#"<sequence><uuid value="0x1124" /><uint16 value="0x0100" /></sequence>"#,
            "</sequence></attribute>",
            r#"<attribute id="0x000d"><sequence>"#,
            r#"<sequence><uuid value="0x0100" /><uint16 value="0x{intr:04x}" /></sequence>"#,
            r#"<sequence><uuid value="0x0011" /></sequence>"#,
            "</sequence></attribute>",
            r#"<attribute id="0x0100"><text value="{name}" /></attribute>"#,
            r#"<attribute id="0x0101"><text value="Bluetooth HID macro keyboard" /></attribute>"#,
            r#"<attribute id="0x0102"><text value="{name}" /></attribute>"#,
            r#"<attribute id="0x0200"><uint16 value="0x0100" /></attribute>"#,
            r#"<attribute id="0x0201"><uint16 value="0x0111" /></attribute>"#,
            r#"<attribute id="0x0202"><uint8 value="0x40" /></attribute>"#,
            r#"<attribute id="0x0203"><uint8 value="0x00" /></attribute>"#,
            r#"<attribute id="0x0204"><boolean value="true" /></attribute>"#,
            r#"<attribute id="0x0205"><boolean value="true" /></attribute>"#,
            r#"<attribute id="0x0206"><sequence><sequence>"#,
            r#"<uint8 value="0x22" />"#,
            r#"<text encoding="hex" value="{descriptor}" />"#,
            "</sequence></sequence></attribute>",
            "</record>",
        ),
        ctrl = PSM_HID_CONTROL,
        intr = PSM_HID_INTERRUPT,
        name = name,
        descriptor = descriptor_hex,
    )
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
