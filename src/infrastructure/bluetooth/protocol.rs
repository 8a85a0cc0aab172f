//! EMG Sensor Protocol
//!
//! Fixed identifiers of the EMG sensor peripheral.

/// Address of the only peripheral this application talks to
pub const TARGET_ADDRESS: &str = "08:d1:f9:fd:40:7e";

/// Telemetry characteristic UUID - 24-byte frames arrive here
pub const CHARACTERISTIC_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26a8;

/// Format a 128-bit UUID in canonical 8-4-4-4-12 form
pub fn format_uuid(uuid: u128) -> String {
    let hex = format!("{:032x}", uuid);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
