use std::fmt;
use std::str::FromStr;

/// 48-bit Bluetooth device address, stored in the low bits of a `u64`
/// the same way the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BluetoothAddress(u64);

impl BluetoothAddress {
    const MASK: u64 = 0xFFFF_FFFF_FFFF;

    pub const fn new(raw: u64) -> Self {
        Self(raw & Self::MASK)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Check whether this address matches a textual address,
    /// ignoring hex case.
    pub fn matches(&self, text: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(text.trim())
    }
}

impl fmt::Display for BluetoothAddress {
    /// Six colon-separated, lowercase, zero-padded octets, most significant first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid Bluetooth address: {0:?}")]
pub struct AddressParseError(pub String);

impl FromStr for BluetoothAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets: Vec<&str> = s.trim().split(':').collect();
        if octets.len() != 6 {
            return Err(AddressParseError(s.to_string()));
        }

        let mut raw = 0u64;
        for octet in octets {
            if octet.len() != 2 {
                return Err(AddressParseError(s.to_string()));
            }
            let value =
                u8::from_str_radix(octet, 16).map_err(|_| AddressParseError(s.to_string()))?;
            raw = (raw << 8) | value as u64;
        }
        Ok(Self(raw))
    }
}

/// Status code attached to every GATT operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Success,
    Unreachable,
    ProtocolError,
    AccessDenied,
}

impl GattStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Value written to a characteristic's client configuration descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CccdValue {
    None,
    Notify,
}

/// Lifecycle of one notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    ServicesDiscovered,
    CharacteristicMatched,
    NotifyEnabled,
    Streaming,
    NotifyDisabled,
    Done,
    Failed,
}

/// Counters collected over one streaming session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_received: u64,
    pub frames_decoded: u64,
    pub malformed_frames: u64,
    pub pointer_moves: u64,
    pub double_clicks: u64,
    pub injection_failures: u64,
}
