//! Camera power state

use std::fmt;

/// Power state reported by a power inquiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,

    /// Status byte outside the documented on/off values
    Unknown(u8),
}

impl From<u8> for PowerState {
    fn from(status: u8) -> Self {
        match status {
            0x02 => Self::On,
            0x03 => Self::Off,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
            Self::Unknown(byte) => write!(f, "unknown (0x{byte:02X})"),
        }
    }
}
