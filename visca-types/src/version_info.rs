//! Camera version information

use std::fmt;

/// Snapshot of a version inquiry reply
///
/// Read-only and never persisted; a fresh inquiry produces a fresh value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// Vendor identifier
    pub vendor_id: u16,

    /// Model identifier
    pub model_id: u16,

    /// ROM revision
    pub rom_revision: u16,

    /// Highest command socket the device supports
    pub max_socket: u8,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Camera[vendor: 0x{:04X}, model: 0x{:04X}, rom: 0x{:04X}, sockets: {}]",
            self.vendor_id, self.model_id, self.rom_revision, self.max_socket
        )
    }
}
