//! Error types for visca-core

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame parse failures
///
/// These never reach library users directly: the controller discards
/// malformed frames and keeps polling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be a message
    #[error("Frame too short: need at least 3 bytes, got {actual}")]
    FrameTooShort { actual: usize },

    /// Frame does not end with the 0xFF terminator
    #[error("Frame missing 0xFF terminator")]
    MissingTerminator,

    /// Header byte is not a reply header
    #[error("Invalid response header: 0x{byte:02X}")]
    InvalidHeader { byte: u8 },
}
