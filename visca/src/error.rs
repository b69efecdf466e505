//! High-level error types

use std::time::Duration;

use visca_core::Response;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Core(#[from] visca_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] visca_transport::Error),

    #[error("Not connected to camera")]
    NotConnected,

    #[error("No acknowledge from camera within {waited:?}")]
    NoAcknowledge { waited: Duration },

    #[error("No completion from camera within {waited:?}")]
    NoCompletion { waited: Duration },

    #[error("No response from camera within {waited:?}")]
    NoResponse { waited: Duration },

    /// The camera rejected or aborted the command; the response carries
    /// the device error code and its text.
    #[error("Camera returned error 0x{:02X}: {}", .0.error_code(), .0.error_message())]
    Device(Response),

    #[error("Invalid response from camera: {0}")]
    InvalidResponse(String),
}
