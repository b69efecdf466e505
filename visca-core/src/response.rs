//! VISCA response parsing and classification

use bytes::Bytes;
use std::fmt;
use tracing::trace;

use crate::constants::{MIN_MESSAGE_SIZE, TERMINATOR, error_codes};
use crate::error::{Error, Result};

/// Response classification
///
/// `Unknown` is a valid, parseable response the protocol engine cannot
/// classify (typically an inquiry payload); it is not a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// First-phase reply: the command was received
    Acknowledge,

    /// Second-phase reply: the command finished executing
    Completion,

    /// The device rejected or aborted the command
    Error,

    /// Valid frame with an unclassified message type
    Unknown,
}

/// One parsed device reply
///
/// # Wire format
///
/// ```text
/// ┌──────────────┬────────────────┬──────────┬──────┐
/// │ 0x90 / 0xA0  │ kind | socket  │ data..   │ 0xFF │
/// │ (high nibble)│ 0x4_/0x5_/0x6_ │ N bytes  │  1B  │
/// └──────────────┴────────────────┴──────────┴──────┘
/// ```
///
/// # Examples
///
/// ```
/// use visca_core::{Response, ResponseKind};
///
/// let response = Response::parse(&[0x90, 0x41, 0xFF]).unwrap();
/// assert_eq!(response.kind(), ResponseKind::Acknowledge);
/// assert_eq!(response.socket_number(), 1);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Response {
    kind: ResponseKind,
    socket: u8,
    error_code: u8,
    data: Bytes,
}

impl Response {
    /// Parse one received frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is shorter than 3 bytes, does not
    /// end with `0xFF`, or does not carry a reply header (`0x9_`/`0xA_`).
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_MESSAGE_SIZE {
            return Err(Error::FrameTooShort { actual: data.len() });
        }

        if data[data.len() - 1] != TERMINATOR {
            return Err(Error::MissingTerminator);
        }

        let header = data[0];
        if (header & 0xF0) != 0x90 && (header & 0xF0) != 0xA0 {
            return Err(Error::InvalidHeader { byte: header });
        }

        // Second byte: high nibble is the message type, low nibble the
        // socket number the device assigned to the command.
        let (kind, socket, error_code) = match data[1] & 0xF0 {
            0x40 => (ResponseKind::Acknowledge, data[1] & 0x0F, 0),
            0x50 => (ResponseKind::Completion, data[1] & 0x0F, 0),
            0x60 => {
                let code = if data.len() >= 4 { data[2] } else { 0 };
                (ResponseKind::Error, data[1] & 0x0F, code)
            }
            _ => (ResponseKind::Unknown, 0, 0),
        };

        trace!(?kind, socket, "parsed response frame");

        Ok(Self {
            kind,
            socket,
            error_code,
            data: Bytes::copy_from_slice(data),
        })
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn is_acknowledge(&self) -> bool {
        self.kind == ResponseKind::Acknowledge
    }

    pub fn is_completion(&self) -> bool {
        self.kind == ResponseKind::Completion
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }

    /// Device-assigned command slot (0–15)
    ///
    /// Meaningful for Acknowledge, Completion and Error replies only.
    pub fn socket_number(&self) -> u8 {
        self.socket
    }

    /// Device error code; 0 unless `kind` is [`ResponseKind::Error`]
    pub fn error_code(&self) -> u8 {
        self.error_code
    }

    /// Human-readable text for the device error code
    ///
    /// The table matches the device documentation and must stay stable
    /// for downstream diagnostics.
    pub fn error_message(&self) -> &'static str {
        match self.error_code {
            error_codes::MESSAGE_LENGTH => "Message length error",
            error_codes::SYNTAX => "Syntax error",
            error_codes::BUFFER_FULL => "Command buffer full",
            error_codes::CANCELLED => "Command cancelled",
            error_codes::NO_SOCKET => "No socket",
            error_codes::NOT_EXECUTABLE => "Command not executable",
            _ => "Unknown error",
        }
    }

    /// Raw frame bytes, terminator included
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Zoom position from a zoom-position inquiry reply
    ///
    /// Returns 0 when the payload is too short to carry a position;
    /// callers must treat that as "unavailable", not as a reading.
    pub fn zoom_position(&self) -> u16 {
        self.position_payload()
    }

    /// Focus position from a focus-position inquiry reply
    ///
    /// Same sentinel rule as [`Response::zoom_position`].
    pub fn focus_position(&self) -> u16 {
        self.position_payload()
    }

    fn position_payload(&self) -> u16 {
        if self.data.len() < 7 {
            return 0;
        }
        u16::from(self.data[2]) << 12
            | u16::from(self.data[3]) << 8
            | u16::from(self.data[4]) << 4
            | u16::from(self.data[5])
    }

    /// Power status byte from a power inquiry reply (0 when absent)
    pub fn power_status(&self) -> u8 {
        if self.data.len() < 4 {
            return 0;
        }
        self.data[2]
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("kind", &self.kind)
            .field("socket", &self.socket)
            .field("error_code", &format!("0x{:02X}", self.error_code))
            .field("data", &hex::encode_upper(&self.data))
            .finish()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response[{:?}](socket={}, len={})",
            self.kind,
            self.socket,
            self.data.len()
        )
    }
}
