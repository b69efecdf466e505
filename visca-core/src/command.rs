//! VISCA command construction
//!
//! A command is an immutable byte sequence built by a per-operation
//! factory and never modified afterwards.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::constants::{
    ADDRESS_MASK, HEADER_BASE, MESSAGE_COMMAND, MESSAGE_INQUIRY, TERMINATOR, categories,
};

/// VISCA command message
///
/// # Wire format
///
/// ```text
/// ┌──────────────┬──────────────┬──────────┬─────────┬──────────┬──────┐
/// │ 0x80|address │ 0x01 / 0x09  │ category │ command │ params.. │ 0xFF │
/// │    1 byte    │    1 byte    │  1 byte  │ 1 byte  │ N bytes  │  1B  │
/// └──────────────┴──────────────┴──────────┴─────────┴──────────┴──────┘
/// ```
///
/// The second byte is `0x01` for commands and `0x09` for inquiries.
/// 16-bit positions travel as four nibble bytes, most-significant
/// nibble first, each in the low 4 bits of its own byte.
///
/// # Examples
///
/// ```
/// use visca_core::Command;
///
/// let cmd = Command::power_on(1);
/// assert_eq!(cmd.as_bytes(), &[0x81, 0x01, 0x04, 0x00, 0x02, 0xFF]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    packet: Bytes,
}

impl Command {
    fn command(address: u8, category: u8, command: u8, params: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(4 + params.len() + 1);

        buf.put_u8(HEADER_BASE | (address & ADDRESS_MASK));
        buf.put_u8(MESSAGE_COMMAND);
        buf.put_u8(category);
        buf.put_u8(command);
        buf.put_slice(params);
        buf.put_u8(TERMINATOR);

        Self {
            packet: buf.freeze(),
        }
    }

    fn inquiry(address: u8, category: u8, command: u8) -> Self {
        let mut buf = BytesMut::with_capacity(5);

        buf.put_u8(HEADER_BASE | (address & ADDRESS_MASK));
        buf.put_u8(MESSAGE_INQUIRY);
        buf.put_u8(category);
        buf.put_u8(command);
        buf.put_u8(TERMINATOR);

        Self {
            packet: buf.freeze(),
        }
    }

    /// Split a 16-bit position into four nibble bytes, MSB nibble first
    fn position_nibbles(position: u16) -> [u8; 4] {
        [
            ((position >> 12) & 0x0F) as u8,
            ((position >> 8) & 0x0F) as u8,
            ((position >> 4) & 0x0F) as u8,
            (position & 0x0F) as u8,
        ]
    }

    // Power

    pub fn power_on(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x00, &[0x02])
    }

    pub fn power_off(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x00, &[0x03])
    }

    pub fn power_inquiry(address: u8) -> Self {
        Self::inquiry(address, categories::CAMERA, 0x00)
    }

    /// Version inquiry: vendor, model and ROM revision
    pub fn version_inquiry(address: u8) -> Self {
        Self::inquiry(address, categories::INTERFACE, 0x02)
    }

    // Zoom

    pub fn zoom_stop(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x07, &[0x00])
    }

    pub fn zoom_tele_standard(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x07, &[0x02])
    }

    pub fn zoom_wide_standard(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x07, &[0x03])
    }

    /// Zoom in at a given speed (0 slowest, 7 fastest)
    pub fn zoom_tele_variable(address: u8, speed: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x07, &[0x20 | (speed & 0x07)])
    }

    /// Zoom out at a given speed (0 slowest, 7 fastest)
    pub fn zoom_wide_variable(address: u8, speed: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x07, &[0x30 | (speed & 0x07)])
    }

    /// Move zoom directly to an absolute position
    pub fn zoom_direct(address: u8, position: u16) -> Self {
        Self::command(
            address,
            categories::CAMERA,
            0x47,
            &Self::position_nibbles(position),
        )
    }

    pub fn zoom_position_inquiry(address: u8) -> Self {
        Self::inquiry(address, categories::CAMERA, 0x47)
    }

    // Focus

    pub fn focus_stop(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x08, &[0x00])
    }

    pub fn focus_far_standard(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x08, &[0x02])
    }

    pub fn focus_near_standard(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x08, &[0x03])
    }

    pub fn focus_far_variable(address: u8, speed: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x08, &[0x20 | (speed & 0x07)])
    }

    pub fn focus_near_variable(address: u8, speed: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x08, &[0x30 | (speed & 0x07)])
    }

    /// Move focus directly to an absolute position
    pub fn focus_direct(address: u8, position: u16) -> Self {
        Self::command(
            address,
            categories::CAMERA,
            0x48,
            &Self::position_nibbles(position),
        )
    }

    pub fn focus_auto(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x38, &[0x02])
    }

    pub fn focus_manual(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x38, &[0x03])
    }

    /// One-push autofocus trigger
    pub fn focus_one_push_trigger(address: u8) -> Self {
        Self::command(address, categories::CAMERA, 0x18, &[0x01])
    }

    pub fn focus_position_inquiry(address: u8) -> Self {
        Self::inquiry(address, categories::CAMERA, 0x48)
    }

    // Accessors

    /// Raw message bytes, ready for the transport
    pub fn as_bytes(&self) -> &[u8] {
        &self.packet
    }

    pub fn len(&self) -> usize {
        self.packet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packet.is_empty()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({})", hex::encode_upper(&self.packet))
    }
}
