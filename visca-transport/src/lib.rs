//! Transport layer for VISCA cameras
//!
//! Provides serial, TCP and UDP byte transports behind one capability
//! trait. Transports carry no protocol knowledge; framing and
//! correlation live above them.

pub mod error;
pub mod serial;
pub mod tcp;
pub mod udp;

pub use error::{Error, Result};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

use async_trait::async_trait;
use bytes::BytesMut;
use std::time::Duration;

/// Role of a network transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Actively connects to a remote address
    Client,

    /// Waits for a peer on a local port
    Server,
}

/// Transport trait for the different communication methods
///
/// Methods take `&self` so one task can sit in `receive` while another
/// calls `send`; each implementation synchronizes its own halves.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel; for server modes this waits for a peer
    async fn open(&self) -> Result<()>;

    /// Send raw bytes, all or nothing
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// One bounded read
    ///
    /// Returns whatever bytes one low-level read produced, with no
    /// message-boundary guarantee: a stream transport may deliver a
    /// fragment or several coalesced messages in a single call.
    /// `Err(ReadTimeout)` means no data arrived within `timeout`.
    async fn receive(&self, timeout: Duration) -> Result<BytesMut>;

    /// Live open/connected status
    ///
    /// A peer that silently drops the connection must become observable
    /// here without any explicit notification.
    fn is_open(&self) -> bool;

    /// Close the channel; safe to call repeatedly
    async fn close(&self);

    /// Remote endpoint label for diagnostics
    fn peer_addr(&self) -> String;
}
