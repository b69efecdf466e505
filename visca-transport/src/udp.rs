//! UDP transport for VISCA cameras
//!
//! Datagram boundaries line up with protocol messages, so UDP avoids
//! the fragmentation caveats of the stream transports.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{NetworkMode, Transport, error::*};

/// UDP transport for VISCA cameras
///
/// In [`NetworkMode::Client`] the socket is bound to an ephemeral port
/// and connected to the configured peer. In [`NetworkMode::Server`] the
/// socket is bound to the configured port, and **replies go to whichever
/// peer sent the most recent datagram**: each received datagram
/// retargets subsequent sends. A second station talking to the same
/// port silently steals the reply path, so server mode is only suitable
/// for single-controller setups.
pub struct UdpTransport {
    addr: String,
    port: u16,
    mode: NetworkMode,
    socket: RwLock<Option<Arc<UdpSocket>>>,
    peer: Mutex<Option<SocketAddr>>,
}

impl UdpTransport {
    /// Create a new UDP transport
    pub fn new(addr: impl Into<String>, port: u16, mode: NetworkMode) -> Self {
        Self {
            addr: addr.into(),
            port,
            mode,
            socket: RwLock::new(None),
            peer: Mutex::new(None),
        }
    }

    /// Resolve the configured address
    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        addrs
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))
    }

    fn current_socket(&self) -> Result<Arc<UdpSocket>> {
        self.socket.read().clone().ok_or(Error::NotOpen)
    }

    /// Locally bound address, available once open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .read()
            .as_ref()
            .and_then(|socket| socket.local_addr().ok())
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn open(&self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let remote = self.resolve_addr().await?;

        let socket = match self.mode {
            NetworkMode::Client => {
                debug!("Connecting to {} via UDP...", remote);

                // Bind to any available local port
                let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(Error::Io)?;

                // Set the default send/recv target
                socket.connect(remote).await.map_err(Error::Io)?;

                debug!("Connected to {} via UDP", remote);
                socket
            }
            NetworkMode::Server => {
                let socket = UdpSocket::bind(("0.0.0.0", self.port))
                    .await
                    .map_err(Error::Io)?;

                debug!("UDP socket bound on port {}", self.port);
                socket
            }
        };

        // The configured peer is the initial reply target; in server
        // mode the first received datagram replaces it.
        *self.peer.lock() = Some(remote);
        *self.socket.write() = Some(Arc::new(socket));

        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<()> {
        let socket = self.current_socket()?;

        trace!(
            "Sending {} bytes via UDP: {:02X?}",
            data.len(),
            &data[..data.len().min(32)]
        );

        let sent = match self.mode {
            NetworkMode::Client => socket.send(data).await.map_err(Error::Io)?,
            NetworkMode::Server => {
                let peer = (*self.peer.lock()).ok_or(Error::NotOpen)?;
                socket.send_to(data, peer).await.map_err(Error::Io)?
            }
        };

        if sent != data.len() {
            return Err(Error::ShortWrite {
                written: sent,
                expected: data.len(),
            });
        }

        Ok(())
    }

    async fn receive(&self, read_timeout: Duration) -> Result<BytesMut> {
        let socket = self.current_socket()?;

        let mut buf = BytesMut::with_capacity(2048);
        buf.resize(2048, 0);

        let n = match self.mode {
            NetworkMode::Client => timeout(read_timeout, socket.recv(&mut buf))
                .await
                .map_err(|_| Error::ReadTimeout)?
                .map_err(Error::Io)?,
            NetworkMode::Server => {
                let (n, from) = timeout(read_timeout, socket.recv_from(&mut buf))
                    .await
                    .map_err(|_| Error::ReadTimeout)?
                    .map_err(Error::Io)?;

                // Replies now go to the last sender
                *self.peer.lock() = Some(from);
                n
            }
        };

        // Truncate to actual received size
        buf.truncate(n);

        trace!("Received {} bytes via UDP: {:02X?}", n, &buf[..n.min(32)]);

        Ok(buf)
    }

    fn is_open(&self) -> bool {
        self.socket.read().is_some()
    }

    async fn close(&self) {
        if self.socket.write().take().is_some() {
            debug!("UDP socket closed");
        }
        self.peer.lock().take();
    }

    fn peer_addr(&self) -> String {
        (*self.peer.lock())
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("UDP transport dropped while still open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn test_udp_transport_create() {
        let transport = UdpTransport::new("192.168.1.100", 5678, NetworkMode::Client);
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_udp_transport_invalid_address() {
        let transport = UdpTransport::new("invalid..address", 5678, NetworkMode::Client);

        let result = transport.open().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_udp_client_loopback() {
        // A raw socket stands in for the camera
        let camera = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let camera_addr = camera.local_addr().unwrap();

        let transport = UdpTransport::new("127.0.0.1", camera_addr.port(), NetworkMode::Client);
        transport.open().await.unwrap();
        assert!(transport.is_open());

        transport.send(&[0x81, 0x09, 0x00, 0x02, 0xFF]).await.unwrap();

        let mut buf = [0u8; 32];
        let (n, from) = camera.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x81, 0x09, 0x00, 0x02, 0xFF]);

        camera.send_to(&[0x90, 0x41, 0xFF], from).await.unwrap();
        let frame = transport.receive(Duration::from_secs(1)).await.unwrap();
        assert_eq!(&frame[..], &[0x90, 0x41, 0xFF]);

        transport.close().await;
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_udp_server_replies_to_last_sender() {
        let transport = UdpTransport::new("127.0.0.1", 0, NetworkMode::Server);
        transport.open().await.unwrap();

        let port = transport.local_addr().unwrap().port();
        let target = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);

        let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let second = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        first.send_to(&[0x01], target).await.unwrap();
        transport.receive(Duration::from_secs(1)).await.unwrap();

        second.send_to(&[0x02], target).await.unwrap();
        transport.receive(Duration::from_secs(1)).await.unwrap();

        // The most recent sender gets the reply
        transport.send(&[0x90, 0x51, 0xFF]).await.unwrap();

        let mut buf = [0u8; 32];
        let (n, _) = second.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x90, 0x51, 0xFF]);

        transport.close().await;
    }
}
