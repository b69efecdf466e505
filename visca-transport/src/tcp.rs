//! TCP transport

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::{NetworkMode, Transport, error::*};

/// TCP transport for VISCA cameras
///
/// In [`NetworkMode::Client`] `open` connects to the configured
/// address. In [`NetworkMode::Server`] `open` binds the configured
/// port and waits for exactly one peer; the listener is dropped once a
/// connection is accepted.
pub struct TcpTransport {
    addr: String,
    port: u16,
    mode: NetworkMode,
    connect_timeout: Duration,
    peer: Mutex<Option<SocketAddr>>,
    reader: tokio::sync::Mutex<Option<OwnedReadHalf>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    open: AtomicBool,
}

impl TcpTransport {
    /// Create a new TCP transport
    pub fn new(addr: impl Into<String>, port: u16, mode: NetworkMode) -> Self {
        Self {
            addr: addr.into(),
            port,
            mode,
            connect_timeout: Duration::from_secs(5),
            peer: Mutex::new(None),
            reader: tokio::sync::Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }

    /// Set the connect/accept timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
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

    async fn establish(&self) -> Result<(TcpStream, SocketAddr)> {
        match self.mode {
            NetworkMode::Client => {
                let addr = self.resolve_addr().await?;

                debug!("Connecting to {}...", addr);

                let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
                    .await
                    .map_err(|_| Error::ConnectTimeout)?
                    .map_err(Error::Io)?;

                debug!("Connected to {}", addr);
                Ok((stream, addr))
            }
            NetworkMode::Server => {
                let listener = TcpListener::bind(("0.0.0.0", self.port))
                    .await
                    .map_err(Error::Io)?;

                debug!("Listening on port {}...", self.port);

                let (stream, peer) = timeout(self.connect_timeout, listener.accept())
                    .await
                    .map_err(|_| Error::ConnectTimeout)?
                    .map_err(Error::Io)?;

                debug!("Accepted connection from {}", peer);
                Ok((stream, peer))
            }
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let (stream, peer) = self.establish().await?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        *self.peer.lock() = Some(peer);
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        self.open.store(true, Ordering::Release);

        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotOpen)?;

        trace!(
            "Sending {} bytes: {:02X?}",
            data.len(),
            &data[..data.len().min(16)]
        );

        writer.write_all(data).await?;
        writer.flush().await?;

        Ok(())
    }

    async fn receive(&self, read_timeout: Duration) -> Result<BytesMut> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(Error::NotOpen)?;

        let mut buf = BytesMut::with_capacity(1024);

        let n = timeout(read_timeout, reader.read_buf(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;

        if n == 0 {
            // Stream EOF: the peer closed on us
            self.open.store(false, Ordering::Release);
            return Err(Error::ConnectionClosed);
        }

        trace!("Received {} bytes: {:02X?}", n, &buf[..n.min(16)]);

        Ok(buf)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.open.store(false, Ordering::Release);

        if let Some(mut writer) = self.writer.lock().await.take() {
            debug!("Disconnecting from {}...", self.peer_addr());

            // Graceful shutdown
            let _ = writer.shutdown().await;
        }

        self.reader.lock().await.take();
        self.peer.lock().take();
    }

    fn peer_addr(&self) -> String {
        (*self.peer.lock())
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("TCP transport dropped while still open");
        }
    }
}
