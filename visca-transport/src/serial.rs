//! Serial transport
//!
//! RS-232/RS-422 is the classic VISCA physical layer; cameras default
//! to 9600 baud, 8 data bits, no parity, one stop bit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::time::timeout;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, trace, warn};

use crate::{Transport, error::*};

/// Default VISCA baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial transport for VISCA cameras
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    reader: tokio::sync::Mutex<Option<ReadHalf<SerialStream>>>,
    writer: tokio::sync::Mutex<Option<WriteHalf<SerialStream>>>,
    open: AtomicBool,
}

impl SerialTransport {
    /// Create a new serial transport for a device path
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            reader: tokio::sync::Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let stream = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()?;

        debug!("Serial port opened: {} at {} baud", self.path, self.baud_rate);

        let (read_half, write_half) = tokio::io::split(stream);
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

        let mut buf = BytesMut::with_capacity(256);

        let n = timeout(read_timeout, reader.read_buf(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;

        if n == 0 {
            // EOF from a serial device usually means it detached
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

        if self.writer.lock().await.take().is_some() {
            debug!("Serial port closed: {}", self.path);
        }
        self.reader.lock().await.take();
    }

    fn peer_addr(&self) -> String {
        self.path.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial transport dropped while still open");
        }
    }
}
