//! High-level camera controller
//!
//! The controller owns one transport and one background receive task.
//! The task copies each transport read into the frame queue as-is; the
//! execution path drains the queue and correlates replies to the
//! in-flight command through the acknowledge/completion handshake.
//!
//! One low-level read is treated as one frame. Over a stream transport
//! a read may carry a partial message or several coalesced ones; such
//! frames fail to parse and are discarded rather than reassembled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, trace, warn};

use visca_core::constants::{DEFAULT_ADDRESS, DEFAULT_RESPONSE_TIMEOUT_MS};
use visca_core::{Command, FrameQueue, Response};
use visca_transport::{Error as TransportError, Transport};
use visca_types::{PowerState, VersionInfo};

use crate::error::{Error, Result};

/// Granularity of the response wait loop; the worst-case latency added
/// on top of a reply's arrival is one interval
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Per-read transport timeout; bounds how long disconnect waits for the
/// receive task to observe the stop flag
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Idle delay while the transport is not open
const CLOSED_RETRY: Duration = Duration::from_millis(100);

/// Idle delay after a transient read error
const ERROR_RETRY: Duration = Duration::from_millis(10);

/// Which reply phase `wait_for` is scanning for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Acknowledge,
    Completion,
}

/// VISCA camera controller
///
/// Owns the transport exclusively and runs the two-phase
/// acknowledge/completion handshake for every executed command. The
/// protocol is strictly half-duplex: an internal send lock holds each
/// command fully resolved (or timed out) before the next one starts.
///
/// # Examples
///
/// ```no_run
/// use visca::{Command, Controller, NetworkMode, TcpTransport};
///
/// #[tokio::main]
/// async fn main() -> visca::Result<()> {
///     let transport = TcpTransport::new("192.168.1.100", 5678, NetworkMode::Client);
///     let controller = Controller::new(transport);
///
///     controller.connect().await?;
///     controller.execute(&Command::power_on(1)).await?;
///
///     let zoom = controller.zoom_position().await?;
///     println!("Zoom: {zoom}");
///
///     controller.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct Controller {
    transport: Arc<dyn Transport>,
    address: u8,
    timeout: Duration,
    queue: Arc<FrameQueue>,
    data_ready: Arc<Notify>,
    running: Arc<AtomicBool>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
    send_lock: tokio::sync::Mutex<()>,
}

impl Controller {
    /// Create a controller owning the given transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            address: DEFAULT_ADDRESS,
            timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            queue: Arc::new(FrameQueue::default()),
            data_ready: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            receive_task: Mutex::new(None),
            send_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Set the device address used by the inquiry helpers (0–7)
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Set the per-phase response timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn response_timeout(&self) -> Duration {
        self.timeout
    }

    /// Live connection status: the receive task is running and the
    /// transport still reports itself open
    pub fn is_connected(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.transport.is_open()
    }

    /// Open the transport and start the background receive task
    pub async fn connect(&self) -> Result<()> {
        self.transport.open().await?;

        self.queue.clear();
        self.running.store(true, Ordering::Release);

        let handle = tokio::spawn(receive_loop(
            Arc::clone(&self.transport),
            Arc::clone(&self.queue),
            Arc::clone(&self.data_ready),
            Arc::clone(&self.running),
        ));
        *self.receive_task.lock() = Some(handle);

        info!("Connected to camera at {}", self.transport.peer_addr());
        Ok(())
    }

    /// Stop the receive task, wait for it to finish, close the transport
    ///
    /// Safe to call repeatedly. Any in-flight `execute` observes the
    /// stop within one poll interval and fails with its phase timeout.
    pub async fn disconnect(&self) {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        self.data_ready.notify_waiters();

        let handle = self.receive_task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!("Receive task ended abnormally: {e}");
            }
        }

        self.transport.close().await;

        if was_running {
            info!("Disconnected from camera");
        }
    }

    /// Execute a command through the full acknowledge/completion handshake
    ///
    /// Each phase gets its own independently armed timeout window.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] before `connect` or after `disconnect`
    /// - [`Error::Transport`] when the send fails
    /// - [`Error::NoAcknowledge`] / [`Error::NoCompletion`] on timeout
    /// - [`Error::Device`] when the camera answers with an error reply
    pub async fn execute(&self, command: &Command) -> Result<Response> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let _sending = self.send_lock.lock().await;

        self.send_raw(command).await?;

        let ack = self.wait_for(Phase::Acknowledge).await?;
        trace!(socket = ack.socket_number(), "command acknowledged");

        let response = self.wait_for(Phase::Completion).await?;
        if response.is_error() {
            return Err(Error::Device(response));
        }

        Ok(response)
    }

    /// Fire a command without waiting for any reply
    ///
    /// Returns once the transport accepts the bytes; pair with
    /// [`Controller::poll_response`] to collect replies later.
    pub async fn send_async(&self, command: &Command) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let _sending = self.send_lock.lock().await;
        self.send_raw(command).await
    }

    /// Return the first parseable response of any kind
    ///
    /// Malformed frames are discarded. Fails with [`Error::NoResponse`]
    /// when `timeout` elapses without one.
    pub async fn poll_response(&self, timeout: Duration) -> Result<Response> {
        let deadline = Instant::now() + timeout;

        while self.running.load(Ordering::Acquire) {
            while let Some(frame) = self.queue.pop() {
                match Response::parse(&frame) {
                    Ok(response) => {
                        trace!(%response, "received");
                        return Ok(response);
                    }
                    Err(e) => trace!("discarding unparseable frame: {e}"),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let wait = POLL_INTERVAL.min(deadline - now);
            tokio::select! {
                _ = self.data_ready.notified() => {}
                _ = sleep(wait) => {}
            }
        }

        Err(Error::NoResponse { waited: timeout })
    }

    /// Current zoom position
    pub async fn zoom_position(&self) -> Result<u16> {
        let response = self
            .execute(&Command::zoom_position_inquiry(self.address))
            .await?;
        Ok(response.zoom_position())
    }

    /// Current focus position
    pub async fn focus_position(&self) -> Result<u16> {
        let response = self
            .execute(&Command::focus_position_inquiry(self.address))
            .await?;
        Ok(response.focus_position())
    }

    /// Current power state
    pub async fn power_state(&self) -> Result<PowerState> {
        let response = self
            .execute(&Command::power_inquiry(self.address))
            .await?;
        Ok(PowerState::from(response.power_status()))
    }

    /// Vendor, model and ROM revision
    pub async fn version_info(&self) -> Result<VersionInfo> {
        let response = self
            .execute(&Command::version_inquiry(self.address))
            .await?;

        let data = response.data();
        if data.len() < 8 {
            return Err(Error::InvalidResponse(format!(
                "version payload too short: {} bytes",
                data.len()
            )));
        }

        Ok(VersionInfo {
            vendor_id: u16::from(data[2]) << 8 | u16::from(data[3]),
            model_id: u16::from(data[4]) << 8 | u16::from(data[5]),
            rom_revision: u16::from(data[6]) << 8 | u16::from(data[7]),
            max_socket: if data.len() >= 9 { data[8] } else { 0 },
        })
    }

    async fn send_raw(&self, command: &Command) -> Result<()> {
        trace!(?command, "sending");
        self.transport.send(command.as_bytes()).await?;
        Ok(())
    }

    /// Poll until a response matching `phase` arrives or the configured
    /// timeout elapses; replies of any other kind are skipped as noise
    async fn wait_for(&self, phase: Phase) -> Result<Response> {
        let deadline = Instant::now() + self.timeout;

        while self.running.load(Ordering::Acquire) {
            if let Ok(response) = self.poll_response(POLL_INTERVAL).await {
                let matched = match phase {
                    Phase::Acknowledge => response.is_acknowledge(),
                    Phase::Completion => response.is_completion() || response.is_error(),
                };
                if matched {
                    return Ok(response);
                }
                trace!(%response, "ignoring out-of-phase response");
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        Err(match phase {
            Phase::Acknowledge => Error::NoAcknowledge {
                waited: self.timeout,
            },
            Phase::Completion => Error::NoCompletion {
                waited: self.timeout,
            },
        })
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::AcqRel) {
            warn!("Controller dropped while connected; aborting receive task");
            if let Some(handle) = self.receive_task.lock().take() {
                handle.abort();
            }
        }
    }
}

/// Background receive path: one bounded read per iteration, each
/// non-empty read pushed to the queue as one frame
///
/// The task never exits on its own while the running flag is set: a
/// transport that reports itself closed is idle-polled so a higher
/// layer may reopen it. Pushes into a full queue are dropped; the
/// producer must never stall on a slow consumer.
async fn receive_loop(
    transport: Arc<dyn Transport>,
    queue: Arc<FrameQueue>,
    data_ready: Arc<Notify>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        if !transport.is_open() {
            sleep(CLOSED_RETRY).await;
            continue;
        }

        match transport.receive(READ_TIMEOUT).await {
            Ok(frame) if !frame.is_empty() => {
                trace!(len = frame.len(), "received frame");
                if queue.push(frame.freeze()) {
                    data_ready.notify_one();
                } else {
                    warn!("Receive queue full, dropping frame");
                }
            }
            Ok(_) => sleep(ERROR_RETRY).await,
            Err(TransportError::ReadTimeout) => {}
            Err(e) => {
                debug!("Receive error: {e}");
                sleep(ERROR_RETRY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::BytesMut;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use visca_core::ResponseKind;
    use visca_transport::Result as TransportResult;

    const ACK: [u8; 3] = [0x90, 0x41, 0xFF];
    const COMPLETION: [u8; 3] = [0x90, 0x51, 0xFF];

    /// Scripted transport: each send releases the next staged batch of
    /// reply frames, which receive calls then return one at a time.
    #[derive(Clone)]
    struct MockTransport {
        inner: Arc<MockInner>,
    }

    struct MockInner {
        staged: Mutex<VecDeque<Vec<Vec<u8>>>>,
        pending: Mutex<VecDeque<Vec<u8>>>,
        sent: Mutex<Vec<Vec<u8>>>,
        open: AtomicBool,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                inner: Arc::new(MockInner {
                    staged: Mutex::new(VecDeque::new()),
                    pending: Mutex::new(VecDeque::new()),
                    sent: Mutex::new(Vec::new()),
                    open: AtomicBool::new(false),
                }),
            }
        }

        /// Queue reply frames to release on the next send
        fn stage_replies(&self, frames: &[&[u8]]) {
            self.inner
                .staged
                .lock()
                .push_back(frames.iter().map(|f| f.to_vec()).collect());
        }

        /// Make a frame receivable immediately, without a send
        fn inject(&self, frame: &[u8]) {
            self.inner.pending.lock().push_back(frame.to_vec());
        }

        fn sent_commands(&self) -> Vec<Vec<u8>> {
            self.inner.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self) -> TransportResult<()> {
            self.inner.open.store(true, Ordering::Release);
            Ok(())
        }

        async fn send(&self, data: &[u8]) -> TransportResult<()> {
            self.inner.sent.lock().push(data.to_vec());
            if let Some(batch) = self.inner.staged.lock().pop_front() {
                self.inner.pending.lock().extend(batch);
            }
            Ok(())
        }

        async fn receive(&self, read_timeout: Duration) -> TransportResult<BytesMut> {
            let frame = self.inner.pending.lock().pop_front();
            match frame {
                Some(frame) => Ok(BytesMut::from(frame.as_slice())),
                None => {
                    sleep(read_timeout).await;
                    Err(TransportError::ReadTimeout)
                }
            }
        }

        fn is_open(&self) -> bool {
            self.inner.open.load(Ordering::Acquire)
        }

        async fn close(&self) {
            self.inner.open.store(false, Ordering::Release);
        }

        fn peer_addr(&self) -> String {
            "mock".into()
        }
    }

    async fn connected(mock: &MockTransport) -> Arc<Controller> {
        let controller = Arc::new(Controller::new(mock.clone()));
        controller.connect().await.unwrap();
        controller
    }

    #[tokio::test]
    async fn test_execute_requires_connection() {
        let controller = Controller::new(MockTransport::new());
        let result = controller.execute(&Command::power_on(1)).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_ack_then_completion() {
        let mock = MockTransport::new();
        mock.stage_replies(&[&ACK, &COMPLETION]);

        let controller = connected(&mock).await;
        let response = controller.execute(&Command::power_on(1)).await.unwrap();

        assert_eq!(response.kind(), ResponseKind::Completion);
        assert_eq!(response.socket_number(), 1);
        assert_eq!(
            mock.sent_commands(),
            vec![vec![0x81, 0x01, 0x04, 0x00, 0x02, 0xFF]]
        );

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_surfaces_device_error() {
        let mock = MockTransport::new();
        mock.stage_replies(&[&ACK, &[0x90, 0x60, 0x41, 0xFF]]);

        let controller = connected(&mock).await;
        let result = controller.execute(&Command::zoom_stop(1)).await;

        match result {
            Err(Error::Device(response)) => {
                assert_eq!(response.error_code(), 0x41);
                assert_eq!(response.error_message(), "Command not executable");
            }
            other => panic!("expected device error, got {other:?}"),
        }

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_times_out_without_acknowledge() {
        let mock = MockTransport::new();

        let controller = connected(&mock).await;
        let start = Instant::now();
        let result = controller.execute(&Command::power_on(1)).await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(Error::NoAcknowledge { .. })));
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1100));

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_times_out_without_completion() {
        let mock = MockTransport::new();
        mock.stage_replies(&[&ACK]);

        let controller = connected(&mock).await;
        let result = controller.execute(&Command::power_on(1)).await;

        assert!(matches!(result, Err(Error::NoCompletion { .. })));

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_skips_noise_frames() {
        let mock = MockTransport::new();
        mock.stage_replies(&[
            &[0xDE, 0xAD],             // unparseable
            &[0x90, 0x30, 0xFF],       // unknown kind
            &ACK,
            &[0x90, 0x42, 0xFF],       // stray second acknowledge
            &COMPLETION,
        ]);

        let controller = connected(&mock).await;
        let response = controller.execute(&Command::power_on(1)).await.unwrap();

        assert_eq!(response.kind(), ResponseKind::Completion);

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_async_and_poll_response() {
        let mock = MockTransport::new();
        mock.stage_replies(&[&COMPLETION]);

        let controller = connected(&mock).await;
        controller
            .send_async(&Command::zoom_tele_variable(1, 3))
            .await
            .unwrap();

        let response = controller
            .poll_response(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.kind(), ResponseKind::Completion);

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_response_returns_any_kind() {
        let mock = MockTransport::new();
        mock.inject(&[0x90, 0x30, 0xFF]);

        let controller = connected(&mock).await;
        let response = controller
            .poll_response(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.kind(), ResponseKind::Unknown);

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_response_timeout() {
        let mock = MockTransport::new();

        let controller = connected(&mock).await;
        let result = controller.poll_response(Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::NoResponse { .. })));

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_unblocks_inflight_execute() {
        let mock = MockTransport::new();

        let controller = connected(&mock).await;
        let worker = Arc::clone(&controller);
        let start = Instant::now();
        let task =
            tokio::spawn(async move { worker.execute(&Command::power_on(1)).await });

        tokio::time::sleep(Duration::from_millis(500)).await;
        controller.disconnect().await;

        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::NoAcknowledge { .. })));

        // Well short of the 1000 ms acknowledge window
        assert!(start.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_position_helper() {
        let mock = MockTransport::new();
        mock.stage_replies(&[&ACK, &[0x90, 0x50, 0x0A, 0x0B, 0x0C, 0x0D, 0xFF]]);

        let controller = connected(&mock).await;
        assert_eq!(controller.zoom_position().await.unwrap(), 0xABCD);

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_power_state_helper() {
        let mock = MockTransport::new();
        mock.stage_replies(&[&ACK, &[0x90, 0x50, 0x02, 0xFF]]);

        let controller = connected(&mock).await;
        assert_eq!(controller.power_state().await.unwrap(), PowerState::On);

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_version_info_helper() {
        let mock = MockTransport::new();
        mock.stage_replies(&[
            &ACK,
            &[0x90, 0x50, 0x00, 0x20, 0x04, 0x47, 0x01, 0x23, 0x02, 0xFF],
        ]);

        let controller = connected(&mock).await;
        let info = controller.version_info().await.unwrap();

        assert_eq!(info.vendor_id, 0x0020);
        assert_eq!(info.model_id, 0x0447);
        assert_eq!(info.rom_revision, 0x0123);
        assert_eq!(info.max_socket, 2);

        controller.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_connected_tracks_transport() {
        let mock = MockTransport::new();

        let controller = connected(&mock).await;
        assert!(controller.is_connected());

        // A transport that silently drops is observable without notice
        mock.close().await;
        assert!(!controller.is_connected());

        controller.disconnect().await;
        controller.disconnect().await; // idempotent
        assert!(!controller.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_bounds_wait() {
        let mock = MockTransport::new();

        let controller = Arc::new(
            Controller::new(mock.clone()).with_timeout(Duration::from_millis(100)),
        );
        controller.connect().await.unwrap();

        let start = Instant::now();
        let result = controller.execute(&Command::power_on(1)).await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(Error::NoAcknowledge { .. })));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200));

        controller.disconnect().await;
    }
}
