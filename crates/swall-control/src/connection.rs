//! Control socket connection management
//!
//! A [`Connection`] owns the Unix stream to the compositor and the residual
//! buffer of bytes that have been read but not yet framed. Its lifecycle is
//! explicit:
//!
//! ```text
//! Disconnected --open()--> Connecting --ok--> Connected --close()/peer gone--> Closed
//!                              |  ^
//!                              |  | transient failure, sleep `interval`
//!                              |--+
//!                              |
//!                              +--permanent failure / attempts exhausted--> Failed
//! ```
//!
//! `Closed` and `Failed` are terminal; reconnecting means opening a new
//! `Connection` (see [`CommandClient::reconnect`](crate::CommandClient::reconnect)).

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use nix::errno::Errno;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::codec::{FrameCodec, FRAME_DELIMITER};
use crate::ControlError;

/// Well-known control socket of the first compositor instance
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/swall/control-0";

/// Delay between connection attempts while the compositor is not up
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum bytes requested from the socket per read
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// `sun_path` holds 108 bytes including the trailing NUL
const MAX_SOCKET_PATH_LEN: usize = 107;

/// Whether a failed connection attempt is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The compositor is probably not listening yet
    Transient,
    /// Retrying cannot help without a configuration change
    Permanent,
}

/// Default classification of `connect(2)` failures
///
/// A missing socket file or a refused connection means the compositor has
/// not started (or is restarting). Permission problems, a path component
/// that is not a directory, or a path that is not a socket are permanent.
pub fn classify_connect_error(err: &io::Error) -> FailureClass {
    if let Some(code) = err.raw_os_error() {
        return match Errno::from_raw(code) {
            Errno::ENOENT
            | Errno::ECONNREFUSED
            | Errno::EAGAIN
            | Errno::ETIMEDOUT
            | Errno::EINTR => FailureClass::Transient,
            _ => FailureClass::Permanent,
        };
    }

    match err.kind() {
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::TimedOut
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => FailureClass::Transient,
        _ => FailureClass::Permanent,
    }
}

/// How [`Connection::open`] waits for the compositor
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Fixed delay between attempts
    pub interval: Duration,
    /// Give up after this many attempts; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Decides which errors are retried
    pub classify: fn(&io::Error) -> FailureClass,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: None,
            classify: classify_connect_error,
        }
    }
}

impl RetryPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_classifier(mut self, classify: fn(&io::Error) -> FailureClass) -> Self {
        self.classify = classify;
        self
    }
}

/// Lifecycle state of a [`Connection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
    Failed,
}

/// A framed byte connection to the compositor's control socket
///
/// All I/O methods take `&mut self`: the protocol carries no request ids, so
/// only one request may be in flight per connection.
#[derive(Debug)]
pub struct Connection {
    stream: Option<UnixStream>,
    endpoint: PathBuf,
    residual: BytesMut,
    /// Prefix of `residual` already known to hold no delimiter
    scanned: usize,
    chunk_size: usize,
    state: ConnectionState,
}

impl Connection {
    /// Create a disconnected connection for `endpoint`
    pub fn new(endpoint: impl Into<PathBuf>) -> Self {
        Self {
            stream: None,
            endpoint: endpoint.into(),
            residual: BytesMut::new(),
            scanned: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            state: ConnectionState::Disconnected,
        }
    }

    /// Wrap a stream that is already connected
    pub fn from_stream(stream: UnixStream, endpoint: impl Into<PathBuf>) -> Self {
        Self {
            stream: Some(stream),
            state: ConnectionState::Connected,
            ..Self::new(endpoint)
        }
    }

    /// Set the read chunk size (values below 1 are raised to 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Create and open a connection in one step
    ///
    /// # Errors
    ///
    /// See [`Connection::open`].
    pub async fn connect(
        endpoint: impl Into<PathBuf>,
        policy: &RetryPolicy,
    ) -> Result<Self, ControlError> {
        let mut connection = Self::new(endpoint);
        connection.open(policy).await?;
        Ok(connection)
    }

    /// Connect to the endpoint, waiting for the compositor if necessary
    ///
    /// Transient failures are logged and retried every `policy.interval`
    /// until the connection succeeds or `policy.max_attempts` runs out.
    /// Opening an already connected connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidEndpoint` for an empty or over-long path.
    /// Returns `ControlError::ConnectionFailed` on a permanent failure.
    /// Returns `ControlError::MaxRetriesExceeded` if the attempt limit is hit.
    /// Returns `ControlError::NotConnected` if this connection was already
    /// closed or failed.
    pub async fn open(&mut self, policy: &RetryPolicy) -> Result<(), ControlError> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Closed | ConnectionState::Failed => {
                return Err(ControlError::NotConnected)
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }

        if let Err(e) = validate_endpoint(&self.endpoint) {
            self.state = ConnectionState::Failed;
            return Err(e);
        }

        self.state = ConnectionState::Connecting;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let error = match UnixStream::connect(&self.endpoint).await {
                Ok(stream) => {
                    info!(
                        path = %self.endpoint.display(),
                        attempt = attempt,
                        "Connected to compositor control socket"
                    );
                    self.stream = Some(stream);
                    self.residual.clear();
                    self.scanned = 0;
                    self.state = ConnectionState::Connected;
                    return Ok(());
                }
                Err(e) => e,
            };

            if (policy.classify)(&error) == FailureClass::Permanent {
                warn!(
                    path = %self.endpoint.display(),
                    error = %error,
                    "Control socket connection failed permanently"
                );
                self.state = ConnectionState::Failed;
                return Err(ControlError::ConnectionFailed {
                    path: self.endpoint.clone(),
                    source: error,
                });
            }

            if policy.max_attempts.is_some_and(|max| attempt >= max) {
                warn!(
                    path = %self.endpoint.display(),
                    attempts = attempt,
                    last_error = %error,
                    "Failed to connect to compositor after all retry attempts"
                );
                self.state = ConnectionState::Failed;
                return Err(ControlError::MaxRetriesExceeded {
                    path: self.endpoint.clone(),
                    attempts: attempt,
                });
            }

            warn!(
                path = %self.endpoint.display(),
                attempt = attempt,
                delay = ?policy.interval,
                error = %error,
                "Unable to connect to compositor, it may not be started. Retrying..."
            );
            sleep(policy.interval).await;
        }
    }

    /// Write `bytes` to the socket in full
    ///
    /// No retry is attempted. A write failure closes the connection.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::NotConnected` if the connection is not open.
    /// Returns `ControlError::SendFailed` if the write fails.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), ControlError> {
        let stream = self.stream.as_mut().ok_or(ControlError::NotConnected)?;

        let written = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = written {
            self.shutdown();
            return Err(ControlError::SendFailed(e));
        }

        trace!(bytes = bytes.len(), "Wrote to control socket");
        Ok(())
    }

    /// Read until one complete frame is available and decode it
    ///
    /// Frames already sitting in the residual buffer are returned without
    /// touching the socket. Bytes following the returned frame stay buffered
    /// for the next call.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ConnectionClosed` if the peer closes the stream
    /// before a frame completes.
    /// Returns `ControlError::ReceiveFailed` if the read fails.
    /// Returns `ControlError::DeserializeFailed` if the frame is not valid for
    /// `T`; the bad frame is discarded so the stream stays in sync.
    /// Returns `ControlError::NotConnected` if the connection is not open.
    pub async fn receive_frame<T: DeserializeOwned>(&mut self) -> Result<T, ControlError> {
        loop {
            let unscanned = &self.residual[self.scanned..];
            if let Some(offset) = unscanned.iter().position(|&b| b == FRAME_DELIMITER) {
                let end = self.scanned + offset;
                let frame = self.residual.split_to(end + 1);
                self.scanned = 0;

                if !self.residual.is_empty() {
                    trace!(
                        residual = self.residual.len(),
                        "Carrying over bytes of the next frame"
                    );
                }

                // The frame is already split off, so a bad payload is dropped
                return FrameCodec::decode_frame(&frame[..end]);
            }
            self.scanned = self.residual.len();

            let stream = self.stream.as_mut().ok_or(ControlError::NotConnected)?;
            self.residual.reserve(self.chunk_size);
            let read = match stream
                .read_buf(&mut (&mut self.residual).limit(self.chunk_size))
                .await
            {
                Ok(read) => read,
                Err(e) => {
                    self.shutdown();
                    return Err(ControlError::ReceiveFailed(e));
                }
            };

            if read == 0 {
                let residual = self.residual.len();
                debug!(residual = residual, "Compositor closed the control socket");
                self.shutdown();
                return Err(ControlError::ConnectionClosed { residual });
            }

            trace!(bytes = read, "Read from control socket");
        }
    }

    /// Release the socket; calling this more than once is harmless
    pub fn close(&mut self) {
        if self.stream.is_some() {
            debug!(path = %self.endpoint.display(), "Closing control socket");
        }
        self.shutdown();
    }

    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of buffered bytes belonging to a frame not yet complete
    pub fn residual_len(&self) -> usize {
        self.residual.len()
    }

    fn shutdown(&mut self) {
        self.stream = None;
        self.residual.clear();
        self.scanned = 0;
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Closed;
        }
    }
}

/// Reject endpoints no `connect(2)` call can succeed on
fn validate_endpoint(path: &Path) -> Result<(), ControlError> {
    let len = path.as_os_str().len();

    let reason = if len == 0 {
        "path is empty"
    } else if len > MAX_SOCKET_PATH_LEN {
        "path exceeds the Unix socket limit of 107 bytes"
    } else {
        return Ok(());
    };

    Err(ControlError::InvalidEndpoint {
        path: path.to_path_buf(),
        reason,
    })
}
