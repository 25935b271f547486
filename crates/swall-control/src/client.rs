//! Typed command client
//!
//! [`CommandClient`] turns each compositor capability into one request/reply
//! round trip over a [`Connection`].

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::codec::FrameCodec;
use crate::connection::{Connection, RetryPolicy};
use crate::types::{AppConfig, Command, Rect, Reply};
use crate::ControlError;

/// Client for the compositor control socket
///
/// Each method sends exactly one command and waits for exactly one reply.
/// Replies are matched to requests purely by order, so methods take
/// `&mut self`; share a client between tasks only behind a mutex.
/// Dropping a request future before its reply arrives (for example under
/// `tokio::time::timeout`) poisons the connection: the next request fails
/// with `ControlError::Desynchronized` and closes it, and
/// [`reconnect`](Self::reconnect) restores a usable client.
///
/// Errors reported by the compositor (unknown pid, failed spawn) are not
/// `Err` values: check [`Reply::error`] on the returned reply.
///
/// # Example
///
/// ```ignore
/// let mut client = CommandClient::connect("/tmp/swall/control-0", RetryPolicy::default()).await?;
/// let reply = client.spawn(0, 0, 800, 600, "weston-terminal", Vec::<String>::new()).await?;
/// match reply.error() {
///     Some(error) => eprintln!("spawn failed: {error}"),
///     None => println!("spawned pid {:?}", reply.pid()?),
/// }
/// ```
#[derive(Debug)]
pub struct CommandClient {
    connection: Connection,
    policy: RetryPolicy,
    /// Set while a request's reply is still owed by the compositor
    in_flight: bool,
}

impl CommandClient {
    /// Wrap an open connection; [`reconnect`](Self::reconnect) uses the default policy
    pub fn new(connection: Connection) -> Self {
        Self::with_policy(connection, RetryPolicy::default())
    }

    pub fn with_policy(connection: Connection, policy: RetryPolicy) -> Self {
        Self {
            connection,
            policy,
            in_flight: false,
        }
    }

    /// Connect to `endpoint`, waiting for the compositor according to `policy`
    ///
    /// # Errors
    ///
    /// See [`Connection::open`].
    pub async fn connect(
        endpoint: impl Into<PathBuf>,
        policy: RetryPolicy,
    ) -> Result<Self, ControlError> {
        let connection = Connection::connect(endpoint, &policy).await?;
        Ok(Self::with_policy(connection, policy))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn into_connection(self) -> Connection {
        self.connection
    }

    /// Send one command and wait for its reply
    ///
    /// # Errors
    ///
    /// Returns `ControlError::SerializeFailed` if the command cannot be encoded,
    /// a transport error if the socket fails, or
    /// `ControlError::DeserializeFailed` if the reply is not a JSON object.
    /// Returns `ControlError::Desynchronized` if a previous request was
    /// cancelled mid-flight; the connection is closed in that case.
    pub async fn request(&mut self, command: &Command) -> Result<Reply, ControlError> {
        if self.in_flight {
            warn!(
                command = command.name(),
                "Previous request never completed, closing connection"
            );
            self.connection.close();
            return Err(ControlError::Desynchronized);
        }

        let frame = FrameCodec::encode(command)?;
        debug!(
            command = command.name(),
            payload = %String::from_utf8_lossy(&frame[..frame.len() - 1]),
            "Sending command to compositor"
        );

        // Cleared only once the round trip finishes, whatever its outcome
        self.in_flight = true;
        let reply = self.round_trip(&frame).await;
        self.in_flight = false;
        let reply = reply?;

        match reply.error() {
            Some(error) => debug!(command = command.name(), error = %error, "Compositor rejected command"),
            None => debug!(command = command.name(), reply = ?reply, "Received reply"),
        }

        Ok(reply)
    }

    async fn round_trip(&mut self, frame: &[u8]) -> Result<Reply, ControlError> {
        self.connection.send(frame).await?;
        self.connection.receive_frame().await
    }

    /// Launch `executable` with `args` inside the given area
    ///
    /// The reply carries the new `pid` and echoes the launch `config`.
    pub async fn spawn<I, S>(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        executable: impl Into<String>,
        args: I,
    ) -> Result<Reply, ControlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = AppConfig {
            executable: executable.into(),
            args: args.into_iter().map(Into::into).collect(),
            area: Rect::new(x, y, width, height),
        };
        self.request(&Command::Spawn { config }).await
    }

    /// Terminate a process the compositor started
    pub async fn kill(&mut self, pid: u32) -> Result<Reply, ControlError> {
        self.request(&Command::Kill { pid }).await
    }

    /// List processes; see [`Reply::process_ids`]
    pub async fn list(&mut self) -> Result<Reply, ControlError> {
        self.request(&Command::List).await
    }

    /// Query the canvas size; see [`Reply::screen_size`]
    pub async fn screen_size(&mut self) -> Result<Reply, ControlError> {
        self.request(&Command::ScreenSize).await
    }

    /// Reposition a process's window
    ///
    /// Whether the window is also resized depends on the compositor.
    pub async fn move_window(
        &mut self,
        pid: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Reply, ControlError> {
        self.request(&Command::Move {
            pid,
            rect: Rect::new(x, y, width, height),
        })
        .await
    }

    /// Replace the connection with a fresh one to the same endpoint
    ///
    /// Buffered bytes from the old connection are discarded. Nothing calls
    /// this automatically after a transport error.
    ///
    /// # Errors
    ///
    /// See [`Connection::open`].
    pub async fn reconnect(&mut self) -> Result<(), ControlError> {
        self.connection.close();

        let mut connection = Connection::new(self.connection.endpoint())
            .with_chunk_size(self.connection.chunk_size());
        connection.open(&self.policy).await?;

        self.connection = connection;
        self.in_flight = false;
        Ok(())
    }

    /// Close the connection; calling this more than once is harmless
    pub fn close(&mut self) {
        self.connection.close();
    }
}
