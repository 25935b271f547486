//! Error types for control-socket operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to the compositor's control socket
///
/// Application-level failures (for example an unknown pid) are not errors:
/// they arrive as the `error` field of an otherwise valid [`Reply`](crate::Reply).
#[derive(Debug, Error)]
pub enum ControlError {
    /// The endpoint can never be connected to as given
    #[error("Invalid control socket path {path:?}: {reason}")]
    InvalidEndpoint { path: PathBuf, reason: &'static str },

    /// Connecting failed for a reason retrying will not fix
    #[error("Failed to connect to control socket at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured attempt limit ran out while the compositor was unavailable
    #[error("Failed to connect to control socket at {path} after {attempts} attempts")]
    MaxRetriesExceeded { path: PathBuf, attempts: u32 },

    /// The connection was closed (or never opened) before this call
    #[error("Not connected to the compositor")]
    NotConnected,

    /// Failed to write a request frame
    #[error("Failed to send request to compositor: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Failed to read from the socket
    #[error("Failed to receive reply from compositor: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Failed to serialize a command to JSON
    #[error("Failed to serialize command: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// The bytes before a delimiter were not valid JSON for the expected shape
    #[error("Failed to deserialize reply: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// The compositor closed the stream while a reply was outstanding
    #[error("Connection to compositor closed ({residual} unframed bytes discarded)")]
    ConnectionClosed { residual: usize },

    /// A reply field was missing or had the wrong shape for a typed accessor
    #[error("Unexpected reply field `{field}`: {reason}")]
    UnexpectedReply { field: &'static str, reason: String },

    /// An earlier request was dropped before its reply arrived, so the next
    /// reply on this connection could belong to it
    #[error("Previous request was abandoned before its reply; reconnect required")]
    Desynchronized,
}

impl ControlError {
    /// Whether the underlying link is gone and the caller must reconnect
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ControlError::NotConnected
                | ControlError::SendFailed(_)
                | ControlError::ReceiveFailed(_)
                | ControlError::ConnectionClosed { .. }
                | ControlError::Desynchronized
        )
    }
}
