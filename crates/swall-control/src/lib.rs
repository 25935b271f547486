//! Control-socket client for the swall compositor
//!
//! The compositor accepts commands on a local Unix socket
//! (`/tmp/swall/control-0` by default). This crate handles connecting to it,
//! framing requests and replies, and exposing each command as a typed call.
//!
//! ## Architecture
//!
//! - `FrameCodec`: pure encode/decode of delimiter-terminated JSON frames
//! - `Connection`: socket lifecycle, retry on connect, residual buffering
//! - `CommandClient`: one method per compositor command
//! - `ControlError`: error type for all of the above
//!
//! ## Protocol
//!
//! Every message is a UTF-8 JSON document followed by the ASCII record
//! separator `0x1E`. The client sends one command and reads exactly one
//! reply before sending the next; there are no request ids.
//!
//! ```text
//! -> "List"\x1e
//! <- {"success":true,"process_ids":[[4000,{"executable":"foot",...}]],"error":null}\x1e
//! ```

mod client;
mod codec;
mod connection;
mod error;
mod types;

#[cfg(test)]
mod test_support;

pub use client::CommandClient;
pub use codec::{FrameCodec, FRAME_DELIMITER};
pub use connection::{
    classify_connect_error, Connection, ConnectionState, FailureClass, RetryPolicy,
    DEFAULT_CHUNK_SIZE, DEFAULT_RETRY_INTERVAL, DEFAULT_SOCKET_PATH,
};
pub use error::ControlError;
pub use types::{AppConfig, Command, Rect, Reply};
