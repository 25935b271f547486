//! Delimiter framing for the control protocol
//!
//! Each frame is one JSON document followed by a single ASCII record
//! separator (`0x1E`). JSON escapes every control character inside strings,
//! so a serialized payload never contains the delimiter itself.
//!
//! The codec does no I/O: callers feed it whatever bytes they have and get
//! back at most one decoded value plus the untouched remainder.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ControlError;

/// Byte terminating every frame on the wire
pub const FRAME_DELIMITER: u8 = 0x1e;

/// Stateless encoder/decoder for delimiter-terminated JSON frames
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Serialize `value` and append the frame delimiter
    ///
    /// # Errors
    ///
    /// Returns `ControlError::SerializeFailed` if serde_json cannot
    /// represent the value (e.g. a map with non-string keys).
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ControlError> {
        let mut frame = serde_json::to_vec(value).map_err(ControlError::SerializeFailed)?;
        debug_assert!(!frame.contains(&FRAME_DELIMITER));
        frame.push(FRAME_DELIMITER);
        Ok(frame)
    }

    /// Decode the first complete frame in `buffer`
    ///
    /// Returns `(Some(value), rest)` when a delimiter is present, where `rest`
    /// is everything after that delimiter. Without a delimiter (including an
    /// empty buffer) returns `(None, buffer)`: more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DeserializeFailed` if the bytes before the
    /// delimiter are not valid JSON for `T`. An empty frame is never valid.
    pub fn decode_next<T: DeserializeOwned>(
        buffer: &[u8],
    ) -> Result<(Option<T>, &[u8]), ControlError> {
        let Some(end) = buffer.iter().position(|&b| b == FRAME_DELIMITER) else {
            return Ok((None, buffer));
        };

        let value = Self::decode_frame(&buffer[..end])?;
        Ok((Some(value), &buffer[end + 1..]))
    }

    /// Decode one frame payload with the delimiter already stripped
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DeserializeFailed` if `payload` is not valid
    /// JSON for `T`.
    pub fn decode_frame<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ControlError> {
        serde_json::from_slice(payload).map_err(ControlError::DeserializeFailed)
    }
}
