//! Wire types for the compositor control protocol
//!
//! Commands are serialized with serde's externally tagged enum layout, which
//! is exactly what the compositor expects:
//!
//! - unit variants become bare strings: `"List"`, `"ScreenSize"`
//! - struct variants become single-key objects: `{"Kill":{"pid":42}}`
//!
//! Replies are kept as a generic JSON object because their shape varies per
//! command. [`Reply`] offers typed accessors for the fields callers need.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ControlError;

/// A rectangle on the compositor canvas, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Launch description of an application managed by the compositor
///
/// Sent inside `Spawn`, and echoed back in spawn replies and list entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Program to run (looked up on the compositor's `PATH`)
    pub executable: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Where the application's window is placed
    pub area: Rect,
}

/// A command sent to the compositor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Launch an application in the given area
    Spawn { config: AppConfig },
    /// Terminate a process started by the compositor
    Kill { pid: u32 },
    /// List processes started by the compositor
    List,
    /// Query the canvas dimensions
    ScreenSize,
    /// Reposition (and possibly resize) an application's window
    Move { pid: u32, rect: Rect },
}

impl Command {
    /// Short name used in log output
    pub fn name(&self) -> &'static str {
        match self {
            Command::Spawn { .. } => "Spawn",
            Command::Kill { .. } => "Kill",
            Command::List => "List",
            Command::ScreenSize => "ScreenSize",
            Command::Move { .. } => "Move",
        }
    }
}

/// A reply from the compositor
///
/// The client does not validate the reply shape. Fields are looked up on
/// demand; a missing or `null` field reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply(Map<String, Value>);

impl Reply {
    /// Application-level error message, if the compositor reported one
    ///
    /// A non-string `error` (object, number, bool) still counts as an error
    /// and is rendered as its JSON text.
    pub fn error(&self) -> Option<Cow<'_, str>> {
        match self.0.get("error")? {
            Value::Null => None,
            Value::String(message) => Some(Cow::Borrowed(message)),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// The `success` flag, if present
    pub fn success(&self) -> Option<bool> {
        self.0.get("success").and_then(Value::as_bool)
    }

    /// True when the reply has no error and does not claim failure
    pub fn is_success(&self) -> bool {
        self.error().is_none() && self.success() != Some(false)
    }

    /// Raw field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Process id from a spawn, move or kill reply
    pub fn pid(&self) -> Result<Option<u32>, ControlError> {
        self.typed_field("pid")
    }

    /// Launch configuration echoed by a spawn reply
    pub fn config(&self) -> Result<Option<AppConfig>, ControlError> {
        self.typed_field("config")
    }

    /// `(width, height)` from a screen size reply
    pub fn screen_size(&self) -> Result<Option<(u32, u32)>, ControlError> {
        let width: Option<u32> = self.typed_field("screen_width")?;
        let height: Option<u32> = self.typed_field("screen_height")?;
        Ok(width.zip(height))
    }

    /// `(pid, config)` pairs from a list reply, in compositor order
    pub fn process_ids(&self) -> Result<Option<Vec<(u32, AppConfig)>>, ControlError> {
        self.typed_field("process_ids")
    }

    fn typed_field<T>(&self, field: &'static str) -> Result<Option<T>, ControlError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.get(field) {
            None => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| ControlError::UnexpectedReply {
                    field,
                    reason: e.to_string(),
                }),
        }
    }
}

impl From<Map<String, Value>> for Reply {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
