//! Configuration data model

use std::path::PathBuf;

/// Control socket of the first compositor instance
pub const DEFAULT_ENDPOINT: &str = "/tmp/swall/control-0";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the compositor's control socket
    pub endpoint: PathBuf,
    pub log_level: LogLevel,
    pub connect: ConnectConfig,
    pub receive: ReceiveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: PathBuf::from(DEFAULT_ENDPOINT),
            log_level: LogLevel::default(),
            connect: ConnectConfig::default(),
            receive: ReceiveConfig::default(),
        }
    }
}

/// How long to wait for a compositor that is not accepting connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Fixed delay between connection attempts
    pub retry_interval_ms: u64,
    /// Stop after this many attempts; `None` waits forever
    pub max_attempts: Option<u32>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 30_000,
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveConfig {
    /// Bytes requested per socket read
    pub chunk_size: usize,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self { chunk_size: 1024 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive usable with `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}
