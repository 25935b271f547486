//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!(
            "No configuration at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }
    parse_config(path)
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl depends on an older miette, so rebuild the span by hand
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "endpoint" => {
                let path = string_arg(node, "endpoint")?;
                if path.is_empty() {
                    return Err(invalid("endpoint", "path must not be empty"));
                }
                config.endpoint = shellexpand::tilde(path).into_owned().into();
            }
            "log-level" => {
                config.log_level = string_arg(node, "log-level")?
                    .parse()
                    .map_err(|e| invalid("log-level", e))?;
            }
            "connect" => {
                config.connect = parse_connect(node)?;
            }
            "receive" => {
                config.receive = parse_receive(node)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn parse_connect(node: &kdl::KdlNode) -> Result<ConnectConfig, ConfigError> {
    let mut connect = ConnectConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "retry-interval-ms" => {
                    connect.retry_interval_ms = positive_arg(child, "retry-interval-ms")?;
                }
                "max-attempts" => {
                    let attempts = positive_arg(child, "max-attempts")?;
                    connect.max_attempts = Some(
                        u32::try_from(attempts)
                            .map_err(|_| invalid("max-attempts", "value is too large"))?,
                    );
                }
                name => {
                    tracing::warn!("Unknown connect option: {}", name);
                }
            }
        }
    }

    Ok(connect)
}

fn parse_receive(node: &kdl::KdlNode) -> Result<ReceiveConfig, ConfigError> {
    let mut receive = ReceiveConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "chunk-size" => {
                    let size = positive_arg(child, "chunk-size")?;
                    receive.chunk_size = usize::try_from(size)
                        .map_err(|_| invalid("chunk-size", "value is too large"))?;
                }
                name => {
                    tracing::warn!("Unknown receive option: {}", name);
                }
            }
        }
    }

    Ok(receive)
}

fn string_arg<'a>(node: &'a kdl::KdlNode, key: &str) -> Result<&'a str, ConfigError> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| invalid(key, "expected a string argument"))
}

fn positive_arg(node: &kdl::KdlNode, key: &str) -> Result<u64, ConfigError> {
    let value = node
        .entries()
        .first()
        .and_then(|e| e.value().as_i64())
        .ok_or_else(|| invalid(key, "expected an integer argument"))?;

    if value <= 0 {
        return Err(invalid(key, format!("must be greater than zero, got {}", value)));
    }

    Ok(value as u64)
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}
