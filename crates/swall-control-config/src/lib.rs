//! Configuration parsing for the swall control client
//!
//! This crate reads the client's KDL configuration file: which control
//! socket to talk to, how to wait for the compositor, and read sizing.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{load_config, parse_config, parse_config_str};
