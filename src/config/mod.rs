//! Configuration management
//!
//! Relay address, log level and the optional mining timer. Settings come from
//! built-in defaults, an optional TOML file and environment variables.

pub mod settings;

pub use settings::{Config, DEFAULT_RELAY_PORT};
