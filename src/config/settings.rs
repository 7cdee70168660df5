use crate::error::{ChainError, Result};
use log::LevelFilter;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

static DEFAULT_RELAY_HOST: &str = "127.0.0.1";
pub const DEFAULT_RELAY_PORT: u16 = 8100;
static DEFAULT_LOG_LEVEL: &str = "info";

const CONFIG_PATH_KEY: &str = "PEERCHAIN_CONFIG";
const RELAY_HOST_KEY: &str = "RELAY_HOST";
const RELAY_PORT_KEY: &str = "RELAY_PORT";
const MINE_INTERVAL_KEY: &str = "MINE_INTERVAL";
const LOG_LEVEL_KEY: &str = "LOG_LEVEL";

/// Process settings, layered as defaults, then an optional TOML file, then
/// environment variables. The binary applies command-line flags last.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    relay_host: String,
    relay_port: u16,
    log_level: String,
    mine_interval_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        Config {
            relay_host: String::from(DEFAULT_RELAY_HOST),
            relay_port: DEFAULT_RELAY_PORT,
            log_level: String::from(DEFAULT_LOG_LEVEL),
            mine_interval_secs: None,
        }
    }

    /// Load from `path`, or from `$PEERCHAIN_CONFIG` when no path is given,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_PATH_KEY).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Config::from_file(&path)?,
            None => Config::new(),
        };
        config.apply_env_with(|key| env::var(key).ok())?;
        config.log_level_filter()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ChainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Config::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Config> {
        Ok(toml::from_str(raw)?)
    }

    /// Override fields from environment-style lookups. Unset keys are left alone.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(RELAY_HOST_KEY) {
            self.relay_host = host;
        }
        if let Some(port) = lookup(RELAY_PORT_KEY) {
            self.relay_port = parse_key(RELAY_PORT_KEY, &port)?;
        }
        if let Some(interval) = lookup(MINE_INTERVAL_KEY) {
            self.mine_interval_secs = Some(parse_key(MINE_INTERVAL_KEY, &interval)?);
        }
        if let Some(level) = lookup(LOG_LEVEL_KEY) {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn get_relay_host(&self) -> &str {
        self.relay_host.as_str()
    }

    pub fn get_relay_port(&self) -> u16 {
        self.relay_port
    }

    pub fn set_relay_port(&mut self, port: u16) {
        self.relay_port = port;
    }

    pub fn set_mine_interval_secs(&mut self, secs: u64) {
        self.mine_interval_secs = Some(secs);
    }

    /// Timer period for automatic mining; zero disables it
    pub fn get_mine_interval(&self) -> Option<Duration> {
        self.mine_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// `host:port` of the relay, used both to listen and to connect
    pub fn get_relay_addr(&self) -> String {
        format!("{}:{}", self.relay_host, self.relay_port)
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ChainError::Config(format!("Unknown log level: {}", self.log_level)))
    }
}

fn parse_key<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ChainError::Config(format!("Invalid {key} '{value}': {e}")))
}
