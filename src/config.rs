use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot read configuration file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Error deserializing configuration")]
    Deserialize(#[from] toml::de::Error),

    #[error("Environment variable {var}='{value}' is not valid")]
    BadOverride { var: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub address: String,
    pub rpc_port: u16,
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            rpc_port: 50000,
            timeout_ms: 10_000,
        }
    }
}

impl ConnectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Sleep after every state change before reading it back
    pub settle_ms: u64,
    pub launch_timeout_ms: u64,

    pub save_directory: String,
    pub save_name: String,
    pub vessel: String,

    pub orbit_body: String,
    pub orbit_altitude_m: f64,

    /// Reference table to use instead of the built-in one
    pub reference_table: Option<PathBuf>,

    /// When both are set, save and craft files are copied into the game
    /// directory before being loaded.
    pub ksp_dir: Option<PathBuf>,
    pub fixtures_dir: Option<PathBuf>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            settle_ms: 100,
            launch_timeout_ms: 30_000,
            save_directory: "krpctest".to_string(),
            save_name: "krpctest".to_string(),
            vessel: "PartsRCS".to_string(),
            orbit_body: "Kerbin".to_string(),
            orbit_altitude_m: 250_000.0,
            reference_table: None,
            ksp_dir: None,
            fixtures_dir: None,
        }
    }
}

impl SuiteConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub suite: SuiteConfig,
}

impl Config {
    pub fn from_toml(toml: &str) -> Result<Self, Error> {
        Ok(toml::from_str(toml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let toml = fs::read_to_string(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
        Self::from_toml(&toml)
    }

    /// Applies `KRPC_ADDRESS`, `KRPC_RPC_PORT` and `KRPC_SETTLE_MS` from the
    /// process environment.
    pub fn with_env_overrides(self) -> Result<Self, Error> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        if let Some(address) = lookup("KRPC_ADDRESS") {
            self.connection.address = address;
        }

        if let Some(port) = lookup("KRPC_RPC_PORT") {
            self.connection.rpc_port = parse_override("KRPC_RPC_PORT", port)?;
        }

        if let Some(settle) = lookup("KRPC_SETTLE_MS") {
            self.suite.settle_ms = parse_override("KRPC_SETTLE_MS", settle)?;
        }

        Ok(self)
    }
}

fn parse_override<T: std::str::FromStr>(var: &str, value: String) -> Result<T, Error> {
    value.parse().map_err(|_| Error::BadOverride {
        var: var.to_string(),
        value,
    })
}
