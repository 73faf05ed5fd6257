//! Server configuration.
//!
//! Loaded from an optional TOML file at startup. Every field has a
//! default, so the server runs without any configuration file. The
//! binary layers `CHATMSN_PORT` and CLI flags on top.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use chatmsn_protocol::DEFAULT_BANNER;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 22230;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "CHATMSN_PORT";

/// Default bound on a single write to a session (10 seconds).
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Complete server configuration.
///
/// ```toml
/// bind_address = "127.0.0.1"
/// port = 22230
/// write_timeout_ms = 5000
/// banner = ["Bem-vindo!", ""]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_address: String,

    /// TCP port (0 picks an ephemeral port)
    pub port: u16,

    /// Lines sent to each connection before the name prompt
    pub banner: Vec<String>,

    /// Bound on each write to a session, in milliseconds
    pub write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            banner: DEFAULT_BANNER.iter().map(|line| line.to_string()).collect(),
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from a TOML file.
    ///
    /// Returns the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).map_err(|e| match e {
                ConfigError::Parse { reason, .. } => ConfigError::Parse {
                    path: Some(path.to_path_buf()),
                    reason,
                },
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "Config file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                error: e.to_string(),
            }),
        }
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: None,
            reason: e.to_string(),
        })
    }

    /// Per-user config file location (`<config_dir>/chatmsn/server.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chatmsn").join("server.toml"))
    }

    /// Applies environment overrides using the given lookup.
    ///
    /// The binary passes `|key| std::env::var(key).ok()`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(PORT_ENV) {
            let parsed = value.trim().parse::<u16>();
            self.port = parsed.map_err(|_| ConfigError::InvalidEnv {
                name: PORT_ENV,
                value,
            })?;
        }
        Ok(self)
    }

    /// `host:port` string to bind.
    pub fn listen_address(&self) -> String {
        match self.bind_address.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.bind_address, self.port),
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Errors loading the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Invalid config{}: {reason}", describe_path(.path))]
    Parse {
        path: Option<PathBuf>,
        reason: String,
    },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}
