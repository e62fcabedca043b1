//! # Application configuration (`simvisor.toml`).
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration. See [`AppConfig::load`] for the lookup order.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 5000
//! static_dir = "public"
//!
//! [simulation]
//! executable = "./drone_scheduler"
//! args = []
//! mode = "auto"            # auto | supervised | degraded
//!
//! [stream]
//! keep_alive_secs = 15
//! log_child_output = true
//!
//! [shutdown]
//! grace_secs = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::{Config, DEFAULT_PROGRAM};
use crate::error::ConfigError;
use crate::gateway::GatewayOptions;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "simvisor.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub simulation: SimulationConfig,
    pub stream: StreamConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// UI assets; served for every path the API does not claim.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: Some(PathBuf::from("public")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub executable: PathBuf,
    /// Leading arguments, placed before the protocol arguments.
    pub args: Vec<String>,
    pub mode: Mode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_PROGRAM),
            args: Vec::new(),
            mode: Mode::Auto,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub keep_alive_secs: u64,
    pub log_child_output: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: 15,
            log_child_output: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    pub grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}

/// Which gateway is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Supervised if the executable exists, degraded otherwise.
    #[default]
    Auto,
    /// Always supervise; a missing executable surfaces as a failed start.
    Supervised,
    /// Never spawn; control endpoints answer 501.
    Degraded,
}

impl AppConfig {
    /// Loads the configuration.
    ///
    /// - `Some(path)`: the file must exist and parse.
    /// - `None`: `./simvisor.toml` if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::from_file(local)
                } else {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(cfg)
    }

    /// `auto` resolved against the filesystem.
    pub fn resolve_mode(&self) -> Mode {
        match self.simulation.mode {
            Mode::Auto if self.simulation.executable.exists() => Mode::Supervised,
            Mode::Auto => {
                tracing::warn!(
                    executable = %self.simulation.executable.display(),
                    "simulation executable not found, serving degraded gateway"
                );
                Mode::Degraded
            }
            mode => mode,
        }
    }

    /// Settings of the process supervisor.
    pub fn supervisor(&self) -> Config {
        Config {
            program: self.simulation.executable.clone(),
            program_args: self.simulation.args.clone(),
            grace: Duration::from_secs(self.shutdown.grace_secs),
            log_child_output: self.stream.log_child_output,
        }
    }

    /// Settings of the HTTP gateway.
    pub fn gateway(&self) -> GatewayOptions {
        GatewayOptions {
            keep_alive: Duration::from_secs(self.stream.keep_alive_secs.max(1)),
            static_dir: self.server.static_dir.clone(),
        }
    }

    /// `bind:port` to listen on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
