//! Configuration for the `taskdeck` command-line client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdeck/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use taskdeck_proto::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use crate::api::ConnectOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// No bearer token from any layer.
    #[error("no API token configured (use --token, TASKDECK_TOKEN or [server] token)")]
    MissingToken,

    /// A page size outside `1..=MAX_PAGE_SIZE`.
    #[error("page size must be between 1 and {max}, got {got}")]
    PageSize {
        /// Configured value.
        got: u32,
        /// Upper bound.
        max: u32,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    client: ClientFileConfig,
    log: LogFileConfig,
}

/// `[server]` section: where to connect and how to authenticate.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    token: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ClientFileConfig {
    page_size: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct LogFileConfig {
    level: Option<String>,
    file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server WebSocket endpoint.
    pub server_url: String,
    /// Bearer token presented on connect.
    pub token: Option<String>,
    /// Rows per page when `list` is not given `--limit`.
    pub page_size: u32,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Log level filter (overridden by `RUST_LOG`).
    pub log_level: String,
    /// Log file; `None` means `$TMPDIR/taskdeck.log`.
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:5000/ws".to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if the resolved page size is out of range.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let page_size = cli
            .page_size
            .or(file.client.page_size)
            .unwrap_or(defaults.page_size);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::PageSize {
                got: page_size,
                max: MAX_PAGE_SIZE,
            });
        }

        Ok(Self {
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.server.url.clone())
                .unwrap_or(defaults.server_url),
            token: cli.token.clone().or_else(|| file.server.token.clone()),
            page_size,
            connect_timeout: file
                .server
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            request_timeout: file
                .server
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            log_level: cli
                .log_level
                .clone()
                .or_else(|| file.log.level.clone())
                .unwrap_or(defaults.log_level),
            log_file: cli.log_file.clone().or_else(|| file.log.file.clone()),
        })
    }

    /// The bearer token, required before connecting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] when no layer supplied one.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::MissingToken)
    }

    #[must_use]
    pub const fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

/// Connection and logging flags shared by every subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct CliArgs {
    /// WebSocket URL of the task server.
    #[arg(long = "url", env = "TASKDECK_URL", global = true)]
    pub server_url: Option<String>,

    /// Bearer token identifying you to the server.
    #[arg(long, env = "TASKDECK_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Path to config file (default: `~/.config/taskdeck/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Default rows per page.
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, env = "TASKDECK_LOG", global = true)]
    pub log_level: Option<String>,

    /// Path to log file (default: `$TMPDIR/taskdeck.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskdeck").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
