//! Configuration for the Taskdeck server.
//!
//! Layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdeck-server/config.toml`)
//! 4. Compiled defaults
//!
//! Bearer tokens only come from the file's `[auth.tokens]` table.

use std::collections::HashMap;
use std::path::PathBuf;

use taskdeck_proto::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Page size settings that cannot both hold.
    #[error("default_page_size {default} must be between 1 and max_page_size {max}")]
    PageSize { default: u32, max: u32 },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerSection,
    auth: AuthSection,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerSection {
    bind_addr: Option<String>,
    default_page_size: Option<u32>,
    max_page_size: Option<u32>,
}

/// `[auth]` section; `tokens` maps bearer token to owner.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthSection {
    tokens: HashMap<String, String>,
}

/// CLI arguments for the server binary.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskdeck task server")]
pub struct ServerCliArgs {
    /// Address to bind the server to.
    #[arg(short, long, env = "TASKDECK_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskdeck-server/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Page size used when a list request omits one.
    #[arg(long)]
    pub default_page_size: Option<u32>,

    /// Largest page size a caller may request.
    #[arg(long)]
    pub max_page_size: Option<u32>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKDECK_LOG")]
    pub log_level: String,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:5000`).
    pub bind_addr: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Log level filter string.
    pub log_level: String,
    /// Bearer token -> owner.
    pub tokens: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            log_level: "info".to_string(),
            tokens: HashMap::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or the page sizes are inconsistent.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, file)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &ServerCliArgs, file: ServerConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            default_page_size: cli
                .default_page_size
                .or(file.server.default_page_size)
                .unwrap_or(defaults.default_page_size),
            max_page_size: cli
                .max_page_size
                .or(file.server.max_page_size)
                .unwrap_or(defaults.max_page_size),
            log_level: cli.log_level.clone(),
            tokens: file.auth.tokens,
        };

        if config.default_page_size == 0 || config.default_page_size > config.max_page_size {
            return Err(ConfigError::PageSize {
                default: config.default_page_size,
                max: config.max_page_size,
            });
        }
        Ok(config)
    }
}

fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ServerConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ServerConfigFile::default());
        };
        config_dir.join("taskdeck-server").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_str(toml_str: &str, cli: &ServerCliArgs) -> Result<ServerConfig, ConfigError> {
        let file: ServerConfigFile = toml::from_str(toml_str).unwrap();
        ServerConfig::resolve(cli, file)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = resolve_str("", &ServerCliArgs::default()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 100);
        assert!(config.tokens.is_empty());
    }

    #[test]
    fn full_file_is_applied() {
        let config = resolve_str(
            r#"
[server]
bind_addr = "127.0.0.1:8080"
default_page_size = 20
max_page_size = 50

[auth.tokens]
"alice-secret" = "alice"
"bob-secret" = "bob"
"#,
            &ServerCliArgs::default(),
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.tokens.get("bob-secret").map(String::as_str), Some("bob"));
    }

    #[test]
    fn cli_overrides_file() {
        let cli = ServerCliArgs {
            bind: Some("0.0.0.0:3000".to_string()),
            max_page_size: None,
            ..Default::default()
        };
        let config = resolve_str(
            r#"
[server]
bind_addr = "127.0.0.1:8080"
max_page_size = 40
"#,
            &cli,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.max_page_size, 40);
    }

    #[test]
    fn default_above_max_is_rejected() {
        let result = resolve_str(
            r"
[server]
default_page_size = 50
max_page_size = 20
",
            &ServerCliArgs::default(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::PageSize {
                default: 50,
                max: 20
            })
        ));
    }

    #[test]
    fn explicit_missing_config_file_returns_error() {
        let result = load_config_file(Some(std::path::Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
