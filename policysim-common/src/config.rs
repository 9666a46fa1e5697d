//! Configuration loading and resolution
//!
//! Every setting resolves in this priority order:
//! 1. Command-line argument / environment variable (collected by the binary)
//! 2. TOML config file
//! 3. Compiled default
//!
//! Blank strings count as absent at every level.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "POLICYSIM_CONFIG";
pub const ENV_PORT: &str = "PORT";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "SUPABASE_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_STORE: &str = "POLICYSIM_STORE";
pub const ENV_DATABASE_PATH: &str = "POLICYSIM_DATABASE";
pub const ENV_BIND_ADDRESS: &str = "POLICYSIM_BIND_ADDRESS";
pub const ENV_REQUEST_TIMEOUT: &str = "POLICYSIM_REQUEST_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "POLICYSIM_LOG_LEVEL";

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Where users and exchanges are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Hosted row store (PostgREST) next to the identity service
    #[default]
    Rest,
    /// Local SQLite file
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(StoreBackend::Rest),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("unknown store backend '{}' (expected rest or sqlite)", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Rest => write!(f, "rest"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// `[logging]` table of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub store: Option<StoreBackend>,
    pub database_path: Option<PathBuf>,
    pub logging: LoggingConfig,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub store: Option<StoreBackend>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub request_timeout: Duration,
    pub store: StoreBackend,
    pub database_path: PathBuf,
    pub log_level: String,
}

// Keys stay out of logs.
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("store", &self.store)
            .field("database_path", &self.database_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ServiceConfig {
    /// Merge overrides over the file contents and apply defaults
    ///
    /// # Errors
    /// `Error::Config` when the text-generation API key, the identity
    /// service URL or its key is missing, or the timeout is zero.
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let openai_api_key = first_present(overrides.openai_api_key, file.openai_api_key)
            .ok_or_else(|| {
                Error::Config(format!(
                    "OpenAI API key is not configured. Set {} or openai_api_key in config.toml",
                    ENV_OPENAI_API_KEY
                ))
            })?;

        let supabase_url = first_present(overrides.supabase_url, file.supabase_url)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Supabase URL is not configured. Set {} or supabase_url in config.toml",
                    ENV_SUPABASE_URL
                ))
            })?;

        let supabase_key = first_present(overrides.supabase_key, file.supabase_key)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Supabase key is not configured. Set {} or supabase_key in config.toml",
                    ENV_SUPABASE_KEY
                ))
            })?;

        let timeout_secs = overrides
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address: first_present(overrides.bind_address, file.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            supabase_url: trim_trailing_slash(&supabase_url),
            supabase_key,
            openai_api_key,
            openai_base_url: trim_trailing_slash(
                &first_present(overrides.openai_base_url, file.openai_base_url)
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ),
            request_timeout: Duration::from_secs(timeout_secs),
            store: overrides.store.or(file.store).unwrap_or_default(),
            database_path: overrides
                .database_path
                .or(file.database_path)
                .unwrap_or_else(default_database_path),
            log_level: first_present(overrides.log_level, Some(file.logging.level))
                .unwrap_or_else(default_log_level),
        })
    }

    /// Tracing filter used when `RUST_LOG` is unset
    pub fn log_directives(&self) -> String {
        format!(
            "policysim_api={lvl},policysim_common={lvl},tower_http={lvl}",
            lvl = self.log_level
        )
    }

    /// `host:port` string for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn first_present(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
        .map(|v| v.trim().to_string())
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Default config file location (`<config_dir>/policysim/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("policysim").join("config.toml"))
}

/// Default SQLite database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("policysim"))
        .unwrap_or_else(|| PathBuf::from("./policysim_data"))
        .join("policysim.db")
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where the loaded config file came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path given on the command line or via `POLICYSIM_CONFIG`
    Explicit(PathBuf),
    /// Platform default location
    Default(PathBuf),
    /// No file found; `None` when the config directory is unknown
    Missing(Option<PathBuf>),
}

/// Config file contents plus provenance, for startup logging
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub file: TomlConfig,
    pub source: ConfigSource,
}

/// Load the config file, explicit path first
///
/// An explicitly named file must exist and parse. The default location is
/// optional: when it is missing, an empty `TomlConfig` is returned.
pub fn load_config_file(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let file = load_toml_config(path).map_err(|e| match e {
            Error::Io(io) => Error::Config(format!("Read {} failed: {}", path.display(), io)),
            other => other,
        })?;
        return Ok(LoadedConfig {
            file,
            source: ConfigSource::Explicit(path.to_path_buf()),
        });
    }

    match default_config_path() {
        Some(path) if path.exists() => Ok(LoadedConfig {
            file: load_toml_config(&path)?,
            source: ConfigSource::Default(path),
        }),
        other => Ok(LoadedConfig {
            file: TomlConfig::default(),
            source: ConfigSource::Missing(other),
        }),
    }
}
