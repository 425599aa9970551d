//! Runtime configuration.
//!
//! # Responsibility
//! - Merge built-in defaults, an optional TOML file and `PATIENT_*`
//!   environment variables into one `AppConfig`.
//! - Validate values before any component starts.
//!
//! # Invariants
//! - No connection settings or credentials are compiled in beyond a local
//!   default database file name.
//! - Environment variables override the TOML file, which overrides defaults.

use crate::logging::{default_log_level, normalize_level};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `PATIENT_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "patient.toml";
/// Environment variable naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "PATIENT_CONFIG";
const ENV_PREFIX: &str = "PATIENT_";

/// Application configuration shared by the server and CLI binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file. Env: `PATIENT_DATABASE_PATH`.
    pub database_path: PathBuf,
    /// HTTP listen address. Env: `PATIENT_LISTEN_ADDR`.
    pub listen_addr: IpAddr,
    /// HTTP listen port. Env: `PATIENT_LISTEN_PORT`.
    pub listen_port: u16,
    /// `trace|debug|info|warn|error`. Env: `PATIENT_LOG_LEVEL`.
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    /// Env: `PATIENT_LOG_DIR`.
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("patients.sqlite3"),
            listen_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_port: 8080,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// Sources could not be read or deserialized.
    Load(Box<figment::Error>),
    /// A value was readable but not acceptable.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "failed to load configuration: {err}"),
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err.as_ref()),
            Self::Invalid(_) => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Load(Box::new(value))
    }
}

impl AppConfig {
    /// Builds the layered figment: defaults, then `file` if it exists, then env.
    pub fn figment(file: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if file.is_file() {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]))
    }

    /// Loads configuration from the file named by `PATIENT_CONFIG` (or
    /// `patient.toml`), environment overrides and defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_figment(Self::figment(&file))
    }

    /// Extracts and validates a config from an explicit figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path must not be empty".to_string(),
            ));
        }
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(dir) = &self.log_dir {
            if !Path::new(dir.trim()).is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{dir}`"
                )));
            }
        }
        Ok(())
    }

    pub fn listen_socket(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }
}
