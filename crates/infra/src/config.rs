//! Configuration loading and representation.
//!
//! Sources are merged in this order (later sources override earlier):
//! 1. Defaults from `GatehouseConfig::default()`
//! 2. TOML file: an explicit path, else `$GATEHOUSE_CONFIG`, else `./gatehouse.toml` if present
//! 3. Environment variables, e.g. `GATEHOUSE_JWT__SECRET` for `jwt.secret`

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_auth::{DEFAULT_ROLE, HashParams, TokenConfig};
use gatehouse_observability::LogFormat;

pub const ENV_PREFIX: &str = "GATEHOUSE_";
pub const CONFIG_PATH_ENV: &str = "GATEHOUSE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "gatehouse.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Token signing settings. Durations are human-readable (`"15m"`, `"7d"`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    pub secret: String,
    pub access_ttl: String,
    pub refresh_ttl: String,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_ttl: "15m".to_string(),
            refresh_ttl: "7d".to_string(),
        }
    }
}

impl core::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtSettings {
    /// Parse into a [`TokenConfig`], rejecting an empty secret and empty or zero durations.
    pub fn token_config(&self) -> Result<TokenConfig, ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt.secret must be set".to_string()));
        }

        let config = TokenConfig::from_human(self.secret.clone(), &self.access_ttl, &self.refresh_ttl)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if config.access_ttl.is_zero() {
            return Err(ConfigError::Invalid("jwt.access_ttl must be greater than zero".to_string()));
        }
        if config.refresh_ttl.is_zero() {
            return Err(ConfigError::Invalid("jwt.refresh_ttl must be greater than zero".to_string()));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    pub server: ServerConfig,
    pub jwt: JwtSettings,
    /// Argon2id cost for newly written hashes.
    pub password: HashParams,
    /// Role granted on registration.
    pub default_role: String,
    pub log_format: LogFormat,
}

impl Default for GatehouseConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            jwt: JwtSettings::default(),
            password: HashParams::default(),
            default_role: DEFAULT_ROLE.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl GatehouseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port cannot be 0".to_string()));
        }
        if self.default_role.trim().is_empty() {
            return Err(ConfigError::Invalid("default_role cannot be empty".to_string()));
        }
        self.jwt.token_config()?;
        Ok(())
    }
}

/// Configuration loader service.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this file instead of the default lookup. It must exist.
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    fn resolve_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        let explicit = self
            .config_path
            .clone()
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        match explicit {
            Some(path) if path.exists() => Ok(Some(path)),
            Some(path) => Err(ConfigError::MissingFile(path)),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                Ok(default.exists().then_some(default))
            }
        }
    }

    pub fn figment(&self) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(GatehouseConfig::default()));

        if let Some(path) = self.resolve_file()? {
            tracing::info!(path = %path.display(), "loading configuration file");
            figment = figment.merge(Toml::file(path));
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate.
    pub fn load(&self) -> Result<GatehouseConfig, ConfigError> {
        let config: GatehouseConfig = self.figment()?.extract()?;
        config.validate()?;
        Ok(config)
    }
}
