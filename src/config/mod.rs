// Tool settings
use crate::env::Environment;
use crate::error::{Result, SsoError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_OUTPUT: &str = "yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub defaults: AccountDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginConfig {
    /// How long to wait for the user to approve the device in the browser
    #[serde(default = "default_consent_timeout")]
    pub consent_timeout_secs: u64,
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_consent_timeout() -> u64 {
    300
}

fn default_client_name() -> String {
    "ssosync".to_string()
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            consent_timeout_secs: default_consent_timeout(),
            client_name: default_client_name(),
        }
    }
}

impl LoginConfig {
    pub fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound on concurrent GetRoleCredentials calls
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Last-resort values for accounts in a declarative SSO config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountDefaults {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

impl Default for AccountDefaults {
    fn default() -> Self {
        Self {
            region: default_region(),
            output: default_output(),
        }
    }
}

impl Config {
    pub fn config_file_path(env: &Environment) -> PathBuf {
        env.settings_dir.join("config.toml")
    }

    /// Load settings from file and environment variables, falling back to defaults
    pub fn load(env: &Environment) -> Result<Self> {
        let mut config = Self::load_file(&Self::config_file_path(env))?;

        if let Some(secs) = parse_env::<u64>("SSOSYNC_CONSENT_TIMEOUT")? {
            tracing::debug!("Using SSOSYNC_CONSENT_TIMEOUT from environment: {}", secs);
            config.login.consent_timeout_secs = secs;
        }

        if let Some(limit) = parse_env::<usize>("SSOSYNC_MAX_CONCURRENCY")? {
            tracing::debug!("Using SSOSYNC_MAX_CONCURRENCY from environment: {}", limit);
            config.sync.max_concurrency = limit;
        }

        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        tracing::debug!("Loading config from: {}", path.display());
        let contents = fs::read_to_string(path)
            .map_err(|e| SsoError::ConfigError(format!("Failed to read config file: {}", e)))?;
        Ok(toml::from_str(&contents)?)
    }

    fn validate(&self) -> Result<()> {
        if self.login.consent_timeout_secs == 0 {
            return Err(SsoError::ConfigError(
                "login.consent_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.sync.max_concurrency == 0 {
            return Err(SsoError::ConfigError(
                "sync.max_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map(Some)
            .map_err(|_| {
                SsoError::ConfigError(format!("{} has an invalid value: {}", name, value))
            }),
        _ => Ok(None),
    }
}
