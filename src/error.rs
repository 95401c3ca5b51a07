use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SsoError {
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("AWS SSO {step} failed: response is missing {field}")]
    Protocol {
        step: &'static str,
        field: &'static str,
    },

    #[error("Unable to fetch role credentials: response is missing {field}")]
    IncompleteRoleCredentials { field: &'static str },

    #[error("Authorization expired - user took too long to complete device flow")]
    AuthorizationExpired,

    #[error("Timed out after {seconds}s waiting for the SSO login to be approved in the browser")]
    ConsentTimeout { seconds: u64 },

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("No SSO configured profile found for '{0}'")]
    ProfileNotFound(String),

    #[error("Profile '{profile}' is missing required setting '{key}'")]
    IncompleteProfile { profile: String, key: &'static str },

    #[error("Could not find any profiles configured for {0}")]
    NoMatchingProfiles(String),

    #[error("You must specify a profile when multiple AWS SSO endpoints are configured ({first} and {other})")]
    AmbiguousStartUrl { first: String, other: String },

    #[error("Could not find any configured SSO profiles")]
    NoSsoProfiles,

    #[error("Start URL must be a valid https URL: {0}")]
    InvalidStartUrl(String),

    #[error("SSO config file '{}' does not exist", .0.display())]
    ConfigFileNotFound(PathBuf),

    #[error("Invalid SSO configuration: {0}")]
    InvalidConfig(String),

    #[error("'role' cannot be resolved for account '{name}' (id: {id})")]
    MissingAccountRole { name: String, id: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timestamp not provided")]
    MissingTimestamp,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SsoError {
    /// Errors raised while resolving profiles, before any network call
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SsoError::ProfileNotFound(_)
                | SsoError::IncompleteProfile { .. }
                | SsoError::NoMatchingProfiles(_)
                | SsoError::AmbiguousStartUrl { .. }
                | SsoError::NoSsoProfiles
                | SsoError::InvalidStartUrl(_)
                | SsoError::ConfigFileNotFound(_)
                | SsoError::InvalidConfig(_)
                | SsoError::MissingAccountRole { .. }
                | SsoError::ConfigError(_)
                | SsoError::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SsoError>;
