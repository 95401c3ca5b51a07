use crate::error::{Result, SsoError};
use crate::expiry::{self, Clock};
use serde::{Deserialize, Serialize};

/// An SSO-enabled profile from ~/.aws/config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub sso_start_url: String,
    pub sso_region: String,
    pub sso_account_id: String,
    pub sso_role_name: String,
    pub region: Option<String>,
    pub output: Option<String>,
}

impl Profile {
    pub fn instance(&self) -> SsoInstance {
        SsoInstance {
            start_url: self.sso_start_url.clone(),
            region: self.sso_region.clone(),
        }
    }

    pub fn full_display(&self) -> String {
        format!(
            "{} (id: {}, role: {})",
            self.name, self.sso_account_id, self.sso_role_name
        )
    }
}

/// The (start URL, region) pair a login session is scoped to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SsoInstance {
    pub start_url: String,
    pub region: String,
}

/// Cached SSO-OIDC device flow grant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub start_url: String,
    pub region: String,
    pub access_token: String,
    /// Canonical UTC timestamp, see [`expiry::TIMESTAMP_FORMAT`]
    pub expires_at: String,
    pub client_id: String,
    pub client_secret: String,
    pub registration_expires_at: String,
}

impl LoginSession {
    pub fn is_expired(&self, clock: &dyn Clock) -> Result<bool> {
        expiry::is_expired(&self.expires_at, clock)
    }

    pub fn belongs_to(&self, instance: &SsoInstance) -> bool {
        self.start_url == instance.start_url && self.region == instance.region
    }
}

/// On-disk session cache entry. The discriminant makes the file self-describing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CacheEntry {
    LoginSession(LoginSession),
}

/// Short-lived credentials for one account/role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Milliseconds since the epoch
    pub expiration: i64,
    pub region: Option<String>,
}

impl RoleCredential {
    pub fn expiration_display(&self) -> Result<String> {
        expiry::from_epoch_millis(Some(self.expiration))
    }
}

/// A profile section of the legacy credentials file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_session_token: String,
    pub aws_security_token: String,
    pub aws_session_expiration: String,
    pub region: Option<String>,
}

impl CredentialRecord {
    pub fn from_role_credential(creds: &RoleCredential) -> Result<Self> {
        Ok(Self {
            aws_access_key_id: creds.access_key_id.clone(),
            aws_secret_access_key: creds.secret_access_key.clone(),
            aws_session_token: creds.session_token.clone(),
            aws_security_token: creds.session_token.clone(),
            aws_session_expiration: expiry::from_epoch_millis(Some(creds.expiration))?,
            region: creds.region.clone(),
        })
    }

    /// Key/value pairs in the order they are written to disk
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("aws_access_key_id", self.aws_access_key_id.clone()),
            ("aws_secret_access_key", self.aws_secret_access_key.clone()),
            ("aws_session_token", self.aws_session_token.clone()),
            ("aws_security_token", self.aws_security_token.clone()),
            ("aws_session_expiration", self.aws_session_expiration.clone()),
        ];
        if let Some(region) = &self.region {
            entries.push(("region", region.clone()));
        }
        entries
    }
}

/// A resolved account from the declarative SSO config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredAccount {
    pub name: String,
    pub id: String,
    pub role: String,
    pub region: String,
    pub output: String,
}

impl DeclaredAccount {
    pub fn to_profile(&self, start_url: &str, sso_region: &str) -> Profile {
        Profile {
            name: self.name.clone(),
            sso_start_url: start_url.to_string(),
            sso_region: sso_region.to_string(),
            sso_account_id: self.id.clone(),
            sso_role_name: self.role.clone(),
            region: Some(self.region.clone()),
            output: Some(self.output.clone()),
        }
    }
}

/// Strip one trailing `#/` so portal URLs copied from the browser compare equal
pub fn normalize_start_url(url: &str) -> &str {
    url.strip_suffix("#/").unwrap_or(url)
}

pub fn is_matching_start_url(a: &str, b: &str) -> bool {
    let a = normalize_start_url(a);
    let b = normalize_start_url(b);
    !a.is_empty() && a == b
}

pub fn require<'a>(value: Option<&'a str>, profile: &str, key: &'static str) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SsoError::IncompleteProfile {
            profile: profile.to_string(),
            key,
        })
}
