// Declarative SSO config: a JSON file describing the SSO endpoint and the accounts to sync
use crate::config::AccountDefaults;
use crate::error::{Result, SsoError};
use crate::models::DeclaredAccount;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Picked up from the working directory when no selector is given
pub const DEFAULT_CONFIG_FILE: &str = "ssosync.config.json";

#[derive(Debug, Deserialize)]
struct RawConfig {
    sso: RawSso,
    #[serde(default)]
    default_account: AccountFields,
    /// Kept as a map so declaration order survives parsing
    accounts: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawSso {
    starturl: String,
    region: String,
}

#[derive(Debug, Default, Deserialize)]
struct AccountFields {
    role: Option<String>,
    region: Option<String>,
    output: Option<String>,
}

/// An account is either a bare id or an object with per-account overrides
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountEntry {
    Id(String),
    Detailed(DetailedAccount),
}

#[derive(Debug, Deserialize)]
struct DetailedAccount {
    id: String,
    role: Option<String>,
    region: Option<String>,
    output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoConfigFile {
    pub start_url: String,
    pub region: String,
    /// In declaration order
    pub accounts: Vec<DeclaredAccount>,
}

pub fn load(path: &Path, defaults: &AccountDefaults) -> Result<SsoConfigFile> {
    if !path.exists() {
        return Err(SsoError::ConfigFileNotFound(path.to_path_buf()));
    }
    tracing::debug!("Loading SSO config from: {}", path.display());
    let json = fs::read_to_string(path)?;
    parse(&json, defaults)
}

pub fn parse(json: &str, defaults: &AccountDefaults) -> Result<SsoConfigFile> {
    let raw: RawConfig = serde_json::from_str(json)
        .map_err(|e| SsoError::InvalidConfig(format!("Failed to parse SSO config: {}", e)))?;

    if raw.sso.starturl.is_empty() || raw.sso.region.is_empty() {
        return Err(SsoError::InvalidConfig(
            "sso.starturl and sso.region must not be empty".to_string(),
        ));
    }

    let mut accounts = Vec::with_capacity(raw.accounts.len());
    for (name, value) in raw.accounts {
        let entry: AccountEntry = serde_json::from_value(value).map_err(|_| {
            SsoError::InvalidConfig(format!(
                "account '{}' must be an account id string or an object with an 'id'",
                name
            ))
        })?;
        accounts.push(resolve_account(name, entry, &raw.default_account, defaults)?);
    }

    Ok(SsoConfigFile {
        start_url: raw.sso.starturl,
        region: raw.sso.region,
        accounts,
    })
}

/// Per-field fallback: account, then `default_account`, then the fixed defaults
fn resolve_account(
    name: String,
    entry: AccountEntry,
    default_account: &AccountFields,
    defaults: &AccountDefaults,
) -> Result<DeclaredAccount> {
    let (id, fields) = match entry {
        AccountEntry::Id(id) => (id, AccountFields::default()),
        AccountEntry::Detailed(account) => (
            account.id,
            AccountFields {
                role: account.role,
                region: account.region,
                output: account.output,
            },
        ),
    };

    let role = fields
        .role
        .or_else(|| default_account.role.clone())
        .ok_or_else(|| SsoError::MissingAccountRole {
            name: name.clone(),
            id: id.clone(),
        })?;
    let region = fields
        .region
        .or_else(|| default_account.region.clone())
        .unwrap_or_else(|| defaults.region.clone());
    let output = fields
        .output
        .or_else(|| default_account.output.clone())
        .unwrap_or_else(|| defaults.output.clone());

    Ok(DeclaredAccount {
        name,
        id,
        role,
        region,
        output,
    })
}
