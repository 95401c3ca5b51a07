// Chooses the batch of profiles a run operates on
use crate::aws_config::{ProfileConfig, ProfileStore};
use crate::config::AccountDefaults;
use crate::error::{Result, SsoError};
use crate::models::{is_matching_start_url, Profile};
use crate::sso_config;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSelector {
    ProfileName(String),
    StartUrl(String),
    ConfigFile(PathBuf),
    AutoDetect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfiles {
    /// Its start URL and SSO region scope the login session for the batch
    pub primary: Profile,
    pub profiles: Vec<Profile>,
    /// The profiles file was rewritten from a declarative config
    pub profiles_updated: bool,
}

impl ResolvedProfiles {
    fn from_batch(profiles: Vec<Profile>, profiles_updated: bool) -> Option<Self> {
        let primary = profiles.first()?.clone();
        Some(Self {
            primary,
            profiles,
            profiles_updated,
        })
    }
}

/// Resolve with exactly one strategy. A failing strategy never falls through to another.
pub fn resolve(
    store: &ProfileStore,
    defaults: &AccountDefaults,
    selector: &ProfileSelector,
) -> Result<ResolvedProfiles> {
    tracing::debug!(?selector, "resolving profiles");
    match selector {
        ProfileSelector::ProfileName(name) => by_name(&store.load_profiles()?, name),
        ProfileSelector::StartUrl(url) => by_start_url(&store.load_profiles()?, url),
        ProfileSelector::AutoDetect => auto_detect(&store.load_profiles()?),
        ProfileSelector::ConfigFile(path) => from_config_file(store, defaults, path),
    }
}

fn by_name(config: &ProfileConfig, name: &str) -> Result<ResolvedProfiles> {
    let profile = config
        .sso_profile(name)?
        .ok_or_else(|| SsoError::ProfileNotFound(name.to_string()))?;
    ResolvedProfiles::from_batch(vec![profile], false)
        .ok_or_else(|| SsoError::ProfileNotFound(name.to_string()))
}

fn by_start_url(config: &ProfileConfig, url: &str) -> Result<ResolvedProfiles> {
    if !is_https_url(url) {
        return Err(SsoError::InvalidStartUrl(url.to_string()));
    }
    let profiles = matching_profiles(config, url)?;
    ResolvedProfiles::from_batch(profiles, false)
        .ok_or_else(|| SsoError::NoMatchingProfiles(url.to_string()))
}

fn auto_detect(config: &ProfileConfig) -> Result<ResolvedProfiles> {
    let names = config.profile_names();
    let mut start_urls = names.iter().filter_map(|name| config.start_url(name));

    let target = start_urls.next().ok_or(SsoError::NoSsoProfiles)?;
    if let Some(other) = start_urls.find(|url| !is_matching_start_url(target, url)) {
        return Err(SsoError::AmbiguousStartUrl {
            first: target.to_string(),
            other: other.to_string(),
        });
    }
    tracing::debug!("Auto-detected start URL {}", target);

    let profiles = matching_profiles(config, target)?;
    ResolvedProfiles::from_batch(profiles, false).ok_or(SsoError::NoSsoProfiles)
}

fn from_config_file(
    store: &ProfileStore,
    defaults: &AccountDefaults,
    path: &std::path::Path,
) -> Result<ResolvedProfiles> {
    let declared = sso_config::load(path, defaults)?;
    let mut config = store.load_profiles()?;
    let mut dirty = false;
    let mut profiles = Vec::with_capacity(declared.accounts.len());

    for account in &declared.accounts {
        let wanted = account.to_profile(&declared.start_url, &declared.region);
        // A partially configured profile is simply overwritten
        let current = config.sso_profile(&account.name).ok().flatten();
        if current.as_ref() != Some(&wanted) {
            tracing::debug!("Profile '{}' differs from {}", wanted.name, path.display());
            config.set_profile(&wanted);
            dirty = true;
        }
        profiles.push(wanted);
    }

    if dirty {
        store.save_profiles(&config)?;
    }

    ResolvedProfiles::from_batch(profiles, dirty).ok_or_else(|| {
        SsoError::InvalidConfig(format!("{} declares no accounts", path.display()))
    })
}

/// Every SSO profile whose start URL matches `url`, in file order
fn matching_profiles(config: &ProfileConfig, url: &str) -> Result<Vec<Profile>> {
    let mut profiles = Vec::new();
    for name in config.profile_names() {
        let matches = config
            .start_url(&name)
            .is_some_and(|candidate| is_matching_start_url(candidate, url));
        if !matches {
            continue;
        }
        if let Some(profile) = config.sso_profile(&name)? {
            profiles.push(profile);
        }
    }
    Ok(profiles)
}

fn is_https_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .is_some_and(|host| !host.is_empty())
}
