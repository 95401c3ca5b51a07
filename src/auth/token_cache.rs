use crate::env::Environment;
use crate::error::{Result, SsoError};
use crate::models::{CacheEntry, LoginSession, SsoInstance};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "ssosync_session_";

/// Login sessions on disk, one file per (start URL, region) pair
pub struct SessionCache {
    cache_dir: PathBuf,
}

impl SessionCache {
    pub fn new(env: &Environment) -> Self {
        Self::in_dir(&env.session_cache_dir)
    }

    pub fn in_dir(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    fn cache_key(instance: &SsoInstance) -> String {
        let mut hasher = Sha256::new();
        hasher.update(instance.start_url.as_bytes());
        hasher.update(b"|");
        hasher.update(instance.region.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn cache_file_path(&self, instance: &SsoInstance) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}.json", FILE_PREFIX, Self::cache_key(instance)))
    }

    /// The cached session for `instance`, expired or not. Unreadable entries,
    /// unknown entry types and sessions for another pair are all misses.
    pub fn load(&self, instance: &SsoInstance) -> Result<Option<LoginSession>> {
        let cache_file = self.cache_file_path(instance);

        let contents = match fs::read_to_string(&cache_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SsoError::CacheError(format!(
                    "Failed to read cache file: {}",
                    e
                )))
            }
        };

        let session = match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(CacheEntry::LoginSession(session)) => session,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unrecognized session cache entry {}: {}",
                    cache_file.display(),
                    e
                );
                return Ok(None);
            }
        };

        if !session.belongs_to(instance) {
            tracing::debug!(
                "Cached session in {} belongs to {} ({}), ignoring",
                cache_file.display(),
                session.start_url,
                session.region
            );
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub fn save(&self, session: &LoginSession) -> Result<()> {
        let instance = SsoInstance {
            start_url: session.start_url.clone(),
            region: session.region.clone(),
        };
        let cache_file = self.cache_file_path(&instance);
        fs::create_dir_all(&self.cache_dir)?;

        let json = serde_json::to_string_pretty(&CacheEntry::LoginSession(session.clone()))?;
        fs::write(&cache_file, json)
            .map_err(|e| SsoError::CacheError(format!("Failed to write cache file: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&cache_file, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("Session cached in {}", cache_file.display());
        Ok(())
    }

    /// Returns whether an entry was removed
    pub fn remove(&self, instance: &SsoInstance) -> Result<bool> {
        match fs::remove_file(self.cache_file_path(instance)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SsoError::CacheError(format!(
                "Failed to remove cache file: {}",
                e
            ))),
        }
    }
}
