// Sync and export orchestration
mod export;

pub use export::{render, ExportFormat};

use crate::auth::{AuthManager, OidcApi};
use crate::aws_config::{BackupSlot, ProfileStore};
use crate::config::SyncConfig;
use crate::credentials::{CredentialManager, RoleCredentialsApi};
use crate::error::{Result, SsoError};
use crate::models::{CredentialRecord, LoginSession, Profile, RoleCredential};
use crate::resolver::ResolvedProfiles;
use futures::stream::{self, StreamExt};

/// A profile whose credentials could not be refreshed
#[derive(Debug)]
pub struct ProfileFailure {
    pub profile: String,
    pub account_id: String,
    pub role_name: String,
    pub error: SsoError,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    /// Profile names written to the credentials file, in resolution order
    pub synced: Vec<String>,
    pub failures: Vec<ProfileFailure>,
    pub backup: Option<BackupSlot>,
}

pub struct SessionManager<O, R> {
    auth: AuthManager<O>,
    creds: CredentialManager<R>,
    max_concurrency: usize,
}

impl<O: OidcApi, R: RoleCredentialsApi> SessionManager<O, R> {
    pub fn new(auth: AuthManager<O>, creds: CredentialManager<R>, settings: &SyncConfig) -> Self {
        Self {
            auth,
            creds,
            max_concurrency: settings.max_concurrency.max(1),
        }
    }

    pub async fn login(&self, primary: &Profile, force: bool) -> Result<LoginSession> {
        self.auth.login(&primary.instance(), force).await
    }

    /// Refresh every resolved profile. Per-profile failures end up in the report;
    /// only login and file errors abort. The credentials file is written once,
    /// after every network call has finished.
    pub async fn sync(
        &self,
        store: &ProfileStore,
        resolved: &ResolvedProfiles,
        force: bool,
    ) -> Result<SyncReport> {
        let session = self.login(&resolved.primary, force).await?;

        let results = self.exchange_all(&session, &resolved.profiles).await;

        let mut credentials = store.load_credentials()?;
        let mut report = SyncReport::default();
        for (profile, result) in results {
            match result.and_then(|creds| CredentialRecord::from_role_credential(&creds)) {
                Ok(record) => {
                    credentials.set_record(&profile.name, &record);
                    tracing::debug!(
                        "Refreshed {} (expires {})",
                        profile.full_display(),
                        record.aws_session_expiration
                    );
                    report.synced.push(profile.name.clone());
                }
                Err(error) => {
                    tracing::debug!(
                        profile = %profile.name,
                        account = %profile.sso_account_id,
                        role = %profile.sso_role_name,
                        "Unable to refresh credentials: {}",
                        error
                    );
                    report.failures.push(ProfileFailure {
                        profile: profile.name.clone(),
                        account_id: profile.sso_account_id.clone(),
                        role_name: profile.sso_role_name.clone(),
                        error,
                    });
                }
            }
        }

        report.backup = store.create_backup()?;
        store.save_credentials(&credentials)?;
        Ok(report)
    }

    /// Credentials for a single profile, without touching the credentials file
    pub async fn export_one(
        &self,
        profile: &Profile,
        force: bool,
        format: ExportFormat,
    ) -> Result<String> {
        let session = self.login(profile, force).await?;
        let creds = self.creds.exchange(&session, profile).await?;
        render(&creds, format)
    }

    async fn exchange_all<'a>(
        &self,
        session: &LoginSession,
        profiles: &'a [Profile],
    ) -> Vec<(&'a Profile, Result<RoleCredential>)> {
        stream::iter(profiles)
            .map(move |profile| async move {
                (profile, self.creds.exchange(session, profile).await)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}
