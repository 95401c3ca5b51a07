// AWS SSO OIDC device authorization login
mod browser;
mod oidc;
mod token_cache;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use oidc::{
    ClientRegistration, DeviceAuthorization, OidcApi, OidcClient, PendingAuthorization,
    RegisteredClient, TokenGrant, TokenPoll,
};
pub use token_cache::SessionCache;

use crate::config::LoginConfig;
use crate::error::{Result, SsoError};
use crate::expiry::{self, Clock};
use crate::models::{LoginSession, SsoInstance};
use std::sync::Arc;
use std::time::Duration;

/// Extra delay added to the poll interval each time the provider asks us to slow down
const SLOW_DOWN_STEP_SECS: u64 = 5;

enum LoginState {
    CacheCheck,
    Authenticate,
}

/// Obtains login sessions, reusing cached ones while they are valid
pub struct AuthManager<O> {
    oidc: O,
    cache: SessionCache,
    browser: Box<dyn BrowserLauncher>,
    clock: Arc<dyn Clock>,
    client_name: String,
    consent_timeout: Duration,
    headless: bool,
}

impl<O: OidcApi> AuthManager<O> {
    pub fn new(
        oidc: O,
        cache: SessionCache,
        browser: Box<dyn BrowserLauncher>,
        clock: Arc<dyn Clock>,
        settings: &LoginConfig,
        headless: bool,
    ) -> Self {
        Self {
            oidc,
            cache,
            browser,
            clock,
            client_name: settings.client_name.clone(),
            consent_timeout: settings.consent_timeout(),
            headless,
        }
    }

    /// A valid session for `instance`. With `force` the cache is not consulted.
    pub async fn login(&self, instance: &SsoInstance, force: bool) -> Result<LoginSession> {
        let mut state = if force {
            LoginState::Authenticate
        } else {
            LoginState::CacheCheck
        };

        loop {
            match state {
                LoginState::CacheCheck => match self.cached_session(instance)? {
                    Some(session) => {
                        tracing::debug!("Using cached session for {}", instance.start_url);
                        return Ok(session);
                    }
                    None => state = LoginState::Authenticate,
                },
                LoginState::Authenticate => {
                    let session = self.authenticate(instance).await?;
                    self.cache.save(&session)?;
                    return Ok(session);
                }
            }
        }
    }

    /// Drop the cached session. Returns whether one existed.
    pub fn logout(&self, instance: &SsoInstance) -> Result<bool> {
        self.cache.remove(instance)
    }

    fn cached_session(&self, instance: &SsoInstance) -> Result<Option<LoginSession>> {
        let Some(session) = self.cache.load(instance)? else {
            return Ok(None);
        };
        if session.is_expired(self.clock.as_ref())? {
            tracing::debug!("Cached session expired at {}", session.expires_at);
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn authenticate(&self, instance: &SsoInstance) -> Result<LoginSession> {
        let client = self
            .oidc
            .register_client(&instance.region, &self.client_name)
            .await?
            .validate()?;
        tracing::debug!("Client registered successfully");

        let authorization = self
            .oidc
            .start_device_authorization(&instance.region, &client, &instance.start_url)
            .await?
            .validate()?;

        self.prompt_user(&authorization);

        let grant = tokio::time::timeout(
            self.consent_timeout,
            self.poll_for_token(&instance.region, &client, &authorization),
        )
        .await
        .map_err(|_| SsoError::ConsentTimeout {
            seconds: self.consent_timeout.as_secs(),
        })??;

        let (access_token, expires_in) = grant.validate()?;
        tracing::debug!("Token expires in {} seconds", expires_in);

        Ok(LoginSession {
            start_url: instance.start_url.clone(),
            region: instance.region.clone(),
            access_token,
            expires_at: expiry::from_now_plus_seconds(self.clock.as_ref(), Some(expires_in))?,
            client_id: client.client_id,
            client_secret: client.client_secret,
            registration_expires_at: expiry::from_epoch_seconds(Some(client.secret_expires_at))?,
        })
    }

    async fn poll_for_token(
        &self,
        region: &str,
        client: &RegisteredClient,
        authorization: &PendingAuthorization,
    ) -> Result<TokenGrant> {
        let mut interval = authorization.interval;
        tracing::debug!("Polling for token with interval: {}s", interval);

        loop {
            match self
                .oidc
                .create_token(region, client, &authorization.device_code)
                .await?
            {
                TokenPoll::Granted(grant) => return Ok(grant),
                TokenPoll::Pending => {}
                TokenPoll::SlowDown => {
                    interval += SLOW_DOWN_STEP_SECS;
                    tracing::debug!("SlowDown requested, poll interval now {}s", interval);
                }
            }
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }

    fn prompt_user(&self, authorization: &PendingAuthorization) {
        eprintln!("\n=== AWS SSO Login ===");

        if self.headless {
            eprintln!("Running in headless mode - please open browser manually:");
            eprintln!();
            eprintln!("Visit: {}", authorization.verification_uri);
            eprintln!("Enter code: {}", authorization.user_code);
            eprintln!();
        } else {
            eprintln!("Opening browser to: {}", authorization.verification_uri);
            eprintln!("\nIf browser doesn't open automatically, visit:");
            eprintln!("  {}", authorization.verification_uri);
            eprintln!("\nAnd enter code: {}\n", authorization.user_code);

            if let Err(e) = self.browser.open(&authorization.verification_uri_complete) {
                eprintln!("Could not open browser automatically: {}", e);
                eprintln!("Please open the URL manually.\n");
            }
        }

        eprintln!(
            "Waiting for authorization (the code is valid for {} minutes)...",
            authorization.expires_in / 60
        );
    }
}
