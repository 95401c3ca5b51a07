pub mod completions;
pub mod logout;
pub mod status;
pub mod sync;

use crate::auth::{AuthManager, OidcClient, SessionCache, SystemBrowser};
use crate::aws_config::ProfileStore;
use crate::config::Config;
use crate::credentials::{CredentialFetcher, CredentialManager};
use crate::env::Environment;
use crate::error::Result;
use crate::expiry::SystemClock;
use crate::session::SessionManager;
use std::sync::Arc;

/// Everything a command needs, detected once per invocation
pub struct Context {
    pub env: Environment,
    pub config: Config,
    pub store: ProfileStore,
}

impl Context {
    pub fn load(force_headless: bool) -> Result<Self> {
        let env = Environment::detect(force_headless)?;
        let config = Config::load(&env)?;
        let store = ProfileStore::new(&env);
        store.ensure_initialized()?;
        Ok(Self { env, config, store })
    }

    pub fn session_cache(&self) -> SessionCache {
        SessionCache::new(&self.env)
    }

    pub fn auth_manager(&self) -> AuthManager<OidcClient> {
        AuthManager::new(
            OidcClient::new(),
            self.session_cache(),
            Box::new(SystemBrowser),
            Arc::new(SystemClock),
            &self.config.login,
            self.env.headless,
        )
    }

    pub fn session_manager(&self) -> SessionManager<OidcClient, CredentialFetcher> {
        SessionManager::new(
            self.auth_manager(),
            CredentialManager::new(CredentialFetcher::new()),
            &self.config.sync,
        )
    }
}
