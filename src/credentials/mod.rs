// Role credential exchange
mod fetcher;

pub use fetcher::{CredentialFetcher, RoleCredentialsApi, RoleCredentialsResponse};

use crate::error::{Result, SsoError};
use crate::models::{LoginSession, Profile, RoleCredential};

/// Trades a login session for per-role credentials. Nothing is cached.
pub struct CredentialManager<R> {
    api: R,
}

impl<R: RoleCredentialsApi> CredentialManager<R> {
    pub fn new(api: R) -> Self {
        Self { api }
    }

    pub async fn exchange(
        &self,
        session: &LoginSession,
        profile: &Profile,
    ) -> Result<RoleCredential> {
        let response = self
            .api
            .get_role_credentials(
                &profile.sso_region,
                &session.access_token,
                &profile.sso_account_id,
                &profile.sso_role_name,
            )
            .await?;

        Ok(RoleCredential {
            access_key_id: present(response.access_key_id, "accessKeyId")?,
            secret_access_key: present(response.secret_access_key, "secretAccessKey")?,
            session_token: present(response.session_token, "sessionToken")?,
            expiration: present(response.expiration, "expiration")?,
            region: profile.region.clone(),
        })
    }
}

fn present<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or(SsoError::IncompleteRoleCredentials { field })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers GetRoleCredentials from a table keyed by account id
    #[derive(Default)]
    pub struct FakeRoleCredentials {
        responses: HashMap<String, Result<RoleCredentialsResponse>>,
        pub calls: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeRoleCredentials {
        pub fn with(mut self, account_id: &str, response: RoleCredentialsResponse) -> Self {
            self.responses.insert(account_id.to_string(), Ok(response));
            self
        }

        pub fn failing(mut self, account_id: &str, error: SsoError) -> Self {
            self.responses.insert(account_id.to_string(), Err(error));
            self
        }
    }

    pub fn complete_response(suffix: &str) -> RoleCredentialsResponse {
        RoleCredentialsResponse {
            access_key_id: Some(format!("AKIA{}", suffix)),
            secret_access_key: Some(format!("secret-{}", suffix)),
            session_token: Some(format!("token-{}", suffix)),
            expiration: Some(1_717_243_200_000),
        }
    }

    impl RoleCredentialsApi for FakeRoleCredentials {
        async fn get_role_credentials(
            &self,
            region: &str,
            access_token: &str,
            account_id: &str,
            role_name: &str,
        ) -> Result<RoleCredentialsResponse> {
            self.calls.lock().unwrap().push((
                region.to_string(),
                account_id.to_string(),
                role_name.to_string(),
            ));
            assert!(!access_token.is_empty());
            match self.responses.get(account_id) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(e)) => Err(SsoError::AwsSdk(e.to_string())),
                None => Err(SsoError::AwsSdk(format!(
                    "ForbiddenException: no access to {}",
                    account_id
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{complete_response, FakeRoleCredentials};
    use super::*;

    fn session() -> LoginSession {
        LoginSession {
            start_url: "https://example.awsapps.com/start".to_string(),
            region: "us-east-1".to_string(),
            access_token: "access-token".to_string(),
            expires_at: "2030-01-01T00:00:00Z".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            registration_expires_at: "2030-03-01T00:00:00Z".to_string(),
        }
    }

    fn profile(region: Option<&str>) -> Profile {
        Profile {
            name: "dev".to_string(),
            sso_start_url: "https://example.awsapps.com/start".to_string(),
            sso_region: "eu-west-1".to_string(),
            sso_account_id: "111111111111".to_string(),
            sso_role_name: "Admin".to_string(),
            region: region.map(str::to_string),
            output: None,
        }
    }

    #[tokio::test]
    async fn test_exchange_uses_profile_region_and_role() {
        let api = FakeRoleCredentials::default().with("111111111111", complete_response("DEV"));
        let manager = CredentialManager::new(api);

        let creds = manager
            .exchange(&session(), &profile(Some("ap-south-1")))
            .await
            .unwrap();

        assert_eq!(creds.access_key_id, "AKIADEV");
        assert_eq!(creds.session_token, "token-DEV");
        assert_eq!(creds.expiration, 1_717_243_200_000);
        assert_eq!(creds.region.as_deref(), Some("ap-south-1"));
        assert_eq!(
            manager.api.calls.lock().unwrap().as_slice(),
            &[(
                "eu-west-1".to_string(),
                "111111111111".to_string(),
                "Admin".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_missing_session_token() {
        let mut response = complete_response("DEV");
        response.session_token = None;
        let manager =
            CredentialManager::new(FakeRoleCredentials::default().with("111111111111", response));

        let err = manager.exchange(&session(), &profile(None)).await.unwrap_err();
        assert!(matches!(
            err,
            SsoError::IncompleteRoleCredentials {
                field: "sessionToken"
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_role_credentials_block() {
        let manager = CredentialManager::new(
            FakeRoleCredentials::default().with("111111111111", RoleCredentialsResponse::default()),
        );

        let err = manager.exchange(&session(), &profile(None)).await.unwrap_err();
        assert!(matches!(
            err,
            SsoError::IncompleteRoleCredentials {
                field: "accessKeyId"
            }
        ));
    }

    #[tokio::test]
    async fn test_sdk_error_is_distinct() {
        let manager = CredentialManager::new(FakeRoleCredentials::default());
        let err = manager.exchange(&session(), &profile(None)).await.unwrap_err();
        assert!(matches!(err, SsoError::AwsSdk(_)));
    }
}
