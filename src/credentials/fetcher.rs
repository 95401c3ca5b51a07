use crate::aws_sdk::{endpoint_override, format_sdk_error, positive, sdk_config};
use crate::error::{Result, SsoError};
use aws_sdk_sso::Client as SsoClient;

const ENDPOINT_VAR: &str = "SSOSYNC_SSO_ENDPOINT";

/// GetRoleCredentials response as returned by the portal, fields unchecked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCredentialsResponse {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Epoch milliseconds
    pub expiration: Option<i64>,
}

#[allow(async_fn_in_trait)]
pub trait RoleCredentialsApi {
    async fn get_role_credentials(
        &self,
        region: &str,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentialsResponse>;
}

/// Fetches role credentials from the AWS SSO portal
#[derive(Default)]
pub struct CredentialFetcher;

impl CredentialFetcher {
    pub fn new() -> Self {
        Self
    }

    async fn client(region: &str) -> SsoClient {
        let sdk_config = sdk_config(region).await;
        let mut builder = aws_sdk_sso::config::Builder::from(&sdk_config);
        if let Some(url) = endpoint_override(ENDPOINT_VAR) {
            tracing::debug!("Using SSO endpoint override: {}", url);
            builder = builder.endpoint_url(url);
        }
        SsoClient::from_conf(builder.build())
    }
}

impl RoleCredentialsApi for CredentialFetcher {
    async fn get_role_credentials(
        &self,
        region: &str,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentialsResponse> {
        tracing::debug!(
            "Fetching role credentials for {} / {} in {}",
            account_id,
            role_name,
            region
        );

        let response = Self::client(region)
            .await
            .get_role_credentials()
            .access_token(access_token)
            .account_id(account_id)
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| {
                SsoError::AwsSdk(format!(
                    "Failed to get role credentials: {}",
                    format_sdk_error(&e)
                ))
            })?;

        Ok(response
            .role_credentials()
            .map(|creds| RoleCredentialsResponse {
                access_key_id: creds.access_key_id().map(str::to_string),
                secret_access_key: creds.secret_access_key().map(str::to_string),
                session_token: creds.session_token().map(str::to_string),
                expiration: positive(creds.expiration()),
            })
            .unwrap_or_default())
    }
}
