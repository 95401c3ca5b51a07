use crate::aws_sdk::{endpoint_override, format_sdk_error, positive, sdk_config};
use crate::error::{Result, SsoError};
use aws_sdk_ssooidc::error::ProvideErrorMetadata;
use aws_sdk_ssooidc::Client as SsoOidcClient;
use std::collections::HashMap;
use std::sync::Mutex;

const CLIENT_TYPE: &str = "public";
const PORTAL_SCOPE: &str = "sso-portal:*";
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const ENDPOINT_VAR: &str = "SSOSYNC_OIDC_ENDPOINT";

/// RegisterClient response as returned by the provider
#[derive(Debug, Clone, Default)]
pub struct ClientRegistration {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Epoch seconds
    pub client_secret_expires_at: Option<i64>,
}

/// StartDeviceAuthorization response as returned by the provider
#[derive(Debug, Clone, Default)]
pub struct DeviceAuthorization {
    pub device_code: Option<String>,
    pub user_code: Option<String>,
    pub verification_uri: Option<String>,
    pub verification_uri_complete: Option<String>,
    pub expires_in: Option<i32>,
    pub interval: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenGrant {
    pub access_token: Option<String>,
    pub expires_in: Option<i32>,
}

/// One CreateToken poll
#[derive(Debug, Clone)]
pub enum TokenPoll {
    /// The user has not approved the device yet
    Pending,
    /// Polling too fast, back off before the next attempt
    SlowDown,
    Granted(TokenGrant),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredClient {
    pub client_id: String,
    pub client_secret: String,
    pub secret_expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    pub expires_in: i64,
    pub interval: u64,
}

fn required<T>(value: Option<T>, step: &'static str, field: &'static str) -> Result<T> {
    value.ok_or(SsoError::Protocol { step, field })
}

impl ClientRegistration {
    pub fn validate(self) -> Result<RegisteredClient> {
        const STEP: &str = "registerClient";
        Ok(RegisteredClient {
            client_id: required(self.client_id, STEP, "clientId")?,
            client_secret: required(self.client_secret, STEP, "clientSecret")?,
            secret_expires_at: required(
                self.client_secret_expires_at,
                STEP,
                "clientSecretExpiresAt",
            )?,
        })
    }
}

impl DeviceAuthorization {
    pub fn validate(self) -> Result<PendingAuthorization> {
        const STEP: &str = "startDeviceAuthorization";
        Ok(PendingAuthorization {
            verification_uri: required(self.verification_uri, STEP, "verificationUri")?,
            verification_uri_complete: required(
                self.verification_uri_complete,
                STEP,
                "verificationUriComplete",
            )?,
            device_code: required(self.device_code, STEP, "deviceCode")?,
            user_code: required(self.user_code, STEP, "userCode")?,
            interval: required(self.interval, STEP, "interval")? as u64,
            expires_in: required(self.expires_in, STEP, "expiresIn")? as i64,
        })
    }
}

impl TokenGrant {
    /// Access token and its lifetime in seconds
    pub fn validate(self) -> Result<(String, i64)> {
        const STEP: &str = "createToken";
        Ok((
            required(self.access_token, STEP, "accessToken")?,
            required(self.expires_in, STEP, "expiresIn")? as i64,
        ))
    }
}

/// The three SSO-OIDC operations of the device authorization flow
#[allow(async_fn_in_trait)]
pub trait OidcApi {
    async fn register_client(&self, region: &str, client_name: &str)
        -> Result<ClientRegistration>;

    async fn start_device_authorization(
        &self,
        region: &str,
        client: &RegisteredClient,
        start_url: &str,
    ) -> Result<DeviceAuthorization>;

    async fn create_token(
        &self,
        region: &str,
        client: &RegisteredClient,
        device_code: &str,
    ) -> Result<TokenPoll>;
}

/// SSO-OIDC backed by the AWS SDK, one client per region
#[derive(Default)]
pub struct OidcClient {
    clients: Mutex<HashMap<String, SsoOidcClient>>,
}

impl OidcClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self, region: &str) -> Result<SsoOidcClient> {
        if let Some(client) = self.cached_client(region)? {
            return Ok(client);
        }

        let sdk_config = sdk_config(region).await;
        let mut builder = aws_sdk_ssooidc::config::Builder::from(&sdk_config);
        if let Some(url) = endpoint_override(ENDPOINT_VAR) {
            tracing::debug!("Using SSO-OIDC endpoint override: {}", url);
            builder = builder.endpoint_url(url);
        }
        let client = SsoOidcClient::from_conf(builder.build());

        self.clients
            .lock()
            .map_err(|_| SsoError::AwsSdk("SSO-OIDC client cache poisoned".to_string()))?
            .insert(region.to_string(), client.clone());
        Ok(client)
    }

    fn cached_client(&self, region: &str) -> Result<Option<SsoOidcClient>> {
        let clients = self
            .clients
            .lock()
            .map_err(|_| SsoError::AwsSdk("SSO-OIDC client cache poisoned".to_string()))?;
        Ok(clients.get(region).cloned())
    }
}

impl OidcApi for OidcClient {
    async fn register_client(
        &self,
        region: &str,
        client_name: &str,
    ) -> Result<ClientRegistration> {
        tracing::debug!("Registering client with SSO-OIDC in {}", region);

        let response = self
            .client(region)
            .await?
            .register_client()
            .client_name(client_name)
            .client_type(CLIENT_TYPE)
            .scopes(PORTAL_SCOPE)
            .send()
            .await
            .map_err(|e| {
                SsoError::AwsSdk(format!("Failed to register client: {}", format_sdk_error(&e)))
            })?;

        Ok(ClientRegistration {
            client_id: response.client_id().map(str::to_string),
            client_secret: response.client_secret().map(str::to_string),
            client_secret_expires_at: positive(response.client_secret_expires_at()),
        })
    }

    async fn start_device_authorization(
        &self,
        region: &str,
        client: &RegisteredClient,
        start_url: &str,
    ) -> Result<DeviceAuthorization> {
        tracing::debug!("Starting device authorization for: {}", start_url);

        let response = self
            .client(region)
            .await?
            .start_device_authorization()
            .client_id(&client.client_id)
            .client_secret(&client.client_secret)
            .start_url(start_url)
            .send()
            .await
            .map_err(|e| {
                SsoError::AwsSdk(format!(
                    "Failed to start device authorization: {}",
                    format_sdk_error(&e)
                ))
            })?;

        Ok(DeviceAuthorization {
            device_code: response.device_code().map(str::to_string),
            user_code: response.user_code().map(str::to_string),
            verification_uri: response.verification_uri().map(str::to_string),
            verification_uri_complete: response.verification_uri_complete().map(str::to_string),
            expires_in: positive(response.expires_in()),
            interval: positive(response.interval()),
        })
    }

    async fn create_token(
        &self,
        region: &str,
        client: &RegisteredClient,
        device_code: &str,
    ) -> Result<TokenPoll> {
        let result = self
            .client(region)
            .await?
            .create_token()
            .client_id(&client.client_id)
            .client_secret(&client.client_secret)
            .grant_type(DEVICE_CODE_GRANT)
            .device_code(device_code)
            .send()
            .await;

        match result {
            Ok(response) => {
                tracing::debug!("Token received successfully");
                Ok(TokenPoll::Granted(TokenGrant {
                    access_token: response.access_token().map(str::to_string),
                    expires_in: positive(response.expires_in()),
                }))
            }
            Err(err) => match err.code() {
                Some("AuthorizationPendingException") => Ok(TokenPoll::Pending),
                Some("SlowDownException") => Ok(TokenPoll::SlowDown),
                Some("ExpiredTokenException") => Err(SsoError::AuthorizationExpired),
                _ => Err(SsoError::AwsSdk(format!(
                    "Token creation failed: {}",
                    format_sdk_error(&err)
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_authorization() -> DeviceAuthorization {
        DeviceAuthorization {
            device_code: Some("device".to_string()),
            user_code: Some("ABCD-EFGH".to_string()),
            verification_uri: Some("https://device.sso.us-east-1.amazonaws.com/".to_string()),
            verification_uri_complete: Some(
                "https://device.sso.us-east-1.amazonaws.com/?user_code=ABCD-EFGH".to_string(),
            ),
            expires_in: Some(600),
            interval: Some(1),
        }
    }

    #[test]
    fn test_registration_requires_secret_expiry() {
        let registration = ClientRegistration {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            client_secret_expires_at: None,
        };
        match registration.validate() {
            Err(SsoError::Protocol { step, field }) => {
                assert_eq!(step, "registerClient");
                assert_eq!(field, "clientSecretExpiresAt");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_device_authorization_fields() {
        let pending = complete_authorization().validate().unwrap();
        assert_eq!(pending.user_code, "ABCD-EFGH");
        assert_eq!(pending.interval, 1);
        assert_eq!(pending.expires_in, 600);

        let mut missing_interval = complete_authorization();
        missing_interval.interval = None;
        assert!(matches!(
            missing_interval.validate(),
            Err(SsoError::Protocol {
                field: "interval",
                ..
            })
        ));

        let mut missing_user_code = complete_authorization();
        missing_user_code.user_code = None;
        assert!(matches!(
            missing_user_code.validate(),
            Err(SsoError::Protocol {
                field: "userCode",
                ..
            })
        ));
    }

    #[test]
    fn test_token_grant_requires_expiry() {
        let grant = TokenGrant {
            access_token: Some("token".to_string()),
            expires_in: None,
        };
        assert!(matches!(
            grant.validate(),
            Err(SsoError::Protocol {
                step: "createToken",
                field: "expiresIn"
            })
        ));
    }
}
