//! OAuth grant flows against the authority.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use url::Url;

use super::cache::CachedToken;
use super::errors::AuthError;

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const PASSWORD_GRANT_TYPE: &str = "http://auth0.com/oauth/grant-type/password-realm";
const PASSWORD_REALM: &str = "cli-users";
const SCOPE: &str = "offline_access";
/// Poll period when the authority does not suggest one.
const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(5);
/// Added to the period after a `slow_down` reply.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Credentials for one grant flow.
#[derive(Debug, Clone)]
pub enum Grant {
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    Password {
        client_id: String,
        username: String,
        password: String,
    },
    DeviceCode {
        client_id: String,
    },
}

impl Grant {
    /// Flow name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ClientCredentials { .. } => "client credentials",
            Self::Password { .. } => "password",
            Self::DeviceCode { .. } => "device code",
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenParams<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realm: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

const fn default_expires_in() -> i64 {
    86_400
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PollResult {
    Ok(TokenResponse),
    Err {
        error: String,
        #[serde(default)]
        error_description: String,
    },
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri_complete: String,
    #[serde(default = "default_device_expiry")]
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

const fn default_device_expiry() -> u64 {
    900
}

/// Runs grant flows against one authority for one audience.
#[derive(Debug, Clone)]
pub struct GrantClient {
    http: Client,
    auth_url: Url,
    audience: String,
}

impl GrantClient {
    pub fn new(http: Client, auth_url: &str, audience: &str) -> Result<Self, AuthError> {
        let auth_url = Url::parse(auth_url).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http,
            auth_url,
            audience: audience.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.auth_url
            .join(path)
            .map_err(|e| AuthError::InvalidUrl(e.to_string()))
    }

    /// Run `grant` against the auth server.
    pub async fn obtain(&self, grant: &Grant) -> Result<CachedToken, AuthError> {
        info!(flow = grant.name(), "requesting access token");
        match grant {
            Grant::ClientCredentials {
                client_id,
                client_secret,
            } => {
                self.request_token(&TokenParams {
                    grant_type: "client_credentials",
                    client_id,
                    client_secret: Some(client_secret),
                    username: None,
                    password: None,
                    realm: None,
                    device_code: None,
                    audience: Some(&self.audience),
                    scope: None,
                })
                .await
            }
            Grant::Password {
                client_id,
                username,
                password,
            } => {
                self.request_token(&TokenParams {
                    grant_type: PASSWORD_GRANT_TYPE,
                    client_id,
                    client_secret: None,
                    username: Some(username),
                    password: Some(password),
                    realm: Some(PASSWORD_REALM),
                    device_code: None,
                    audience: Some(&self.audience),
                    scope: Some(SCOPE),
                })
                .await
            }
            Grant::DeviceCode { client_id } => self.device_flow(client_id).await,
        }
    }

    async fn request_token(&self, params: &TokenParams<'_>) -> Result<CachedToken, AuthError> {
        let response = self
            .http
            .post(self.endpoint("oauth/token")?)
            .json(params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_server_error() {
            return Err(AuthError::Server {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(AuthError::Rejected(body));
        }
        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(CachedToken::new(token.access_token, token.expires_in))
    }

    async fn device_flow(&self, client_id: &str) -> Result<CachedToken, AuthError> {
        let response = self
            .http
            .post(self.endpoint("oauth/device/code")?)
            .form(&[
                ("client_id", client_id),
                ("scope", SCOPE),
                ("audience", self.audience.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected(body));
        }
        let device: DeviceCodeResponse = serde_json::from_str(&body)?;

        eprintln!("User code: {}", device.user_code);
        eprintln!(
            "Please verify your identity at: {}",
            device.verification_uri_complete
        );

        let deadline = Instant::now() + Duration::from_secs(device.expires_in);
        let mut period = device
            .interval
            .map_or(DEFAULT_POLL_PERIOD, Duration::from_secs);
        let params = TokenParams {
            grant_type: DEVICE_GRANT_TYPE,
            client_id,
            client_secret: None,
            username: None,
            password: None,
            realm: None,
            device_code: Some(&device.device_code),
            audience: None,
            scope: None,
        };

        loop {
            sleep(period).await;
            if Instant::now() >= deadline {
                return Err(AuthError::DeviceCodeExpired);
            }
            let body = self
                .http
                .post(self.endpoint("oauth/token")?)
                .form(&params)
                .send()
                .await?
                .text()
                .await?;
            match serde_json::from_str::<PollResult>(&body)? {
                PollResult::Ok(token) => {
                    return Ok(CachedToken::new(token.access_token, token.expires_in));
                }
                PollResult::Err {
                    error,
                    error_description,
                } => match error.as_str() {
                    "authorization_pending" => debug!("waiting for device authorization"),
                    "slow_down" => period += SLOW_DOWN_STEP,
                    "expired_token" => return Err(AuthError::DeviceCodeExpired),
                    "access_denied" => return Err(AuthError::AccessDenied),
                    _ => return Err(AuthError::Rejected(format!("{error}: {error_description}"))),
                },
            }
        }
    }
}
