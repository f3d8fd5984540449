//! OAuth client-credentials exchange against the Tailscale token endpoint

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{TailscaleError, TailscaleResult};
use crate::http::read_json;

/// OAuth client credentials, stored as `{"id": "...", "key": "..."}`
#[derive(Deserialize)]
#[serde(from = "RawOAuthCredentials")]
pub struct OAuthCredentials {
    id: String,
    key: SecretString,
}

#[derive(Deserialize)]
struct RawOAuthCredentials {
    id: String,
    key: String,
}

impl From<RawOAuthCredentials> for OAuthCredentials {
    fn from(raw: RawOAuthCredentials) -> Self {
        Self::new(raw.id, raw.key)
    }
}

impl OAuthCredentials {
    /// Create credentials from a client id and client secret
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: SecretString::from(key.into()),
        }
    }

    /// OAuth client id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `Authorization` header value: `Basic base64(id:key)`
    pub fn basic_auth_header(&self) -> String {
        let pair = format!("{}:{}", self.id, self.key.expose_secret());
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Bearer token valid for a single rotation invocation
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Raw token, for the `Authorization` header only
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// An empty token is treated as no token at all
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

#[derive(Serialize)]
struct TokenRequest {
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Token endpoint client
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    token_url: String,
}

impl OAuthClient {
    /// Create a client for the API rooted at `api_url`
    pub fn new(http: Client, api_url: &str) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth/token", api_url.trim_end_matches('/')),
        }
    }

    /// Token endpoint this client posts to
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange client credentials for a bearer access token
    #[tracing::instrument(skip_all, fields(client_id = %credentials.id()))]
    pub async fn authenticate(&self, credentials: &OAuthCredentials) -> TailscaleResult<AccessToken> {
        debug!(endpoint = %self.token_url, "Requesting OAuth access token");

        let response = self
            .http
            .post(&self.token_url)
            .header(AUTHORIZATION, credentials.basic_auth_header())
            .json(&TokenRequest {
                grant_type: "client_credentials",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Token request failed");
            return Err(TailscaleError::Api {
                method: Method::POST,
                url: self.token_url.clone(),
                status,
            });
        }

        let token: TokenResponse = read_json(response).await?;
        debug!("OAuth access token obtained");
        Ok(AccessToken::new(token.access_token))
    }
}
