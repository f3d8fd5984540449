//! Issuer seams used by the rotation orchestrator

use async_trait::async_trait;
use reqwest::Client;

use crate::error::TailscaleResult;
use crate::keys::ApiKeyClient;
use crate::oauth::{OAuthClient, OAuthCredentials};
use crate::types::{ClientKey, KeyUsage};

/// Issues, verifies and revokes auth keys for one tailnet
#[async_trait]
pub trait KeyIssuer: Send + Sync {
    /// Issue a new key with the given usage
    async fn create_key(&self, usage: KeyUsage) -> TailscaleResult<ClientKey>;

    /// Check that key `id` exists and satisfies `usage` and the required tag
    async fn verify_key(&self, id: &str, usage: KeyUsage) -> TailscaleResult<()>;

    /// Revoke key `id`
    async fn delete_key(&self, id: &str) -> TailscaleResult<()>;
}

#[async_trait]
impl KeyIssuer for ApiKeyClient {
    async fn create_key(&self, usage: KeyUsage) -> TailscaleResult<ClientKey> {
        ApiKeyClient::create_key(self, usage).await
    }

    async fn verify_key(&self, id: &str, usage: KeyUsage) -> TailscaleResult<()> {
        ApiKeyClient::verify_key(self, id, usage).await
    }

    async fn delete_key(&self, id: &str) -> TailscaleResult<()> {
        ApiKeyClient::delete_key(self, id).await
    }
}

/// Turns OAuth credentials into an authenticated [`KeyIssuer`]
#[async_trait]
pub trait IssuerConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &OAuthCredentials,
        tailnet: &str,
        tag_name: &str,
    ) -> TailscaleResult<Box<dyn KeyIssuer>>;
}

/// Production connector: token exchange followed by an [`ApiKeyClient`]
#[derive(Debug, Clone)]
pub struct TailscaleConnector {
    oauth: OAuthClient,
    http: Client,
    api_url: String,
}

impl TailscaleConnector {
    pub fn new(http: Client, api_url: &str) -> Self {
        Self {
            oauth: OAuthClient::new(http.clone(), api_url),
            http,
            api_url: api_url.to_string(),
        }
    }
}

#[async_trait]
impl IssuerConnector for TailscaleConnector {
    async fn connect(
        &self,
        credentials: &OAuthCredentials,
        tailnet: &str,
        tag_name: &str,
    ) -> TailscaleResult<Box<dyn KeyIssuer>> {
        let token = self.oauth.authenticate(credentials).await?;
        let client = ApiKeyClient::new(self.http.clone(), &self.api_url, tailnet, tag_name)
            .with_access_token(token);
        Ok(Box::new(client))
    }
}
