//! Tailnet auth-key API client

use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{TailscaleError, TailscaleResult};
use crate::http::read_json;
use crate::oauth::AccessToken;
use crate::types::{ClientKey, CreateKeyRequest, CreateKeyResponse, KeyDescription, KeyUsage};

/// Client for `/tailnet/{tailnet}/keys`
///
/// Every method requires an access token. Without one the call fails with
/// [`TailscaleError::Unauthenticated`] before any request is sent.
#[derive(Debug)]
pub struct ApiKeyClient {
    http: Client,
    api_url: String,
    tailnet: String,
    tag_name: String,
    access_token: Option<AccessToken>,
}

impl ApiKeyClient {
    pub fn new(
        http: Client,
        api_url: &str,
        tailnet: impl Into<String>,
        tag_name: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            tailnet: tailnet.into(),
            tag_name: tag_name.into(),
            access_token: None,
        }
    }

    /// Attach the bearer token obtained from [`crate::OAuthClient`]
    #[must_use]
    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    /// Tag every issued key is required to carry, without the `tag:` prefix
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    fn keys_url(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/tailnet/{}/keys/{id}", self.api_url, self.tailnet),
            None => format!("{}/tailnet/{}/keys", self.api_url, self.tailnet),
        }
    }

    fn bearer(&self) -> TailscaleResult<String> {
        match &self.access_token {
            Some(token) if !token.is_empty() => Ok(format!("Bearer {}", token.expose())),
            _ => Err(TailscaleError::Unauthenticated),
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        id: Option<&str>,
        body: Option<&B>,
    ) -> TailscaleResult<Response> {
        let authorization = self.bearer()?;
        let url = self.keys_url(id);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, authorization);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        warn!(%method, %url, %status, "Tailscale API request failed");
        match id {
            Some(id) if status == StatusCode::NOT_FOUND => Err(TailscaleError::KeyNotFound {
                id: id.to_string(),
                method,
                url,
            }),
            _ => Err(TailscaleError::Api {
                method,
                url,
                status,
            }),
        }
    }

    /// Issue a new ephemeral, tagged auth key
    #[tracing::instrument(skip(self), fields(tailnet = %self.tailnet, tag = %self.tag_name))]
    pub async fn create_key(&self, usage: KeyUsage) -> TailscaleResult<ClientKey> {
        let body = CreateKeyRequest::new(usage, &self.tag_name);
        let response = self.send(Method::POST, None, Some(&body)).await?;
        let created: CreateKeyResponse = read_json(response).await?;
        let key = created.into_client_key();
        info!(key_id = %key.id, expires = %key.expires, "Created client key");
        Ok(key)
    }

    /// Fetch a key's metadata; the key material itself is never returned
    #[tracing::instrument(skip(self), fields(tailnet = %self.tailnet))]
    pub async fn describe_key(&self, id: &str) -> TailscaleResult<KeyDescription> {
        let response = self.send::<()>(Method::GET, Some(id), None).await?;
        let description: KeyDescription = read_json(response).await?;
        debug!(key_id = %description.id, "Described client key");
        Ok(description)
    }

    /// Describe a key and check it against `usage` and the required tag
    #[tracing::instrument(skip(self), fields(tailnet = %self.tailnet, tag = %self.tag_name))]
    pub async fn verify_key(&self, id: &str, usage: KeyUsage) -> TailscaleResult<()> {
        let description = self.describe_key(id).await?;
        description.check(usage, &self.tag_name, Utc::now())?;
        info!(key_id = %id, "Client key verified");
        Ok(())
    }

    /// Revoke a key
    #[tracing::instrument(skip(self), fields(tailnet = %self.tailnet))]
    pub async fn delete_key(&self, id: &str) -> TailscaleResult<()> {
        self.send::<()>(Method::DELETE, Some(id), None).await?;
        info!(key_id = %id, "Deleted client key");
        Ok(())
    }
}
