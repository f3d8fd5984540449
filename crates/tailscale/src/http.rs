//! Shared HTTP client construction

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{TailscaleError, TailscaleResult};

/// Tailscale API v2 root
pub const DEFAULT_API_URL: &str = "https://api.tailscale.com/api/v2";

const USER_AGENT: &str = concat!("tailrotate/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used by both the OAuth and key clients
///
/// `timeout` bounds every request end to end.
pub fn build_http_client(timeout: Duration) -> TailscaleResult<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Read a successful response body as JSON
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> TailscaleResult<T> {
    let url = response.url().to_string();
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| TailscaleError::Decode { url, source })
}
