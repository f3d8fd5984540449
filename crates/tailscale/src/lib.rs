//! Tailscale credential issuer
//!
//! Two layers, leaves first:
//!
//! - [`OAuthClient`] exchanges an OAuth client id/secret for a short-lived
//!   bearer [`AccessToken`] (client-credentials grant).
//! - [`ApiKeyClient`] issues, verifies and revokes tailnet auth keys with
//!   that token.
//!
//! The [`KeyIssuer`] and [`IssuerConnector`] traits are the seams the
//! rotation orchestrator depends on; [`TailscaleConnector`] wires the two
//! clients together for production use.
#![forbid(unsafe_code)]

mod error;
mod http;
mod issuer;
mod keys;
mod oauth;
mod types;
mod verify;

pub use error::{CapabilityProblem, TailscaleError, TailscaleResult, VerifyError};
pub use http::{DEFAULT_API_URL, build_http_client};
pub use issuer::{IssuerConnector, KeyIssuer, TailscaleConnector};
pub use keys::ApiKeyClient;
pub use oauth::{AccessToken, OAuthClient, OAuthCredentials};
pub use types::{
    Capabilities, ClientKey, CreateKeyRequest, DeviceCapabilities, DeviceCreateCapabilities,
    KeyDescription, KeyUsage,
};
pub use verify::{KEY_DEFAULT_LIFETIME_SECS, KEY_MINIMUM_FUTURE_VALIDITY_DAYS};
