//! Error types for the Tailscale API clients
//!
//! [`TailscaleError`] covers transport and API status failures;
//! [`VerifyError`] explains why an existing key was rejected during
//! verification. Each verification failure is its own variant so callers can
//! tell an expired key from a mis-tagged one without parsing messages.

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Errors raised by [`crate::OAuthClient`] and [`crate::ApiKeyClient`]
#[derive(Debug, Error)]
pub enum TailscaleError {
    /// A key API method was called before a non-empty access token was set
    #[error(
        "No access token is configured yet, make sure you run the authenticate function first"
    )]
    Unauthenticated,

    /// The API answered with a non-2xx status
    #[error("The {method} request for {url} resulted in: {status}")]
    Api {
        /// HTTP method of the failed request
        method: Method,
        /// Full request URL
        url: String,
        /// Response status
        status: StatusCode,
    },

    /// An id-addressed request answered 404
    #[error("The key {id} was not found ({method} {url})")]
    KeyNotFound {
        /// Requested key id
        id: String,
        /// HTTP method of the failed request
        method: Method,
        /// Full request URL
        url: String,
    },

    /// A 2xx response body is not the expected JSON shape
    #[error("Could not decode the response of {url}")]
    Decode {
        /// Full request URL
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Connection, TLS or timeout failure
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The key exists but does not satisfy the rotation requirements
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Reasons a described key fails verification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// `expires` is in the past
    #[error("The key expired on {}", .expires.to_rfc3339())]
    Expired {
        /// Key expiry
        expires: DateTime<Utc>,
    },

    /// `expires` falls inside the minimum validity window
    #[error(
        "The key expires on {}, that is within the next {} days",
        .expires.to_rfc3339(),
        .min_days
    )]
    ExpiringTooSoon {
        /// Key expiry
        expires: DateTime<Utc>,
        /// Required validity window in days
        min_days: i64,
    },

    /// `revoked` falls inside the minimum validity window
    #[error("The key was revoked on {}", .revoked.to_rfc3339())]
    RevokedTooSoon {
        /// Revocation timestamp
        revoked: DateTime<Utc>,
    },

    /// Device-create capabilities do not match the requested usage
    #[error("The client authentication key ({id}) is {problem}! Capability: {capabilities}")]
    CapabilityMismatch {
        /// Key id
        id: String,
        /// What is wrong
        problem: CapabilityProblem,
        /// The capabilities as reported by the API, JSON-encoded
        capabilities: String,
    },
}

/// Specific capability mismatch found by verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityProblem {
    /// Key should be reusable but is not
    NotReusable,
    /// Key is reusable but should be single-use
    UnexpectedlyReusable,
    /// Key is not ephemeral
    NotEphemeral,
    /// Required `tag:<name>` is missing
    NotTagged,
}

impl std::fmt::Display for CapabilityProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReusable => write!(f, "not reusable, while it should be"),
            Self::UnexpectedlyReusable => write!(f, "reusable, while it should not be"),
            Self::NotEphemeral => write!(f, "not ephemeral"),
            Self::NotTagged => write!(f, "not tagged properly"),
        }
    }
}

/// Result type for Tailscale API operations
pub type TailscaleResult<T> = Result<T, TailscaleError>;
