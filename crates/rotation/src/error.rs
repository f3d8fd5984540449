//! Rotation errors
//!
//! Lower-level failures are wrapped unchanged; [`RotationError::kind`] folds
//! them into a flat taxonomy so callers can branch without matching nested
//! enums.

use tailrotate_store::StoreError;
use tailrotate_tailscale::{TailscaleError, VerifyError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by [`crate::SecretRotator`]
#[derive(Debug, Error)]
pub enum RotationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Secret {secret_id} does not have rotation enabled")]
    RotationDisabled { secret_id: String },

    #[error("Secret version {version} has no stage for rotation at secret {secret_id}")]
    VersionNotStaged { secret_id: String, version: String },

    #[error("Secret version {version} not set as AWSPENDING for rotation of secret {secret_id}")]
    StageMismatch { secret_id: String, version: String },

    #[error("Invalid step parameter {step} for secret {secret_id}")]
    InvalidStep { secret_id: String, step: String },

    #[error(transparent)]
    Issuer(#[from] TailscaleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored value is not the JSON shape it should be
    #[error("Could not decode {what} from {secret_id}")]
    Decode {
        what: &'static str,
        secret_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not encode {what} for {secret_id}")]
    Encode {
        what: &'static str,
        secret_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Flat classification of [`RotationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationErrorKind {
    Configuration,
    RotationDisabled,
    VersionNotStaged,
    StageMismatch,
    InvalidStep,
    Unauthenticated,
    IssuerApi,
    KeyNotFound,
    Expired,
    ExpiringTooSoon,
    RevokedTooSoon,
    CapabilityMismatch,
    Store,
    Decode,
    Encode,
    Transport,
}

impl RotationError {
    pub fn kind(&self) -> RotationErrorKind {
        match self {
            Self::Config(_) => RotationErrorKind::Configuration,
            Self::RotationDisabled { .. } => RotationErrorKind::RotationDisabled,
            Self::VersionNotStaged { .. } => RotationErrorKind::VersionNotStaged,
            Self::StageMismatch { .. } => RotationErrorKind::StageMismatch,
            Self::InvalidStep { .. } => RotationErrorKind::InvalidStep,
            Self::Issuer(err) => match err {
                TailscaleError::Unauthenticated => RotationErrorKind::Unauthenticated,
                TailscaleError::Api { .. } => RotationErrorKind::IssuerApi,
                TailscaleError::KeyNotFound { .. } => RotationErrorKind::KeyNotFound,
                TailscaleError::Decode { .. } => RotationErrorKind::Decode,
                TailscaleError::Transport(_) => RotationErrorKind::Transport,
                TailscaleError::Verify(verify) => match verify {
                    VerifyError::Expired { .. } => RotationErrorKind::Expired,
                    VerifyError::ExpiringTooSoon { .. } => RotationErrorKind::ExpiringTooSoon,
                    VerifyError::RevokedTooSoon { .. } => RotationErrorKind::RevokedTooSoon,
                    VerifyError::CapabilityMismatch { .. } => {
                        RotationErrorKind::CapabilityMismatch
                    }
                },
            },
            Self::Store(_) => RotationErrorKind::Store,
            Self::Decode { .. } => RotationErrorKind::Decode,
            Self::Encode { .. } => RotationErrorKind::Encode,
        }
    }

    /// Whether a later retry of the same step could succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            RotationErrorKind::IssuerApi | RotationErrorKind::Store | RotationErrorKind::Transport
        )
    }
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;
