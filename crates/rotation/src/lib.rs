//! Tailscale client-key rotation
//!
//! [`SecretRotator`] runs one step of the four-step rotation protocol
//! (`createSecret`, `setSecret`, `testSecret`, `finishSecret`) against a
//! [`tailrotate_store::SecretStore`], issuing and verifying keys through a
//! [`tailrotate_tailscale::IssuerConnector`].
//!
//! Each invocation is stateless: configuration is validated, the OAuth
//! credentials are read and exchanged for a token, and the target secret is
//! described before any step runs. A version that already holds the current
//! stage short-circuits to success, so every step can be retried safely.
#![forbid(unsafe_code)]

mod config;
mod error;
mod rotator;
mod step;

pub use config::{ConfigError, DEFAULT_HTTP_TIMEOUT, RotationConfig};
pub use error::{RotationError, RotationErrorKind, RotationResult};
pub use rotator::{PURPOSE_TAG_KEY, RotationOutcome, SecretRotator, key_usage};
pub use step::{RotationEvent, RotationStep, UnknownStep};
