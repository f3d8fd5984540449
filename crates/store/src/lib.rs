//! Secret store gateway
//!
//! [`SecretStore`] is the narrow interface the rotation orchestrator talks
//! to: describe a secret, read a version, write the pending version and move
//! the current stage. Every operation is one call against the backing store
//! and failures are returned as-is; retries belong to the rotation scheduler.
//!
//! Backends:
//!
//! - [`AwsSecretsManagerStore`] (feature `aws`, enabled by default)
//! - [`MemorySecretStore`] (feature `test-util`)

mod error;
mod store;
mod types;

#[cfg(feature = "aws")]
mod aws;
#[cfg(any(test, feature = "test-util"))]
mod memory;

pub use error::{StoreError, StoreResult};
pub use store::SecretStore;
pub use types::{SecretDescription, SecretTag, VersionStage};

#[cfg(feature = "aws")]
pub use aws::AwsSecretsManagerStore;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemorySecretStore, StoreCall};
