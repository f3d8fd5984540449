use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::StoreResult;
use crate::types::SecretDescription;

/// Versioned, staged secret store
///
/// Implementations must apply [`SecretStore::promote`] atomically: a reader
/// never observes two versions holding the current stage, nor none when one
/// held it before.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Rotation flag, version-to-stages map and tags of a secret
    async fn describe(&self, secret_id: &str) -> StoreResult<SecretDescription>;

    /// Value of the version holding the current stage
    async fn get_current(&self, secret_id: &str) -> StoreResult<SecretString>;

    /// Value of a specific version
    async fn get_by_version(&self, secret_id: &str, version_id: &str)
    -> StoreResult<SecretString>;

    /// Write `value` as version `version_id`, staged pending
    async fn put_pending(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> StoreResult<()>;

    /// Move the current stage to `version_id`, taking it from `remove_from`
    ///
    /// `remove_from` is `None` only when no version holds the current stage.
    async fn promote(
        &self,
        secret_id: &str,
        version_id: &str,
        remove_from: Option<&str>,
    ) -> StoreResult<()>;
}
