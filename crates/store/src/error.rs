use thiserror::Error;

/// Boxed source error of a failed backend call
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Secret store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The secret, or the requested version of it, does not exist
    #[error("Secret not found: {secret_id} ({selector})")]
    NotFound {
        secret_id: String,
        /// Version id or stage that was requested
        selector: String,
    },

    /// The version exists but carries no string value
    #[error("Secret {secret_id} ({selector}) has no string value")]
    MissingValue { secret_id: String, selector: String },

    /// The store refused a write that conflicts with its current state
    #[error("Store rejected {operation} on {secret_id}: {reason}")]
    Rejected {
        operation: &'static str,
        secret_id: String,
        reason: String,
    },

    /// Any other backend failure, carried unmodified
    #[error("{operation} failed for {secret_id}")]
    Service {
        operation: &'static str,
        secret_id: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    /// Whether this error means the secret or version is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
