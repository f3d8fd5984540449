//! Errors raised while installing the global subscriber

/// Logger setup errors
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Filter directive could not be parsed
    #[error("Invalid filter '{filter}': {reason}")]
    Filter {
        /// The directive string as configured
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Global logger already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Result type for logger operations
pub type LogResult<T> = Result<T, LogError>;
