//! # tailrotate-log
//!
//! Subscriber setup shared by the tailrotate binaries. Library crates only
//! emit through `tracing`; the process entry point calls one of the init
//! functions below exactly once.
//!
//! ```rust,no_run
//! let _guard = tailrotate_log::init_with(tailrotate_log::Config::production())?;
//! tracing::info!(secret_id = "example", "rotation requested");
//! # Ok::<(), tailrotate_log::LogError>(())
//! ```

#![forbid(unsafe_code)]

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Fields, Format};
pub use error::{LogError, LogResult};

/// Initialize with configuration taken from the environment
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::from_env())
}

/// Initialize with custom configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
