//! Logger builder implementation

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the root span entered for the lifetime of the process
#[derive(Debug)]
pub struct LoggerGuard {
    #[allow(dead_code)]
    root_span: Option<tracing::span::EnteredSpan>,
}

/// Build the fmt layer for a given style and install it behind the filter.
macro_rules! try_init_subscriber {
    ($filter:expr, $layer:expr) => {
        Registry::default()
            .with($filter)
            .with($layer)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
    };
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Parse the configured filter directives
    pub fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level).map_err(|e| LogError::Filter {
            filter: self.config.level.clone(),
            reason: e.to_string(),
        })
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - A global subscriber was already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;
        let display = &self.config.display;

        match self.config.format {
            Format::Pretty => try_init_subscriber!(
                filter,
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_ansi(display.colors)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source)
            )?,
            Format::Compact => try_init_subscriber!(
                filter,
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_ansi(display.colors)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source)
            )?,
            Format::Json => try_init_subscriber!(
                filter,
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(display.flatten)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source)
            )?,
        }

        let root_span = if self.config.fields.is_empty() {
            None
        } else {
            let fields = &self.config.fields;
            let root = tracing::info_span!(
                "app",
                service = fields.service.as_deref().unwrap_or(""),
                env = fields.env.as_deref().unwrap_or(""),
                version = fields.version.as_deref().unwrap_or("")
            );
            Some(root.entered())
        };

        Ok(LoggerGuard { root_span })
    }
}
