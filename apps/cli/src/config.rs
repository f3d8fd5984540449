//! Layered configuration: defaults, TOML file, environment, flags

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Args;
use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use serde::Serialize;
use tailrotate_rotation::RotationConfig;

/// Configuration flags shared by every subcommand
#[derive(Debug, Args, Serialize)]
pub struct ConfigArgs {
    /// TOML file with rotation settings
    #[arg(long, global = true, env = "TAILROTATE_CONFIG", value_name = "PATH")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Secret holding the Tailscale OAuth client credentials
    #[arg(long, global = true, value_name = "ARN")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_secret_arn: Option<String>,

    /// Tailnet to issue keys in
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailnet: Option<String>,

    /// ACL tag applied to issued keys, without the `tag:` prefix
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,

    /// Tailscale API root
    #[arg(long = "api-url", global = true, value_name = "URL")]
    #[serde(rename = "tailscale_api_url", skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Per-request timeout for Tailscale API calls, e.g. `10s`
    #[arg(long, global = true, value_name = "DURATION")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout: Option<String>,

    /// AWS region override
    #[arg(long, global = true)]
    #[serde(skip)]
    pub region: Option<String>,

    /// Secrets Manager endpoint override (LocalStack)
    #[arg(long, global = true, value_name = "URL")]
    #[serde(skip)]
    pub endpoint_url: Option<String>,
}

impl ConfigArgs {
    /// Merge all layers and validate the result
    pub fn load(&self) -> Result<RotationConfig> {
        let mut figment = Figment::from(Serialized::defaults(RotationConfig::default()));

        if let Some(path) = &self.config {
            ensure!(path.exists(), "Config file {} does not exist", path.display());
            figment = figment.merge(Toml::file(path));
        }

        let config: RotationConfig = figment
            .merge(Serialized::defaults(RotationConfig::env_overrides(|var| {
                std::env::var(var).ok()
            })))
            .merge(Serialized::defaults(self))
            .extract()
            .context("Could not load rotation configuration")?;

        config.validate()?;
        Ok(config)
    }
}
