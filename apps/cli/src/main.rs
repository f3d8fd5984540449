//! `tailrotate`: run one step of a Tailscale client-key rotation

mod config;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tailrotate_rotation::{RotationEvent, RotationOutcome, SecretRotator};
use tailrotate_store::AwsSecretsManagerStore;
use tailrotate_tailscale::{TailscaleConnector, build_http_client};
use tracing::{error, info};

use crate::config::ConfigArgs;

#[derive(Debug, Parser)]
#[command(name = "tailrotate", version, about = "Rotate Tailscale client keys held in AWS Secrets Manager")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single rotation step
    Rotate {
        /// Secret being rotated
        #[arg(long)]
        secret_id: String,
        /// Version id (client request token) of the rotation
        #[arg(long)]
        token: String,
        /// createSecret, setSecret, testSecret or finishSecret
        #[arg(long)]
        step: String,
    },
    /// Run the step described by a rotation event (JSON)
    Event {
        /// Event file; stdin when omitted
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
}

fn read_event(file: Option<&PathBuf>) -> Result<RotationEvent> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Could not read rotation event from {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Could not read rotation event from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("Could not parse rotation event")
}

async fn run(cli: Cli) -> Result<RotationOutcome> {
    let event = match &cli.command {
        Command::Rotate {
            secret_id,
            token,
            step,
        } => RotationEvent {
            secret_id: secret_id.clone(),
            client_request_token: token.clone(),
            step: step.clone(),
        },
        Command::Event { file } => read_event(file.as_ref())?,
    };

    let config = cli.config.load()?;

    let http = build_http_client(config.http_timeout)?;
    let connector = TailscaleConnector::new(http, &config.tailscale_api_url);
    let store = AwsSecretsManagerStore::connect(
        cli.config.region.as_deref(),
        cli.config.endpoint_url.as_deref(),
    )
    .await;

    let rotator = SecretRotator::new(config, Arc::new(store), Arc::new(connector));
    Ok(rotator.handle(&event).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = tailrotate_log::init().context("Could not initialize logging")?;

    match run(cli).await {
        Ok(outcome) => {
            info!(?outcome, "Rotation step finished");
            println!("{}", summary(&outcome));
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Rotation step failed");
            Err(e)
        }
    }
}

fn summary(outcome: &RotationOutcome) -> String {
    match outcome {
        RotationOutcome::AlreadyCurrent => "Version already current, nothing to do".to_string(),
        RotationOutcome::Created { key_id } => format!("Stored pending key {key_id}"),
        RotationOutcome::Verified { key_id } => format!("Verified pending key {key_id}"),
        RotationOutcome::Promoted { previous: Some(previous) } => {
            format!("Promoted version, previous current was {previous}")
        }
        RotationOutcome::Promoted { previous: None } => "Promoted first version".to_string(),
    }
}
