//! AWS Secrets Manager backend

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, SdkError};
use aws_sdk_secretsmanager::operation::describe_secret::DescribeSecretError;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::operation::put_secret_value::PutSecretValueError;
use aws_sdk_secretsmanager::operation::update_secret_version_stage::UpdateSecretVersionStageError;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::SecretStore;
use crate::types::{SecretDescription, SecretTag, VersionStage};

/// [`SecretStore`] backed by AWS Secrets Manager
#[derive(Debug, Clone)]
pub struct AwsSecretsManagerStore {
    client: Client,
}

impl AwsSecretsManagerStore {
    /// Wrap an already configured SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS configuration chain
    ///
    /// `region` and `endpoint_url` override what the environment provides;
    /// the endpoint override is meant for LocalStack.
    pub async fn connect(region: Option<&str>, endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        info!(
            provider = "AWS Secrets Manager",
            region = ?sdk_config.region(),
            "Initialized secret store"
        );
        Self::new(Client::new(&sdk_config))
    }

    async fn get_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        version_stage: Option<&str>,
    ) -> StoreResult<SecretString> {
        let selector = version_id.or(version_stage).unwrap_or_default().to_string();
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .set_version_id(version_id.map(str::to_string))
            .set_version_stage(version_stage.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "GetSecretValue",
                    secret_id,
                    &selector,
                    e,
                    GetSecretValueError::is_resource_not_found_exception,
                )
            })?;

        output
            .secret_string()
            .map(|value| SecretString::from(value.to_string()))
            .ok_or(StoreError::MissingValue {
                secret_id: secret_id.to_string(),
                selector,
            })
    }
}

fn sdk_error<E>(
    operation: &'static str,
    secret_id: &str,
    selector: &str,
    err: SdkError<E>,
    is_not_found: fn(&E) -> bool,
) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    if err.as_service_error().is_some_and(is_not_found) {
        return StoreError::NotFound {
            secret_id: secret_id.to_string(),
            selector: selector.to_string(),
        };
    }

    warn!(
        operation,
        secret_id,
        error = %DisplayErrorContext(&err),
        "Secrets Manager call failed"
    );
    StoreError::Service {
        operation,
        secret_id: secret_id.to_string(),
        source: Box::new(err),
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn describe(&self, secret_id: &str) -> StoreResult<SecretDescription> {
        let output = self
            .client
            .describe_secret()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "DescribeSecret",
                    secret_id,
                    "metadata",
                    e,
                    DescribeSecretError::is_resource_not_found_exception,
                )
            })?;

        let versions: BTreeMap<String, BTreeSet<VersionStage>> = output
            .version_ids_to_stages()
            .map(|map| {
                map.iter()
                    .map(|(version, stages)| {
                        let stages = stages.iter().map(|s| VersionStage::from(s.as_str()));
                        (version.clone(), stages.collect())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let tags = output
            .tags()
            .iter()
            .filter_map(|tag| Some(SecretTag::new(tag.key()?, tag.value().unwrap_or_default())))
            .collect();

        debug!(versions = versions.len(), "Described secret");
        Ok(SecretDescription {
            rotation_enabled: output.rotation_enabled().unwrap_or(true),
            versions,
            tags,
        })
    }

    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn get_current(&self, secret_id: &str) -> StoreResult<SecretString> {
        self.get_value(secret_id, None, Some(VersionStage::CURRENT))
            .await
    }

    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn get_by_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> StoreResult<SecretString> {
        self.get_value(secret_id, Some(version_id), None).await
    }

    #[tracing::instrument(skip(self, value), fields(provider = "AWS"))]
    async fn put_pending(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> StoreResult<()> {
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .client_request_token(version_id)
            .secret_string(value.expose_secret())
            .version_stages(VersionStage::PENDING)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "PutSecretValue",
                    secret_id,
                    version_id,
                    e,
                    PutSecretValueError::is_resource_not_found_exception,
                )
            })?;

        info!("Stored pending secret version");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(provider = "AWS"))]
    async fn promote(
        &self,
        secret_id: &str,
        version_id: &str,
        remove_from: Option<&str>,
    ) -> StoreResult<()> {
        self.client
            .update_secret_version_stage()
            .secret_id(secret_id)
            .version_stage(VersionStage::CURRENT)
            .move_to_version_id(version_id)
            .set_remove_from_version_id(remove_from.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "UpdateSecretVersionStage",
                    secret_id,
                    version_id,
                    e,
                    UpdateSecretVersionStageError::is_resource_not_found_exception,
                )
            })?;

        info!("Moved current stage");
        Ok(())
    }
}
