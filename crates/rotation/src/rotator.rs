//! Rotation state machine

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tailrotate_store::{SecretDescription, SecretStore, VersionStage};
use tailrotate_tailscale::{ClientKey, IssuerConnector, KeyIssuer, KeyUsage, OAuthCredentials};
use tracing::{error, info, warn};

use crate::config::RotationConfig;
use crate::error::{RotationError, RotationResult};
use crate::step::{RotationEvent, RotationStep};

/// Secret tag selecting the key usage policy
pub const PURPOSE_TAG_KEY: &str = "Purpose";

const OAUTH_SECRET_SHAPE: &str = r#"{ "id": "your-oauth-id", "key": "your-oauth-key" }"#;

/// What a successful invocation did
///
/// Informational only; every `Ok` means the step succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The version already holds the current stage; nothing was done
    AlreadyCurrent,
    /// A new key was issued and stored as the pending version
    Created { key_id: String },
    /// The pending key passed verification
    Verified { key_id: String },
    /// The current stage moved to the version, away from `previous`
    Promoted { previous: Option<String> },
}

/// Key usage policy derived from the secret's `Purpose` tag
///
/// Exactly one `Purpose` tag with value `Cattle` selects
/// [`KeyUsage::Reusable`]. No tag, several tags or any other value select
/// [`KeyUsage::SingleUse`].
pub fn key_usage(description: &SecretDescription) -> KeyUsage {
    let mut purposes = description.tags_named(PURPOSE_TAG_KEY);
    match (purposes.next(), purposes.next()) {
        (Some(tag), None) => KeyUsage::from_purpose(Some(&tag.value)),
        _ => KeyUsage::SingleUse,
    }
}

/// Runs single rotation steps
pub struct SecretRotator {
    config: RotationConfig,
    store: Arc<dyn SecretStore>,
    connector: Arc<dyn IssuerConnector>,
}

impl std::fmt::Debug for SecretRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRotator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SecretRotator {
    pub fn new(
        config: RotationConfig,
        store: Arc<dyn SecretStore>,
        connector: Arc<dyn IssuerConnector>,
    ) -> Self {
        Self {
            config,
            store,
            connector,
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Handle a rotation event from the scheduler
    pub async fn handle(&self, event: &RotationEvent) -> RotationResult<RotationOutcome> {
        info!(
            step = %event.step,
            version = %event.client_request_token,
            secret_id = %event.secret_id,
            "Rotation step requested"
        );
        self.rotate(&event.secret_id, &event.client_request_token, &event.step)
            .await
    }

    /// Run one rotation step for `version` of `secret_id`
    ///
    /// Preconditions run on every call, in order: configuration, OAuth
    /// credentials and token exchange, describe, rotation flag, version
    /// staging. Only then is `step` interpreted, so an unknown step still
    /// costs a describe.
    #[tracing::instrument(skip(self))]
    pub async fn rotate(
        &self,
        secret_id: &str,
        version: &str,
        step: &str,
    ) -> RotationResult<RotationOutcome> {
        self.config.validate()?;

        let credentials = self.oauth_credentials().await?;
        let issuer = self
            .connector
            .connect(&credentials, &self.config.tailnet, &self.config.tag_name)
            .await?;

        let description = self.store.describe(secret_id).await?;
        if !check_staged_for_rotation(&description, secret_id, version)? {
            info!("Rotation already complete");
            return Ok(RotationOutcome::AlreadyCurrent);
        }
        let usage = key_usage(&description);

        let step: RotationStep = step.parse().map_err(|_| {
            error!("Invalid step parameter");
            RotationError::InvalidStep {
                secret_id: secret_id.to_string(),
                step: step.to_string(),
            }
        })?;

        match step {
            RotationStep::CreateSecret => {
                self.create_secret(issuer.as_ref(), secret_id, version, usage)
                    .await
            }
            // Nothing external to set: the key already exists at the issuer.
            RotationStep::SetSecret | RotationStep::TestSecret => {
                self.test_secret(issuer.as_ref(), secret_id, version, usage)
                    .await
            }
            RotationStep::FinishSecret => {
                self.finish_secret(secret_id, version, &description).await
            }
        }
    }

    async fn oauth_credentials(&self) -> RotationResult<OAuthCredentials> {
        let secret_id = &self.config.oauth_secret_arn;
        let result = match self.store.get_current(secret_id).await {
            Ok(value) => serde_json::from_str(value.expose_secret()).map_err(|source| {
                RotationError::Decode {
                    what: "OAuth credentials",
                    secret_id: secret_id.clone(),
                    source,
                }
            }),
            Err(e) => Err(e.into()),
        };

        result.inspect_err(|e| {
            error!(
                error = %e,
                oauth_secret = %secret_id,
                expected = OAUTH_SECRET_SHAPE,
                "Could not retrieve {} from the OAuth secret, did you initialize it?",
                VersionStage::CURRENT,
            );
        })
    }

    async fn create_secret(
        &self,
        issuer: &dyn KeyIssuer,
        secret_id: &str,
        version: &str,
        usage: KeyUsage,
    ) -> RotationResult<RotationOutcome> {
        let key = issuer.create_key(usage).await?;
        let value = serde_json::to_string(&key).map_err(|source| RotationError::Encode {
            what: "client key",
            secret_id: secret_id.to_string(),
            source,
        })?;

        if let Err(e) = self
            .store
            .put_pending(secret_id, version, &SecretString::from(value))
            .await
        {
            error!(
                error = %e,
                key_id = %key.id,
                "Failed to store pending secret value, revoking issued key"
            );
            if let Err(delete_err) = issuer.delete_key(&key.id).await {
                warn!(
                    error = %delete_err,
                    key_id = %key.id,
                    "Could not revoke unstored client key"
                );
            }
            return Err(e.into());
        }

        info!(key_id = %key.id, %usage, "createSecret: stored pending secret value");
        Ok(RotationOutcome::Created { key_id: key.id })
    }

    async fn test_secret(
        &self,
        issuer: &dyn KeyIssuer,
        secret_id: &str,
        version: &str,
        usage: KeyUsage,
    ) -> RotationResult<RotationOutcome> {
        let result = async {
            let value = self.store.get_by_version(secret_id, version).await?;
            let key: ClientKey =
                serde_json::from_str(value.expose_secret()).map_err(|source| {
                    RotationError::Decode {
                        what: "client key",
                        secret_id: secret_id.to_string(),
                        source,
                    }
                })?;
            issuer.verify_key(&key.id, usage).await?;
            Ok::<_, RotationError>(key.id)
        }
        .await;

        match result {
            Ok(key_id) => {
                info!(%key_id, %usage, "Pending client key verified");
                Ok(RotationOutcome::Verified { key_id })
            }
            Err(e) => {
                error!(error = %e, "Failed to verify pending client key");
                Err(e)
            }
        }
    }

    async fn finish_secret(
        &self,
        secret_id: &str,
        version: &str,
        description: &SecretDescription,
    ) -> RotationResult<RotationOutcome> {
        let previous = description.current_version().map(str::to_string);

        self.store
            .promote(secret_id, version, previous.as_deref())
            .await
            .inspect_err(|e| error!(error = %e, "Failed to finish rotation"))?;

        info!(previous = ?previous, "finishSecret: current stage moved to version");
        Ok(RotationOutcome::Promoted { previous })
    }
}

/// Rotation flag and staging checks
///
/// Returns `false` when `version` already holds the current stage.
fn check_staged_for_rotation(
    description: &SecretDescription,
    secret_id: &str,
    version: &str,
) -> RotationResult<bool> {
    if !description.rotation_enabled {
        return Err(RotationError::RotationDisabled {
            secret_id: secret_id.to_string(),
        });
    }

    let Some(stages) = description.stages(version) else {
        return Err(RotationError::VersionNotStaged {
            secret_id: secret_id.to_string(),
            version: version.to_string(),
        });
    };

    if stages.contains(&VersionStage::Current) {
        return Ok(false);
    }
    if !stages.contains(&VersionStage::Pending) {
        return Err(RotationError::StageMismatch {
            secret_id: secret_id.to_string(),
            version: version.to_string(),
        });
    }
    Ok(true)
}
