//! In-memory store with Secrets Manager staging semantics and a call journal

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{StoreError, StoreResult};
use crate::store::SecretStore;
use crate::types::{SecretDescription, SecretTag, VersionStage};

/// One recorded [`SecretStore`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Describe {
        secret_id: String,
    },
    GetCurrent {
        secret_id: String,
    },
    GetByVersion {
        secret_id: String,
        version_id: String,
    },
    PutPending {
        secret_id: String,
        version_id: String,
    },
    Promote {
        secret_id: String,
        version_id: String,
        remove_from: Option<String>,
    },
}

impl StoreCall {
    /// Whether the call mutates the store
    pub fn is_write(&self) -> bool {
        matches!(self, Self::PutPending { .. } | Self::Promote { .. })
    }
}

#[derive(Debug)]
struct MemoryVersion {
    /// `None` while the version is staged but not yet written
    value: Option<SecretString>,
    stages: BTreeSet<VersionStage>,
}

impl MemoryVersion {
    fn reveal(&self) -> Option<SecretString> {
        self.value
            .as_ref()
            .map(|v| SecretString::from(v.expose_secret().to_string()))
    }
}

#[derive(Debug, Default)]
struct MemorySecret {
    rotation_enabled: bool,
    tags: Vec<SecretTag>,
    versions: BTreeMap<String, MemoryVersion>,
}

impl MemorySecret {
    fn strip_stage(&mut self, stage: &VersionStage) {
        for version in self.versions.values_mut() {
            version.stages.remove(stage);
        }
    }
}

#[derive(Debug, Default)]
struct State {
    secrets: HashMap<String, MemorySecret>,
    calls: Vec<StoreCall>,
}

impl State {
    fn secret(&self, secret_id: &str) -> StoreResult<&MemorySecret> {
        self.secrets.get(secret_id).ok_or_else(|| not_found(secret_id, "metadata"))
    }

    fn secret_mut(&mut self, secret_id: &str) -> StoreResult<&mut MemorySecret> {
        self.secrets
            .get_mut(secret_id)
            .ok_or_else(|| not_found(secret_id, "metadata"))
    }
}

fn not_found(secret_id: &str, selector: &str) -> StoreError {
    StoreError::NotFound {
        secret_id: secret_id.to_string(),
        selector: selector.to_string(),
    }
}

fn missing_value(secret_id: &str, selector: &str) -> StoreError {
    StoreError::MissingValue {
        secret_id: secret_id.to_string(),
        selector: selector.to_string(),
    }
}

fn rejected(operation: &'static str, secret_id: &str, reason: String) -> StoreError {
    StoreError::Rejected {
        operation,
        secret_id: secret_id.to_string(),
        reason,
    }
}

/// [`SecretStore`] kept in process memory
///
/// Seeding methods ([`MemorySecretStore::create_secret`],
/// [`MemorySecretStore::seed_version`], ...) are not journaled; every trait
/// call is, whether it succeeds or not.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    state: Mutex<State>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty secret with rotation enabled
    pub fn create_secret<I, K, V>(&self, secret_id: &str, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let tags = tags.into_iter().map(|(k, v)| SecretTag::new(k, v)).collect();
        self.state.lock().secrets.insert(
            secret_id.to_string(),
            MemorySecret {
                rotation_enabled: true,
                tags,
                versions: BTreeMap::new(),
            },
        );
    }

    /// Toggle the rotation flag of an existing secret
    pub fn set_rotation_enabled(&self, secret_id: &str, enabled: bool) {
        if let Some(secret) = self.state.lock().secrets.get_mut(secret_id) {
            secret.rotation_enabled = enabled;
        }
    }

    /// Insert a version directly, moving any of `stages` off other versions
    pub fn seed_version<I>(&self, secret_id: &str, version_id: &str, value: &str, stages: I)
    where
        I: IntoIterator<Item = VersionStage>,
    {
        self.insert_version(
            secret_id,
            version_id,
            Some(SecretString::from(value.to_string())),
            stages,
        );
    }

    /// Stage a version id without a value, as a rotation start does
    pub fn stage_version<I>(&self, secret_id: &str, version_id: &str, stages: I)
    where
        I: IntoIterator<Item = VersionStage>,
    {
        self.insert_version(secret_id, version_id, None, stages);
    }

    fn insert_version<I>(
        &self,
        secret_id: &str,
        version_id: &str,
        value: Option<SecretString>,
        stages: I,
    ) where
        I: IntoIterator<Item = VersionStage>,
    {
        let stages: BTreeSet<VersionStage> = stages.into_iter().collect();
        let mut state = self.state.lock();
        let secret = state.secrets.entry(secret_id.to_string()).or_insert_with(|| MemorySecret {
            rotation_enabled: true,
            ..MemorySecret::default()
        });
        for stage in &stages {
            secret.strip_stage(stage);
        }
        secret
            .versions
            .insert(version_id.to_string(), MemoryVersion { value, stages });
    }

    /// Raw value of a version, for assertions
    pub fn value(&self, secret_id: &str, version_id: &str) -> Option<String> {
        let state = self.state.lock();
        let version = state.secrets.get(secret_id)?.versions.get(version_id)?;
        version.value.as_ref().map(|v| v.expose_secret().to_string())
    }

    /// Stage labels of a version, for assertions
    pub fn stages(&self, secret_id: &str, version_id: &str) -> Option<BTreeSet<VersionStage>> {
        let state = self.state.lock();
        let version = state.secrets.get(secret_id)?.versions.get(version_id)?;
        Some(version.stages.clone())
    }

    /// Every trait call made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    /// Number of write calls (`put_pending`, `promote`) made so far
    pub fn write_count(&self) -> usize {
        self.state.lock().calls.iter().filter(|c| c.is_write()).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn describe(&self, secret_id: &str) -> StoreResult<SecretDescription> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Describe {
            secret_id: secret_id.to_string(),
        });

        let secret = state.secret(secret_id)?;
        Ok(SecretDescription {
            rotation_enabled: secret.rotation_enabled,
            versions: secret
                .versions
                .iter()
                .filter(|(_, v)| !v.stages.is_empty())
                .map(|(id, v)| (id.clone(), v.stages.clone()))
                .collect(),
            tags: secret.tags.clone(),
        })
    }

    async fn get_current(&self, secret_id: &str) -> StoreResult<SecretString> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::GetCurrent {
            secret_id: secret_id.to_string(),
        });

        let version = state
            .secret(secret_id)?
            .versions
            .values()
            .find(|v| v.stages.contains(&VersionStage::Current))
            .ok_or_else(|| not_found(secret_id, VersionStage::CURRENT))?;
        version
            .reveal()
            .ok_or_else(|| missing_value(secret_id, VersionStage::CURRENT))
    }

    async fn get_by_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> StoreResult<SecretString> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::GetByVersion {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
        });

        let version = state
            .secret(secret_id)?
            .versions
            .get(version_id)
            .ok_or_else(|| not_found(secret_id, version_id))?;
        version
            .reveal()
            .ok_or_else(|| missing_value(secret_id, version_id))
    }

    async fn put_pending(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &SecretString,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::PutPending {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
        });

        let secret = state.secret_mut(secret_id)?;
        if let Some(existing) = secret.versions.get(version_id).and_then(|v| v.value.as_ref()) {
            // Same token and same value is a retry; anything else is a conflict.
            if existing.expose_secret() == value.expose_secret() {
                return Ok(());
            }
            return Err(rejected(
                "put_pending",
                secret_id,
                format!("version {version_id} already exists with a different value"),
            ));
        }

        secret.strip_stage(&VersionStage::Pending);
        let version = secret
            .versions
            .entry(version_id.to_string())
            .or_insert_with(|| MemoryVersion {
                value: None,
                stages: BTreeSet::new(),
            });
        version.value = Some(SecretString::from(value.expose_secret().to_string()));
        version.stages.insert(VersionStage::Pending);
        Ok(())
    }

    async fn promote(
        &self,
        secret_id: &str,
        version_id: &str,
        remove_from: Option<&str>,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Promote {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
            remove_from: remove_from.map(str::to_string),
        });

        let secret = state.secret_mut(secret_id)?;
        if !secret.versions.contains_key(version_id) {
            return Err(not_found(secret_id, version_id));
        }

        let holder = secret
            .versions
            .iter()
            .find(|(_, v)| v.stages.contains(&VersionStage::Current))
            .map(|(id, _)| id.clone());
        if holder.as_deref() != remove_from && holder.as_deref() != Some(version_id) {
            return Err(rejected(
                "promote",
                secret_id,
                format!(
                    "current stage is held by {}, not {}",
                    holder.as_deref().unwrap_or("no version"),
                    remove_from.unwrap_or("no version"),
                ),
            ));
        }

        if let Some(previous) = holder.filter(|h| h != version_id) {
            let previous_stage = VersionStage::Other(VersionStage::PREVIOUS.to_string());
            secret.strip_stage(&previous_stage);
            if let Some(v) = secret.versions.get_mut(&previous) {
                v.stages.remove(&VersionStage::Current);
                v.stages.insert(previous_stage);
            }
        }
        if let Some(v) = secret.versions.get_mut(version_id) {
            v.stages.insert(VersionStage::Current);
        }
        Ok(())
    }
}
