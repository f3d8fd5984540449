//! Secret metadata as seen by the rotation orchestrator

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stage label attached to a secret version
///
/// Labels other than the current and pending stages are kept verbatim so
/// they survive a describe, but rotation ignores them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionStage {
    /// `AWSCURRENT`
    Current,
    /// `AWSPENDING`
    Pending,
    /// Any other label, e.g. `AWSPREVIOUS`
    Other(String),
}

impl VersionStage {
    pub const CURRENT: &'static str = "AWSCURRENT";
    pub const PENDING: &'static str = "AWSPENDING";
    pub const PREVIOUS: &'static str = "AWSPREVIOUS";

    /// Wire label of this stage
    pub fn as_str(&self) -> &str {
        match self {
            Self::Current => Self::CURRENT,
            Self::Pending => Self::PENDING,
            Self::Other(label) => label,
        }
    }
}

impl From<&str> for VersionStage {
    fn from(label: &str) -> Self {
        match label {
            Self::CURRENT => Self::Current,
            Self::PENDING => Self::Pending,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for VersionStage {
    fn from(label: String) -> Self {
        match label.as_str() {
            Self::CURRENT => Self::Current,
            Self::PENDING => Self::Pending,
            _ => Self::Other(label),
        }
    }
}

impl From<VersionStage> for String {
    fn from(stage: VersionStage) -> Self {
        stage.as_str().to_string()
    }
}

impl FromStr for VersionStage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl std::fmt::Display for VersionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value tag on a secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretTag {
    pub key: String,
    pub value: String,
}

impl SecretTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of describing a secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretDescription {
    /// Whether automatic rotation is turned on for the secret
    pub rotation_enabled: bool,
    /// Version id to the set of stage labels it carries
    pub versions: BTreeMap<String, BTreeSet<VersionStage>>,
    pub tags: Vec<SecretTag>,
}

impl SecretDescription {
    /// Stage labels of `version_id`, or `None` if the version is not staged
    pub fn stages(&self, version_id: &str) -> Option<&BTreeSet<VersionStage>> {
        self.versions.get(version_id)
    }

    /// The version currently holding [`VersionStage::Current`]
    pub fn current_version(&self) -> Option<&str> {
        self.versions
            .iter()
            .find(|(_, stages)| stages.contains(&VersionStage::Current))
            .map(|(version, _)| version.as_str())
    }

    /// Tags whose key equals `key`
    pub fn tags_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SecretTag> + 'a {
        self.tags.iter().filter(move |tag| tag.key == key)
    }
}
