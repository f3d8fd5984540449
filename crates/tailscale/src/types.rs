//! Tailscale v2 API wire types and the stored key value

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verify::KEY_DEFAULT_LIFETIME_SECS;

/// How an issued key may be used by devices
///
/// Serialized with the `Purpose` tag vocabulary: `Cattle` keys are shared by
/// a fleet and therefore reusable, `Pet` keys enrol exactly one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUsage {
    /// Key may enrol any number of devices
    #[serde(rename = "Cattle")]
    Reusable,
    /// Key is consumed by the first device that enrols with it
    #[serde(rename = "Pet")]
    SingleUse,
}

impl KeyUsage {
    /// Derive the usage from the value of a `Purpose` tag
    ///
    /// Only the exact value `Cattle` selects [`KeyUsage::Reusable`]; anything
    /// else, including an absent tag, is [`KeyUsage::SingleUse`].
    #[must_use]
    pub fn from_purpose(purpose: Option<&str>) -> Self {
        match purpose {
            Some("Cattle") => Self::Reusable,
            _ => Self::SingleUse,
        }
    }

    /// Whether keys with this usage carry `reusable = true`
    #[inline]
    #[must_use]
    pub fn is_reusable(self) -> bool {
        matches!(self, Self::Reusable)
    }
}

impl std::fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reusable => write!(f, "reusable"),
            Self::SingleUse => write!(f, "single-use"),
        }
    }
}

/// Device creation capabilities of an auth key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCreateCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reusable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preauthorized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    #[serde(default)]
    pub create: DeviceCreateCapabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub devices: DeviceCapabilities,
}

impl Capabilities {
    /// Capabilities requested for every key this crate issues
    #[must_use]
    pub fn for_usage(usage: KeyUsage, tag_name: &str) -> Self {
        Self {
            devices: DeviceCapabilities {
                create: DeviceCreateCapabilities {
                    reusable: Some(usage.is_reusable()),
                    ephemeral: Some(true),
                    preauthorized: Some(false),
                    tags: Some(vec![required_tag(tag_name)]),
                },
            },
        }
    }
}

/// The ACL tag every issued key must carry
pub(crate) fn required_tag(tag_name: &str) -> String {
    format!("tag:{tag_name}")
}

/// Body of `POST /tailnet/{tailnet}/keys`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateKeyRequest {
    pub capabilities: Capabilities,
    #[serde(rename = "expirySeconds")]
    pub expiry_seconds: u64,
}

impl CreateKeyRequest {
    /// Request an ephemeral, non-preauthorized, tagged key with the default lifetime
    #[must_use]
    pub fn new(usage: KeyUsage, tag_name: &str) -> Self {
        Self {
            capabilities: Capabilities::for_usage(usage, tag_name),
            expiry_seconds: KEY_DEFAULT_LIFETIME_SECS,
        }
    }
}

/// Response of `GET /tailnet/{tailnet}/keys/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyDescription {
    pub id: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub revoked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub capabilities: Capabilities,
}

/// Response of `POST /tailnet/{tailnet}/keys`
#[derive(Deserialize)]
pub(crate) struct CreateKeyResponse {
    #[serde(flatten)]
    pub description: KeyDescription,
    pub key: String,
}

impl CreateKeyResponse {
    /// Keep only what devices need; capabilities are not echoed into the secret
    pub(crate) fn into_client_key(self) -> ClientKey {
        ClientKey {
            id: self.description.id,
            key: self.key,
            created: self.description.created,
            expires: self.description.expires,
        }
    }
}

/// The rotating secret value: an issued auth key
///
/// Stored JSON-encoded as `{"id", "key", "created", "expires"}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientKey {
    pub id: String,
    pub key: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl std::fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientKey")
            .field("id", &self.id)
            .field("key", &"[REDACTED]")
            .field("created", &self.created)
            .field("expires", &self.expires)
            .finish()
    }
}
