//! Rotation steps and the event that triggers them

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One phase of the rotation protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationStep {
    /// Issue a new key and store it as the pending version
    CreateSecret,
    /// Validate the pending key; nothing external needs setting
    SetSecret,
    /// Validate the pending key
    TestSecret,
    /// Move the current stage to the pending version
    FinishSecret,
}

impl RotationStep {
    pub const ALL: [Self; 4] = [
        Self::CreateSecret,
        Self::SetSecret,
        Self::TestSecret,
        Self::FinishSecret,
    ];

    /// Wire name of the step
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateSecret => "createSecret",
            Self::SetSecret => "setSecret",
            Self::TestSecret => "testSecret",
            Self::FinishSecret => "finishSecret",
        }
    }
}

impl std::fmt::Display for RotationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step name outside the four known ones
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown rotation step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for RotationStep {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}

/// Rotation request as sent by the secret store's rotation scheduler
///
/// The step stays a raw string: it is only interpreted after the rotation
/// preconditions have been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RotationEvent {
    pub secret_id: String,
    pub client_request_token: String,
    pub step: String,
}
