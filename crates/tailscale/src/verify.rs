//! Verification of a described key against the rotation requirements

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{CapabilityProblem, VerifyError};
use crate::types::{KeyDescription, KeyUsage, required_tag};

/// Lifetime requested for newly issued keys (90 days)
pub const KEY_DEFAULT_LIFETIME_SECS: u64 = 90 * 24 * 3600;

/// A verified key must stay valid at least this many days from now
pub const KEY_MINIMUM_FUTURE_VALIDITY_DAYS: i64 = 60;

impl KeyDescription {
    /// Check this key against `usage` and the required tag at instant `now`
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// expiry, minimum future validity, revocation, reusable flag,
    /// ephemeral flag, tag.
    pub fn check(
        &self,
        usage: KeyUsage,
        tag_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VerifyError> {
        if self.expires < now {
            return Err(VerifyError::Expired {
                expires: self.expires,
            });
        }

        let valid_until = now + TimeDelta::days(KEY_MINIMUM_FUTURE_VALIDITY_DAYS);
        if self.expires < valid_until {
            return Err(VerifyError::ExpiringTooSoon {
                expires: self.expires,
                min_days: KEY_MINIMUM_FUTURE_VALIDITY_DAYS,
            });
        }

        if let Some(revoked) = self.revoked
            && revoked < valid_until
        {
            return Err(VerifyError::RevokedTooSoon { revoked });
        }

        let create = &self.capabilities.devices.create;
        let should_be_reusable = usage.is_reusable();
        if create.reusable != Some(should_be_reusable) {
            return Err(self.mismatch(if should_be_reusable {
                CapabilityProblem::NotReusable
            } else {
                CapabilityProblem::UnexpectedlyReusable
            }));
        }

        if create.ephemeral != Some(true) {
            return Err(self.mismatch(CapabilityProblem::NotEphemeral));
        }

        let tag = required_tag(tag_name);
        let tagged = create
            .tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| *t == tag));
        if !tagged {
            return Err(self.mismatch(CapabilityProblem::NotTagged));
        }

        Ok(())
    }

    fn mismatch(&self, problem: CapabilityProblem) -> VerifyError {
        VerifyError::CapabilityMismatch {
            id: self.id.clone(),
            problem,
            capabilities: serde_json::to_string(&self.capabilities).unwrap_or_default(),
        }
    }
}
