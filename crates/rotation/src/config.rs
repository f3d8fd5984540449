//! Rotation configuration
//!
//! Required settings are validated before any network call. Environment
//! variable names double as field names in error messages so operators can
//! see at once what to set.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tailrotate_tailscale::DEFAULT_API_URL;

/// Default timeout for every Tailscale API request
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const MIN_HTTP_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is empty or absent
    #[error("Missing required configuration: {field}. {hint}")]
    MissingRequired {
        field: &'static str,
        hint: &'static str,
    },

    /// A setting is present but unusable
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Settings for one rotation invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Secret holding the OAuth client credentials (`OAUTH_SECRET_ARN`)
    pub oauth_secret_arn: String,
    /// Tailnet the keys are issued in (`TAILNET`)
    pub tailnet: String,
    /// ACL tag applied to issued keys, without the `tag:` prefix (`TAG_NAME`)
    pub tag_name: String,
    /// API root (`TAILSCALE_API_URL`)
    pub tailscale_api_url: String,
    /// Per-request timeout (`TAILSCALE_HTTP_TIMEOUT`, e.g. `10s`)
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            oauth_secret_arn: String::new(),
            tailnet: String::new(),
            tag_name: String::new(),
            tailscale_api_url: DEFAULT_API_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl RotationConfig {
    /// Environment variable read for each field
    pub const ENV_VARS: [(&'static str, &'static str); 5] = [
        ("OAUTH_SECRET_ARN", "oauth_secret_arn"),
        ("TAILNET", "tailnet"),
        ("TAG_NAME", "tag_name"),
        ("TAILSCALE_API_URL", "tailscale_api_url"),
        ("TAILSCALE_HTTP_TIMEOUT", "http_timeout"),
    ];

    /// Variables present in `lookup`, keyed by field name
    ///
    /// Values stay strings, so a numeric tag or tailnet name is kept as
    /// written. Meant to be merged over defaults and deserialized; call
    /// [`RotationConfig::validate`] on the result.
    pub fn env_overrides<F>(lookup: F) -> BTreeMap<&'static str, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::ENV_VARS
            .iter()
            .filter_map(|(var, field)| lookup(var).map(|value| (*field, value)))
            .collect()
    }

    /// Check required settings, in the order OAuth secret, tailnet, tag
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth_secret_arn.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "OAUTH_SECRET_ARN",
                hint: "Could not determine what Tailscale OAuth Secret to read.",
            });
        }
        if self.tailnet.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "TAILNET",
                hint: "Could not determine what Tailscale TailNet to use.",
            });
        }
        if self.tag_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "TAG_NAME",
                hint: "Could not determine what Tailscale Tag Name to apply.",
            });
        }

        let url = url::Url::parse(&self.tailscale_api_url).map_err(|e| {
            ConfigError::InvalidValue {
                field: "TAILSCALE_API_URL",
                reason: e.to_string(),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "TAILSCALE_API_URL",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.http_timeout < MIN_HTTP_TIMEOUT || self.http_timeout > MAX_HTTP_TIMEOUT {
            return Err(ConfigError::InvalidValue {
                field: "TAILSCALE_HTTP_TIMEOUT",
                reason: "must be between 1 and 60 seconds".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn complete() -> RotationConfig {
        RotationConfig {
            oauth_secret_arn: "arn:aws:secretsmanager:eu-west-1:123456789012:secret:oauth".into(),
            tailnet: "example.com".into(),
            tag_name: "fleet".into(),
            ..RotationConfig::default()
        }
    }

    fn from_lookup(pairs: &[(&str, &str)]) -> RotationConfig {
        let mut value = serde_json::to_value(RotationConfig::default()).unwrap();
        for (field, v) in RotationConfig::env_overrides(lookup_from(pairs)) {
            value[field] = serde_json::Value::String(v);
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reads_all_variables() {
        let config = from_lookup(&[
            ("OAUTH_SECRET_ARN", "arn:oauth"),
            ("TAILNET", "example.com"),
            ("TAG_NAME", "fleet"),
            ("TAILSCALE_API_URL", "http://localhost:8080/api/v2"),
            ("TAILSCALE_HTTP_TIMEOUT", "30s"),
        ]);

        assert_eq!(config.oauth_secret_arn, "arn:oauth");
        assert_eq!(config.tailnet, "example.com");
        assert_eq!(config.tag_name, "fleet");
        assert_eq!(config.tailscale_api_url, "http://localhost:8080/api/v2");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn numeric_names_stay_strings() {
        let overrides = RotationConfig::env_overrides(lookup_from(&[
            ("TAILNET", "42"),
            ("TAG_NAME", "2024"),
        ]));
        assert_eq!(
            overrides,
            BTreeMap::from([("tag_name", "2024".to_string()), ("tailnet", "42".to_string())])
        );

        let config = from_lookup(&[
            ("OAUTH_SECRET_ARN", "arn:oauth"),
            ("TAILNET", "42"),
            ("TAG_NAME", "2024"),
        ]);
        assert_eq!(config.tag_name, "2024");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn defaults_apply_when_optional_variables_are_absent() {
        assert!(RotationConfig::env_overrides(lookup_from(&[])).is_empty());
        let config = from_lookup(&[]);
        assert_eq!(config.tailscale_api_url, "https://api.tailscale.com/api/v2");
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        let err = RotationConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRequired {
                field: "OAUTH_SECRET_ARN",
                ..
            }
        ));
        assert!(err.to_string().contains("Tailscale OAuth Secret"));

        let config = RotationConfig {
            tailnet: String::new(),
            tag_name: String::new(),
            ..complete()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { field: "TAILNET", .. })
        ));

        let config = RotationConfig {
            tag_name: "  ".into(),
            ..complete()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { field: "TAG_NAME", .. })
        ));
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://api.tailscale.com/api/v2")]
    fn bad_api_url_is_invalid(#[case] url: &str) {
        let config = RotationConfig {
            tailscale_api_url: url.into(),
            ..complete()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "TAILSCALE_API_URL",
                ..
            })
        ));
    }

    #[rstest]
    #[case(Duration::from_millis(500), false)]
    #[case(Duration::from_secs(1), true)]
    #[case(Duration::from_secs(60), true)]
    #[case(Duration::from_secs(61), false)]
    fn timeout_bounds(#[case] timeout: Duration, #[case] valid: bool) {
        let config = RotationConfig {
            http_timeout: timeout,
            ..complete()
        };
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn deserializes_humantime_timeout() {
        let config: RotationConfig =
            serde_json::from_str(r#"{"tailnet": "example.com", "http_timeout": "15s"}"#).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.tailscale_api_url, DEFAULT_API_URL);
    }
}
