//! Provider block configuration.
//!
//! Every string setting may be omitted from the provider block and supplied
//! through the environment instead, first as `TF_VAR_<name>` and then as
//! `OCI_<NAME>`.

use std::time::Duration;

use serde_json::Value;

use crate::error::ProviderError;
use crate::retry::RetrySettings;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Endpoint used when no `endpoint_template` is configured.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://{service}.{region}.oraclecloud.com";

/// How requests are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    /// API signing key of an IAM user.
    #[default]
    ApiKey,
    /// Session token from `oci session authenticate`.
    SecurityToken,
}

impl AuthType {
    fn parse(value: &str) -> Result<Self, ProviderError> {
        match value {
            "ApiKey" => Ok(Self::ApiKey),
            "SecurityToken" => Ok(Self::SecurityToken),
            other => Err(ProviderError::Configuration(format!(
                "auth must be one of [ApiKey SecurityToken], got {}",
                other
            ))),
        }
    }
}

/// Settings from the provider block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderConfig {
    /// Region identifier, e.g. `us-phoenix-1`.
    pub region: String,
    /// OCID of the tenancy.
    pub tenancy_ocid: Option<String>,
    /// OCID of the signing user.
    pub user_ocid: Option<String>,
    /// Fingerprint of the API signing key.
    pub fingerprint: Option<String>,
    /// Path to the PEM private key.
    pub private_key_path: Option<String>,
    /// Authentication mode.
    pub auth: AuthType,
    /// File holding the session token for `SecurityToken` auth.
    pub security_token_file: Option<String>,
    /// Endpoint template with `{service}` and `{region}` placeholders.
    pub endpoint_template: Option<String>,
    /// Retry knobs.
    pub retry: RetrySettings,
}

const STRING_SETTINGS: &[&str] = &[
    "region",
    "tenancy_ocid",
    "user_ocid",
    "fingerprint",
    "private_key_path",
    "auth",
    "security_token_file",
    "endpoint_template",
];

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        let mut schema = Schema::v0()
            .with_attribute(
                "auth",
                Attribute::optional_string()
                    .with_allowed_values(["ApiKey", "SecurityToken"])
                    .with_description("Authentication mode. Defaults to ApiKey."),
            )
            .with_attribute(
                "disable_auto_retries",
                Attribute::optional_bool()
                    .with_description("Attempt every request exactly once."),
            )
            .with_attribute(
                "retry_duration_seconds",
                Attribute::optional_int64()
                    .with_description("How long retryable errors keep being retried."),
            );
        for name in STRING_SETTINGS.iter().filter(|n| **n != "auth") {
            let attr = if *name == "private_key_path" {
                Attribute::optional_string().sensitive()
            } else {
                Attribute::optional_string()
            };
            schema = schema.with_attribute(*name, attr);
        }
        schema
    }

    /// Parse the provider block, falling back to the process environment.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Parse the provider block with a custom environment lookup.
    pub fn from_value_with_env<E>(config: &Value, env: E) -> Result<Self, ProviderError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let setting = |name: &str| -> Option<String> {
            config
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| env(&format!("TF_VAR_{}", name)))
                .or_else(|| env(&format!("OCI_{}", name.to_uppercase())))
                .filter(|s| !s.is_empty())
        };

        let region = setting("region").ok_or_else(|| {
            ProviderError::Configuration(
                "can not get region from Terraform configuration (region is required)".to_string(),
            )
        })?;
        let auth = match setting("auth") {
            Some(value) => AuthType::parse(&value)?,
            None => AuthType::default(),
        };

        let mut retry = RetrySettings::default();
        if let Some(disable) = config.get("disable_auto_retries").and_then(Value::as_bool) {
            retry.disable_auto_retries = disable;
        }
        if let Some(seconds) = config.get("retry_duration_seconds").and_then(Value::as_i64) {
            if seconds < 0 {
                return Err(ProviderError::Configuration(format!(
                    "retry_duration_seconds must be non-negative, got {}",
                    seconds
                )));
            }
            retry.long_retry_time = Duration::from_secs(seconds as u64);
        }

        let parsed = Self {
            region,
            tenancy_ocid: setting("tenancy_ocid"),
            user_ocid: setting("user_ocid"),
            fingerprint: setting("fingerprint"),
            private_key_path: setting("private_key_path"),
            auth,
            security_token_file: setting("security_token_file"),
            endpoint_template: setting("endpoint_template"),
            retry,
        };
        parsed.check()?;
        Ok(parsed)
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.auth == AuthType::SecurityToken && self.security_token_file.is_none() {
            return Err(ProviderError::Configuration(
                "security_token_file is required when auth is SecurityToken".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate a provider block without building clients.
    pub fn validate(config: &Value) -> Vec<Diagnostic> {
        match Self::from_value(config) {
            Ok(_) => Vec::new(),
            Err(e) => vec![Diagnostic::error("Invalid provider configuration").with_detail(e.message())],
        }
    }

    /// Base URL of a service, e.g. `database` or `dns`.
    pub fn endpoint(&self, service: &str) -> String {
        self.endpoint_template
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT_TEMPLATE)
            .replace("{service}", service)
            .replace("{region}", &self.region)
            .trim_end_matches('/')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_block() {
        let config = ProviderConfig::from_value_with_env(
            &json!({
                "region": "us-phoenix-1",
                "tenancy_ocid": "ocid1.tenancy.oc1..aaaa",
                "disable_auto_retries": true,
                "retry_duration_seconds": 120,
            }),
            env(&[]),
        )
        .unwrap();
        assert_eq!(config.region, "us-phoenix-1");
        assert_eq!(config.tenancy_ocid.as_deref(), Some("ocid1.tenancy.oc1..aaaa"));
        assert_eq!(config.auth, AuthType::ApiKey);
        assert!(config.retry.disable_auto_retries);
        assert_eq!(config.retry.long_retry_time, Duration::from_secs(120));
    }

    #[rstest]
    #[case(&[("TF_VAR_region", "us-ashburn-1"), ("OCI_REGION", "eu-frankfurt-1")], "us-ashburn-1")]
    #[case(&[("OCI_REGION", "eu-frankfurt-1")], "eu-frankfurt-1")]
    fn test_env_fallback(#[case] vars: &[(&str, &str)], #[case] expected: &str) {
        let config = ProviderConfig::from_value_with_env(&json!({}), env(vars)).unwrap();
        assert_eq!(config.region, expected);
    }

    #[test]
    fn test_block_wins_over_env() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"region": "us-phoenix-1"}),
            env(&[("TF_VAR_region", "us-ashburn-1")]),
        )
        .unwrap();
        assert_eq!(config.region, "us-phoenix-1");
    }

    #[test]
    fn test_region_required() {
        let err = ProviderConfig::from_value_with_env(&json!({}), env(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().contains("region"));
    }

    #[test]
    fn test_security_token_auth() {
        let err = ProviderConfig::from_value_with_env(
            &json!({"region": "us-phoenix-1", "auth": "SecurityToken"}),
            env(&[]),
        )
        .unwrap_err();
        assert!(err.message().contains("security_token_file"));

        let config = ProviderConfig::from_value_with_env(
            &json!({"region": "us-phoenix-1", "auth": "SecurityToken"}),
            env(&[("OCI_SECURITY_TOKEN_FILE", "/home/user/.oci/token")]),
        )
        .unwrap();
        assert_eq!(config.auth, AuthType::SecurityToken);

        assert!(ProviderConfig::from_value_with_env(
            &json!({"region": "us-phoenix-1", "auth": "InstancePrincipal"}),
            env(&[]),
        )
        .is_err());
    }

    #[test]
    fn test_endpoint() {
        let mut config = ProviderConfig {
            region: "us-phoenix-1".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint("database"),
            "https://database.us-phoenix-1.oraclecloud.com"
        );

        config.endpoint_template = Some("http://localhost:8080/{service}/".to_string());
        assert_eq!(config.endpoint("dns"), "http://localhost:8080/dns");
    }

    #[test]
    fn test_schema_lists_every_setting() {
        let schema = ProviderConfig::schema();
        for name in STRING_SETTINGS {
            assert!(schema.block.attributes.contains_key(*name), "missing {}", name);
        }
        assert!(schema.block.attributes["private_key_path"].flags.sensitive);
    }
}
