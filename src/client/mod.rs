//! Typed access to the OCI services the provider manages.
//!
//! Resources talk to the cloud through the [`DatabaseApi`] and [`DnsApi`]
//! traits. The shipped implementations speak REST over `reqwest`; tests use
//! the in-memory fake from [`crate::testing`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde_json::Value;

use crate::config::{AuthType, ProviderConfig};
use crate::error::ProviderError;
use crate::retry::{RetryPolicy, RetrySettings};
use crate::waiter::PollSettings;

/// Declares a lifecycle-state enum with its exact API strings.
///
/// Values the client does not know deserialize to `UnknownValue`.
macro_rules! lifecycle_state {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $(
                #[doc = $text]
                $variant,
            )+
            /// A value added to the API after this client was written.
            UnknownValue,
        }

        impl $name {
            /// The API string of this state.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::UnknownValue => "UNKNOWN_ENUM_VALUE",
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($text => Self::$variant,)+
                    _ => Self::UnknownValue,
                }
            }
        }

        impl From<$name> for String {
            fn from(state: $name) -> String {
                state.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod database;
pub mod dns;
pub mod transport;

pub use database::{DatabaseApi, HttpDatabaseClient};
pub use dns::{DnsApi, HttpDnsClient};
pub use transport::{parse_private_key, HttpSigner, HttpTransport, RequestSigner};

/// Per-request settings every SDK request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Retry policy for this call. `None` means a single attempt.
    pub retry_policy: Option<RetryPolicy>,
}

/// One page of a list operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Token of the next page, from the `opc-next-page` header.
    pub opc_next_page: Option<String>,
}

impl<T> Page<T> {
    /// A final page.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            opc_next_page: None,
        }
    }
}

/// Fetch every page of a list operation.
///
/// `fetch` receives the page token (none for the first page).
pub async fn list_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut items = Vec::new();
    let mut page = None;
    loop {
        let response = fetch(page).await?;
        items.extend(response.items);
        match response.opc_next_page {
            Some(next) if !next.is_empty() => page = Some(next),
            _ => return Ok(items),
        }
    }
}

/// The SDK clients handed to every resource once the provider is configured.
#[derive(Clone)]
pub struct OracleClients {
    /// Database service.
    pub database: Arc<dyn DatabaseApi>,
    /// DNS service.
    pub dns: Arc<dyn DnsApi>,
    /// Retry knobs from the provider block.
    pub retry: RetrySettings,
    /// Lifecycle wait intervals.
    pub poll: PollSettings,
}

impl std::fmt::Debug for OracleClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleClients")
            .field("retry", &self.retry)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl OracleClients {
    /// Clients over the given service implementations.
    pub fn new(database: Arc<dyn DatabaseApi>, dns: Arc<dyn DnsApi>) -> Self {
        Self {
            database,
            dns,
            retry: RetrySettings::default(),
            poll: PollSettings::default(),
        }
    }

    /// Use these retry settings.
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Use these lifecycle poll intervals.
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Build REST clients from the provider configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let signer: Arc<dyn RequestSigner> = match config.auth {
            AuthType::SecurityToken => Arc::new(HttpSigner::session_token(config)?),
            AuthType::ApiKey => Arc::new(HttpSigner::api_key(config)?),
        };

        let database = HttpDatabaseClient::new(HttpTransport::new(
            config.endpoint("database"),
            signer.clone(),
        )?);
        let dns = HttpDnsClient::new(HttpTransport::new(config.endpoint("dns"), signer)?);
        Ok(Self::new(Arc::new(database), Arc::new(dns)).with_retry(config.retry))
    }

    /// Request metadata with the provider's retry policy for `service`.
    pub fn metadata(&self, disable_not_found_retries: bool, service: &str) -> RequestMetadata {
        RequestMetadata {
            retry_policy: Some(self.retry.policy(disable_not_found_retries, service)),
        }
    }
}

/// Render a timestamp the way the SDK prints it into state:
/// `2018-09-14 18:41:05.153 +0000 UTC`.
pub fn format_sdk_time(time: &DateTime<Utc>) -> String {
    let base = time.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos == 0 {
        return format!("{} +0000 UTC", base);
    }
    let fraction = format!("{:09}", nanos);
    format!("{}.{} +0000 UTC", base, fraction.trim_end_matches('0'))
}

/// Optional timestamp as a state value.
pub fn sdk_time_value(time: Option<&DateTime<Utc>>) -> Value {
    time.map(|t| Value::String(format_sdk_time(t)))
        .unwrap_or(Value::Null)
}

/// Defined tags as written to state: `"namespace.key" => "value"`.
pub fn defined_tags_to_map(tags: &HashMap<String, HashMap<String, Value>>) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    for (namespace, entries) in tags {
        for (key, value) in entries {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            flat.insert(format!("{}.{}", namespace, key), value);
        }
    }
    flat
}

/// Defined tags from state back to the API's nested form.
pub fn map_to_defined_tags(
    flat: &HashMap<String, String>,
) -> Result<HashMap<String, HashMap<String, Value>>, ProviderError> {
    let mut tags: HashMap<String, HashMap<String, Value>> = HashMap::new();
    for (name, value) in flat {
        let (namespace, key) = name.split_once('.').ok_or_else(|| {
            ProviderError::Validation(format!(
                "invalid defined tag '{}': expected namespace.key",
                name
            ))
        })?;
        tags.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), Value::String(value.clone()));
    }
    Ok(tags)
}
