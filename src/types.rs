//! Convenience types shared by the server, planner and resources.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Dotted path to the attribute, e.g. `db_home.0.display_name`.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

fn decode_optional(bytes: &[u8]) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(bytes).ok()
    }
}

fn encode_optional(value: Option<serde_json::Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(&v).ok())
        .unwrap_or_default()
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            path: proto.path,
            before: decode_optional(&proto.before),
            after: decode_optional(&proto.after),
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: encode_optional(change.before),
            after: encode_optional(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource must be destroyed and created again.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether the plan changes anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
}

/// Version of the plugin handshake line format.
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Version of the provider gRPC protocol served by this binary.
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable the host sets before launching a plugin.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";

/// Expected value of [`MAGIC_COOKIE_KEY`].
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Build the handshake line printed to stdout once the server is listening.
///
/// Format: `<core version>|<app version>|tcp|<address>|grpc`.
pub fn handshake_line(addr: &std::net::SocketAddr) -> String {
    format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PROTOCOL_VERSION, addr
    )
}

/// Default timeout for every resource operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Per-operation timeouts for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeouts {
    /// Create timeout.
    pub create: Duration,
    /// Update timeout.
    pub update: Duration,
    /// Delete timeout.
    pub delete: Duration,
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

impl ResourceTimeouts {
    /// The same timeout for every operation.
    pub const fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    /// Apply a `timeouts` block from configuration on top of these defaults.
    ///
    /// Missing or empty entries keep the default; malformed ones are errors.
    pub fn with_overrides(
        mut self,
        block: Option<&serde_json::Value>,
    ) -> Result<Self, ProviderError> {
        let Some(block) = block.and_then(timeouts_object) else {
            return Ok(self);
        };
        for (key, slot) in [
            ("create", &mut self.create),
            ("update", &mut self.update),
            ("delete", &mut self.delete),
        ] {
            if let Some(raw) = block.get(key).and_then(|v| v.as_str()) {
                if !raw.is_empty() {
                    *slot = parse_duration(raw).map_err(|e| {
                        ProviderError::Validation(format!("timeouts.{}: {}", key, e.message()))
                    })?;
                }
            }
        }
        Ok(self)
    }
}

// A single `timeouts` block may arrive as an object or a one-element list.
fn timeouts_object(
    value: &serde_json::Value,
) -> Option<&serde_json::Map<String, serde_json::Value>> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        serde_json::Value::Array(items) => items.first().and_then(|v| v.as_object()),
        _ => None,
    }
}

/// Parse a Go-style duration string such as `"2h"`, `"1h30m"`, `"90s"` or
/// `"1.5h"`. Supported units: `h`, `m`, `s`, `ms`.
pub fn parse_duration(input: &str) -> Result<Duration, ProviderError> {
    let invalid = || ProviderError::Validation(format!("invalid duration \"{}\"", input));
    let s = input.trim();
    if s.is_empty() {
        return Err(invalid());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if num_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        total += match &rest[..unit_len] {
            "h" => value * 3600.0,
            "m" => value * 60.0,
            "s" => value,
            "ms" => value / 1000.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
    }
    Ok(Duration::from_secs_f64(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("display_name", json!("tfDbSystem"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("tfDbSystem")));

        let removed = AttributeChange::removed("id", json!("ocid1.dbsystem.oc1..a"));
        assert_eq!(removed.before, Some(json!("ocid1.dbsystem.oc1..a")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("cpu_core_count", json!(2), json!(4));
        assert_eq!(modified.before, Some(json!(2)));
        assert_eq!(modified.after, Some(json!(4)));
    }

    #[test]
    fn test_attribute_change_proto_conversion_keeps_missing_sides_empty() {
        let change = AttributeChange::added("shape", json!("BM.DenseIO2.52"));
        let proto: crate::generated::AttributeChange = change.clone().into();
        assert!(proto.before.is_empty());
        assert_eq!(proto.after, br#""BM.DenseIO2.52""#.to_vec());

        let back: AttributeChange = proto.into();
        assert_eq!(back, change);
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "123"}));
        assert!(!no_change.has_changes());
        assert!(!no_change.requires_replace);

        let replace = PlanResult::with_changes(
            json!({"id": "123", "shape": "VM.Standard2.1"}),
            vec![AttributeChange::modified(
                "shape",
                json!("VM.Standard1.1"),
                json!("VM.Standard2.1"),
            )],
            true,
        );
        assert!(replace.has_changes());
        assert!(replace.requires_replace);
    }

    #[test]
    fn test_handshake_line() {
        let addr: std::net::SocketAddr = "127.0.0.1:4321".parse().unwrap();
        assert_eq!(handshake_line(&addr), "1|1|tcp|127.0.0.1:4321|grpc");
    }

    #[rstest]
    #[case("2h", 7200)]
    #[case("90m", 5400)]
    #[case("1h30m", 5400)]
    #[case("45s", 45)]
    #[case("1.5h", 5400)]
    #[case("0", 0)]
    fn test_parse_duration(#[case] input: &str, #[case] seconds: u64) {
        assert_eq!(parse_duration(input).unwrap(), Duration::from_secs(seconds));
    }

    #[test]
    fn test_parse_duration_millis() {
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
    }

    #[rstest]
    #[case("")]
    #[case("10")]
    #[case("h")]
    #[case("3d")]
    #[case("1h-5m")]
    fn test_parse_duration_rejects(#[case] input: &str) {
        assert!(parse_duration(input).is_err());
    }

    #[test]
    fn test_timeouts_overrides() {
        let defaults = ResourceTimeouts::uniform(Duration::from_secs(2 * 3600));
        let block = json!({"create": "3h", "update": "", "delete": null});
        let timeouts = defaults.with_overrides(Some(&block)).unwrap();
        assert_eq!(timeouts.create, Duration::from_secs(3 * 3600));
        assert_eq!(timeouts.update, Duration::from_secs(2 * 3600));
        assert_eq!(timeouts.delete, Duration::from_secs(2 * 3600));

        let listed = json!([{"delete": "30m"}]);
        let timeouts = ResourceTimeouts::default().with_overrides(Some(&listed)).unwrap();
        assert_eq!(timeouts.delete, Duration::from_secs(30 * 60));
        assert_eq!(timeouts.create, DEFAULT_TIMEOUT);

        let bad = json!({"create": "soon"});
        assert!(ResourceTimeouts::default().with_overrides(Some(&bad)).is_err());
    }
}
