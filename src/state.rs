//! Attribute access over a resource's JSON state.
//!
//! [`ResourceData`] wraps the object the host sends for a resource and offers
//! path-based getters in the style of Terraform's `ResourceData`. Nested blocks
//! are always lists in state, so paths carry an index:
//! `db_home.0.database.0.db_name`.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::types::ResourceTimeouts;

/// Look up a dotted path inside a JSON value.
///
/// Numeric segments index into arrays; every other segment is an object key,
/// so map attributes can be addressed directly (`freeform_tags.Department`).
/// JSON `null` is treated as absent.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Whether a value is Terraform's zero value for its type.
pub fn is_zero_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// The attribute bag of one resource or data source.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    current: Map<String, Value>,
    prior: Option<Value>,
    timeouts: ResourceTimeouts,
}

impl ResourceData {
    /// Data for a planned resource or a data source configuration.
    pub fn new(planned: Value) -> Self {
        Self {
            current: into_object(planned),
            prior: None,
            timeouts: ResourceTimeouts::default(),
        }
    }

    /// Data for an existing resource; the state is also the prior state.
    pub fn from_state(state: Value) -> Self {
        Self {
            prior: Some(state.clone()),
            ..Self::new(state)
        }
    }

    /// Data for an update from `prior` to `planned`.
    pub fn for_update(prior: Value, planned: Value) -> Self {
        Self {
            prior: Some(prior),
            ..Self::new(planned)
        }
    }

    /// Resolve per-operation timeouts from `defaults` and the `timeouts` block.
    pub fn with_timeouts(mut self, defaults: ResourceTimeouts) -> Result<Self, ProviderError> {
        self.timeouts = defaults.with_overrides(self.current.get("timeouts"))?;
        Ok(self)
    }

    /// Timeouts for this resource's operations.
    pub fn timeouts(&self) -> ResourceTimeouts {
        self.timeouts
    }

    /// The resource id; empty when the resource does not exist.
    pub fn id(&self) -> &str {
        self.current
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Set the resource id. An empty id marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.current.insert("id".to_string(), Value::String(id.into()));
    }

    /// The value at a path, if set and not null.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.current.get(head)?;
        match rest {
            Some(rest) => lookup_path(value, rest),
            None if value.is_null() => None,
            None => Some(value),
        }
    }

    /// The value at a path when it is set to something other than its zero value.
    pub fn get_ok(&self, path: &str) -> Option<&Value> {
        self.get(path).filter(|v| !is_zero_value(v))
    }

    /// The value at a path when it is set, zero values included.
    pub fn get_ok_exists(&self, path: &str) -> Option<&Value> {
        self.get(path)
    }

    /// A non-empty string at a path. Numbers and booleans are stringified.
    pub fn get_string(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// An integer at a path; numeric strings are accepted.
    pub fn get_i64(&self, path: &str) -> Option<i64> {
        match self.get(path)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A boolean at a path; `"true"` and `"false"` are accepted.
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        match self.get(path)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The strings of a list attribute; empty when unset.
    pub fn get_string_list(&self, path: &str) -> Vec<String> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The entries of a string map attribute; empty when unset.
    pub fn get_string_map(&self, path: &str) -> HashMap<String, String> {
        self.get(path)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the value at a path differs from the prior state.
    ///
    /// Without a prior state every non-null value counts as a change.
    pub fn has_change(&self, path: &str) -> bool {
        let (old, new) = self.get_change(path);
        old != new
    }

    /// The prior and current values at a path.
    pub fn get_change(&self, path: &str) -> (Option<&Value>, Option<&Value>) {
        let old = self.prior.as_ref().and_then(|p| lookup_path(p, path));
        (old, self.get(path))
    }

    /// The prior state, when there is one.
    pub fn prior(&self) -> Option<&Value> {
        self.prior.as_ref()
    }

    /// Set a top-level attribute.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.current.insert(key.to_string(), value.into());
    }

    /// Set a top-level map attribute from string pairs.
    pub fn set_string_map(&mut self, key: &str, map: &HashMap<String, String>) {
        let object: Map<String, Value> = map
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.current.insert(key.to_string(), Value::Object(object));
    }

    /// The state to hand back to the host: `null` once the resource is gone.
    pub fn into_state(self) -> Value {
        if self.id().is_empty() {
            Value::Null
        } else {
            Value::Object(self.current)
        }
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
