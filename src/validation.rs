//! Validation of configuration values against a [`Schema`].
//!
//! Configuration arrives as JSON. Nested blocks are lists in state
//! (`db_home.0.database.0`), but hosts may send a single block as a bare
//! object; [`normalize_blocks`] rewrites those so every later stage sees the
//! list form.
//!
//! ```
//! use terraform_provider_oci::schema::{Attribute, Schema};
//! use terraform_provider_oci::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("disk_redundancy", Attribute::optional_string()
//!         .with_allowed_values(["HIGH", "NORMAL"]))
//!     .with_attribute("node_count", Attribute::optional_int64());
//!
//! assert!(validate(&schema, &json!({"disk_redundancy": "HIGH", "node_count": "2"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"disk_redundancy": "high"}));
//! assert_eq!(diagnostics[0].attribute, Some("disk_redundancy".to_string()));
//! ```

use std::collections::HashMap;

use serde_json::Value;

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
/// Computed-only attributes are not checked since the provider owns them.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    match value {
        Value::Object(_) | Value::Null => {
            validate_block(&schema.block, value, "", &mut diagnostics)
        },
        other => diagnostics.push(
            Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(other))),
        ),
    }
    diagnostics
}

/// Rewrite single nested blocks given as bare objects into one-element
/// lists, recursively. Values of any other shape are left alone.
pub fn normalize_blocks(block: &Block, value: &mut Value) {
    let Value::Object(obj) = value else {
        return;
    };
    for (name, nested) in &block.blocks {
        let Some(child) = obj.get_mut(name) else {
            continue;
        };
        if child.is_object() && nested.nesting_mode != BlockNestingMode::Map {
            let inner = child.take();
            *child = Value::Array(vec![inner]);
        }
        match child {
            Value::Array(items) => {
                for item in items {
                    normalize_blocks(&nested.block, item);
                }
            },
            Value::Object(map) if nested.nesting_mode == BlockNestingMode::Map => {
                for item in map.values_mut() {
                    normalize_blocks(&nested.block, item);
                }
            },
            _ => {},
        }
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        other => {
            diagnostics.push(
                Diagnostic::error(format!("Expected object for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(other)))
                    .with_attribute(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    let Some(value) = value.filter(|v| !v.is_null()) else {
        if attr.flags.required {
            diagnostics.push(
                Diagnostic::error(format!("Missing required argument '{}'", path))
                    .with_detail("The argument is required, but no definition was found.")
                    .with_attribute(path),
            );
        }
        return;
    };

    let before = diagnostics.len();
    validate_attribute_type(&attr.attr_type, value, path, diagnostics);
    if diagnostics.len() == before && !attr.allowed_values.is_empty() {
        if let Some(s) = value.as_str() {
            if !attr.allowed_values.iter().any(|allowed| allowed == s) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid value for '{}'", path))
                        .with_detail(format!(
                            "expected {} to be one of [{}], got {}",
                            path,
                            attr.allowed_values.join(" "),
                            s
                        ))
                        .with_attribute(path),
                );
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            let numeric_string = value.as_str().is_some_and(|s| s.parse::<f64>().is_ok());
            if !value.is_number() && !numeric_string {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !is_bool(value) {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            let Some(items) = value.as_array() else {
                diagnostics.push(type_error(path, "list", value));
                return;
            };
            for (i, elem) in items.iter().enumerate() {
                validate_attribute_type(element_type, elem, &format!("{}.{}", path, i), diagnostics);
            }
        },
        AttributeType::Map(value_type) => {
            let Some(obj) = value.as_object() else {
                diagnostics.push(type_error(path, "map", value));
                return;
            };
            for (key, val) in obj {
                validate_attribute_type(value_type, val, &format!("{}.{}", path, key), diagnostics);
            }
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object_type(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
        AttributeType::Dynamic => {},
    }
}

fn validate_object_type(
    attrs: &HashMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_attribute_type(attr_type, value, &join_path(path, name), diagnostics);
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let count: usize = match (nested.nesting_mode, value) {
        (_, None | Some(Value::Null)) => 0,
        (BlockNestingMode::Map, Some(Value::Object(obj))) => {
            for (key, item) in obj {
                validate_block(&nested.block, item, &format!("{}.{}", path, key), diagnostics);
            }
            obj.len()
        },
        // A single block may still be a bare object if it was not normalized.
        (BlockNestingMode::Single, Some(obj @ Value::Object(_))) => {
            validate_block(&nested.block, obj, &format!("{}.0", path), diagnostics);
            1
        },
        (BlockNestingMode::Map, Some(_)) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected map for block '{}'", path)).with_attribute(path),
            );
            return;
        },
        (_, Some(Value::Array(items))) => {
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
            items.len()
        },
        (_, Some(other)) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(other)))
                    .with_attribute(path),
            );
            return;
        },
    };
    let count = count as u32;

    if count < nested.min_items {
        let summary = if count == 0 && nested.max_items == 1 {
            format!("Missing required block '{}'", path)
        } else {
            format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, count
            )
        };
        diagnostics.push(Diagnostic::error(summary).with_attribute(path));
    }
    if nested.max_items > 0 && count > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, count
            ))
            .with_attribute(path),
        );
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Hosts send numbers from variables as strings, so "2" is a valid int64.
fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.as_i64().is_some()
                || n.as_f64()
                    .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
        },
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_bool(value: &Value) -> bool {
    matches!(value, Value::Bool(_))
        || matches!(value.as_str(), Some("true") | Some("false"))
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
