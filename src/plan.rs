//! Schema-driven planning.
//!
//! Compares prior state with the proposed configuration attribute by
//! attribute, produces the planned state and reports whether any change
//! touches a force-new attribute.

use serde_json::{Map, Value};

use crate::schema::{Block, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan a create, update or delete of one resource.
///
/// `proposed` must already have its nested blocks normalized to lists.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());
    match (prior, proposed) {
        (Some(prior), Value::Null) => {
            let id = prior.get("id").cloned().unwrap_or(Value::Null);
            PlanResult::with_changes(Value::Null, vec![AttributeChange::removed("id", id)], false)
        },
        (None, _) => plan_create(&schema.block, proposed),
        (Some(prior), _) => plan_update(schema, prior, proposed),
    }
}

fn plan_create(block: &Block, proposed: &Value) -> PlanResult {
    let planned = merge_block(block, None, proposed);
    let mut changes = Vec::new();
    if let Value::Object(map) = &planned {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            if !map[key].is_null() {
                changes.push(AttributeChange::added(key.as_str(), map[key].clone()));
            }
        }
    }
    PlanResult::with_changes(planned, changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let planned = merge_block(&schema.block, Some(prior), proposed);
    let mut changes = Vec::new();
    diff_block(&schema.block, "", prior, &planned, &mut changes);
    let requires_replace = changes.iter().any(|c| schema.requires_replace(&c.path));
    PlanResult::with_changes(planned, changes, requires_replace)
}

/// Build the planned object for a block.
///
/// Computed-only attributes, and optional+computed attributes left unset,
/// keep their prior value (null on create). Nested blocks merge element-wise.
fn merge_block(block: &Block, prior: Option<&Value>, proposed: &Value) -> Value {
    let proposed_map = proposed.as_object();
    let prior_map = prior.and_then(Value::as_object);
    let from_proposed = |key: &str| {
        proposed_map
            .and_then(|m| m.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    };
    let from_prior = |key: &str| {
        prior_map
            .and_then(|m| m.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    };

    let mut planned = Map::new();
    for (name, attr) in &block.attributes {
        let value = if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
            from_prior(name)
        } else {
            match from_proposed(name) {
                Value::Null if attr.flags.computed => from_prior(name),
                Value::Null => attr.default.clone().unwrap_or(Value::Null),
                value => value,
            }
        };
        planned.insert(name.clone(), value);
    }

    for (name, nested) in &block.blocks {
        let proposed_value = from_proposed(name);
        let prior_value = from_prior(name);
        let value = match (&proposed_value, &prior_value) {
            (Value::Null, _) => prior_value.clone(),
            (Value::Array(items), prior_items) => {
                let prior_items = prior_items.as_array();
                Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            merge_block(&nested.block, prior_items.and_then(|p| p.get(i)), item)
                        })
                        .collect(),
                )
            },
            _ => proposed_value.clone(),
        };
        planned.insert(name.clone(), value);
    }

    // `id` is never configured; it follows the prior state.
    if !planned.contains_key("id") {
        if let Some(id) = prior_map.and_then(|m| m.get("id")) {
            planned.insert("id".to_string(), id.clone());
        }
    }
    Value::Object(planned)
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn diff_block(block: &Block, prefix: &str, prior: &Value, planned: &Value, out: &mut Vec<AttributeChange>) {
    let get = |v: &Value, key: &str| v.get(key).cloned().unwrap_or(Value::Null);

    let mut names: Vec<&String> = block.attributes.keys().collect();
    names.sort();
    for name in names {
        let (before, after) = (get(prior, name), get(planned, name));
        if before != after {
            out.push(change(join(prefix, name), before, after));
        }
    }

    let mut names: Vec<&String> = block.blocks.keys().collect();
    names.sort();
    for name in names {
        let nested = &block.blocks[name];
        let path = join(prefix, name);
        match (get(prior, name), get(planned, name)) {
            (Value::Array(before), Value::Array(after)) => {
                for i in 0..before.len().max(after.len()) {
                    let item_path = format!("{}.{}", path, i);
                    match (before.get(i), after.get(i)) {
                        (Some(b), Some(a)) => diff_block(&nested.block, &item_path, b, a, out),
                        (Some(b), None) => out.push(AttributeChange::removed(item_path, b.clone())),
                        (None, Some(a)) => out.push(AttributeChange::added(item_path, a.clone())),
                        (None, None) => {},
                    }
                }
            },
            (before, after) if before != after => out.push(change(path, before, after)),
            _ => {},
        }
    }
}

fn change(path: String, before: Value, after: Value) -> AttributeChange {
    match (before, after) {
        (Value::Null, after) => AttributeChange::added(path, after),
        (before, Value::Null) => AttributeChange::removed(path, before),
        (before, after) => AttributeChange::modified(path, before, after),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock};
    use serde_json::json;

    fn schema() -> Schema {
        let database = Block::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("db_name", Attribute::optional_string().with_force_new())
            .with_attribute(
                "admin_password",
                Attribute::required_string().sensitive().with_force_new(),
            )
            .with_block(
                "db_backup_config",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("auto_backup_enabled", Attribute::optional_computed_bool()),
                ),
            );
        let db_home = Block::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "db_version",
                Attribute::optional_computed_string().with_force_new(),
            )
            .with_block("database", NestedBlock::required_single(database).with_force_new());

        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("shape", Attribute::required_string().with_force_new())
            .with_attribute("cpu_core_count", Attribute::optional_computed_int64())
            .with_attribute("display_name", Attribute::optional_computed_string().with_force_new())
            .with_attribute("state", Attribute::computed_string())
            .with_block("db_home", NestedBlock::required_single(db_home).with_force_new())
    }

    fn prior() -> Value {
        json!({
            "id": "ocid1.dbsystem.oc1..aaaa",
            "shape": "BM.DenseIO2.52",
            "cpu_core_count": 2,
            "display_name": "tfDbSystem",
            "state": "AVAILABLE",
            "db_home": [{
                "id": "ocid1.dbhome.oc1..aaaa",
                "db_version": "12.1.0.2",
                "database": [{
                    "id": "ocid1.database.oc1..aaaa",
                    "db_name": "aTFdb",
                    "admin_password": "BEstrO0ng_#11",
                    "db_backup_config": [{"auto_backup_enabled": false}],
                }],
            }],
        })
    }

    fn config() -> Value {
        json!({
            "shape": "BM.DenseIO2.52",
            "cpu_core_count": 2,
            "db_home": [{
                "db_version": "12.1.0.2",
                "database": [{
                    "db_name": "aTFdb",
                    "admin_password": "BEstrO0ng_#11",
                    "db_backup_config": [{"auto_backup_enabled": false}],
                }],
            }],
        })
    }

    #[test]
    fn test_plan_create() {
        let plan = plan_resource(&schema(), None, &config());
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_eq!(plan.planned_state["state"], Value::Null);
        assert_eq!(plan.planned_state["display_name"], Value::Null);
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["cpu_core_count", "db_home", "shape"]);
        assert!(plan.changes.iter().all(|c| c.before.is_none()));
    }

    #[test]
    fn test_plan_no_change_keeps_computed() {
        let plan = plan_resource(&schema(), Some(&prior()), &config());
        assert!(!plan.has_changes(), "changes: {:?}", plan.changes);
        assert_eq!(plan.planned_state["id"], "ocid1.dbsystem.oc1..aaaa");
        assert_eq!(plan.planned_state["display_name"], "tfDbSystem");
        assert_eq!(plan.planned_state["state"], "AVAILABLE");
        assert_eq!(
            plan.planned_state["db_home"][0]["database"][0]["id"],
            "ocid1.database.oc1..aaaa"
        );
    }

    #[test]
    fn test_in_place_update() {
        let mut proposed = config();
        proposed["cpu_core_count"] = json!(4);
        proposed["db_home"][0]["database"][0]["db_backup_config"][0]["auto_backup_enabled"] =
            json!(true);

        let plan = plan_resource(&schema(), Some(&prior()), &proposed);
        assert!(!plan.requires_replace);
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "cpu_core_count",
                "db_home.0.database.0.db_backup_config.0.auto_backup_enabled",
            ]
        );
        assert_eq!(
            plan.changes[0],
            AttributeChange::modified("cpu_core_count", json!(2), json!(4))
        );
    }

    #[test]
    fn test_nested_force_new() {
        let mut proposed = config();
        proposed["db_home"][0]["database"][0]["db_name"] = json!("dbback");

        let plan = plan_resource(&schema(), Some(&prior()), &proposed);
        assert!(plan.requires_replace);
        assert_eq!(plan.changes[0].path, "db_home.0.database.0.db_name");
    }

    #[test]
    fn test_top_level_force_new() {
        let mut proposed = config();
        proposed["shape"] = json!("BM.DenseIO2.24");
        let plan = plan_resource(&schema(), Some(&prior()), &proposed);
        assert!(plan.requires_replace);
    }

    #[test]
    fn test_plan_delete() {
        let plan = plan_resource(&schema(), Some(&prior()), &Value::Null);
        assert_eq!(plan.planned_state, Value::Null);
        assert_eq!(
            plan.changes,
            vec![AttributeChange::removed("id", json!("ocid1.dbsystem.oc1..aaaa"))]
        );
    }
}
