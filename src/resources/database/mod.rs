//! Database service resources and data sources.

use serde_json::{json, Value};

use super::Fields;
use crate::client::database::{Backup, Database, DbHome, DbNode, DbSystem};
use crate::client::{defined_tags_to_map, sdk_time_value};
use crate::schema::AttributeType::{self, Bool, Float64, Int64, String as Str};

mod backups;
mod databases;
mod db_homes;
mod db_nodes;
mod db_system;
mod db_systems;

pub use backups::BackupsDataSource;
pub use databases::{DatabaseDataSource, DatabasesDataSource};
pub use db_homes::{DbHomeDataSource, DbHomesDataSource};
pub use db_nodes::{DbNodeDataSource, DbNodesDataSource};
pub use db_system::{DbSystemResource, DbSystemResourceCrud};
pub use db_systems::DbSystemsDataSource;

pub(crate) const SERVICE: &str = "database";

fn string_list() -> AttributeType {
    AttributeType::list(Str)
}

fn string_map() -> AttributeType {
    AttributeType::map(Str)
}

fn object_list(fields: Fields) -> AttributeType {
    AttributeType::list(AttributeType::object(
        fields
            .into_iter()
            .map(|(name, attr_type)| (name.to_string(), attr_type))
            .collect(),
    ))
}

pub(crate) fn db_system_fields() -> Fields {
    vec![
        ("id", Str),
        ("availability_domain", Str),
        ("backup_subnet_id", Str),
        ("cluster_name", Str),
        ("compartment_id", Str),
        ("cpu_core_count", Int64),
        ("data_storage_percentage", Int64),
        ("data_storage_size_in_gb", Int64),
        ("database_edition", Str),
        ("defined_tags", string_map()),
        ("disk_redundancy", Str),
        ("display_name", Str),
        ("domain", Str),
        ("fault_domains", string_list()),
        ("freeform_tags", string_map()),
        ("hostname", Str),
        ("last_patch_history_entry_id", Str),
        ("license_model", Str),
        ("lifecycle_details", Str),
        ("listener_port", Int64),
        ("node_count", Int64),
        ("reco_storage_size_in_gb", Int64),
        ("scan_dns_record_id", Str),
        ("scan_ip_ids", string_list()),
        ("shape", Str),
        ("sparse_diskgroup", Bool),
        ("ssh_public_keys", string_list()),
        ("state", Str),
        ("subnet_id", Str),
        ("time_created", Str),
        ("time_zone", Str),
        ("version", Str),
        ("vip_ids", string_list()),
    ]
}

pub(crate) fn db_home_fields() -> Fields {
    vec![
        ("id", Str),
        ("db_home_id", Str),
        ("compartment_id", Str),
        ("db_system_id", Str),
        ("db_version", Str),
        ("display_name", Str),
        ("last_patch_history_entry_id", Str),
        ("state", Str),
        ("time_created", Str),
    ]
}

pub(crate) fn database_fields() -> Fields {
    vec![
        ("id", Str),
        ("character_set", Str),
        ("compartment_id", Str),
        (
            "connection_strings",
            object_list(vec![
                ("cdb_default", Str),
                ("cdb_ip_default", Str),
                ("all_connection_strings", string_map()),
            ]),
        ),
        (
            "db_backup_config",
            object_list(vec![("auto_backup_enabled", Bool)]),
        ),
        ("db_home_id", Str),
        ("db_name", Str),
        ("db_unique_name", Str),
        ("db_workload", Str),
        ("defined_tags", string_map()),
        ("freeform_tags", string_map()),
        ("lifecycle_details", Str),
        ("ncharacter_set", Str),
        ("pdb_name", Str),
        ("state", Str),
        ("time_created", Str),
    ]
}

pub(crate) fn db_node_fields() -> Fields {
    vec![
        ("id", Str),
        ("db_node_id", Str),
        ("backup_vnic_id", Str),
        ("db_system_id", Str),
        ("fault_domain", Str),
        ("hostname", Str),
        ("software_storage_size_in_gb", Int64),
        ("state", Str),
        ("time_created", Str),
        ("vnic_id", Str),
    ]
}

pub(crate) fn backup_fields() -> Fields {
    vec![
        ("id", Str),
        ("availability_domain", Str),
        ("compartment_id", Str),
        ("database_edition", Str),
        ("database_id", Str),
        ("database_size_in_gbs", Float64),
        ("display_name", Str),
        ("lifecycle_details", Str),
        ("state", Str),
        ("time_ended", Str),
        ("time_started", Str),
        ("type", Str),
    ]
}

pub(crate) fn db_system_to_map(system: &DbSystem) -> Value {
    json!({
        "id": system.id,
        "availability_domain": system.availability_domain,
        "backup_subnet_id": system.backup_subnet_id,
        "cluster_name": system.cluster_name,
        "compartment_id": system.compartment_id,
        "cpu_core_count": system.cpu_core_count,
        "data_storage_percentage": system.data_storage_percentage,
        "data_storage_size_in_gb": system.data_storage_size_in_gbs,
        "database_edition": system.database_edition,
        "defined_tags": defined_tags_to_map(&system.defined_tags),
        "disk_redundancy": system.disk_redundancy,
        "display_name": system.display_name,
        "domain": system.domain,
        "fault_domains": system.fault_domains,
        "freeform_tags": system.freeform_tags,
        "hostname": system.hostname,
        "last_patch_history_entry_id": system.last_patch_history_entry_id,
        "license_model": system.license_model,
        "lifecycle_details": system.lifecycle_details,
        "listener_port": system.listener_port,
        "node_count": system.node_count,
        "reco_storage_size_in_gb": system.reco_storage_size_in_gb,
        "scan_dns_record_id": system.scan_dns_record_id,
        "scan_ip_ids": system.scan_ip_ids,
        "shape": system.shape,
        "sparse_diskgroup": system.sparse_diskgroup,
        "ssh_public_keys": system.ssh_public_keys,
        "state": system.lifecycle_state.as_str(),
        "subnet_id": system.subnet_id,
        "time_created": sdk_time_value(system.time_created.as_ref()),
        "time_zone": system.time_zone,
        "version": system.version,
        "vip_ids": system.vip_ids,
    })
}

pub(crate) fn db_home_to_map(home: &DbHome) -> Value {
    json!({
        "id": home.id,
        "db_home_id": home.id,
        "compartment_id": home.compartment_id,
        "db_system_id": home.db_system_id,
        "db_version": home.db_version,
        "display_name": home.display_name,
        "last_patch_history_entry_id": home.last_patch_history_entry_id,
        "state": home.lifecycle_state.as_str(),
        "time_created": sdk_time_value(home.time_created.as_ref()),
    })
}

pub(crate) fn db_backup_config_to_list(database: &Database) -> Value {
    match &database.db_backup_config {
        Some(config) => json!([{ "auto_backup_enabled": config.auto_backup_enabled }]),
        None => json!([]),
    }
}

pub(crate) fn database_to_map(database: &Database) -> Value {
    let connection_strings = match &database.connection_strings {
        Some(cs) => json!([{
            "cdb_default": cs.cdb_default,
            "cdb_ip_default": cs.cdb_ip_default,
            "all_connection_strings": cs.all_connection_strings,
        }]),
        None => json!([]),
    };
    json!({
        "id": database.id,
        "character_set": database.character_set,
        "compartment_id": database.compartment_id,
        "connection_strings": connection_strings,
        "db_backup_config": db_backup_config_to_list(database),
        "db_home_id": database.db_home_id,
        "db_name": database.db_name,
        "db_unique_name": database.db_unique_name,
        "db_workload": database.db_workload,
        "defined_tags": defined_tags_to_map(&database.defined_tags),
        "freeform_tags": database.freeform_tags,
        "lifecycle_details": database.lifecycle_details,
        "ncharacter_set": database.ncharacter_set,
        "pdb_name": database.pdb_name,
        "state": database.lifecycle_state.as_str(),
        "time_created": sdk_time_value(database.time_created.as_ref()),
    })
}

pub(crate) fn db_node_to_map(node: &DbNode) -> Value {
    json!({
        "id": node.id,
        "db_node_id": node.id,
        "backup_vnic_id": node.backup_vnic_id,
        "db_system_id": node.db_system_id,
        "fault_domain": node.fault_domain,
        "hostname": node.hostname,
        "software_storage_size_in_gb": node.software_storage_size_in_gb,
        "state": node.lifecycle_state.as_str(),
        "time_created": sdk_time_value(node.time_created.as_ref()),
        "vnic_id": node.vnic_id,
    })
}

pub(crate) fn backup_to_map(backup: &Backup) -> Value {
    json!({
        "id": backup.id,
        "availability_domain": backup.availability_domain,
        "compartment_id": backup.compartment_id,
        "database_edition": backup.database_edition,
        "database_id": backup.database_id,
        "database_size_in_gbs": backup.database_size_in_gbs,
        "display_name": backup.display_name,
        "lifecycle_details": backup.lifecycle_details,
        "state": backup.lifecycle_state.as_str(),
        "time_ended": sdk_time_value(backup.time_ended.as_ref()),
        "time_started": sdk_time_value(backup.time_started.as_ref()),
        "type": backup.backup_type,
    })
}

/// Copy every key of `map` onto the data source's top level.
pub(crate) fn set_all(data: &mut crate::state::ResourceData, map: Value) {
    if let Value::Object(entries) = map {
        for (key, value) in entries {
            data.set(&key, value);
        }
    }
}
