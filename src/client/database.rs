//! Database service (`/20160918`): DB systems, homes, databases, nodes and backups.
//!
//! Field names follow the API's JSON exactly; see the serde renames.

#![allow(missing_docs)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transport::{ApiRequest, HttpTransport};
use super::{Page, RequestMetadata};
use crate::error::ProviderError;

const API_VERSION: &str = "/20160918";

/// Defined tags in the API's nested form.
pub type DefinedTags = HashMap<String, HashMap<String, Value>>;

lifecycle_state!(
    /// Lifecycle of a DB system.
    DbSystemLifecycleState {
        Provisioning => "PROVISIONING",
        Available => "AVAILABLE",
        Updating => "UPDATING",
        Terminating => "TERMINATING",
        Terminated => "TERMINATED",
        Failed => "FAILED",
    }
);

lifecycle_state!(
    /// Lifecycle of a DB home.
    DbHomeLifecycleState {
        Provisioning => "PROVISIONING",
        Available => "AVAILABLE",
        Updating => "UPDATING",
        Terminating => "TERMINATING",
        Terminated => "TERMINATED",
        Failed => "FAILED",
    }
);

lifecycle_state!(
    /// Lifecycle of a database.
    DatabaseLifecycleState {
        Provisioning => "PROVISIONING",
        Available => "AVAILABLE",
        Updating => "UPDATING",
        BackupInProgress => "BACKUP_IN_PROGRESS",
        Terminating => "TERMINATING",
        Terminated => "TERMINATED",
        RestoreFailed => "RESTORE_FAILED",
        Failed => "FAILED",
    }
);

lifecycle_state!(
    /// Lifecycle of a DB node.
    DbNodeLifecycleState {
        Provisioning => "PROVISIONING",
        Available => "AVAILABLE",
        Updating => "UPDATING",
        Stopping => "STOPPING",
        Stopped => "STOPPED",
        Starting => "STARTING",
        Terminating => "TERMINATING",
        Terminated => "TERMINATED",
        Failed => "FAILED",
    }
);

lifecycle_state!(
    /// Lifecycle of a database backup.
    BackupLifecycleState {
        Creating => "CREATING",
        Active => "ACTIVE",
        Deleting => "DELETING",
        Deleted => "DELETED",
        Failed => "FAILED",
        Restoring => "RESTORING",
    }
);

/// A DB system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSystem {
    pub id: String,
    pub compartment_id: String,
    pub availability_domain: String,
    pub subnet_id: String,
    pub backup_subnet_id: Option<String>,
    pub shape: String,
    #[serde(default)]
    pub ssh_public_keys: Vec<String>,
    pub hostname: String,
    pub domain: Option<String>,
    pub cpu_core_count: i64,
    pub cluster_name: Option<String>,
    pub data_storage_percentage: Option<i64>,
    pub database_edition: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub fault_domains: Vec<String>,
    pub lifecycle_state: DbSystemLifecycleState,
    pub lifecycle_details: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    pub listener_port: Option<i64>,
    pub node_count: Option<i64>,
    #[serde(rename = "dataStorageSizeInGBs")]
    pub data_storage_size_in_gbs: Option<i64>,
    #[serde(rename = "recoStorageSizeInGB")]
    pub reco_storage_size_in_gb: Option<i64>,
    pub disk_redundancy: Option<String>,
    pub license_model: Option<String>,
    pub scan_dns_record_id: Option<String>,
    #[serde(default)]
    pub scan_ip_ids: Vec<String>,
    #[serde(default)]
    pub vip_ids: Vec<String>,
    pub version: Option<String>,
    pub last_patch_history_entry_id: Option<String>,
    pub sparse_diskgroup: Option<bool>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub defined_tags: DefinedTags,
    #[serde(default)]
    pub freeform_tags: HashMap<String, String>,
}

/// A DB home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbHome {
    pub id: String,
    pub compartment_id: String,
    pub db_system_id: Option<String>,
    pub db_version: String,
    pub display_name: String,
    pub last_patch_history_entry_id: Option<String>,
    pub lifecycle_state: DbHomeLifecycleState,
    pub time_created: Option<DateTime<Utc>>,
}

/// Connection strings of a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConnectionStrings {
    pub cdb_default: Option<String>,
    pub cdb_ip_default: Option<String>,
    #[serde(default)]
    pub all_connection_strings: HashMap<String, String>,
}

/// Automatic backup settings of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbBackupConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_backup_enabled: Option<bool>,
}

/// A database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    pub compartment_id: String,
    pub db_home_id: Option<String>,
    pub db_name: String,
    pub db_unique_name: String,
    pub character_set: Option<String>,
    pub ncharacter_set: Option<String>,
    pub db_workload: Option<String>,
    pub pdb_name: Option<String>,
    pub lifecycle_state: DatabaseLifecycleState,
    pub lifecycle_details: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    pub connection_strings: Option<DatabaseConnectionStrings>,
    pub db_backup_config: Option<DbBackupConfig>,
    #[serde(default)]
    pub defined_tags: DefinedTags,
    #[serde(default)]
    pub freeform_tags: HashMap<String, String>,
}

/// A DB node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbNode {
    pub id: String,
    pub db_system_id: String,
    pub hostname: Option<String>,
    pub vnic_id: String,
    pub backup_vnic_id: Option<String>,
    pub fault_domain: Option<String>,
    #[serde(rename = "softwareStorageSizeInGB")]
    pub software_storage_size_in_gb: Option<i64>,
    pub lifecycle_state: DbNodeLifecycleState,
    pub time_created: Option<DateTime<Utc>>,
}

/// A database backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: String,
    pub compartment_id: Option<String>,
    pub database_id: Option<String>,
    pub display_name: Option<String>,
    pub availability_domain: Option<String>,
    pub database_edition: Option<String>,
    #[serde(rename = "databaseSizeInGBs")]
    pub database_size_in_gbs: Option<f64>,
    pub lifecycle_details: Option<String>,
    pub lifecycle_state: BackupLifecycleState,
    pub time_started: Option<DateTime<Utc>>,
    pub time_ended: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub backup_type: Option<String>,
}

/// Database settings of a DB system launched from scratch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseDetails {
    pub admin_password: String,
    pub db_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncharacter_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_workload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdb_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_backup_config: Option<DbBackupConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<HashMap<String, String>>,
}

/// Database settings of a DB system restored from a backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseFromBackupDetails {
    pub admin_password: String,
    pub backup_id: String,
    #[serde(rename = "backupTDEPassword")]
    pub backup_tde_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
}

/// DB home of a DB system launched from scratch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDbHomeDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub database: CreateDatabaseDetails,
}

/// DB home of a DB system restored from a backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDbHomeFromBackupDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub database: CreateDatabaseFromBackupDetails,
}

/// Settings shared by every way of launching a DB system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchDbSystemBase {
    pub availability_domain: String,
    pub compartment_id: String,
    pub subnet_id: String,
    pub shape: String,
    pub hostname: String,
    pub ssh_public_keys: Vec<String>,
    pub cpu_core_count: i64,
    #[serde(rename = "dataStorageSizeInGBs", skip_serializing_if = "Option::is_none")]
    pub data_storage_size_in_gbs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_edition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_redundancy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_storage_percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse_diskgroup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<HashMap<String, String>>,
}

/// Launch a DB system with a new database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchDbSystemDetails {
    #[serde(flatten)]
    pub base: LaunchDbSystemBase,
    pub db_home: CreateDbHomeDetails,
}

/// Launch a DB system restoring a database backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchDbSystemFromBackupDetails {
    #[serde(flatten)]
    pub base: LaunchDbSystemBase,
    pub db_home: CreateDbHomeFromBackupDetails,
}

/// The body of `LaunchDbSystem`, discriminated by `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum LaunchDbSystem {
    /// `source = NONE`
    #[serde(rename = "NONE")]
    New(LaunchDbSystemDetails),
    /// `source = DB_BACKUP`
    #[serde(rename = "DB_BACKUP")]
    FromBackup(LaunchDbSystemFromBackupDetails),
}

impl LaunchDbSystem {
    /// Settings shared by both sources.
    pub fn base(&self) -> &LaunchDbSystemBase {
        match self {
            Self::New(details) => &details.base,
            Self::FromBackup(details) => &details.base,
        }
    }

    /// The API value of `source`.
    pub fn source(&self) -> &'static str {
        match self {
            Self::New(_) => "NONE",
            Self::FromBackup(_) => "DB_BACKUP",
        }
    }
}

/// Fields of a DB system that can change in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDbSystemDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_core_count: Option<i64>,
    #[serde(rename = "dataStorageSizeInGBs", skip_serializing_if = "Option::is_none")]
    pub data_storage_size_in_gbs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<HashMap<String, String>>,
}

impl UpdateDbSystemDetails {
    /// Whether any field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fields of a database that can change in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatabaseDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_backup_config: Option<DbBackupConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_tags: Option<DefinedTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<HashMap<String, String>>,
}

/// `LaunchDbSystem` request.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchDbSystemRequest {
    pub details: LaunchDbSystem,
    pub metadata: RequestMetadata,
}

/// `GetDbSystem` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetDbSystemRequest {
    pub db_system_id: String,
    pub metadata: RequestMetadata,
}

/// `ListDbSystems` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDbSystemsRequest {
    pub compartment_id: String,
    pub availability_domain: Option<String>,
    pub backup_id: Option<String>,
    pub display_name: Option<String>,
    pub lifecycle_state: Option<String>,
    pub page: Option<String>,
    pub metadata: RequestMetadata,
}

/// `UpdateDbSystem` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDbSystemRequest {
    pub db_system_id: String,
    pub details: UpdateDbSystemDetails,
    pub metadata: RequestMetadata,
}

/// `TerminateDbSystem` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminateDbSystemRequest {
    pub db_system_id: String,
    pub metadata: RequestMetadata,
}

/// `ListDbHomes` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDbHomesRequest {
    pub compartment_id: String,
    pub db_system_id: String,
    pub display_name: Option<String>,
    pub lifecycle_state: Option<String>,
    pub page: Option<String>,
    pub metadata: RequestMetadata,
}

/// `GetDbHome` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetDbHomeRequest {
    pub db_home_id: String,
    pub metadata: RequestMetadata,
}

/// `ListDatabases` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDatabasesRequest {
    pub compartment_id: String,
    pub db_home_id: String,
    pub db_name: Option<String>,
    pub lifecycle_state: Option<String>,
    pub page: Option<String>,
    pub metadata: RequestMetadata,
}

/// `GetDatabase` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetDatabaseRequest {
    pub database_id: String,
    pub metadata: RequestMetadata,
}

/// `UpdateDatabase` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDatabaseRequest {
    pub database_id: String,
    pub details: UpdateDatabaseDetails,
    pub metadata: RequestMetadata,
}

/// `ListDbNodes` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDbNodesRequest {
    pub compartment_id: String,
    pub db_system_id: String,
    pub lifecycle_state: Option<String>,
    pub page: Option<String>,
    pub metadata: RequestMetadata,
}

/// `GetDbNode` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetDbNodeRequest {
    pub db_node_id: String,
    pub metadata: RequestMetadata,
}

/// `ListBackups` request. Either filter may be given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListBackupsRequest {
    pub compartment_id: Option<String>,
    pub database_id: Option<String>,
    pub page: Option<String>,
    pub metadata: RequestMetadata,
}

/// The Database service operations the provider uses.
#[async_trait::async_trait]
pub trait DatabaseApi: Send + Sync {
    async fn launch_db_system(&self, request: LaunchDbSystemRequest) -> Result<DbSystem, ProviderError>;
    async fn get_db_system(&self, request: GetDbSystemRequest) -> Result<DbSystem, ProviderError>;
    async fn list_db_systems(&self, request: ListDbSystemsRequest) -> Result<Page<DbSystem>, ProviderError>;
    async fn update_db_system(&self, request: UpdateDbSystemRequest) -> Result<DbSystem, ProviderError>;
    async fn terminate_db_system(&self, request: TerminateDbSystemRequest) -> Result<(), ProviderError>;
    async fn list_db_homes(&self, request: ListDbHomesRequest) -> Result<Page<DbHome>, ProviderError>;
    async fn get_db_home(&self, request: GetDbHomeRequest) -> Result<DbHome, ProviderError>;
    async fn list_databases(&self, request: ListDatabasesRequest) -> Result<Page<Database>, ProviderError>;
    async fn get_database(&self, request: GetDatabaseRequest) -> Result<Database, ProviderError>;
    async fn update_database(&self, request: UpdateDatabaseRequest) -> Result<Database, ProviderError>;
    async fn list_db_nodes(&self, request: ListDbNodesRequest) -> Result<Page<DbNode>, ProviderError>;
    async fn get_db_node(&self, request: GetDbNodeRequest) -> Result<DbNode, ProviderError>;
    async fn list_backups(&self, request: ListBackupsRequest) -> Result<Page<Backup>, ProviderError>;
}

/// [`DatabaseApi`] over REST.
#[derive(Clone)]
pub struct HttpDatabaseClient {
    transport: HttpTransport,
}

impl HttpDatabaseClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

fn path(resource: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{}/{}/{}", API_VERSION, resource, id),
        None => format!("{}/{}", API_VERSION, resource),
    }
}

#[async_trait::async_trait]
impl DatabaseApi for HttpDatabaseClient {
    async fn launch_db_system(&self, request: LaunchDbSystemRequest) -> Result<DbSystem, ProviderError> {
        let api = ApiRequest::new("LaunchDbSystem", Method::POST, path("dbSystems", None))
            .body(&request.details)?;
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn get_db_system(&self, request: GetDbSystemRequest) -> Result<DbSystem, ProviderError> {
        let api = ApiRequest::new(
            "GetDbSystem",
            Method::GET,
            path("dbSystems", Some(&request.db_system_id)),
        );
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn list_db_systems(&self, request: ListDbSystemsRequest) -> Result<Page<DbSystem>, ProviderError> {
        let api = ApiRequest::new("ListDbSystems", Method::GET, path("dbSystems", None))
            .query("compartmentId", Some(&request.compartment_id))
            .query("availabilityDomain", request.availability_domain.as_ref())
            .query("backupId", request.backup_id.as_ref())
            .query("displayName", request.display_name.as_ref())
            .query("lifecycleState", request.lifecycle_state.as_ref())
            .query("page", request.page.as_ref());
        let response = self.transport.call(api, &request.metadata).await?;
        Ok(Page {
            items: response.body,
            opc_next_page: response.opc_next_page,
        })
    }

    async fn update_db_system(&self, request: UpdateDbSystemRequest) -> Result<DbSystem, ProviderError> {
        let api = ApiRequest::new(
            "UpdateDbSystem",
            Method::PUT,
            path("dbSystems", Some(&request.db_system_id)),
        )
        .body(&request.details)?;
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn terminate_db_system(&self, request: TerminateDbSystemRequest) -> Result<(), ProviderError> {
        let api = ApiRequest::new(
            "TerminateDbSystem",
            Method::DELETE,
            path("dbSystems", Some(&request.db_system_id)),
        );
        self.transport.call_empty(api, &request.metadata).await?;
        Ok(())
    }

    async fn list_db_homes(&self, request: ListDbHomesRequest) -> Result<Page<DbHome>, ProviderError> {
        let api = ApiRequest::new("ListDbHomes", Method::GET, path("dbHomes", None))
            .query("compartmentId", Some(&request.compartment_id))
            .query("dbSystemId", Some(&request.db_system_id))
            .query("displayName", request.display_name.as_ref())
            .query("lifecycleState", request.lifecycle_state.as_ref())
            .query("page", request.page.as_ref());
        let response = self.transport.call(api, &request.metadata).await?;
        Ok(Page {
            items: response.body,
            opc_next_page: response.opc_next_page,
        })
    }

    async fn get_db_home(&self, request: GetDbHomeRequest) -> Result<DbHome, ProviderError> {
        let api = ApiRequest::new(
            "GetDbHome",
            Method::GET,
            path("dbHomes", Some(&request.db_home_id)),
        );
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn list_databases(&self, request: ListDatabasesRequest) -> Result<Page<Database>, ProviderError> {
        let api = ApiRequest::new("ListDatabases", Method::GET, path("databases", None))
            .query("compartmentId", Some(&request.compartment_id))
            .query("dbHomeId", Some(&request.db_home_id))
            .query("dbName", request.db_name.as_ref())
            .query("lifecycleState", request.lifecycle_state.as_ref())
            .query("page", request.page.as_ref());
        let response = self.transport.call(api, &request.metadata).await?;
        Ok(Page {
            items: response.body,
            opc_next_page: response.opc_next_page,
        })
    }

    async fn get_database(&self, request: GetDatabaseRequest) -> Result<Database, ProviderError> {
        let api = ApiRequest::new(
            "GetDatabase",
            Method::GET,
            path("databases", Some(&request.database_id)),
        );
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn update_database(&self, request: UpdateDatabaseRequest) -> Result<Database, ProviderError> {
        let api = ApiRequest::new(
            "UpdateDatabase",
            Method::PUT,
            path("databases", Some(&request.database_id)),
        )
        .body(&request.details)?;
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn list_db_nodes(&self, request: ListDbNodesRequest) -> Result<Page<DbNode>, ProviderError> {
        let api = ApiRequest::new("ListDbNodes", Method::GET, path("dbNodes", None))
            .query("compartmentId", Some(&request.compartment_id))
            .query("dbSystemId", Some(&request.db_system_id))
            .query("lifecycleState", request.lifecycle_state.as_ref())
            .query("page", request.page.as_ref());
        let response = self.transport.call(api, &request.metadata).await?;
        Ok(Page {
            items: response.body,
            opc_next_page: response.opc_next_page,
        })
    }

    async fn get_db_node(&self, request: GetDbNodeRequest) -> Result<DbNode, ProviderError> {
        let api = ApiRequest::new(
            "GetDbNode",
            Method::GET,
            path("dbNodes", Some(&request.db_node_id)),
        );
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn list_backups(&self, request: ListBackupsRequest) -> Result<Page<Backup>, ProviderError> {
        let api = ApiRequest::new("ListBackups", Method::GET, path("backups", None))
            .query("compartmentId", request.compartment_id.as_ref())
            .query("databaseId", request.database_id.as_ref())
            .query("page", request.page.as_ref());
        let response = self.transport.call(api, &request.metadata).await?;
        Ok(Page {
            items: response.body,
            opc_next_page: response.opc_next_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_db_system_field_names() {
        let system: DbSystem = serde_json::from_value(json!({
            "id": "ocid1.dbsystem.oc1..aaaa",
            "compartmentId": "ocid1.compartment.oc1..aaaa",
            "availabilityDomain": "Uocm:PHX-AD-1",
            "subnetId": "ocid1.subnet.oc1..aaaa",
            "shape": "BM.DenseIO2.52",
            "sshPublicKeys": ["ssh-rsa AAAA"],
            "hostname": "myoracledb",
            "cpuCoreCount": 2,
            "lifecycleState": "PROVISIONING",
            "dataStorageSizeInGBs": 256,
            "recoStorageSizeInGB": 1024,
            "timeCreated": "2018-09-14T18:41:05.153Z",
            "definedTags": {"Operations": {"CostCenter": "42"}},
        }))
        .unwrap();
        assert_eq!(system.data_storage_size_in_gbs, Some(256));
        assert_eq!(system.reco_storage_size_in_gb, Some(1024));
        assert_eq!(system.lifecycle_state, DbSystemLifecycleState::Provisioning);
        assert!(system.freeform_tags.is_empty());
        assert!(system.vip_ids.is_empty());
    }

    #[test]
    fn test_launch_body_is_tagged_by_source() {
        let details = LaunchDbSystem::FromBackup(LaunchDbSystemFromBackupDetails {
            base: LaunchDbSystemBase {
                shape: "BM.DenseIO2.52".to_string(),
                cpu_core_count: 2,
                data_storage_size_in_gbs: Some(256),
                ..Default::default()
            },
            db_home: CreateDbHomeFromBackupDetails {
                display_name: None,
                database: CreateDatabaseFromBackupDetails {
                    admin_password: "BEstrO0ng_#11".to_string(),
                    backup_id: "ocid1.dbbackup.oc1..aaaa".to_string(),
                    backup_tde_password: "BEstrO0ng_#11".to_string(),
                    db_name: Some("dbback".to_string()),
                },
            },
        });
        let body = serde_json::to_value(&details).unwrap();
        assert_eq!(body["source"], "DB_BACKUP");
        assert_eq!(body["shape"], "BM.DenseIO2.52");
        assert_eq!(body["dataStorageSizeInGBs"], 256);
        assert_eq!(body["dbHome"]["database"]["backupTDEPassword"], "BEstrO0ng_#11");
        assert!(body.get("displayName").is_none());
        assert_eq!(details.source(), "DB_BACKUP");
    }

    #[test]
    fn test_update_details_only_sends_set_fields() {
        let details = UpdateDbSystemDetails {
            cpu_core_count: Some(4),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&details).unwrap(), json!({"cpuCoreCount": 4}));
        assert!(!details.is_empty());
        assert!(UpdateDbSystemDetails::default().is_empty());
    }

    #[test]
    fn test_unknown_lifecycle_state() {
        let node: DbNode = serde_json::from_value(json!({
            "id": "ocid1.dbnode.oc1..aaaa",
            "dbSystemId": "ocid1.dbsystem.oc1..aaaa",
            "vnicId": "ocid1.vnic.oc1..aaaa",
            "lifecycleState": "MIGRATING",
            "softwareStorageSizeInGB": 200,
        }))
        .unwrap();
        assert_eq!(node.lifecycle_state, DbNodeLifecycleState::UnknownValue);
        assert_eq!(node.software_storage_size_in_gb, Some(200));
    }
}
