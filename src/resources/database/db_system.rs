//! `oci_database_db_system`: a DB system with its initial DB home and database.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use super::{db_backup_config_to_list, db_system_to_map, SERVICE};
use crate::client::database::{
    CreateDatabaseDetails, CreateDatabaseFromBackupDetails, CreateDbHomeDetails,
    CreateDbHomeFromBackupDetails, Database, DbBackupConfig, DbHome, DbSystem,
    DbSystemLifecycleState, GetDatabaseRequest, GetDbSystemRequest, LaunchDbSystem,
    LaunchDbSystemBase, LaunchDbSystemDetails, LaunchDbSystemFromBackupDetails,
    LaunchDbSystemRequest, ListDatabasesRequest, ListDbHomesRequest, TerminateDbSystemRequest,
    UpdateDatabaseDetails, UpdateDatabaseRequest, UpdateDbSystemDetails, UpdateDbSystemRequest,
};
use crate::client::{defined_tags_to_map, map_to_defined_tags, OracleClients};
use crate::crud::{
    create_resource, delete_resource, read_resource, update_resource, CrudData, ResourceCreator,
    ResourceDeleter, ResourceReader, ResourceUpdater, StatefulResource,
};
use crate::error::ProviderError;
use crate::resources::ResourceType;
use crate::schema::{
    timeouts_block, Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Schema,
};
use crate::state::ResourceData;
use crate::types::ResourceTimeouts;
use crate::waiter::{PollSettings, RefreshFn, StateChangeConf};

const DATABASE: &str = "db_home.0.database.0";

/// Launching, patching and terminating a DB system each take hours.
pub const DEFAULT_TIMEOUTS: ResourceTimeouts = ResourceTimeouts::uniform(Duration::from_secs(2 * 60 * 60));

fn database_block() -> Block {
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "admin_password",
            Attribute::required_string().sensitive().with_force_new(),
        )
        .with_attribute("db_name", Attribute::optional_computed_string().with_force_new())
        .with_attribute(
            "character_set",
            Attribute::optional_computed_string().with_force_new(),
        )
        .with_attribute(
            "ncharacter_set",
            Attribute::optional_computed_string().with_force_new(),
        )
        .with_attribute(
            "db_workload",
            Attribute::optional_computed_string()
                .with_force_new()
                .with_allowed_values(["OLTP", "DSS"]),
        )
        .with_attribute("pdb_name", Attribute::optional_computed_string().with_force_new())
        .with_attribute("backup_id", Attribute::optional_string().with_force_new())
        .with_attribute(
            "backup_tde_password",
            Attribute::optional_string().sensitive().with_force_new(),
        )
        .with_attribute("defined_tags", Attribute::string_map(AttributeFlags::optional_computed()))
        .with_attribute("freeform_tags", Attribute::string_map(AttributeFlags::optional_computed()))
        .with_block(
            "db_backup_config",
            NestedBlock::single(
                Block::new().with_attribute("auto_backup_enabled", Attribute::optional_computed_bool()),
            ),
        )
}

fn db_home_block() -> Block {
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("db_version", Attribute::optional_computed_string().with_force_new())
        .with_attribute("display_name", Attribute::optional_computed_string().with_force_new())
        .with_block(
            "database",
            NestedBlock::required_single(database_block()).with_force_new(),
        )
}

/// Schema of `oci_database_db_system`.
pub fn db_system_schema() -> Schema {
    let forced = |attr: Attribute| attr.with_force_new();
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("availability_domain", forced(Attribute::required_string()))
        .with_attribute("compartment_id", forced(Attribute::required_string()))
        .with_attribute("subnet_id", forced(Attribute::required_string()))
        .with_attribute("shape", forced(Attribute::required_string()))
        .with_attribute("hostname", forced(Attribute::required_string()))
        .with_attribute("ssh_public_keys", Attribute::string_list(AttributeFlags::required()))
        .with_attribute("cpu_core_count", Attribute::optional_computed_int64())
        .with_attribute("data_storage_size_in_gb", Attribute::optional_computed_int64())
        .with_attribute(
            "database_edition",
            forced(Attribute::optional_computed_string()).with_allowed_values([
                "STANDARD_EDITION",
                "ENTERPRISE_EDITION",
                "ENTERPRISE_EDITION_HIGH_PERFORMANCE",
                "ENTERPRISE_EDITION_EXTREME_PERFORMANCE",
            ]),
        )
        .with_attribute(
            "disk_redundancy",
            forced(Attribute::optional_computed_string()).with_allowed_values(["HIGH", "NORMAL"]),
        )
        .with_attribute("domain", forced(Attribute::optional_computed_string()))
        .with_attribute("display_name", forced(Attribute::optional_computed_string()))
        .with_attribute(
            "license_model",
            forced(Attribute::optional_computed_string())
                .with_allowed_values(["LICENSE_INCLUDED", "BRING_YOUR_OWN_LICENSE"]),
        )
        .with_attribute("node_count", forced(Attribute::optional_computed_int64()))
        .with_attribute("backup_subnet_id", forced(Attribute::optional_string()))
        .with_attribute("cluster_name", forced(Attribute::optional_string()))
        .with_attribute("data_storage_percentage", forced(Attribute::optional_computed_int64()))
        .with_attribute(
            "fault_domains",
            forced(Attribute::string_list(AttributeFlags::optional_computed())),
        )
        .with_attribute("sparse_diskgroup", forced(Attribute::optional_bool()))
        .with_attribute("time_zone", forced(Attribute::optional_computed_string()))
        .with_attribute(
            "source",
            forced(Attribute::optional_computed_string()).with_allowed_values(["NONE", "DB_BACKUP"]),
        )
        .with_attribute("defined_tags", Attribute::string_map(AttributeFlags::optional_computed()))
        .with_attribute("freeform_tags", Attribute::string_map(AttributeFlags::optional_computed()))
        // Computed
        .with_attribute("state", Attribute::computed_string())
        .with_attribute("lifecycle_details", Attribute::computed_string())
        .with_attribute("time_created", Attribute::computed_string())
        .with_attribute("listener_port", Attribute::computed_int64())
        .with_attribute("reco_storage_size_in_gb", Attribute::computed_int64())
        .with_attribute("scan_dns_record_id", Attribute::computed_string())
        .with_attribute("scan_ip_ids", Attribute::string_list(AttributeFlags::computed()))
        .with_attribute("vip_ids", Attribute::string_list(AttributeFlags::computed()))
        .with_attribute("version", Attribute::computed_string())
        .with_attribute("last_patch_history_entry_id", Attribute::computed_string())
        .with_block(
            "db_home",
            NestedBlock::required_single(db_home_block()).with_force_new(),
        )
        .with_block("timeouts", timeouts_block())
}

/// Crud glue between `oci_database_db_system` state and the Database service.
pub struct DbSystemResourceCrud {
    data: ResourceData,
    clients: OracleClients,
    disable_not_found_retries: bool,
    res: Option<DbSystem>,
}

impl DbSystemResourceCrud {
    /// Crud over `data`. Reads of existing systems should disable not-found
    /// retries so a deleted system is reported at once.
    pub fn new(clients: OracleClients, data: ResourceData, disable_not_found_retries: bool) -> Self {
        Self {
            data,
            clients,
            disable_not_found_retries,
            res: None,
        }
    }

    /// The resulting state.
    pub fn into_state(self) -> Value {
        self.data.into_state()
    }

    fn metadata(&self) -> crate::client::RequestMetadata {
        self.clients.metadata(self.disable_not_found_retries, SERVICE)
    }

    fn tags(&self, path: &str) -> Result<Option<crate::client::database::DefinedTags>, ProviderError> {
        let tags = self.data.get_string_map(path);
        if tags.is_empty() {
            Ok(None)
        } else {
            map_to_defined_tags(&tags).map(Some)
        }
    }

    fn freeform(&self, path: &str) -> Option<std::collections::HashMap<String, String>> {
        let tags = self.data.get_string_map(path);
        (!tags.is_empty()).then_some(tags)
    }

    fn launch_base(&self) -> Result<LaunchDbSystemBase, ProviderError> {
        let d = &self.data;
        let required = |key: &str| d.get_string(key).unwrap_or_default();
        Ok(LaunchDbSystemBase {
            availability_domain: required("availability_domain"),
            compartment_id: required("compartment_id"),
            subnet_id: required("subnet_id"),
            shape: required("shape"),
            hostname: required("hostname"),
            ssh_public_keys: d.get_string_list("ssh_public_keys"),
            cpu_core_count: d.get_i64("cpu_core_count").unwrap_or_default(),
            data_storage_size_in_gbs: d.get_i64("data_storage_size_in_gb"),
            database_edition: d.get_string("database_edition"),
            disk_redundancy: d.get_string("disk_redundancy"),
            domain: d.get_string("domain"),
            display_name: d.get_string("display_name"),
            license_model: d.get_string("license_model"),
            node_count: d.get_i64("node_count"),
            backup_subnet_id: d.get_string("backup_subnet_id"),
            cluster_name: d.get_string("cluster_name"),
            data_storage_percentage: d.get_i64("data_storage_percentage"),
            fault_domains: d
                .get_ok("fault_domains")
                .map(|_| d.get_string_list("fault_domains")),
            sparse_diskgroup: d.get_bool("sparse_diskgroup"),
            time_zone: d.get_string("time_zone"),
            defined_tags: self.tags("defined_tags")?,
            freeform_tags: self.freeform("freeform_tags"),
        })
    }

    fn launch_details(&self) -> Result<LaunchDbSystem, ProviderError> {
        let d = &self.data;
        let db = |key: &str| d.get_string(&format!("{}.{}", DATABASE, key));
        let base = self.launch_base()?;

        if d.get_string("source").as_deref() == Some("DB_BACKUP") {
            return Ok(LaunchDbSystem::FromBackup(LaunchDbSystemFromBackupDetails {
                base,
                db_home: CreateDbHomeFromBackupDetails {
                    display_name: d.get_string("db_home.0.display_name"),
                    database: CreateDatabaseFromBackupDetails {
                        admin_password: db("admin_password").unwrap_or_default(),
                        backup_id: db("backup_id").unwrap_or_default(),
                        backup_tde_password: db("backup_tde_password").unwrap_or_default(),
                        db_name: db("db_name"),
                    },
                },
            }));
        }

        let db_backup_config = d
            .get_ok_exists(&format!("{}.db_backup_config.0", DATABASE))
            .map(|_| DbBackupConfig {
                auto_backup_enabled: d.get_bool(&format!(
                    "{}.db_backup_config.0.auto_backup_enabled",
                    DATABASE
                )),
            });
        Ok(LaunchDbSystem::New(LaunchDbSystemDetails {
            base,
            db_home: CreateDbHomeDetails {
                db_version: d.get_string("db_home.0.db_version"),
                display_name: d.get_string("db_home.0.display_name"),
                database: CreateDatabaseDetails {
                    admin_password: db("admin_password").unwrap_or_default(),
                    db_name: db("db_name").unwrap_or_default(),
                    character_set: db("character_set"),
                    ncharacter_set: db("ncharacter_set"),
                    db_workload: db("db_workload"),
                    pdb_name: db("pdb_name"),
                    db_backup_config,
                    defined_tags: self.tags(&format!("{}.defined_tags", DATABASE))?,
                    freeform_tags: self.freeform(&format!("{}.freeform_tags", DATABASE)),
                },
            },
        }))
    }

    /// The system's first DB home and that home's first database.
    async fn load_db_home(
        &self,
        system: &DbSystem,
    ) -> Result<(Option<DbHome>, Option<Database>), ProviderError> {
        let homes = self
            .clients
            .database
            .list_db_homes(ListDbHomesRequest {
                compartment_id: system.compartment_id.clone(),
                db_system_id: system.id.clone(),
                metadata: self.metadata(),
                ..Default::default()
            })
            .await?;
        let Some(home) = homes.items.into_iter().next() else {
            return Ok((None, None));
        };

        let databases = self
            .clients
            .database
            .list_databases(ListDatabasesRequest {
                compartment_id: system.compartment_id.clone(),
                db_home_id: home.id.clone(),
                metadata: self.metadata(),
                ..Default::default()
            })
            .await?;
        Ok((Some(home), databases.items.into_iter().next()))
    }

    fn db_home_state(&self, home: &DbHome, database: Option<&Database>) -> Value {
        let configured = |key: &str| self.data.get(&format!("{}.{}", DATABASE, key)).cloned();
        let database_state = match database {
            Some(database) => json!({
                "id": database.id,
                // Secrets and the restore source are never returned by the service.
                "admin_password": configured("admin_password"),
                "backup_id": configured("backup_id"),
                "backup_tde_password": configured("backup_tde_password"),
                "character_set": database.character_set,
                "ncharacter_set": database.ncharacter_set,
                "db_name": database.db_name,
                "db_workload": database.db_workload,
                "pdb_name": database.pdb_name,
                "db_backup_config": db_backup_config_to_list(database),
                "defined_tags": defined_tags_to_map(&database.defined_tags),
                "freeform_tags": database.freeform_tags,
            }),
            None => self.data.get(DATABASE).cloned().unwrap_or(Value::Null),
        };
        json!([{
            "id": home.id,
            "db_version": home.db_version,
            "display_name": home.display_name,
            "database": [database_state],
        }])
    }

    /// Collect the nested database fields that changed into one update.
    fn database_changes(&self) -> Result<Option<UpdateDatabaseDetails>, ProviderError> {
        let d = &self.data;
        let mut details = UpdateDatabaseDetails::default();
        let mut changed = false;

        let backup_config = format!("{}.db_backup_config", DATABASE);
        if d.has_change(&backup_config) {
            details.db_backup_config = Some(DbBackupConfig {
                auto_backup_enabled: d.get_bool(&format!("{}.0.auto_backup_enabled", backup_config)),
            });
            changed = true;
        }
        let defined = format!("{}.defined_tags", DATABASE);
        if d.has_change(&defined) {
            details.defined_tags = Some(map_to_defined_tags(&d.get_string_map(&defined))?);
            changed = true;
        }
        let freeform = format!("{}.freeform_tags", DATABASE);
        if d.has_change(&freeform) {
            details.freeform_tags = Some(d.get_string_map(&freeform));
            changed = true;
        }
        Ok(changed.then_some(details))
    }

    async fn update_database(&mut self, details: UpdateDatabaseDetails) -> Result<(), ProviderError> {
        let database_id = match self.data.get_string(&format!("{}.id", DATABASE)) {
            Some(id) => id,
            None => {
                let system = self.fetch().await?;
                match self.load_db_home(&system).await? {
                    (_, Some(database)) => database.id,
                    _ => {
                        return Err(ProviderError::NotFound(format!(
                            "no database found in DB system {}",
                            system.id
                        )))
                    },
                }
            },
        };

        debug!(database_id = %database_id, ?details, "Updating database");
        self.clients
            .database
            .update_database(UpdateDatabaseRequest {
                database_id: database_id.clone(),
                details,
                metadata: self.metadata(),
            })
            .await?;

        let api = self.clients.database.clone();
        let metadata = self.metadata();
        let mut refresh = RefreshFn(move || {
            let api = api.clone();
            let request = GetDatabaseRequest {
                database_id: database_id.clone(),
                metadata: metadata.clone(),
            };
            async move {
                let database = api.get_database(request).await?;
                Ok(Some(database.lifecycle_state.as_str().to_string()))
            }
        });
        StateChangeConf::new(
            &["UPDATING", "BACKUP_IN_PROGRESS"],
            &["AVAILABLE"],
            self.data.timeouts().update,
        )
        .with_poll_settings(self.clients.poll)
        .wait_for_state(&mut refresh)
        .await?;
        Ok(())
    }

    async fn fetch(&self) -> Result<DbSystem, ProviderError> {
        self.clients
            .database
            .get_db_system(GetDbSystemRequest {
                db_system_id: self.data.id().to_string(),
                metadata: self.metadata(),
            })
            .await
    }
}

impl CrudData for DbSystemResourceCrud {
    fn data(&self) -> &ResourceData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ResourceData {
        &mut self.data
    }

    fn poll_settings(&self) -> PollSettings {
        self.clients.poll
    }
}

impl StatefulResource for DbSystemResourceCrud {
    fn state(&self) -> Option<String> {
        self.res
            .as_ref()
            .map(|r| r.lifecycle_state.as_str().to_string())
    }

    fn created_pending(&self) -> &'static [&'static str] {
        &["PROVISIONING"]
    }

    fn created_target(&self) -> &'static [&'static str] {
        &["AVAILABLE"]
    }

    fn updated_pending(&self) -> &'static [&'static str] {
        &["UPDATING"]
    }

    fn updated_target(&self) -> &'static [&'static str] {
        &["AVAILABLE"]
    }

    fn deleted_pending(&self) -> &'static [&'static str] {
        &["TERMINATING"]
    }

    fn deleted_target(&self) -> &'static [&'static str] {
        &["TERMINATED"]
    }
}

#[async_trait::async_trait]
impl ResourceReader for DbSystemResourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let system = self.fetch().await?;
        self.res = Some(system);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        let Some(system) = self.res.clone() else {
            return Ok(());
        };

        let configured_hostname = self.data.get_string("hostname");
        if let Value::Object(entries) = db_system_to_map(&system) {
            for (key, value) in entries {
                self.data.set(&key, value);
            }
        }
        // The service lowercases the hostname and may append a suffix.
        if let Some(hostname) = configured_hostname {
            if system
                .hostname
                .to_lowercase()
                .starts_with(&hostname.to_lowercase())
            {
                self.data.set("hostname", hostname);
            }
        }
        if self.data.get_string("source").is_none() {
            self.data.set("source", "NONE");
        }

        if system.lifecycle_state != DbSystemLifecycleState::Terminated {
            if let (Some(home), database) = self.load_db_home(&system).await? {
                let db_home = self.db_home_state(&home, database.as_ref());
                self.data.set("db_home", db_home);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceCreator for DbSystemResourceCrud {
    fn id(&self) -> String {
        self.res.as_ref().map(|r| r.id.clone()).unwrap_or_default()
    }

    async fn create(&mut self) -> Result<(), ProviderError> {
        let details = self.launch_details()?;
        debug!(source = details.source(), shape = %details.base().shape, "Launching DB system");
        let system = self
            .clients
            .database
            .launch_db_system(LaunchDbSystemRequest {
                details,
                metadata: self.metadata(),
            })
            .await?;
        self.res = Some(system);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceUpdater for DbSystemResourceCrud {
    async fn update(&mut self) -> Result<(), ProviderError> {
        let d = &self.data;
        let mut details = UpdateDbSystemDetails::default();
        if d.has_change("cpu_core_count") {
            details.cpu_core_count = d.get_i64("cpu_core_count");
        }
        if d.has_change("data_storage_size_in_gb") {
            details.data_storage_size_in_gbs = d.get_i64("data_storage_size_in_gb");
        }
        if d.has_change("ssh_public_keys") {
            details.ssh_public_keys = Some(d.get_string_list("ssh_public_keys"));
        }
        if d.has_change("defined_tags") {
            details.defined_tags = Some(map_to_defined_tags(&d.get_string_map("defined_tags"))?);
        }
        if d.has_change("freeform_tags") {
            details.freeform_tags = Some(d.get_string_map("freeform_tags"));
        }
        let database_changes = self.database_changes()?;

        if !details.is_empty() {
            let system = self
                .clients
                .database
                .update_db_system(UpdateDbSystemRequest {
                    db_system_id: self.data.id().to_string(),
                    details,
                    metadata: self.metadata(),
                })
                .await?;
            self.res = Some(system);
        }

        if let Some(changes) = database_changes {
            self.update_database(changes).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceDeleter for DbSystemResourceCrud {
    async fn delete(&mut self) -> Result<(), ProviderError> {
        self.clients
            .database
            .terminate_db_system(TerminateDbSystemRequest {
                db_system_id: self.data.id().to_string(),
                metadata: self.metadata(),
            })
            .await
    }
}

/// The `oci_database_db_system` resource type.
pub struct DbSystemResource;

#[async_trait::async_trait]
impl ResourceType for DbSystemResource {
    fn name(&self) -> &'static str {
        "oci_database_db_system"
    }

    fn schema(&self) -> Schema {
        db_system_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let data = ResourceData::new(config.clone());
        let missing = |key: &str, detail: &str| {
            let path = format!("{}.{}", DATABASE, key);
            (data.get_ok(&path).is_none()).then(|| {
                Diagnostic::error(format!("Missing required argument '{}'", path))
                    .with_detail(detail)
                    .with_attribute(path)
            })
        };
        if data.get_string("source").as_deref() == Some("DB_BACKUP") {
            ["backup_id", "backup_tde_password"]
                .into_iter()
                .filter_map(|key| missing(key, "required when source is DB_BACKUP"))
                .collect()
        } else {
            missing("db_name", "required when source is NONE")
                .into_iter()
                .collect()
        }
    }

    async fn create(&self, clients: &OracleClients, planned: Value) -> Result<Value, ProviderError> {
        let data = ResourceData::new(planned).with_timeouts(DEFAULT_TIMEOUTS)?;
        let mut crud = DbSystemResourceCrud::new(clients.clone(), data, false);
        create_resource(&mut crud).await?;
        Ok(crud.into_state())
    }

    async fn read(&self, clients: &OracleClients, state: Value) -> Result<Value, ProviderError> {
        let data = ResourceData::from_state(state).with_timeouts(DEFAULT_TIMEOUTS)?;
        let mut crud = DbSystemResourceCrud::new(clients.clone(), data, true);
        read_resource(&mut crud).await?;
        Ok(crud.into_state())
    }

    async fn update(
        &self,
        clients: &OracleClients,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let data = ResourceData::for_update(prior, planned).with_timeouts(DEFAULT_TIMEOUTS)?;
        let mut crud = DbSystemResourceCrud::new(clients.clone(), data, false);
        update_resource(&mut crud).await?;
        Ok(crud.into_state())
    }

    async fn delete(&self, clients: &OracleClients, state: Value) -> Result<(), ProviderError> {
        let data = ResourceData::from_state(state).with_timeouts(DEFAULT_TIMEOUTS)?;
        let mut crud = DbSystemResourceCrud::new(clients.clone(), data, true);
        delete_resource(&mut crud).await
    }
}
