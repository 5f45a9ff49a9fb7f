//! The OCI provider: dispatches host operations to the registered resource
//! and data source types.

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::OracleClients;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::Registry;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ResourceTimeouts};
use crate::validation::{normalize_blocks, validate};

/// Serves every registered resource and data source.
pub struct OciProvider {
    registry: Registry,
    clients: RwLock<Option<OracleClients>>,
}

impl Default for OciProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OciProvider {
    /// An unconfigured provider; `configure` builds the REST clients.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            clients: RwLock::new(None),
        }
    }

    /// A provider that is already configured with `clients`.
    pub fn with_clients(clients: OracleClients) -> Self {
        Self {
            registry: Registry::new(),
            clients: RwLock::new(Some(clients)),
        }
    }

    async fn clients(&self) -> Result<OracleClients, ProviderError> {
        self.clients.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "provider is not configured; Configure must run first".to_string(),
            )
        })
    }
}

fn normalized(schema: &Schema, mut value: Value) -> Value {
    normalize_blocks(&schema.block, &mut value);
    value
}

fn timeouts_diagnostics(config: &Value) -> Vec<Diagnostic> {
    match ResourceTimeouts::default().with_overrides(config.get("timeouts")) {
        Ok(_) => Vec::new(),
        Err(e) => vec![Diagnostic::error(e.message()).with_attribute("timeouts")],
    }
}

#[async_trait::async_trait]
impl ProviderService for OciProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for resource in self.registry.resources() {
            schema = schema.with_resource(resource.name(), resource.schema());
        }
        for data_source in self.registry.data_sources() {
            schema = schema.with_data_source(data_source.name(), data_source.schema());
        }
        schema
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(ProviderConfig::validate(&config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::from_value(&config) {
            Ok(config) => config,
            Err(e) => {
                return Ok(vec![
                    Diagnostic::error("Invalid provider configuration").with_detail(e.message())
                ])
            },
        };
        let clients = OracleClients::from_config(&config)?;
        info!(
            region = %config.region,
            auth = ?config.auth,
            disable_auto_retries = config.retry.disable_auto_retries,
            "Provider configured"
        );
        *self.clients.write().await = Some(clients);
        Ok(Vec::new())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let schema = resource.schema();
        let config = normalized(&schema, config);

        let mut diagnostics = validate(&schema, &config);
        diagnostics.extend(timeouts_diagnostics(&config));
        if diagnostics.is_empty() {
            diagnostics.extend(resource.validate(&config));
        }
        Ok(diagnostics)
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let current = resource.schema().version as i64;
        if version != current {
            return Err(ProviderError::InvalidRequest(format!(
                "cannot upgrade {} state from schema version {} to {}",
                resource_type, version, current
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let schema = resource.schema();
        let prior = prior_state.filter(|p| !p.is_null());
        let proposed = normalized(&schema, proposed_state);
        let plan = plan_resource(&schema, prior.as_ref(), &proposed);
        debug!(
            resource_type,
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Planned resource"
        );
        Ok(plan)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let clients = self.clients().await?;
        let planned = normalized(&resource.schema(), planned_state);
        resource.create(&clients, planned).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        if current_state.is_null() {
            return Ok(Value::Null);
        }
        let clients = self.clients().await?;
        resource.read(&clients, current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let clients = self.clients().await?;
        let planned = normalized(&resource.schema(), planned_state);
        resource.update(&clients, prior_state, planned).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let clients = self.clients().await?;
        resource.delete(&clients, current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.registry.resource(resource_type)?;
        let clients = self.clients().await?;
        let state = resource.read(&clients, json!({ "id": id })).await?;
        if state.is_null() {
            return Err(ProviderError::NotFound(format!(
                "Cannot import non-existent remote object {}",
                id
            )));
        }
        info!(resource_type, id, "Imported resource");
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.registry.data_source(data_source_type)?;
        let schema = data_source.schema();
        let config = normalized(&schema, config);
        Ok(validate(&schema, &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.registry.data_source(data_source_type)?;
        let clients = self.clients().await?;
        let config = normalized(&data_source.schema(), config);
        data_source.read(&clients, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::database::{
        Backup, BackupLifecycleState, DatabaseApi, ListBackupsRequest, UpdateDbSystemDetails,
    };
    use crate::client::Page;
    use crate::client::dns::{SteeringPolicyAttachment, SteeringPolicyAttachmentLifecycleState};
    use crate::testing::{
        assert_attr, assert_attr_set, assert_error_contains, assert_plan_changes_attribute,
        assert_plan_creates, assert_plan_no_changes, assert_plan_replaces,
        assert_plan_updates_in_place, fake_time, FakeOci, ProviderTester, FAKE_DNS_COMPARTMENT,
    };
    use crate::waiter::wait_till_condition;
    use rstest::rstest;
    use std::time::Duration;

    const DB_SYSTEM: &str = "oci_database_db_system";
    const ATTACHMENT: &str = "oci_dns_steering_policy_attachment";
    const COMPARTMENT: &str = "ocid1.compartment.oc1..aaaaaaaatest";

    fn db_system_config(display_name: &str) -> Value {
        json!({
            "availability_domain": "Uocm:PHX-AD-1",
            "compartment_id": COMPARTMENT,
            "subnet_id": "ocid1.subnet.oc1..aaaa",
            "shape": "BM.DenseIO2.52",
            "hostname": "myOracleDB",
            "ssh_public_keys": ["ssh-rsa KKKLK3NzaC1yc2EAAAADAQABAAABAQC+UC9MFNA55NIVtKPIBCNw7++ACXhD0hx+Zyj25JfHykjz/QU3Q5FAU3DxDbVXyubgXfb/GJnrKRY8O4QDdvnZZRvQFFEOaApThAmCAM5MuFUIHdFvlqP+0W+ZQnmtDhwVe2NCfcmOrMuaPEgOKO3DOW6I/qOOdO691Xe2S9NgT9HhN0ZfFtEODVgvYulgXuCCXsJs+NUqcHAOxxFUmwkbPvYi0P0e2DT8JKeiOOC8VKUEgvVx+GKmqasm+Y6zHFW7vv3g2GstE1aRs3mttHRoC/JPM86PRyIxeWXEMzyG5wHqUu4XZpDbnWNxi6ugxnAGiL3CrIFdCgRNgHz5qS1l MustWin"],
            "cpu_core_count": 2,
            "data_storage_size_in_gb": 256,
            "database_edition": "ENTERPRISE_EDITION",
            "license_model": "LICENSE_INCLUDED",
            "display_name": display_name,
            "db_home": {
                "db_version": "12.1.0.2",
                "display_name": "dbHome1",
                "database": {
                    "admin_password": "BEstrO0ng_#11",
                    "db_name": "aTFdb",
                    "character_set": "AL32UTF8",
                    "ncharacter_set": "AL16UTF16",
                    "db_workload": "OLTP",
                    "pdb_name": "pdbName",
                    "db_backup_config": {"auto_backup_enabled": true},
                },
            },
        })
    }

    fn str_attr(state: &Value, pointer: &str) -> String {
        state
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_else(|| panic!("{} is not a string in {}", pointer, state))
            .to_string()
    }

    async fn created_db_system(fake: &FakeOci, display_name: &str) -> Value {
        ProviderTester::with_fake(fake)
            .lifecycle_create(DB_SYSTEM, db_system_config(display_name))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_db_system_create() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let config = db_system_config("tfDbSystemTest");

        tester
            .validate_resource_config(DB_SYSTEM, config.clone())
            .await
            .unwrap();
        let plan = tester.plan_create(DB_SYSTEM, config.clone()).await.unwrap();
        assert_plan_creates(&plan);

        let state = tester.lifecycle_create(DB_SYSTEM, config.clone()).await.unwrap();
        assert_attr_set(&state, "id");
        assert_attr(&state, "state", "AVAILABLE");
        assert_attr(&state, "hostname", "myOracleDB");
        assert_attr(&state, "display_name", "tfDbSystemTest");
        assert_attr(&state, "cpu_core_count", "2");
        assert_attr(&state, "data_storage_size_in_gb", "256");
        assert_attr(&state, "ssh_public_keys.#", "1");
        assert_attr(&state, "source", "NONE");
        assert_attr(&state, "time_created", "2018-09-14 18:41:05 +0000 UTC");
        assert_attr(&state, "db_home.#", "1");
        assert_attr(&state, "db_home.0.db_version", "12.1.0.2");
        assert_attr(&state, "db_home.0.display_name", "dbHome1");
        assert_attr(&state, "db_home.0.database.#", "1");
        assert_attr(&state, "db_home.0.database.0.admin_password", "BEstrO0ng_#11");
        assert_attr(&state, "db_home.0.database.0.db_name", "aTFdb");
        assert_attr(&state, "db_home.0.database.0.character_set", "AL32UTF8");
        assert_attr(&state, "db_home.0.database.0.ncharacter_set", "AL16UTF16");
        assert_attr(&state, "db_home.0.database.0.db_workload", "OLTP");
        assert_attr(&state, "db_home.0.database.0.pdb_name", "pdbName");
        assert_attr(
            &state,
            "db_home.0.database.0.db_backup_config.0.auto_backup_enabled",
            "true",
        );

        let launches = fake.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].source(), "NONE");
        assert_eq!(launches[0].base().hostname, "myOracleDB");

        let launch = &fake.requests("LaunchDbSystem")[0];
        let policy = launch.retry_policy.as_ref().unwrap();
        assert!(!policy.disable_not_found_retries);
        assert_eq!(policy.service, "database");

        // Re-planning the same configuration is a no-op.
        let plan = tester.plan_update(DB_SYSTEM, state, config).await.unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_db_system_scale_cpu_in_place() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let state = created_db_system(&fake, "tfDbSystemTest").await;

        let mut config = db_system_config("tfDbSystemTest");
        config["cpu_core_count"] = json!(4);
        let (plan, updated) = tester
            .lifecycle_apply(DB_SYSTEM, state.clone(), config)
            .await
            .unwrap();

        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "cpu_core_count");
        assert_eq!(plan.changes.len(), 1);
        assert_attr(&updated, "cpu_core_count", "4");
        assert_attr(&updated, "state", "AVAILABLE");
        assert_eq!(updated["id"], state["id"]);

        assert_eq!(
            fake.db_system_updates(),
            vec![UpdateDbSystemDetails {
                cpu_core_count: Some(4),
                ..Default::default()
            }]
        );
        assert_eq!(fake.call_count("UpdateDatabase"), 0);
    }

    #[tokio::test]
    async fn test_db_system_backup_config_updates_database() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let state = created_db_system(&fake, "tfDbSystemTest").await;

        let mut config = db_system_config("tfDbSystemTest");
        config["db_home"]["database"]["db_backup_config"]["auto_backup_enabled"] = json!(false);
        let (plan, updated) = tester
            .lifecycle_apply(DB_SYSTEM, state, config)
            .await
            .unwrap();

        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(
            &plan,
            "db_home.0.database.0.db_backup_config.0.auto_backup_enabled",
        );
        assert_attr(
            &updated,
            "db_home.0.database.0.db_backup_config.0.auto_backup_enabled",
            "false",
        );

        let updates = fake.database_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0]
                .db_backup_config
                .as_ref()
                .and_then(|c| c.auto_backup_enabled),
            Some(false)
        );
        assert_eq!(fake.call_count("UpdateDbSystem"), 0);
    }

    #[tokio::test]
    async fn test_db_system_database_tags_update_in_place() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let mut config = db_system_config("tfDbSystemTest");
        config["db_home"]["database"]["defined_tags"] =
            json!({"example-namespace.example-key": "value"});
        config["db_home"]["database"]["freeform_tags"] = json!({"Department": "Finance"});
        let state = tester.lifecycle_create(DB_SYSTEM, config.clone()).await.unwrap();
        assert_attr(&state, "db_home.0.database.0.freeform_tags.Department", "Finance");

        config["db_home"]["database"]["defined_tags"] =
            json!({"example-namespace.example-key": "updateValue"});
        config["db_home"]["database"]["freeform_tags"] = json!({"Department": "Admin"});
        let (plan, updated) = tester
            .lifecycle_apply(DB_SYSTEM, state, config.clone())
            .await
            .unwrap();

        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "db_home.0.database.0.freeform_tags");
        assert_attr(&updated, "db_home.0.database.0.freeform_tags.Department", "Admin");
        assert_attr(
            &updated,
            "db_home.0.database.0.defined_tags.example-namespace.example-key",
            "updateValue",
        );

        let updates = fake.database_updates();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].db_backup_config.is_none());
        assert_eq!(
            updates[0].freeform_tags.as_ref().and_then(|t| t.get("Department")).map(String::as_str),
            Some("Admin")
        );
        assert!(updates[0].defined_tags.is_some());
        assert_eq!(fake.call_count("UpdateDbSystem"), 0);

        let plan = tester.plan_update(DB_SYSTEM, updated, config).await.unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_db_system_force_new_replaces() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let state = created_db_system(&fake, "tfDbSystemTest").await;

        let (plan, replaced) = tester
            .lifecycle_apply(DB_SYSTEM, state.clone(), db_system_config("tfDbSystemTest2"))
            .await
            .unwrap();

        assert_plan_replaces(&plan);
        assert_ne!(replaced["id"], state["id"]);
        assert_attr(&replaced, "display_name", "tfDbSystemTest2");
        assert_eq!(fake.call_count("TerminateDbSystem"), 1);
        assert_eq!(fake.launches().len(), 2);
    }

    #[tokio::test]
    async fn test_db_system_delete() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let state = created_db_system(&fake, "tfDbSystemTest").await;
        let id = str_attr(&state, "/id");

        tester.lifecycle_delete(DB_SYSTEM, state.clone()).await.unwrap();
        assert_eq!(
            fake.db_system(&id).map(|s| s.lifecycle_state.as_str()),
            Some("TERMINATED")
        );

        // Terminated systems drop out of state, and deleting again is a no-op.
        assert_eq!(tester.read(DB_SYSTEM, state.clone()).await.unwrap(), Value::Null);
        tester.delete(DB_SYSTEM, state).await.unwrap();
    }

    #[tokio::test]
    async fn test_db_system_read_missing_voids_state() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);

        let state = tester
            .read(DB_SYSTEM, json!({"id": "ocid1.dbsystem.oc1..gone"}))
            .await
            .unwrap();
        assert_eq!(state, Value::Null);

        let requests = fake.requests("GetDbSystem");
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .retry_policy
            .as_ref()
            .is_some_and(|p| p.disable_not_found_retries));
    }

    #[tokio::test]
    async fn test_db_system_read_propagates_service_errors() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let state = created_db_system(&fake, "tfDbSystemTest").await;

        fake.fail_next("GetDbSystem", 500, "InternalServerError");
        let err = tester.read(DB_SYSTEM, state).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_db_system_from_backup() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let source = created_db_system(&fake, "tfDbSystemTest").await;
        let database_id = str_attr(&source, "/db_home/0/database/0/id");

        // Restoring needs the database's first backup to be ACTIVE.
        let api = fake.clone();
        let request = ListBackupsRequest {
            database_id: Some(database_id.clone()),
            ..Default::default()
        };
        let page = wait_till_condition(
            move || {
                let api = api.clone();
                let request = request.clone();
                async move { api.list_backups(request).await }
            },
            |page: &Page<Backup>| {
                page.items
                    .first()
                    .map_or(true, |backup| backup.lifecycle_state != BackupLifecycleState::Active)
            },
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(fake.call_count("ListBackups"), 1);

        let backups = tester
            .read_data_source("oci_database_backups", json!({ "database_id": database_id }))
            .await
            .unwrap();
        assert_attr(&backups, "backups.#", "1");
        let backup_id = str_attr(&backups, "/backups/0/id");

        let mut config = db_system_config("tfDbSystemFromBackup");
        config["source"] = json!("DB_BACKUP");
        config["db_home"] = json!({
            "database": {
                "admin_password": "BEstrO0ng_#11",
                "backup_id": backup_id,
                "backup_tde_password": "BEstrO0ng_#11",
            },
        });
        tester
            .validate_resource_config(DB_SYSTEM, config.clone())
            .await
            .unwrap();

        let state = tester.lifecycle_create(DB_SYSTEM, config.clone()).await.unwrap();
        assert_attr(&state, "source", "DB_BACKUP");
        assert_attr(&state, "state", "AVAILABLE");
        assert_attr(&state, "db_home.0.database.0.db_name", "dbback");
        assert_attr(&state, "db_home.0.database.0.backup_id", &backup_id);
        assert_attr(&state, "db_home.0.database.0.character_set", "AL32UTF8");
        assert_eq!(fake.launches()[1].source(), "DB_BACKUP");

        let plan = tester.plan_update(DB_SYSTEM, state, config).await.unwrap();
        assert_plan_no_changes(&plan);

        let restored = tester
            .read_data_source(
                "oci_database_db_systems",
                json!({ "compartment_id": COMPARTMENT, "backup_id": backup_id }),
            )
            .await
            .unwrap();
        assert_attr(&restored, "db_systems.#", "1");
        assert_attr(&restored, "db_systems.0.display_name", "tfDbSystemFromBackup");
    }

    #[tokio::test]
    async fn test_db_system_validation() {
        let tester = ProviderTester::with_fake(&FakeOci::new());

        let mut config = db_system_config("tfDbSystemTest");
        config["source"] = json!("DB_BACKUP");
        config["db_home"]["database"]["backup_id"] = json!("ocid1.dbbackup.oc1..aaaa");
        let diags = tester
            .provider()
            .validate_resource_config(DB_SYSTEM, config)
            .await
            .unwrap();
        assert_eq!(diags.len(), 1);
        assert_error_contains(&diags, "db_home.0.database.0.backup_tde_password");

        let mut config = db_system_config("tfDbSystemTest");
        config["timeouts"] = json!({"create": "forever"});
        let diags = tester
            .provider()
            .validate_resource_config(DB_SYSTEM, config)
            .await
            .unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("timeouts"));

        let mut config = db_system_config("tfDbSystemTest");
        config["timeouts"] = json!({"create": "3h", "delete": "90m"});
        tester
            .validate_resource_config(DB_SYSTEM, config)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_db_system_import() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let state = created_db_system(&fake, "tfDbSystemTest").await;
        let id = str_attr(&state, "/id");

        let imported = tester.import_resource(DB_SYSTEM, &id).await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, DB_SYSTEM);
        assert_attr(&imported[0].state, "id", &id);
        assert_attr(&imported[0].state, "hostname", "myoracledb");
        assert_attr(&imported[0].state, "db_home.0.database.0.db_name", "aTFdb");

        let err = tester
            .import_resource(DB_SYSTEM, "ocid1.dbsystem.oc1..missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_database_data_sources() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        let state = created_db_system(&fake, "tfDbSystemTest").await;
        let system_id = str_attr(&state, "/id");

        let systems = tester
            .read_data_source(
                "oci_database_db_systems",
                json!({
                    "compartment_id": COMPARTMENT,
                    "filter": {"name": "display_name", "values": ["tfDbSystemTest"]},
                }),
            )
            .await
            .unwrap();
        assert_attr_set(&systems, "id");
        assert_attr(&systems, "db_systems.#", "1");
        assert_attr(&systems, "db_systems.0.id", &system_id);
        assert_attr(&systems, "db_systems.0.state", "AVAILABLE");

        let homes = tester
            .read_data_source(
                "oci_database_db_homes",
                json!({ "compartment_id": COMPARTMENT, "db_system_id": system_id }),
            )
            .await
            .unwrap();
        assert_attr(&homes, "db_homes.#", "1");
        let home_id = str_attr(&homes, "/db_homes/0/db_home_id");

        let home = tester
            .read_data_source("oci_database_db_home", json!({ "db_home_id": home_id }))
            .await
            .unwrap();
        assert_attr(&home, "db_version", "12.1.0.2");
        assert_attr(&home, "db_system_id", &system_id);
        assert_attr(&home, "state", "AVAILABLE");

        let databases = tester
            .read_data_source(
                "oci_database_databases",
                json!({ "compartment_id": COMPARTMENT, "db_home_id": home_id }),
            )
            .await
            .unwrap();
        assert_attr(&databases, "databases.#", "1");
        assert_attr(&databases, "databases.0.db_name", "aTFdb");
        assert_attr_set(&databases, "databases.0.connection_strings.0.cdb_default");
        let database_id = str_attr(&databases, "/databases/0/id");

        let database = tester
            .read_data_source("oci_database_database", json!({ "database_id": database_id }))
            .await
            .unwrap();
        assert_attr(&database, "db_workload", "OLTP");
        assert_attr(&database, "db_home_id", &home_id);

        let nodes = tester
            .read_data_source(
                "oci_database_db_nodes",
                json!({ "compartment_id": COMPARTMENT, "db_system_id": system_id }),
            )
            .await
            .unwrap();
        assert_attr(&nodes, "db_nodes.#", "1");
        let node_id = str_attr(&nodes, "/db_nodes/0/id");

        let node = tester
            .read_data_source("oci_database_db_node", json!({ "db_node_id": node_id }))
            .await
            .unwrap();
        assert_attr(&node, "hostname", "myoracledb");
        assert_attr(&node, "db_system_id", &system_id);
        assert_attr_set(&node, "vnic_id");
    }

    #[tokio::test]
    async fn test_db_systems_follows_pages_and_filters() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);
        created_db_system(&fake, "tfDbSystemTest").await;
        created_db_system(&fake, "tfDbSystemOther").await;
        fake.set_page_size(1);

        let all = tester
            .read_data_source(
                "oci_database_db_systems",
                json!({ "compartment_id": COMPARTMENT }),
            )
            .await
            .unwrap();
        assert_attr(&all, "db_systems.#", "2");
        assert_eq!(fake.call_count("ListDbSystems"), 2);

        let matched = tester
            .read_data_source(
                "oci_database_db_systems",
                json!({
                    "compartment_id": COMPARTMENT,
                    "filter": [{"name": "display_name", "values": ["tfDbSystem(Te|Ot)"], "regex": true}],
                }),
            )
            .await
            .unwrap();
        assert_attr(&matched, "db_systems.#", "2");

        let none = tester
            .read_data_source(
                "oci_database_db_systems",
                json!({ "compartment_id": "ocid1.compartment.oc1..other" }),
            )
            .await
            .unwrap();
        assert_attr(&none, "db_systems.#", "0");
    }

    fn attachment_config(domain_name: &str, display_name: &str) -> Value {
        json!({
            "steering_policy_id": "ocid1.dnspolicy.oc1..aaaa",
            "zone_id": "ocid1.dns-zone.oc1..aaaa",
            "domain_name": domain_name,
            "display_name": display_name,
        })
    }

    #[tokio::test]
    async fn test_steering_policy_attachment_lifecycle() {
        let fake = FakeOci::new();
        let tester = ProviderTester::with_fake(&fake);

        let config = attachment_config("www.example.com", "displayName");
        tester
            .validate_resource_config(ATTACHMENT, config.clone())
            .await
            .unwrap();
        let state = tester.lifecycle_create(ATTACHMENT, config).await.unwrap();
        assert_attr(&state, "state", "ACTIVE");
        assert_attr(&state, "display_name", "displayName");
        assert_attr(&state, "compartment_id", FAKE_DNS_COMPARTMENT);
        assert_attr(&state, "rtypes.#", "3");
        assert_attr_set(&state, "self");

        let (plan, renamed) = tester
            .lifecycle_apply(
                ATTACHMENT,
                state.clone(),
                attachment_config("www.example.com", "displayName2"),
            )
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);
        assert_attr(&renamed, "display_name", "displayName2");
        assert_eq!(renamed["id"], state["id"]);
        assert_eq!(fake.call_count("UpdateSteeringPolicyAttachment"), 1);

        let (plan, moved) = tester
            .lifecycle_apply(
                ATTACHMENT,
                renamed,
                attachment_config("api.example.com", "displayName2"),
            )
            .await
            .unwrap();
        assert_plan_replaces(&plan);
        assert_ne!(moved["id"], state["id"]);
        assert_attr(&moved, "domain_name", "api.example.com");
        assert_eq!(fake.call_count("DeleteSteeringPolicyAttachment"), 1);

        tester.lifecycle_delete(ATTACHMENT, moved.clone()).await.unwrap();
        assert_eq!(tester.read(ATTACHMENT, moved).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_steering_policy_attachment_data_source() {
        let fake = FakeOci::new();
        fake.insert_steering_policy_attachment(SteeringPolicyAttachment {
            id: "ocid1.dnspolicyattachment.oc1..seeded".to_string(),
            compartment_id: COMPARTMENT.to_string(),
            display_name: Some("seeded".to_string()),
            domain_name: "www.example.com".to_string(),
            rtypes: vec!["A".to_string(), "AAAA".to_string()],
            self_uri: "https://dns.us-phoenix-1.oraclecloud.com/20180115/steeringPolicyAttachments/seeded"
                .to_string(),
            lifecycle_state: SteeringPolicyAttachmentLifecycleState::Active,
            steering_policy_id: "ocid1.dnspolicy.oc1..aaaa".to_string(),
            time_created: Some(fake_time()),
            zone_id: "ocid1.dns-zone.oc1..aaaa".to_string(),
        });
        let tester = ProviderTester::with_fake(&fake);

        let state = tester
            .read_data_source(
                ATTACHMENT,
                json!({ "steering_policy_attachment_id": "ocid1.dnspolicyattachment.oc1..seeded" }),
            )
            .await
            .unwrap();
        assert_attr(&state, "id", "ocid1.dnspolicyattachment.oc1..seeded");
        assert_attr(&state, "compartment_id", COMPARTMENT);
        assert_attr(&state, "display_name", "seeded");
        assert_attr(&state, "domain_name", "www.example.com");
        assert_attr(&state, "rtypes.#", "2");
        assert_attr(&state, "rtypes.1", "AAAA");
        assert_attr(&state, "state", "ACTIVE");
        assert_attr(&state, "steering_policy_id", "ocid1.dnspolicy.oc1..aaaa");
        assert_attr(&state, "time_created", "2018-09-14 18:41:05 +0000 UTC");
        assert_attr(&state, "zone_id", "ocid1.dns-zone.oc1..aaaa");
        assert_attr(
            &state,
            "self",
            "https://dns.us-phoenix-1.oraclecloud.com/20180115/steeringPolicyAttachments/seeded",
        );
    }

    #[rstest]
    #[case(DB_SYSTEM)]
    #[case(ATTACHMENT)]
    #[tokio::test]
    async fn test_unconfigured_provider_rejects_remote_calls(#[case] resource_type: &str) {
        let tester = ProviderTester::new(OciProvider::new());

        let err = tester
            .create(resource_type, json!({"id": null}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = tester
            .read(resource_type, json!({"id": "ocid1.x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        // Null state needs no remote call.
        assert_eq!(tester.read(resource_type, Value::Null).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_types_are_rejected() {
        let tester = ProviderTester::with_fake(&FakeOci::new());
        assert!(tester.plan_create("oci_core_instance", json!({})).await.is_err());
        assert!(tester
            .read_data_source("oci_core_instances", json!({}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_upgrade_resource_state() {
        let tester = ProviderTester::with_fake(&FakeOci::new());
        let state = json!({"id": "ocid1.dbsystem.oc1..aaaa"});
        assert_eq!(
            tester
                .upgrade_resource_state(DB_SYSTEM, 0, state.clone())
                .await
                .unwrap(),
            state
        );
        assert!(tester
            .upgrade_resource_state(DB_SYSTEM, 3, state)
            .await
            .is_err());
    }
}
