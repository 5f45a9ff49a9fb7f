//! An in-memory Database and DNS service.
//!
//! Objects move one lifecycle step per `Get` call: a system launched as
//! PROVISIONING reads back AVAILABLE, a terminating one reads back
//! TERMINATED. Every call is recorded with its request metadata.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::client::database::{
    Backup, BackupLifecycleState, Database, DatabaseApi, DatabaseConnectionStrings,
    DatabaseLifecycleState, DbBackupConfig, DbHome, DbHomeLifecycleState, DbNode,
    DbNodeLifecycleState, DbSystem, DbSystemLifecycleState, GetDatabaseRequest,
    GetDbHomeRequest, GetDbNodeRequest, GetDbSystemRequest, LaunchDbSystem,
    LaunchDbSystemRequest, ListBackupsRequest, ListDatabasesRequest, ListDbHomesRequest,
    ListDbNodesRequest, ListDbSystemsRequest, TerminateDbSystemRequest, UpdateDatabaseDetails,
    UpdateDatabaseRequest, UpdateDbSystemDetails, UpdateDbSystemRequest,
};
use crate::client::dns::{
    CreateSteeringPolicyAttachmentRequest, DeleteSteeringPolicyAttachmentRequest, DnsApi,
    GetSteeringPolicyAttachmentRequest, SteeringPolicyAttachment,
    SteeringPolicyAttachmentLifecycleState, UpdateSteeringPolicyAttachmentRequest,
};
use crate::client::{OracleClients, Page, RequestMetadata};
use crate::error::{ProviderError, ServiceError};
use crate::waiter::PollSettings;

/// Poll intervals that keep lifecycle waits against the fake fast.
pub const FAKE_POLL: PollSettings = PollSettings {
    poll_interval: Duration::from_millis(1),
    max_poll_interval: Duration::from_millis(5),
};

/// Compartment every steering policy attachment is reported in.
pub const FAKE_DNS_COMPARTMENT: &str = "ocid1.compartment.oc1..fakedns";

/// Timestamp stamped on every object the fake creates.
pub fn fake_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_536_950_465, 0).unwrap_or_default()
}

#[derive(Default)]
struct FakeState {
    next_id: u32,
    db_systems: BTreeMap<String, DbSystem>,
    launched_from: HashMap<String, String>,
    db_homes: BTreeMap<String, DbHome>,
    databases: BTreeMap<String, Database>,
    db_nodes: BTreeMap<String, DbNode>,
    backups: BTreeMap<String, Backup>,
    attachments: BTreeMap<String, SteeringPolicyAttachment>,
    calls: Vec<(String, RequestMetadata)>,
    launches: Vec<LaunchDbSystem>,
    db_system_updates: Vec<UpdateDbSystemDetails>,
    database_updates: Vec<UpdateDatabaseDetails>,
    failures: HashMap<String, (u16, String)>,
    page_size: Option<usize>,
}

impl FakeState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

fn not_found(operation: &str, id: &str) -> ProviderError {
    ServiceError::new(
        operation,
        404,
        "NotAuthorizedOrNotFound",
        format!("Authorization failed or requested resource {} not found", id),
    )
    .into()
}

fn page_of<T: Clone>(items: Vec<T>, page: Option<&str>, size: Option<usize>) -> Page<T> {
    let Some(size) = size.filter(|s| *s > 0) else {
        return Page::last(items);
    };
    let start: usize = page.and_then(|p| p.parse().ok()).unwrap_or(0);
    let end = start.saturating_add(size).min(items.len());
    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        opc_next_page: (end < items.len()).then(|| end.to_string()),
    }
}

fn field_matches(filter: Option<&String>, value: &str) -> bool {
    filter.map_or(true, |f| f == value)
}

/// In-memory implementation of [`DatabaseApi`] and [`DnsApi`].
///
/// Clones share state, so a test can keep a handle while the provider owns
/// another.
#[derive(Clone, Default)]
pub struct FakeOci {
    state: Arc<Mutex<FakeState>>,
}

impl FakeOci {
    /// An empty service.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Record the call and fail it if a failure was injected for the operation.
    fn begin(
        &self,
        operation: &str,
        metadata: &RequestMetadata,
    ) -> Result<MutexGuard<'_, FakeState>, ProviderError> {
        let mut state = self.lock();
        state.calls.push((operation.to_string(), metadata.clone()));
        if let Some((status, code)) = state.failures.remove(operation) {
            return Err(ServiceError::new(operation, status, code, "injected failure").into());
        }
        Ok(state)
    }

    /// Clients backed by this fake, polling fast.
    pub fn clients(&self) -> OracleClients {
        OracleClients::new(Arc::new(self.clone()), Arc::new(self.clone()))
            .with_poll_settings(FAKE_POLL)
    }

    /// Fail the next call of `operation` with the given status and code.
    pub fn fail_next(&self, operation: &str, status: u16, code: &str) {
        self.lock()
            .failures
            .insert(operation.to_string(), (status, code.to_string()));
    }

    /// Return list results `size` items per page.
    pub fn set_page_size(&self, size: usize) {
        self.lock().page_size = Some(size);
    }

    /// Operation names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.iter().map(|(op, _)| op.clone()).collect()
    }

    /// How often `operation` was called.
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|(op, _)| op == operation).count()
    }

    /// Metadata of every call of `operation`.
    pub fn requests(&self, operation: &str) -> Vec<RequestMetadata> {
        self.lock()
            .calls
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, metadata)| metadata.clone())
            .collect()
    }

    /// Bodies of every `LaunchDbSystem` call.
    pub fn launches(&self) -> Vec<LaunchDbSystem> {
        self.lock().launches.clone()
    }

    /// Bodies of every `UpdateDbSystem` call.
    pub fn db_system_updates(&self) -> Vec<UpdateDbSystemDetails> {
        self.lock().db_system_updates.clone()
    }

    /// Bodies of every `UpdateDatabase` call.
    pub fn database_updates(&self) -> Vec<UpdateDatabaseDetails> {
        self.lock().database_updates.clone()
    }

    /// A DB system as currently stored, without advancing it.
    pub fn db_system(&self, id: &str) -> Option<DbSystem> {
        self.lock().db_systems.get(id).cloned()
    }

    /// Store an attachment as-is.
    pub fn insert_steering_policy_attachment(&self, attachment: SteeringPolicyAttachment) {
        self.lock()
            .attachments
            .insert(attachment.id.clone(), attachment);
    }
}

fn advance_db_system(system: &mut DbSystem) {
    use DbSystemLifecycleState::*;
    system.lifecycle_state = match &system.lifecycle_state {
        Provisioning | Updating => Available,
        Terminating => Terminated,
        other => other.clone(),
    };
}

fn advance_database(database: &mut Database) {
    use DatabaseLifecycleState::*;
    database.lifecycle_state = match &database.lifecycle_state {
        Provisioning | Updating | BackupInProgress => Available,
        Terminating => Terminated,
        other => other.clone(),
    };
}

#[async_trait::async_trait]
impl DatabaseApi for FakeOci {
    async fn launch_db_system(&self, request: LaunchDbSystemRequest) -> Result<DbSystem, ProviderError> {
        let mut state = self.begin("LaunchDbSystem", &request.metadata)?;
        let n = state.next_id();
        let base = request.details.base().clone();
        let system_id = format!("ocid1.dbsystem.oc1..fake{}", n);
        let home_id = format!("ocid1.dbhome.oc1..fake{}", n);
        let hostname = base.hostname.to_lowercase();
        let domain = base
            .domain
            .clone()
            .unwrap_or_else(|| "tfsubnet.tfvcn.oraclevcn.com".to_string());

        let (db_version, home_name, mut database) = match &request.details {
            LaunchDbSystem::New(details) => {
                let home = &details.db_home;
                let db = &home.database;
                let database = Database {
                    id: String::new(),
                    compartment_id: base.compartment_id.clone(),
                    db_home_id: Some(home_id.clone()),
                    db_name: db.db_name.clone(),
                    db_unique_name: String::new(),
                    character_set: db.character_set.clone().or(Some("AL32UTF8".to_string())),
                    ncharacter_set: db.ncharacter_set.clone().or(Some("AL16UTF16".to_string())),
                    db_workload: db.db_workload.clone().or(Some("OLTP".to_string())),
                    pdb_name: db.pdb_name.clone(),
                    lifecycle_state: DatabaseLifecycleState::Available,
                    lifecycle_details: None,
                    time_created: Some(fake_time()),
                    connection_strings: None,
                    db_backup_config: Some(db.db_backup_config.clone().unwrap_or(DbBackupConfig {
                        auto_backup_enabled: Some(false),
                    })),
                    defined_tags: db.defined_tags.clone().unwrap_or_default(),
                    freeform_tags: db.freeform_tags.clone().unwrap_or_default(),
                };
                (home.db_version.clone(), home.display_name.clone(), database)
            },
            LaunchDbSystem::FromBackup(details) => {
                let db = &details.db_home.database;
                let backup = state
                    .backups
                    .get(&db.backup_id)
                    .cloned()
                    .ok_or_else(|| not_found("LaunchDbSystem", &db.backup_id))?;
                let source = backup
                    .database_id
                    .as_ref()
                    .and_then(|id| state.databases.get(id))
                    .cloned();
                let database = Database {
                    id: String::new(),
                    compartment_id: base.compartment_id.clone(),
                    db_home_id: Some(home_id.clone()),
                    db_name: db.db_name.clone().unwrap_or_else(|| "dbback".to_string()),
                    db_unique_name: String::new(),
                    character_set: source.as_ref().and_then(|s| s.character_set.clone()),
                    ncharacter_set: source.as_ref().and_then(|s| s.ncharacter_set.clone()),
                    db_workload: source.as_ref().and_then(|s| s.db_workload.clone()),
                    pdb_name: None,
                    lifecycle_state: DatabaseLifecycleState::Available,
                    lifecycle_details: None,
                    time_created: Some(fake_time()),
                    connection_strings: None,
                    db_backup_config: Some(DbBackupConfig {
                        auto_backup_enabled: Some(false),
                    }),
                    defined_tags: HashMap::new(),
                    freeform_tags: HashMap::new(),
                };
                state
                    .launched_from
                    .insert(system_id.clone(), db.backup_id.clone());
                (None, details.db_home.display_name.clone(), database)
            },
        };

        database.id = format!("ocid1.database.oc1..fake{}", n);
        database.db_unique_name = format!("{}_fake{}", database.db_name, n);
        database.connection_strings = Some(DatabaseConnectionStrings {
            cdb_default: Some(format!("{}.{}:1521/{}", hostname, domain, database.db_unique_name)),
            cdb_ip_default: Some(format!("10.0.2.2:1521/{}", database.db_unique_name)),
            all_connection_strings: HashMap::new(),
        });

        let home = DbHome {
            id: home_id.clone(),
            compartment_id: base.compartment_id.clone(),
            db_system_id: Some(system_id.clone()),
            db_version: db_version.unwrap_or_else(|| "12.1.0.2".to_string()),
            display_name: home_name.unwrap_or_else(|| format!("dbHome{}", n)),
            last_patch_history_entry_id: None,
            lifecycle_state: DbHomeLifecycleState::Available,
            time_created: Some(fake_time()),
        };

        let node = DbNode {
            id: format!("ocid1.dbnode.oc1..fake{}", n),
            db_system_id: system_id.clone(),
            hostname: Some(hostname.clone()),
            vnic_id: format!("ocid1.vnic.oc1..fake{}", n),
            backup_vnic_id: None,
            fault_domain: Some("FAULT-DOMAIN-1".to_string()),
            software_storage_size_in_gb: Some(200),
            lifecycle_state: DbNodeLifecycleState::Available,
            time_created: Some(fake_time()),
        };

        let backup = Backup {
            id: format!("ocid1.dbbackup.oc1..fake{}", n),
            compartment_id: Some(base.compartment_id.clone()),
            database_id: Some(database.id.clone()),
            display_name: Some("Automatic Backup".to_string()),
            availability_domain: Some(base.availability_domain.clone()),
            database_edition: base.database_edition.clone(),
            database_size_in_gbs: Some(1.0),
            lifecycle_details: None,
            lifecycle_state: BackupLifecycleState::Active,
            time_started: Some(fake_time()),
            time_ended: Some(fake_time()),
            backup_type: Some("INCREMENTAL".to_string()),
        };

        let system = DbSystem {
            id: system_id.clone(),
            compartment_id: base.compartment_id.clone(),
            availability_domain: base.availability_domain.clone(),
            subnet_id: base.subnet_id.clone(),
            backup_subnet_id: base.backup_subnet_id.clone(),
            shape: base.shape.clone(),
            ssh_public_keys: base.ssh_public_keys.clone(),
            hostname,
            domain: Some(domain),
            cpu_core_count: base.cpu_core_count,
            cluster_name: base.cluster_name.clone(),
            data_storage_percentage: base.data_storage_percentage.or(Some(80)),
            database_edition: base
                .database_edition
                .clone()
                .or(Some("ENTERPRISE_EDITION".to_string())),
            display_name: base
                .display_name
                .clone()
                .or_else(|| Some(format!("dbsystem{}", n))),
            fault_domains: base.fault_domains.clone().unwrap_or_default(),
            lifecycle_state: DbSystemLifecycleState::Provisioning,
            lifecycle_details: None,
            time_created: Some(fake_time()),
            listener_port: Some(1521),
            node_count: base.node_count.or(Some(1)),
            data_storage_size_in_gbs: base.data_storage_size_in_gbs.or(Some(256)),
            reco_storage_size_in_gb: Some(1024),
            disk_redundancy: base.disk_redundancy.clone().or(Some("HIGH".to_string())),
            license_model: base
                .license_model
                .clone()
                .or(Some("LICENSE_INCLUDED".to_string())),
            scan_dns_record_id: None,
            scan_ip_ids: Vec::new(),
            vip_ids: Vec::new(),
            version: Some("12.1.0.2.180717".to_string()),
            last_patch_history_entry_id: None,
            sparse_diskgroup: base.sparse_diskgroup,
            time_zone: base.time_zone.clone().or(Some("UTC".to_string())),
            defined_tags: base.defined_tags.clone().unwrap_or_default(),
            freeform_tags: base.freeform_tags.clone().unwrap_or_default(),
        };

        state.databases.insert(database.id.clone(), database);
        state.db_homes.insert(home.id.clone(), home);
        state.db_nodes.insert(node.id.clone(), node);
        state.backups.insert(backup.id.clone(), backup);
        state.db_systems.insert(system_id, system.clone());
        state.launches.push(request.details);
        Ok(system)
    }

    async fn get_db_system(&self, request: GetDbSystemRequest) -> Result<DbSystem, ProviderError> {
        let mut state = self.begin("GetDbSystem", &request.metadata)?;
        let system = state
            .db_systems
            .get_mut(&request.db_system_id)
            .ok_or_else(|| not_found("GetDbSystem", &request.db_system_id))?;
        advance_db_system(system);
        Ok(system.clone())
    }

    async fn list_db_systems(&self, request: ListDbSystemsRequest) -> Result<Page<DbSystem>, ProviderError> {
        let state = self.begin("ListDbSystems", &request.metadata)?;
        let items = state
            .db_systems
            .values()
            .filter(|s| s.compartment_id == request.compartment_id)
            .filter(|s| field_matches(request.availability_domain.as_ref(), &s.availability_domain))
            .filter(|s| {
                request.backup_id.is_none()
                    || state.launched_from.get(&s.id) == request.backup_id.as_ref()
            })
            .filter(|s| {
                field_matches(
                    request.display_name.as_ref(),
                    s.display_name.as_deref().unwrap_or_default(),
                )
            })
            .filter(|s| field_matches(request.lifecycle_state.as_ref(), s.lifecycle_state.as_str()))
            .cloned()
            .collect();
        Ok(page_of(items, request.page.as_deref(), state.page_size))
    }

    async fn update_db_system(&self, request: UpdateDbSystemRequest) -> Result<DbSystem, ProviderError> {
        let mut state = self.begin("UpdateDbSystem", &request.metadata)?;
        let details = request.details;
        let system = state
            .db_systems
            .get_mut(&request.db_system_id)
            .ok_or_else(|| not_found("UpdateDbSystem", &request.db_system_id))?;
        if let Some(cpu_core_count) = details.cpu_core_count {
            system.cpu_core_count = cpu_core_count;
        }
        if let Some(size) = details.data_storage_size_in_gbs {
            system.data_storage_size_in_gbs = Some(size);
        }
        if let Some(keys) = &details.ssh_public_keys {
            system.ssh_public_keys = keys.clone();
        }
        if let Some(tags) = &details.defined_tags {
            system.defined_tags = tags.clone();
        }
        if let Some(tags) = &details.freeform_tags {
            system.freeform_tags = tags.clone();
        }
        system.lifecycle_state = DbSystemLifecycleState::Updating;
        let system = system.clone();
        state.db_system_updates.push(details);
        Ok(system)
    }

    async fn terminate_db_system(&self, request: TerminateDbSystemRequest) -> Result<(), ProviderError> {
        let mut state = self.begin("TerminateDbSystem", &request.metadata)?;
        match state.db_systems.get_mut(&request.db_system_id) {
            Some(system) if system.lifecycle_state != DbSystemLifecycleState::Terminated => {
                system.lifecycle_state = DbSystemLifecycleState::Terminating;
                Ok(())
            },
            _ => Err(not_found("TerminateDbSystem", &request.db_system_id)),
        }
    }

    async fn list_db_homes(&self, request: ListDbHomesRequest) -> Result<Page<DbHome>, ProviderError> {
        let state = self.begin("ListDbHomes", &request.metadata)?;
        let items = state
            .db_homes
            .values()
            .filter(|h| h.compartment_id == request.compartment_id)
            .filter(|h| h.db_system_id.as_deref() == Some(request.db_system_id.as_str()))
            .filter(|h| field_matches(request.display_name.as_ref(), &h.display_name))
            .filter(|h| field_matches(request.lifecycle_state.as_ref(), h.lifecycle_state.as_str()))
            .cloned()
            .collect();
        Ok(page_of(items, request.page.as_deref(), state.page_size))
    }

    async fn get_db_home(&self, request: GetDbHomeRequest) -> Result<DbHome, ProviderError> {
        let state = self.begin("GetDbHome", &request.metadata)?;
        state
            .db_homes
            .get(&request.db_home_id)
            .cloned()
            .ok_or_else(|| not_found("GetDbHome", &request.db_home_id))
    }

    async fn list_databases(&self, request: ListDatabasesRequest) -> Result<Page<Database>, ProviderError> {
        let state = self.begin("ListDatabases", &request.metadata)?;
        let items = state
            .databases
            .values()
            .filter(|d| d.compartment_id == request.compartment_id)
            .filter(|d| d.db_home_id.as_deref() == Some(request.db_home_id.as_str()))
            .filter(|d| field_matches(request.db_name.as_ref(), &d.db_name))
            .filter(|d| field_matches(request.lifecycle_state.as_ref(), d.lifecycle_state.as_str()))
            .cloned()
            .collect();
        Ok(page_of(items, request.page.as_deref(), state.page_size))
    }

    async fn get_database(&self, request: GetDatabaseRequest) -> Result<Database, ProviderError> {
        let mut state = self.begin("GetDatabase", &request.metadata)?;
        let database = state
            .databases
            .get_mut(&request.database_id)
            .ok_or_else(|| not_found("GetDatabase", &request.database_id))?;
        advance_database(database);
        Ok(database.clone())
    }

    async fn update_database(&self, request: UpdateDatabaseRequest) -> Result<Database, ProviderError> {
        let mut state = self.begin("UpdateDatabase", &request.metadata)?;
        let details = request.details;
        let database = state
            .databases
            .get_mut(&request.database_id)
            .ok_or_else(|| not_found("UpdateDatabase", &request.database_id))?;
        if let Some(config) = &details.db_backup_config {
            database.db_backup_config = Some(config.clone());
        }
        if let Some(tags) = &details.defined_tags {
            database.defined_tags = tags.clone();
        }
        if let Some(tags) = &details.freeform_tags {
            database.freeform_tags = tags.clone();
        }
        database.lifecycle_state = DatabaseLifecycleState::Updating;
        let database = database.clone();
        state.database_updates.push(details);
        Ok(database)
    }

    async fn list_db_nodes(&self, request: ListDbNodesRequest) -> Result<Page<DbNode>, ProviderError> {
        let state = self.begin("ListDbNodes", &request.metadata)?;
        let in_compartment = state
            .db_systems
            .get(&request.db_system_id)
            .is_some_and(|s| s.compartment_id == request.compartment_id);
        let items = state
            .db_nodes
            .values()
            .filter(|_| in_compartment)
            .filter(|n| n.db_system_id == request.db_system_id)
            .filter(|n| field_matches(request.lifecycle_state.as_ref(), n.lifecycle_state.as_str()))
            .cloned()
            .collect();
        Ok(page_of(items, request.page.as_deref(), state.page_size))
    }

    async fn get_db_node(&self, request: GetDbNodeRequest) -> Result<DbNode, ProviderError> {
        let state = self.begin("GetDbNode", &request.metadata)?;
        state
            .db_nodes
            .get(&request.db_node_id)
            .cloned()
            .ok_or_else(|| not_found("GetDbNode", &request.db_node_id))
    }

    async fn list_backups(&self, request: ListBackupsRequest) -> Result<Page<Backup>, ProviderError> {
        let state = self.begin("ListBackups", &request.metadata)?;
        let items = state
            .backups
            .values()
            .filter(|b| {
                request.database_id.is_none() || b.database_id.as_ref() == request.database_id.as_ref()
            })
            .filter(|b| {
                request.compartment_id.is_none()
                    || b.compartment_id.as_ref() == request.compartment_id.as_ref()
            })
            .cloned()
            .collect();
        Ok(page_of(items, request.page.as_deref(), state.page_size))
    }
}

#[async_trait::async_trait]
impl DnsApi for FakeOci {
    async fn create_steering_policy_attachment(
        &self,
        request: CreateSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError> {
        let mut state = self.begin("CreateSteeringPolicyAttachment", &request.metadata)?;
        let id = format!("ocid1.dnspolicyattachment.oc1..fake{}", state.next_id());
        let details = request.details;
        let attachment = SteeringPolicyAttachment {
            id: id.clone(),
            compartment_id: FAKE_DNS_COMPARTMENT.to_string(),
            display_name: details.display_name,
            domain_name: details.domain_name,
            rtypes: vec!["A".to_string(), "AAAA".to_string(), "CNAME".to_string()],
            self_uri: format!(
                "https://dns.us-phoenix-1.oraclecloud.com/20180115/steeringPolicyAttachments/{}",
                id
            ),
            lifecycle_state: SteeringPolicyAttachmentLifecycleState::Creating,
            steering_policy_id: details.steering_policy_id,
            time_created: Some(fake_time()),
            zone_id: details.zone_id,
        };
        state.attachments.insert(id, attachment.clone());
        Ok(attachment)
    }

    async fn get_steering_policy_attachment(
        &self,
        request: GetSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError> {
        let mut state = self.begin("GetSteeringPolicyAttachment", &request.metadata)?;
        let id = &request.steering_policy_attachment_id;
        let mut attachment = state
            .attachments
            .remove(id)
            .ok_or_else(|| not_found("GetSteeringPolicyAttachment", id))?;
        match attachment.lifecycle_state {
            SteeringPolicyAttachmentLifecycleState::Deleting => {
                return Err(not_found("GetSteeringPolicyAttachment", id));
            },
            SteeringPolicyAttachmentLifecycleState::Creating => {
                attachment.lifecycle_state = SteeringPolicyAttachmentLifecycleState::Active;
            },
            _ => {},
        }
        state.attachments.insert(id.clone(), attachment.clone());
        Ok(attachment)
    }

    async fn update_steering_policy_attachment(
        &self,
        request: UpdateSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError> {
        let mut state = self.begin("UpdateSteeringPolicyAttachment", &request.metadata)?;
        let id = &request.steering_policy_attachment_id;
        let attachment = state
            .attachments
            .get_mut(id)
            .ok_or_else(|| not_found("UpdateSteeringPolicyAttachment", id))?;
        if let Some(name) = request.details.display_name {
            attachment.display_name = Some(name);
        }
        Ok(attachment.clone())
    }

    async fn delete_steering_policy_attachment(
        &self,
        request: DeleteSteeringPolicyAttachmentRequest,
    ) -> Result<(), ProviderError> {
        let mut state = self.begin("DeleteSteeringPolicyAttachment", &request.metadata)?;
        let id = &request.steering_policy_attachment_id;
        let attachment = state
            .attachments
            .get_mut(id)
            .ok_or_else(|| not_found("DeleteSteeringPolicyAttachment", id))?;
        attachment.lifecycle_state = SteeringPolicyAttachmentLifecycleState::Deleting;
        Ok(())
    }
}
