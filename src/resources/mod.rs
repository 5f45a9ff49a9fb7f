//! Resource and data source registry.
//!
//! Every resource type pairs a [`Schema`] with Crud glue; the provider looks
//! types up here by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use serde_json::Value;

use crate::client::OracleClients;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

/// Declares the Crud struct of a data source: its attribute bag, the clients
/// and the last response.
macro_rules! data_source_crud {
    ($(#[$meta:meta])* $name:ident, $res:ty) => {
        $(#[$meta])*
        pub(crate) struct $name {
            data: $crate::state::ResourceData,
            clients: $crate::client::OracleClients,
            res: Option<$res>,
        }

        impl $name {
            pub(crate) fn new(
                clients: &$crate::client::OracleClients,
                config: serde_json::Value,
            ) -> Self {
                Self {
                    data: $crate::state::ResourceData::new(config),
                    clients: clients.clone(),
                    res: None,
                }
            }

            pub(crate) fn into_state(self) -> serde_json::Value {
                self.data.into_state()
            }
        }

        impl $crate::crud::CrudData for $name {
            fn data(&self) -> &$crate::state::ResourceData {
                &self.data
            }

            fn data_mut(&mut self) -> &mut $crate::state::ResourceData {
                &mut self.data
            }
        }

        impl $crate::crud::StatefulResource for $name {}
    };
}

pub mod database;
pub mod dns;

/// A managed resource type.
#[async_trait::async_trait]
pub trait ResourceType: Send + Sync {
    /// Type name, e.g. `oci_database_db_system`.
    fn name(&self) -> &'static str;

    /// Attribute schema.
    fn schema(&self) -> Schema;

    /// Checks beyond the schema. `config` has its blocks normalized.
    fn validate(&self, _config: &Value) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Create from the planned state and return the new state.
    async fn create(&self, clients: &OracleClients, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh the state; `null` when the resource is gone.
    async fn read(&self, clients: &OracleClients, state: Value) -> Result<Value, ProviderError>;

    /// Update in place and return the new state.
    async fn update(
        &self,
        clients: &OracleClients,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the resource.
    async fn delete(&self, clients: &OracleClients, state: Value) -> Result<(), ProviderError>;
}

/// A read-only data source type.
#[async_trait::async_trait]
pub trait DataSourceType: Send + Sync {
    /// Type name, e.g. `oci_database_db_homes`.
    fn name(&self) -> &'static str;

    /// Attribute schema.
    fn schema(&self) -> Schema;

    /// Read the data source and return its state.
    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError>;
}

/// Every resource and data source the provider serves.
#[derive(Clone)]
pub struct Registry {
    resources: BTreeMap<&'static str, Arc<dyn ResourceType>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSourceType>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// The registry with every supported type.
    pub fn new() -> Self {
        let mut registry = Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        };
        registry.register_resource(Arc::new(database::DbSystemResource));
        registry.register_resource(Arc::new(dns::SteeringPolicyAttachmentResource));

        registry.register_data_source(Arc::new(database::DbSystemsDataSource));
        registry.register_data_source(Arc::new(database::DbHomesDataSource));
        registry.register_data_source(Arc::new(database::DbHomeDataSource));
        registry.register_data_source(Arc::new(database::DatabasesDataSource));
        registry.register_data_source(Arc::new(database::DatabaseDataSource));
        registry.register_data_source(Arc::new(database::DbNodesDataSource));
        registry.register_data_source(Arc::new(database::DbNodeDataSource));
        registry.register_data_source(Arc::new(database::BackupsDataSource));
        registry.register_data_source(Arc::new(dns::SteeringPolicyAttachmentDataSource));
        registry
    }

    fn register_resource(&mut self, resource: Arc<dyn ResourceType>) {
        self.resources.insert(resource.name(), resource);
    }

    fn register_data_source(&mut self, data_source: Arc<dyn DataSourceType>) {
        self.data_sources.insert(data_source.name(), data_source);
    }

    /// Look up a resource type.
    pub fn resource(&self, name: &str) -> Result<Arc<dyn ResourceType>, ProviderError> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(name.to_string()))
    }

    /// Look up a data source type.
    pub fn data_source(&self, name: &str) -> Result<Arc<dyn DataSourceType>, ProviderError> {
        self.data_sources
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(name.to_string()))
    }

    /// Resource types in name order.
    pub fn resources(&self) -> impl Iterator<Item = &Arc<dyn ResourceType>> {
        self.resources.values()
    }

    /// Data source types in name order.
    pub fn data_sources(&self) -> impl Iterator<Item = &Arc<dyn DataSourceType>> {
        self.data_sources.values()
    }
}

/// Id for a plural data source, which has no remote identity of its own.
pub fn generate_data_source_id() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("TerraformDataSource-{}", suffix)
}

/// Field names and types of an object returned by a data source.
pub(crate) type Fields = Vec<(&'static str, AttributeType)>;

/// A computed list of objects with the given fields.
pub(crate) fn computed_object_list(fields: &Fields) -> Attribute {
    let object = fields
        .iter()
        .map(|(name, attr_type)| (name.to_string(), attr_type.clone()))
        .collect();
    Attribute::new(
        AttributeType::list(AttributeType::object(object)),
        AttributeFlags::computed(),
    )
}

/// Declare each field as a computed attribute, keeping attributes the schema
/// already has (the lookup arguments of a singular data source).
pub(crate) fn with_computed_fields(mut schema: Schema, fields: &Fields) -> Schema {
    for (name, attr_type) in fields {
        if !schema.block.attributes.contains_key(*name) {
            schema = schema.with_attribute(
                *name,
                Attribute::new(attr_type.clone(), AttributeFlags::computed()),
            );
        }
    }
    schema
}
