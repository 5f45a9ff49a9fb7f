//! `oci_database_db_nodes` and `oci_database_db_node`

use serde_json::Value;

use super::{db_node_fields, db_node_to_map, set_all, SERVICE};
use crate::client::database::{DbNode, GetDbNodeRequest, ListDbNodesRequest};
use crate::client::{list_all, OracleClients};
use crate::crud::{read_data_source, ResourceReader};
use crate::error::ProviderError;
use crate::filter::{apply_filters, Filter};
use crate::resources::{
    computed_object_list, generate_data_source_id, with_computed_fields, DataSourceType,
};
use crate::schema::{filter_block, Attribute, Schema};

data_source_crud!(DbNodesDataSourceCrud, Vec<DbNode>);

#[async_trait::async_trait]
impl ResourceReader for DbNodesDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let request = ListDbNodesRequest {
            compartment_id: self.data.get_string("compartment_id").unwrap_or_default(),
            db_system_id: self.data.get_string("db_system_id").unwrap_or_default(),
            lifecycle_state: self.data.get_string("state"),
            page: None,
            metadata: self.clients.metadata(false, SERVICE),
        };
        let api = self.clients.database.clone();
        let nodes = list_all(|page| {
            let api = api.clone();
            let request = ListDbNodesRequest {
                page,
                ..request.clone()
            };
            async move { api.list_db_nodes(request).await }
        })
        .await?;
        self.res = Some(nodes);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        let Some(nodes) = &self.res else {
            return Ok(());
        };
        let filters = Filter::from_value(self.data.get("filter"))?;
        let nodes = apply_filters(&filters, nodes.iter().map(db_node_to_map).collect())?;

        self.data.set_id(generate_data_source_id());
        self.data.set("db_nodes", Value::Array(nodes));
        Ok(())
    }
}

/// Lists the nodes of a DB system.
pub struct DbNodesDataSource;

#[async_trait::async_trait]
impl DataSourceType for DbNodesDataSource {
    fn name(&self) -> &'static str {
        "oci_database_db_nodes"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("compartment_id", Attribute::required_string())
            .with_attribute("db_system_id", Attribute::required_string())
            .with_attribute("state", Attribute::optional_string())
            .with_attribute("db_nodes", computed_object_list(&db_node_fields()))
            .with_block("filter", filter_block())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = DbNodesDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}

data_source_crud!(DbNodeDataSourceCrud, DbNode);

#[async_trait::async_trait]
impl ResourceReader for DbNodeDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let node = self
            .clients
            .database
            .get_db_node(GetDbNodeRequest {
                db_node_id: self.data.get_string("db_node_id").unwrap_or_default(),
                metadata: self.clients.metadata(false, SERVICE),
            })
            .await?;
        self.res = Some(node);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        if let Some(node) = &self.res {
            set_all(&mut self.data, db_node_to_map(node));
        }
        Ok(())
    }
}

/// A single DB node by OCID.
pub struct DbNodeDataSource;

#[async_trait::async_trait]
impl DataSourceType for DbNodeDataSource {
    fn name(&self) -> &'static str {
        "oci_database_db_node"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0().with_attribute("db_node_id", Attribute::required_string());
        with_computed_fields(schema, &db_node_fields())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = DbNodeDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}
