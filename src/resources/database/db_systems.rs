//! `oci_database_db_systems`

use serde_json::Value;

use super::{db_system_fields, db_system_to_map, SERVICE};
use crate::client::database::{DbSystem, ListDbSystemsRequest};
use crate::client::{list_all, OracleClients};
use crate::crud::{read_data_source, ResourceReader};
use crate::error::ProviderError;
use crate::filter::{apply_filters, Filter};
use crate::resources::{computed_object_list, generate_data_source_id, DataSourceType};
use crate::schema::{filter_block, Attribute, Schema};

data_source_crud!(DbSystemsDataSourceCrud, Vec<DbSystem>);

#[async_trait::async_trait]
impl ResourceReader for DbSystemsDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let request = ListDbSystemsRequest {
            compartment_id: self.data.get_string("compartment_id").unwrap_or_default(),
            availability_domain: self.data.get_string("availability_domain"),
            backup_id: self.data.get_string("backup_id"),
            display_name: self.data.get_string("display_name"),
            lifecycle_state: self.data.get_string("state"),
            page: None,
            metadata: self.clients.metadata(false, SERVICE),
        };
        let api = self.clients.database.clone();
        let systems = list_all(|page| {
            let api = api.clone();
            let request = ListDbSystemsRequest {
                page,
                ..request.clone()
            };
            async move { api.list_db_systems(request).await }
        })
        .await?;
        self.res = Some(systems);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        let Some(systems) = &self.res else {
            return Ok(());
        };
        let filters = Filter::from_value(self.data.get("filter"))?;
        let systems = apply_filters(&filters, systems.iter().map(db_system_to_map).collect())?;

        self.data.set_id(generate_data_source_id());
        self.data.set("db_systems", Value::Array(systems));
        Ok(())
    }
}

/// Lists the DB systems of a compartment.
pub struct DbSystemsDataSource;

#[async_trait::async_trait]
impl DataSourceType for DbSystemsDataSource {
    fn name(&self) -> &'static str {
        "oci_database_db_systems"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("compartment_id", Attribute::required_string())
            .with_attribute("availability_domain", Attribute::optional_string())
            .with_attribute("backup_id", Attribute::optional_string())
            .with_attribute("display_name", Attribute::optional_string())
            .with_attribute("state", Attribute::optional_string())
            .with_attribute("db_systems", computed_object_list(&db_system_fields()))
            .with_block("filter", filter_block())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = DbSystemsDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}
