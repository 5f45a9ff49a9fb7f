//! `oci_database_databases` and `oci_database_database`

use serde_json::Value;

use super::{database_fields, database_to_map, set_all, SERVICE};
use crate::client::database::{Database, GetDatabaseRequest, ListDatabasesRequest};
use crate::client::{list_all, OracleClients};
use crate::crud::{read_data_source, ResourceReader};
use crate::error::ProviderError;
use crate::filter::{apply_filters, Filter};
use crate::resources::{
    computed_object_list, generate_data_source_id, with_computed_fields, DataSourceType,
};
use crate::schema::{filter_block, Attribute, Schema};

data_source_crud!(DatabasesDataSourceCrud, Vec<Database>);

#[async_trait::async_trait]
impl ResourceReader for DatabasesDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let request = ListDatabasesRequest {
            compartment_id: self.data.get_string("compartment_id").unwrap_or_default(),
            db_home_id: self.data.get_string("db_home_id").unwrap_or_default(),
            db_name: self.data.get_string("db_name"),
            lifecycle_state: self.data.get_string("state"),
            page: None,
            metadata: self.clients.metadata(false, SERVICE),
        };
        let api = self.clients.database.clone();
        let databases = list_all(|page| {
            let api = api.clone();
            let request = ListDatabasesRequest {
                page,
                ..request.clone()
            };
            async move { api.list_databases(request).await }
        })
        .await?;
        self.res = Some(databases);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        let Some(databases) = &self.res else {
            return Ok(());
        };
        let filters = Filter::from_value(self.data.get("filter"))?;
        let databases = apply_filters(&filters, databases.iter().map(database_to_map).collect())?;

        self.data.set_id(generate_data_source_id());
        self.data.set("databases", Value::Array(databases));
        Ok(())
    }
}

/// Lists the databases of a DB home.
pub struct DatabasesDataSource;

#[async_trait::async_trait]
impl DataSourceType for DatabasesDataSource {
    fn name(&self) -> &'static str {
        "oci_database_databases"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("compartment_id", Attribute::required_string())
            .with_attribute("db_home_id", Attribute::required_string())
            .with_attribute("db_name", Attribute::optional_string())
            .with_attribute("state", Attribute::optional_string())
            .with_attribute("databases", computed_object_list(&database_fields()))
            .with_block("filter", filter_block())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = DatabasesDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}

data_source_crud!(DatabaseDataSourceCrud, Database);

#[async_trait::async_trait]
impl ResourceReader for DatabaseDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let database = self
            .clients
            .database
            .get_database(GetDatabaseRequest {
                database_id: self.data.get_string("database_id").unwrap_or_default(),
                metadata: self.clients.metadata(false, SERVICE),
            })
            .await?;
        self.res = Some(database);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        if let Some(database) = &self.res {
            set_all(&mut self.data, database_to_map(database));
        }
        Ok(())
    }
}

/// A single database by OCID.
pub struct DatabaseDataSource;

#[async_trait::async_trait]
impl DataSourceType for DatabaseDataSource {
    fn name(&self) -> &'static str {
        "oci_database_database"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0().with_attribute("database_id", Attribute::required_string());
        with_computed_fields(schema, &database_fields())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = DatabaseDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}
