//! `oci_database_db_homes` and `oci_database_db_home`

use serde_json::Value;

use super::{db_home_fields, db_home_to_map, set_all, SERVICE};
use crate::client::database::{DbHome, GetDbHomeRequest, ListDbHomesRequest};
use crate::client::{list_all, OracleClients};
use crate::crud::{read_data_source, ResourceReader};
use crate::error::ProviderError;
use crate::filter::{apply_filters, Filter};
use crate::resources::{
    computed_object_list, generate_data_source_id, with_computed_fields, DataSourceType,
};
use crate::schema::{filter_block, Attribute, Schema};

data_source_crud!(DbHomesDataSourceCrud, Vec<DbHome>);

#[async_trait::async_trait]
impl ResourceReader for DbHomesDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let request = ListDbHomesRequest {
            compartment_id: self.data.get_string("compartment_id").unwrap_or_default(),
            db_system_id: self.data.get_string("db_system_id").unwrap_or_default(),
            display_name: self.data.get_string("display_name"),
            lifecycle_state: self.data.get_string("state"),
            page: None,
            metadata: self.clients.metadata(false, SERVICE),
        };
        let api = self.clients.database.clone();
        let homes = list_all(|page| {
            let api = api.clone();
            let request = ListDbHomesRequest {
                page,
                ..request.clone()
            };
            async move { api.list_db_homes(request).await }
        })
        .await?;
        self.res = Some(homes);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        let Some(homes) = &self.res else {
            return Ok(());
        };
        let filters = Filter::from_value(self.data.get("filter"))?;
        let homes = apply_filters(&filters, homes.iter().map(db_home_to_map).collect())?;

        self.data.set_id(generate_data_source_id());
        self.data.set("db_homes", Value::Array(homes));
        Ok(())
    }
}

/// Lists the DB homes of a DB system.
pub struct DbHomesDataSource;

#[async_trait::async_trait]
impl DataSourceType for DbHomesDataSource {
    fn name(&self) -> &'static str {
        "oci_database_db_homes"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("compartment_id", Attribute::required_string())
            .with_attribute("db_system_id", Attribute::required_string())
            .with_attribute("display_name", Attribute::optional_string())
            .with_attribute("state", Attribute::optional_string())
            .with_attribute("db_homes", computed_object_list(&db_home_fields()))
            .with_block("filter", filter_block())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = DbHomesDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}

data_source_crud!(DbHomeDataSourceCrud, DbHome);

#[async_trait::async_trait]
impl ResourceReader for DbHomeDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let home = self
            .clients
            .database
            .get_db_home(GetDbHomeRequest {
                db_home_id: self.data.get_string("db_home_id").unwrap_or_default(),
                metadata: self.clients.metadata(false, SERVICE),
            })
            .await?;
        self.res = Some(home);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        if let Some(home) = &self.res {
            set_all(&mut self.data, db_home_to_map(home));
        }
        Ok(())
    }
}

/// A single DB home by OCID.
pub struct DbHomeDataSource;

#[async_trait::async_trait]
impl DataSourceType for DbHomeDataSource {
    fn name(&self) -> &'static str {
        "oci_database_db_home"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0().with_attribute("db_home_id", Attribute::required_string());
        with_computed_fields(schema, &db_home_fields())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = DbHomeDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}
