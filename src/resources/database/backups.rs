//! `oci_database_backups`

use serde_json::Value;

use super::{backup_fields, backup_to_map, SERVICE};
use crate::client::database::{Backup, ListBackupsRequest};
use crate::client::{list_all, OracleClients};
use crate::crud::{read_data_source, ResourceReader};
use crate::error::ProviderError;
use crate::filter::{apply_filters, Filter};
use crate::resources::{computed_object_list, generate_data_source_id, DataSourceType};
use crate::schema::{filter_block, Attribute, Schema};

data_source_crud!(BackupsDataSourceCrud, Vec<Backup>);

#[async_trait::async_trait]
impl ResourceReader for BackupsDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let request = ListBackupsRequest {
            compartment_id: self.data.get_string("compartment_id"),
            database_id: self.data.get_string("database_id"),
            page: None,
            metadata: self.clients.metadata(false, SERVICE),
        };
        let api = self.clients.database.clone();
        let backups = list_all(|page| {
            let api = api.clone();
            let request = ListBackupsRequest {
                page,
                ..request.clone()
            };
            async move { api.list_backups(request).await }
        })
        .await?;
        self.res = Some(backups);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        let Some(backups) = &self.res else {
            return Ok(());
        };
        let filters = Filter::from_value(self.data.get("filter"))?;
        let backups = apply_filters(&filters, backups.iter().map(backup_to_map).collect())?;

        self.data.set_id(generate_data_source_id());
        self.data.set("backups", Value::Array(backups));
        Ok(())
    }
}

/// Lists database backups by database or by compartment.
pub struct BackupsDataSource;

#[async_trait::async_trait]
impl DataSourceType for BackupsDataSource {
    fn name(&self) -> &'static str {
        "oci_database_backups"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("compartment_id", Attribute::optional_string())
            .with_attribute("database_id", Attribute::optional_string())
            .with_attribute("backups", computed_object_list(&backup_fields()))
            .with_block("filter", filter_block())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = BackupsDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}
