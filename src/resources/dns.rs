//! DNS service resources: steering policy attachments.

use serde_json::{json, Value};
use tracing::debug;

use crate::client::dns::{
    CreateSteeringPolicyAttachmentDetails, CreateSteeringPolicyAttachmentRequest,
    DeleteSteeringPolicyAttachmentRequest, GetSteeringPolicyAttachmentRequest,
    SteeringPolicyAttachment, UpdateSteeringPolicyAttachmentDetails,
    UpdateSteeringPolicyAttachmentRequest,
};
use crate::client::{sdk_time_value, OracleClients, RequestMetadata};
use crate::crud::{
    create_resource, delete_resource, read_data_source, read_resource, update_resource, CrudData,
    ResourceCreator, ResourceDeleter, ResourceReader, ResourceUpdater, StatefulResource,
};
use crate::error::ProviderError;
use crate::resources::{with_computed_fields, DataSourceType, Fields, ResourceType};
use crate::schema::{timeouts_block, Attribute, AttributeType, Schema};
use crate::state::ResourceData;
use crate::types::ResourceTimeouts;
use crate::waiter::PollSettings;

const SERVICE: &str = "dns";

fn attachment_fields() -> Fields {
    vec![
        ("id", AttributeType::String),
        ("compartment_id", AttributeType::String),
        ("display_name", AttributeType::String),
        ("domain_name", AttributeType::String),
        ("rtypes", AttributeType::list(AttributeType::String)),
        ("self", AttributeType::String),
        ("state", AttributeType::String),
        ("steering_policy_id", AttributeType::String),
        ("time_created", AttributeType::String),
        ("zone_id", AttributeType::String),
    ]
}

fn attachment_to_map(attachment: &SteeringPolicyAttachment) -> Value {
    json!({
        "id": attachment.id,
        "compartment_id": attachment.compartment_id,
        "display_name": attachment.display_name,
        "domain_name": attachment.domain_name,
        "rtypes": attachment.rtypes,
        "self": attachment.self_uri,
        "state": attachment.lifecycle_state.as_str(),
        "steering_policy_id": attachment.steering_policy_id,
        "time_created": sdk_time_value(attachment.time_created.as_ref()),
        "zone_id": attachment.zone_id,
    })
}

fn set_attachment(data: &mut ResourceData, attachment: &SteeringPolicyAttachment) {
    if let Value::Object(entries) = attachment_to_map(attachment) {
        for (key, value) in entries {
            data.set(&key, value);
        }
    }
}

/// Crud glue for `oci_dns_steering_policy_attachment`.
pub struct SteeringPolicyAttachmentResourceCrud {
    data: ResourceData,
    clients: OracleClients,
    disable_not_found_retries: bool,
    res: Option<SteeringPolicyAttachment>,
}

impl SteeringPolicyAttachmentResourceCrud {
    /// Crud over `data`.
    pub fn new(clients: OracleClients, data: ResourceData, disable_not_found_retries: bool) -> Self {
        Self {
            data,
            clients,
            disable_not_found_retries,
            res: None,
        }
    }

    fn metadata(&self) -> RequestMetadata {
        self.clients.metadata(self.disable_not_found_retries, SERVICE)
    }
}

impl CrudData for SteeringPolicyAttachmentResourceCrud {
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

impl StatefulResource for SteeringPolicyAttachmentResourceCrud {
    fn state(&self) -> Option<String> {
        self.res
            .as_ref()
            .map(|r| r.lifecycle_state.as_str().to_string())
    }

    fn created_pending(&self) -> &'static [&'static str] {
        &["CREATING"]
    }

    fn created_target(&self) -> &'static [&'static str] {
        &["ACTIVE"]
    }

    fn deleted_pending(&self) -> &'static [&'static str] {
        &["DELETING"]
    }

    // The service drops deleted attachments; a 404 also ends the wait.
    fn deleted_target(&self) -> &'static [&'static str] {
        &["DELETED"]
    }
}

#[async_trait::async_trait]
impl ResourceReader for SteeringPolicyAttachmentResourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let attachment = self
            .clients
            .dns
            .get_steering_policy_attachment(GetSteeringPolicyAttachmentRequest {
                steering_policy_attachment_id: self.data.id().to_string(),
                metadata: self.metadata(),
            })
            .await?;
        self.res = Some(attachment);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        if let Some(attachment) = &self.res {
            set_attachment(&mut self.data, attachment);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceCreator for SteeringPolicyAttachmentResourceCrud {
    fn id(&self) -> String {
        self.res.as_ref().map(|r| r.id.clone()).unwrap_or_default()
    }

    async fn create(&mut self) -> Result<(), ProviderError> {
        let details = CreateSteeringPolicyAttachmentDetails {
            steering_policy_id: self.data.get_string("steering_policy_id").unwrap_or_default(),
            zone_id: self.data.get_string("zone_id").unwrap_or_default(),
            domain_name: self.data.get_string("domain_name").unwrap_or_default(),
            display_name: self.data.get_string("display_name"),
        };
        let attachment = self
            .clients
            .dns
            .create_steering_policy_attachment(CreateSteeringPolicyAttachmentRequest {
                details,
                metadata: self.metadata(),
            })
            .await?;
        self.res = Some(attachment);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceUpdater for SteeringPolicyAttachmentResourceCrud {
    async fn update(&mut self) -> Result<(), ProviderError> {
        if !self.data.has_change("display_name") {
            debug!(id = %self.data.id(), "No updatable attribute changed");
            return self.get().await;
        }
        let attachment = self
            .clients
            .dns
            .update_steering_policy_attachment(UpdateSteeringPolicyAttachmentRequest {
                steering_policy_attachment_id: self.data.id().to_string(),
                details: UpdateSteeringPolicyAttachmentDetails {
                    display_name: self.data.get_string("display_name"),
                },
                metadata: self.metadata(),
            })
            .await?;
        self.res = Some(attachment);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceDeleter for SteeringPolicyAttachmentResourceCrud {
    async fn delete(&mut self) -> Result<(), ProviderError> {
        self.clients
            .dns
            .delete_steering_policy_attachment(DeleteSteeringPolicyAttachmentRequest {
                steering_policy_attachment_id: self.data.id().to_string(),
                metadata: self.metadata(),
            })
            .await
    }
}

/// The `oci_dns_steering_policy_attachment` resource type.
pub struct SteeringPolicyAttachmentResource;

#[async_trait::async_trait]
impl ResourceType for SteeringPolicyAttachmentResource {
    fn name(&self) -> &'static str {
        "oci_dns_steering_policy_attachment"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0()
            .with_attribute(
                "steering_policy_id",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute("zone_id", Attribute::required_string().with_force_new())
            .with_attribute("domain_name", Attribute::required_string().with_force_new())
            .with_attribute("display_name", Attribute::optional_computed_string())
            .with_block("timeouts", timeouts_block());
        with_computed_fields(schema, &attachment_fields())
    }

    async fn create(&self, clients: &OracleClients, planned: Value) -> Result<Value, ProviderError> {
        let data = ResourceData::new(planned).with_timeouts(ResourceTimeouts::default())?;
        let mut crud = SteeringPolicyAttachmentResourceCrud::new(clients.clone(), data, false);
        create_resource(&mut crud).await?;
        Ok(crud.data.into_state())
    }

    async fn read(&self, clients: &OracleClients, state: Value) -> Result<Value, ProviderError> {
        let data = ResourceData::from_state(state);
        let mut crud = SteeringPolicyAttachmentResourceCrud::new(clients.clone(), data, true);
        read_resource(&mut crud).await?;
        Ok(crud.data.into_state())
    }

    async fn update(
        &self,
        clients: &OracleClients,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let data =
            ResourceData::for_update(prior, planned).with_timeouts(ResourceTimeouts::default())?;
        let mut crud = SteeringPolicyAttachmentResourceCrud::new(clients.clone(), data, false);
        update_resource(&mut crud).await?;
        Ok(crud.data.into_state())
    }

    async fn delete(&self, clients: &OracleClients, state: Value) -> Result<(), ProviderError> {
        let data = ResourceData::from_state(state).with_timeouts(ResourceTimeouts::default())?;
        let mut crud = SteeringPolicyAttachmentResourceCrud::new(clients.clone(), data, true);
        delete_resource(&mut crud).await
    }
}

data_source_crud!(SteeringPolicyAttachmentDataSourceCrud, SteeringPolicyAttachment);

#[async_trait::async_trait]
impl ResourceReader for SteeringPolicyAttachmentDataSourceCrud {
    async fn get(&mut self) -> Result<(), ProviderError> {
        let id = self
            .data
            .get_string("steering_policy_attachment_id")
            .unwrap_or_default();
        let attachment = self
            .clients
            .dns
            .get_steering_policy_attachment(GetSteeringPolicyAttachmentRequest {
                steering_policy_attachment_id: id,
                metadata: self.clients.metadata(false, SERVICE),
            })
            .await?;
        self.res = Some(attachment);
        Ok(())
    }

    async fn set_data(&mut self) -> Result<(), ProviderError> {
        if let Some(attachment) = &self.res {
            set_attachment(&mut self.data, attachment);
        }
        Ok(())
    }
}

/// A single steering policy attachment by OCID.
pub struct SteeringPolicyAttachmentDataSource;

#[async_trait::async_trait]
impl DataSourceType for SteeringPolicyAttachmentDataSource {
    fn name(&self) -> &'static str {
        "oci_dns_steering_policy_attachment"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::v0().with_attribute(
            "steering_policy_attachment_id",
            Attribute::required_string(),
        );
        with_computed_fields(schema, &attachment_fields())
    }

    async fn read(&self, clients: &OracleClients, config: Value) -> Result<Value, ProviderError> {
        let mut crud = SteeringPolicyAttachmentDataSourceCrud::new(clients, config);
        read_data_source(&mut crud).await?;
        Ok(crud.into_state())
    }
}
