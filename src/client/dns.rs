//! DNS service (`/20180115`): steering policy attachments.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::transport::{ApiRequest, HttpTransport};
use super::RequestMetadata;
use crate::error::ProviderError;

const ATTACHMENTS_PATH: &str = "/20180115/steeringPolicyAttachments";

lifecycle_state!(
    /// Lifecycle of a steering policy attachment.
    SteeringPolicyAttachmentLifecycleState {
        Creating => "CREATING",
        Active => "ACTIVE",
        Deleting => "DELETING",
    }
);

/// Attaches a steering policy to a domain of a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteeringPolicyAttachment {
    pub id: String,
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub domain_name: String,
    #[serde(default)]
    pub rtypes: Vec<String>,
    #[serde(rename = "self")]
    pub self_uri: String,
    pub lifecycle_state: SteeringPolicyAttachmentLifecycleState,
    pub steering_policy_id: String,
    pub time_created: Option<DateTime<Utc>>,
    pub zone_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSteeringPolicyAttachmentDetails {
    pub steering_policy_id: String,
    pub zone_id: String,
    pub domain_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSteeringPolicyAttachmentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSteeringPolicyAttachmentRequest {
    pub details: CreateSteeringPolicyAttachmentDetails,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetSteeringPolicyAttachmentRequest {
    pub steering_policy_attachment_id: String,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSteeringPolicyAttachmentRequest {
    pub steering_policy_attachment_id: String,
    pub details: UpdateSteeringPolicyAttachmentDetails,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteSteeringPolicyAttachmentRequest {
    pub steering_policy_attachment_id: String,
    pub metadata: RequestMetadata,
}

/// The DNS service operations the provider uses.
#[async_trait::async_trait]
pub trait DnsApi: Send + Sync {
    async fn create_steering_policy_attachment(
        &self,
        request: CreateSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError>;

    async fn get_steering_policy_attachment(
        &self,
        request: GetSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError>;

    async fn update_steering_policy_attachment(
        &self,
        request: UpdateSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError>;

    async fn delete_steering_policy_attachment(
        &self,
        request: DeleteSteeringPolicyAttachmentRequest,
    ) -> Result<(), ProviderError>;
}

/// [`DnsApi`] over REST.
#[derive(Clone)]
pub struct HttpDnsClient {
    transport: HttpTransport,
}

impl HttpDnsClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl DnsApi for HttpDnsClient {
    async fn create_steering_policy_attachment(
        &self,
        request: CreateSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError> {
        let api = ApiRequest::new("CreateSteeringPolicyAttachment", Method::POST, ATTACHMENTS_PATH)
            .body(&request.details)?;
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn get_steering_policy_attachment(
        &self,
        request: GetSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError> {
        let api = ApiRequest::new(
            "GetSteeringPolicyAttachment",
            Method::GET,
            format!("{}/{}", ATTACHMENTS_PATH, request.steering_policy_attachment_id),
        );
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn update_steering_policy_attachment(
        &self,
        request: UpdateSteeringPolicyAttachmentRequest,
    ) -> Result<SteeringPolicyAttachment, ProviderError> {
        let api = ApiRequest::new(
            "UpdateSteeringPolicyAttachment",
            Method::PUT,
            format!("{}/{}", ATTACHMENTS_PATH, request.steering_policy_attachment_id),
        )
        .body(&request.details)?;
        Ok(self.transport.call(api, &request.metadata).await?.body)
    }

    async fn delete_steering_policy_attachment(
        &self,
        request: DeleteSteeringPolicyAttachmentRequest,
    ) -> Result<(), ProviderError> {
        let api = ApiRequest::new(
            "DeleteSteeringPolicyAttachment",
            Method::DELETE,
            format!("{}/{}", ATTACHMENTS_PATH, request.steering_policy_attachment_id),
        );
        self.transport.call_empty(api, &request.metadata).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attachment_field_names() {
        let attachment: SteeringPolicyAttachment = serde_json::from_value(json!({
            "id": "ocid1.dnspolicyattachment.oc1..aaaa",
            "compartmentId": "ocid1.compartment.oc1..aaaa",
            "displayName": "displayName",
            "domainName": "www.example.com",
            "rtypes": ["A", "AAAA"],
            "self": "https://dns.us-phoenix-1.oraclecloud.com/20180115/steeringPolicyAttachments/ocid1.dnspolicyattachment.oc1..aaaa",
            "lifecycleState": "ACTIVE",
            "steeringPolicyId": "ocid1.dnspolicy.oc1..aaaa",
            "timeCreated": "2019-03-01T10:00:00Z",
            "zoneId": "ocid1.dns-zone.oc1..aaaa",
        }))
        .unwrap();
        assert_eq!(attachment.rtypes, vec!["A", "AAAA"]);
        assert!(attachment.self_uri.ends_with(&attachment.id));
        assert_eq!(
            attachment.lifecycle_state,
            SteeringPolicyAttachmentLifecycleState::Active
        );
    }

    #[test]
    fn test_create_body() {
        let details = CreateSteeringPolicyAttachmentDetails {
            steering_policy_id: "ocid1.dnspolicy.oc1..aaaa".to_string(),
            zone_id: "ocid1.dns-zone.oc1..aaaa".to_string(),
            domain_name: "www.example.com".to_string(),
            display_name: None,
        };
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({
                "steeringPolicyId": "ocid1.dnspolicy.oc1..aaaa",
                "zoneId": "ocid1.dns-zone.oc1..aaaa",
                "domainName": "www.example.com",
            })
        );
    }
}
