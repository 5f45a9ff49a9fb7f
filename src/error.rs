//! Error types for the OCI provider.
//!
//! Errors returned by the cloud API are carried unchanged in
//! [`ProviderError::Service`] so the host shows the user exactly what the
//! service said.

use std::fmt;

use thiserror::Error;

/// An error response returned by an OCI service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Service error code, e.g. `NotAuthorizedOrNotFound` or `IncorrectState`.
    pub code: String,
    /// Human readable message from the service.
    pub message: String,
    /// The `opc-request-id` header, useful when contacting support.
    pub opc_request_id: Option<String>,
    /// The SDK operation that failed, e.g. `GetDbSystem`.
    pub operation: String,
}

impl ServiceError {
    /// Create a service error for an operation.
    pub fn new(
        operation: impl Into<String>,
        status_code: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status_code,
            code: code.into(),
            message: message.into(),
            opc_request_id: None,
            operation: operation.into(),
        }
    }

    /// Attach the request id returned by the service.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.opc_request_id = Some(request_id.into());
        self
    }

    /// A 404 response, or a message stating the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404 || self.message.contains("does not exist")
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service error:{}. {}. http status code: {}. Opc request id: {}. Operation: {}",
            self.code,
            self.message,
            self.status_code,
            self.opc_request_id.as_deref().unwrap_or("-"),
            self.operation
        )
    }
}

/// Errors that can occur while serving provider requests.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A failure inside the SDK layer that is not a service response.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The HTTP client failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error response.
    #[error("{0}")]
    Service(ServiceError),

    /// A wait for a lifecycle state or condition ran out of time.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// A resource entered a lifecycle state that is neither pending nor a target.
    #[error("unexpected state '{state}', wanted target '{expected}'")]
    UnexpectedState {
        /// The state the resource was found in.
        state: String,
        /// The target states, comma separated.
        expected: String,
    },

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Sdk(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::DeadlineExceeded(msg)
            | Self::InvalidRequest(msg) => msg.clone(),
            Self::Service(err) => err.message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this error means the remote resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Service(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// The HTTP status code, when the error came from a service response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Service(err) => Some(err.status_code),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ServiceError> for ProviderError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Sdk(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Http(err) => tonic::Status::unavailable(format!("HTTP error: {}", err)),
            ProviderError::Service(err) => match err.status_code {
                400 => tonic::Status::invalid_argument(err.to_string()),
                401 | 403 => tonic::Status::permission_denied(err.to_string()),
                404 => tonic::Status::not_found(err.to_string()),
                409 | 412 => tonic::Status::failed_precondition(err.to_string()),
                429 => tonic::Status::resource_exhausted(err.to_string()),
                503 => tonic::Status::unavailable(err.to_string()),
                _ => tonic::Status::internal(err.to_string()),
            },
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            err @ ProviderError::UnexpectedState { .. } => {
                tonic::Status::failed_precondition(err.to_string())
            },
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("ocid1.dbsystem.oc1..aaaa".to_string());
        assert_eq!(
            format!("{}", err),
            "Resource not found: ocid1.dbsystem.oc1..aaaa"
        );

        let err = ProviderError::UnknownResource("oci_core_instance".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: oci_core_instance");

        let err = ProviderError::UnexpectedState {
            state: "FAILED".to_string(),
            expected: "AVAILABLE".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "unexpected state 'FAILED', wanted target 'AVAILABLE'"
        );
    }

    #[test]
    fn test_service_error_display_is_passed_through() {
        let err: ProviderError = ServiceError::new(
            "GetDbSystem",
            404,
            "NotAuthorizedOrNotFound",
            "Authorization failed or requested resource not found",
        )
        .with_request_id("ABC123")
        .into();

        let display = err.to_string();
        assert!(display.contains("NotAuthorizedOrNotFound"));
        assert!(display.contains("http status code: 404"));
        assert!(display.contains("Opc request id: ABC123"));
        assert!(display.contains("Operation: GetDbSystem"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(ProviderError::NotFound("x".to_string()).is_not_found());

        let err: ProviderError =
            ServiceError::new("GetDbHome", 404, "NotAuthorizedOrNotFound", "gone").into();
        assert!(err.is_not_found());

        let err: ProviderError =
            ServiceError::new("GetDbHome", 400, "InvalidParameter", "DbHome does not exist")
                .into();
        assert!(err.is_not_found());

        let err: ProviderError =
            ServiceError::new("UpdateDbSystem", 409, "IncorrectState", "busy").into();
        assert!(!err.is_not_found());
        assert_eq!(err.status_code(), Some(409));
    }

    #[test]
    fn test_error_to_status() {
        let err = ProviderError::NotFound("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let err = ProviderError::Validation("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let err = ProviderError::Configuration("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let err = ProviderError::DeadlineExceeded("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
    }

    #[test]
    fn test_service_error_to_status() {
        let cases = [
            (400, tonic::Code::InvalidArgument),
            (401, tonic::Code::PermissionDenied),
            (404, tonic::Code::NotFound),
            (409, tonic::Code::FailedPrecondition),
            (429, tonic::Code::ResourceExhausted),
            (500, tonic::Code::Internal),
            (503, tonic::Code::Unavailable),
        ];
        for (status_code, expected) in cases {
            let err: ProviderError = ServiceError::new("Op", status_code, "Code", "msg").into();
            let status: tonic::Status = err.into();
            assert_eq!(status.code(), expected, "status {}", status_code);
        }
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("region is required".to_string());
        assert_eq!(err.message(), "region is required");

        let err: ProviderError = ServiceError::new("Op", 500, "InternalError", "boom").into();
        assert_eq!(err.message(), "boom");
    }
}
