//! Terraform provider for Oracle Cloud Infrastructure.
//!
//! The provider manages DB systems and DNS steering policy attachments and
//! exposes read-only data sources for DB systems, homes, databases, nodes,
//! backups and steering policy attachments.
//!
//! # Overview
//!
//! - **Protocol**: a gRPC service ([`server`]) carrying JSON-encoded values,
//!   started by the host as a plugin subprocess
//! - **Provider**: [`OciProvider`] dispatches every call to the resource or
//!   data source registered under the requested type name
//! - **Resources**: Crud glue per type ([`resources`]) built on the shared
//!   create/read/update/delete drivers in [`crud`]
//! - **Clients**: typed Database and DNS service clients ([`client`]) with
//!   request signing, retries ([`retry`]) and lifecycle waits ([`waiter`])
//! - **Testing**: an in-memory OCI fake and a provider harness ([`testing`])
//!
//! # Handshake Protocol
//!
//! Once listening, [`serve`] prints the plugin handshake line to stdout:
//!
//! ```text
//! 1|1|tcp|127.0.0.1:50051|grpc
//! ```
//!
//! Format: `<core protocol version>|<provider protocol version>|tcp|<address>|grpc`
//!
//! The host must set `TF_PLUGIN_MAGIC_COOKIE` before launching the binary.
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: resource and data source names
//! - **GetSchema**: schemas for the provider block, resources and data sources
//! - **ValidateProviderConfig** / **Configure**: authentication, region and retry settings
//! - **Stop**: graceful shutdown
//! - **ValidateResourceConfig**: schema and cross-attribute checks
//! - **UpgradeResourceState**: state migration between schema versions
//! - **Plan**: planned state, changed paths and replacement
//! - **Create/Read/Update/Delete**: resource lifecycle, waiting on lifecycle states
//! - **ImportResourceState**: adopt an existing object by OCID
//! - **ValidateDataSourceConfig** / **ReadDataSource**: list and lookup data sources

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod crud;
pub mod error;
pub mod filter;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod server;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;
pub mod waiter;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use error::{ProviderError, ServiceError};
pub use logging::{init_logging, init_logging_with_default};
pub use provider::OciProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_on_listener, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ResourceTimeouts,
    ServerCapabilities, PROTOCOL_VERSION,
};
pub use validation::validate;

pub use async_trait::async_trait;
pub use serde_json;
pub use tracing;
