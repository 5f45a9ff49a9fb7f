//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] the way the host would,
//! without a gRPC server. [`FakeOci`] stands in for the Database and DNS
//! services so whole resource lifecycles run in memory.
//!
//! # Example
//!
//! ```ignore
//! use terraform_provider_oci::testing::{assert_attr, FakeOci, ProviderTester};
//!
//! #[tokio::test]
//! async fn test_create_db_system() {
//!     let fake = FakeOci::new();
//!     let tester = ProviderTester::with_fake(&fake);
//!
//!     let state = tester
//!         .lifecycle_create("oci_database_db_system", config())
//!         .await
//!         .unwrap();
//!
//!     assert_attr(&state, "state", "AVAILABLE");
//! }
//! ```

mod fake;

use std::collections::BTreeMap;

use serde_json::Value;

pub use fake::{fake_time, FakeOci, FAKE_DNS_COMPARTMENT, FAKE_POLL};

use crate::error::ProviderError;
use crate::provider::OciProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness wrapping a `ProviderService`.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<OciProvider> {
    /// An OCI provider already configured against `fake`.
    pub fn with_fake(fake: &FakeOci) -> Self {
        Self::new(OciProvider::with_clients(fake.clients()))
    }
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Upgrade resource state from an older schema version.
    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read back. Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan against `prior_state`, then apply the plan the way the host
    /// would: in place, or by replacing the resource when a force-new
    /// attribute changed. Returns the plan and the state after a read.
    pub async fn lifecycle_apply(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<(PlanResult, Value), ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config.clone())
            .await?;
        let state = if plan.requires_replace {
            self.delete(resource_type, prior_state).await?;
            self.lifecycle_create(resource_type, config).await?
        } else {
            let updated = self
                .update(resource_type, prior_state, plan.planned_state.clone())
                .await?;
            self.read(resource_type, updated).await?
        };
        Ok((plan, state))
    }

    /// Plan a delete, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// State Helpers
// =========================================================================

/// Flatten state into the dotted form Terraform acceptance tests check.
///
/// Lists contribute `path.#` with their length, maps `path.%` with their
/// size. Nulls are left out.
pub fn flatten_state(state: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = state {
        for (key, value) in map {
            flatten_into(key, value, &mut out);
        }
    }
    out
}

fn flatten_into(path: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {},
        Value::Array(items) => {
            out.insert(format!("{}.#", path), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                flatten_into(&format!("{}.{}", path, i), item, out);
            }
        },
        Value::Object(map) => {
            out.insert(format!("{}.%", path), map.len().to_string());
            for (key, item) in map {
                flatten_into(&format!("{}.{}", path, key), item, out);
            }
        },
        Value::String(s) => {
            out.insert(path.to_string(), s.clone());
        },
        other => {
            out.insert(path.to_string(), other.to_string());
        },
    }
}

/// Assert a flattened attribute has the expected value.
///
/// # Panics
///
/// Panics if the attribute is missing or differs.
pub fn assert_attr(state: &Value, path: &str, expected: &str) {
    let flat = flatten_state(state);
    match flat.get(path) {
        Some(actual) => assert_eq!(
            actual, expected,
            "attribute '{}' is '{}', expected '{}'",
            path, actual, expected
        ),
        None => panic!("attribute '{}' is not set; state has {:?}", path, flat.keys()),
    }
}

/// Assert a flattened attribute is set to anything.
///
/// # Panics
///
/// Panics if the attribute is missing.
pub fn assert_attr_set(state: &Value, path: &str) {
    let flat = flatten_state(state);
    assert!(
        flat.contains_key(path),
        "attribute '{}' is not set; state has {:?}",
        path,
        flat.keys()
    );
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::database::{GetDbSystemRequest, ListDbSystemsRequest};
    use crate::client::dns::{SteeringPolicyAttachment, SteeringPolicyAttachmentLifecycleState};
    use crate::client::RequestMetadata;
    use crate::types::AttributeChange;
    use serde_json::json;

    #[test]
    fn test_flatten_state() {
        let state = json!({
            "id": "ocid1.x",
            "cpu_core_count": 2,
            "sparse_diskgroup": null,
            "ssh_public_keys": ["a", "b"],
            "freeform_tags": {"Department": "Finance"},
            "db_home": [{"database": [{"db_name": "aTFdb"}]}],
        });
        let flat = flatten_state(&state);
        assert_eq!(flat["id"], "ocid1.x");
        assert_eq!(flat["cpu_core_count"], "2");
        assert!(!flat.contains_key("sparse_diskgroup"));
        assert_eq!(flat["ssh_public_keys.#"], "2");
        assert_eq!(flat["ssh_public_keys.1"], "b");
        assert_eq!(flat["freeform_tags.%"], "1");
        assert_eq!(flat["freeform_tags.Department"], "Finance");
        assert_eq!(flat["db_home.0.database.0.db_name"], "aTFdb");

        assert_attr(&state, "db_home.#", "1");
        assert_attr_set(&state, "db_home.0.database.#");
    }

    #[test]
    #[should_panic(expected = "is not set")]
    fn test_assert_attr_missing() {
        assert_attr(&json!({"id": "x"}), "state", "AVAILABLE");
    }

    #[test]
    fn test_check_diagnostics() {
        assert!(check_diagnostics(vec![Diagnostic::warning("careful")]).is_ok());
        let err = check_diagnostics(vec![
            Diagnostic::warning("careful"),
            Diagnostic::error("broken").with_attribute("shape"),
        ])
        .unwrap_err();
        match &err {
            TestError::Diagnostics(diags) => assert_eq!(diags.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(err.to_string().contains("broken"));
        assert!(err.to_string().contains("(at shape)"));
    }

    #[test]
    fn test_plan_assertions() {
        let plan = PlanResult::with_changes(
            json!({"shape": "BM.DenseIO2.52"}),
            vec![AttributeChange::added("shape", json!("BM.DenseIO2.52"))],
            false,
        );
        assert_plan_creates(&plan);
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "shape");

        assert_plan_no_changes(&PlanResult::no_change(json!({})));
        assert_plan_replaces(&PlanResult::with_changes(json!({}), vec![], true));
    }

    #[test]
    fn test_assert_error_contains() {
        let diags = vec![Diagnostic::error("Missing required argument 'db_name'")];
        assert_error_contains(&diags, "db_name");
    }

    #[tokio::test]
    async fn test_fake_unknown_ids_are_not_found() {
        let fake = FakeOci::new();
        let err = fake
            .clients()
            .database
            .get_db_system(GetDbSystemRequest {
                db_system_id: "ocid1.dbsystem.oc1..missing".to_string(),
                metadata: RequestMetadata::default(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fake.calls(), vec!["GetDbSystem"]);
    }

    #[tokio::test]
    async fn test_fake_injected_failure_fires_once() {
        let fake = FakeOci::new();
        fake.fail_next("ListDbSystems", 500, "InternalError");
        let request = ListDbSystemsRequest {
            compartment_id: "ocid1.compartment.oc1..aaaa".to_string(),
            ..Default::default()
        };
        let api = fake.clients().database;

        let err = tokio_test::assert_err!(api.list_db_systems(request.clone()).await);
        assert_eq!(err.status_code(), Some(500));

        let page = tokio_test::assert_ok!(api.list_db_systems(request).await);
        assert!(page.items.is_empty());
        assert_eq!(fake.call_count("ListDbSystems"), 2);
    }

    #[tokio::test]
    async fn test_fake_attachment_lifecycle() {
        let fake = FakeOci::new();
        fake.insert_steering_policy_attachment(SteeringPolicyAttachment {
            id: "ocid1.dnspolicyattachment.oc1..seeded".to_string(),
            compartment_id: FAKE_DNS_COMPARTMENT.to_string(),
            display_name: None,
            domain_name: "www.example.com".to_string(),
            rtypes: vec!["A".to_string()],
            self_uri: "https://dns/seeded".to_string(),
            lifecycle_state: SteeringPolicyAttachmentLifecycleState::Deleting,
            steering_policy_id: "ocid1.dnspolicy.oc1..aaaa".to_string(),
            time_created: Some(fake_time()),
            zone_id: "ocid1.dns-zone.oc1..aaaa".to_string(),
        });

        let request = crate::client::dns::GetSteeringPolicyAttachmentRequest {
            steering_policy_attachment_id: "ocid1.dnspolicyattachment.oc1..seeded".to_string(),
            metadata: RequestMetadata::default(),
        };
        let dns = fake.clients().dns;
        assert!(dns
            .get_steering_policy_attachment(request.clone())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(dns
            .get_steering_policy_attachment(request)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_with_fake_lists_registered_types() {
        let tester = ProviderTester::with_fake(&FakeOci::new());
        assert_eq!(
            tester.resource_types(),
            vec![
                "oci_database_db_system".to_string(),
                "oci_dns_steering_policy_attachment".to_string(),
            ]
        );
        assert!(tester
            .data_source_types()
            .contains(&"oci_database_db_homes".to_string()));
        assert!(tester.schema().provider.block.attributes.contains_key("region"));
    }
}
