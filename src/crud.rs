//! Generic lifecycle drivers shared by every resource.
//!
//! A resource implements the Crud traits for its SDK calls and state mapping;
//! the drivers here sequence those calls and run the lifecycle waits.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::ProviderError;
use crate::state::ResourceData;
use crate::waiter::{PollSettings, StateChangeConf, StateRefresh};

/// Access to the attribute bag a Crud struct works on.
pub trait CrudData {
    /// The resource's attributes.
    fn data(&self) -> &ResourceData;

    /// Mutable access to the resource's attributes.
    fn data_mut(&mut self) -> &mut ResourceData;

    /// Poll intervals for lifecycle waits.
    fn poll_settings(&self) -> PollSettings {
        PollSettings::default()
    }
}

/// Lifecycle states a resource moves through.
///
/// The defaults describe a resource without a lifecycle: empty target lists
/// mean no wait happens.
pub trait StatefulResource {
    /// The lifecycle state of the last fetched response.
    fn state(&self) -> Option<String> {
        None
    }

    /// States seen while a create is in progress.
    fn created_pending(&self) -> &'static [&'static str] {
        &[]
    }

    /// States that end a create.
    fn created_target(&self) -> &'static [&'static str] {
        &[]
    }

    /// States seen while an update is in progress.
    fn updated_pending(&self) -> &'static [&'static str] {
        &[]
    }

    /// States that end an update.
    fn updated_target(&self) -> &'static [&'static str] {
        &[]
    }

    /// States seen while a delete is in progress.
    fn deleted_pending(&self) -> &'static [&'static str] {
        &[]
    }

    /// States that mean the resource is gone.
    fn deleted_target(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Fetches the remote object and maps it into state.
#[async_trait::async_trait]
pub trait ResourceReader: CrudData + StatefulResource + Send {
    /// Fetch the remote object, keeping it as the current response.
    async fn get(&mut self) -> Result<(), ProviderError>;

    /// Write the current response into the attribute bag.
    async fn set_data(&mut self) -> Result<(), ProviderError>;

    /// Mark the resource as gone.
    fn void_state(&mut self) {
        self.data_mut().set_id("");
    }
}

/// Creates the remote object.
#[async_trait::async_trait]
pub trait ResourceCreator: ResourceReader {
    /// The id of the object returned by `create`.
    fn id(&self) -> String;

    /// Send the create request.
    async fn create(&mut self) -> Result<(), ProviderError>;
}

/// Updates the remote object in place.
#[async_trait::async_trait]
pub trait ResourceUpdater: ResourceReader {
    /// Send the update requests for changed attributes.
    async fn update(&mut self) -> Result<(), ProviderError>;
}

/// Deletes the remote object.
#[async_trait::async_trait]
pub trait ResourceDeleter: ResourceReader {
    /// Send the delete request.
    async fn delete(&mut self) -> Result<(), ProviderError>;
}

/// Refreshes a resource's lifecycle state by re-reading it.
pub struct ReaderRefresh<'a, R: ?Sized>(pub &'a mut R);

#[async_trait::async_trait]
impl<'a, R> StateRefresh for ReaderRefresh<'a, R>
where
    R: ResourceReader + ?Sized + 'a,
{
    async fn refresh(&mut self) -> Result<Option<String>, ProviderError> {
        self.0.get().await?;
        Ok(self.0.state())
    }
}

async fn wait_for<R>(
    resource: &mut R,
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
    not_found_is_target: bool,
) -> Result<Option<String>, ProviderError>
where
    R: ResourceReader + ?Sized,
{
    let mut conf =
        StateChangeConf::new(pending, target, timeout).with_poll_settings(resource.poll_settings());
    conf.not_found_is_target = not_found_is_target;
    conf.wait_for_state(&mut ReaderRefresh(resource)).await
}

/// Create a resource and wait for it to become usable.
pub async fn create_resource<R>(resource: &mut R) -> Result<(), ProviderError>
where
    R: ResourceCreator + ?Sized,
{
    resource.create().await?;

    // The refresh during the wait reads by id.
    let id = resource.id();
    debug!(id = %id, "Created resource");
    resource.data_mut().set_id(id);

    let target = resource.created_target();
    if !target.is_empty() {
        let pending = resource.created_pending();
        let timeout = resource.data().timeouts().create;
        wait_for(resource, pending, target, timeout, false).await?;
    }

    resource.set_data().await
}

/// Refresh a resource from the remote object.
///
/// A not-found response, or a lifecycle state that means deleted, voids the
/// state instead of failing.
pub async fn read_resource<R>(resource: &mut R) -> Result<(), ProviderError>
where
    R: ResourceReader + ?Sized,
{
    if let Err(e) = resource.get().await {
        if e.is_not_found() {
            info!(id = %resource.data().id(), "Resource not found, removing from state");
            resource.void_state();
            return Ok(());
        }
        return Err(e);
    }

    if let Some(state) = resource.state() {
        if resource.deleted_target().contains(&state.as_str()) {
            info!(id = %resource.data().id(), state = %state, "Resource is deleted, removing from state");
            resource.void_state();
            return Ok(());
        }
    }

    resource.set_data().await
}

/// Update a resource and wait for it to settle.
pub async fn update_resource<R>(resource: &mut R) -> Result<(), ProviderError>
where
    R: ResourceUpdater + ?Sized,
{
    resource.update().await?;

    let target = resource.updated_target();
    if !target.is_empty() {
        let pending = resource.updated_pending();
        let timeout = resource.data().timeouts().update;
        wait_for(resource, pending, target, timeout, false).await?;
    }

    resource.set_data().await
}

/// Delete a resource and wait until it is gone.
pub async fn delete_resource<R>(resource: &mut R) -> Result<(), ProviderError>
where
    R: ResourceDeleter + ?Sized,
{
    if let Err(e) = resource.delete().await {
        if !e.is_not_found() {
            return Err(e);
        }
        debug!(id = %resource.data().id(), "Resource already deleted");
    } else {
        let target = resource.deleted_target();
        if !target.is_empty() {
            let pending = resource.deleted_pending();
            let timeout = resource.data().timeouts().delete;
            wait_for(resource, pending, target, timeout, true).await?;
        }
    }

    resource.void_state();
    Ok(())
}

/// Read a data source.
pub async fn read_data_source<R>(source: &mut R) -> Result<(), ProviderError>
where
    R: ResourceReader + ?Sized,
{
    source.get().await?;
    source.set_data().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use serde_json::json;
    use std::collections::VecDeque;

    const FAST: PollSettings = PollSettings {
        poll_interval: Duration::from_millis(1),
        max_poll_interval: Duration::from_millis(2),
    };

    /// A resource whose `get` replays scripted lifecycle states.
    struct Widget {
        data: ResourceData,
        states: VecDeque<&'static str>,
        current: Option<String>,
        gone: bool,
        delete_error: Option<u16>,
        calls: Vec<&'static str>,
    }

    impl Widget {
        fn new(states: &[&'static str]) -> Self {
            Self {
                data: ResourceData::new(json!({"id": "ocid1.widget.oc1..aaaa", "name": "w"})),
                states: states.iter().copied().collect(),
                current: None,
                gone: false,
                delete_error: None,
                calls: Vec::new(),
            }
        }

        /// A widget that has not been created yet.
        fn planned(states: &[&'static str]) -> Self {
            let mut widget = Self::new(states);
            widget.data = ResourceData::new(json!({"name": "w"}));
            widget
        }
    }

    impl CrudData for Widget {
        fn data(&self) -> &ResourceData {
            &self.data
        }

        fn data_mut(&mut self) -> &mut ResourceData {
            &mut self.data
        }

        fn poll_settings(&self) -> PollSettings {
            FAST
        }
    }

    impl StatefulResource for Widget {
        fn state(&self) -> Option<String> {
            self.current.clone()
        }

        fn created_pending(&self) -> &'static [&'static str] {
            &["PROVISIONING"]
        }

        fn created_target(&self) -> &'static [&'static str] {
            &["AVAILABLE"]
        }

        fn updated_pending(&self) -> &'static [&'static str] {
            &["UPDATING"]
        }

        fn updated_target(&self) -> &'static [&'static str] {
            &["AVAILABLE"]
        }

        fn deleted_pending(&self) -> &'static [&'static str] {
            &["TERMINATING"]
        }

        fn deleted_target(&self) -> &'static [&'static str] {
            &["TERMINATED"]
        }
    }

    #[async_trait::async_trait]
    impl ResourceReader for Widget {
        async fn get(&mut self) -> Result<(), ProviderError> {
            self.calls.push("get");
            if self.data.id().is_empty() {
                return Err(ServiceError::new("GetWidget", 404, "NotAuthorizedOrNotFound", "no id").into());
            }
            if self.gone {
                return Err(ServiceError::new("GetWidget", 404, "NotAuthorizedOrNotFound", "gone").into());
            }
            if self.states.len() > 1 {
                self.current = self.states.pop_front().map(str::to_string);
            } else {
                self.current = self.states.front().map(|s| s.to_string());
            }
            Ok(())
        }

        async fn set_data(&mut self) -> Result<(), ProviderError> {
            self.calls.push("set_data");
            let state = self.current.clone().unwrap_or_default();
            self.data.set("state", state);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ResourceCreator for Widget {
        fn id(&self) -> String {
            "ocid1.widget.oc1..bbbb".to_string()
        }

        async fn create(&mut self) -> Result<(), ProviderError> {
            self.calls.push("create");
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ResourceUpdater for Widget {
        async fn update(&mut self) -> Result<(), ProviderError> {
            self.calls.push("update");
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ResourceDeleter for Widget {
        async fn delete(&mut self) -> Result<(), ProviderError> {
            self.calls.push("delete");
            match self.delete_error {
                Some(status) => Err(ServiceError::new("DeleteWidget", status, "Code", "failed").into()),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_create_waits_then_sets_id_and_data() {
        let mut widget = Widget::planned(&["PROVISIONING", "PROVISIONING", "AVAILABLE"]);
        create_resource(&mut widget).await.unwrap();

        assert_eq!(widget.data.id(), "ocid1.widget.oc1..bbbb");
        assert_eq!(widget.data.get_string("state").as_deref(), Some("AVAILABLE"));
        assert_eq!(
            widget.calls,
            vec!["create", "get", "get", "get", "set_data"]
        );
    }

    #[tokio::test]
    async fn test_create_fails_on_unexpected_state() {
        let mut widget = Widget::planned(&["PROVISIONING", "FAILED"]);
        let err = create_resource(&mut widget).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedState { .. }));
        assert!(!widget.calls.contains(&"set_data"));
    }

    #[tokio::test]
    async fn test_read_voids_on_not_found() {
        let mut widget = Widget::new(&["AVAILABLE"]);
        widget.gone = true;
        read_resource(&mut widget).await.unwrap();
        assert_eq!(widget.data.id(), "");
        assert_eq!(widget.data.clone().into_state(), serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_read_voids_on_deleted_state() {
        let mut widget = Widget::new(&["TERMINATED"]);
        read_resource(&mut widget).await.unwrap();
        assert_eq!(widget.data.id(), "");
        assert_eq!(widget.calls, vec!["get"]);
    }

    #[tokio::test]
    async fn test_read_sets_data() {
        let mut widget = Widget::new(&["AVAILABLE"]);
        read_resource(&mut widget).await.unwrap();
        assert_eq!(widget.data.id(), "ocid1.widget.oc1..aaaa");
        assert_eq!(widget.data.get_string("state").as_deref(), Some("AVAILABLE"));
    }

    #[tokio::test]
    async fn test_update_waits_for_available() {
        let mut widget = Widget::new(&["UPDATING", "AVAILABLE"]);
        update_resource(&mut widget).await.unwrap();
        assert_eq!(widget.calls, vec!["update", "get", "get", "set_data"]);
    }

    #[tokio::test]
    async fn test_delete_waits_until_terminated() {
        let mut widget = Widget::new(&["TERMINATING", "TERMINATED"]);
        delete_resource(&mut widget).await.unwrap();
        assert_eq!(widget.data.id(), "");
        assert_eq!(widget.calls, vec!["delete", "get", "get"]);
    }

    #[tokio::test]
    async fn test_delete_treats_not_found_as_deleted() {
        let mut widget = Widget::new(&["TERMINATING"]);
        widget.delete_error = Some(404);
        delete_resource(&mut widget).await.unwrap();
        assert_eq!(widget.data.id(), "");
        assert_eq!(widget.calls, vec!["delete"]);

        // Disappearing while terminating also counts.
        let mut widget = Widget::new(&["TERMINATING"]);
        widget.gone = true;
        delete_resource(&mut widget).await.unwrap();
        assert_eq!(widget.data.id(), "");
    }

    #[tokio::test]
    async fn test_delete_propagates_other_errors() {
        let mut widget = Widget::new(&["AVAILABLE"]);
        widget.delete_error = Some(409);
        let err = delete_resource(&mut widget).await.unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(widget.data.id(), "ocid1.widget.oc1..aaaa");
    }

    #[tokio::test]
    async fn test_read_data_source_propagates_errors() {
        let mut widget = Widget::new(&["AVAILABLE"]);
        widget.gone = true;
        let err = read_data_source(&mut widget).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
