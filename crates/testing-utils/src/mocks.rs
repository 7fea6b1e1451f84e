//! Mock implementations of the authority ports
//!
//! In-memory authorities that can be used for testing the dispatch engine
//! without any remote service. Every mock counts its calls and can be told
//! to fail with a connectivity or a fatal error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alarm_core::{DispatchError, DispatchResult};
use alarm_domain::{
    AuthorityConnector, CatalogResource, DispositionAction, DispositionEvent,
    DispositioningAuthority, Operation, OperationAuthority, OperationId, OperationResource,
    PushEvent, ResourceCatalog, ResourceId,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

/// Failure injected into a mock until it is cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Connectivity,
    Fatal,
}

impl InjectedFailure {
    fn to_error(self, source: &str) -> DispatchError {
        match self {
            InjectedFailure::Connectivity => {
                DispatchError::Communication(format!("{source}: connection reset"))
            }
            InjectedFailure::Fatal => {
                DispatchError::Protocol(format!("{source}: contract violation"))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct FailureSwitch(Arc<Mutex<Option<InjectedFailure>>>);

impl FailureSwitch {
    fn set(&self, failure: Option<InjectedFailure>) {
        *self.0.lock().unwrap() = failure;
    }

    fn check(&self, source: &str) -> DispatchResult<()> {
        match *self.0.lock().unwrap() {
            Some(failure) => Err(failure.to_error(source)),
            None => Ok(()),
        }
    }
}

/// Mock implementation of OperationAuthority for testing
#[derive(Debug, Clone, Default)]
pub struct MockOperationAuthority {
    operations: Arc<Mutex<HashMap<OperationId, Operation>>>,
    phantom_ids: Arc<Mutex<Vec<OperationId>>>,
    list_delay: Arc<Mutex<Option<Duration>>>,
    failure: FailureSwitch,
    list_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
}

impl MockOperationAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operations(operations: Vec<Operation>) -> Self {
        let mock = Self::new();
        for operation in operations {
            mock.add_operation(operation);
        }
        mock
    }

    pub fn add_operation(&self, operation: Operation) {
        self.operations
            .lock()
            .unwrap()
            .insert(operation.id, operation);
    }

    pub fn acknowledge(&self, id: OperationId) {
        if let Some(operation) = self.operations.lock().unwrap().get_mut(&id) {
            operation.is_acknowledged = true;
        }
    }

    pub fn remove_operation(&self, id: OperationId) {
        self.operations.lock().unwrap().remove(&id);
    }

    /// List an id that `get_operation_by_id` does not know
    pub fn add_phantom_id(&self, id: OperationId) {
        self.phantom_ids.lock().unwrap().push(id);
    }

    /// Delay every `list_operation_ids` call, to keep a tick running
    pub fn set_list_delay(&self, delay: Option<Duration>) {
        *self.list_delay.lock().unwrap() = delay;
    }

    pub fn set_failure(&self, failure: Option<InjectedFailure>) {
        self.failure.set(failure);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationAuthority for MockOperationAuthority {
    async fn list_operation_ids(
        &self,
        max_age_minutes: i64,
        only_non_acknowledged: bool,
        limit: usize,
    ) -> DispatchResult<Vec<OperationId>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.failure.check("operation service")?;

        let cutoff = Utc::now() - chrono::Duration::minutes(max_age_minutes);
        let mut operations: Vec<Operation> = self
            .operations
            .lock()
            .unwrap()
            .values()
            .filter(|op| op.timestamp >= cutoff)
            .filter(|op| !only_non_acknowledged || !op.is_acknowledged)
            .cloned()
            .collect();
        operations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        let mut ids: Vec<OperationId> = self.phantom_ids.lock().unwrap().clone();
        ids.extend(operations.into_iter().map(|op| op.id));
        ids.truncate(limit);
        Ok(ids)
    }

    async fn get_operation_by_id(&self, id: OperationId) -> DispatchResult<Option<Operation>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.failure.check("operation service")?;
        Ok(self.operations.lock().unwrap().get(&id).cloned())
    }
}

/// Mock implementation of DispositioningAuthority for testing
///
/// Optionally forwards a push event for every successful dispatch or recall,
/// the way the real service notifies its subscribers.
#[derive(Debug, Clone, Default)]
pub struct MockDispositioningAuthority {
    dispatched: Arc<Mutex<HashMap<OperationId, Vec<ResourceId>>>>,
    event_sink: Arc<Mutex<Option<mpsc::Sender<PushEvent>>>>,
    get_dispatched_delay: Arc<Mutex<Option<Duration>>>,
    failure: FailureSwitch,
    get_dispatched_calls: Arc<AtomicUsize>,
    dispatch_calls: Arc<AtomicUsize>,
    recall_calls: Arc<AtomicUsize>,
}

impl MockDispositioningAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispatched(operation_id: OperationId, resource_ids: &[&str]) -> Self {
        let mock = Self::new();
        mock.set_dispatched(operation_id, resource_ids);
        mock
    }

    pub fn set_dispatched(&self, operation_id: OperationId, resource_ids: &[&str]) {
        self.dispatched.lock().unwrap().insert(
            operation_id,
            resource_ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    pub fn dispatched_ids(&self, operation_id: OperationId) -> Vec<ResourceId> {
        self.dispatched
            .lock()
            .unwrap()
            .get(&operation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_event_sink(&self, sender: Option<mpsc::Sender<PushEvent>>) {
        *self.event_sink.lock().unwrap() = sender;
    }

    /// Delay the dispatched-set query, the last step of a view load
    pub fn set_get_dispatched_delay(&self, delay: Option<Duration>) {
        *self.get_dispatched_delay.lock().unwrap() = delay;
    }

    pub fn set_failure(&self, failure: Option<InjectedFailure>) {
        self.failure.set(failure);
    }

    pub fn get_dispatched_calls(&self) -> usize {
        self.get_dispatched_calls.load(Ordering::SeqCst)
    }

    pub fn dispatch_calls(&self) -> usize {
        self.dispatch_calls.load(Ordering::SeqCst)
    }

    pub fn recall_calls(&self) -> usize {
        self.recall_calls.load(Ordering::SeqCst)
    }

    fn notify(&self, operation_id: OperationId, resource_id: &str, action: DispositionAction) {
        if let Some(sender) = self.event_sink.lock().unwrap().as_ref() {
            let _ = sender.try_send(PushEvent::Disposition(DispositionEvent {
                operation_id,
                resource_id: resource_id.to_string(),
                action,
            }));
        }
    }
}

#[async_trait]
impl DispositioningAuthority for MockDispositioningAuthority {
    async fn get_dispatched_resources(
        &self,
        operation_id: OperationId,
    ) -> DispatchResult<Vec<ResourceId>> {
        self.get_dispatched_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.get_dispatched_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.failure.check("dispositioning service")?;
        Ok(self.dispatched_ids(operation_id))
    }

    async fn dispatch(&self, operation_id: OperationId, resource_id: &str) -> DispatchResult<()> {
        self.dispatch_calls.fetch_add(1, Ordering::SeqCst);
        self.failure.check("dispositioning service")?;
        {
            let mut dispatched = self.dispatched.lock().unwrap();
            let ids = dispatched.entry(operation_id).or_default();
            if !ids.iter().any(|id| id == resource_id) {
                ids.push(resource_id.to_string());
            }
        }
        self.notify(operation_id, resource_id, DispositionAction::Dispatch);
        Ok(())
    }

    async fn recall(&self, operation_id: OperationId, resource_id: &str) -> DispatchResult<()> {
        self.recall_calls.fetch_add(1, Ordering::SeqCst);
        self.failure.check("dispositioning service")?;
        if let Some(ids) = self.dispatched.lock().unwrap().get_mut(&operation_id) {
            ids.retain(|id| id != resource_id);
        }
        self.notify(operation_id, resource_id, DispositionAction::Recall);
        Ok(())
    }
}

/// Mock implementation of ResourceCatalog for testing
///
/// Filtering uses the default identifier match of [`CatalogResource::matches`].
#[derive(Debug, Clone, Default)]
pub struct MockResourceCatalog {
    resources: Arc<Mutex<Vec<CatalogResource>>>,
    failure: FailureSwitch,
    get_all_calls: Arc<AtomicUsize>,
    filter_calls: Arc<AtomicUsize>,
}

impl MockResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: Vec<CatalogResource>) -> Self {
        let mock = Self::new();
        *mock.resources.lock().unwrap() = resources;
        mock
    }

    pub fn add_resource(&self, resource: CatalogResource) {
        self.resources.lock().unwrap().push(resource);
    }

    pub fn set_failure(&self, failure: Option<InjectedFailure>) {
        self.failure.set(failure);
    }

    pub fn get_all_calls(&self) -> usize {
        self.get_all_calls.load(Ordering::SeqCst)
    }

    pub fn filter_calls(&self) -> usize {
        self.filter_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceCatalog for MockResourceCatalog {
    async fn get_all_resources(&self) -> DispatchResult<Vec<CatalogResource>> {
        self.get_all_calls.fetch_add(1, Ordering::SeqCst);
        self.failure.check("catalog service")?;
        Ok(self.resources.lock().unwrap().clone())
    }

    async fn get_filtered_resources(
        &self,
        resources: &[OperationResource],
    ) -> DispatchResult<Vec<OperationResource>> {
        self.filter_calls.fetch_add(1, Ordering::SeqCst);
        self.failure.check("catalog service")?;
        let catalog = self.resources.lock().unwrap();
        Ok(resources
            .iter()
            .filter(|resource| catalog.iter().any(|c| c.matches(resource)))
            .cloned()
            .collect())
    }
}

/// Mock implementation of AuthorityConnector over the in-memory authorities
#[derive(Debug, Clone, Default)]
pub struct MockAuthorityConnector {
    pub operations: MockOperationAuthority,
    pub dispositioning: MockDispositioningAuthority,
    pub catalog: MockResourceCatalog,
    unreachable: Arc<AtomicBool>,
    connect_calls: Arc<AtomicUsize>,
}

impl MockAuthorityConnector {
    pub fn new(
        operations: MockOperationAuthority,
        dispositioning: MockDispositioningAuthority,
        catalog: MockResourceCatalog,
    ) -> Self {
        Self {
            operations,
            dispositioning,
            catalog,
            unreachable: Arc::new(AtomicBool::new(false)),
            connect_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every binding attempt fail with `EndpointNotFound`
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of operation/dispositioning binding attempts
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, service: &str) -> DispatchResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DispatchError::EndpointNotFound {
                endpoint: format!("mock://{service}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorityConnector for MockAuthorityConnector {
    async fn connect_operations(&self) -> DispatchResult<Arc<dyn OperationAuthority>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable("operations")?;
        Ok(Arc::new(self.operations.clone()))
    }

    async fn connect_dispositioning(&self) -> DispatchResult<Arc<dyn DispositioningAuthority>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable("dispositioning")?;
        Ok(Arc::new(self.dispositioning.clone()))
    }

    async fn connect_catalog(&self) -> DispatchResult<Arc<dyn ResourceCatalog>> {
        self.check_reachable("catalog")?;
        Ok(Arc::new(self.catalog.clone()))
    }
}
