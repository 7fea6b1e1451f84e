use std::time::Duration;

use alarm_core::DispatchResult;
use alarm_domain::{DispositioningAuthority, OperationId, ResourceId};
use async_trait::async_trait;

use super::rest_client::RestClient;

/// Dispositioning authority over REST
pub struct HttpDispositioningAuthority {
    client: RestClient,
}

impl HttpDispositioningAuthority {
    pub fn new(base_url: &str, timeout: Duration) -> DispatchResult<Self> {
        Ok(Self {
            client: RestClient::new(base_url, timeout)?,
        })
    }

    pub fn from_client(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DispositioningAuthority for HttpDispositioningAuthority {
    async fn get_dispatched_resources(
        &self,
        operation_id: OperationId,
    ) -> DispatchResult<Vec<ResourceId>> {
        let id = operation_id.to_string();
        self.client
            .get_json(&["api", "operations", id.as_str(), "dispatched"], &[])
            .await
    }

    async fn dispatch(&self, operation_id: OperationId, resource_id: &str) -> DispatchResult<()> {
        let id = operation_id.to_string();
        self.client
            .post_empty(&["api", "operations", id.as_str(), "dispatch", resource_id])
            .await
    }

    async fn recall(&self, operation_id: OperationId, resource_id: &str) -> DispatchResult<()> {
        let id = operation_id.to_string();
        self.client
            .post_empty(&["api", "operations", id.as_str(), "recall", resource_id])
            .await
    }
}
