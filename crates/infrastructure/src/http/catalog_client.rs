use std::time::Duration;

use alarm_core::DispatchResult;
use alarm_domain::{CatalogResource, OperationResource, ResourceCatalog};
use async_trait::async_trait;

use super::rest_client::RestClient;

/// Resource catalog over REST
pub struct HttpResourceCatalog {
    client: RestClient,
}

impl HttpResourceCatalog {
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
impl ResourceCatalog for HttpResourceCatalog {
    async fn get_all_resources(&self) -> DispatchResult<Vec<CatalogResource>> {
        self.client.get_json(&["api", "resources"], &[]).await
    }

    async fn get_filtered_resources(
        &self,
        resources: &[OperationResource],
    ) -> DispatchResult<Vec<OperationResource>> {
        self.client
            .post_json(&["api", "resources", "filter"], resources)
            .await
    }
}
