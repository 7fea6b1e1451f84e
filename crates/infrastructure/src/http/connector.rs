use std::sync::Arc;
use std::time::Duration;

use alarm_core::{AuthorityConfig, DispatchResult};
use alarm_domain::{AuthorityConnector, DispositioningAuthority, OperationAuthority, ResourceCatalog};
use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    catalog_client::HttpResourceCatalog, dispositioning_client::HttpDispositioningAuthority,
    operation_client::HttpOperationAuthority, rest_client::RestClient,
};

/// Opens REST bindings to the configured authorities
///
/// Every binding is probed with `GET {base}/health` before it is handed out,
/// so an unreachable service fails at bind time instead of on first use.
pub struct HttpAuthorityConnector {
    config: AuthorityConfig,
}

impl HttpAuthorityConnector {
    pub fn new(config: AuthorityConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_seconds)
    }

    async fn open(&self, name: &str, base_url: &str) -> DispatchResult<RestClient> {
        debug!("Opening {} binding to {}", name, base_url);
        let client = RestClient::new(base_url, self.timeout())?;
        client.probe().await?;
        info!("Bound {} service at {}", name, base_url);
        Ok(client)
    }
}

#[async_trait]
impl AuthorityConnector for HttpAuthorityConnector {
    async fn connect_operations(&self) -> DispatchResult<Arc<dyn OperationAuthority>> {
        let client = self
            .open("operation", &self.config.operation_service_url)
            .await?;
        Ok(Arc::new(HttpOperationAuthority::from_client(client)))
    }

    async fn connect_dispositioning(&self) -> DispatchResult<Arc<dyn DispositioningAuthority>> {
        let client = self
            .open("dispositioning", &self.config.dispositioning_service_url)
            .await?;
        Ok(Arc::new(HttpDispositioningAuthority::from_client(client)))
    }

    async fn connect_catalog(&self) -> DispatchResult<Arc<dyn ResourceCatalog>> {
        let client = self
            .open("catalog", &self.config.catalog_service_url)
            .await?;
        Ok(Arc::new(HttpResourceCatalog::from_client(client)))
    }
}
