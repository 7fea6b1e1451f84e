use std::time::Duration;

use alarm_core::DispatchResult;
use alarm_domain::{Operation, OperationAuthority, OperationId};
use async_trait::async_trait;

use super::rest_client::RestClient;

/// Operation authority over REST
pub struct HttpOperationAuthority {
    client: RestClient,
}

impl HttpOperationAuthority {
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
impl OperationAuthority for HttpOperationAuthority {
    async fn list_operation_ids(
        &self,
        max_age_minutes: i64,
        only_non_acknowledged: bool,
        limit: usize,
    ) -> DispatchResult<Vec<OperationId>> {
        self.client
            .get_json(
                &["api", "operations"],
                &[
                    ("max_age_minutes", max_age_minutes.to_string()),
                    ("only_non_acknowledged", only_non_acknowledged.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
    }

    async fn get_operation_by_id(&self, id: OperationId) -> DispatchResult<Option<Operation>> {
        let id = id.to_string();
        self.client
            .get_optional_json(&["api", "operations", id.as_str()])
            .await
    }
}
