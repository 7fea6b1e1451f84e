use std::time::Duration;

use alarm_core::{DispatchError, DispatchResult};
use reqwest::{Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Thin JSON-over-HTTP client shared by the authority clients
///
/// Transport failures and 5xx responses map to the connectivity class,
/// undecodable bodies and unexpected 4xx responses are fatal.
#[derive(Clone)]
pub struct RestClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> DispatchResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DispatchError::Configuration(format!("Invalid base URL {base_url}: {e}")))?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments, percent-encoding each one
    pub fn endpoint(&self, segments: &[&str]) -> DispatchResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DispatchError::Configuration(format!("Base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> DispatchResult<T> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| map_transport_error(&url, e))?;
        let response = check_status(&url, response).await?;
        decode(&url, response).await
    }

    /// GET that maps 404 to `None`
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> DispatchResult<Option<T>> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_transport_error(&url, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(&url, response).await?;
        decode(&url, response).await.map(Some)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> DispatchResult<T> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);
        let response = self
            .http_client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| map_transport_error(&url, e))?;
        let response = check_status(&url, response).await?;
        decode(&url, response).await
    }

    /// POST without a body, ignoring any response content
    pub async fn post_empty(&self, segments: &[&str]) -> DispatchResult<()> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);
        let response = self
            .http_client
            .post(url.clone())
            .send()
            .await
            .map_err(|e| map_transport_error(&url, e))?;
        check_status(&url, response).await?;
        Ok(())
    }

    /// Check that the service answers `GET {base}/health`
    pub async fn probe(&self) -> DispatchResult<()> {
        let url = self.endpoint(&["health"])?;
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_transport_error(&url, e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            warn!("Health probe failed: HTTP {} from {}", response.status(), url);
            Err(DispatchError::EndpointNotFound {
                endpoint: url.to_string(),
            })
        }
    }
}

fn map_transport_error(url: &Url, e: reqwest::Error) -> DispatchError {
    if e.is_connect() {
        DispatchError::EndpointNotFound {
            endpoint: url.to_string(),
        }
    } else if e.is_decode() {
        DispatchError::Serialization(format!("{url}: {e}"))
    } else {
        DispatchError::Communication(format!("{url}: {e}"))
    }
}

async fn check_status(url: &Url, response: Response) -> DispatchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        warn!("Authority request failed: HTTP {} - {}", status, body);
        Err(DispatchError::Communication(format!(
            "{url}: HTTP {status} - {body}"
        )))
    } else {
        Err(DispatchError::Protocol(format!(
            "{url}: unexpected HTTP {status} - {body}"
        )))
    }
}

async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> DispatchResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| map_transport_error(url, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| DispatchError::Serialization(format!("{url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = RestClient::new("http://localhost:60002/", Duration::from_secs(5)).unwrap();
        let url = client
            .endpoint(&["api", "operations", "7", "dispatch", "LF 16/12"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:60002/api/operations/7/dispatch/LF%2016%2F12"
        );
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let result = RestClient::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(DispatchError::Configuration(_))));
    }
}
