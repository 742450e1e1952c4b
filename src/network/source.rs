//! Where network configuration comes from

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::NetworkConfig;
use crate::types::{BridgeError, Result};

/// A source of network configuration
///
/// Implementations report every failure as [`BridgeError::ConfigFetch`].
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch and parse the configuration document
    async fn fetch(&self) -> Result<NetworkConfig>;
}

/// Fetches configuration over HTTP from `CONFIG_URL`
pub struct HttpConfigSource {
    client: reqwest::Client,
    url: String,
    region: Option<String>,
}

impl HttpConfigSource {
    /// Default timeout for the configuration request
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Create a source for the given URL, optionally pinned to a region
    pub fn new(url: impl Into<String>, region: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            region,
        })
    }

    /// Configured URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<NetworkConfig> {
        let mut request = self.client.get(&self.url);
        if let Some(ref region) = self.region {
            request = request.query(&[("elvgeo", region.as_str())]);
        }

        debug!(url = %self.url, region = ?self.region, "Fetching network configuration");

        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::ConfigFetch(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::ConfigFetch(format!(
                "{} returned {}",
                self.url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::ConfigFetch(format!("{}: {e}", self.url)))?;

        NetworkConfig::from_document(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_node_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "qspace": { "id": "ispc-test" },
                "network": { "services": {
                    "fabric_api": ["https://fabric.test"],
                    "ethereum_api": ["https://eth.test"]
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpConfigSource::new(format!("{}/config", server.uri()), None).unwrap();
        let config = source.fetch().await.unwrap();

        assert_eq!(config.content_space_id, "ispc-test");
        assert_eq!(config.fabric_uris, vec!["https://fabric.test"]);
    }

    #[tokio::test]
    async fn test_fetch_with_region() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config"))
            .and(query_param("elvgeo", "eu-west"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contentSpaceId": "ispc-eu",
                "fabricURIs": ["https://eu.fabric.test"],
                "ethereumURIs": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpConfigSource::new(
            format!("{}/config", server.uri()),
            Some("eu-west".to_string()),
        )
        .unwrap();
        let config = source.fetch().await.unwrap();

        assert_eq!(config.content_space_id, "ispc-eu");
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = HttpConfigSource::new(server.uri(), None).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, BridgeError::ConfigFetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Nothing listens on port 9 locally
        let source = HttpConfigSource::new("http://127.0.0.1:9/config", None).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, BridgeError::ConfigFetch(_)));
    }
}
