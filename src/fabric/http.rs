//! HTTP transport for fabric invocations
//!
//! Each invocation is POSTed as JSON to `{fabricURI}/frame`, signed by the
//! client's signer:
//!
//! - `X-Fabric-Signer`: signer address (hex public key)
//! - `X-Fabric-Signature`: hex Ed25519 signature over the exact body bytes
//! - `X-Content-Space`: content space id from the network config
//!
//! Fabric URIs are tried in order; only transport failures move on to the
//! next node. Whatever a node answers is translated into an
//! [`InvocationResult`] and delivered through the reply callback.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CallResponse, ClientFactory, FabricClient, FrameRequest, InvocationResult, Reply};
use crate::keys::Signer;
use crate::network::NetworkConfig;
use crate::types::{BridgeError, Result};

/// Header carrying the signer address
pub const SIGNER_HEADER: &str = "X-Fabric-Signer";
/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "X-Fabric-Signature";
/// Header carrying the content space id
pub const CONTENT_SPACE_HEADER: &str = "X-Content-Space";

const OCTET_STREAM: &str = "application/octet-stream";

// =============================================================================
// Factory
// =============================================================================

/// Builds [`HttpFabricClient`]s that share one connection pool
pub struct HttpClientFactory {
    http: reqwest::Client,
}

impl HttpClientFactory {
    /// Create a factory whose clients time out fabric requests after `request_timeout`
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BridgeError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, config: Arc<NetworkConfig>, signer: Signer) -> Result<Arc<dyn FabricClient>> {
        if config.fabric_uris.is_empty() {
            return Err(BridgeError::ClientConstruction(
                "network configuration lists no fabric URIs".into(),
            ));
        }
        Ok(Arc::new(HttpFabricClient::new(self.http.clone(), config, signer)))
    }
}

// =============================================================================
// Client
// =============================================================================

/// Fabric client speaking the signed `/frame` protocol
pub struct HttpFabricClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: Arc<NetworkConfig>,
    signer: Signer,
}

impl HttpFabricClient {
    /// Bind a signer to a network config
    pub fn new(http: reqwest::Client, config: Arc<NetworkConfig>, signer: Signer) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                config,
                signer,
            }),
        }
    }
}

impl FabricClient for HttpFabricClient {
    fn call_from_frame_message(&self, message: FrameRequest, reply: Reply) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.invoke(&message).await;
            if !reply.send(result) {
                debug!(
                    request_id = %message.request_id,
                    "Invocation finished after caller stopped waiting"
                );
            }
        });
    }

    fn signer_address(&self) -> &str {
        self.inner.signer.address()
    }
}

impl Inner {
    async fn invoke(&self, message: &FrameRequest) -> InvocationResult {
        let body = match serde_json::to_vec(message) {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                return InvocationResult::Error(json!({
                    "status": 500,
                    "message": format!("Failed to encode frame request: {e}"),
                }))
            }
        };
        let signature = self.signer.sign_hex(&body);

        let mut last_error = String::from("no fabric URIs configured");
        for base in &self.config.fabric_uris {
            let url = format!("{}/frame", base.trim_end_matches('/'));

            let sent = self
                .http
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .header(SIGNER_HEADER, self.signer.address())
                .header(SIGNATURE_HEADER, &signature)
                .header(CONTENT_SPACE_HEADER, &self.config.content_space_id)
                .body(body.clone())
                .send()
                .await;

            match sent {
                Ok(response) => {
                    debug!(
                        request_id = %message.request_id,
                        url = %url,
                        status = %response.status(),
                        "Fabric node answered"
                    );
                    return translate_response(response).await;
                }
                Err(e) => {
                    warn!(
                        request_id = %message.request_id,
                        url = %url,
                        error = %e,
                        "Fabric node unreachable, trying next"
                    );
                    last_error = e.to_string();
                }
            }
        }

        InvocationResult::Error(json!({
            "status": 502,
            "message": format!("No fabric node reachable: {last_error}"),
        }))
    }
}

/// Translate a fabric node's HTTP answer into an invocation result
async fn translate_response(response: reqwest::Response) -> InvocationResult {
    let status = response.status();
    let is_binary = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with(OCTET_STREAM))
        .unwrap_or(false);

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            return InvocationResult::Error(json!({
                "status": 502,
                "message": format!("Failed to read fabric response: {e}"),
            }))
        }
    };

    translate_body(status, is_binary, body)
}

fn translate_body(status: StatusCode, is_binary: bool, body: Bytes) -> InvocationResult {
    let success = status.is_success();

    if success && is_binary {
        return InvocationResult::Response(Some(CallResponse::Binary(body)));
    }

    if status == StatusCode::NO_CONTENT || body.is_empty() {
        return if success {
            InvocationResult::Response(None)
        } else {
            InvocationResult::Error(status_error(status, None))
        };
    }

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) if success => {
            return InvocationResult::Error(json!({
                "status": 502,
                "message": "Fabric returned a body that is neither JSON nor binary",
            }))
        }
        Err(_) => {
            let text = String::from_utf8_lossy(&body).into_owned();
            return InvocationResult::Error(status_error(status, Some(text)));
        }
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let mut error = error.clone();
        if !success {
            if let Some(object) = error.as_object_mut() {
                object
                    .entry("status")
                    .or_insert_with(|| json!(status.as_u16()));
            }
        }
        return InvocationResult::Error(error);
    }

    if !success {
        return InvocationResult::Error(json!({
            "status": status.as_u16(),
            "message": value,
        }));
    }

    match value {
        Value::Object(mut object) if object.contains_key("response") => {
            let response = object.remove("response").unwrap_or(Value::Null);
            InvocationResult::Response(CallResponse::from_json(response))
        }
        other => InvocationResult::Response(CallResponse::from_json(other)),
    }
}

fn status_error(status: StatusCode, message: Option<String>) -> Value {
    let message = message
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Fabric request failed".to_string());
    json!({ "status": status.as_u16(), "message": message })
}

// =============================================================================
// Tests
// =============================================================================
