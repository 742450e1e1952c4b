//! Client invocation endpoint (POST /client)
//!
//! Resolves the caller's fabric client from the credential in the body,
//! invokes the named method, and writes the callback's result back as the
//! HTTP response:
//!
//! | callback result                     | HTTP response                          |
//! |-------------------------------------|----------------------------------------|
//! | `error` with `status` in 200..=599  | that status, `{"error": <error>}`      |
//! | `error` without a usable `status`   | 400, `{"error": <error>}`              |
//! | no response (absent or falsy)       | 204, empty body                        |
//! | binary response                     | 200, `application/octet-stream` bytes  |
//! | any other response                  | 200, response as JSON                  |
//!
//! Bridge failures (config unavailable, bad credential, deadline passed) use
//! the `BridgeError` status mapping.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{error_response, json_response, response_with};
use crate::fabric::{CallResponse, FabricClient, FrameRequest, InvocationResult, Reply};
use crate::server::AppState;
use crate::types::{BridgeError, Result};

/// Request body for POST /client
///
/// Fields are only checked for presence; `args` passes through untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCallRequest {
    pub private_key: Option<String>,
    pub called_method: Option<String>,
    #[serde(default)]
    pub args: Value,
    pub module: Option<String>,
}

impl ClientCallRequest {
    /// Parse a request body, which must be a JSON object
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(BridgeError::BadRequest(
                "request body must be a JSON object".to_string(),
            ));
        }
        // serde's type errors quote the offending value, which may be a credential
        serde_json::from_value(value).map_err(|_| {
            BridgeError::BadRequest(
                "privateKey, calledMethod and module must be strings".to_string(),
            )
        })
    }
}

/// Handle POST /client
pub async fn handle_client_call(state: Arc<AppState>, body: Bytes) -> Response<Full<Bytes>> {
    match invoke(&state, &body).await {
        Ok(response) => response,
        Err(e) => {
            warn!(status = e.status_code().as_u16(), "Client call failed: {}", e);
            error_response(e)
        }
    }
}

async fn invoke(state: &AppState, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let request = ClientCallRequest::parse(body)?;
    let private_key = request.private_key.as_deref().ok_or_else(|| {
        BridgeError::ClientConstruction("privateKey is required".to_string())
    })?;

    let client = state.registry.get_client(private_key).await?;

    let message = FrameRequest::new(request.called_method, request.args, request.module);
    let request_id = message.request_id;
    let method = message.called_method.clone().unwrap_or_default();
    debug!(
        request_id = %request_id,
        method = %method,
        signer = %client.signer_address(),
        "Invoking fabric client"
    );

    let (reply, rx) = Reply::channel();
    client.call_from_frame_message(message, reply);

    let timeout = state.invocation_timeout();
    let result = match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => {
            return Err(BridgeError::CallbackDropped(format!(
                "client dropped request {request_id} without replying"
            )))
        }
        Err(_) => {
            return Err(BridgeError::Timeout(format!(
                "no reply to request {request_id} within {} ms",
                timeout.as_millis()
            )))
        }
    };

    let response = render_result(result);
    info!(
        request_id = %request_id,
        method = %method,
        signer = %client.signer_address(),
        status = response.status().as_u16(),
        "Client call completed"
    );
    Ok(response)
}

/// Turn a callback result into the HTTP response
fn render_result(result: InvocationResult) -> Response<Full<Bytes>> {
    match result {
        InvocationResult::Error(error) => {
            let status = error_status(&error);
            json_response(status, json!({ "error": error }).to_string())
        }
        InvocationResult::Response(Some(CallResponse::Binary(bytes))) => {
            response_with(StatusCode::OK, Some("application/octet-stream"), bytes)
        }
        InvocationResult::Response(Some(CallResponse::Json(value))) => {
            match CallResponse::from_json(value) {
                Some(CallResponse::Json(value)) => json_response(StatusCode::OK, value.to_string()),
                _ => no_content(),
            }
        }
        InvocationResult::Response(None) => no_content(),
    }
}

fn no_content() -> Response<Full<Bytes>> {
    response_with(StatusCode::NO_CONTENT, None, Bytes::new())
}

/// `error.status` when it can carry the error body as a final response, else 400
///
/// 1xx codes are informational and would drop the body, so they fall back too.
fn error_status(error: &Value) -> StatusCode {
    error
        .get("status")
        .and_then(Value::as_u64)
        .filter(|code| (200..=599).contains(code))
        .and_then(|code| StatusCode::from_u16(code as u16).ok())
        .unwrap_or(StatusCode::BAD_REQUEST)
}
