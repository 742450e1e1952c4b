//! HTTP route handlers

pub mod client;
pub mod health;

pub use client::{handle_client_call, ClientCallRequest};
pub use health::{health_check, version_info};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use crate::types::BridgeError;

/// Build a response with a content type and permissive CORS origin
pub(crate) fn response_with(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// JSON response
pub(crate) fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    response_with(status, Some("application/json"), Bytes::from(body))
}

/// `{"error": {"status", "message"}}` response for a bridge failure
pub(crate) fn error_response(err: BridgeError) -> Response<Full<Bytes>> {
    let (status, body) = err.into_status_code_and_body();
    json_response(status, body)
}
