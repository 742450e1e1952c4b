//! Error types for the bridge
//!
//! Every failure the bridge produces on its own (as opposed to errors the
//! fabric returns through an invocation callback) is a `BridgeError`.

use hyper::StatusCode;
use serde_json::json;

/// Main error type for bridge operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("Configuration fetch failed: {0}")]
    ConfigFetch(String),

    #[error("Client construction failed: {0}")]
    ClientConstruction(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invocation timed out: {0}")]
    Timeout(String),

    #[error("Invocation callback dropped: {0}")]
    CallbackDropped(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigFetch(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ClientConstruction(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::CallbackDropped(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as the `{"error": {"status", "message"}}` body used on the wire
    pub fn to_body(&self) -> serde_json::Value {
        json!({
            "error": {
                "status": self.status_code().as_u16(),
                "message": self.to_string(),
            }
        })
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_body().to_string();
        (status, body)
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for BridgeError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
