//! Fabric client boundary
//!
//! The fabric client library exposes a single callback-style operation:
//! invoke a named method with arguments and get `{response, error}` back
//! exactly once. This module models that contract:
//!
//! - [`FrameRequest`] is the invocation message
//! - [`Reply`] is the one-shot callback; sending consumes it, so a result can
//!   be delivered at most once
//! - [`FabricClient`] is a client bound to one signer
//! - [`ClientFactory`] builds clients from a network config and a signer
//!
//! [`http`] provides the transport used by the binary.

pub mod http;
#[cfg(test)]
pub(crate) mod testing;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::keys::Signer;
use crate::network::NetworkConfig;
use crate::types::Result;

pub use http::{HttpClientFactory, HttpFabricClient};

/// Message type tag carried by every invocation
pub const FRAME_REQUEST_TYPE: &str = "FrameRequest";

// =============================================================================
// Invocation message
// =============================================================================

/// Remote invocation message
///
/// Absent request fields pass through as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRequest {
    /// Always [`FRAME_REQUEST_TYPE`]
    #[serde(rename = "type")]
    pub message_type: String,
    /// Name of the client method to invoke
    #[serde(rename = "calledMethod")]
    pub called_method: Option<String>,
    /// Method arguments, passed through untouched
    pub args: serde_json::Value,
    /// Optional module qualifier for the method
    pub module: Option<String>,
    /// Disambiguates concurrent in-flight calls on one client
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
}

impl FrameRequest {
    /// Build a message with a fresh request id
    pub fn new(
        called_method: Option<String>,
        args: serde_json::Value,
        module: Option<String>,
    ) -> Self {
        Self {
            message_type: FRAME_REQUEST_TYPE.to_string(),
            called_method,
            args,
            module,
            request_id: Uuid::new_v4(),
        }
    }
}

// =============================================================================
// Invocation result
// =============================================================================

/// Successful response payload
#[derive(Debug, Clone, PartialEq)]
pub enum CallResponse {
    /// Structured value, serialized as JSON
    Json(serde_json::Value),
    /// Raw byte sequence
    Binary(Bytes),
}

impl CallResponse {
    /// Wrap a JSON value
    ///
    /// Falsy values (`null`, `false`, `0`, `""`) mean "no response".
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        let empty = match &value {
            serde_json::Value::Null => true,
            serde_json::Value::Bool(b) => !b,
            serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
            serde_json::Value::String(s) => s.is_empty(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
        };
        if empty {
            None
        } else {
            Some(Self::Json(value))
        }
    }
}

/// What the callback delivers: either a response or an error object
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    /// `{response}`; `None` when the method produced nothing
    Response(Option<CallResponse>),
    /// `{error}`; an arbitrary JSON value, usually an object with an optional `status`
    Error(serde_json::Value),
}

// =============================================================================
// One-shot callback
// =============================================================================

/// One-shot callback handed to [`FabricClient::call_from_frame_message`]
///
/// Dropping a `Reply` without sending is reported to the caller as a dropped
/// callback.
#[derive(Debug)]
pub struct Reply {
    tx: oneshot::Sender<InvocationResult>,
}

impl Reply {
    /// Create a reply handle and the receiver that awaits it
    pub fn channel() -> (Self, oneshot::Receiver<InvocationResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Deliver the result. Returns false if nobody is waiting any more.
    pub fn send(self, result: InvocationResult) -> bool {
        self.tx.send(result).is_ok()
    }

    /// Deliver a successful response
    pub fn respond(self, response: Option<CallResponse>) -> bool {
        self.send(InvocationResult::Response(response))
    }

    /// Deliver an error object
    pub fn fail(self, error: serde_json::Value) -> bool {
        self.send(InvocationResult::Error(error))
    }

    /// Whether the waiting side has given up (e.g. its deadline passed)
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// =============================================================================
// Client traits
// =============================================================================

/// A fabric client bound to one signer
pub trait FabricClient: Send + Sync {
    /// Invoke `message.called_method`, delivering the result through `reply`
    ///
    /// Must not block; long-running work belongs in a spawned task.
    fn call_from_frame_message(&self, message: FrameRequest, reply: Reply);

    /// Public address of the bound signer
    fn signer_address(&self) -> &str;
}

/// Builds signer-bound fabric clients
pub trait ClientFactory: Send + Sync {
    /// Build a client for `config` and bind `signer` to it
    fn build(&self, config: Arc<NetworkConfig>, signer: Signer) -> Result<Arc<dyn FabricClient>>;
}
