//! fabric-bridge - HTTP front door for signer-bound content fabric clients
//!
//! A caller POSTs `{privateKey, calledMethod, args, module}` to `/client`.
//! The bridge keeps one fabric client per distinct credential, all sharing a
//! single network configuration fetched on first use, invokes the method
//! and relays the result as the HTTP response.
//!
//! ## Components
//!
//! - **network**: Network configuration source and the process-wide cache
//! - **keys**: Signer derivation and credential fingerprints
//! - **fabric**: Client boundary (invocation message, one-shot reply) and the HTTP transport
//! - **registry**: Credential -> client map with single-flight construction and eviction
//! - **routes**: `/client`, `/health`, `/version`

pub mod config;
pub mod fabric;
pub mod keys;
pub mod network;
pub mod registry;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{BridgeError, Result};
