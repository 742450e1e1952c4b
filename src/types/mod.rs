//! Shared types

pub mod error;

pub use error::{BridgeError, Result};
