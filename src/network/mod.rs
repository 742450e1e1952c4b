//! Network configuration: document shape, remote source, and the
//! process-lifetime cache every client construction reads from.

pub mod cache;
pub mod source;
pub mod types;

pub use cache::ConfigCache;
pub use source::{ConfigSource, HttpConfigSource};
pub use types::NetworkConfig;
