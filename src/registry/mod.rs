//! Client registry: one signer-bound fabric client per caller credential

pub mod clients;

pub use clients::{spawn_cleanup_task, ClientRegistry, RegistryConfig, RegistryStats};
