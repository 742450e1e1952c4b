//! Process-lifetime memo of the network configuration
//!
//! The first caller triggers the fetch; everyone arriving while it is in
//! flight awaits the same fetch. A failed fetch leaves the cache empty so the
//! next caller retries.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{ConfigSource, NetworkConfig};
use crate::types::{BridgeError, Result};

/// Single-flight cache for [`NetworkConfig`]
pub struct ConfigCache {
    source: Arc<dyn ConfigSource>,
    config: OnceCell<Arc<NetworkConfig>>,
}

impl ConfigCache {
    /// Create an empty cache over a configuration source
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            config: OnceCell::new(),
        }
    }

    /// Get the configuration, fetching it on first use
    pub async fn get_config(&self) -> Result<Arc<NetworkConfig>> {
        self.config
            .get_or_try_init(|| async {
                let config = self.source.fetch().await?;
                info!(
                    content_space = %config.content_space_id,
                    fabric_uris = config.fabric_uris.len(),
                    ethereum_uris = config.ethereum_uris.len(),
                    "Network configuration loaded"
                );
                Ok::<_, BridgeError>(Arc::new(config))
            })
            .await
            .map(Arc::clone)
    }

    /// Whether a configuration has been fetched
    pub fn is_loaded(&self) -> bool {
        self.config.initialized()
    }

    /// Warm the cache at startup
    ///
    /// Failure is logged, not returned; the first request retries.
    pub async fn prefetch(&self) {
        if let Err(e) = self.get_config().await {
            warn!("Network configuration prefetch failed: {}", e);
        }
    }
}
