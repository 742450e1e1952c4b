//! Per-credential fabric client registry.
//!
//! One client is built per distinct credential and reused for every later
//! request carrying the same credential. Construction is single-flight per
//! credential: concurrent first requests await the same pending build.
//!
//! # Eviction
//!
//! - Every lookup refreshes the entry's `last_used`
//! - Entries idle longer than `idle_ttl` are removed by [`ClientRegistry::cleanup`]
//! - Inserting past `max_clients` evicts the least recently used entry
//!
//! Evicting an entry only removes it from the map; requests already holding
//! the client finish normally.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::fabric::{ClientFactory, FabricClient};
use crate::keys::{CredentialKey, Signer};
use crate::network::ConfigCache;
use crate::types::{BridgeError, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the client registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of cached clients before LRU eviction
    pub max_clients: usize,

    /// Idle time after which a client is reaped; zero disables idle expiry
    pub idle_ttl: Duration,

    /// How often the background task runs cleanup
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_clients: 10_000,
            idle_ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

// =============================================================================
// Client Entry
// =============================================================================

/// A registry slot. The client cell is empty while construction is in flight.
struct ClientEntry {
    client: OnceCell<Arc<dyn FabricClient>>,
    /// Milliseconds since the registry epoch
    last_used_ms: AtomicU64,
}

impl ClientEntry {
    fn new(now_ms: u64) -> Self {
        Self {
            client: OnceCell::new(),
            last_used_ms: AtomicU64::new(now_ms),
        }
    }

    fn touch(&self, now_ms: u64) {
        self.last_used_ms.store(now_ms, Ordering::Relaxed);
    }

    fn last_used_ms(&self) -> u64 {
        self.last_used_ms.load(Ordering::Relaxed)
    }

    fn is_ready(&self) -> bool {
        self.client.initialized()
    }
}

// =============================================================================
// Registry Statistics
// =============================================================================

#[derive(Debug, Default)]
struct RegistryCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    constructions: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

impl RegistryCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RegistryStats {
        RegistryStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            constructions: self.constructions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of registry statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub hits: u64,
    pub misses: u64,
    pub constructions: u64,
    pub failures: u64,
    pub evictions: u64,
}

// =============================================================================
// Client Registry
// =============================================================================

/// Maps credentials to constructed, signer-bound fabric clients.
pub struct ClientRegistry {
    clients: DashMap<CredentialKey, Arc<ClientEntry>>,
    config_cache: Arc<ConfigCache>,
    factory: Arc<dyn ClientFactory>,
    config: RegistryConfig,
    counters: RegistryCounters,
    epoch: Instant,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new(
        config_cache: Arc<ConfigCache>,
        factory: Arc<dyn ClientFactory>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            clients: DashMap::new(),
            config_cache,
            factory,
            config,
            counters: RegistryCounters::default(),
            epoch: Instant::now(),
        }
    }

    /// Get the client for a credential, building it on first use.
    ///
    /// Fails with [`BridgeError::ConfigFetch`] when the network configuration
    /// is unavailable and [`BridgeError::ClientConstruction`] when the
    /// credential cannot produce a signer. Failed builds are not cached.
    pub async fn get_client(&self, private_key: &str) -> Result<Arc<dyn FabricClient>> {
        let key = CredentialKey::from_secret(private_key);

        if let Some(client) = self.lookup(&key) {
            RegistryCounters::bump(&self.counters.hits);
            return Ok(client);
        }
        RegistryCounters::bump(&self.counters.misses);

        let entry = self.entry_for(key);
        let built = entry
            .client
            .get_or_try_init(|| self.construct(private_key))
            .await
            .map(Arc::clone);

        match built {
            Ok(client) => {
                entry.touch(self.now_ms());
                // Eviction may have dropped the slot while it was building
                self.clients.entry(key).or_insert_with(|| Arc::clone(&entry));
                Ok(client)
            }
            Err(e) => {
                RegistryCounters::bump(&self.counters.failures);
                // Callers still parked on this slot retry the build in it, so
                // it stays until the last holder (map + this caller) fails.
                self.clients.remove_if(&key, |_, slot| {
                    Arc::ptr_eq(slot, &entry) && !slot.is_ready() && Arc::strong_count(slot) <= 2
                });
                Err(e)
            }
        }
    }

    /// Number of cached entries (including builds in flight)
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// When the credential's client was last handed out
    pub fn last_used(&self, private_key: &str) -> Option<Instant> {
        let key = CredentialKey::from_secret(private_key);
        self.clients
            .get(&key)
            .map(|entry| self.epoch + Duration::from_millis(entry.last_used_ms()))
    }

    /// Registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get registry statistics.
    pub fn stats(&self) -> RegistryStats {
        self.counters.snapshot()
    }

    /// Remove clients idle longer than the configured TTL.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        if self.config.idle_ttl.is_zero() {
            return 0;
        }

        let ttl_ms = self.config.idle_ttl.as_millis() as u64;
        let now_ms = self.now_ms();
        let mut removed = 0;
        self.clients.retain(|_, entry| {
            let expired = entry.is_ready() && now_ms.saturating_sub(entry.last_used_ms()) >= ttl_ms;
            if expired {
                removed += 1;
                RegistryCounters::bump(&self.counters.evictions);
            }
            !expired
        });
        removed
    }

    /// Return the cached client, refreshing its last-used time.
    fn lookup(&self, key: &CredentialKey) -> Option<Arc<dyn FabricClient>> {
        let entry = self.clients.get(key)?;
        let client = entry.client.get()?;
        entry.touch(self.now_ms());
        Some(Arc::clone(client))
    }

    /// Get or insert the slot for a credential.
    ///
    /// `max_clients` is a soft limit: concurrent misses and builds still in
    /// flight (which are never evicted) can briefly push the map past it.
    fn entry_for(&self, key: CredentialKey) -> Arc<ClientEntry> {
        if !self.clients.contains_key(&key) {
            while self.clients.len() >= self.config.max_clients {
                if !self.evict_lru() {
                    break;
                }
            }
        }

        let now_ms = self.now_ms();
        self.clients
            .entry(key)
            .or_insert_with(|| Arc::new(ClientEntry::new(now_ms)))
            .value()
            .clone()
    }

    async fn construct(&self, private_key: &str) -> Result<Arc<dyn FabricClient>> {
        let config = self.config_cache.get_config().await?;
        let signer = Signer::from_private_key(private_key).inspect_err(|e| {
            warn!("Signer derivation failed: {}", e);
        })?;
        let address = signer.address().to_string();

        let client = self.factory.build(config, signer).map_err(|e| match e {
            BridgeError::ConfigFetch(_) | BridgeError::ClientConstruction(_) => e,
            other => BridgeError::ClientConstruction(other.to_string()),
        })?;

        RegistryCounters::bump(&self.counters.constructions);
        info!(
            signer = %address,
            clients = self.clients.len(),
            "Fabric client constructed"
        );
        Ok(client)
    }

    /// Evict the least recently used ready entry. Returns false if none was evictable.
    fn evict_lru(&self) -> bool {
        let oldest = self
            .clients
            .iter()
            .filter(|e| e.value().is_ready())
            .min_by_key(|e| e.value().last_used_ms())
            .map(|e| *e.key());

        match oldest {
            Some(key) => {
                if self.clients.remove(&key).is_some() {
                    RegistryCounters::bump(&self.counters.evictions);
                    debug!("Registry at capacity, evicted least recently used client");
                }
                true
            }
            None => false,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Spawn the background task that reaps idle clients.
pub fn spawn_cleanup_task(registry: Arc<ClientRegistry>) -> tokio::task::JoinHandle<()> {
    let interval = registry.config().cleanup_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = registry.cleanup();
            if removed > 0 {
                info!(
                    removed,
                    remaining = registry.len(),
                    "Reaped idle fabric clients"
                );
            }
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
