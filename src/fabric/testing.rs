//! In-process fakes for the config source and the fabric client

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ClientFactory, FabricClient, FrameRequest, InvocationResult, Reply};
use crate::keys::Signer;
use crate::network::{ConfigSource, NetworkConfig};
use crate::types::{BridgeError, Result};

pub(crate) fn test_network_config() -> NetworkConfig {
    NetworkConfig {
        content_space_id: "ispc-test".to_string(),
        fabric_uris: vec!["https://fabric.test".to_string()],
        ethereum_uris: vec!["https://eth.test".to_string()],
    }
}

// =============================================================================
// Config source
// =============================================================================

/// Counts fetches; can be slowed down or made to fail the first N times
pub(crate) struct CountingConfigSource {
    fetches: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingConfigSource {
    pub(crate) fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for CountingConfigSource {
    async fn fetch(&self) -> Result<NetworkConfig> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BridgeError::ConfigFetch("config source unreachable".into()));
        }

        Ok(test_network_config())
    }
}

// =============================================================================
// Fabric client
// =============================================================================

/// How a [`ScriptedClient`] answers
#[derive(Clone)]
pub(crate) enum Script {
    /// Deliver this result
    Reply(InvocationResult),
    /// Keep the reply handle alive and never answer
    Hang,
    /// Drop the reply handle without answering
    Drop,
}

/// Answers every call according to its script and records what it was sent
pub(crate) struct ScriptedClient {
    signer: Signer,
    script: Script,
    pub(crate) received: Mutex<Vec<FrameRequest>>,
    parked: Mutex<Vec<Reply>>,
}

impl FabricClient for ScriptedClient {
    fn call_from_frame_message(&self, message: FrameRequest, reply: Reply) {
        if let Ok(mut received) = self.received.lock() {
            received.push(message);
        }
        match &self.script {
            Script::Reply(result) => {
                let result = result.clone();
                tokio::spawn(async move {
                    reply.send(result);
                });
            }
            Script::Hang => {
                if let Ok(mut parked) = self.parked.lock() {
                    parked.push(reply);
                }
            }
            Script::Drop => drop(reply),
        }
    }

    fn signer_address(&self) -> &str {
        self.signer.address()
    }
}

/// Builds [`ScriptedClient`]s, counting builds and keeping every client built
pub(crate) struct ScriptedFactory {
    script: Mutex<Script>,
    builds: AtomicUsize,
    delay: Option<Duration>,
    pub(crate) built: Mutex<Vec<Arc<ScriptedClient>>>,
}

impl ScriptedFactory {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            builds: AtomicUsize::new(0),
            delay: None,
            built: Mutex::new(Vec::new()),
        }
    }

    /// Block the building thread for `delay`, widening the race window
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ClientFactory for ScriptedFactory {
    fn build(&self, _config: Arc<NetworkConfig>, signer: Signer) -> Result<Arc<dyn FabricClient>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let script = self
            .script
            .lock()
            .map(|s| s.clone())
            .map_err(|_| BridgeError::Internal("script lock poisoned".into()))?;

        let client = Arc::new(ScriptedClient {
            signer,
            script,
            received: Mutex::new(Vec::new()),
            parked: Mutex::new(Vec::new()),
        });
        if let Ok(mut built) = self.built.lock() {
            built.push(Arc::clone(&client));
        }
        Ok(client as Arc<dyn FabricClient>)
    }
}
