//! Async discovery service
//!
//! Device probing is blocking and the registry behind it is shared mutable
//! state, so every call takes the engine lock and runs on the blocking pool.

use crate::discovery::{ConfigDescriptor, DiscoveryEngine};
use crate::driver::DriverRegistry;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A service that can list configurable resources on demand
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// Discover resources. `extra` carries caller-specific options and may be empty.
    async fn discover_resources(
        &self,
        extra: Map<String, Value>,
    ) -> Result<Vec<ConfigDescriptor>>;
}

/// Webcam discovery exposed as a [`DiscoveryService`]
pub struct WebcamDiscovery<R> {
    engine: Arc<Mutex<DiscoveryEngine<R>>>,
}

impl<R> Clone for WebcamDiscovery<R> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<R: DriverRegistry + 'static> WebcamDiscovery<R> {
    /// Wrap an engine; clones share it and queue behind each other
    pub fn new(engine: DiscoveryEngine<R>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run one discovery pass
    pub async fn discover(&self) -> Result<Vec<ConfigDescriptor>> {
        let mut engine = Arc::clone(&self.engine).lock_owned().await;
        tokio::task::spawn_blocking(move || engine.discover()).await?
    }

    /// Run a closure against the engine while holding the discovery lock
    pub async fn with_engine<T>(&self, f: impl FnOnce(&mut DiscoveryEngine<R>) -> T) -> T {
        let mut engine = self.engine.lock().await;
        f(&mut engine)
    }
}

#[async_trait]
impl<R: DriverRegistry + 'static> DiscoveryService for WebcamDiscovery<R> {
    async fn discover_resources(
        &self,
        extra: Map<String, Value>,
    ) -> Result<Vec<ConfigDescriptor>> {
        if !extra.is_empty() {
            let keys: Vec<_> = extra.keys().collect();
            tracing::debug!(?keys, "Ignoring extra discovery options");
        }
        self.discover().await
    }
}
