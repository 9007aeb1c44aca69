//! Handler contract and name-keyed registry

use crate::error::{NetworkError, Result};
use async_trait::async_trait;
use securemesh_protocol::Session;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Name of the handler used when a requested name is not registered
pub const FALLBACK_HANDLER: &str = "";

/// Business logic run once per authenticated session
///
/// On the accepting side a handler is resolved by name from the
/// [`HandlerRegistry`]. On the initiating side the caller passes the handler
/// that speaks the other half of the conversation. An error aborts only the
/// session it was raised in.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, session: &mut Session) -> Result<()>;
}

/// Concurrent map from handler name to handler
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<BTreeMap<String, Arc<dyn Handler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any handler of the same name
    pub async fn register(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.write().await.insert(name.into(), handler)
    }

    pub async fn unregister(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.write().await.remove(name)
    }

    /// Look up `name`, falling back to the `""` handler
    pub async fn resolve(&self, name: &str) -> Result<Arc<dyn Handler>> {
        let handlers = self.handlers.read().await;
        handlers
            .get(name)
            .or_else(|| handlers.get(FALLBACK_HANDLER))
            .cloned()
            .ok_or_else(|| NetworkError::HandlerNotFound(name.to_string()))
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.handlers.read().await.contains_key(name)
    }

    /// Registered names in order
    pub async fn names(&self) -> Vec<String> {
        self.handlers.read().await.keys().cloned().collect()
    }
}
