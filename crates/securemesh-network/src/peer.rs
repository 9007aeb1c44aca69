//! Known peers and the per-node peer table

use crate::error::Result;
use crate::handler::Handler;
use crate::handshake;
use crate::identity::NodeIdentity;
use crate::tcp;
use chrono::{DateTime, Utc};
use securemesh_crypto::SymmetricKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Where a peer listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

/// Peer addresses by id, as exchanged during topology discovery
pub type Topology = BTreeMap<String, PeerAddress>;

/// Another node as known locally
#[derive(Debug, Clone)]
pub struct Peer {
    id: String,
    host: String,
    port: u16,
    key: Option<SymmetricKey>,
    last_handshake: Option<DateTime<Utc>>,
}

impl Peer {
    /// Peer with no session key yet
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Peer {
            id: id.into(),
            host: host.into(),
            port,
            key: None,
            last_handshake: None,
        }
    }

    /// Attach a freshly established session key
    pub fn with_key(mut self, key: SymmetricKey) -> Self {
        self.key = Some(key);
        self.last_handshake = Some(Utc::now());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn key(&self) -> Option<&SymmetricKey> {
        self.key.as_ref()
    }

    /// When the current key was established
    pub fn last_handshake(&self) -> Option<DateTime<Utc>> {
        self.last_handshake
    }

    /// Whether a cached key can be offered on the next connection
    pub fn is_known(&self) -> bool {
        self.key.is_some()
    }

    pub fn address(&self) -> PeerAddress {
        PeerAddress {
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// Open a session to this peer and run `handler` on it
    ///
    /// The cached key is offered if there is one. A renegotiated key replaces
    /// it once the session completes. A failed session drops the cached key
    /// so the next attempt negotiates from scratch.
    pub async fn reconnect(
        &mut self,
        local: &NodeIdentity,
        handler_name: &str,
        handler: &dyn Handler,
    ) -> Result<()> {
        let wire = tcp::dial(&self.host, self.port).await?;
        let outcome =
            handshake::initiate(wire, local, &self.id, self.key.as_ref(), handler_name, handler)
                .await;

        match outcome {
            Ok(key) => {
                if self.key.as_ref() != Some(&key) {
                    self.key = Some(key);
                    self.last_handshake = Some(Utc::now());
                }
                Ok(())
            }
            Err(e) => {
                if self.key.take().is_some() {
                    debug!("Dropped cached key for peer {}", self.id);
                }
                Err(e)
            }
        }
    }
}

/// Ordered, concurrency-safe map of peers keyed by id
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    peers: Arc<RwLock<BTreeMap<String, Peer>>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<Peer> {
        self.peers.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.peers.read().await.contains_key(id)
    }

    /// Cached session key for `id`, if the peer is known and keyed
    pub async fn key_of(&self, id: &str) -> Option<SymmetricKey> {
        self.peers.read().await.get(id).and_then(|p| p.key.clone())
    }

    /// Insert a peer, evicting any previous entry with the same id
    pub async fn upsert(&self, peer: Peer) -> Option<Peer> {
        self.peers.write().await.insert(peer.id.clone(), peer)
    }

    /// Replace the session key of an existing entry
    ///
    /// Returns `false` if there is no entry for `id`.
    pub async fn update_key(&self, id: &str, key: Option<SymmetricKey>) -> bool {
        let mut peers = self.peers.write().await;
        let Some(peer) = peers.get_mut(id) else {
            return false;
        };

        if key.is_some() && peer.key != key {
            peer.last_handshake = Some(Utc::now());
        }
        peer.key = key;
        true
    }

    pub async fn remove(&self, id: &str) -> Option<Peer> {
        self.peers.write().await.remove(id)
    }

    pub async fn ids(&self) -> Vec<String> {
        self.peers.read().await.keys().cloned().collect()
    }

    /// Addresses of every known peer, without key material
    pub async fn snapshot(&self) -> Topology {
        self.peers
            .read()
            .await
            .iter()
            .map(|(id, peer)| (id.clone(), peer.address()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}
