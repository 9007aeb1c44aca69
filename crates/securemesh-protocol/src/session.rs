//! Authenticated session handed to a handler

use crate::error::Result;
use crate::wire::{BoxedTransport, Transport, Wire};
use securemesh_crypto::SymmetricKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// One connection's channel plus the key it was authenticated with
pub struct Session {
    wire: Wire<BoxedTransport>,
    key: SymmetricKey,
    peer_id: String,
}

impl Session {
    pub fn new(wire: Wire<BoxedTransport>, key: SymmetricKey, peer_id: impl Into<String>) -> Self {
        Session {
            wire,
            key,
            peer_id: peer_id.into(),
        }
    }

    /// Build a session directly over a stream
    pub fn over<T: Transport + 'static>(
        stream: T,
        key: SymmetricKey,
        peer_id: impl Into<String>,
    ) -> Self {
        Session::new(Wire::boxed(stream), key, peer_id)
    }

    /// Serialize, encrypt and send a value
    pub async fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.wire.send_sealed(value, &self.key).await
    }

    /// Receive, decrypt and deserialize a value
    pub async fn read<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.wire.recv_sealed(&self.key).await
    }

    /// Id of the remote node
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.wire.shutdown().await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer_id", &self.peer_id)
            .finish_non_exhaustive()
    }
}
