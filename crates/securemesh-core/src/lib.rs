//! SecureMesh Core Library
//!
//! Ties together the SecureMesh components:
//! - Cryptography (ciphers, key agreement, digests, value codec)
//! - Protocol (frames, sealed sessions, handshake states)
//! - Network (node identity, peer table, handlers, mesh node)

pub use securemesh_crypto as crypto;
pub use securemesh_network as network;
pub use securemesh_protocol as protocol;

pub use crypto::CryptoError;
pub use network::{MeshSettings, NetworkError, Node};
pub use protocol::ProtocolError;

/// Initialize the SecureMesh library
pub fn init() -> Result<(), CryptoError> {
    crypto::init()
}
