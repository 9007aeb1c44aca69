//! Network error types

use std::net::SocketAddr;
use thiserror::Error;

/// Mesh node and handshake errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Authentication failed")]
    AuthenticationFailure,

    #[error("Handler not found: {0}")]
    HandlerNotFound(String),

    #[error("Invalid mesh settings: {0}")]
    InvalidSettings(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] securemesh_protocol::ProtocolError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] securemesh_crypto::CryptoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handler error: {0}")]
    Handler(String),
}

/// Result type for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;
