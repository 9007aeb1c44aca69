//! Error types for wire and session operations

use securemesh_crypto::CryptoError;
use thiserror::Error;

use crate::state::HandshakeState;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Invalid handshake transition: {from} -> {to}")]
    InvalidTransition {
        from: HandshakeState,
        to: HandshakeState,
    },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
