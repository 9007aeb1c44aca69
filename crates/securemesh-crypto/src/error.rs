//! Error types for cryptographic operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Failures of the crypto primitives.
///
/// Every primitive reports failure through this type instead of panicking,
/// so connection code can decide to drop the affected session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Cipher operation failed")]
    Cipher,

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Key agreement failed: {0}")]
    KeyAgreement(String),

    #[error("Random source unavailable: {0}")]
    RandomSource(String),
}
