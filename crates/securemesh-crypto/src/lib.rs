//! SecureMesh cryptographic primitives
//!
//! - Symmetric authenticated encryption (AES-GCM, ChaCha20-Poly1305)
//! - EC and RSA key-pair generation
//! - ECDH key agreement with hash-based session key derivation
//! - Message digests (SHA-2, SHA-3, BLAKE2b)
//! - Value serialization to opaque byte blocks
//!
//! Every operation returns a [`CryptoError`] on failure instead of panicking.

pub mod agreement;
pub mod asymmetric;
pub mod codec;
pub mod error;
pub mod hash;
pub mod sizes;
pub mod symmetric;

pub use agreement::derive_shared_key;
pub use asymmetric::{generate_key_pair, AsymmetricAlgorithm, KeyPair, PublicKey};
pub use codec::{deserialize, serialize};
pub use error::{CryptoError, Result};
pub use hash::{digest, digest_hex, HashAlgorithm};
pub use sizes::{EcKeySize, RsaKeySize, SymmetricKeySize};
pub use symmetric::{decrypt_symmetric, encrypt_symmetric, Cipher, SymmetricKey};

use rand::rngs::OsRng;
use rand::RngCore;

/// Check that the operating system random source is usable
pub fn init() -> Result<()> {
    let mut probe = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut probe)
        .map_err(|e| CryptoError::RandomSource(e.to_string()))
}
