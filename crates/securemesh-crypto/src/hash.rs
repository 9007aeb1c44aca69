//! Message digests
//!
//! Algorithms are selected by name at runtime because the key-agreement
//! hash travels over the wire as a string during the handshake.

use crate::error::{CryptoError, Result};
use blake2::Blake2b512;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use std::fmt;
use std::str::FromStr;

/// Supported digest algorithms
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    #[default]
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Blake2b512,
}

impl HashAlgorithm {
    /// Canonical name used on the wire and in configuration
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "SHA-224",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
            HashAlgorithm::Sha3_224 => "SHA3-224",
            HashAlgorithm::Sha3_256 => "SHA3-256",
            HashAlgorithm::Sha3_384 => "SHA3-384",
            HashAlgorithm::Sha3_512 => "SHA3-512",
            HashAlgorithm::Blake2b512 => "BLAKE2b-512",
        }
    }

    /// Digest length in bytes
    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha224 | HashAlgorithm::Sha3_224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Sha3_256 => 32,
            HashAlgorithm::Sha384 | HashAlgorithm::Sha3_384 => 48,
            HashAlgorithm::Sha512 | HashAlgorithm::Sha3_512 | HashAlgorithm::Blake2b512 => 64,
        }
    }

    pub fn all() -> [HashAlgorithm; 9] {
        [
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
            HashAlgorithm::Sha3_224,
            HashAlgorithm::Sha3_256,
            HashAlgorithm::Sha3_384,
            HashAlgorithm::Sha3_512,
            HashAlgorithm::Blake2b512,
        ]
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        HashAlgorithm::all()
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(s.to_string()))
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HashAlgorithm> for String {
    fn from(alg: HashAlgorithm) -> Self {
        alg.name().to_string()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn digest_with<D: Digest>(value: &[u8]) -> Vec<u8> {
    D::digest(value).to_vec()
}

/// Hash raw bytes
pub fn digest(algorithm: HashAlgorithm, value: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha224 => digest_with::<Sha224>(value),
        HashAlgorithm::Sha256 => digest_with::<Sha256>(value),
        HashAlgorithm::Sha384 => digest_with::<Sha384>(value),
        HashAlgorithm::Sha512 => digest_with::<Sha512>(value),
        HashAlgorithm::Sha3_224 => digest_with::<Sha3_224>(value),
        HashAlgorithm::Sha3_256 => digest_with::<Sha3_256>(value),
        HashAlgorithm::Sha3_384 => digest_with::<Sha3_384>(value),
        HashAlgorithm::Sha3_512 => digest_with::<Sha3_512>(value),
        HashAlgorithm::Blake2b512 => digest_with::<Blake2b512>(value),
    }
}

/// Hash the UTF-8 bytes of `value` and return the digest as lowercase hex
pub fn digest_hex(algorithm: HashAlgorithm, value: &str) -> String {
    hex::encode(digest(algorithm, value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            digest_hex(HashAlgorithm::Sha256, "abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            digest_hex(HashAlgorithm::Sha3_256, ""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_output_lengths() {
        for alg in HashAlgorithm::all() {
            assert_eq!(
                digest(alg, b"securemesh").len(),
                alg.output_len(),
                "{} length mismatch",
                alg
            );
        }
    }

    #[test]
    fn test_name_parsing() {
        for alg in HashAlgorithm::all() {
            assert_eq!(alg.name().parse::<HashAlgorithm>().unwrap(), alg);
        }
        assert_eq!("sha3-512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha3_512);
        assert!(matches!(
            "MD5".parse::<HashAlgorithm>(),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }
}
