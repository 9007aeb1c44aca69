//! Key-size tiers
//!
//! Nodes agree on key sizes by exchanging plain bit counts, so every tier
//! converts to and from its bit count. Unknown bit counts are rejected.

use crate::error::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symmetric (AES-class) key sizes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetricKeySize {
    /// 128-bit key
    Low,
    /// 192-bit key
    Medium,
    /// 256-bit key
    #[default]
    High,
}

impl SymmetricKeySize {
    pub fn bits(self) -> u16 {
        match self {
            SymmetricKeySize::Low => 128,
            SymmetricKeySize::Medium => 192,
            SymmetricKeySize::High => 256,
        }
    }

    /// Key length in bytes
    pub fn byte_len(self) -> usize {
        usize::from(self.bits() / 8)
    }

    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            128 => Ok(SymmetricKeySize::Low),
            192 => Ok(SymmetricKeySize::Medium),
            256 => Ok(SymmetricKeySize::High),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "{}-bit symmetric key",
                other
            ))),
        }
    }

    /// Tier matching a raw key length in bytes
    pub fn from_len(len: usize) -> Result<Self> {
        u16::try_from(len * 8)
            .map_err(|_| CryptoError::InvalidKey(format!("{} byte key", len)))
            .and_then(Self::from_bits)
            .map_err(|_| CryptoError::InvalidKey(format!("{} byte key", len)))
    }
}

/// Elliptic-curve key sizes, one NIST prime curve per tier
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EcKeySize {
    /// P-224
    Low,
    /// P-256
    #[default]
    Medium,
    /// P-384
    High,
    /// P-521
    Highest,
}

impl EcKeySize {
    pub fn bits(self) -> u16 {
        match self {
            EcKeySize::Low => 224,
            EcKeySize::Medium => 256,
            EcKeySize::High => 384,
            EcKeySize::Highest => 521,
        }
    }

    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            224 => Ok(EcKeySize::Low),
            256 => Ok(EcKeySize::Medium),
            384 => Ok(EcKeySize::High),
            521 => Ok(EcKeySize::Highest),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "{}-bit elliptic curve",
                other
            ))),
        }
    }

    pub fn all() -> [EcKeySize; 4] {
        [
            EcKeySize::Low,
            EcKeySize::Medium,
            EcKeySize::High,
            EcKeySize::Highest,
        ]
    }
}

/// RSA modulus sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsaKeySize {
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

impl RsaKeySize {
    pub fn bits(self) -> u16 {
        match self {
            RsaKeySize::Lowest => 1024,
            RsaKeySize::Low => 2048,
            RsaKeySize::Medium => 3072,
            RsaKeySize::High => 4096,
            RsaKeySize::Highest => 8192,
        }
    }

    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            1024 => Ok(RsaKeySize::Lowest),
            2048 => Ok(RsaKeySize::Low),
            3072 => Ok(RsaKeySize::Medium),
            4096 => Ok(RsaKeySize::High),
            8192 => Ok(RsaKeySize::Highest),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "{}-bit RSA key",
                other
            ))),
        }
    }
}

impl fmt::Display for SymmetricKeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

impl fmt::Display for EcKeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.bits())
    }
}
