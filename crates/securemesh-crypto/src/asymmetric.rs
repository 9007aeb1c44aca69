//! Asymmetric key pairs
//!
//! Key pairs are kept in encoded form so they can cross the wire and the
//! tier can be changed at runtime without generic plumbing:
//! - EC: private scalar bytes, SEC1 uncompressed public point
//! - RSA: PKCS#8 DER private key, SPKI DER public key

use crate::error::{CryptoError, Result};
use crate::sizes::{EcKeySize, RsaKeySize};
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, SecretKey};
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Asymmetric algorithm families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsymmetricAlgorithm {
    Ec,
    Rsa,
}

impl FromStr for AsymmetricAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EC" | "ECDH" => Ok(AsymmetricAlgorithm::Ec),
            "RSA" => Ok(AsymmetricAlgorithm::Rsa),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for AsymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsymmetricAlgorithm::Ec => f.write_str("EC"),
            AsymmetricAlgorithm::Rsa => f.write_str("RSA"),
        }
    }
}

/// Public half of a key pair, safe to send to a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub algorithm: AsymmetricAlgorithm,
    pub bits: u16,
    pub encoded: Vec<u8>,
}

/// A generated key pair
pub struct KeyPair {
    algorithm: AsymmetricAlgorithm,
    bits: u16,
    private: Zeroizing<Vec<u8>>,
    public: PublicKey,
}

impl KeyPair {
    /// Generate an EC key pair on the curve of the given tier
    pub fn generate_ec(size: EcKeySize) -> Self {
        let (private, encoded) = match size {
            EcKeySize::Low => generate_ec::<p224::NistP224>(),
            EcKeySize::Medium => generate_ec::<p256::NistP256>(),
            EcKeySize::High => generate_ec::<p384::NistP384>(),
            EcKeySize::Highest => generate_ec::<p521::NistP521>(),
        };

        KeyPair {
            algorithm: AsymmetricAlgorithm::Ec,
            bits: size.bits(),
            private,
            public: PublicKey {
                algorithm: AsymmetricAlgorithm::Ec,
                bits: size.bits(),
                encoded,
            },
        }
    }

    /// Generate an RSA key pair with the given modulus size
    pub fn generate_rsa(size: RsaKeySize) -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, usize::from(size.bits()))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let public_der = private
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(KeyPair {
            algorithm: AsymmetricAlgorithm::Rsa,
            bits: size.bits(),
            private: Zeroizing::new(private_der.as_bytes().to_vec()),
            public: PublicKey {
                algorithm: AsymmetricAlgorithm::Rsa,
                bits: size.bits(),
                encoded: public_der.into_vec(),
            },
        })
    }

    pub fn algorithm(&self) -> AsymmetricAlgorithm {
        self.algorithm
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Encoded private key material
    pub fn private_bytes(&self) -> &[u8] {
        &self.private
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

/// Generate a key pair for `algorithm` at the tier named by `bits`
pub fn generate_key_pair(algorithm: AsymmetricAlgorithm, bits: u16) -> Result<KeyPair> {
    match algorithm {
        AsymmetricAlgorithm::Ec => Ok(KeyPair::generate_ec(EcKeySize::from_bits(bits)?)),
        AsymmetricAlgorithm::Rsa => KeyPair::generate_rsa(RsaKeySize::from_bits(bits)?),
    }
}

fn generate_ec<C>() -> (Zeroizing<Vec<u8>>, Vec<u8>)
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let secret = SecretKey::<C>::random(&mut OsRng);
    let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
    (Zeroizing::new(secret.to_bytes().to_vec()), public)
}
