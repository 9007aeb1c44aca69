//! Symmetric authenticated encryption
//!
//! Sealed blocks are laid out as `nonce (12 bytes) || ciphertext || tag`.
//! A fresh random nonce is drawn for every block; session keys are never
//! shared across peer pairs, which keeps random 96-bit nonces safe for the
//! traffic volume of a single session.

use crate::error::{CryptoError, Result};
use crate::sizes::SymmetricKeySize;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use chacha20poly1305::ChaCha20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Nonce prefix length of a sealed block
pub const NONCE_SIZE: usize = 12;

/// Authentication tag length of a sealed block
pub const TAG_SIZE: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Symmetric cipher families
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cipher {
    /// AES-GCM, variant chosen by key length (128/192/256)
    #[default]
    Aes,
    /// ChaCha20-Poly1305, 256-bit keys only
    ChaCha20Poly1305,
}

impl Cipher {
    pub fn name(self) -> &'static str {
        match self {
            Cipher::Aes => "AES",
            Cipher::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }
}

impl FromStr for Cipher {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES" | "AES-GCM" => Ok(Cipher::Aes),
            "CHACHA20-POLY1305" | "CHACHA20POLY1305" => Ok(Cipher::ChaCha20Poly1305),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symmetric key material, zeroized on drop
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl SymmetricKey {
    /// Wrap raw key bytes; the length must match a [`SymmetricKeySize`] tier
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        SymmetricKeySize::from_len(bytes.len())?;
        Ok(SymmetricKey {
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Generate a random key of the given tier
    pub fn generate(size: SymmetricKeySize) -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; size.byte_len()]);
        OsRng.fill_bytes(&mut bytes);
        SymmetricKey { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> SymmetricKeySize {
        // Length is validated on construction
        SymmetricKeySize::from_len(self.bytes.len()).unwrap_or_default()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bits", &(self.bytes.len() * 8))
            .finish_non_exhaustive()
    }
}

fn seal_with<A>(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    A: Aead<NonceSize = U12> + KeyInit,
{
    let cipher =
        A::new_from_slice(key).map_err(|_| CryptoError::InvalidKey("bad key length".into()))?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Cipher)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open_with<A>(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>>
where
    A: Aead<NonceSize = U12> + KeyInit,
{
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Cipher);
    }

    let cipher =
        A::new_from_slice(key).map_err(|_| CryptoError::InvalidKey("bad key length".into()))?;
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);

    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Cipher)
}

/// Encrypt `value` under `key`
pub fn encrypt_symmetric(cipher: Cipher, value: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    match (cipher, key.size()) {
        (Cipher::Aes, SymmetricKeySize::Low) => seal_with::<Aes128Gcm>(key.as_bytes(), value),
        (Cipher::Aes, SymmetricKeySize::Medium) => seal_with::<Aes192Gcm>(key.as_bytes(), value),
        (Cipher::Aes, SymmetricKeySize::High) => seal_with::<Aes256Gcm>(key.as_bytes(), value),
        (Cipher::ChaCha20Poly1305, SymmetricKeySize::High) => {
            seal_with::<ChaCha20Poly1305>(key.as_bytes(), value)
        }
        (Cipher::ChaCha20Poly1305, size) => Err(CryptoError::InvalidKey(format!(
            "ChaCha20-Poly1305 requires a 256-bit key, got {}",
            size
        ))),
    }
}

/// Decrypt a block produced by [`encrypt_symmetric`]
///
/// Tampered or truncated input, or the wrong key, yields
/// [`CryptoError::Cipher`] and no partial plaintext.
pub fn decrypt_symmetric(cipher: Cipher, value: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    match (cipher, key.size()) {
        (Cipher::Aes, SymmetricKeySize::Low) => open_with::<Aes128Gcm>(key.as_bytes(), value),
        (Cipher::Aes, SymmetricKeySize::Medium) => open_with::<Aes192Gcm>(key.as_bytes(), value),
        (Cipher::Aes, SymmetricKeySize::High) => open_with::<Aes256Gcm>(key.as_bytes(), value),
        (Cipher::ChaCha20Poly1305, SymmetricKeySize::High) => {
            open_with::<ChaCha20Poly1305>(key.as_bytes(), value)
        }
        (Cipher::ChaCha20Poly1305, size) => Err(CryptoError::InvalidKey(format!(
            "ChaCha20-Poly1305 requires a 256-bit key, got {}",
            size
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_all_tiers() {
        for size in [
            SymmetricKeySize::Low,
            SymmetricKeySize::Medium,
            SymmetricKeySize::High,
        ] {
            let key = SymmetricKey::generate(size);
            let sealed = encrypt_symmetric(Cipher::Aes, b"hello mesh", &key).unwrap();
            assert_eq!(sealed.len(), NONCE_SIZE + 10 + TAG_SIZE);

            let opened = decrypt_symmetric(Cipher::Aes, &sealed, &key).unwrap();
            assert_eq!(opened, b"hello mesh");
        }
    }

    #[test]
    fn test_chacha_requires_256_bit_key() {
        let key = SymmetricKey::generate(SymmetricKeySize::High);
        let sealed = encrypt_symmetric(Cipher::ChaCha20Poly1305, b"payload", &key).unwrap();
        assert_eq!(
            decrypt_symmetric(Cipher::ChaCha20Poly1305, &sealed, &key).unwrap(),
            b"payload"
        );

        let short = SymmetricKey::generate(SymmetricKeySize::Low);
        assert!(matches!(
            encrypt_symmetric(Cipher::ChaCha20Poly1305, b"payload", &short),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = SymmetricKey::generate(SymmetricKeySize::High);
        let other = SymmetricKey::generate(SymmetricKeySize::High);

        let sealed = encrypt_symmetric(Cipher::Aes, b"secret", &key).unwrap();
        assert_eq!(
            decrypt_symmetric(Cipher::Aes, &sealed, &other),
            Err(CryptoError::Cipher)
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SymmetricKey::generate(SymmetricKeySize::Medium);
        let mut sealed = encrypt_symmetric(Cipher::Aes, b"secret", &key).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert_eq!(
            decrypt_symmetric(Cipher::Aes, &sealed, &key),
            Err(CryptoError::Cipher)
        );
        assert_eq!(
            decrypt_symmetric(Cipher::Aes, &sealed[..8], &key),
            Err(CryptoError::Cipher)
        );
    }

    #[test]
    fn test_nonces_differ() {
        let key = SymmetricKey::generate(SymmetricKeySize::High);
        let a = encrypt_symmetric(Cipher::Aes, b"same", &key).unwrap();
        let b = encrypt_symmetric(Cipher::Aes, b"same", &key).unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    }

    #[test]
    fn test_key_from_bytes_validates_length() {
        assert!(SymmetricKey::from_bytes(&[7u8; 16]).is_ok());
        assert!(matches!(
            SymmetricKey::from_bytes(&[7u8; 15]),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_cipher_names() {
        assert_eq!("aes".parse::<Cipher>().unwrap(), Cipher::Aes);
        assert_eq!(
            "ChaCha20-Poly1305".parse::<Cipher>().unwrap(),
            Cipher::ChaCha20Poly1305
        );
        assert!(matches!(
            "DES".parse::<Cipher>(),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = SymmetricKey::from_bytes(&[0xAB; 32]).unwrap();
        let printed = format!("{:?}", key);
        assert!(printed.contains("256"));
        assert!(!printed.to_lowercase().contains("ab, ab"));
    }
}
