//! Elliptic-curve key agreement
//!
//! The session key is derived as the trailing `key_size / 8` bytes of
//! `hash(ECDH(local_private, remote_public))`. Both peers must use the same
//! hash algorithm and key size, otherwise they end up with different keys
//! and the first sealed message fails to open.

use crate::asymmetric::{AsymmetricAlgorithm, KeyPair, PublicKey};
use crate::error::{CryptoError, Result};
use crate::hash::{digest, HashAlgorithm};
use crate::sizes::{EcKeySize, SymmetricKeySize};
use crate::symmetric::SymmetricKey;
use elliptic_curve::ecdh::diffie_hellman;
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, SecretKey};
use zeroize::Zeroizing;

/// Derive a symmetric session key from a local EC key pair and a peer's
/// EC public key
pub fn derive_shared_key(
    hash_algorithm: HashAlgorithm,
    key_size: SymmetricKeySize,
    local: &KeyPair,
    remote: &PublicKey,
) -> Result<SymmetricKey> {
    if local.algorithm() != AsymmetricAlgorithm::Ec || remote.algorithm != AsymmetricAlgorithm::Ec
    {
        return Err(CryptoError::KeyAgreement(
            "key agreement requires EC keys".to_string(),
        ));
    }
    if local.bits() != remote.bits {
        return Err(CryptoError::KeyAgreement(format!(
            "curve mismatch: local {} bits, remote {} bits",
            local.bits(),
            remote.bits
        )));
    }

    let curve =
        EcKeySize::from_bits(local.bits()).map_err(|e| CryptoError::KeyAgreement(e.to_string()))?;
    let private = local.private_bytes();
    let shared = match curve {
        EcKeySize::Low => ecdh::<p224::NistP224>(private, &remote.encoded)?,
        EcKeySize::Medium => ecdh::<p256::NistP256>(private, &remote.encoded)?,
        EcKeySize::High => ecdh::<p384::NistP384>(private, &remote.encoded)?,
        EcKeySize::Highest => ecdh::<p521::NistP521>(private, &remote.encoded)?,
    };

    let hashed = Zeroizing::new(digest(hash_algorithm, &shared));
    let key_len = key_size.byte_len();
    if hashed.len() < key_len {
        return Err(CryptoError::KeyAgreement(format!(
            "{} yields {} bytes, {} needed",
            hash_algorithm,
            hashed.len(),
            key_len
        )));
    }

    SymmetricKey::from_bytes(&hashed[hashed.len() - key_len..])
}

fn ecdh<C>(private: &[u8], remote_public: &[u8]) -> Result<Zeroizing<Vec<u8>>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let secret = SecretKey::<C>::from_slice(private)
        .map_err(|_| CryptoError::KeyAgreement("invalid local private key".to_string()))?;
    let public = elliptic_curve::PublicKey::<C>::from_sec1_bytes(remote_public)
        .map_err(|_| CryptoError::KeyAgreement("invalid remote public key".to_string()))?;

    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asymmetric::generate_key_pair;

    #[test]
    fn test_ecdh_symmetry_all_tiers_and_hashes() {
        for curve in EcKeySize::all() {
            let a = KeyPair::generate_ec(curve);
            let b = KeyPair::generate_ec(curve);

            for hash in HashAlgorithm::all() {
                for size in [
                    SymmetricKeySize::Low,
                    SymmetricKeySize::Medium,
                    SymmetricKeySize::High,
                ] {
                    if hash.output_len() < size.byte_len() {
                        continue;
                    }
                    let ab = derive_shared_key(hash, size, &a, b.public_key()).unwrap();
                    let ba = derive_shared_key(hash, size, &b, a.public_key()).unwrap();
                    assert_eq!(ab, ba, "{} / {} / {}", curve, hash, size);
                    assert_eq!(ab.as_bytes().len(), size.byte_len());
                }
            }
        }
    }

    #[test]
    fn test_key_is_digest_suffix() {
        let a = KeyPair::generate_ec(EcKeySize::Medium);
        let b = KeyPair::generate_ec(EcKeySize::Medium);

        let long = derive_shared_key(HashAlgorithm::Sha512, SymmetricKeySize::High, &a, b.public_key())
            .unwrap();
        let short = derive_shared_key(HashAlgorithm::Sha512, SymmetricKeySize::Low, &a, b.public_key())
            .unwrap();
        assert_eq!(&long.as_bytes()[16..], short.as_bytes());
    }

    #[test]
    fn test_different_peers_yield_different_keys() {
        let a = KeyPair::generate_ec(EcKeySize::Medium);
        let b = KeyPair::generate_ec(EcKeySize::Medium);
        let c = KeyPair::generate_ec(EcKeySize::Medium);

        let ab = derive_shared_key(HashAlgorithm::Sha256, SymmetricKeySize::High, &a, b.public_key())
            .unwrap();
        let ac = derive_shared_key(HashAlgorithm::Sha256, SymmetricKeySize::High, &a, c.public_key())
            .unwrap();
        assert_ne!(ab, ac);
    }

    #[test]
    fn test_curve_mismatch_rejected() {
        let a = KeyPair::generate_ec(EcKeySize::Medium);
        let b = KeyPair::generate_ec(EcKeySize::High);
        assert!(matches!(
            derive_shared_key(HashAlgorithm::Sha256, SymmetricKeySize::High, &a, b.public_key()),
            Err(CryptoError::KeyAgreement(_))
        ));
    }

    #[test]
    fn test_short_digest_rejected() {
        let a = KeyPair::generate_ec(EcKeySize::Low);
        let b = KeyPair::generate_ec(EcKeySize::Low);
        assert!(matches!(
            derive_shared_key(HashAlgorithm::Sha224, SymmetricKeySize::High, &a, b.public_key()),
            Err(CryptoError::KeyAgreement(_))
        ));
    }

    #[test]
    fn test_malformed_remote_key_rejected() {
        let a = KeyPair::generate_ec(EcKeySize::Medium);
        let bogus = PublicKey {
            algorithm: AsymmetricAlgorithm::Ec,
            bits: 256,
            encoded: vec![0x04; 65],
        };
        assert!(matches!(
            derive_shared_key(HashAlgorithm::Sha256, SymmetricKeySize::High, &a, &bogus),
            Err(CryptoError::KeyAgreement(_))
        ));
    }

    #[test]
    fn test_rsa_keys_rejected() {
        let a = KeyPair::generate_ec(EcKeySize::Medium);
        let rsa = generate_key_pair(AsymmetricAlgorithm::Rsa, 1024).unwrap();
        assert!(matches!(
            derive_shared_key(HashAlgorithm::Sha256, SymmetricKeySize::High, &a, rsa.public_key()),
            Err(CryptoError::KeyAgreement(_))
        ));
    }
}
